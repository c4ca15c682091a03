//! Verifier registry configuration.
//!
//! Which checks run, and with what parameters, is explicit configuration
//! built once at startup and passed by reference into case runs — there is
//! no process-wide verifier accumulation. The TOML file lives at
//! `harness/registry.toml`; missing files fall back to defaults.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use verify::http::StatusCode;
use verify::model::Workspace;
use verify::verify::checks::{
    ContentTypeVerifier, DataVerifier, EtagVerifier, NextLinkVerifier, PayloadTypeVerifier,
    PreferHeaderVerifier, RelationshipLinkVerifier, StatusCodeVerifier,
};
use verify::verify::{CompositeVerifier, ResponseVerifier};

/// Check names the registry can build, in default registration order.
pub const KNOWN_CHECKS: &[&str] = &[
    "status_code",
    "content_type",
    "etag",
    "prefer_header",
    "next_link",
    "relationship_link",
    "payload_type",
    "data",
];

/// Registry configuration (TOML).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Checks enabled for composites, in registration order.
    pub checks: Vec<String>,
    /// Media type the content-type check expects.
    pub content_type: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            checks: KNOWN_CHECKS.iter().map(|name| name.to_string()).collect(),
            content_type: "application/json".to_string(),
        }
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.checks.is_empty() {
            return Err(anyhow!("checks must be a non-empty array"));
        }
        for (index, check) in self.checks.iter().enumerate() {
            if !KNOWN_CHECKS.contains(&check.as_str()) {
                return Err(anyhow!("checks[{index}] names unknown check {check}"));
            }
            if self.checks[..index].contains(check) {
                return Err(anyhow!("checks[{index}] duplicates {check}"));
            }
        }
        if self.content_type.trim().is_empty() {
            return Err(anyhow!("content_type must be non-empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RegistryConfig::default()`.
pub fn load_config(path: &Path) -> Result<RegistryConfig> {
    if !path.exists() {
        let cfg = RegistryConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RegistryConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RegistryConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize registry toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf).with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

/// Builds composites from validated configuration.
pub struct VerifierRegistry {
    config: RegistryConfig,
    workspace: Rc<Workspace>,
}

impl VerifierRegistry {
    pub fn new(config: RegistryConfig, workspace: Rc<Workspace>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, workspace })
    }

    /// Composite for a scenario expecting the given status, with all
    /// configured checks.
    pub fn composite_for(&self, expected_status: StatusCode) -> Result<CompositeVerifier> {
        self.composite_with(expected_status, &self.config.checks)
    }

    /// Composite restricted to the named checks, in the given order.
    pub fn composite_with(
        &self,
        expected_status: StatusCode,
        checks: &[String],
    ) -> Result<CompositeVerifier> {
        let mut verifiers: Vec<Box<dyn ResponseVerifier>> = Vec::with_capacity(checks.len());
        for check in checks {
            verifiers.push(self.build_check(check, expected_status)?);
        }
        Ok(CompositeVerifier::new(verifiers))
    }

    fn build_check(
        &self,
        name: &str,
        expected_status: StatusCode,
    ) -> Result<Box<dyn ResponseVerifier>> {
        let verifier: Box<dyn ResponseVerifier> = match name {
            "status_code" => Box::new(StatusCodeVerifier::new(expected_status)),
            "content_type" => Box::new(ContentTypeVerifier::new(self.config.content_type.clone())),
            "etag" => Box::new(EtagVerifier::new(self.workspace.clone())),
            "prefer_header" => Box::new(PreferHeaderVerifier),
            "next_link" => Box::new(NextLinkVerifier::new(self.workspace.clone())),
            "relationship_link" => {
                Box::new(RelationshipLinkVerifier::new(self.workspace.clone()))
            }
            "payload_type" => Box::new(PayloadTypeVerifier::new(self.workspace.clone())),
            "data" => Box::new(DataVerifier::new(self.workspace.clone())),
            other => bail!("unknown check {other}"),
        };
        Ok(verifier)
    }
}
