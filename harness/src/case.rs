//! Case file parsing and validation.
//!
//! Cases are TOML files defining a request, the store effect the request
//! is supposed to have had, the canned response to verify, and the
//! expected verification outcome. See `harness/cases/` for examples.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use serde_json::Value;

use verify::http::{Method, Request, Response, StatusCode};
use verify::store::Row;

/// A parsed case file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CaseFile {
    pub case: CaseMeta,
    pub request: RequestSpec,
    #[serde(default)]
    pub seed: Vec<SeedSpec>,
    #[serde(default)]
    pub effect: EffectSpec,
    pub response: ResponseSpec,
    pub expect: Expectation,
    #[serde(default)]
    pub config: CaseConfig,
}

/// Case metadata: identifier and description.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CaseMeta {
    /// Unique identifier (slug format: `[a-z0-9_-]+`).
    pub id: String,
    /// What the scenario exercises.
    pub description: String,
}

/// The request fed into the verification pass.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub uri: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<toml::Value>,
}

impl RequestSpec {
    pub fn to_request(&self) -> Result<Request> {
        Ok(Request {
            method: self.method,
            uri: self.uri.clone(),
            headers: self.headers.clone(),
            body: self.body.as_ref().map(json_value).transpose()?,
        })
    }
}

/// Initial rows loaded into the reference store before the pass.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SeedSpec {
    pub set: String,
    #[serde(default)]
    pub rows: Vec<toml::Value>,
}

/// Store mutations representing the request's effect on the service.
///
/// Applied after the verification context snapshots its client view, so
/// before/after diffing sees them the way a live service sync would.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct EffectSpec {
    #[serde(default)]
    pub insert: Vec<InsertOp>,
    #[serde(default)]
    pub update: Vec<UpdateOp>,
    #[serde(default)]
    pub delete: Vec<DeleteOp>,
}

impl EffectSpec {
    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InsertOp {
    pub set: String,
    pub row: toml::Value,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UpdateOp {
    pub set: String,
    pub key: Vec<toml::Value>,
    pub tree: toml::Value,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DeleteOp {
    pub set: String,
    pub key: Vec<toml::Value>,
}

/// The canned response to verify.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ResponseSpec {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<toml::Value>,
}

impl ResponseSpec {
    pub fn to_response(&self) -> Result<Response> {
        Ok(Response {
            status: StatusCode(self.status),
            headers: self.headers.clone(),
            body: self.body.as_ref().map(json_value).transpose()?,
        })
    }
}

/// Expected verification outcome.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Expectation {
    pub outcome: ExpectedOutcome,
    /// Status the composite demands. Defaults to the canned response's
    /// status, so mismatch scenarios set this explicitly.
    #[serde(default)]
    pub status: Option<u16>,
    /// Name of the verifier expected to raise the failure.
    #[serde(default)]
    pub verifier: Option<String>,
    /// Substrings the failure message must contain.
    #[serde(default)]
    pub message_contains: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedOutcome {
    Pass,
    Fail,
}

/// Registry overrides for the case.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CaseConfig {
    /// Restrict the composite to these checks, in this order.
    pub checks: Option<Vec<String>>,
}

impl CaseFile {
    /// Load and validate a case file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read case {}", path.display()))?;
        let case: CaseFile =
            toml::from_str(&contents).with_context(|| format!("parse case {}", path.display()))?;
        case.validate()
            .with_context(|| format!("validate case {}", path.display()))?;
        Ok(case)
    }

    #[cfg(test)]
    pub fn parse_str(contents: &str) -> Result<Self> {
        let case: CaseFile = toml::from_str(contents).context("parse case")?;
        case.validate()?;
        Ok(case)
    }

    fn validate(&self) -> Result<()> {
        validate_case_id(&self.case.id)?;
        if self.case.description.trim().is_empty() {
            bail!("case.description must be non-empty");
        }
        if self.request.uri.trim().is_empty() {
            bail!("request.uri must be non-empty");
        }
        for op in &self.effect.update {
            if op.key.is_empty() {
                bail!("effect.update key must be non-empty");
            }
        }
        for op in &self.effect.delete {
            if op.key.is_empty() {
                bail!("effect.delete key must be non-empty");
            }
        }
        if self.expect.outcome == ExpectedOutcome::Pass {
            if !self.expect.message_contains.is_empty() {
                bail!("expect.message_contains only applies to expected failures");
            }
            if self.expect.verifier.is_some() {
                bail!("expect.verifier only applies to expected failures");
            }
        }
        if let Some(checks) = &self.config.checks
            && checks.is_empty()
        {
            bail!("config.checks must be non-empty when present");
        }
        Ok(())
    }
}

/// Convert a TOML value to the JSON representation rows and bodies use.
pub fn json_value(value: &toml::Value) -> Result<Value> {
    serde_json::to_value(value).context("convert TOML value to JSON")
}

/// Convert a TOML table to a store row.
pub fn json_row(value: &toml::Value) -> Result<Row> {
    let Value::Object(map) = json_value(value)? else {
        bail!("row must be a table");
    };
    Ok(map.into_iter().collect())
}

/// Discover and load all case files from a directory.
///
/// Returns cases sorted by id. Errors if duplicate ids are found.
pub fn discover_cases(dir: &Path) -> Result<Vec<CaseFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut cases = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read cases dir {}", dir.display()))? {
        let entry = entry.context("read case entry")?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
            continue;
        }
        cases.push(CaseFile::load(&path)?);
    }
    cases.sort_by(|left, right| left.case.id.cmp(&right.case.id));
    for pair in cases.windows(2) {
        if pair[0].case.id == pair[1].case.id {
            return Err(anyhow!("duplicate case.id {}", pair[0].case.id));
        }
    }
    Ok(cases)
}

fn validate_case_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        bail!("case.id must be non-empty");
    }
    if id.contains('/') || id.contains('\\') {
        bail!("case.id must not contain path separators");
    }
    if id.contains("..") {
        bail!("case.id must not contain '..'");
    }
    if !id
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_')
    {
        bail!("case.id must use [a-z0-9_-] only");
    }
    Ok(())
}
