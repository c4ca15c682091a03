//! Result capture and persistence.
//!
//! Each run writes `meta.json` (run metadata) and `verdict.json` (the
//! classified verdict plus failure detail) to the results directory for
//! later aggregation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::verdict::Verdict;

/// Input for capturing results from a completed run.
#[derive(Debug)]
pub struct CaptureInput<'a> {
    pub case_id: &'a str,
    pub case_path: &'a Path,
    pub run_id: &'a str,
    pub verdict: Verdict,
    pub verifier: Option<&'a str>,
    pub failure: Option<&'a str>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Metadata for a run, persisted to `meta.json`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RunMeta {
    pub case_id: String,
    pub run_id: String,
    /// SHA-256 hash of the case file for reproducibility tracking.
    pub case_hash: String,
    pub verdict: Verdict,
    pub start_time: String,
    pub end_time: String,
    pub duration_secs: f64,
    /// Non-fatal errors encountered during capture.
    pub errors: Vec<String>,
}

/// Verdict detail for a run, persisted to `verdict.json`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VerdictFile {
    pub verdict: Verdict,
    /// Verifier that raised the failure, if the pass failed.
    pub verifier: Option<String>,
    /// Rendered failure message, if the pass failed.
    pub failure: Option<String>,
}

/// Capture results from a completed run to the results directory.
#[instrument(skip_all, fields(case_id = %input.case_id, run_id = %input.run_id))]
pub fn capture_results(base_dir: &Path, input: &CaptureInput<'_>) -> Result<PathBuf> {
    let results_dir = results_dir(base_dir, input.case_id, input.run_id);
    fs::create_dir_all(&results_dir)
        .with_context(|| format!("create results dir {}", results_dir.display()))?;

    let mut errors = Vec::new();

    let case_hash = match file_sha256(input.case_path) {
        Ok(hash) => hash,
        Err(err) => {
            errors.push(format!("case hash: {err}"));
            String::new()
        }
    };

    if !errors.is_empty() {
        warn!(errors = ?errors, "result capture had errors");
    }

    let duration = input.finished_at - input.started_at;
    let meta = RunMeta {
        case_id: input.case_id.to_string(),
        run_id: input.run_id.to_string(),
        case_hash,
        verdict: input.verdict,
        start_time: input.started_at.to_rfc3339(),
        end_time: input.finished_at.to_rfc3339(),
        duration_secs: duration.num_milliseconds() as f64 / 1000.0,
        errors,
    };
    write_json(&results_dir.join("meta.json"), &meta)?;

    let verdict = VerdictFile {
        verdict: input.verdict,
        verifier: input.verifier.map(str::to_string),
        failure: input.failure.map(str::to_string),
    };
    write_json(&results_dir.join("verdict.json"), &verdict)?;

    debug!(results_dir = %results_dir.display(), "results captured");
    Ok(results_dir)
}

pub fn results_dir(base_dir: &Path, case_id: &str, run_id: &str) -> PathBuf {
    base_dir.join(case_id).join(run_id)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let contents = serde_json::to_string_pretty(value).context("serialize json")?;
    fs::write(path, format!("{contents}\n"))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn file_sha256(path: &Path) -> Result<String> {
    let contents = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(contents);
    let digest = hasher.finalize();
    Ok(hex::encode(digest))
}
