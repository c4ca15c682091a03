use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::results::{RunMeta, VerdictFile};
use crate::verdict::Verdict;

#[derive(Debug, Default)]
pub struct ReportSummary {
    pub runs: usize,
    pub pass: usize,
    pub fail: usize,
    pub error: usize,
    pub avg_duration_secs: Option<f64>,
    /// Fail counts keyed by the verifier that raised the failure.
    pub failures_by_verifier: BTreeMap<String, usize>,
}

pub fn load_run_dirs(case_results_dir: &Path) -> Result<Vec<PathBuf>> {
    if !case_results_dir.exists() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in fs::read_dir(case_results_dir)
        .with_context(|| format!("read {}", case_results_dir.display()))?
    {
        let entry = entry.context("read entry")?;
        if entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

pub fn aggregate(case_results_dir: &Path) -> Result<(ReportSummary, Vec<String>)> {
    let mut summary = ReportSummary::default();
    let mut warnings = Vec::new();

    for run_dir in load_run_dirs(case_results_dir)? {
        let meta_path = run_dir.join("meta.json");
        let verdict_path = run_dir.join("verdict.json");

        let meta: RunMeta = match fs::read_to_string(&meta_path)
            .with_context(|| format!("read {}", meta_path.display()))
            .and_then(|contents| serde_json::from_str(&contents).context("parse meta"))
        {
            Ok(meta) => meta,
            Err(err) => {
                warnings.push(format!(
                    "skip {}: meta.json invalid ({err})",
                    run_dir.display()
                ));
                continue;
            }
        };

        let verdict: VerdictFile = match fs::read_to_string(&verdict_path)
            .with_context(|| format!("read {}", verdict_path.display()))
            .and_then(|contents| serde_json::from_str(&contents).context("parse verdict"))
        {
            Ok(verdict) => verdict,
            Err(err) => {
                warnings.push(format!(
                    "skip {}: verdict.json invalid ({err})",
                    run_dir.display()
                ));
                continue;
            }
        };

        summary.runs += 1;
        match meta.verdict {
            Verdict::Pass => summary.pass += 1,
            Verdict::Fail => summary.fail += 1,
            Verdict::Error => summary.error += 1,
        }

        summary.avg_duration_secs = Some(match summary.avg_duration_secs {
            None => meta.duration_secs,
            Some(avg) => {
                let total = avg * (summary.runs as f64 - 1.0) + meta.duration_secs;
                total / summary.runs as f64
            }
        });

        if meta.verdict == Verdict::Fail
            && let Some(verifier) = &verdict.verifier
        {
            *summary
                .failures_by_verifier
                .entry(verifier.clone())
                .or_insert(0) += 1;
        }
    }

    Ok((summary, warnings))
}
