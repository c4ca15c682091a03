//! CLI command implementations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::case::{CaseFile, discover_cases};
use crate::registry::{RegistryConfig, load_config, write_config};
use crate::report::aggregate;
use crate::results::{CaptureInput, capture_results};
use crate::run::run_case;
use crate::verdict::Verdict;

fn cases_dir(repo_root: &Path) -> PathBuf {
    repo_root.join("harness").join("cases")
}

fn results_base(repo_root: &Path) -> PathBuf {
    repo_root.join("harness").join("results")
}

fn registry_path(repo_root: &Path) -> PathBuf {
    repo_root.join("harness").join("registry.toml")
}

/// Write a default registry config for editing.
pub fn init_config(repo_root: &Path) -> Result<()> {
    let path = registry_path(repo_root);
    if path.exists() {
        bail!("registry config already exists at {}", path.display());
    }
    write_config(&path, &RegistryConfig::default())?;
    println!("init: registry={}", path.display());
    Ok(())
}

/// List all available cases.
pub fn list_cases(repo_root: &Path) -> Result<()> {
    let cases = discover_cases(&cases_dir(repo_root))?;
    for case in cases {
        println!("{}: {}", case.case.id, case.case.description);
    }
    Ok(())
}

/// Run a case by id (optionally multiple times).
pub fn run_case_by_id(repo_root: &Path, case_id: &str, runs: u32) -> Result<()> {
    let case_path = cases_dir(repo_root).join(format!("{case_id}.toml"));
    if !case_path.exists() {
        bail!("case {} not found at {}", case_id, case_path.display());
    }
    let case = CaseFile::load(&case_path).context("load case")?;
    let registry_config = load_config(&registry_path(repo_root)).context("load registry")?;
    debug!(case_id, runs, "case loaded");

    info!(case_id, runs, "starting runs");
    let stamp = Utc::now().format("%Y%m%dT%H%M%S");
    for run_num in 1..=runs {
        let run_id = format!("run-{stamp}-{run_num}");
        debug!(case_id, run_num, runs, "starting run");
        let started_at = Utc::now();
        let (verdict, verifier, failure) = match run_case(&case, &registry_config) {
            Ok(run) => (run.verdict, run.verifier, run.failure),
            Err(err) => {
                warn!(case_id, error = %format!("{err:#}"), "run errored");
                (Verdict::Error, None, Some(format!("{err:#}")))
            }
        };
        let finished_at = Utc::now();

        let input = CaptureInput {
            case_id,
            case_path: &case_path,
            run_id: &run_id,
            verdict,
            verifier: verifier.as_deref(),
            failure: failure.as_deref(),
            started_at,
            finished_at,
        };
        let results_dir = capture_results(&results_base(repo_root), &input)?;
        println!(
            "run: case={} run_id={} verdict={:?} results={}",
            case_id,
            run_id,
            verdict,
            results_dir.display()
        );
    }
    Ok(())
}

/// Show aggregated results for a case.
pub fn report_case(repo_root: &Path, case_id: &str) -> Result<()> {
    let results_dir = results_base(repo_root).join(case_id);
    let (summary, warnings) = aggregate(&results_dir)?;
    println!("report: case={} runs={}", case_id, summary.runs);
    println!(
        "report: pass={} fail={} error={}",
        summary.pass, summary.fail, summary.error
    );
    if let Some(avg) = summary.avg_duration_secs {
        println!("report: avg_duration_secs={avg:.2}");
    }
    for (verifier, count) in summary.failures_by_verifier {
        println!("report: failures {verifier} {count}");
    }
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

/// Remove captured results for a case.
pub fn clean_case(repo_root: &Path, case_id: &str) -> Result<()> {
    let case_results = results_base(repo_root).join(case_id);
    if case_results.exists() {
        std::fs::remove_dir_all(&case_results)
            .with_context(|| format!("remove {}", case_results.display()))?;
    }
    println!("clean: case={} results={}", case_id, case_results.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_a_loadable_default_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_config(temp.path()).expect("init");

        let loaded = load_config(&registry_path(temp.path())).expect("load");
        assert_eq!(loaded, RegistryConfig::default());
    }

    #[test]
    fn init_refuses_to_overwrite_an_existing_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_config(temp.path()).expect("init");
        let err = init_config(temp.path()).expect_err("already exists");
        assert!(err.to_string().contains("already exists"));
    }
}
