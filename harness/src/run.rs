//! Case execution orchestration.
//!
//! Builds the reference store from the case's seed, snapshots the client
//! view, applies the request's declared effect, and runs the configured
//! composite against the pair.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use verify::http::StatusCode;
use verify::model::{Workspace, sample};
use verify::store::{RowStore, SyncedView};
use verify::verify::VerificationContext;

use crate::case::{CaseFile, EffectSpec, json_row, json_value};
use crate::registry::{RegistryConfig, VerifierRegistry};
use crate::verdict::{self, Verdict};

/// Result of one verification pass over a case.
#[derive(Debug)]
pub struct CaseRun {
    pub verdict: Verdict,
    /// Name of the verifier that raised the failure, if any.
    pub verifier: Option<String>,
    /// Rendered failure, if any.
    pub failure: Option<String>,
}

/// Run one verification pass for the case.
#[instrument(skip_all, fields(case_id = %case.case.id))]
pub fn run_case(case: &CaseFile, registry_config: &RegistryConfig) -> Result<CaseRun> {
    info!("case run started");

    let workspace = Rc::new(sample::customers_orders());
    let store = Rc::new(RefCell::new(RowStore::new()));
    for seed in &case.seed {
        for row in &seed.rows {
            store.borrow_mut().insert(&seed.set, json_row(row)?);
        }
    }

    // The view snapshots pre-effect state; the context's synchronization
    // step later observes the effect, like a live service sync would.
    let view = SyncedView::new(store.clone());
    let context = VerificationContext::new(workspace.clone(), Box::new(view));
    apply_effect(&store, &case.effect, &workspace).context("apply case effect")?;

    let request = Rc::new(case.request.to_request().context("build request")?);
    let response = case.response.to_response().context("build response")?;
    let expected_status = StatusCode(case.expect.status.unwrap_or(case.response.status));

    let registry = VerifierRegistry::new(registry_config.clone(), workspace)?;
    let composite = match &case.config.checks {
        Some(checks) => registry.composite_with(expected_status, checks)?,
        None => registry.composite_for(expected_status)?,
    };
    debug!(members = composite.len(), "composite built");

    let result = composite.verify(&request, &response, &context);
    let verdict = verdict::classify(&case.expect, &result);
    let failure = result.err();
    info!(verdict = ?verdict, "case run complete");

    Ok(CaseRun {
        verdict,
        verifier: failure.as_ref().map(|failure| failure.verifier.clone()),
        failure: failure.map(|failure| failure.to_string()),
    })
}

fn apply_effect(
    store: &Rc<RefCell<RowStore>>,
    effect: &EffectSpec,
    workspace: &Workspace,
) -> Result<()> {
    for op in &effect.insert {
        store.borrow_mut().insert(&op.set, json_row(&op.row)?);
    }
    for op in &effect.update {
        let key_names = key_names_of(workspace, &op.set)?;
        let key_values = op
            .key
            .iter()
            .map(json_value)
            .collect::<Result<Vec<_>>>()?;
        let key_names: Vec<&str> = key_names.iter().map(String::as_str).collect();
        store
            .borrow_mut()
            .update(&op.set, &key_names, &key_values, &json_value(&op.tree)?)?;
    }
    for op in &effect.delete {
        let key_names = key_names_of(workspace, &op.set)?;
        let key_values = op
            .key
            .iter()
            .map(json_value)
            .collect::<Result<Vec<_>>>()?;
        let key_names: Vec<&str> = key_names.iter().map(String::as_str).collect();
        store.borrow_mut().delete(&op.set, &key_names, &key_values)?;
    }
    Ok(())
}

fn key_names_of(workspace: &Workspace, set: &str) -> Result<Vec<String>> {
    let rtype = workspace
        .type_of_set(set)
        .with_context(|| format!("effect targets unknown set {set}"))?;
    Ok(rtype
        .key_names()
        .into_iter()
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::CaseFile;

    fn run(input: &str) -> CaseRun {
        let case = CaseFile::parse_str(input).expect("case parses");
        run_case(&case, &RegistryConfig::default()).expect("run")
    }

    #[test]
    fn matching_no_content_scenario_passes() {
        let verdict = run(r#"
[case]
id = "delete-no-content"
description = "DELETE returns 204"

[request]
method = "DELETE"
uri = "/Customers('ALFKI')"

[[seed]]
set = "Customers"
rows = [{ CustomerId = "ALFKI", CompanyName = "Alfreds", Version = 1 }]

[[effect.delete]]
set = "Customers"
key = ["ALFKI"]

[response]
status = 204

[expect]
outcome = "pass"

[config]
checks = ["status_code", "content_type"]
"#);
        assert_eq!(verdict.verdict, Verdict::Pass);
        assert_eq!(verdict.failure, None);
    }

    #[test]
    fn status_mismatch_scenario_reports_both_codes() {
        let verdict = run(r#"
[case]
id = "status-mismatch"
description = "200 instead of 204"

[request]
method = "DELETE"
uri = "/Customers('ALFKI')"

[response]
status = 200

[expect]
outcome = "fail"
status = 204
verifier = "status_code"
message_contains = ["204", "200"]

[config]
checks = ["status_code"]
"#);
        assert_eq!(verdict.verdict, Verdict::Pass);
        assert_eq!(verdict.verifier.as_deref(), Some("status_code"));
    }

    #[test]
    fn insert_scenario_verifies_payload_against_diff() {
        let verdict = run(r#"
[case]
id = "insert-customer"
description = "POST echoes the inserted entity"

[request]
method = "POST"
uri = "/Customers"

[request.body]
CustomerId = "BONAP"
CompanyName = "Bon app'"
Version = 1

[[seed]]
set = "Customers"
rows = [{ CustomerId = "ALFKI", CompanyName = "Alfreds", Version = 1 }]

[[effect.insert]]
set = "Customers"
row = { CustomerId = "BONAP", CompanyName = "Bon app'", Version = 1 }

[response]
status = 201

[response.headers]
Content-Type = "application/json"

[response.body]
CustomerId = "BONAP"
CompanyName = "Bon app'"
Version = 1

[expect]
outcome = "pass"

[config]
checks = ["status_code", "content_type", "data"]
"#);
        assert_eq!(verdict.verdict, Verdict::Pass, "failure: {:?}", verdict.failure);
    }

    #[test]
    fn effect_on_unknown_set_is_a_structural_error() {
        let case = CaseFile::parse_str(r#"
[case]
id = "bad-set"
description = "effect targets a set the workspace does not expose"

[request]
method = "PUT"
uri = "/Customers('ALFKI')"

[[effect.update]]
set = "Nope"
key = ["ALFKI"]
tree = { Version = 2 }

[response]
status = 204

[expect]
outcome = "pass"
"#).expect("case parses");
        let err = run_case(&case, &RegistryConfig::default()).expect_err("unknown set");
        assert!(err.to_string().contains("unknown set"));
    }
}
