//! Payload data assertion against the reference evaluator.
//!
//! Compares every declared property of the targeted type between the
//! response payload and the reference entity: the context's inserted
//! entity for creation requests, the post-update entity for update
//! requests, the current store row otherwise.

use std::rc::Rc;

use anyhow::{Context, anyhow};
use serde_json::Value;

use crate::error::VerifyError;
use crate::http::{Request, Response};
use crate::model::Workspace;
use crate::uri;
use crate::verify::{ResponseVerifier, Selective, VerificationContext, checks, dump};

/// Asserts single-entity payload values equal the reference entity's.
///
/// Selective: applies to single-entity requests (addressed, created, or
/// updated) whose responses carry a body.
pub struct DataVerifier {
    workspace: Rc<Workspace>,
}

impl DataVerifier {
    pub fn new(workspace: Rc<Workspace>) -> Self {
        Self { workspace }
    }
}

impl Selective for DataVerifier {
    fn applies_to_request(&self, request: &Request) -> bool {
        let Ok(target) = uri::parse(&request.uri) else {
            return false;
        };
        if target.target_set(&self.workspace).is_err() {
            return false;
        }
        request.method.is_creation()
            || request.method.is_update()
            || (target.key.is_some() && target.navigation.is_none())
    }

    fn applies_to_response(&self, response: &Response) -> bool {
        response.body.is_some()
    }
}

impl ResponseVerifier for DataVerifier {
    fn name(&self) -> &str {
        "data"
    }

    fn selective(&self) -> Option<&dyn Selective> {
        Some(self)
    }

    fn verify(
        &self,
        request: &Rc<Request>,
        response: &Response,
        context: &VerificationContext,
    ) -> Result<(), VerifyError> {
        let expected = checks::expected_entity(request, context)?;
        let target = uri::parse(&request.uri)?;
        let set = target.target_set(context.workspace())?;
        let rtype = context
            .workspace()
            .type_of_set(&set.name)
            .with_context(|| format!("no resource type for set {}", set.name))?;

        let entities = checks::entity_objects(response.body.as_ref())?;
        let [entity] = entities.as_slice() else {
            return Err(VerifyError::Harness(anyhow!(
                "expected a single-entity payload, found {} entities",
                entities.len()
            )));
        };

        for prop in rtype.properties() {
            let expected_value = expected.get(&prop.name).cloned().unwrap_or(Value::Null);
            match entity.get(&prop.name) {
                None => {
                    let message = format!("payload missing property {}", prop.name);
                    return Err(dump::fail(self.name(), request, response, message));
                }
                Some(observed) if *observed != expected_value => {
                    let message = format!(
                        "property {}: expected {expected_value} but found {observed}",
                        prop.name
                    );
                    return Err(dump::fail(self.name(), request, response, message));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, StatusCode};
    use crate::model::sample;
    use crate::store::Row;
    use crate::test_support::{context_over, request, response_with, row, seeded_store};
    use serde_json::json;

    fn verifier() -> DataVerifier {
        DataVerifier::new(Rc::new(sample::customers_orders()))
    }

    fn customer_row() -> Row {
        row(&[
            ("CustomerId", json!("ALFKI")),
            ("CompanyName", json!("Alfreds")),
            ("Version", json!(1)),
        ])
    }

    #[test]
    fn read_payload_matching_the_store_passes() {
        let context = context_over(seeded_store("Customers", vec![customer_row()]));
        let req = request(Method::Get, "/Customers('ALFKI')");
        let _scope = context.begin(&req);
        let resp = response_with(
            StatusCode::OK,
            &[],
            Some(json!({
                "CustomerId": "ALFKI",
                "CompanyName": "Alfreds",
                "Version": 1,
            })),
        );
        verifier().verify(&req, &resp, &context).expect("values match");
    }

    #[test]
    fn mismatched_property_fails_with_both_values() {
        let context = context_over(seeded_store("Customers", vec![customer_row()]));
        let req = request(Method::Get, "/Customers('ALFKI')");
        let _scope = context.begin(&req);
        let resp = response_with(
            StatusCode::OK,
            &[],
            Some(json!({
                "CustomerId": "ALFKI",
                "CompanyName": "Wrong Name",
                "Version": 1,
            })),
        );
        let err = verifier().verify(&req, &resp, &context).expect_err("mismatch");
        assert!(err.to_string().contains("Alfreds"));
        assert!(err.to_string().contains("Wrong Name"));
    }

    #[test]
    fn missing_property_fails() {
        let context = context_over(seeded_store("Customers", vec![customer_row()]));
        let req = request(Method::Get, "/Customers('ALFKI')");
        let _scope = context.begin(&req);
        let resp = response_with(StatusCode::OK, &[], Some(json!({"CustomerId": "ALFKI"})));
        let err = verifier().verify(&req, &resp, &context).expect_err("missing");
        assert!(err.to_string().contains("missing property"));
    }

    #[test]
    fn creation_payload_is_checked_against_the_inserted_entity() {
        let store = seeded_store("Customers", vec![customer_row()]);
        let context = context_over(store.clone());
        let req = request(Method::Post, "/Customers");
        let _scope = context.begin(&req);

        store.borrow_mut().insert(
            "Customers",
            row(&[
                ("CustomerId", json!("BONAP")),
                ("CompanyName", json!("Bon app'")),
                ("Version", json!(1)),
            ]),
        );

        let resp = response_with(
            StatusCode::CREATED,
            &[],
            Some(json!({
                "CustomerId": "BONAP",
                "CompanyName": "Bon app'",
                "Version": 1,
            })),
        );
        verifier().verify(&req, &resp, &context).expect("matches insert");
    }

    #[test]
    fn update_payload_is_checked_against_the_after_entity() {
        let store = seeded_store("Customers", vec![customer_row()]);
        let context = context_over(store.clone());
        let req = request(Method::Put, "/Customers('ALFKI')");
        let _scope = context.begin(&req);

        store
            .borrow_mut()
            .update(
                "Customers",
                &["CustomerId"],
                &[json!("ALFKI")],
                &json!({"CompanyName": "Alfreds Futterkiste", "Version": 2}),
            )
            .expect("effect");

        let stale = response_with(
            StatusCode::OK,
            &[],
            Some(json!({
                "CustomerId": "ALFKI",
                "CompanyName": "Alfreds",
                "Version": 1,
            })),
        );
        let err = verifier().verify(&req, &stale, &context).expect_err("stale payload");
        assert!(err.to_string().contains("Alfreds Futterkiste"));
    }

    #[test]
    fn collection_payloads_are_structural_errors() {
        let context = context_over(seeded_store("Customers", vec![customer_row()]));
        let req = request(Method::Get, "/Customers('ALFKI')");
        let _scope = context.begin(&req);
        let resp = response_with(StatusCode::OK, &[], Some(json!({"value": [{}, {}]})));
        let err = verifier().verify(&req, &resp, &context).expect_err("two entities");
        assert!(matches!(err, VerifyError::Harness(_)));
    }
}
