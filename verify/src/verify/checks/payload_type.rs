//! Payload type-name assertion.

use std::rc::Rc;

use anyhow::Context;
use serde_json::Value;

use crate::error::VerifyError;
use crate::http::{Request, Response};
use crate::model::Workspace;
use crate::uri;
use crate::verify::{ResponseVerifier, Selective, VerificationContext, checks, dump};

/// Asserts every entity payload names the resource type the workspace maps
/// the request URI to, via its `odata.type` annotation.
///
/// Selective: applies to interpretable URIs on responses with a body.
pub struct PayloadTypeVerifier {
    workspace: Rc<Workspace>,
}

impl PayloadTypeVerifier {
    pub fn new(workspace: Rc<Workspace>) -> Self {
        Self { workspace }
    }
}

impl Selective for PayloadTypeVerifier {
    fn applies_to_request(&self, request: &Request) -> bool {
        uri::parse(&request.uri)
            .ok()
            .is_some_and(|target| target.target_set(&self.workspace).is_ok())
    }

    fn applies_to_response(&self, response: &Response) -> bool {
        response.body.is_some()
    }
}

impl ResponseVerifier for PayloadTypeVerifier {
    fn name(&self) -> &str {
        "payload_type"
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
        let target = uri::parse(&request.uri)?;
        let set = target.target_set(context.workspace())?;
        let expected = &context
            .workspace()
            .type_of_set(&set.name)
            .with_context(|| format!("no resource type for set {}", set.name))?
            .name;

        for entity in checks::entity_objects(response.body.as_ref())? {
            match entity.get("odata.type").and_then(Value::as_str) {
                None => {
                    let message =
                        format!("payload entity missing odata.type, expected {expected}");
                    return Err(dump::fail(self.name(), request, response, message));
                }
                Some(observed) if observed != expected => {
                    let message =
                        format!("expected payload type {expected} but found {observed}");
                    return Err(dump::fail(self.name(), request, response, message));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
