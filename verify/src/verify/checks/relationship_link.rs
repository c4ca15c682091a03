//! Relationship (association) link assertion.
//!
//! Entity payloads annotate navigation properties with
//! `<nav>@odata.navigationLink`. Each present annotation must match the
//! canonical shape `<entity uri>/$links/<nav>` derived from the workspace
//! metadata. Projected payloads may omit annotations; absence is not a
//! failure.

use std::rc::Rc;

use anyhow::Context;
use serde_json::{Map, Value};

use crate::error::VerifyError;
use crate::http::{Request, Response};
use crate::model::{ResourceType, Workspace};
use crate::uri;
use crate::verify::{ResponseVerifier, Selective, VerificationContext, checks, dump};

/// Asserts navigation-link annotations against the canonical `$links`
/// shape.
///
/// Selective: applies only when the targeted type declares navigations and
/// the response has a body.
pub struct RelationshipLinkVerifier {
    workspace: Rc<Workspace>,
}

impl RelationshipLinkVerifier {
    pub fn new(workspace: Rc<Workspace>) -> Self {
        Self { workspace }
    }
}

impl Selective for RelationshipLinkVerifier {
    fn applies_to_request(&self, request: &Request) -> bool {
        let Ok(target) = uri::parse(&request.uri) else {
            return false;
        };
        let Ok(set) = target.target_set(&self.workspace) else {
            return false;
        };
        self.workspace
            .resource_type(&set.resource_type)
            .is_some_and(|rtype| !rtype.navigations().is_empty())
    }

    fn applies_to_response(&self, response: &Response) -> bool {
        response.body.is_some()
    }
}

impl ResponseVerifier for RelationshipLinkVerifier {
    fn name(&self) -> &str {
        "relationship_link"
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
        let rtype = context
            .workspace()
            .type_of_set(&set.name)
            .with_context(|| format!("no resource type for set {}", set.name))?;

        for entity in checks::entity_objects(response.body.as_ref())? {
            let base = entity_base_uri(&set.name, rtype, entity)?;
            for nav in rtype.navigations() {
                let annotation = format!("{}@odata.navigationLink", nav.name);
                let Some(observed) = entity.get(&annotation).and_then(Value::as_str) else {
                    continue;
                };
                let expected = format!("{base}/$links/{}", nav.name);
                if observed != expected {
                    let message = format!(
                        "navigation link {}: expected {expected} but found {observed}",
                        nav.name
                    );
                    return Err(dump::fail(self.name(), request, response, message));
                }
            }
        }
        Ok(())
    }
}

fn entity_base_uri(
    set: &str,
    rtype: &ResourceType,
    entity: &Map<String, Value>,
) -> anyhow::Result<String> {
    let key_values = rtype
        .key_names()
        .into_iter()
        .map(|name| {
            entity
                .get(name)
                .cloned()
                .with_context(|| format!("payload entity missing key property {name}"))
        })
        .collect::<anyhow::Result<Vec<Value>>>()?;
    Ok(uri::entity_uri(set, &key_values))
}
