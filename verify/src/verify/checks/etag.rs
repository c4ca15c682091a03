//! ETag header assertion.
//!
//! The service derives weak ETags from a type's concurrency-token
//! properties. The expectation is recomputed from the reference entity:
//! `W/"<hex sha256 of the canonical JSON array of token values>"`, which
//! keeps the expectation independent of the token's wire representation.

use std::rc::Rc;

use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::VerifyError;
use crate::http::{Request, Response};
use crate::model::{ResourceType, Workspace};
use crate::store::Row;
use crate::uri;
use crate::verify::{ResponseVerifier, Selective, VerificationContext, checks, dump};

/// Asserts the `ETag` header equals the value derived from the reference
/// entity's concurrency tokens.
///
/// Selective: applies only when the request addresses a single entity (or
/// creates one) whose type declares concurrency tokens.
pub struct EtagVerifier {
    workspace: Rc<Workspace>,
}

impl EtagVerifier {
    pub fn new(workspace: Rc<Workspace>) -> Self {
        Self { workspace }
    }
}

/// Expected weak ETag for a row of the given type.
pub fn expected_etag(rtype: &ResourceType, row: &Row) -> Result<String> {
    let tokens: Vec<&Value> = rtype
        .concurrency_properties()
        .map(|prop| row.get(&prop.name).unwrap_or(&Value::Null))
        .collect();
    let canonical = serde_json::to_string(&tokens).context("serialize concurrency tokens")?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("W/\"{}\"", hex::encode(hasher.finalize())))
}

impl Selective for EtagVerifier {
    fn applies_to_request(&self, request: &Request) -> bool {
        let Ok(target) = uri::parse(&request.uri) else {
            return false;
        };
        let Ok(set) = target.target_set(&self.workspace) else {
            return false;
        };
        let Some(rtype) = self.workspace.resource_type(&set.resource_type) else {
            return false;
        };
        if !rtype.has_concurrency_tokens() {
            return false;
        }
        request.method.is_creation() || (target.key.is_some() && target.navigation.is_none())
    }

    fn applies_to_response(&self, _response: &Response) -> bool {
        true
    }
}

impl ResponseVerifier for EtagVerifier {
    fn name(&self) -> &str {
        "etag"
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
        let entity = checks::expected_entity(request, context)?;
        let target = uri::parse(&request.uri)?;
        let set = target.target_set(context.workspace())?;
        let rtype = context
            .workspace()
            .resource_type(&set.resource_type)
            .with_context(|| format!("unknown resource type {}", set.resource_type))?;
        let expected = expected_etag(rtype, &entity)?;

        match response.header("ETag") {
            None => {
                let message = format!("missing ETag header, expected {expected}");
                Err(dump::fail(self.name(), request, response, message))
            }
            Some(observed) if observed != expected => {
                let message = format!("expected ETag {expected} but found {observed}");
                Err(dump::fail(self.name(), request, response, message))
            }
            Some(_) => Ok(()),
        }
    }
}
