//! Next-link (pagination continuation) assertion.
//!
//! The expected continuation URI is regenerated deterministically from the
//! request and the page contents: when the page holds exactly the set's
//! page limit of rows, the payload must carry
//! `<request path>?$skiptoken=<key literals of the last row>`; otherwise it
//! must carry no next link.

use std::rc::Rc;

use anyhow::{Context, anyhow};
use serde_json::{Map, Value};

use crate::error::VerifyError;
use crate::http::{Method, Request, Response};
use crate::model::Workspace;
use crate::uri;
use crate::verify::{ResponseVerifier, Selective, VerificationContext, dump};

/// Asserts the payload's `odata.nextLink` against the regenerated
/// expectation.
///
/// Selective: applies only to GET requests targeting a collection.
pub struct NextLinkVerifier {
    workspace: Rc<Workspace>,
}

impl NextLinkVerifier {
    pub fn new(workspace: Rc<Workspace>) -> Self {
        Self { workspace }
    }
}

impl Selective for NextLinkVerifier {
    fn applies_to_request(&self, request: &Request) -> bool {
        if request.method != Method::Get {
            return false;
        }
        uri::parse(&request.uri).is_ok_and(|target| target.is_collection(&self.workspace))
    }

    fn applies_to_response(&self, response: &Response) -> bool {
        response.body.is_some()
    }
}

impl ResponseVerifier for NextLinkVerifier {
    fn name(&self) -> &str {
        "next_link"
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

        let payload = response
            .body
            .as_ref()
            .and_then(Value::as_object)
            .ok_or_else(|| anyhow!("collection payload is not a JSON object"))?;
        let rows = payload
            .get("value")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("collection payload has no value array"))?;

        let expected = match set.page_limit {
            Some(limit) if limit > 0 && rows.len() == limit => {
                let last = rows
                    .last()
                    .and_then(Value::as_object)
                    .ok_or_else(|| anyhow!("last page element is not an object"))?;
                Some(format!(
                    "{}?$skiptoken={}",
                    uri::without_query(&request.uri),
                    skiptoken(rtype.key_names(), last)?
                ))
            }
            _ => None,
        };
        let observed = payload.get("odata.nextLink").and_then(Value::as_str);

        match (expected, observed) {
            (None, None) => Ok(()),
            (Some(expected), Some(observed)) if expected == observed => Ok(()),
            (Some(expected), None) => {
                let message = format!("missing next link, expected {expected}");
                Err(dump::fail(self.name(), request, response, message))
            }
            (None, Some(observed)) => {
                let message = format!("unexpected next link {observed} on a final page");
                Err(dump::fail(self.name(), request, response, message))
            }
            (Some(expected), Some(observed)) => {
                let message = format!("expected next link {expected} but found {observed}");
                Err(dump::fail(self.name(), request, response, message))
            }
        }
    }
}

fn skiptoken(key_names: Vec<&str>, row: &Map<String, Value>) -> anyhow::Result<String> {
    let literals = key_names
        .into_iter()
        .map(|name| {
            row.get(name)
                .map(uri::key_literal)
                .with_context(|| format!("page row missing key property {name}"))
        })
        .collect::<anyhow::Result<Vec<String>>>()?;
    Ok(literals.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StatusCode;
    use crate::model::sample;
    use crate::test_support::{empty_context, request, response_with};
    use serde_json::json;

    fn verifier() -> NextLinkVerifier {
        NextLinkVerifier::new(Rc::new(sample::customers_orders()))
    }

    fn page(rows: Vec<Value>, next: Option<&str>) -> crate::http::Response {
        let mut body = json!({"value": rows});
        if let Some(next) = next {
            body["odata.nextLink"] = json!(next);
        }
        response_with(StatusCode::OK, &[], Some(body))
    }

    #[test]
    fn applies_only_to_collection_gets() {
        let verifier = verifier();
        assert!(verifier.applies_to_request(&request(Method::Get, "/Orders")));
        assert!(verifier.applies_to_request(&request(Method::Get, "/Customers('ALFKI')/Orders")));
        assert!(!verifier.applies_to_request(&request(Method::Get, "/Orders(7)")));
        assert!(!verifier.applies_to_request(&request(Method::Post, "/Orders")));
    }

    #[test]
    fn full_page_requires_matching_next_link() {
        // Orders is paged at 2.
        let rows = vec![json!({"OrderId": 1}), json!({"OrderId": 2})];
        let context = empty_context();
        let req = request(Method::Get, "/Orders");
        let _scope = context.begin(&req);

        verifier()
            .verify(&req, &page(rows.clone(), Some("/Orders?$skiptoken=2")), &context)
            .expect("regenerated link matches");

        let err = verifier()
            .verify(&req, &page(rows.clone(), None), &context)
            .expect_err("link required");
        assert!(err.to_string().contains("missing next link"));

        let err = verifier()
            .verify(&req, &page(rows, Some("/Orders?$skiptoken=9")), &context)
            .expect_err("wrong token");
        assert!(err.to_string().contains("expected next link"));
    }

    #[test]
    fn partial_page_forbids_next_link() {
        let rows = vec![json!({"OrderId": 1})];
        let context = empty_context();
        let req = request(Method::Get, "/Orders");
        let _scope = context.begin(&req);

        verifier()
            .verify(&req, &page(rows.clone(), None), &context)
            .expect("final page");

        let err = verifier()
            .verify(&req, &page(rows, Some("/Orders?$skiptoken=1")), &context)
            .expect_err("spurious link");
        assert!(err.to_string().contains("unexpected next link"));
    }

    #[test]
    fn string_keys_are_quoted_in_the_token() {
        // Customers is unpaged; drive the check through a paged set with a
        // string key by checking the literal rendering directly.
        assert_eq!(uri::key_literal(&json!("ALFKI")), "'ALFKI'");
        assert_eq!(uri::key_literal(&json!(7)), "7");
    }
}
