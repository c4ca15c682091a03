//! Prefer/Preference-Applied header assertion.

use std::rc::Rc;

use anyhow::anyhow;

use crate::error::VerifyError;
use crate::http::{Request, Response};
use crate::verify::{ResponseVerifier, Selective, VerificationContext, dump};

/// Asserts the service honored the request's `Prefer` header: the
/// `Preference-Applied` echo must be present, and the body must be present
/// for `return-content` and absent for `return-no-content`.
///
/// Selective: applies only to requests carrying a `Prefer` header.
pub struct PreferHeaderVerifier;

impl Selective for PreferHeaderVerifier {
    fn applies_to_request(&self, request: &Request) -> bool {
        request.header("Prefer").is_some()
    }

    fn applies_to_response(&self, _response: &Response) -> bool {
        true
    }
}

impl ResponseVerifier for PreferHeaderVerifier {
    fn name(&self) -> &str {
        "prefer_header"
    }

    fn selective(&self) -> Option<&dyn Selective> {
        Some(self)
    }

    fn verify(
        &self,
        request: &Rc<Request>,
        response: &Response,
        _context: &VerificationContext,
    ) -> Result<(), VerifyError> {
        let Some(prefer) = request.header("Prefer") else {
            // Applicability guards this, but a composite-less caller may not.
            return Ok(());
        };

        if prefer != "return-content" && prefer != "return-no-content" {
            return Err(VerifyError::Harness(anyhow!(
                "unsupported Prefer value {prefer}"
            )));
        }

        let Some(applied) = response.header("Preference-Applied") else {
            let message = format!("missing Preference-Applied header for Prefer: {prefer}");
            return Err(dump::fail(self.name(), request, response, message));
        };
        if applied != prefer {
            let message =
                format!("Preference-Applied {applied} does not echo the requested Prefer {prefer}");
            return Err(dump::fail(self.name(), request, response, message));
        }

        match prefer {
            "return-content" if response.body.is_none() => {
                let message = "response body missing although return-content was applied".to_string();
                Err(dump::fail(self.name(), request, response, message))
            }
            "return-no-content" if response.body.is_some() => {
                let message = "response carries a body although return-no-content was applied"
                    .to_string();
                Err(dump::fail(self.name(), request, response, message))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, StatusCode};
    use crate::test_support::{empty_context, request, request_with_headers, response, response_with};
    use serde_json::json;

    #[test]
    fn applies_only_when_prefer_is_present() {
        let verifier = PreferHeaderVerifier;
        assert!(!verifier.applies_to_request(&request(Method::Post, "/Customers")));
        assert!(verifier.applies_to_request(&request_with_headers(
            Method::Post,
            "/Customers",
            &[("Prefer", "return-content")],
        )));
    }

    #[test]
    fn missing_echo_fails() {
        let context = empty_context();
        let req = request_with_headers(Method::Post, "/Customers", &[("Prefer", "return-content")]);
        let err = PreferHeaderVerifier
            .verify(&req, &response(StatusCode::CREATED), &context)
            .expect_err("no echo");
        assert!(err.to_string().contains("missing Preference-Applied"));
    }

    #[test]
    fn return_content_demands_a_body() {
        let context = empty_context();
        let req = request_with_headers(Method::Post, "/Customers", &[("Prefer", "return-content")]);

        let without_body = response_with(
            StatusCode::CREATED,
            &[("Preference-Applied", "return-content")],
            None,
        );
        let err = PreferHeaderVerifier
            .verify(&req, &without_body, &context)
            .expect_err("body required");
        assert!(err.to_string().contains("body missing"));

        let with_body = response_with(
            StatusCode::CREATED,
            &[("Preference-Applied", "return-content")],
            Some(json!({"CustomerId": "ALFKI"})),
        );
        PreferHeaderVerifier
            .verify(&req, &with_body, &context)
            .expect("honored");
    }

    #[test]
    fn return_no_content_forbids_a_body() {
        let context = empty_context();
        let req = request_with_headers(
            Method::Put,
            "/Customers('ALFKI')",
            &[("Prefer", "return-no-content")],
        );
        let resp = response_with(
            StatusCode::NO_CONTENT,
            &[("Preference-Applied", "return-no-content")],
            Some(json!({})),
        );
        let err = PreferHeaderVerifier
            .verify(&req, &resp, &context)
            .expect_err("body forbidden");
        assert!(err.to_string().contains("carries a body"));
    }

    #[test]
    fn unsupported_prefer_values_are_structural_errors() {
        let context = empty_context();
        let req = request_with_headers(Method::Post, "/Customers", &[("Prefer", "minimal")]);
        let err = PreferHeaderVerifier
            .verify(&req, &response(StatusCode::CREATED), &context)
            .expect_err("unsupported");
        assert!(matches!(err, VerifyError::Harness(_)));
    }
}
