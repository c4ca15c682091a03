//! Status-code assertion.

use std::rc::Rc;

use crate::error::VerifyError;
use crate::http::{Request, Response, StatusCode};
use crate::verify::{ResponseVerifier, VerificationContext, dump};

/// Asserts the response status equals the expected code for the scenario.
pub struct StatusCodeVerifier {
    expected: StatusCode,
}

impl StatusCodeVerifier {
    pub fn new(expected: StatusCode) -> Self {
        Self { expected }
    }
}

impl ResponseVerifier for StatusCodeVerifier {
    fn name(&self) -> &str {
        "status_code"
    }

    fn verify(
        &self,
        request: &Rc<Request>,
        response: &Response,
        _context: &VerificationContext,
    ) -> Result<(), VerifyError> {
        if response.status != self.expected {
            let message = format!(
                "expected status {} but response returned {}",
                self.expected, response.status
            );
            return Err(dump::fail(self.name(), request, response, message));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VerifyError;
    use crate::http::Method;
    use crate::test_support::{empty_context, request, response};

    #[test]
    fn passes_on_matching_status() {
        let verifier = StatusCodeVerifier::new(StatusCode::NO_CONTENT);
        let context = empty_context();
        let req = request(Method::Delete, "/Customers('ALFKI')");
        verifier
            .verify(&req, &response(StatusCode::NO_CONTENT), &context)
            .expect("204 matches");
    }

    #[test]
    fn failure_names_both_codes() {
        let verifier = StatusCodeVerifier::new(StatusCode::NO_CONTENT);
        let context = empty_context();
        let req = request(Method::Delete, "/Customers('ALFKI')");
        let err = verifier
            .verify(&req, &response(StatusCode::OK), &context)
            .expect_err("mismatch");
        match err {
            VerifyError::Failure(failure) => {
                assert!(failure.message.contains("204"));
                assert!(failure.message.contains("200"));
            }
            VerifyError::Harness(_) => panic!("expected assertion failure"),
        }
    }
}
