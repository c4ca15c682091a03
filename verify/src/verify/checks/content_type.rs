//! Content-Type header assertion.

use std::rc::Rc;

use crate::error::VerifyError;
use crate::http::{Request, Response};
use crate::verify::{ResponseVerifier, VerificationContext, dump};

/// Asserts the `Content-Type` header matches the service's media type,
/// and that no-content statuses omit the header entirely.
pub struct ContentTypeVerifier {
    expected: String,
}

impl ContentTypeVerifier {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl ResponseVerifier for ContentTypeVerifier {
    fn name(&self) -> &str {
        "content_type"
    }

    fn verify(
        &self,
        request: &Rc<Request>,
        response: &Response,
        _context: &VerificationContext,
    ) -> Result<(), VerifyError> {
        let observed = response.header("Content-Type");

        if response.status.expects_empty_body() {
            if let Some(content_type) = observed {
                let message = format!(
                    "response with status {} must not carry a Content-Type header, found {content_type}",
                    response.status
                );
                return Err(dump::fail(self.name(), request, response, message));
            }
            return Ok(());
        }

        // A bodyless success (e.g. a raw-value read of null) may omit the
        // header.
        if response.body.is_none() && observed.is_none() {
            return Ok(());
        }

        let Some(content_type) = observed else {
            let message = format!(
                "missing Content-Type header on a response with a body, expected {}",
                self.expected
            );
            return Err(dump::fail(self.name(), request, response, message));
        };

        let media_type = content_type.split(';').next().map_or(content_type, str::trim);
        if media_type != self.expected {
            let message = format!(
                "expected Content-Type {} but found {content_type}",
                self.expected
            );
            return Err(dump::fail(self.name(), request, response, message));
        }
        Ok(())
    }
}
