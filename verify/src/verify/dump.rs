//! Failure-time request/response dump.
//!
//! Every failure is preceded by exactly one dump of the pair being
//! verified: assertion failures dump here at the raising check, harness
//! errors dump at the composite. Output goes to the tracing log at `warn`.

use serde_json::Value;
use tracing::warn;

use crate::error::{VerificationFailure, VerifyError};
use crate::http::{Request, Response};

/// Truncate dumped bodies beyond this many characters.
const BODY_LIMIT: usize = 2048;

/// Write the request/response state to the log.
pub fn report_failure(request: &Request, response: &Response, detail: &str) {
    warn!(
        method = %request.method,
        uri = %request.uri,
        status = %response.status,
        detail,
        "verification failure"
    );
    warn!(
        request_headers = ?request.headers,
        request_body = %render_body(request.body.as_ref()),
        response_headers = ?response.headers,
        response_body = %render_body(response.body.as_ref()),
        "pair state at failure"
    );
}

/// Report the pair state, then build the uniform assertion failure.
///
/// Checks return this from their mismatch paths so every
/// [`VerificationFailure`] is preceded by exactly one dump.
pub fn fail(name: &str, request: &Request, response: &Response, message: String) -> VerifyError {
    report_failure(request, response, &message);
    VerificationFailure::new(name, message).into()
}

fn render_body(body: Option<&Value>) -> String {
    let Some(body) = body else {
        return "<none>".to_string();
    };
    let mut rendered = body.to_string();
    if rendered.len() > BODY_LIMIT {
        // Walk back to a char boundary; byte BODY_LIMIT may fall inside a
        // multibyte character.
        let mut end = BODY_LIMIT;
        while !rendered.is_char_boundary(end) {
            end -= 1;
        }
        rendered.truncate(end);
        rendered.push_str("...<truncated>");
    }
    rendered
}
