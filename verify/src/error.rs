//! Failure taxonomy for the verification pipeline.
//!
//! Two kinds of failure leave a verifier:
//!
//! - [`VerificationFailure`]: an expected/actual mismatch. A product defect.
//!   The raising check reports diagnostic context before constructing one,
//!   so the composite re-wraps these without re-reporting.
//! - A structural harness error (`anyhow`): a bug in the harness or an
//!   unsupported scenario, e.g. a payload shape the harness cannot
//!   interpret. The composite reports it once, then wraps it into a
//!   [`VerificationFailure`] so the caller sees one uniform failure type.

use thiserror::Error;

/// Assertion failure raised when an observed response value does not match
/// the expectation computed from the reference model.
#[derive(Debug, Error)]
#[error("{verifier}: {message}")]
pub struct VerificationFailure {
    /// Name of the verifier that raised the failure.
    pub verifier: String,
    /// Expected/actual description, stable enough to assert on.
    pub message: String,
    /// Original cause when this failure wraps another error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl VerificationFailure {
    pub fn new(verifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            verifier: verifier.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        verifier: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            verifier: verifier.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Error surface of a single verifier invocation.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Expected/actual mismatch, already reported by the raising check.
    #[error(transparent)]
    Failure(#[from] VerificationFailure),
    /// Structural harness error, not yet reported.
    #[error(transparent)]
    Harness(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_display_includes_verifier_and_message() {
        let failure = VerificationFailure::new("status_code", "expected 204 but found 200");
        assert_eq!(failure.to_string(), "status_code: expected 204 but found 200");
    }

    #[test]
    fn wrapped_failure_preserves_cause() {
        let inner = VerificationFailure::new("etag", "missing ETag header");
        let outer = VerificationFailure::with_source("composite", "verification failed", inner);
        let source = outer.source.as_ref().expect("source");
        assert!(source.to_string().contains("missing ETag header"));
    }

    #[test]
    fn harness_errors_convert_via_question_mark() {
        fn structural() -> Result<(), VerifyError> {
            Err(anyhow::anyhow!("unsupported payload shape"))?
        }
        match structural() {
            Err(VerifyError::Harness(err)) => {
                assert!(err.to_string().contains("unsupported payload shape"));
            }
            other => panic!("expected harness error, got {other:?}"),
        }
    }
}
