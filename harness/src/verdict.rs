//! Verdict classification.
//!
//! A case declares whether its pair should verify cleanly or fail with a
//! particular message; the verdict compares what actually happened against
//! that declaration. `Error` is reserved for structural harness failures
//! (unloadable case, uninterpretable scenario) and is assigned by the run
//! orchestration, not here.

use serde::{Deserialize, Serialize};

use verify::error::VerificationFailure;

use crate::case::{Expectation, ExpectedOutcome};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    Error,
}

/// Classify a finished verification pass against the case's expectation.
pub fn classify(expect: &Expectation, result: &Result<(), VerificationFailure>) -> Verdict {
    match (expect.outcome, result) {
        (ExpectedOutcome::Pass, Ok(())) => Verdict::Pass,
        (ExpectedOutcome::Pass, Err(_)) => Verdict::Fail,
        (ExpectedOutcome::Fail, Ok(())) => Verdict::Fail,
        (ExpectedOutcome::Fail, Err(failure)) => {
            if let Some(verifier) = &expect.verifier
                && failure.verifier != *verifier
            {
                return Verdict::Fail;
            }
            let text = failure.to_string();
            if expect
                .message_contains
                .iter()
                .all(|needle| text.contains(needle))
            {
                Verdict::Pass
            } else {
                Verdict::Fail
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_fail(verifier: Option<&str>, contains: &[&str]) -> Expectation {
        Expectation {
            outcome: ExpectedOutcome::Fail,
            status: None,
            verifier: verifier.map(str::to_string),
            message_contains: contains.iter().map(|needle| needle.to_string()).collect(),
        }
    }

    fn expect_pass() -> Expectation {
        Expectation {
            outcome: ExpectedOutcome::Pass,
            status: None,
            verifier: None,
            message_contains: Vec::new(),
        }
    }

    fn failure(verifier: &str, message: &str) -> Result<(), VerificationFailure> {
        Err(VerificationFailure::new(verifier, message))
    }

    #[test]
    fn clean_pass_matches_expected_pass() {
        assert_eq!(classify(&expect_pass(), &Ok(())), Verdict::Pass);
    }

    #[test]
    fn unexpected_failure_is_a_fail() {
        let result = failure("status_code", "expected 204 but found 200");
        assert_eq!(classify(&expect_pass(), &result), Verdict::Fail);
    }

    #[test]
    fn expected_failure_must_actually_fail() {
        assert_eq!(classify(&expect_fail(None, &[]), &Ok(())), Verdict::Fail);
    }

    #[test]
    fn expected_failure_matches_substrings() {
        let result = failure("status_code", "expected status 204 but response returned 200");
        assert_eq!(
            classify(&expect_fail(None, &["204", "200"]), &result),
            Verdict::Pass
        );
        assert_eq!(
            classify(&expect_fail(None, &["418"]), &result),
            Verdict::Fail
        );
    }

    #[test]
    fn expected_failure_matches_verifier_name() {
        let result = failure("etag", "missing ETag header");
        assert_eq!(
            classify(&expect_fail(Some("etag"), &["missing"]), &result),
            Verdict::Pass
        );
        assert_eq!(
            classify(&expect_fail(Some("status_code"), &["missing"]), &result),
            Verdict::Fail
        );
    }
}
