//! Composite dispatch over an ordered set of verifiers.

use std::rc::Rc;

use tracing::debug;

use crate::error::{VerificationFailure, VerifyError};
use crate::http::{Request, Response};
use crate::verify::{ResponseVerifier, VerificationContext, dump};

/// Runs every applicable member verifier against one request/response
/// pair, in registration order.
///
/// Order does not affect correctness (members are independent) but does
/// decide which failure is reported first: the pass terminates on the
/// first failing member and later members do not run.
pub struct CompositeVerifier {
    verifiers: Vec<Box<dyn ResponseVerifier>>,
}

impl CompositeVerifier {
    pub fn new(verifiers: Vec<Box<dyn ResponseVerifier>>) -> Self {
        Self { verifiers }
    }

    pub fn push(&mut self, verifier: Box<dyn ResponseVerifier>) {
        self.verifiers.push(verifier);
    }

    pub fn len(&self) -> usize {
        self.verifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verifiers.is_empty()
    }

    /// Run one verification pass.
    ///
    /// A context scope is opened before iterating and closed when this
    /// returns, success or failure. Assertion failures from members are
    /// re-wrapped with the member's name, preserving the original cause;
    /// they were already reported by the raising check and are not
    /// re-reported here. Harness errors are reported once, here, then
    /// wrapped so the caller sees one uniform failure type.
    pub fn verify(
        &self,
        request: &Rc<Request>,
        response: &Response,
        context: &VerificationContext,
    ) -> Result<(), VerificationFailure> {
        let _scope = context.begin(request);

        for verifier in &self.verifiers {
            if let Some(selective) = verifier.selective() {
                if !selective.applies_to_request(request) {
                    debug!(verifier = verifier.name(), "skipped, request not applicable");
                    continue;
                }
                if !selective.applies_to_response(response) {
                    debug!(verifier = verifier.name(), "skipped, response not applicable");
                    continue;
                }
            }

            debug!(verifier = verifier.name(), "running verifier");
            match verifier.verify(request, response, context) {
                Ok(()) => {}
                Err(VerifyError::Failure(failure)) => {
                    let message = failure.message.clone();
                    return Err(VerificationFailure::with_source(
                        verifier.name(),
                        message,
                        failure,
                    ));
                }
                Err(VerifyError::Harness(err)) => {
                    let message = format!("unexpected error in verifier: {err:#}");
                    dump::report_failure(request, response, &message);
                    return Err(VerificationFailure::with_source(
                        verifier.name(),
                        message,
                        Box::<dyn std::error::Error + Send + Sync>::from(err),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use anyhow::anyhow;

    use super::*;
    use crate::http::{Method, StatusCode};
    use crate::test_support::{empty_context, request, response};
    use crate::verify::DelegatedVerifier;

    fn recording(
        name: &str,
        calls: &Rc<RefCell<Vec<String>>>,
        result: impl Fn() -> Result<(), VerifyError> + 'static,
    ) -> Box<dyn ResponseVerifier> {
        let calls = calls.clone();
        let name_owned = name.to_string();
        Box::new(DelegatedVerifier::new(name, move |_, _, _| {
            calls.borrow_mut().push(name_owned.clone());
            result()
        }))
    }

    #[test]
    fn runs_members_in_registration_order() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let composite = CompositeVerifier::new(vec![
            recording("a", &calls, || Ok(())),
            recording("b", &calls, || Ok(())),
            recording("c", &calls, || Ok(())),
        ]);

        let context = empty_context();
        let req = request(Method::Get, "/Customers");
        composite
            .verify(&req, &response(StatusCode::OK), &context)
            .expect("pass");
        assert_eq!(*calls.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn first_failure_stops_the_pass() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let composite = CompositeVerifier::new(vec![
            recording("a", &calls, || Ok(())),
            recording("b", &calls, || {
                Err(crate::error::VerificationFailure::new("b", "expected 204 but found 200").into())
            }),
            recording("c", &calls, || Ok(())),
        ]);

        let context = empty_context();
        let req = request(Method::Get, "/Customers");
        let failure = composite
            .verify(&req, &response(StatusCode::OK), &context)
            .expect_err("b fails");

        assert_eq!(*calls.borrow(), vec!["a", "b"]);
        assert_eq!(failure.verifier, "b");
        assert!(failure.message.contains("204"));
        let source = failure.source.as_ref().expect("cause preserved");
        assert!(source.to_string().contains("expected 204"));
    }

    #[test]
    fn harness_errors_are_wrapped_as_failures() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let composite = CompositeVerifier::new(vec![recording("broken", &calls, || {
            Err(VerifyError::Harness(anyhow!("payload shape not understood")))
        })]);

        let context = empty_context();
        let req = request(Method::Get, "/Customers");
        let failure = composite
            .verify(&req, &response(StatusCode::OK), &context)
            .expect_err("wrapped");
        assert_eq!(failure.verifier, "broken");
        assert!(failure.message.contains("unexpected error"));
        assert!(failure.message.contains("payload shape not understood"));
    }

    #[test]
    fn inapplicable_members_are_never_invoked() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let tracked = calls.clone();
        let selective = DelegatedVerifier::new("selective", move |_, _, _| {
            tracked.borrow_mut().push("selective".to_string());
            Ok(())
        })
        .when_request(|request| request.method == Method::Post)
        .when_response(|_| true);

        let composite = CompositeVerifier::new(vec![
            Box::new(selective),
            recording("always", &calls, || Ok(())),
        ]);

        let context = empty_context();
        let req = request(Method::Get, "/Customers");
        composite
            .verify(&req, &response(StatusCode::OK), &context)
            .expect("pass");
        assert_eq!(*calls.borrow(), vec!["always"]);
    }

    #[test]
    fn response_predicate_short_circuits_after_request_predicate() {
        let request_checked = Rc::new(RefCell::new(false));
        let response_checked = Rc::new(RefCell::new(false));
        let req_flag = request_checked.clone();
        let resp_flag = response_checked.clone();

        let verifier = DelegatedVerifier::new("selective", |_, _, _| Ok(()))
            .when_request(move |_| {
                *req_flag.borrow_mut() = true;
                false
            })
            .when_response(move |_| {
                *resp_flag.borrow_mut() = true;
                true
            });

        let composite = CompositeVerifier::new(vec![Box::new(verifier)]);
        let context = empty_context();
        let req = request(Method::Get, "/Customers");
        composite
            .verify(&req, &response(StatusCode::OK), &context)
            .expect("pass");
        assert!(*request_checked.borrow());
        assert!(!*response_checked.borrow());
    }

    #[test]
    fn scope_is_released_after_a_failing_pass() {
        let composite = CompositeVerifier::new(vec![Box::new(DelegatedVerifier::new(
            "fails",
            |_, _, _| Err(crate::error::VerificationFailure::new("fails", "nope").into()),
        ))]);

        let context = empty_context();
        let req = request(Method::Post, "/Customers");
        composite
            .verify(&req, &response(StatusCode::CREATED), &context)
            .expect_err("fails");

        // A fresh pass over the same request must be able to open its own
        // scope again; inserted_entity before begin still errors.
        let err = context.inserted_entity(&req).expect_err("scope closed");
        assert!(err.to_string().contains("begin was not called"));
    }
}
