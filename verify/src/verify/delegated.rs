//! Verifier whose verify logic is supplied as a closure.
//!
//! The strategy form of the pipeline: a name, a verify function, and
//! optional applicability predicates. A delegated verifier with no
//! predicates does not expose the [`Selective`] capability and is treated
//! as universally applicable by the composite.

use std::rc::Rc;

use crate::error::VerifyError;
use crate::http::{Request, Response};
use crate::verify::{ResponseVerifier, Selective, VerificationContext};

type VerifyFn = dyn Fn(&Rc<Request>, &Response, &VerificationContext) -> Result<(), VerifyError>;
type RequestPredicate = dyn Fn(&Request) -> bool;
type ResponsePredicate = dyn Fn(&Response) -> bool;

pub struct DelegatedVerifier {
    name: String,
    verify: Box<VerifyFn>,
    request_predicate: Option<Box<RequestPredicate>>,
    response_predicate: Option<Box<ResponsePredicate>>,
}

impl DelegatedVerifier {
    pub fn new(
        name: impl Into<String>,
        verify: impl Fn(&Rc<Request>, &Response, &VerificationContext) -> Result<(), VerifyError>
        + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            verify: Box::new(verify),
            request_predicate: None,
            response_predicate: None,
        }
    }

    /// Restrict the verifier to requests matching the predicate.
    pub fn when_request(mut self, predicate: impl Fn(&Request) -> bool + 'static) -> Self {
        self.request_predicate = Some(Box::new(predicate));
        self
    }

    /// Restrict the verifier to responses matching the predicate.
    pub fn when_response(mut self, predicate: impl Fn(&Response) -> bool + 'static) -> Self {
        self.response_predicate = Some(Box::new(predicate));
        self
    }
}

impl Selective for DelegatedVerifier {
    fn applies_to_request(&self, request: &Request) -> bool {
        self.request_predicate
            .as_ref()
            .is_none_or(|predicate| predicate(request))
    }

    fn applies_to_response(&self, response: &Response) -> bool {
        self.response_predicate
            .as_ref()
            .is_none_or(|predicate| predicate(response))
    }
}

impl ResponseVerifier for DelegatedVerifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn selective(&self) -> Option<&dyn Selective> {
        if self.request_predicate.is_some() || self.response_predicate.is_some() {
            Some(self)
        } else {
            None
        }
    }

    fn verify(
        &self,
        request: &Rc<Request>,
        response: &Response,
        context: &VerificationContext,
    ) -> Result<(), VerifyError> {
        (self.verify)(request, response, context)
    }
}
