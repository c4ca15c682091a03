//! The verification pipeline.
//!
//! A [`ResponseVerifier`] asserts one property of a response given a
//! request. Verifiers may opt into selective applicability via the
//! [`Selective`] capability; a verifier that does not expose it is
//! universally applicable. [`CompositeVerifier`] runs every applicable
//! member against one request/response pair, in registration order,
//! terminating the pass on the first failure.

pub mod checks;
pub mod composite;
pub mod context;
pub mod delegated;
pub mod dump;

pub use composite::CompositeVerifier;
pub use context::{VerificationContext, VerificationScope};
pub use delegated::DelegatedVerifier;

use std::rc::Rc;

use crate::error::VerifyError;
use crate::http::{Request, Response};

/// Opt-in applicability capability.
///
/// The composite evaluates both predicates (request first, short-circuit
/// on false) before invoking `verify`.
pub trait Selective {
    fn applies_to_request(&self, request: &Request) -> bool;
    fn applies_to_response(&self, response: &Response) -> bool;
}

/// A named check asserting one property of a response.
///
/// Constructed once per service configuration and reused across many
/// request/response pairs; stateless except for injected collaborators.
pub trait ResponseVerifier {
    fn name(&self) -> &str;

    /// Applicability capability. `None` means universally applicable.
    ///
    /// Implemented as an explicit capability accessor rather than default
    /// predicate methods so "selective" is a discriminated property of the
    /// verifier, not a silently-overridable default.
    fn selective(&self) -> Option<&dyn Selective> {
        None
    }

    fn verify(
        &self,
        request: &Rc<Request>,
        response: &Response,
        context: &VerificationContext,
    ) -> Result<(), VerifyError>;
}
