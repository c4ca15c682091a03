//! Response verification library for a synthetic OData-style data service.
//!
//! The crate is split along the same seam as the service it tests:
//!
//! - **[`model`]**: declarative workspace metadata (resource types, keys,
//!   navigations, sets). Data only, built once per suite.
//! - **[`store`]**: the row-based in-memory data provider acting as the
//!   reference query evaluator, plus the lagging client view used to take
//!   before/after snapshots.
//! - **[`verify`]**: the verification pipeline. Independent verifiers with
//!   opt-in applicability predicates, composed into a [`verify::CompositeVerifier`]
//!   that runs all applicable verifiers against one request/response pair.
//!
//! Dispatch is single-threaded and synchronous: one verification pass per
//! request/response pair, first failure terminates the pass.

pub mod error;
pub mod http;
pub mod logging;
pub mod model;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod uri;
pub mod verify;
