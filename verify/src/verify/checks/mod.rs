//! Individual verifiers.
//!
//! Each is a narrow assertion unit: compute an expected value from the
//! request and the reference model, compare it to the observed response
//! value, and raise a uniform [`crate::error::VerificationFailure`] with a
//! descriptive message on mismatch. None maintain cross-request state.

pub mod content_type;
pub mod data;
pub mod etag;
pub mod next_link;
pub mod payload_type;
pub mod prefer;
pub mod relationship_link;
pub mod status_code;

pub use content_type::ContentTypeVerifier;
pub use data::DataVerifier;
pub use etag::EtagVerifier;
pub use next_link::NextLinkVerifier;
pub use payload_type::PayloadTypeVerifier;
pub use prefer::PreferHeaderVerifier;
pub use relationship_link::RelationshipLinkVerifier;
pub use status_code::StatusCodeVerifier;

use std::rc::Rc;

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};

use crate::error::VerifyError;
use crate::http::Request;
use crate::store::Row;
use crate::verify::VerificationContext;

/// Reference entity the response payload should reflect: the inserted
/// entity for creation requests, the post-update entity for update
/// requests, the current store row otherwise.
pub(crate) fn expected_entity(
    request: &Rc<Request>,
    context: &VerificationContext,
) -> Result<Row, VerifyError> {
    if request.method.is_creation() {
        context.inserted_entity(request)
    } else if request.method.is_update() {
        Ok(context.updated_entity(request)?.1)
    } else {
        context.current_entity(&request.uri)
    }
}

/// Entity objects carried by a payload: the single object itself, or the
/// elements of its `value` array for collection payloads.
pub(crate) fn entity_objects(body: Option<&Value>) -> Result<Vec<&Map<String, Value>>> {
    let Some(body) = body else {
        bail!("response has no body");
    };
    let Some(object) = body.as_object() else {
        bail!("payload is not a JSON object");
    };
    let Some(value) = object.get("value") else {
        return Ok(vec![object]);
    };
    let rows = value.as_array().context("payload value is not an array")?;
    rows.iter()
        .map(|row| row.as_object().context("collection element is not an object"))
        .collect()
}
