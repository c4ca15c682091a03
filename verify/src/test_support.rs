//! Test-only helpers for constructing requests, responses, and rows.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;

use crate::http::{Method, Request, Response, StatusCode};
use crate::model::sample;
use crate::store::{Row, RowStore, SyncedView};
use crate::verify::VerificationContext;

/// Create a request with no headers or body, wrapped for identity keying.
pub fn request(method: Method, uri: &str) -> Rc<Request> {
    Rc::new(Request {
        method,
        uri: uri.to_string(),
        headers: BTreeMap::new(),
        body: None,
    })
}

/// Create a request carrying the given headers.
pub fn request_with_headers(method: Method, uri: &str, headers: &[(&str, &str)]) -> Rc<Request> {
    Rc::new(Request {
        method,
        uri: uri.to_string(),
        headers: header_map(headers),
        body: None,
    })
}

/// Create a bodyless response with no headers.
pub fn response(status: StatusCode) -> Response {
    Response {
        status,
        headers: BTreeMap::new(),
        body: None,
    }
}

/// Create a response with headers and an optional JSON body.
pub fn response_with(status: StatusCode, headers: &[(&str, &str)], body: Option<Value>) -> Response {
    Response {
        status,
        headers: header_map(headers),
        body,
    }
}

/// Build a row from name/value pairs.
pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// A store pre-seeded with rows for one set.
pub fn seeded_store(set: &str, rows: Vec<Row>) -> Rc<RefCell<RowStore>> {
    let store = Rc::new(RefCell::new(RowStore::new()));
    for row in rows {
        store.borrow_mut().insert(set, row);
    }
    store
}

/// Context over the sample workspace and a view of the given store.
pub fn context_over(store: Rc<RefCell<RowStore>>) -> VerificationContext {
    let workspace = Rc::new(sample::customers_orders());
    let view = SyncedView::new(store);
    VerificationContext::new(workspace, Box::new(view))
}

/// Context over the sample workspace and an empty store.
pub fn empty_context() -> VerificationContext {
    context_over(Rc::new(RefCell::new(RowStore::new())))
}

fn header_map(headers: &[(&str, &str)]) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}
