//! Request-scoped memoization of before/after entity snapshots.
//!
//! Several verifiers need the "inserted entity" or the "before/after
//! update" pair for the same request; the context computes each once per
//! verification pass and caches it until the pass's scope closes.
//!
//! The cache is keyed by the `Rc<Request>` pointer, not structural
//! equality: two equal requests behind different `Rc`s are distinct
//! passes. Not thread-safe; at most one pass per request is in flight.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Context as _, anyhow};
use serde_json::Value;
use tracing::debug;

use crate::error::VerifyError;
use crate::http::Request;
use crate::model::Workspace;
use crate::store::{EntitySource, Row};
use crate::uri;

#[derive(Debug, Default)]
struct EntityCache {
    inserted: Option<Row>,
    updated: Option<(Row, Row)>,
}

/// Pass-scoped snapshot cache shared by all verifiers in a composite.
pub struct VerificationContext {
    workspace: Rc<Workspace>,
    source: RefCell<Box<dyn EntitySource>>,
    cache: RefCell<HashMap<usize, EntityCache>>,
}

impl VerificationContext {
    pub fn new(workspace: Rc<Workspace>, source: Box<dyn EntitySource>) -> Self {
        Self {
            workspace,
            source: RefCell::new(source),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Open a verification scope for the request.
    ///
    /// Idempotent per request identity: a re-entrant call returns a
    /// non-owning scope whose drop leaves the cache entry alone. Dropping
    /// the owning scope evicts all cached state for the request.
    pub fn begin<'a>(&'a self, request: &Rc<Request>) -> VerificationScope<'a> {
        let key = request_key(request);
        let mut cache = self.cache.borrow_mut();
        if cache.contains_key(&key) {
            debug!(key, "re-entrant begin, returning non-owning scope");
            return VerificationScope {
                context: self,
                key,
                owning: false,
            };
        }
        cache.insert(key, EntityCache::default());
        VerificationScope {
            context: self,
            key,
            owning: true,
        }
    }

    /// The entity created by a creation-verb request, computed by diffing
    /// the target collection before and after a synchronization step.
    ///
    /// Requires an open scope. Memoized: repeated calls within one scope
    /// return the cached row without re-synchronizing.
    pub fn inserted_entity(&self, request: &Rc<Request>) -> Result<Row, VerifyError> {
        let key = self.scope_key(request)?;
        if let Some(row) = self
            .cache
            .borrow()
            .get(&key)
            .and_then(|entry| entry.inserted.clone())
        {
            return Ok(row);
        }

        if !request.method.is_creation() {
            return Err(VerifyError::Harness(anyhow!(
                "inserted_entity requires a creation verb, request was {}",
                request.method
            )));
        }

        let target = uri::parse(&request.uri)?;
        let set = target.target_set(&self.workspace)?.name.clone();

        let mut source = self.source.borrow_mut();
        let before = source.collection(&set)?;
        source.synchronize()?;
        let after = source.collection(&set)?;
        drop(source);

        let mut fresh: Vec<Row> = after
            .into_iter()
            .filter(|row| !before.contains(row))
            .collect();
        if fresh.len() != 1 {
            return Err(VerifyError::Harness(anyhow!(
                "expected exactly one new row in {set} after synchronization, found {}",
                fresh.len()
            )));
        }
        let row = fresh.remove(0);
        debug!(set, "inserted entity resolved");

        if let Some(entry) = self.cache.borrow_mut().get_mut(&key) {
            entry.inserted = Some(row.clone());
        }
        Ok(row)
    }

    /// Before/after snapshots of the entity addressed by an update-verb
    /// request. The "before" row is deep-copied ahead of synchronization.
    ///
    /// Requires an open scope. Memoized per scope.
    pub fn updated_entity(&self, request: &Rc<Request>) -> Result<(Row, Row), VerifyError> {
        let key = self.scope_key(request)?;
        if let Some(pair) = self
            .cache
            .borrow()
            .get(&key)
            .and_then(|entry| entry.updated.clone())
        {
            return Ok(pair);
        }

        if !request.method.is_update() {
            return Err(VerifyError::Harness(anyhow!(
                "updated_entity requires an update verb, request was {}",
                request.method
            )));
        }

        let (set, key_names, key_values) = self.addressed_entity(&request.uri)?;
        let key_names: Vec<&str> = key_names.iter().map(String::as_str).collect();

        let mut source = self.source.borrow_mut();
        let before = source
            .entity(&set, &key_names, &key_values)?
            .with_context(|| format!("entity missing from {set} before synchronization"))?;
        source.synchronize()?;
        let after = source
            .entity(&set, &key_names, &key_values)?
            .with_context(|| format!("entity missing from {set} after synchronization"))?;
        drop(source);

        debug!(set, "updated entity resolved");
        if let Some(entry) = self.cache.borrow_mut().get_mut(&key) {
            entry.updated = Some((before.clone(), after.clone()));
        }
        Ok((before, after))
    }

    /// Current reference row addressed by a URI, read through the source
    /// without synchronizing. Used for expectations on read requests.
    pub fn current_entity(&self, request_uri: &str) -> Result<Row, VerifyError> {
        let (set, key_names, key_values) = self.addressed_entity(request_uri)?;
        let key_names: Vec<&str> = key_names.iter().map(String::as_str).collect();
        let row = self
            .source
            .borrow()
            .entity(&set, &key_names, &key_values)?
            .with_context(|| format!("no reference row in {set} for {request_uri}"))?;
        Ok(row)
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    fn scope_key(&self, request: &Rc<Request>) -> Result<usize, VerifyError> {
        let key = request_key(request);
        if !self.cache.borrow().contains_key(&key) {
            return Err(VerifyError::Harness(anyhow!(
                "begin was not called for request {} {}",
                request.method,
                request.uri
            )));
        }
        Ok(key)
    }

    fn addressed_entity(&self, request_uri: &str) -> Result<(String, Vec<String>, Vec<Value>), VerifyError> {
        let target = uri::parse(request_uri)?;
        let set = target.target_set(&self.workspace)?.name.clone();
        let Some(key_values) = target.key.clone() else {
            return Err(VerifyError::Harness(anyhow!(
                "{request_uri} does not address a single entity"
            )));
        };
        if target.navigation.is_some() {
            return Err(VerifyError::Harness(anyhow!(
                "{request_uri}: navigation targets are not addressable entities here"
            )));
        }
        let rtype = self
            .workspace
            .type_of_set(&set)
            .with_context(|| format!("no resource type for set {set}"))?;
        let key_names: Vec<String> = rtype.key_names().iter().map(|name| name.to_string()).collect();
        if key_names.len() != key_values.len() {
            return Err(VerifyError::Harness(anyhow!(
                "{request_uri} supplies {} key values, type {} has {} key properties",
                key_values.len(),
                rtype.name,
                key_names.len()
            )));
        }
        Ok((set, key_names, key_values))
    }
}

/// RAII scope returned by [`VerificationContext::begin`].
///
/// Dropping the owning scope evicts the request's cached state; dropping a
/// non-owning scope is a no-op. Eviction of an already-removed entry does
/// not panic.
pub struct VerificationScope<'a> {
    context: &'a VerificationContext,
    key: usize,
    owning: bool,
}

impl Drop for VerificationScope<'_> {
    fn drop(&mut self) {
        if self.owning {
            self.context.cache.borrow_mut().remove(&self.key);
        }
    }
}

fn request_key(request: &Rc<Request>) -> usize {
    Rc::as_ptr(request) as usize
}
