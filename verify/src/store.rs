//! Row-based in-memory data provider.
//!
//! [`RowStore`] is the reference store: named lists of loosely-typed rows,
//! mutated by simple CRUD helpers. [`SyncedView`] is a client-side copy of
//! the store that lags behind it until [`EntitySource::synchronize`] is
//! called; the verification context uses the lag to take before/after
//! snapshots around a request's effect.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{Result, bail};
use serde_json::Value;

/// A loosely-typed entity row.
pub type Row = BTreeMap<String, Value>;

/// Named lists of rows, keyed by entity-set name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowStore {
    sets: BTreeMap<String, Vec<Row>>,
}

impl RowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows of the named set. Unknown sets read as empty.
    pub fn rows(&self, set: &str) -> &[Row] {
        self.sets.get(set).map_or(&[], Vec::as_slice)
    }

    pub fn insert(&mut self, set: &str, row: Row) {
        self.sets.entry(set.to_string()).or_default().push(row);
    }

    /// Find a row whose key properties match `key_values` in order.
    pub fn find(&self, set: &str, key_names: &[&str], key_values: &[Value]) -> Option<&Row> {
        self.rows(set)
            .iter()
            .find(|row| row_matches(row, key_names, key_values))
    }

    /// Apply a parsed update tree to the addressed row by deep merge.
    pub fn update(
        &mut self,
        set: &str,
        key_names: &[&str],
        key_values: &[Value],
        tree: &Value,
    ) -> Result<()> {
        let Some(tree) = tree.as_object() else {
            bail!("update tree for {set} must be a JSON object");
        };
        let rows = self.sets.entry(set.to_string()).or_default();
        let Some(row) = rows
            .iter_mut()
            .find(|row| row_matches(row, key_names, key_values))
        else {
            bail!("no row in {set} matches key {key_values:?}");
        };
        for (name, value) in tree {
            merge_value(row.entry(name.clone()).or_insert(Value::Null), value);
        }
        Ok(())
    }

    /// Remove the addressed row.
    pub fn delete(&mut self, set: &str, key_names: &[&str], key_values: &[Value]) -> Result<()> {
        let rows = self.sets.entry(set.to_string()).or_default();
        let before = rows.len();
        rows.retain(|row| !row_matches(row, key_names, key_values));
        if rows.len() == before {
            bail!("no row in {set} matches key {key_values:?}");
        }
        Ok(())
    }
}

fn row_matches(row: &Row, key_names: &[&str], key_values: &[Value]) -> bool {
    key_names.len() == key_values.len()
        && key_names
            .iter()
            .zip(key_values)
            .all(|(name, value)| row.get(*name) == Some(value))
}

/// Deep merge: nested objects merge field-wise, everything else replaces.
fn merge_value(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target), Value::Object(update)) => {
            for (name, value) in update {
                merge_value(target.entry(name.clone()).or_insert(Value::Null), value);
            }
        }
        (target, update) => *target = update.clone(),
    }
}

/// Read side of the data provider as the verification context sees it.
///
/// `synchronize` refreshes the local view from the service; until then
/// reads return the pre-request state.
pub trait EntitySource {
    fn collection(&self, set: &str) -> Result<Vec<Row>>;
    fn entity(&self, set: &str, key_names: &[&str], key_values: &[Value]) -> Result<Option<Row>>;
    fn synchronize(&mut self) -> Result<()>;
}

/// Lagging client copy of a shared [`RowStore`].
#[derive(Debug)]
pub struct SyncedView {
    store: Rc<RefCell<RowStore>>,
    view: RowStore,
}

impl SyncedView {
    /// Snapshot the store's current state as the initial view.
    pub fn new(store: Rc<RefCell<RowStore>>) -> Self {
        let view = store.borrow().clone();
        Self { store, view }
    }
}

impl EntitySource for SyncedView {
    fn collection(&self, set: &str) -> Result<Vec<Row>> {
        Ok(self.view.rows(set).to_vec())
    }

    fn entity(&self, set: &str, key_names: &[&str], key_values: &[Value]) -> Result<Option<Row>> {
        Ok(self.view.find(set, key_names, key_values).cloned())
    }

    fn synchronize(&mut self) -> Result<()> {
        self.view = self.store.borrow().clone();
        Ok(())
    }
}
