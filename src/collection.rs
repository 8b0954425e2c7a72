//! A mutable in-memory repository.
//!
//! A [`Collection`] owns a list of `(key, value)` entries behind a lock.
//! Queries created from it read the entries anew on every load, so they see
//! mutations made after the query was declared.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::{
    error::Result,
    function::Function,
    provider::InMemoryProvider,
    queryable::Queryable,
    value::{Entry, Sequence, Value},
};

/// # Examples
///
/// ```
/// use fluent_query::{Collection, Function};
///
/// let numbers = Collection::from_values(vec![1, 2, 3]);
/// let evens = numbers
///     .as_queryable()
///     .filter(Function::unary(|v| v.as_int().unwrap_or(1) % 2 == 0))?;
///
/// numbers.add(4);
/// assert_eq!(evens.count()?, 2);
/// # Ok::<(), fluent_query::QueryError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Collection {
    entries: Arc<RwLock<Vec<Entry>>>,
}

impl Collection {
    pub fn new() -> Self {
        Collection::default()
    }

    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Collection::from_entries(Sequence::from_values(values).to_vec())
    }

    pub fn from_entries(entries: Vec<Entry>) -> Self {
        Collection {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// A query over the live contents of this collection.
    pub fn as_queryable(&self) -> Queryable {
        InMemoryProvider::shared(self.entries.clone()).into_queryable()
    }

    /// Appends `value` under the next free integer key.
    pub fn add(&self, value: impl Into<Value>) {
        let mut entries = self.entries.write();
        let key = next_key(&entries);
        entries.push((Value::Integer(key), value.into()));
    }

    pub fn add_range<I, V>(&self, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut entries = self.entries.write();
        for value in values {
            let key = next_key(&entries);
            entries.push((Value::Integer(key), value.into()));
        }
    }

    /// Removes every entry strictly equal to `value`. Returns how many were
    /// removed.
    pub fn remove(&self, value: &Value) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(_, v)| v != value);
        before - entries.len()
    }

    /// Removes every entry for which `predicate(value, key)` is truthy.
    ///
    /// The predicate runs over a snapshot, without holding the lock, so it
    /// may read this collection. If it fails the collection is left
    /// untouched.
    pub fn remove_where(&self, predicate: &Function) -> Result<usize> {
        let snapshot = self.entries.read().clone();
        let mut kept = Vec::with_capacity(snapshot.len());
        for (key, value) in &snapshot {
            if !predicate.call(&[value.clone(), key.clone()])?.is_truthy() {
                kept.push((key.clone(), value.clone()));
            }
        }

        let removed = snapshot.len() - kept.len();
        *self.entries.write() = kept;
        debug!(removed, "removed entries");
        Ok(removed)
    }

    /// Replaces every value with `function(value, key)`, keeping keys.
    ///
    /// Results are computed from a snapshot first; a failure leaves the
    /// collection untouched.
    pub fn apply(&self, function: &Function) -> Result<()> {
        let snapshot = self.entries.read().clone();
        let mut updated = Vec::with_capacity(snapshot.len());
        for (key, value) in snapshot {
            let value = function.call(&[value, key.clone()])?;
            updated.push((key, value));
        }
        *self.entries.write() = updated;
        Ok(())
    }

    /// Stores `value` under `key`, replacing the first entry with that key or
    /// appending a new one.
    pub fn set(&self, key: impl Into<Value>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
    }

    /// Removes the entries stored under `key`; true when any existed.
    pub fn unset(&self, key: &Value) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(k, _)| k != key);
        before != entries.len()
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.entries
            .read()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// A snapshot of the current contents.
    pub fn to_sequence(&self) -> Sequence {
        Sequence::new(self.entries.read().clone())
    }
}

fn next_key(entries: &[Entry]) -> i64 {
    entries
        .iter()
        .filter_map(|(k, _)| match k {
            Value::Integer(n) => Some(*n),
            _ => None,
        })
        .max()
        .map_or(0, |n| n.saturating_add(1))
}
