//! # In-Memory Execution Engine
//!
//! Segments become lazy iterators over `Result<Entry>` that are chained into
//! one pipeline; a request then reduces the pipeline to a single value.
//!
//! ## Architecture Overview
//!
//! - **[iterators]** - Streaming operators: filter, projections, range
//! - **[ordering]** - Stable multi-key ordering
//! - **[lookup]** - Strict-equality keyed index, and grouping built on it
//! - **[set_ops]** - Unique and the set operations
//! - **[join]** - Predicate and equality joins and group joins
//! - **[pipeline]** - Folding a scope into one iterator
//! - **[reduce]** - Request reductions
//!
//! ## Evaluation model
//!
//! Pull based and single consumer. Nothing is evaluated until the consumer
//! asks for the next entry. Operators that need their whole input (ordering,
//! grouping, index-by, joins) buffer it on the first pull; the buffer belongs
//! to that operator and is dropped with it. Second operands of set operations
//! and joins are also loaded on first pull, never while the pipeline is
//! being assembled.
//!
//! Errors travel as `Err` items. Streaming operators may already have
//! yielded entries before an error; buffering operators yield nothing but
//! the error.
pub mod iterators;
pub mod join;
pub mod lookup;
pub mod ordering;
pub mod pipeline;
pub mod reduce;
pub mod set_ops;

use crate::{
    error::Result,
    value::{Entry, Value},
};

/// A boxed lazy stream of entries.
pub type EntryIter = Box<dyn Iterator<Item = Result<Entry>>>;

/// Runs `init` on the first pull and yields from the iterator it returns.
pub struct Deferred<F> {
    init: Option<F>,
    inner: Option<EntryIter>,
}

impl<F> Iterator for Deferred<F>
where
    F: FnOnce() -> Result<EntryIter>,
{
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(init) = self.init.take() {
            match init() {
                Ok(inner) => self.inner = Some(inner),
                Err(e) => return Some(Err(e)),
            }
        }
        self.inner.as_mut()?.next()
    }
}

pub fn deferred<F>(init: F) -> EntryIter
where
    F: FnOnce() -> Result<EntryIter> + 'static,
{
    Box::new(Deferred {
        init: Some(init),
        inner: None,
    })
}

/// Collects `upstream` into a buffer, stopping at the first error.
pub fn materialize(upstream: EntryIter) -> Result<Vec<Entry>> {
    upstream.collect()
}

/// Lazily yields buffered entries.
pub fn from_entries(entries: Vec<Entry>) -> EntryIter {
    Box::new(entries.into_iter().map(Ok))
}

/// Re-keys a stream `0, 1, 2, ...`, keeping values.
pub fn reindex(upstream: EntryIter) -> EntryIter {
    Box::new(
        upstream
            .enumerate()
            .map(|(i, entry)| entry.map(|(_, value)| (Value::from(i), value))),
    )
}
