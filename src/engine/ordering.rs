use std::cmp::Ordering;

use tracing::trace;

use crate::{
    engine::{EntryIter, deferred, from_entries, materialize},
    error::Result,
    query::{Direction, OrderKey},
    value::{Entry, Value},
};

/// Compares two precomputed key tuples, first unequal key deciding.
pub fn compare_keys(a: &[Value], b: &[Value], directions: &[Direction]) -> Ordering {
    a.iter()
        .zip(b)
        .zip(directions)
        .map(|((x, y), direction)| match direction {
            Direction::Ascending => x.compare(y),
            Direction::Descending => y.compare(x),
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Stable multi-key ordering. Keys are kept with their values.
///
/// Each key function runs once per element; the sort then compares the
/// stored key tuples.
pub fn order_by(upstream: EntryIter, keys: Vec<OrderKey>) -> EntryIter {
    deferred(move || {
        let entries = materialize(upstream)?;
        let directions: Vec<Direction> = keys.iter().map(|k| k.direction).collect();

        let mut keyed = entries
            .into_iter()
            .map(|entry| {
                let tuple = keys
                    .iter()
                    .map(|k| k.function.call(&[entry.1.clone(), entry.0.clone()]))
                    .collect::<Result<Vec<_>>>()?;
                Ok((tuple, entry))
            })
            .collect::<Result<Vec<(Vec<Value>, Entry)>>>()?;

        // sort_by is stable: equal tuples keep source order
        keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, &directions));
        trace!(entries = keyed.len(), keys = keys.len(), "ordered entries");

        Ok(from_entries(keyed.into_iter().map(|(_, entry)| entry).collect()))
    })
}
