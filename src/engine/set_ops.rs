use std::collections::HashSet;

use tracing::trace;

use crate::{
    engine::{EntryIter, deferred, reindex},
    error::Result,
    query::{OperationKind, Values},
    value::Value,
};

/// Keeps the first occurrence of every distinct value, with its key.
pub fn unique(upstream: EntryIter) -> EntryIter {
    let mut seen = HashSet::new();
    Box::new(upstream.filter(move |entry| match entry {
        Ok((_, value)) => seen.insert(value.clone()),
        Err(_) => true,
    }))
}

fn load_set(values: &Values) -> Result<HashSet<Value>> {
    let set: HashSet<Value> = values.load()?.values().cloned().collect();
    trace!(distinct = set.len(), "loaded membership set");
    Ok(set)
}

fn keep_members(upstream: EntryIter, members: HashSet<Value>, wanted: bool) -> EntryIter {
    Box::new(upstream.filter(move |entry| match entry {
        Ok((_, value)) => members.contains(value) == wanted,
        Err(_) => true,
    }))
}

/// Applies a set operation against `values`, loaded on first pull.
///
/// | kind | result | keys |
/// |---|---|---|
/// | `Union` | distinct values of source, then of `values` | re-indexed |
/// | `Intersect` | distinct source values present in `values` | kept |
/// | `Except` | distinct source values absent from `values` | kept |
/// | `Append` | source then `values` | re-indexed |
/// | `WhereIn` | source values present in `values`, duplicates kept | kept |
pub fn operation(upstream: EntryIter, kind: OperationKind, values: Values) -> EntryIter {
    match kind {
        OperationKind::Union => reindex(unique(concat(upstream, values))),
        OperationKind::Append => reindex(concat(upstream, values)),
        OperationKind::Intersect => {
            deferred(move || Ok(unique(keep_members(upstream, load_set(&values)?, true))))
        }
        OperationKind::Except => {
            deferred(move || Ok(unique(keep_members(upstream, load_set(&values)?, false))))
        }
        OperationKind::WhereIn => {
            deferred(move || Ok(keep_members(upstream, load_set(&values)?, true)))
        }
    }
}

/// Source entries followed by the entries of `values`, which are only
/// loaded once the source is exhausted.
fn concat(upstream: EntryIter, values: Values) -> EntryIter {
    let rest = deferred(move || {
        let seq = values.load()?;
        Ok(Box::new(seq.into_iter().map(Ok)) as EntryIter)
    });
    Box::new(upstream.chain(rest))
}
