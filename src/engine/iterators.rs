use indexmap::IndexMap;
use tracing::trace;

use crate::{
    engine::{EntryIter, deferred, from_entries, materialize, reindex},
    function::Function,
    value::{Entry, Value},
};

fn call_with_entry(function: &Function, (key, value): &Entry) -> crate::error::Result<Value> {
    function.call(&[value.clone(), key.clone()])
}

/// Keeps entries whose predicate result is truthy. The predicate runs once
/// per element, in source order, as elements are pulled.
pub fn filter(upstream: EntryIter, predicate: Function) -> EntryIter {
    Box::new(upstream.filter_map(move |entry| {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => return Some(Err(e)),
        };
        match call_with_entry(&predicate, &entry) {
            Ok(keep) if keep.is_truthy() => Some(Ok(entry)),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        }
    }))
}

/// Replaces each value, keeping keys.
pub fn select(upstream: EntryIter, projection: Function) -> EntryIter {
    Box::new(upstream.map(move |entry| {
        let entry = entry?;
        let value = call_with_entry(&projection, &entry)?;
        Ok((entry.0, value))
    }))
}

/// Flattens one level of projected collections, re-keying `0..n`.
pub fn select_many(upstream: EntryIter, projection: Function) -> EntryIter {
    let flattened = upstream.flat_map(move |entry| -> EntryIter {
        let inner = entry
            .and_then(|entry| call_with_entry(&projection, &entry))
            .and_then(|projected| projected.to_sequence("select_many"));
        match inner {
            Ok(seq) => Box::new(seq.into_iter().map(Ok)),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    });
    reindex(Box::new(flattened))
}

/// Re-keys each entry by the key function. A repeated key keeps the
/// position of its first occurrence and the value of its last.
pub fn index_by(upstream: EntryIter, key_function: Function) -> EntryIter {
    deferred(move || {
        let mut indexed: IndexMap<Value, Value> = IndexMap::new();
        for entry in materialize(upstream)? {
            let key = call_with_entry(&key_function, &entry)?;
            indexed.insert(key, entry.1);
        }
        trace!(entries = indexed.len(), "indexed entries");
        Ok(from_entries(indexed.into_iter().collect()))
    })
}

/// Skips `skip` entries, then yields at most `take`.
///
/// Skipped entries are pulled (and their errors surfaced) but not buffered.
pub struct Range {
    upstream: EntryIter,
    skip: usize,
    remaining: Option<usize>,
}

impl Range {
    pub fn new(upstream: EntryIter, skip: usize, take: Option<usize>) -> Self {
        Range {
            upstream,
            skip,
            remaining: take,
        }
    }
}

impl Iterator for Range {
    type Item = crate::error::Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.skip > 0 {
            match self.upstream.next()? {
                Ok(_) => self.skip -= 1,
                Err(e) => return Some(Err(e)),
            }
        }

        match self.remaining {
            Some(0) => None,
            Some(n) => {
                let entry = self.upstream.next()?;
                if entry.is_ok() {
                    self.remaining = Some(n - 1);
                }
                Some(entry)
            }
            None => self.upstream.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{error::QueryError, value::Sequence};

    fn source(values: Vec<i64>) -> EntryIter {
        Box::new(Sequence::from_values(values).into_iter().map(Ok))
    }

    fn collect(iter: EntryIter) -> Vec<Entry> {
        iter.collect::<Result<_, _>>().unwrap()
    }

    fn int(n: i64) -> Value {
        Value::Integer(n)
    }

    #[test]
    fn filter_is_lazy_and_single_pass() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let even = Function::unary(move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            v.as_int().unwrap() % 2 == 0
        });

        let mut iter = filter(source(vec![1, 2, 3, 4]), even);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(iter.next().unwrap().unwrap(), (int(1), int(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(collect(iter), vec![(int(3), int(4))]);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn select_keeps_keys() {
        let entries = collect(select(
            source(vec![1, 2]),
            Function::binary(|v, k| v.as_int().unwrap() * 10 + k.as_int().unwrap()),
        ));
        assert_eq!(entries, vec![(int(0), int(10)), (int(1), int(21))]);
    }

    #[test]
    fn select_many_reindexes() {
        let entries = collect(select_many(
            source(vec![1, 2]),
            Function::unary(|v| vec![v.clone(), v.clone()]),
        ));
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![int(0), int(1), int(2), int(3)]);
    }

    #[test]
    fn select_many_rejects_scalars() {
        let err = select_many(source(vec![1]), Function::identity())
            .next()
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument { .. }));
    }

    #[test]
    fn index_by_last_value_wins() {
        let entries = collect(index_by(
            source(vec![1, 2, 3, 4]),
            Function::unary(|v| v.as_int().unwrap() % 2),
        ));
        assert_eq!(entries, vec![(int(1), int(3)), (int(0), int(4))]);
    }

    #[test]
    fn range_skips_then_takes() {
        let entries = collect(Box::new(Range::new(source(vec![1, 2, 3, 4, 5]), 1, Some(2))));
        assert_eq!(entries, vec![(int(1), int(2)), (int(2), int(3))]);

        let rest = collect(Box::new(Range::new(source(vec![1, 2, 3]), 2, None)));
        assert_eq!(rest, vec![(int(2), int(3))]);

        assert!(collect(Box::new(Range::new(source(vec![1, 2]), 5, None))).is_empty());
        assert!(collect(Box::new(Range::new(source(vec![1, 2]), 0, Some(0)))).is_empty());
    }

    #[test]
    fn range_errors_do_not_count_toward_take() {
        let upstream: EntryIter = Box::new(
            vec![
                Ok((int(0), int(1))),
                Err(QueryError::function("bad entry")),
                Ok((int(2), int(3))),
                Ok((int(3), int(4))),
            ]
            .into_iter(),
        );
        let mut range = Range::new(upstream, 0, Some(2));

        assert_eq!(range.next().unwrap().unwrap(), (int(0), int(1)));
        assert!(range.next().unwrap().is_err());
        assert_eq!(range.next().unwrap().unwrap(), (int(2), int(3)));
        assert!(range.next().is_none());
    }
}
