use tracing::trace;

use crate::{
    engine::{
        EntryIter,
        iterators::{self, Range},
        join::join,
        lookup::group_by,
        ordering::order_by,
        set_ops::{operation, unique},
    },
    query::{Scope, Segment},
};

/// Chains one operator onto `upstream`.
pub fn apply(upstream: EntryIter, segment: &Segment) -> EntryIter {
    trace!(segment = segment.name(), "adding operator");
    match segment {
        Segment::Filter(predicate) => iterators::filter(upstream, predicate.clone()),
        Segment::Select(projection) => iterators::select(upstream, projection.clone()),
        Segment::SelectMany(projection) => iterators::select_many(upstream, projection.clone()),
        Segment::IndexBy(key) => iterators::index_by(upstream, key.clone()),
        Segment::Range { skip, take } => Box::new(Range::new(upstream, *skip, *take)),
        Segment::OrderBy(keys) => order_by(upstream, keys.clone()),
        Segment::GroupBy(functions) => group_by(upstream, functions.clone()),
        Segment::Unique => unique(upstream),
        Segment::Operation { kind, values } => operation(upstream, *kind, values.clone()),
        Segment::Join(segment) => join(upstream, segment.clone()),
    }
}

/// Folds every segment of `scope`, left to right, over `source`.
pub fn execute(source: EntryIter, scope: &Scope) -> EntryIter {
    scope.segments().iter().fold(source, apply)
}
