use std::sync::Arc;

use crate::{
    error::{QueryError, Result},
    function::Function,
    query::{Direction, OrderKey, Segment},
};

/// Ordered, immutable list of segments describing a deferred query.
///
/// Clones share the segment buffer. [`Scope::append`] and
/// [`Scope::update_last`] build a new scope and leave `self` untouched, so
/// any number of query chains can branch off the same prefix.
///
/// # Examples
///
/// ```
/// use fluent_query::{Function, QueryError, Scope, Segment};
///
/// let base = Scope::new().append(Segment::Unique);
/// let ordered = base.append(Segment::OrderBy(vec![]));
/// assert_eq!(base.len(), 1);
/// assert_eq!(ordered.len(), 2);
///
/// let err = base.then_by(Function::identity(), Default::default()).unwrap_err();
/// assert!(matches!(err, QueryError::InvalidChain { .. }));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scope {
    segments: Arc<[Segment]>,
}

impl Scope {
    pub fn new() -> Self {
        Scope::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn append(&self, segment: Segment) -> Scope {
        let mut segments = self.segments.to_vec();
        segments.push(segment);
        Scope {
            segments: segments.into(),
        }
    }

    /// Replaces the final segment. On an empty scope this appends.
    pub fn update_last(&self, segment: Segment) -> Scope {
        let mut segments = self.segments.to_vec();
        segments.pop();
        segments.push(segment);
        Scope {
            segments: segments.into(),
        }
    }

    /// Adds a subsequent ordering key to a trailing `OrderBy`.
    pub fn then_by(&self, function: Function, direction: Direction) -> Result<Scope> {
        match self.last() {
            Some(Segment::OrderBy(keys)) => {
                let mut keys = keys.clone();
                keys.push(OrderKey::new(function, direction));
                Ok(self.update_last(Segment::OrderBy(keys)))
            }
            _ => Err(QueryError::InvalidChain {
                method: "then_by",
                required: "order_by",
            }),
        }
    }

    /// Adds a grouping key function to a trailing `GroupBy`.
    pub fn and_by(&self, function: Function) -> Result<Scope> {
        match self.last() {
            Some(Segment::GroupBy(functions)) => {
                let mut functions = functions.clone();
                functions.push(function);
                Ok(self.update_last(Segment::GroupBy(functions)))
            }
            _ => Err(QueryError::InvalidChain {
                method: "and_by",
                required: "group_by",
            }),
        }
    }
}
