use crate::{
    error::{QueryError, Result},
    function::Function,
    queryable::Queryable,
    value::{Sequence, Value},
};

/// Sort direction of one ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// One key of a multi-key ordering: the key function and its direction.
#[derive(Debug, Clone)]
pub struct OrderKey {
    pub function: Function,
    pub direction: Direction,
}

impl OrderKey {
    pub fn new(function: Function, direction: Direction) -> Self {
        OrderKey {
            function,
            direction,
        }
    }
}

/// Set operations applied against a second set of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Union,
    Intersect,
    Except,
    Append,
    WhereIn,
}

impl OperationKind {
    pub fn name(self) -> &'static str {
        match self {
            OperationKind::Union => "union",
            OperationKind::Intersect => "intersect",
            OperationKind::Except => "except",
            OperationKind::Append => "append",
            OperationKind::WhereIn => "where_in",
        }
    }
}

/// The second operand of a set operation or join.
///
/// Either values known up front or another query, which is only evaluated
/// when the segment using it is.
#[derive(Debug, Clone)]
pub enum Values {
    Sequence(Sequence),
    Query(Box<Queryable>),
}

impl Values {
    /// Checks that `value` can be iterated, for operations taking arbitrary
    /// runtime values.
    pub fn from_value(value: Value, method: &str) -> Result<Self> {
        match value {
            Value::Sequence(seq) => Ok(Values::Sequence(seq)),
            other => other.to_sequence(method).map(Values::Sequence),
        }
    }

    /// Materializes the values.
    pub fn load(&self) -> Result<Sequence> {
        match self {
            Values::Sequence(seq) => Ok(seq.clone()),
            Values::Query(query) => query.to_sequence(),
        }
    }
}

impl From<Sequence> for Values {
    fn from(seq: Sequence) -> Self {
        Values::Sequence(seq)
    }
}

impl From<Queryable> for Values {
    fn from(query: Queryable) -> Self {
        Values::Query(Box::new(query))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Values {
    fn from(values: Vec<T>) -> Self {
        Values::Sequence(Sequence::from_values(values))
    }
}

impl TryFrom<Value> for Values {
    type Error = QueryError;

    fn try_from(value: Value) -> Result<Self> {
        Values::from_value(value, "values")
    }
}

/// How inner elements of a join are matched to an outer element.
#[derive(Debug, Clone)]
pub enum JoinFilter {
    /// Arbitrary predicate over `(outer, inner)`; scans every pair.
    On(Function),

    /// Strict equality of two key functions; hashes the inner side once.
    OnEquality {
        outer_key: Function,
        inner_key: Function,
    },
}

#[derive(Debug, Clone)]
pub struct JoinSegment {
    pub values: Values,

    /// `true` for a group join: one result per outer element, paired with
    /// its whole (possibly empty) inner group.
    pub grouped: bool,

    pub filter: JoinFilter,

    /// Combines an outer value with a matching inner value (or group).
    pub selector: Function,
}

/// One declared query operation.
#[derive(Debug, Clone)]
pub enum Segment {
    Select(Function),
    SelectMany(Function),
    IndexBy(Function),
    Filter(Function),

    /// Composite grouping key: one function per `group_by`/`and_by` call.
    GroupBy(Vec<Function>),

    /// Keys in comparison order; the first unequal key decides.
    OrderBy(Vec<OrderKey>),

    /// `take: None` is unbounded.
    Range {
        skip: usize,
        take: Option<usize>,
    },

    Unique,

    Operation {
        kind: OperationKind,
        values: Values,
    },

    Join(JoinSegment),
}

impl Segment {
    pub fn name(&self) -> &'static str {
        match self {
            Segment::Select(_) => "select",
            Segment::SelectMany(_) => "select_many",
            Segment::IndexBy(_) => "index_by",
            Segment::Filter(_) => "filter",
            Segment::GroupBy(_) => "group_by",
            Segment::OrderBy(_) => "order_by",
            Segment::Range { .. } => "range",
            Segment::Unique => "unique",
            Segment::Operation { kind, .. } => kind.name(),
            Segment::Join(join) if join.grouped => "group_join",
            Segment::Join(_) => "join",
        }
    }

    /// Every function the segment carries, in declaration order.
    pub fn functions(&self) -> Vec<&Function> {
        match self {
            Segment::Select(f) | Segment::SelectMany(f) | Segment::IndexBy(f) | Segment::Filter(f) => {
                vec![f]
            }
            Segment::GroupBy(functions) => functions.iter().collect(),
            Segment::OrderBy(keys) => keys.iter().map(|k| &k.function).collect(),
            Segment::Range { .. } | Segment::Unique | Segment::Operation { .. } => vec![],
            Segment::Join(join) => {
                let mut functions = match &join.filter {
                    JoinFilter::On(f) => vec![f],
                    JoinFilter::OnEquality {
                        outer_key,
                        inner_key,
                    } => vec![outer_key, inner_key],
                };
                functions.push(&join.selector);
                functions
            }
        }
    }
}
