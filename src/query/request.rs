use crate::{function::Function, value::Value};

/// A terminal result descriptor. Exactly one request is evaluated per
/// provider load.
///
/// Optional functions project each element (`[value, key]`) before the
/// reduction; without one the element values are reduced directly.
#[derive(Debug, Clone)]
pub enum Request {
    /// The whole materialized sequence
    Values,
    First,
    Last,
    Count,
    Exists,
    Contains(Value),
    IssetIndex(Value),
    GetIndex(Value),

    /// Left fold seeded with the first value; receives `[accumulator, value]`
    Aggregate(Function),
    All(Option<Function>),
    Any(Option<Function>),
    Maximum(Option<Function>),
    Minimum(Option<Function>),
    Sum(Option<Function>),
    Average(Option<Function>),
    Implode {
        delimiter: String,
        function: Option<Function>,
    },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Values => "values",
            Request::First => "first",
            Request::Last => "last",
            Request::Count => "count",
            Request::Exists => "exists",
            Request::Contains(_) => "contains",
            Request::IssetIndex(_) => "isset_index",
            Request::GetIndex(_) => "get_index",
            Request::Aggregate(_) => "aggregate",
            Request::All(_) => "all",
            Request::Any(_) => "any",
            Request::Maximum(_) => "maximum",
            Request::Minimum(_) => "minimum",
            Request::Sum(_) => "sum",
            Request::Average(_) => "average",
            Request::Implode { .. } => "implode",
        }
    }
}
