//! The fluent query surface.
//!
//! Segment calls return new query objects and never run anything. Request
//! calls hand `(scope, request)` to the provider and return its result; the
//! query object stays usable afterwards.
//!
//! Ordering and grouping return capability wrappers: only an
//! [`OrderedQueryable`] has `then_by`, only a [`GroupedQueryable`] has
//! `and_by`. Both dereference to [`Queryable`] for everything else.

use std::{fmt, ops::Deref, sync::Arc};

use crate::{
    collection::Collection,
    error::{QueryError, Result},
    function::Function,
    provider::{InMemoryProvider, QueryProvider},
    query::{
        Direction, JoinFilter, JoinSegment, OperationKind, OrderKey, Request, Scope, Segment,
        Values,
    },
    value::{Entry, IntoIter, Sequence, Value},
};

/// A deferred query bound to a provider.
///
/// # Examples
///
/// ```
/// use fluent_query::{Function, Queryable, Value};
///
/// let words = Queryable::from_values(vec!["pear", "fig", "apple", "kiwi"]);
/// let short = words
///     .filter(Function::unary(|w| w.as_str().map_or(0, str::len) <= 4))?
///     .order_by_ascending(Function::identity())?;
///
/// assert_eq!(short.implode(",", None)?, "fig,kiwi,pear");
/// # Ok::<(), fluent_query::QueryError>(())
/// ```
#[derive(Clone)]
pub struct Queryable {
    provider: Arc<dyn QueryProvider>,
    scope: Scope,
}

impl fmt::Debug for Queryable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queryable")
            .field("provider", &self.provider)
            .field("scope", &self.scope)
            .finish()
    }
}

impl Queryable {
    pub fn new(provider: Arc<dyn QueryProvider>, scope: Scope) -> Self {
        Queryable { provider, scope }
    }

    /// An in-memory query over `values`, keyed `0..n`.
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        InMemoryProvider::new(values).into_queryable()
    }

    pub fn from_sequence(sequence: Sequence) -> Self {
        InMemoryProvider::from_sequence(sequence).into_queryable()
    }

    /// An in-memory query over any iterable value.
    pub fn from_value(value: Value, method: &str) -> Result<Self> {
        Ok(Queryable::from_sequence(value.to_sequence(method)?))
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn provider(&self) -> &Arc<dyn QueryProvider> {
        &self.provider
    }

    pub(crate) fn with_scope(&self, scope: Scope) -> Queryable {
        self.provider.clone().create_queryable(scope)
    }

    fn convert(&self, function: Function) -> Result<Function> {
        match self.provider.function_converter() {
            Some(converter) => converter.attach(function),
            None => Ok(function),
        }
    }

    fn convert_optional(&self, function: Option<Function>) -> Result<Option<Function>> {
        function.map(|f| self.convert(f)).transpose()
    }

    fn append(&self, segment: Segment) -> Queryable {
        self.with_scope(self.scope.append(segment))
    }

    fn load(&self, request: Request) -> Result<Value> {
        self.provider.load(&self.scope, &request)
    }

    // Segments

    pub fn filter(&self, predicate: Function) -> Result<Queryable> {
        Ok(self.append(Segment::Filter(self.convert(predicate)?)))
    }

    pub fn select(&self, projection: Function) -> Result<Queryable> {
        Ok(self.append(Segment::Select(self.convert(projection)?)))
    }

    pub fn select_many(&self, projection: Function) -> Result<Queryable> {
        Ok(self.append(Segment::SelectMany(self.convert(projection)?)))
    }

    pub fn index_by(&self, key: Function) -> Result<Queryable> {
        Ok(self.append(Segment::IndexBy(self.convert(key)?)))
    }

    pub fn order_by(&self, key: Function, direction: Direction) -> Result<OrderedQueryable> {
        let key = OrderKey::new(self.convert(key)?, direction);
        Ok(OrderedQueryable {
            inner: self.append(Segment::OrderBy(vec![key])),
        })
    }

    pub fn order_by_ascending(&self, key: Function) -> Result<OrderedQueryable> {
        self.order_by(key, Direction::Ascending)
    }

    pub fn order_by_descending(&self, key: Function) -> Result<OrderedQueryable> {
        self.order_by(key, Direction::Descending)
    }

    pub fn group_by(&self, key: Function) -> Result<GroupedQueryable> {
        Ok(GroupedQueryable {
            inner: self.append(Segment::GroupBy(vec![self.convert(key)?])),
        })
    }

    /// Extends a trailing `order_by`; fails with [`QueryError::InvalidChain`]
    /// otherwise. [`OrderedQueryable::then_by`] is the statically checked
    /// form.
    pub(crate) fn extend_order(&self, key: Function, direction: Direction) -> Result<Queryable> {
        let key = self.convert(key)?;
        Ok(self.with_scope(self.scope.then_by(key, direction)?))
    }

    pub(crate) fn extend_group(&self, key: Function) -> Result<Queryable> {
        let key = self.convert(key)?;
        Ok(self.with_scope(self.scope.and_by(key)?))
    }

    pub fn skip(&self, amount: usize) -> Queryable {
        self.slice(amount, None)
    }

    pub fn take(&self, amount: usize) -> Queryable {
        self.slice(0, Some(amount))
    }

    pub fn slice(&self, skip: usize, take: Option<usize>) -> Queryable {
        self.append(Segment::Range { skip, take })
    }

    pub fn unique(&self) -> Queryable {
        self.append(Segment::Unique)
    }

    fn operation(&self, kind: OperationKind, values: impl Into<Values>) -> Queryable {
        self.append(Segment::Operation {
            kind,
            values: values.into(),
        })
    }

    pub fn union(&self, values: impl Into<Values>) -> Queryable {
        self.operation(OperationKind::Union, values)
    }

    pub fn intersect(&self, values: impl Into<Values>) -> Queryable {
        self.operation(OperationKind::Intersect, values)
    }

    /// Distinct values absent from `values`. Keys are preserved.
    pub fn except(&self, values: impl Into<Values>) -> Queryable {
        self.operation(OperationKind::Except, values)
    }

    pub fn difference(&self, values: impl Into<Values>) -> Queryable {
        self.except(values)
    }

    pub fn append_values(&self, values: impl Into<Values>) -> Queryable {
        self.operation(OperationKind::Append, values)
    }

    pub fn where_in(&self, values: impl Into<Values>) -> Queryable {
        self.operation(OperationKind::WhereIn, values)
    }

    pub fn join(&self, values: impl Into<Values>) -> Joining {
        Joining {
            outer: self.clone(),
            values: values.into(),
            grouped: false,
        }
    }

    pub fn group_join(&self, values: impl Into<Values>) -> Joining {
        Joining {
            outer: self.clone(),
            values: values.into(),
            grouped: true,
        }
    }

    // Requests

    pub fn to_sequence(&self) -> Result<Sequence> {
        match self.load(Request::Values)? {
            Value::Sequence(seq) => Ok(seq),
            other => other.to_sequence("values"),
        }
    }

    pub fn as_sequence(&self) -> Result<Sequence> {
        self.to_sequence()
    }

    /// The materialized values, without keys.
    pub fn values(&self) -> Result<Vec<Value>> {
        Ok(self.to_sequence()?.values().cloned().collect())
    }

    pub fn entries(&self) -> Result<Vec<Entry>> {
        Ok(self.to_sequence()?.to_vec())
    }

    pub fn to_value(&self) -> Result<Value> {
        self.load(Request::Values)
    }

    /// Materializes and iterates `(key, value)` pairs.
    pub fn iter(&self) -> Result<IntoIter> {
        Ok(self.to_sequence()?.into_iter())
    }

    pub fn first(&self) -> Result<Value> {
        self.load(Request::First)
    }

    pub fn last(&self) -> Result<Value> {
        self.load(Request::Last)
    }

    pub fn count(&self) -> Result<usize> {
        match self.load(Request::Count)? {
            Value::Integer(n) => usize::try_from(n).map_err(|_| QueryError::function("negative count")),
            other => Err(QueryError::function(format!("count returned {:?}", other))),
        }
    }

    pub fn exists(&self) -> Result<bool> {
        Ok(self.load(Request::Exists)?.is_truthy())
    }

    pub fn contains(&self, value: impl Into<Value>) -> Result<bool> {
        Ok(self.load(Request::Contains(value.into()))?.is_truthy())
    }

    pub fn aggregate(&self, function: Function) -> Result<Value> {
        self.load(Request::Aggregate(self.convert(function)?))
    }

    pub fn all(&self, function: Option<Function>) -> Result<bool> {
        Ok(self.load(Request::All(self.convert_optional(function)?))?.is_truthy())
    }

    pub fn any(&self, function: Option<Function>) -> Result<bool> {
        Ok(self.load(Request::Any(self.convert_optional(function)?))?.is_truthy())
    }

    pub fn maximum(&self, function: Option<Function>) -> Result<Value> {
        self.load(Request::Maximum(self.convert_optional(function)?))
    }

    pub fn minimum(&self, function: Option<Function>) -> Result<Value> {
        self.load(Request::Minimum(self.convert_optional(function)?))
    }

    pub fn sum(&self, function: Option<Function>) -> Result<Value> {
        self.load(Request::Sum(self.convert_optional(function)?))
    }

    pub fn average(&self, function: Option<Function>) -> Result<Value> {
        self.load(Request::Average(self.convert_optional(function)?))
    }

    pub fn implode(&self, delimiter: &str, function: Option<Function>) -> Result<String> {
        let request = Request::Implode {
            delimiter: delimiter.to_string(),
            function: self.convert_optional(function)?,
        };
        Ok(self.load(request)?.to_display_string())
    }

    // Index access

    /// True when `key` exists and its value is not null.
    pub fn isset(&self, key: impl Into<Value>) -> Result<bool> {
        Ok(self.load(Request::IssetIndex(key.into()))?.is_truthy())
    }

    /// The value under `key`, null when absent.
    pub fn get(&self, key: impl Into<Value>) -> Result<Value> {
        self.load(Request::GetIndex(key.into()))
    }

    /// Queries are read-only.
    pub fn set(&self, _key: impl Into<Value>, _value: impl Into<Value>) -> Result<()> {
        Err(QueryError::UnsupportedOperation { method: "set" })
    }

    /// Queries are read-only.
    pub fn unset(&self, _key: impl Into<Value>) -> Result<()> {
        Err(QueryError::UnsupportedOperation { method: "unset" })
    }

    /// Materializes into a new mutable collection, through the provider's
    /// repository support when it has one.
    pub fn as_repository(&self) -> Result<Collection> {
        match self.provider.as_repository() {
            Some(repository) => repository.create_repository(&self.scope),
            None => Ok(Collection::from_entries(self.entries()?)),
        }
    }
}

/// A query whose last segment is an ordering.
#[derive(Debug, Clone)]
pub struct OrderedQueryable {
    inner: Queryable,
}

impl OrderedQueryable {
    pub fn then_by(&self, key: Function, direction: Direction) -> Result<OrderedQueryable> {
        Ok(OrderedQueryable {
            inner: self.inner.extend_order(key, direction)?,
        })
    }

    pub fn then_by_ascending(&self, key: Function) -> Result<OrderedQueryable> {
        self.then_by(key, Direction::Ascending)
    }

    pub fn then_by_descending(&self, key: Function) -> Result<OrderedQueryable> {
        self.then_by(key, Direction::Descending)
    }

    pub fn into_queryable(self) -> Queryable {
        self.inner
    }
}

impl Deref for OrderedQueryable {
    type Target = Queryable;

    fn deref(&self) -> &Queryable {
        &self.inner
    }
}

/// A query whose last segment is a grouping.
#[derive(Debug, Clone)]
pub struct GroupedQueryable {
    inner: Queryable,
}

impl GroupedQueryable {
    /// Adds a key function to the same grouping.
    pub fn and_by(&self, key: Function) -> Result<GroupedQueryable> {
        Ok(GroupedQueryable {
            inner: self.inner.extend_group(key)?,
        })
    }

    pub fn into_queryable(self) -> Queryable {
        self.inner
    }
}

impl Deref for GroupedQueryable {
    type Target = Queryable;

    fn deref(&self) -> &Queryable {
        &self.inner
    }
}

/// A join waiting for its matching rule.
#[derive(Debug, Clone)]
pub struct Joining {
    outer: Queryable,
    values: Values,
    grouped: bool,
}

impl Joining {
    /// Matches pairs for which `predicate(outer, inner)` is truthy.
    pub fn on(self, predicate: Function) -> Result<JoiningTo> {
        let predicate = self.outer.convert(predicate)?;
        Ok(self.filtered(JoinFilter::On(predicate)))
    }

    /// Matches pairs whose keys are strictly equal.
    pub fn on_equality(self, outer_key: Function, inner_key: Function) -> Result<JoiningTo> {
        let outer_key = self.outer.convert(outer_key)?;
        let inner_key = self.outer.convert(inner_key)?;
        Ok(self.filtered(JoinFilter::OnEquality {
            outer_key,
            inner_key,
        }))
    }

    fn filtered(self, filter: JoinFilter) -> JoiningTo {
        JoiningTo {
            outer: self.outer,
            values: self.values,
            grouped: self.grouped,
            filter,
        }
    }
}

/// A join waiting for its result selector.
#[derive(Debug, Clone)]
pub struct JoiningTo {
    outer: Queryable,
    values: Values,
    grouped: bool,
    filter: JoinFilter,
}

impl JoiningTo {
    /// Finishes the join. The selector receives `[outer, inner]`, or
    /// `[outer, group]` for a group join.
    pub fn to(self, selector: Function) -> Result<Queryable> {
        let selector = self.outer.convert(selector)?;
        Ok(self.outer.append(Segment::Join(JoinSegment {
            values: self.values,
            grouped: self.grouped,
            filter: self.filter,
            selector,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionConverter;

    #[test]
    fn segment_calls_do_not_execute() {
        let failing = Function::new(|_| Err(QueryError::function("executed")));
        let query = Queryable::from_values(vec![1, 2]);
        let chained = query.filter(failing.clone()).unwrap().select(failing).unwrap();
        assert_eq!(chained.scope().len(), 2);
        assert!(chained.first().is_err());
    }

    #[test]
    fn requests_leave_the_query_reusable() {
        let query = Queryable::from_values(vec![1, 2, 3]);
        assert_eq!(query.count().unwrap(), 3);
        let skipped = query.skip(1);
        assert_eq!(skipped.first().unwrap(), Value::from(2));
        assert_eq!(query.first().unwrap(), Value::from(1));
    }

    #[test]
    fn index_mutation_is_unsupported() {
        let query = Queryable::from_values(vec![1]);
        assert_eq!(
            query.set(0, 2).unwrap_err(),
            QueryError::UnsupportedOperation { method: "set" }
        );
        assert_eq!(
            query.unset(0).unwrap_err(),
            QueryError::UnsupportedOperation { method: "unset" }
        );
        assert!(query.isset(0).unwrap());
        assert_eq!(query.get(5).unwrap(), Value::Null);
    }

    #[test]
    fn introspective_providers_convert_at_call_time() {
        let query = InMemoryProvider::new(vec![1, 2, 3])
            .with_function_converter(FunctionConverter::default())
            .into_queryable();

        let opaque = Function::unary(|v| v.clone());
        assert!(matches!(
            query.select(opaque).unwrap_err(),
            QueryError::SourceExtraction(_)
        ));

        let parsed = Function::parse("fn ($x) => $x > 1").unwrap();
        let filtered = query.filter(parsed).unwrap();
        match filtered.scope().last() {
            Some(Segment::Filter(f)) => assert!(f.expression().is_some()),
            other => panic!("unexpected segment {:?}", other),
        }
        assert_eq!(filtered.count().unwrap(), 2);
    }
}
