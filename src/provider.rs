//! The backend boundary.
//!
//! A [`QueryProvider`] receives declared queries: it creates query objects
//! bound to a scope and evaluates `(scope, request)` pairs. The
//! [`InMemoryProvider`] runs them through the lazy engine in
//! [`crate::engine`]; other backends would translate the same scope instead.

use std::{fmt, sync::Arc};

use parking_lot::RwLock;
use tracing::debug;

use crate::{
    collection::Collection,
    engine::{EntryIter, pipeline, reduce::reduce},
    error::Result,
    function::FunctionConverter,
    query::{Request, Scope},
    queryable::Queryable,
    value::{Entry, Sequence, Value},
};

pub trait QueryProvider: fmt::Debug + Send + Sync {
    /// Evaluates `request` over the query `scope` describes.
    fn load(&self, scope: &Scope, request: &Request) -> Result<Value>;

    /// A query object bound to this provider and `scope`.
    fn create_queryable(self: Arc<Self>, scope: Scope) -> Queryable;

    /// The converter applied to every function passed to a fluent call, for
    /// providers that inspect expression trees. `None` keeps raw callables.
    fn function_converter(&self) -> Option<&FunctionConverter>;

    /// Repository support, when the provider has it.
    fn as_repository(&self) -> Option<&dyn RepositoryProvider> {
        None
    }
}

/// A provider that can materialize a scope into a mutable collection.
pub trait RepositoryProvider: QueryProvider {
    fn create_repository(&self, scope: &Scope) -> Result<Collection>;
}

/// Where an in-memory provider reads its elements from.
#[derive(Debug, Clone)]
enum Source {
    Fixed(Sequence),

    /// Backing store of a [`Collection`]; read anew on every load.
    Shared(Arc<RwLock<Vec<Entry>>>),
}

/// Executes queries in memory.
///
/// Every load re-reads the source and re-runs the pipeline: nothing is
/// cached between loads, so a query over a [`Collection`] always reflects
/// its current contents.
///
/// # Examples
///
/// ```
/// use fluent_query::{Function, InMemoryProvider, Value};
///
/// let numbers = InMemoryProvider::new(vec![3, 1, 2]).into_queryable();
/// let total = numbers
///     .filter(Function::unary(|v| v.as_int().unwrap_or(0) > 1))
///     .unwrap()
///     .sum(None)
///     .unwrap();
/// assert_eq!(total, Value::from(5));
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryProvider {
    source: Source,
    converter: Option<FunctionConverter>,
}

impl InMemoryProvider {
    pub fn new<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        InMemoryProvider::from_sequence(Sequence::from_values(values))
    }

    pub fn from_sequence(sequence: Sequence) -> Self {
        InMemoryProvider {
            source: Source::Fixed(sequence),
            converter: None,
        }
    }

    pub(crate) fn shared(entries: Arc<RwLock<Vec<Entry>>>) -> Self {
        InMemoryProvider {
            source: Source::Shared(entries),
            converter: None,
        }
    }

    /// Makes the provider introspective: fluent calls convert each function
    /// to an expression tree and fail if it cannot be converted.
    pub fn with_function_converter(mut self, converter: FunctionConverter) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn into_queryable(self) -> Queryable {
        Arc::new(self).create_queryable(Scope::new())
    }

    fn source_entries(&self) -> EntryIter {
        match &self.source {
            Source::Fixed(seq) => Box::new(seq.clone().into_iter().map(Ok)),
            Source::Shared(entries) => {
                let snapshot = entries.read().clone();
                Box::new(snapshot.into_iter().map(Ok))
            }
        }
    }
}

impl QueryProvider for InMemoryProvider {
    fn load(&self, scope: &Scope, request: &Request) -> Result<Value> {
        debug!(
            segments = scope.len(),
            request = request.name(),
            "loading in-memory query"
        );
        let entries = pipeline::execute(self.source_entries(), scope);
        reduce(entries, request)
    }

    fn create_queryable(self: Arc<Self>, scope: Scope) -> Queryable {
        Queryable::new(self, scope)
    }

    fn function_converter(&self) -> Option<&FunctionConverter> {
        self.converter.as_ref()
    }

    fn as_repository(&self) -> Option<&dyn RepositoryProvider> {
        Some(self)
    }
}

impl RepositoryProvider for InMemoryProvider {
    fn create_repository(&self, scope: &Scope) -> Result<Collection> {
        let entries = pipeline::execute(self.source_entries(), scope).collect::<Result<Vec<_>>>()?;
        debug!(entries = entries.len(), "created repository");
        Ok(Collection::from_entries(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Segment;

    #[test]
    fn loads_are_not_cached() {
        let store = Arc::new(RwLock::new(vec![(Value::from(0), Value::from(1))]));
        let provider = InMemoryProvider::shared(store.clone());
        let scope = Scope::new();

        assert_eq!(provider.load(&scope, &Request::Count).unwrap(), Value::from(1));
        store.write().push((Value::from(1), Value::from(2)));
        assert_eq!(provider.load(&scope, &Request::Count).unwrap(), Value::from(2));
    }

    #[test]
    fn loading_twice_is_deterministic() {
        let provider = InMemoryProvider::new(vec![3, 1, 2, 1]);
        let scope = Scope::new().append(Segment::Unique);
        let first = provider.load(&scope, &Request::Values).unwrap();
        let second = provider.load(&scope, &Request::Values).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn repositories_copy_materialized_entries() {
        let provider = InMemoryProvider::new(vec![1, 2, 2]);
        let repository = provider
            .create_repository(&Scope::new().append(Segment::Unique))
            .unwrap();
        assert_eq!(repository.len(), 2);
    }
}
