//! A fluent, provider-agnostic deferred query engine.
//!
//! Chained calls on a [`Queryable`] only record [`Segment`]s in an immutable
//! [`Scope`]; a request such as [`Queryable::count`] hands the scope to a
//! [`QueryProvider`], which decides how to run it. The [`InMemoryProvider`]
//! runs scopes through the lazy iterators in [`engine`].
//!
//! Callables are [`Function`]s. A function parsed from source text carries
//! its expression tree, which introspective providers inspect through the
//! [`visitor`] walker instead of calling the function.
//!
//! ```
//! use fluent_query::{Function, Queryable, Value};
//!
//! let orders = Queryable::from_values(vec![12, 40, 7, 40, 3]);
//! let large = orders
//!     .filter(Function::parse("fn ($total) => $total >= 10")?)?
//!     .unique();
//!
//! assert_eq!(large.values()?, vec![Value::from(12), Value::from(40)]);
//! assert_eq!(large.sum(None)?, Value::from(52));
//! # Ok::<(), fluent_query::QueryError>(())
//! ```

pub mod ast;
pub mod collection;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod function;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod provider;
pub mod query;
pub mod queryable;
pub mod value;
pub mod visitor;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{ClosureExpr, Expr, Token};
pub use collection::Collection;
pub use error::{EvalError, LexError, ParseError, QueryError, Result, SourceExtractionError};
pub use function::{Function, FunctionConverter, SourceExtractor, SourceTextExtractor};
pub use lexer::{Lexer, Position};
pub use output::{to_json, to_json_pretty};
pub use parser::{Parser, parse_closure};
pub use provider::{InMemoryProvider, QueryProvider, RepositoryProvider};
pub use query::{Direction, Request, Scope, Segment, Values};
pub use queryable::{GroupedQueryable, Joining, JoiningTo, OrderedQueryable, Queryable};
pub use value::{Entry, Sequence, Value};
pub use visitor::{ExpressionVisitor, walk};
