//! # Deferred Query Model
//!
//! A query is data: a [`Scope`] of [`Segment`]s, each one declared operation,
//! plus a terminal [`Request`] saying which concrete result is wanted.
//! Nothing runs while segments are appended; a provider receives the
//! `(scope, request)` pair and decides how to execute it.
//!
//! ## Architecture Overview
//!
//! - **[segment]** - Declared operations and their arguments
//! - **[request]** - Terminal result descriptors
//! - **[scope]** - The ordered, shared, append-only segment list
//!
//! ## Immutability
//!
//! Every value here is immutable. Appending to a scope or extending its last
//! order/group segment returns a new scope; the prefix a query object was
//! built from stays valid for every other branch that shares it.
pub mod request;
pub mod scope;
pub mod segment;

pub use request::Request;
pub use scope::Scope;
pub use segment::{Direction, JoinFilter, JoinSegment, OperationKind, OrderKey, Segment, Values};
