//! # Expression Trees
//!
//! This module defines the expression node model: the tree a query callable
//! is parsed into so that providers can inspect, analyze and rewrite what a
//! predicate or projection does instead of only being able to call it.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - The normalized token stream a source extractor produces
//! - **[expressions]** - Expression nodes (values, access, operations, calls)
//! - **[operators]** - Unary, binary and assignment operators, cast types
//! - **[closure]** - The closure root node and its parameters
//!
//! ## Quick Start
//!
//! ```text
//! function ($outer, $inner) use ($tolerance) {
//!     return abs($outer - $inner) <= $tolerance;
//! }
//! ```
//!
//! parses into a [`ClosureExpr`] with parameters `outer, inner`, bound
//! variable `tolerance`, and a body of one `Return` statement wrapping a
//! `BinaryOp` tree.
//!
//! ## Core Concepts
//!
//! ### Closed variant set
//!
//! [`Expr`] is a closed sum type. The walker in [`crate::visitor`] matches
//! it exhaustively, so adding a variant is a compile error everywhere the
//! variant must be handled.
//!
//! ### Immutability
//!
//! Nodes are never mutated after construction. Rewriting produces a new
//! tree; nodes carry no parent links.
//!
//! ### Arrow functions
//!
//! ```text
//! fn ($x) => $x * 2
//! ```
//!
//! is represented like `function ($x) { return $x * 2; }`.
pub mod closure;
pub mod expressions;
pub mod operators;
pub mod tokens;

pub use closure::{ClosureExpr, Parameter};
pub use expressions::{ArrayItem, Expr};
pub use operators::{AssignOp, BinOp, CastType, UnaryOp};
pub use tokens::Token;
