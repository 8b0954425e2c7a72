use crate::ast::Expr;

/// A parsed function: the root of every tree the parser produces.
///
/// Parameter order, bound variable names and statement order are exactly
/// those of the source. Arrow functions (`fn ($x) => expr`) capture what
/// they read from the enclosing scope: their bound variables are the free
/// variables of the body, and the body is a single `Return` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosureExpr {
    /// Parameters, in binding order
    pub parameters: Vec<Parameter>,

    /// Names listed in `use (...)`
    pub bound_variables: Vec<String>,

    /// Body statements
    pub body: Vec<Expr>,
}

/// A declared closure parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,

    /// Optional type declaration, as written
    pub type_hint: Option<String>,

    /// Default value expression
    pub default: Option<Expr>,
}

impl Parameter {
    pub fn named(name: &str) -> Self {
        Parameter {
            name: name.to_string(),
            type_hint: None,
            default: None,
        }
    }
}
