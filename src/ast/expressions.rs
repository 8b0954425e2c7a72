use crate::{
    ast::{AssignOp, BinOp, CastType, ClosureExpr, UnaryOp},
    value::Value,
};

/// Expression tree node.
///
/// Nodes are immutable once built and own their children, so a tree is
/// never a graph. Transformations go through [`crate::visitor::walk`], which
/// produces a new tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 'hello'
    /// null
    /// ```
    Value(Value),

    /// Variable reference. The name is itself an expression so that
    /// variable-variables (`$$name`) are representable; a plain `$x` has a
    /// `Value("x")` name.
    Variable { name: Box<Expr> },

    /// Field access
    ///
    /// # Example
    /// ```text
    /// $order->total
    /// ```
    Field { object: Box<Expr>, name: String },

    /// Index access; `index` is `None` for the append form `$a[]`
    ///
    /// # Examples
    /// ```text
    /// $row['id']
    /// $items[0]
    /// ```
    Index {
        subject: Box<Expr>,
        index: Option<Box<Expr>>,
    },

    /// Unary operation
    UnaryOp { op: UnaryOp, operand: Box<Expr> },

    /// Binary operation (arithmetic, comparison, logical, concatenation)
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Cast
    ///
    /// # Example
    /// ```text
    /// (int) $value
    /// ```
    Cast { target: CastType, operand: Box<Expr> },

    /// Ternary; `if_true` is `None` for the short form `a ?: b`
    Ternary {
        condition: Box<Expr>,
        if_true: Option<Box<Expr>>,
        if_false: Box<Expr>,
    },

    /// Assignment, plain or compound
    ///
    /// # Examples
    /// ```text
    /// $total = 0
    /// $total += $value
    /// ```
    Assignment {
        target: Box<Expr>,
        op: AssignOp,
        value: Box<Expr>,
    },

    /// Array literal with optional keys, in source order
    ///
    /// # Example
    /// ```text
    /// ['id' => $id, $name]
    /// ```
    Array(Vec<ArrayItem>),

    /// Call of a named function or of a callable expression
    ///
    /// # Example
    /// ```text
    /// strlen($name)
    /// ```
    FunctionCall { callee: Box<Expr>, args: Vec<Expr> },

    /// Method call
    ///
    /// # Example
    /// ```text
    /// $group->implode('-')
    /// ```
    MethodCall {
        receiver: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },

    /// Static method call
    ///
    /// # Example
    /// ```text
    /// Str::upper($name)
    /// ```
    StaticMethodCall {
        class: String,
        name: String,
        args: Vec<Expr>,
    },

    /// Object construction; the class is usually a `Value` name
    New { class: Box<Expr>, args: Vec<Expr> },

    /// Nested closure or arrow function
    Closure(ClosureExpr),

    /// Emptiness check
    ///
    /// # Example
    /// ```text
    /// empty($tags)
    /// ```
    Empty(Box<Expr>),

    /// Return statement
    Return(Option<Box<Expr>>),
}

/// One entry of an array literal.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayItem {
    pub key: Option<Expr>,
    pub value: Expr,
}

impl Expr {
    pub fn value(value: impl Into<Value>) -> Expr {
        Expr::Value(value.into())
    }

    /// Plain variable `$name`.
    pub fn variable(name: &str) -> Expr {
        Expr::Variable {
            name: Box::new(Expr::value(name)),
        }
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn returning(value: Expr) -> Expr {
        Expr::Return(Some(Box::new(value)))
    }

    /// The literal name of a plain variable, `None` for variable-variables.
    pub fn variable_name(&self) -> Option<&str> {
        match self {
            Expr::Variable { name } => match name.as_ref() {
                Expr::Value(Value::String(s)) => Some(s),
                _ => None,
            },
            _ => None,
        }
    }
}
