/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Comparison
    /// Equal (`==`), numbers compare across integer and float
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Strictly equal (`===`)
    Identical,
    /// Strictly not equal (`!==`)
    NotIdentical,
    /// Less than (`<`)
    LessThan,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than or equal (`>=`)
    GreaterEqual,

    // Arithmetic
    /// Addition (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,
    /// Modulo (`%`)
    Modulo,

    /// String concatenation (`.`)
    Concat,

    // Logical
    /// Logical AND (`&&`, `and`)
    And,
    /// Logical OR (`||`, `or`)
    Or,

    // Null-coalescing
    /// Null-coalescing (`??`)
    NullCoalesce,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Logical NOT (`!`)
    Not,
    /// Arithmetic negation (`-`)
    Negate,
    /// Unary plus (`+`)
    Plus,
}

/// Assignment operators. Every compound form maps onto a [`BinOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
    NullCoalesce,
}

impl AssignOp {
    /// The binary operator a compound assignment applies, `None` for `=`.
    pub fn binary(self) -> Option<BinOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinOp::Add),
            AssignOp::Subtract => Some(BinOp::Subtract),
            AssignOp::Multiply => Some(BinOp::Multiply),
            AssignOp::Divide => Some(BinOp::Divide),
            AssignOp::Modulo => Some(BinOp::Modulo),
            AssignOp::Concat => Some(BinOp::Concat),
            AssignOp::NullCoalesce => Some(BinOp::NullCoalesce),
        }
    }
}

/// Target types of a cast expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastType {
    Int,
    Float,
    String,
    Bool,
    Array,
}

impl CastType {
    pub fn from_name(name: &str) -> Option<CastType> {
        match name.to_ascii_lowercase().as_str() {
            "int" | "integer" => Some(CastType::Int),
            "float" | "double" => Some(CastType::Float),
            "string" => Some(CastType::String),
            "bool" | "boolean" => Some(CastType::Bool),
            "array" => Some(CastType::Array),
            _ => None,
        }
    }
}
