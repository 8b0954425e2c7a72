/// A token of a function's source representation.
///
/// A token stream is what a source extractor hands the parser: one function
/// (a `function (...) use (...) { ... }` closure or an `fn (...) => ...`
/// arrow function), already split into lexical units.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Floating point number
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// 0.5
    /// ```
    Float(f64),

    /// Integer
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 0
    /// ```
    Integer(i64),

    /// String literal, single or double quoted
    ///
    /// # Examples
    /// ```text
    /// 'hello'
    /// "item #1"
    /// ```
    String(String),

    /// Boolean values (`true`, `false`, case-insensitive)
    Boolean(bool),

    /// Null value (`null`, case-insensitive)
    Null,

    // Names
    /// Variable reference
    ///
    /// # Examples
    /// ```text
    /// $value
    /// $outer_key
    /// ```
    Variable(String),

    /// Bare name: function names, method and field names, class names and
    /// keywords without a dedicated token (`if`, `foreach`, ...).
    Identifier(String),

    /// A `$` not followed by a name, as in the variable-variable `$$name`.
    Dollar,

    // Keywords
    /// `function`
    Function,
    /// `fn`
    Fn,
    /// `use`
    Use,
    /// `return`
    Return,
    /// `new`
    New,
    /// `empty`
    Empty,
    /// Logical AND, word form (`and`)
    And,
    /// Logical OR, word form (`or`)
    Or,

    // Comparison
    /// Equality operator (`==`)
    EqEq,
    /// Inequality operator (`!=` or `<>`)
    NotEq,
    /// Strict equality operator (`===`)
    Identical,
    /// Strict inequality operator (`!==`)
    NotIdentical,
    /// Less than
    Lt,
    /// Greater than
    Gt,
    /// Less than or equal
    LtEq,
    /// Greater than or equal
    GtEq,

    // Arithmetic
    /// Addition
    Plus,
    /// Subtraction
    Minus,
    /// Multiplication
    Star,
    /// Division
    Slash,
    /// Modulo
    Percent,
    /// String concatenation, also the start of `.=`
    Dot,
    /// `++`
    Increment,
    /// `--`
    Decrement,

    // Logical
    /// Logical AND, symbol form (`&&`)
    AndAnd,
    /// Logical OR, symbol form (`||`)
    OrOr,
    /// Logical NOT
    Exclamation,
    /// Null-coalescing (`??`)
    Coalesce,

    // Assignment
    /// `=`
    Assign,
    /// `+=`
    PlusAssign,
    /// `-=`
    MinusAssign,
    /// `*=`
    StarAssign,
    /// `/=`
    SlashAssign,
    /// `%=`
    PercentAssign,
    /// `.=`
    DotAssign,
    /// `??=`
    CoalesceAssign,

    // Delimiters
    /// Left parenthesis for grouping, calls and casts
    LParen,
    /// Right parenthesis
    RParen,
    /// Left bracket for index access and array literals
    LBracket,
    /// Right bracket
    RBracket,
    /// Left brace for function bodies
    LBrace,
    /// Right brace
    RBrace,
    /// Comma for separating arguments or array elements
    Comma,
    /// Statement terminator
    Semicolon,
    /// Ternary separator
    Colon,
    /// Static member access (`::`)
    DoubleColon,
    /// Instance member access (`->`)
    Arrow,
    /// Array key separator and arrow function body (`=>`)
    FatArrow,
    /// Ternary operator
    Question,
    /// By-reference marker (`&`)
    Ampersand,
    /// Namespace separator (`\`)
    Backslash,

    /// End of input
    Eof,
}
