//! Callables passed to fluent query operations.
//!
//! A [`Function`] always carries something executable. It may also carry the
//! source text it was written as and the expression tree parsed from that
//! text, which is what an introspective provider inspects instead of calling
//! the function.

use std::{collections::HashMap, fmt, sync::Arc};

use tracing::debug;

use crate::{
    ast::{ClosureExpr, Token},
    error::{Result, SourceExtractionError},
    evaluator,
    lexer::Lexer,
    parser::parse_closure,
    value::Value,
    visitor::BindingInliner,
};

type Callable = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// A callable argument of a query operation.
///
/// Arguments are positional. Per-element functions receive `[value, key]`,
/// join predicates and join selectors `[outer, inner, outer_key, inner_key]`
/// (for group joins `inner` is the matching group as a sequence), aggregate
/// functions `[accumulator, value]`. A function may ignore trailing
/// arguments.
///
/// # Examples
///
/// ```
/// use fluent_query::{Function, Value};
///
/// let double = Function::unary(|v| v.as_int().unwrap_or(0) * 2);
/// assert_eq!(double.call(&[Value::from(21)]).unwrap(), Value::from(42));
///
/// let parsed = Function::parse("fn ($x) => $x * 2").unwrap();
/// assert_eq!(parsed.call(&[Value::from(21)]).unwrap(), Value::from(42));
/// assert!(parsed.expression().is_some());
/// ```
#[derive(Clone)]
pub struct Function {
    callable: Arc<Callable>,
    source: Option<Arc<str>>,
    expression: Option<Arc<ClosureExpr>>,
}

impl Function {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Function {
            callable: Arc::new(f),
            source: None,
            expression: None,
        }
    }

    /// Function of the first argument only.
    pub fn unary<F, R>(f: F) -> Self
    where
        F: Fn(&Value) -> R + Send + Sync + 'static,
        R: Into<Value>,
    {
        Function::new(move |args| Ok(f(arg(args, 0)).into()))
    }

    /// Function of the first two arguments.
    pub fn binary<F, R>(f: F) -> Self
    where
        F: Fn(&Value, &Value) -> R + Send + Sync + 'static,
        R: Into<Value>,
    {
        Function::new(move |args| Ok(f(arg(args, 0), arg(args, 1)).into()))
    }

    pub fn identity() -> Self {
        Function::unary(Value::clone).with_source("fn ($x) => $x")
    }

    /// A builtin function by name, e.g. `strlen`.
    pub fn builtin(name: &str) -> Result<Self> {
        evaluator::builtin(name)
    }

    /// Parses and compiles closure source text.
    ///
    /// The returned function interprets the parsed tree and keeps both the
    /// tree and the source attached. Closures with a `use (...)` list need
    /// values for those variables: see [`Function::parse_with`].
    pub fn parse(source: &str) -> Result<Self> {
        Function::parse_with(source, &HashMap::new())
    }

    /// Like [`Function::parse`], inlining `bindings` for the bound variables.
    pub fn parse_with(source: &str, bindings: &HashMap<String, Value>) -> Result<Self> {
        let tokens = Lexer::new(source).tokenize()?;
        let closure = parse_closure(tokens)?;
        let closure = BindingInliner::inline(&closure, bindings)?;

        debug!(
            parameters = closure.parameters.len(),
            inlined = bindings.len(),
            "compiling closure"
        );
        Ok(evaluator::compile(closure)?.with_source(source))
    }

    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_expression(mut self, expression: ClosureExpr) -> Self {
        self.expression = Some(Arc::new(expression));
        self
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.callable)(args)
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn expression(&self) -> Option<&ClosureExpr> {
        self.expression.as_deref()
    }
}

fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&Value::Null)
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Function");
        match &self.source {
            Some(source) => debug.field("source", source),
            None => debug.field("source", &"<opaque>"),
        };
        debug.field("parsed", &self.expression.is_some()).finish()
    }
}

/// Produces the token stream of a function's body.
///
/// This is the seam where a host would plug in whatever it knows about its
/// callables. The parser only ever sees the tokens.
pub trait SourceExtractor: Send + Sync {
    fn extract(&self, function: &Function) -> Result<Vec<Token>, SourceExtractionError>;
}

/// Lexes the source text attached to a function.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceTextExtractor;

impl SourceExtractor for SourceTextExtractor {
    fn extract(&self, function: &Function) -> Result<Vec<Token>, SourceExtractionError> {
        let source = function.source().ok_or(SourceExtractionError::NoSource)?;
        Ok(Lexer::new(source).tokenize()?)
    }
}

/// Turns functions into expression trees: extraction, then parsing.
#[derive(Clone)]
pub struct FunctionConverter {
    extractor: Arc<dyn SourceExtractor>,
}

impl FunctionConverter {
    pub fn new(extractor: impl SourceExtractor + 'static) -> Self {
        FunctionConverter {
            extractor: Arc::new(extractor),
        }
    }

    pub fn convert(&self, function: &Function) -> Result<ClosureExpr> {
        if let Some(expression) = function.expression() {
            return Ok(expression.clone());
        }
        let tokens = self.extractor.extract(function)?;
        Ok(parse_closure(tokens)?)
    }

    /// Returns `function` with its expression tree attached.
    pub fn attach(&self, function: Function) -> Result<Function> {
        if function.expression.is_some() {
            return Ok(function);
        }
        let expression = self.convert(&function)?;
        Ok(function.with_expression(expression))
    }
}

impl Default for FunctionConverter {
    fn default() -> Self {
        FunctionConverter::new(SourceTextExtractor)
    }
}

impl fmt::Debug for FunctionConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionConverter").finish_non_exhaustive()
    }
}
