//! Evaluate expressions against JSON input

use tracing::debug;

use super::CliError;
use crate::{
    ast::{ClosureExpr, Expr, Parameter},
    error::QueryError,
    evaluator,
    lexer::Lexer,
    output::{from_json, into_json},
    parser::{Parser, parse_closure},
    value::Value,
    visitor::VariableUsage,
};

/// The variable the JSON input is bound to.
const SOURCE: &str = "source";

/// Options for the eval command
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// The expression to evaluate
    pub expression: String,
    /// JSON input string
    pub input: Option<String>,
    /// Only validate syntax, don't evaluate
    pub syntax_only: bool,
}

/// Result of an eval operation
#[derive(Debug)]
pub enum EvalResult {
    /// Syntax validation passed
    SyntaxValid,
    /// Expression evaluated successfully with JSON output
    Success(serde_json::Value),
}

/// Evaluates `options.expression` with the input bound to `$source`.
///
/// Arrays and objects are bound as keyed sequences, so
/// `$source->where(fn ($x) => $x > 1)->count()` works on a JSON array.
pub fn execute_eval(options: &EvalOptions) -> Result<EvalResult, CliError> {
    let tokens = Lexer::new(&options.expression)
        .tokenize()
        .map_err(QueryError::from)?;
    let expression = Parser::new(tokens)
        .parse_standalone_expression()
        .map_err(QueryError::from)?;

    if options.syntax_only {
        return Ok(EvalResult::SyntaxValid);
    }

    let unbound = ClosureExpr {
        parameters: vec![],
        bound_variables: vec![],
        body: vec![Expr::returning(expression)],
    };
    let reads_source = VariableUsage::analyze(&unbound)
        .free_variables()
        .any(|name| name == SOURCE);

    let source = match &options.input {
        Some(json) => bind_input(from_json(serde_json::from_str(json)?))?,
        None if reads_source => return Err(CliError::NoInput),
        None => Value::Null,
    };
    debug!(reads_source, "evaluating expression");

    let closure = ClosureExpr {
        parameters: vec![Parameter::named(SOURCE)],
        ..unbound
    };
    let result = evaluator::compile(closure)?.call(&[source])?;
    Ok(EvalResult::Success(into_json(&result)))
}

fn bind_input(input: Value) -> Result<Value, CliError> {
    if input.is_iterable() {
        Ok(Value::Sequence(input.to_sequence("eval")?))
    } else {
        Ok(input)
    }
}

/// Parses a closure for display.
pub fn execute_parse(function: &str) -> Result<ClosureExpr, CliError> {
    let tokens = Lexer::new(function).tokenize().map_err(QueryError::from)?;
    Ok(parse_closure(tokens).map_err(QueryError::from)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expression: &str, input: Option<&str>) -> Result<serde_json::Value, CliError> {
        let options = EvalOptions {
            expression: expression.to_string(),
            input: input.map(str::to_string),
            syntax_only: false,
        };
        match execute_eval(&options)? {
            EvalResult::Success(json) => Ok(json),
            EvalResult::SyntaxValid => panic!("expected a result"),
        }
    }

    #[test]
    fn evaluates_queries_over_input() {
        let result = eval("$source->where(fn ($x) => $x > 1)->count()", Some("[1, 2, 3]")).unwrap();
        assert_eq!(result, serde_json::json!(2));
    }

    #[test]
    fn objects_keep_their_keys() {
        let result = eval("$source->select(fn ($v) => $v * 10)->asArray()", Some(r#"{"a": 1, "b": 2}"#))
            .unwrap();
        assert_eq!(result, serde_json::json!({"a": 10, "b": 20}));
    }

    #[test]
    fn input_is_only_required_when_read() {
        assert_eq!(eval("1 + 2", None).unwrap(), serde_json::json!(3));
        assert!(matches!(eval("$source", None), Err(CliError::NoInput)));
    }

    #[test]
    fn syntax_only_does_not_evaluate() {
        let options = EvalOptions {
            expression: "1 / 0".to_string(),
            input: None,
            syntax_only: true,
        };
        assert!(matches!(execute_eval(&options), Ok(EvalResult::SyntaxValid)));
    }

    #[test]
    fn parse_reports_unsupported_constructs() {
        let err = execute_parse("function ($x) { foreach ($x as $y) {} }").unwrap_err();
        assert!(err.to_string().contains("unsupported construct: foreach"));
    }
}
