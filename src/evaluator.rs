//! Interpreter for parsed closures.
//!
//! [`compile`] checks a closure once and wraps it into a [`Function`] whose
//! callable walks the tree on every call. Each call gets a fresh frame: the
//! captured variables, then the parameters bound positionally.
//!
//! Iterable values support the fluent query surface as methods, so
//! `$group->implode('-')` or `$values->where(fn ($x) => $x > 2)->sum()`
//! build and run queries from inside a closure. Method names are matched
//! case-insensitively and without underscores.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use regex::Regex;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use tracing::{debug, trace};

use crate::{
    ast::{ArrayItem, AssignOp, BinOp, CastType, ClosureExpr, Expr, UnaryOp},
    error::{EvalError, QueryError, Result},
    function::Function,
    query::{Direction, Values},
    queryable::{Joining, JoiningTo, Queryable},
    value::{Entry, Sequence, Value, type_name},
    visitor::{ExpressionVisitor, VariableUsage, walk_closure},
};

/// Builds an executable function from a closure.
///
/// Fails with [`EvalError::UndefinedVariable`] when the closure still has
/// bound variables (they must be inlined first) or reads a variable it never
/// declares, and with [`EvalError::UnknownFunction`] when it calls a function
/// that is not a builtin.
pub fn compile(closure: ClosureExpr) -> Result<Function> {
    if let Some(name) = closure.bound_variables.first() {
        return Err(EvalError::UndefinedVariable(name.clone()).into());
    }
    let usage = VariableUsage::analyze(&closure);
    if let Some(name) = usage.free_variables().next() {
        return Err(EvalError::UndefinedVariable(name.to_string()).into());
    }

    let mut calls = UnknownCalls::default();
    walk_closure(&mut calls, &closure);
    if let Some(name) = calls.names.into_iter().next() {
        return Err(EvalError::UnknownFunction(name).into());
    }

    trace!(
        parameters = closure.parameters.len(),
        statements = closure.body.len(),
        "compiled closure"
    );
    let expression = closure.clone();
    Ok(closure_function(Arc::new(closure), HashMap::new()).with_expression(expression))
}

/// A builtin as a callable, e.g. `Function::builtin("strlen")`.
///
/// Used as a query callback, a builtin receives only as many leading
/// arguments as it requires: `strlen` sees the value, not the key.
pub fn builtin(name: &str) -> Result<Function> {
    let name = name.to_ascii_lowercase();
    let Some(&(_, required, _)) = BUILTINS.iter().find(|(n, ..)| *n == name) else {
        return Err(EvalError::UnknownFunction(name).into());
    };

    let source = (required == 1).then(|| format!("fn ($value) => {}($value)", name));
    let function = Function::new(move |args| call_builtin(&name, &args[..args.len().min(required)]));
    Ok(match source {
        Some(source) => function.with_source(source),
        None => function,
    })
}

#[derive(Default)]
struct UnknownCalls {
    names: Vec<String>,
}

impl ExpressionVisitor for UnknownCalls {
    fn visit_function_call(&mut self, callee: &Expr, _args: &[Expr]) {
        if let Expr::Value(Value::String(name)) = callee
            && !is_builtin(name)
        {
            self.names.push(name.clone());
        }
    }
}

/// What an expression evaluates to. Only plain values cross the boundary of
/// a call; the other variants live inside a single frame.
#[derive(Debug, Clone)]
enum Operand {
    Value(Value),
    Function(Function),
    Query(Queryable),
    Joining(Joining),
    JoiningTo(JoiningTo),
}

impl Operand {
    fn into_value(self) -> Result<Value> {
        match self {
            Operand::Value(value) => Ok(value),
            Operand::Query(query) => query.to_value(),
            Operand::Function(_) => Err(type_error("a closure cannot be used as a value")),
            Operand::Joining(_) | Operand::JoiningTo(_) => {
                Err(type_error("incomplete join, call on() and to() first"))
            }
        }
    }

    fn is_truthy(&self) -> Result<bool> {
        match self {
            Operand::Value(value) => Ok(value.is_truthy()),
            Operand::Query(query) => query.exists(),
            _ => Ok(true),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Operand::Value(value) => type_name(value),
            Operand::Function(_) => "closure",
            Operand::Query(_) => "query",
            Operand::Joining(_) | Operand::JoiningTo(_) => "join",
        }
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

fn type_error(message: impl Into<String>) -> QueryError {
    EvalError::TypeError(message.into()).into()
}

struct Frame {
    locals: HashMap<String, Operand>,
}

impl Frame {
    fn lookup(&self, name: &str) -> Result<Operand> {
        self.locals
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()).into())
    }
}

fn closure_function(closure: Arc<ClosureExpr>, captured: HashMap<String, Operand>) -> Function {
    Function::new(move |args| {
        let mut frame = Frame {
            locals: captured.clone(),
        };
        bind_parameters(&closure, args, &mut frame)?;
        run(&closure.body, &mut frame)
    })
}

fn bind_parameters(closure: &ClosureExpr, args: &[Value], frame: &mut Frame) -> Result<()> {
    for (position, parameter) in closure.parameters.iter().enumerate() {
        let value = match (args.get(position), &parameter.default) {
            (Some(value), _) => Operand::Value(value.clone()),
            (None, Some(default)) => eval(default, frame)?,
            (None, None) => {
                let required = closure
                    .parameters
                    .iter()
                    .filter(|p| p.default.is_none())
                    .count();
                return Err(EvalError::ArgumentCount {
                    function: "closure".to_string(),
                    expected: required,
                    given: args.len(),
                }
                .into());
            }
        };
        frame.locals.insert(parameter.name.clone(), value);
    }
    Ok(())
}

fn run(body: &[Expr], frame: &mut Frame) -> Result<Value> {
    for statement in body {
        match statement {
            Expr::Return(Some(value)) => return eval(value, frame)?.into_value(),
            Expr::Return(None) => return Ok(Value::Null),
            other => {
                eval(other, frame)?;
            }
        }
    }
    Ok(Value::Null)
}

fn eval(expr: &Expr, frame: &mut Frame) -> Result<Operand> {
    match expr {
        Expr::Value(value) => Ok(Operand::Value(value.clone())),
        Expr::Variable { name } => {
            let name = variable_name(name, frame)?;
            frame.lookup(&name)
        }
        Expr::Field { object, name } => {
            let object = eval_value(object, frame)?;
            Ok(field(&object, name)?.into())
        }
        Expr::Index { subject, index } => {
            let Some(index) = index else {
                return Err(type_error("cannot use [] for reading"));
            };
            let subject = eval_value(subject, frame)?;
            let index = eval_value(index, frame)?;
            Ok(index_of(&subject, &index)?.into())
        }
        Expr::UnaryOp { op, operand } => {
            let operand = eval_value(operand, frame)?;
            Ok(unary(*op, &operand)?.into())
        }
        Expr::BinaryOp {
            op: BinOp::And,
            left,
            right,
        } => {
            let result = eval(left, frame)?.is_truthy()? && eval(right, frame)?.is_truthy()?;
            Ok(Value::Boolean(result).into())
        }
        Expr::BinaryOp {
            op: BinOp::Or,
            left,
            right,
        } => {
            let result = eval(left, frame)?.is_truthy()? || eval(right, frame)?.is_truthy()?;
            Ok(Value::Boolean(result).into())
        }
        Expr::BinaryOp {
            op: BinOp::NullCoalesce,
            left,
            right,
        } => match eval_lenient(left, frame)? {
            Operand::Value(Value::Null) => eval(right, frame),
            other => Ok(other),
        },
        Expr::BinaryOp { op, left, right } => {
            let left = eval_value(left, frame)?;
            let right = eval_value(right, frame)?;
            Ok(binary(*op, &left, &right)?.into())
        }
        Expr::Cast { target, operand } => Ok(cast(*target, eval_value(operand, frame)?).into()),
        Expr::Ternary {
            condition,
            if_true,
            if_false,
        } => {
            let condition = eval(condition, frame)?;
            match (condition.is_truthy()?, if_true) {
                (true, Some(if_true)) => eval(if_true, frame),
                (true, None) => Ok(condition),
                (false, _) => eval(if_false, frame),
            }
        }
        Expr::Assignment { target, op, value } => assign(target, *op, value, frame),
        Expr::Array(items) => Ok(array(items, frame)?.into()),
        Expr::FunctionCall { callee, args } => call_function(callee, args, frame),
        Expr::MethodCall {
            receiver,
            name,
            args,
        } => {
            let receiver = eval(receiver, frame)?;
            let args = args
                .iter()
                .map(|arg| eval(arg, frame))
                .collect::<Result<Vec<_>>>()?;
            call_method(receiver, name, args)
        }
        Expr::StaticMethodCall { class, name, .. } => Err(EvalError::Unsupported(format!(
            "static method call {}::{}",
            class, name
        ))
        .into()),
        Expr::New { .. } => Err(EvalError::Unsupported("object construction".to_string()).into()),
        Expr::Closure(closure) => {
            let mut captured = HashMap::new();
            for name in &closure.bound_variables {
                captured.insert(name.clone(), frame.lookup(name)?);
            }
            let function = closure_function(Arc::new(closure.clone()), captured);
            Ok(Operand::Function(function.with_expression(closure.clone())))
        }
        Expr::Empty(operand) => {
            let empty = !eval_lenient(operand, frame)?.is_truthy()?;
            Ok(Value::Boolean(empty).into())
        }
        Expr::Return(_) => Err(EvalError::Unsupported("return inside an expression".to_string()).into()),
    }
}

fn eval_value(expr: &Expr, frame: &mut Frame) -> Result<Value> {
    eval(expr, frame)?.into_value()
}

/// Evaluates `expr`, reading an undefined variable as null.
fn eval_lenient(expr: &Expr, frame: &mut Frame) -> Result<Operand> {
    match eval(expr, frame) {
        Err(QueryError::Eval(EvalError::UndefinedVariable(_))) => Ok(Value::Null.into()),
        other => other,
    }
}

fn eval_values(args: &[Expr], frame: &mut Frame) -> Result<Vec<Value>> {
    args.iter().map(|arg| eval_value(arg, frame)).collect()
}

fn variable_name(name: &Expr, frame: &mut Frame) -> Result<String> {
    match name {
        Expr::Value(Value::String(name)) => Ok(name.clone()),
        other => Ok(eval_value(other, frame)?.to_display_string()),
    }
}

fn field(object: &Value, name: &str) -> Result<Value> {
    match object {
        Value::Object(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
        Value::Sequence(seq) => Ok(seq
            .get(&Value::String(name.to_string()))
            .cloned()
            .unwrap_or(Value::Null)),
        Value::Null => Ok(Value::Null),
        other => Err(type_error(format!(
            "cannot read property {} of {}",
            name,
            type_name(other)
        ))),
    }
}

fn index_of(subject: &Value, index: &Value) -> Result<Value> {
    let found = match (subject, array_key(index.clone())) {
        (Value::Array(items), Value::Integer(n)) => {
            usize::try_from(n).ok().and_then(|i| items.get(i)).cloned()
        }
        (Value::Array(_), _) => None,
        (Value::Object(map), key) => map.get(&key.to_display_string()).cloned(),
        (Value::Sequence(seq), key) => seq.get(&key).cloned(),
        (Value::String(s), Value::Integer(n)) => {
            let chars: Vec<char> = s.chars().collect();
            let position = if n < 0 { chars.len() as i64 + n } else { n };
            usize::try_from(position)
                .ok()
                .and_then(|i| chars.get(i))
                .map(|c| Value::String(c.to_string()))
        }
        (Value::Null, _) => None,
        (other, key) => {
            return Err(type_error(format!(
                "cannot use {} as an array with {} key",
                type_name(other),
                type_name(&key)
            )));
        }
    };
    Ok(found.unwrap_or(Value::Null))
}

/// Normalizes a key the way array literals do: canonical integer strings,
/// booleans and floats become integers, null becomes `""`.
fn array_key(key: Value) -> Value {
    match key {
        Value::String(s) => match s.parse::<i64>() {
            Ok(n) if n.to_string() == s => Value::Integer(n),
            _ => Value::String(s),
        },
        Value::Boolean(b) => Value::Integer(i64::from(b)),
        Value::Float(f) => Value::Integer(float_to_int(f)),
        Value::Null => Value::String(String::new()),
        other => other,
    }
}

fn next_key(entries: &[Entry]) -> Value {
    let next = entries
        .iter()
        .filter_map(|(k, _)| match k {
            Value::Integer(n) => Some(n.saturating_add(1)),
            _ => None,
        })
        .max()
        .unwrap_or(0)
        .max(0);
    Value::Integer(next)
}

fn insert_entry(entries: &mut Vec<Entry>, key: Option<Value>, value: Value) {
    let key = key.unwrap_or_else(|| next_key(entries));
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = value,
        None => entries.push((key, value)),
    }
}

/// The most specific collection shape for `entries`: a list when keyed
/// `0..n`, an object when every key is a string, a sequence otherwise.
fn collection_value(entries: Vec<Entry>) -> Value {
    let is_list = entries
        .iter()
        .enumerate()
        .all(|(i, (k, _))| matches!(k, Value::Integer(n) if *n == i as i64));
    if is_list {
        return Value::Array(entries.into_iter().map(|(_, v)| v).collect());
    }
    if entries.iter().all(|(k, _)| matches!(k, Value::String(_))) {
        return Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_display_string(), v))
                .collect(),
        );
    }
    Value::Sequence(Sequence::new(entries))
}

fn array(items: &[ArrayItem], frame: &mut Frame) -> Result<Value> {
    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let key = match &item.key {
            Some(key) => Some(array_key(eval_value(key, frame)?)),
            None => None,
        };
        let value = eval_value(&item.value, frame)?;
        insert_entry(&mut entries, key, value);
    }
    Ok(collection_value(entries))
}

fn assign(target: &Expr, op: AssignOp, value: &Expr, frame: &mut Frame) -> Result<Operand> {
    match target {
        Expr::Variable { name } => {
            let name = variable_name(name, frame)?;
            let assigned = match op.binary() {
                None => eval(value, frame)?,
                Some(BinOp::NullCoalesce) => match frame.locals.get(&name) {
                    Some(current) if !matches!(current, Operand::Value(Value::Null)) => current.clone(),
                    _ => eval(value, frame)?,
                },
                Some(op) => {
                    let current = frame.lookup(&name)?.into_value()?;
                    let rhs = eval_value(value, frame)?;
                    binary(op, &current, &rhs)?.into()
                }
            };
            frame.locals.insert(name, assigned.clone());
            Ok(assigned)
        }
        Expr::Index { subject, index } => {
            let Expr::Variable { name } = subject.as_ref() else {
                return Err(EvalError::Unsupported("nested index assignment".to_string()).into());
            };
            let name = variable_name(name, frame)?;
            let container = match frame.locals.get(&name) {
                Some(current) => current.clone().into_value()?,
                None => Value::Null,
            };
            let key = match index {
                Some(index) => Some(array_key(eval_value(index, frame)?)),
                None => None,
            };
            let assigned = match op.binary() {
                None => eval_value(value, frame)?,
                Some(op) => {
                    let current = match &key {
                        Some(key) => index_of(&container, key)?,
                        None => Value::Null,
                    };
                    if op == BinOp::NullCoalesce && !current.is_null() {
                        current
                    } else {
                        let rhs = eval_value(value, frame)?;
                        binary(op, &current, &rhs)?
                    }
                }
            };
            let updated = store(container, key, assigned.clone())?;
            frame.locals.insert(name, updated.into());
            Ok(assigned.into())
        }
        _ => Err(EvalError::Unsupported("assignment to a property".to_string()).into()),
    }
}

fn store(container: Value, key: Option<Value>, value: Value) -> Result<Value> {
    let mut entries = match container {
        Value::Null => vec![],
        Value::Array(mut items) => {
            match key {
                None => {
                    items.push(value);
                    return Ok(Value::Array(items));
                }
                Some(Value::Integer(n)) if usize::try_from(n).is_ok_and(|i| i < items.len()) => {
                    items[n as usize] = value;
                    return Ok(Value::Array(items));
                }
                _ => Sequence::from_values(items).to_vec(),
            }
        }
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| (array_key(Value::String(k)), v))
            .collect(),
        Value::Sequence(seq) => seq.to_vec(),
        other => {
            return Err(type_error(format!("cannot use {} as an array", type_name(&other))));
        }
    };
    insert_entry(&mut entries, key, value);
    Ok(collection_value(entries))
}

fn unary(op: UnaryOp, operand: &Value) -> Result<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Boolean(!operand.is_truthy())),
        UnaryOp::Negate => match to_number(operand) {
            Some(Value::Integer(n)) => Ok(n
                .checked_neg()
                .map_or(Value::Float(-(n as f64)), Value::Integer)),
            Some(Value::Float(f)) => Ok(Value::Float(-f)),
            _ => Err(type_error(format!("cannot negate {}", type_name(operand)))),
        },
        UnaryOp::Plus => to_number(operand)
            .ok_or_else(|| type_error(format!("{} is not numeric", type_name(operand)))),
    }
}

fn binary(op: BinOp, left: &Value, right: &Value) -> Result<Value> {
    let result = match op {
        BinOp::Add | BinOp::Subtract | BinOp::Multiply | BinOp::Divide => {
            return arithmetic(op, left, right);
        }
        BinOp::Modulo => return modulo(left, right),
        BinOp::Concat => Value::String(left.to_display_string() + &right.to_display_string()),
        BinOp::Equal => Value::Boolean(loose_equals(left, right)),
        BinOp::NotEqual => Value::Boolean(!loose_equals(left, right)),
        BinOp::Identical => Value::Boolean(left == right),
        BinOp::NotIdentical => Value::Boolean(left != right),
        BinOp::LessThan => Value::Boolean(loose_compare(left, right) == Ordering::Less),
        BinOp::GreaterThan => Value::Boolean(loose_compare(left, right) == Ordering::Greater),
        BinOp::LessEqual => Value::Boolean(loose_compare(left, right) != Ordering::Greater),
        BinOp::GreaterEqual => Value::Boolean(loose_compare(left, right) != Ordering::Less),
        BinOp::And => Value::Boolean(left.is_truthy() && right.is_truthy()),
        BinOp::Or => Value::Boolean(left.is_truthy() || right.is_truthy()),
        BinOp::NullCoalesce if left.is_null() => right.clone(),
        BinOp::NullCoalesce => left.clone(),
    };
    Ok(result)
}

fn symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Subtract => "-",
        BinOp::Multiply => "*",
        BinOp::Divide => "/",
        BinOp::Modulo => "%",
        _ => "?",
    }
}

/// Numeric value of a number or numeric string.
fn numeric(value: &Value) -> Option<Value> {
    match value {
        Value::Integer(_) | Value::Float(_) => Some(value.clone()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Some(Value::Integer(n));
    }
    let looks_numeric = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if looks_numeric {
        s.parse::<f64>().ok().map(Value::Float)
    } else {
        None
    }
}

/// Operand of an arithmetic operator.
fn to_number(value: &Value) -> Option<Value> {
    match value {
        Value::Boolean(b) => Some(Value::Integer(i64::from(*b))),
        Value::Null => Some(Value::Integer(0)),
        other => numeric(other),
    }
}

fn float_to_int(f: f64) -> i64 {
    if f.is_finite() { f.trunc() as i64 } else { 0 }
}

fn arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value> {
    let (Some(a), Some(b)) = (to_number(left), to_number(right)) else {
        return Err(type_error(format!(
            "unsupported operand types: {} {} {}",
            type_name(left),
            symbol(op),
            type_name(right)
        )));
    };
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => integer_arithmetic(op, a, b),
        (Value::Float(a), Value::Float(b)) => float_arithmetic(op, a, b),
        (a, b) => decimal_arithmetic(op, &a, &b),
    }
}

fn integer_arithmetic(op: BinOp, a: i64, b: i64) -> Result<Value> {
    let exact = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Subtract => a.checked_sub(b),
        BinOp::Multiply => a.checked_mul(b),
        BinOp::Divide => {
            if b == 0 {
                return Err(EvalError::DivisionByZero.into());
            }
            if a.checked_rem(b) == Some(0) { a.checked_div(b) } else { None }
        }
        _ => None,
    };
    match exact {
        Some(n) => Ok(Value::Integer(n)),
        None => float_arithmetic(op, a as f64, b as f64),
    }
}

fn float_arithmetic(op: BinOp, a: f64, b: f64) -> Result<Value> {
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Subtract => a - b,
        BinOp::Multiply => a * b,
        BinOp::Divide if b == 0.0 => return Err(EvalError::DivisionByZero.into()),
        BinOp::Divide => a / b,
        _ => return Err(type_error(format!("{} is not arithmetic", symbol(op)))),
    };
    Ok(Value::Float(result))
}

/// Mixed integer and float operands are computed as decimals, so `0.1 + 2`
/// is exactly `2.1` and integral results come back as integers.
fn decimal_arithmetic(op: BinOp, a: &Value, b: &Value) -> Result<Value> {
    let fallback = || {
        float_arithmetic(
            op,
            a.as_float().unwrap_or(f64::NAN),
            b.as_float().unwrap_or(f64::NAN),
        )
    };
    let as_decimal = |v: &Value| match v {
        Value::Integer(n) => Some(Decimal::from(*n)),
        Value::Float(f) => Decimal::from_f64(*f),
        _ => None,
    };
    let (Some(x), Some(y)) = (as_decimal(a), as_decimal(b)) else {
        return fallback();
    };
    if op == BinOp::Divide && y.is_zero() {
        return Err(EvalError::DivisionByZero.into());
    }

    let result = match op {
        BinOp::Add => x.checked_add(y),
        BinOp::Subtract => x.checked_sub(y),
        BinOp::Multiply => x.checked_mul(y),
        BinOp::Divide => x.checked_div(y),
        _ => None,
    };
    match result {
        Some(d) if d.is_integer() => match d.to_i64() {
            Some(n) => Ok(Value::Integer(n)),
            None => fallback(),
        },
        Some(d) => match d.to_f64() {
            Some(f) => Ok(Value::Float(f)),
            None => fallback(),
        },
        None => fallback(),
    }
}

fn modulo(left: &Value, right: &Value) -> Result<Value> {
    let as_int = |v: &Value| match to_number(v) {
        Some(Value::Integer(n)) => Some(n),
        Some(Value::Float(f)) => Some(float_to_int(f)),
        _ => None,
    };
    let (Some(a), Some(b)) = (as_int(left), as_int(right)) else {
        return Err(type_error(format!(
            "unsupported operand types: {} % {}",
            type_name(left),
            type_name(right)
        )));
    };
    if b == 0 {
        return Err(EvalError::DivisionByZero.into());
    }
    Ok(Value::Integer(a.checked_rem(b).unwrap_or(0)))
}

/// `==`: numbers and numeric strings compare by value, booleans and null by
/// truthiness, everything else strictly.
fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Boolean(b), other) | (other, Value::Boolean(b)) => *b == other.is_truthy(),
        (Value::Null, other) | (other, Value::Null) => !other.is_truthy(),
        _ => match (numeric(left), numeric(right)) {
            (Some(a), Some(b)) => a.compare(&b) == Ordering::Equal,
            _ => left == right,
        },
    }
}

fn loose_compare(left: &Value, right: &Value) -> Ordering {
    match (numeric(left), numeric(right)) {
        (Some(a), Some(b)) => a.compare(&b),
        _ => left.compare(right),
    }
}

fn to_int_lossy(value: &Value) -> i64 {
    match value {
        Value::Integer(n) => *n,
        Value::Float(f) => float_to_int(*f),
        Value::Boolean(b) => i64::from(*b),
        Value::Null => 0,
        Value::String(s) => match parse_number(s) {
            Some(Value::Integer(n)) => n,
            Some(Value::Float(f)) => float_to_int(f),
            _ => 0,
        },
        other => i64::from(other.is_truthy()),
    }
}

fn to_float_lossy(value: &Value) -> f64 {
    match value {
        Value::Float(f) => *f,
        Value::String(s) => parse_number(s).and_then(|n| n.as_float()).unwrap_or(0.0),
        other => to_int_lossy(other) as f64,
    }
}

fn cast(target: CastType, value: Value) -> Value {
    match target {
        CastType::Int => Value::Integer(to_int_lossy(&value)),
        CastType::Float => Value::Float(to_float_lossy(&value)),
        CastType::String => Value::String(value.to_display_string()),
        CastType::Bool => Value::Boolean(value.is_truthy()),
        CastType::Array => match value {
            Value::Array(_) | Value::Object(_) | Value::Sequence(_) => value,
            Value::Null => Value::Array(vec![]),
            scalar => Value::Array(vec![scalar]),
        },
    }
}

fn call_function(callee: &Expr, args: &[Expr], frame: &mut Frame) -> Result<Operand> {
    if let Expr::Value(Value::String(name)) = callee {
        let args = eval_values(args, frame)?;
        return Ok(call_builtin(&name.to_ascii_lowercase(), &args)?.into());
    }
    match eval(callee, frame)? {
        Operand::Function(function) => Ok(function.call(&eval_values(args, frame)?)?.into()),
        Operand::Value(Value::String(name)) => {
            let args = eval_values(args, frame)?;
            Ok(call_builtin(&name.to_ascii_lowercase(), &args)?.into())
        }
        other => Err(type_error(format!("{} is not callable", other.type_name()))),
    }
}

fn call_method(receiver: Operand, name: &str, args: Vec<Operand>) -> Result<Operand> {
    let method: String = name
        .chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect();
    trace!(method = %method, "calling method");

    match receiver {
        Operand::Query(query) => query_method(&query, name, &method, &args),
        Operand::Value(value) => {
            let query = Queryable::from_value(value, name)?;
            query_method(&query, name, &method, &args)
        }
        Operand::Joining(joining) => match method.as_str() {
            "on" => Ok(Operand::JoiningTo(joining.on(callable(name, &args, 0)?)?)),
            "onequality" => Ok(Operand::JoiningTo(joining.on_equality(
                callable(name, &args, 0)?,
                callable(name, &args, 1)?,
            )?)),
            _ => Err(EvalError::Unsupported(format!("method {} on a join", name)).into()),
        },
        Operand::JoiningTo(joining) => match method.as_str() {
            "to" => Ok(Operand::Query(joining.to(callable(name, &args, 0)?)?)),
            _ => Err(EvalError::Unsupported(format!("method {} on a join", name)).into()),
        },
        Operand::Function(_) => Err(type_error(format!("cannot call {} on a closure", name))),
    }
}

fn query_method(query: &Queryable, name: &str, method: &str, args: &[Operand]) -> Result<Operand> {
    let query_result = match method {
        "where" | "filter" => query.filter(callable(name, args, 0)?)?,
        "select" | "map" => query.select(callable(name, args, 0)?)?,
        "selectmany" => query.select_many(callable(name, args, 0)?)?,
        "indexby" => query.index_by(callable(name, args, 0)?)?,
        "orderby" => query
            .order_by(callable(name, args, 0)?, direction(name, args, 1)?)?
            .into_queryable(),
        "orderbyascending" => query.order_by_ascending(callable(name, args, 0)?)?.into_queryable(),
        "orderbydescending" => query.order_by_descending(callable(name, args, 0)?)?.into_queryable(),
        "thenby" => query.extend_order(callable(name, args, 0)?, direction(name, args, 1)?)?,
        "thenbyascending" => query.extend_order(callable(name, args, 0)?, Direction::Ascending)?,
        "thenbydescending" => query.extend_order(callable(name, args, 0)?, Direction::Descending)?,
        "groupby" => query.group_by(callable(name, args, 0)?)?.into_queryable(),
        "andby" => query.extend_group(callable(name, args, 0)?)?,
        "skip" => query.skip(count(name, args, 0)?),
        "take" => query.take(count(name, args, 0)?),
        "slice" => {
            let take = match args.get(1) {
                None | Some(Operand::Value(Value::Null)) => None,
                Some(_) => Some(count(name, args, 1)?),
            };
            query.slice(count(name, args, 0)?, take)
        }
        "unique" | "distinct" => query.unique(),
        "union" => query.union(values(name, args, 0)?),
        "intersect" => query.intersect(values(name, args, 0)?),
        "except" | "difference" => query.except(values(name, args, 0)?),
        "append" => query.append_values(values(name, args, 0)?),
        "wherein" => query.where_in(values(name, args, 0)?),
        "join" => return Ok(Operand::Joining(query.join(values(name, args, 0)?))),
        "groupjoin" => return Ok(Operand::Joining(query.group_join(values(name, args, 0)?))),
        _ => return request_method(query, name, method, args).map(Operand::Value),
    };
    Ok(Operand::Query(query_result))
}

fn request_method(query: &Queryable, name: &str, method: &str, args: &[Operand]) -> Result<Value> {
    match method {
        "asarray" | "toarray" | "values" | "assequence" | "tosequence" => query.to_value(),
        "first" => query.first(),
        "last" => query.last(),
        "count" => Ok(Value::from(query.count()?)),
        "exists" => Ok(Value::Boolean(query.exists()?)),
        "contains" => Ok(Value::Boolean(query.contains(argument(name, args, 0)?)?)),
        "isset" | "offsetexists" => Ok(Value::Boolean(query.isset(argument(name, args, 0)?)?)),
        "get" | "offsetget" => query.get(argument(name, args, 0)?),
        "set" | "offsetset" => Err(QueryError::UnsupportedOperation { method: "set" }),
        "unset" | "offsetunset" => Err(QueryError::UnsupportedOperation { method: "unset" }),
        "aggregate" => query.aggregate(callable(name, args, 0)?),
        "all" => Ok(Value::Boolean(query.all(optional_callable(name, args, 0)?)?)),
        "any" => Ok(Value::Boolean(query.any(optional_callable(name, args, 0)?)?)),
        "maximum" | "max" => query.maximum(optional_callable(name, args, 0)?),
        "minimum" | "min" => query.minimum(optional_callable(name, args, 0)?),
        "sum" => query.sum(optional_callable(name, args, 0)?),
        "average" | "avg" => query.average(optional_callable(name, args, 0)?),
        "implode" => {
            let delimiter = match args.first() {
                Some(delimiter) => delimiter.clone().into_value()?.to_display_string(),
                None => String::new(),
            };
            let joined = query.implode(&delimiter, optional_callable(name, args, 1)?)?;
            Ok(Value::String(joined))
        }
        _ => Err(EvalError::Unsupported(format!("method {}", name)).into()),
    }
}

fn missing_argument(name: &str, args: &[Operand], position: usize) -> QueryError {
    EvalError::ArgumentCount {
        function: name.to_string(),
        expected: position + 1,
        given: args.len(),
    }
    .into()
}

fn argument(name: &str, args: &[Operand], position: usize) -> Result<Value> {
    match args.get(position) {
        Some(arg) => arg.clone().into_value(),
        None => Err(missing_argument(name, args, position)),
    }
}

fn callable(name: &str, args: &[Operand], position: usize) -> Result<Function> {
    match args.get(position) {
        Some(Operand::Function(function)) => Ok(function.clone()),
        Some(Operand::Value(Value::String(builtin_name))) => builtin(builtin_name),
        Some(other) => Err(QueryError::invalid_argument(name, "a callable", other.type_name())),
        None => Err(missing_argument(name, args, position)),
    }
}

fn optional_callable(name: &str, args: &[Operand], position: usize) -> Result<Option<Function>> {
    match args.get(position) {
        None | Some(Operand::Value(Value::Null)) => Ok(None),
        Some(_) => callable(name, args, position).map(Some),
    }
}

fn values(name: &str, args: &[Operand], position: usize) -> Result<Values> {
    match args.get(position) {
        Some(Operand::Query(query)) => Ok(Values::from(query.clone())),
        Some(Operand::Value(value)) => Values::from_value(value.clone(), name),
        Some(other) => Err(QueryError::invalid_argument(name, "an iterable value", other.type_name())),
        None => Err(missing_argument(name, args, position)),
    }
}

/// A non-negative integer argument of a range call.
fn count(name: &str, args: &[Operand], position: usize) -> Result<usize> {
    match argument(name, args, position)? {
        Value::Integer(n) => usize::try_from(n)
            .map_err(|_| QueryError::invalid_argument(name, "a non-negative integer", n.to_string())),
        other => Err(QueryError::invalid_argument(
            name,
            "a non-negative integer",
            type_name(&other),
        )),
    }
}

fn direction(name: &str, args: &[Operand], position: usize) -> Result<Direction> {
    if args.len() <= position {
        return Ok(Direction::Ascending);
    }
    match argument(name, args, position)? {
        Value::Boolean(true) => Ok(Direction::Ascending),
        Value::Boolean(false) => Ok(Direction::Descending),
        Value::String(s) if matches!(s.to_ascii_lowercase().as_str(), "asc" | "ascending") => {
            Ok(Direction::Ascending)
        }
        Value::String(s) if matches!(s.to_ascii_lowercase().as_str(), "desc" | "descending") => {
            Ok(Direction::Descending)
        }
        other => Err(QueryError::invalid_argument(
            name,
            "'asc' or 'desc'",
            other.to_display_string(),
        )),
    }
}

// Builtins

/// Name, required argument count, maximum argument count (`None` when
/// variadic).
const BUILTINS: &[(&str, usize, Option<usize>)] = &[
    ("strlen", 1, Some(1)),
    ("count", 1, Some(1)),
    ("abs", 1, Some(1)),
    ("min", 1, None),
    ("max", 1, None),
    ("round", 1, Some(2)),
    ("floor", 1, Some(1)),
    ("ceil", 1, Some(1)),
    ("intval", 1, Some(1)),
    ("floatval", 1, Some(1)),
    ("strval", 1, Some(1)),
    ("boolval", 1, Some(1)),
    ("strtoupper", 1, Some(1)),
    ("strtolower", 1, Some(1)),
    ("trim", 1, Some(2)),
    ("substr", 2, Some(3)),
    ("str_repeat", 2, Some(2)),
    ("str_contains", 2, Some(2)),
    ("in_array", 2, Some(3)),
    ("array_sum", 1, Some(1)),
    ("is_null", 1, Some(1)),
    ("is_int", 1, Some(1)),
    ("is_float", 1, Some(1)),
    ("is_string", 1, Some(1)),
    ("is_bool", 1, Some(1)),
    ("is_array", 1, Some(1)),
    ("implode", 1, Some(2)),
    ("preg_match", 2, Some(2)),
];

pub fn is_builtin(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    BUILTINS.iter().any(|(n, ..)| *n == name)
}

fn string_arg(function: &str, value: &Value) -> Result<String> {
    match value {
        Value::Array(_) | Value::Object(_) | Value::Sequence(_) => Err(type_error(format!(
            "{}(): expects a string, {} given",
            function,
            type_name(value)
        ))),
        scalar => Ok(scalar.to_display_string()),
    }
}

fn number_arg(function: &str, value: &Value) -> Result<Value> {
    to_number(value).ok_or_else(|| {
        type_error(format!(
            "{}(): expects a number, {} given",
            function,
            type_name(value)
        ))
    })
}

fn call_builtin(name: &str, args: &[Value]) -> Result<Value> {
    let Some(&(_, required, maximum)) = BUILTINS.iter().find(|(n, ..)| *n == name) else {
        return Err(EvalError::UnknownFunction(name.to_string()).into());
    };
    if args.len() < required || maximum.is_some_and(|max| args.len() > max) {
        return Err(EvalError::ArgumentCount {
            function: name.to_string(),
            expected: required,
            given: args.len(),
        }
        .into());
    }
    debug!(function = name, arguments = args.len(), "calling builtin");

    let first = &args[0];
    let second = args.get(1);
    let result = match name {
        "strlen" => Value::from(string_arg(name, first)?.len()),
        "count" => match first {
            Value::Array(items) => Value::from(items.len()),
            Value::Object(map) => Value::from(map.len()),
            Value::Sequence(seq) => Value::from(seq.len()),
            other => {
                return Err(type_error(format!(
                    "count(): argument must be countable, {} given",
                    type_name(other)
                )));
            }
        },
        "abs" => match number_arg(name, first)? {
            Value::Integer(n) => n
                .checked_abs()
                .map_or(Value::Float((n as f64).abs()), Value::Integer),
            other => Value::Float(other.as_float().unwrap_or_default().abs()),
        },
        "min" | "max" => {
            let candidates: Vec<Value> = if args.len() == 1 {
                first.to_sequence(name)?.values().cloned().collect()
            } else {
                args.to_vec()
            };
            let wanted = if name == "min" { Ordering::Less } else { Ordering::Greater };
            candidates
                .into_iter()
                .reduce(|best, next| {
                    if loose_compare(&next, &best) == wanted { next } else { best }
                })
                .ok_or_else(|| type_error(format!("{}(): argument must contain at least one element", name)))?
        }
        "round" => {
            let x = number_arg(name, first)?.as_float().unwrap_or_default();
            let precision = second.map_or(0, to_int_lossy);
            Value::Float(round_to(x, precision))
        }
        "floor" => Value::Float(number_arg(name, first)?.as_float().unwrap_or_default().floor()),
        "ceil" => Value::Float(number_arg(name, first)?.as_float().unwrap_or_default().ceil()),
        "intval" => cast(CastType::Int, first.clone()),
        "floatval" => cast(CastType::Float, first.clone()),
        "strval" => Value::String(string_arg(name, first)?),
        "boolval" => cast(CastType::Bool, first.clone()),
        "strtoupper" => Value::String(string_arg(name, first)?.to_uppercase()),
        "strtolower" => Value::String(string_arg(name, first)?.to_lowercase()),
        "trim" => {
            let s = string_arg(name, first)?;
            match second {
                None | Some(Value::Null) => Value::from(s.trim()),
                Some(chars) => {
                    let chars = string_arg(name, chars)?;
                    Value::from(s.trim_matches(|c| chars.contains(c)))
                }
            }
        }
        "substr" => {
            let chars: Vec<char> = string_arg(name, first)?.chars().collect();
            let len = chars.len() as i64;
            let start = second.map_or(0, to_int_lossy);
            let start = if start < 0 { (len + start).max(0) } else { start.min(len) };
            let end = match args.get(2) {
                None | Some(Value::Null) => len,
                Some(length) => {
                    let length = to_int_lossy(length);
                    if length < 0 {
                        (len + length).max(start)
                    } else {
                        start.saturating_add(length).min(len)
                    }
                }
            };
            Value::String(chars[start as usize..end as usize].iter().collect())
        }
        "str_repeat" => {
            let s = string_arg(name, first)?;
            let times = second.map_or(0, to_int_lossy);
            let times = usize::try_from(times)
                .map_err(|_| type_error("str_repeat(): times must be greater than or equal to 0"))?;
            Value::String(s.repeat(times))
        }
        "str_contains" => {
            let haystack = string_arg(name, first)?;
            let needle = string_arg(name, &args[1])?;
            Value::Boolean(haystack.contains(&needle))
        }
        "in_array" => {
            let haystack = args[1].to_sequence(name)?;
            let strict = args.get(2).is_some_and(Value::is_truthy);
            Value::Boolean(haystack.values().any(|v| {
                if strict { v == first } else { loose_equals(v, first) }
            }))
        }
        "array_sum" => {
            let mut sum = Value::Integer(0);
            for value in first.to_sequence(name)?.values() {
                sum = arithmetic(BinOp::Add, &sum, value)?;
            }
            sum
        }
        "is_null" => Value::Boolean(first.is_null()),
        "is_int" => Value::Boolean(matches!(first, Value::Integer(_))),
        "is_float" => Value::Boolean(matches!(first, Value::Float(_))),
        "is_string" => Value::Boolean(matches!(first, Value::String(_))),
        "is_bool" => Value::Boolean(matches!(first, Value::Boolean(_))),
        "is_array" => Value::Boolean(first.is_iterable()),
        "implode" => {
            let (separator, pieces) = match second {
                None => (String::new(), first),
                Some(pieces) if !first.is_iterable() => (string_arg(name, first)?, pieces),
                Some(separator) => (string_arg(name, separator)?, first),
            };
            let parts: Vec<String> = pieces
                .to_sequence(name)?
                .values()
                .map(Value::to_display_string)
                .collect();
            Value::String(parts.join(&separator))
        }
        "preg_match" => {
            let pattern = compile_pattern(&string_arg(name, first)?)?;
            let subject = string_arg(name, &args[1])?;
            Value::Integer(i64::from(pattern.is_match(&subject)))
        }
        other => return Err(EvalError::UnknownFunction(other.to_string()).into()),
    };
    Ok(result)
}

fn round_to(x: f64, precision: i64) -> f64 {
    if precision >= 0 {
        let places = precision.min(28) as u32;
        Decimal::from_f64(x)
            .map(|d| d.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|d| d.to_f64())
            .unwrap_or(x)
    } else {
        let factor = 10f64.powi(precision.unsigned_abs().min(308) as i32);
        (x / factor).round() * factor
    }
}

/// Compiles a delimited pattern such as `/^a.c$/i`.
fn compile_pattern(pattern: &str) -> Result<Regex> {
    let delimiter = pattern
        .chars()
        .next()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace() && *c != '\\')
        .ok_or_else(|| type_error("preg_match(): delimiter must not be alphanumeric or backslash"))?;
    let closing = match delimiter {
        '(' => ')',
        '{' => '}',
        '[' => ']',
        '<' => '>',
        other => other,
    };

    let body = &pattern[delimiter.len_utf8()..];
    let end = body
        .rfind(closing)
        .ok_or_else(|| type_error("preg_match(): no ending delimiter"))?;
    let (expression, modifiers) = (&body[..end], &body[end + closing.len_utf8()..]);

    let mut flags = String::new();
    for modifier in modifiers.chars() {
        match modifier {
            'i' | 'm' | 's' | 'x' => flags.push(modifier),
            'u' | 'D' => {}
            other => {
                return Err(type_error(format!("preg_match(): unknown modifier '{}'", other)));
            }
        }
    }
    let source = if flags.is_empty() {
        expression.to_string()
    } else {
        format!("(?{}){}", flags, expression)
    };
    Regex::new(&source).map_err(|e| type_error(format!("invalid regex: {e}")))
}
