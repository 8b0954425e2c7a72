use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};

use crate::{
    engine::EntryIter,
    error::{EvalError, QueryError, Result},
    function::Function,
    query::Request,
    value::{Entry, Sequence, Value, type_name},
};

/// Evaluates `request` over the pipeline output.
pub fn reduce(mut entries: EntryIter, request: &Request) -> Result<Value> {
    match request {
        Request::Values => entries.collect::<Result<Sequence>>().map(Value::Sequence),
        Request::First => Ok(entries.next().transpose()?.map(|(_, v)| v).unwrap_or(Value::Null)),
        Request::Last => {
            let mut last = Value::Null;
            for entry in entries {
                last = entry?.1;
            }
            Ok(last)
        }
        Request::Count => {
            let mut count = 0usize;
            for entry in entries {
                entry?;
                count += 1;
            }
            Ok(Value::from(count))
        }
        Request::Exists => Ok(Value::from(entries.next().transpose()?.is_some())),
        Request::Contains(needle) => {
            for entry in entries {
                if &entry?.1 == needle {
                    return Ok(Value::from(true));
                }
            }
            Ok(Value::from(false))
        }
        Request::IssetIndex(key) => Ok(Value::from(
            find_key(entries, key)?.is_some_and(|v| !v.is_null()),
        )),
        Request::GetIndex(key) => Ok(find_key(entries, key)?.unwrap_or(Value::Null)),
        Request::Aggregate(function) => {
            let mut accumulator: Option<Value> = None;
            for entry in entries {
                let value = entry?.1;
                accumulator = Some(match accumulator {
                    None => value,
                    Some(acc) => function.call(&[acc, value])?,
                });
            }
            Ok(accumulator.unwrap_or(Value::Null))
        }
        Request::All(function) => {
            for entry in entries {
                if !project(function.as_ref(), entry?)?.is_truthy() {
                    return Ok(Value::from(false));
                }
            }
            Ok(Value::from(true))
        }
        Request::Any(function) => {
            for entry in entries {
                if project(function.as_ref(), entry?)?.is_truthy() {
                    return Ok(Value::from(true));
                }
            }
            Ok(Value::from(false))
        }
        Request::Maximum(function) => extreme(entries, function.as_ref(), std::cmp::Ordering::Greater),
        Request::Minimum(function) => extreme(entries, function.as_ref(), std::cmp::Ordering::Less),
        Request::Sum(function) => {
            let mut sum = Sum::default();
            let mut any = false;
            for entry in entries {
                sum.add(&project(function.as_ref(), entry?)?, "sum")?;
                any = true;
            }
            Ok(if any { sum.into_value() } else { Value::Null })
        }
        Request::Average(function) => {
            let mut sum = Sum::default();
            let mut count = 0i64;
            for entry in entries {
                sum.add(&project(function.as_ref(), entry?)?, "average")?;
                count += 1;
            }
            Ok(if count == 0 {
                Value::Null
            } else {
                sum.average(count)
            })
        }
        Request::Implode {
            delimiter,
            function,
        } => {
            let mut parts = vec![];
            for entry in entries {
                parts.push(project(function.as_ref(), entry?)?.to_display_string());
            }
            Ok(Value::String(parts.join(delimiter)))
        }
    }
}

fn project(function: Option<&Function>, (key, value): Entry) -> Result<Value> {
    match function {
        Some(f) => f.call(&[value, key]),
        None => Ok(value),
    }
}

fn find_key(entries: EntryIter, key: &Value) -> Result<Option<Value>> {
    for entry in entries {
        let (k, v) = entry?;
        if &k == key {
            return Ok(Some(v));
        }
    }
    Ok(None)
}

/// First value whose comparison against every later one is `wanted` or
/// equal.
fn extreme(
    entries: EntryIter,
    function: Option<&Function>,
    wanted: std::cmp::Ordering,
) -> Result<Value> {
    let mut best: Option<Value> = None;
    for entry in entries {
        let value = project(function, entry?)?;
        best = match best {
            Some(current) if value.compare(&current) != wanted => Some(current),
            _ => Some(value),
        };
    }
    Ok(best.unwrap_or(Value::Null))
}

/// Running numeric sum. Integers stay exact until one overflows or a float
/// joins in, after which the sum is kept as a decimal.
#[derive(Debug, Default)]
enum Sum {
    #[default]
    Empty,
    Integer(i64),
    Decimal(Decimal),
    Float(f64),
}

impl Sum {
    fn add(&mut self, value: &Value, method: &'static str) -> Result<()> {
        let next = match (&*self, value) {
            (Sum::Empty, Value::Integer(n)) => Sum::Integer(*n),
            (Sum::Empty, Value::Float(f)) => Sum::from_float(0.into(), *f),
            (Sum::Integer(a), Value::Integer(b)) => match a.checked_add(*b) {
                Some(n) => Sum::Integer(n),
                None => Sum::Decimal(Decimal::from(*a) + Decimal::from(*b)),
            },
            (Sum::Integer(a), Value::Float(f)) => Sum::from_float(Decimal::from(*a), *f),
            (Sum::Decimal(d), Value::Integer(n)) => match d.checked_add(Decimal::from(*n)) {
                Some(sum) => Sum::Decimal(sum),
                None => Sum::Float(d.to_f64().unwrap_or(f64::NAN) + *n as f64),
            },
            (Sum::Decimal(d), Value::Float(f)) => Sum::from_float(*d, *f),
            (Sum::Float(acc), other) if other.as_float().is_some() => {
                Sum::Float(acc + other.as_float().unwrap_or_default())
            }
            (_, other) => {
                return Err(QueryError::Eval(EvalError::TypeError(format!(
                    "{} expects numeric values, {} given",
                    method,
                    type_name(other)
                ))));
            }
        };
        *self = next;
        Ok(())
    }

    fn from_float(base: Decimal, f: f64) -> Sum {
        match Decimal::from_f64(f).and_then(|d| base.checked_add(d)) {
            Some(sum) => Sum::Decimal(sum),
            None => Sum::Float(base.to_f64().unwrap_or(f64::NAN) + f),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Sum::Empty => Value::Null,
            Sum::Integer(n) => Value::Integer(n),
            Sum::Decimal(d) if d.is_integer() => match d.to_i64() {
                Some(n) => Value::Integer(n),
                None => Value::Float(d.to_f64().unwrap_or(f64::NAN)),
            },
            Sum::Decimal(d) => Value::Float(d.to_f64().unwrap_or(f64::NAN)),
            Sum::Float(f) => Value::Float(f),
        }
    }

    fn average(self, count: i64) -> Value {
        let count_decimal = Decimal::from(count);
        let average = match self {
            Sum::Empty => return Value::Null,
            Sum::Integer(n) => Decimal::from(n).checked_div(count_decimal),
            Sum::Decimal(d) => d.checked_div(count_decimal),
            Sum::Float(f) => return Value::Float(f / count as f64),
        };
        match average.and_then(|d| d.to_f64()) {
            Some(f) => Value::Float(f),
            None => Value::Float(f64::NAN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(values: Vec<Value>) -> EntryIter {
        Box::new(Sequence::from_values(values).into_iter().map(Ok))
    }

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|n| Value::from(*n)).collect()
    }

    fn reduce_ints(values: &[i64], request: Request) -> Value {
        reduce(source(ints(values)), &request).unwrap()
    }

    #[test]
    fn empty_reductions() {
        for request in [
            Request::First,
            Request::Last,
            Request::Maximum(None),
            Request::Minimum(None),
            Request::Sum(None),
            Request::Average(None),
            Request::Aggregate(Function::identity()),
        ] {
            assert_eq!(reduce_ints(&[], request), Value::Null);
        }
        assert_eq!(reduce_ints(&[], Request::Count), Value::from(0));
        assert_eq!(reduce_ints(&[], Request::All(None)), Value::from(true));
        assert_eq!(reduce_ints(&[], Request::Any(None)), Value::from(false));
        assert_eq!(
            reduce_ints(
                &[],
                Request::Implode {
                    delimiter: ",".to_string(),
                    function: None
                }
            ),
            Value::from("")
        );
    }

    #[test]
    fn scalar_reductions() {
        assert_eq!(reduce_ints(&[4, 7, 1], Request::First), Value::from(4));
        assert_eq!(reduce_ints(&[4, 7, 1], Request::Last), Value::from(1));
        assert_eq!(reduce_ints(&[4, 7, 1], Request::Maximum(None)), Value::from(7));
        assert_eq!(reduce_ints(&[4, 7, 1], Request::Minimum(None)), Value::from(1));
        assert_eq!(reduce_ints(&[4, 7, 1], Request::Sum(None)), Value::from(12));
        assert_eq!(reduce_ints(&[4, 7, 1], Request::Average(None)), Value::from(4.0));
        assert_eq!(
            reduce_ints(&[1, 2, 3], Request::Aggregate(Function::binary(|a, b| a.as_int().unwrap() * b.as_int().unwrap()))),
            Value::from(6)
        );
    }

    #[test]
    fn sums_mix_integers_and_floats_exactly() {
        let mixed = reduce(
            source(vec![Value::from(1), Value::from(0.1), Value::from(0.2)]),
            &Request::Sum(None),
        )
        .unwrap();
        assert_eq!(mixed, Value::from(1.3));

        let integral = reduce(source(vec![Value::from(1), Value::from(2.0)]), &Request::Sum(None)).unwrap();
        assert_eq!(integral, Value::from(3));
    }

    #[test]
    fn integer_overflow_promotes() {
        let sum = reduce_ints(&[i64::MAX, 1], Request::Sum(None));
        assert!(matches!(sum, Value::Float(_)));
    }

    #[test]
    fn sum_rejects_strings() {
        let err = reduce(source(vec![Value::from("1")]), &Request::Sum(None)).unwrap_err();
        assert!(matches!(err, QueryError::Eval(EvalError::TypeError(_))));
    }

    #[test]
    fn index_requests() {
        let seq = Sequence::new(vec![
            (Value::from("a"), Value::from(1)),
            (Value::from("b"), Value::Null),
        ]);
        let isset = |key: &str| {
            reduce(Box::new(seq.clone().into_iter().map(Ok)), &Request::IssetIndex(Value::from(key))).unwrap()
        };
        assert_eq!(isset("a"), Value::from(true));
        assert_eq!(isset("b"), Value::from(false));
        assert_eq!(isset("c"), Value::from(false));

        let get = reduce(Box::new(seq.into_iter().map(Ok)), &Request::GetIndex(Value::from("a"))).unwrap();
        assert_eq!(get, Value::from(1));
    }

    #[test]
    fn contains_is_strict() {
        assert_eq!(
            reduce(source(ints(&[1, 2])), &Request::Contains(Value::from("1"))).unwrap(),
            Value::from(false)
        );
        assert_eq!(
            reduce(source(ints(&[1, 2])), &Request::Contains(Value::from(2))).unwrap(),
            Value::from(true)
        );
    }

    #[test]
    fn maximum_keeps_first_of_equals() {
        let max = reduce(
            source(vec![Value::from(2.0), Value::from(2), Value::from(1)]),
            &Request::Maximum(None),
        )
        .unwrap();
        assert_eq!(max, Value::from(2.0));
    }

    #[test]
    fn implode_uses_display_strings() {
        let joined = reduce(
            source(vec![Value::from(1), Value::Null, Value::from(true), Value::from("x")]),
            &Request::Implode {
                delimiter: "|".to_string(),
                function: None,
            },
        )
        .unwrap();
        assert_eq!(joined, Value::from("1||1|x"));
    }
}
