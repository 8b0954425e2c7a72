use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use indexmap::IndexMap;

use crate::{error::QueryError, output::to_json};

/// One `(key, value)` pair of a sequence.
pub type Entry = (Value, Value);

/// A value flowing through a query.
///
/// Scalars keep the distinction between integers and floats. Collections come
/// in three shapes: plain lists, string-keyed objects, and [`Sequence`]s, the
/// keyed result of a query (grouped members, join groups, materialized
/// results).
///
/// # Strict equality
///
/// `PartialEq`, `Eq` and `Hash` implement strict equality: values of
/// different variants are never equal, so `1`, `"1"` and `1.0` are three
/// distinct lookup keys. Floats compare by bit pattern (with `-0.0` treated
/// as `0.0`), which makes `NaN` equal to itself inside a lookup.
///
/// # Examples
///
/// ```
/// use fluent_query::Value;
///
/// assert_ne!(Value::Integer(1), Value::Float(1.0));
/// assert_ne!(Value::Integer(1), Value::from("1"));
/// assert_eq!(Value::from(vec![1, 2]), Value::Array(vec![Value::Integer(1), Value::Integer(2)]));
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// JSON null
    Null,

    /// JSON boolean (true/false)
    Boolean(bool),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// Floating-point number
    Float(f64),

    /// UTF-8 string
    String(String),

    /// Array of values, implicitly keyed `0..n`
    Array(Vec<Value>),

    /// Object with string keys, in insertion order
    Object(IndexMap<String, Value>),

    /// Keyed sequence produced by a query
    Sequence(Sequence),
}

/// An immutable, cheaply clonable list of `(key, value)` entries.
///
/// Keys are arbitrary values and keep whatever order the producing operator
/// gave them. Cloning shares the underlying buffer.
#[derive(Clone, Default)]
pub struct Sequence {
    entries: Arc<[Entry]>,
}

impl Sequence {
    pub fn new(entries: Vec<Entry>) -> Self {
        Sequence {
            entries: entries.into(),
        }
    }

    /// Builds a sequence keyed `0..n`.
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Sequence::new(
            values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (Value::Integer(i as i64), v.into()))
                .collect(),
        )
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Value stored under the first key strictly equal to `key`.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// True when the keys are exactly `0, 1, 2, ...`.
    pub fn is_list(&self) -> bool {
        self.entries
            .iter()
            .enumerate()
            .all(|(i, (k, _))| matches!(k, Value::Integer(n) if *n == i as i64))
    }

    pub fn to_vec(&self) -> Vec<Entry> {
        self.entries.to_vec()
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Sequence {}

impl FromIterator<Entry> for Sequence {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        Sequence::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for Sequence {
    type Item = Entry;
    type IntoIter = IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            entries: self.entries,
            index: 0,
        }
    }
}

/// Owning iterator over a [`Sequence`]; clones entries out of the shared
/// buffer one at a time.
#[derive(Debug, Clone)]
pub struct IntoIter {
    entries: Arc<[Entry]>,
    index: usize,
}

impl Iterator for IntoIter {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        let entry = self.entries.get(self.index)?.clone();
        self.index += 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.entries.len() - self.index;
        (remaining, Some(remaining))
    }
}

impl From<Vec<Entry>> for Sequence {
    fn from(entries: Vec<Entry>) -> Self {
        Sequence::new(entries)
    }
}

fn float_bits(f: f64) -> u64 {
    if f == 0.0 { 0 } else { f.to_bits() }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Float(a), Float(b)) => float_bits(*a) == float_bits(*b),
            (String(a), String(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Object(a), Object(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
            }
            (Sequence(a), Sequence(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Integer(n) => n.hash(state),
            Value::Float(n) => float_bits(*n).hash(state),
            Value::String(s) => s.hash(state),
            Value::Array(items) => items.hash(state),
            Value::Object(map) => {
                state.write_usize(map.len());
                for (k, v) in map {
                    k.hash(state);
                    v.hash(state);
                }
            }
            Value::Sequence(seq) => {
                state.write_usize(seq.len());
                for (k, v) in seq.iter() {
                    k.hash(state);
                    v.hash(state);
                }
            }
        }
    }
}

/// Returns a human-readable type name for a Value
pub fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Boolean(_) => "boolean",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Sequence(_) => "sequence",
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Boolean(_) => 1,
        Value::Integer(_) | Value::Float(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
        Value::Sequence(_) => 6,
    }
}

impl Value {
    /// Check if the value is truthy (for conditions)
    pub fn is_truthy(&self) -> bool {
        use Value::*;
        match self {
            Null => false,
            Boolean(b) => *b,
            Float(n) => *n != 0.0,
            Integer(n) => *n != 0,
            String(s) => !s.is_empty(),
            Array(arr) => !arr.is_empty(),
            Object(obj) => !obj.is_empty(),
            Sequence(seq) => !seq.is_empty(),
        }
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(n) => Some(n.round() as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Value::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_iterable(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_) | Value::Sequence(_))
    }

    /// String form used by concatenation and `implode`.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean(true) => "1".to_string(),
            Value::Boolean(false) => String::new(),
            Value::Integer(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::String(s) => s.clone(),
            other => to_json(other),
        }
    }

    /// Total order used by ordering, `minimum` and `maximum`.
    ///
    /// Numbers compare numerically across integer and float, strings
    /// lexicographically, collections by length then element-wise. Values of
    /// unrelated types fall back to a fixed type rank.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => unsigned_zero(*a).total_cmp(&unsigned_zero(*b)),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).total_cmp(&unsigned_zero(*b)),
            (Value::Float(a), Value::Integer(b)) => unsigned_zero(*a).total_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => compare_lists(a.iter(), b.iter(), a.len(), b.len()),
            (Value::Sequence(a), Value::Sequence(b)) => {
                compare_lists(a.values(), b.values(), a.len(), b.len())
            }
            (Value::Object(a), Value::Object(b)) => {
                compare_lists(a.values(), b.values(), a.len(), b.len())
            }
            (a, b) => type_rank(a).cmp(&type_rank(b)),
        }
    }

    /// Entries of an iterable value. Arrays are keyed `0..n`, objects by
    /// their string keys.
    pub fn to_sequence(&self, method: &str) -> Result<Sequence, QueryError> {
        match self {
            Value::Sequence(seq) => Ok(seq.clone()),
            Value::Array(items) => Ok(Sequence::from_values(items.iter().cloned())),
            Value::Object(map) => Ok(map
                .iter()
                .map(|(k, v)| (Value::String(k.clone()), v.clone()))
                .collect()),
            other => Err(QueryError::invalid_argument(method, "an iterable value", type_name(other))),
        }
    }
}

fn compare_lists<'a>(
    a: impl Iterator<Item = &'a Value>,
    b: impl Iterator<Item = &'a Value>,
    a_len: usize,
    b_len: usize,
) -> Ordering {
    a_len.cmp(&b_len).then_with(|| {
        a.zip(b)
            .map(|(x, y)| x.compare(y))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    })
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n as i64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Integer(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Sequence> for Value {
    fn from(seq: Sequence) -> Self {
        Value::Sequence(seq)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// `-0.0` becomes `0.0`; every other float is unchanged.
fn unsigned_zero(n: f64) -> f64 {
    n + 0.0
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn strict_keys_are_distinct() {
        let keys: HashSet<Value> = [Value::from(1), Value::from("1"), Value::from(1.0)]
            .into_iter()
            .collect();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn signed_zeros_compare_equal() {
        assert_eq!(Value::from(-0.0).compare(&Value::from(0.0)), Ordering::Equal);
        assert_eq!(Value::from(0.0).compare(&Value::from(-0.0)), Ordering::Equal);
        assert_eq!(Value::from(0).compare(&Value::from(-0.0)), Ordering::Equal);
        assert_eq!(Value::from(-0.0).compare(&Value::from(0)), Ordering::Equal);
        assert_eq!(Value::from(-0.5).compare(&Value::from(-0.0)), Ordering::Less);
    }

    #[test]
    fn negative_zero_matches_zero() {
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
    }

    #[test]
    fn nan_is_its_own_key() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn compare_mixes_numbers() {
        assert_eq!(Value::from(1).compare(&Value::from(1.5)), Ordering::Less);
        assert_eq!(Value::from(2.0).compare(&Value::from(2)), Ordering::Equal);
        assert_eq!(Value::Null.compare(&Value::from(false)), Ordering::Less);
    }

    #[test]
    fn display_strings() {
        assert_eq!(Value::from(true).to_display_string(), "1");
        assert_eq!(Value::Null.to_display_string(), "");
        assert_eq!(Value::from(2.5).to_display_string(), "2.5");
    }

    #[test]
    fn sequence_list_detection() {
        assert!(Sequence::from_values(vec![3, 4]).is_list());
        let keyed = Sequence::new(vec![(Value::from("a"), Value::from(1))]);
        assert!(!keyed.is_list());
    }
}
