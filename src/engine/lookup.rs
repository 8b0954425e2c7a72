use indexmap::IndexMap;
use tracing::trace;

use crate::{
    engine::{EntryIter, deferred, from_entries, materialize},
    error::Result,
    function::Function,
    value::{Entry, Sequence, Value},
};

/// Entries grouped by a strictly compared key.
///
/// Keys iterate in order of first appearance and each group keeps its
/// members in source order, so a lookup probe returns inner elements in the
/// same order a full scan would.
#[derive(Debug, Default)]
pub struct Lookup {
    groups: IndexMap<Value, Vec<Entry>>,
}

impl Lookup {
    pub fn build<I, F>(entries: I, mut key_of: F) -> Result<Lookup>
    where
        I: IntoIterator<Item = Entry>,
        F: FnMut(&Entry) -> Result<Value>,
    {
        let mut groups: IndexMap<Value, Vec<Entry>> = IndexMap::new();
        let mut count = 0usize;
        for entry in entries {
            let key = key_of(&entry)?;
            groups.entry(key).or_default().push(entry);
            count += 1;
        }
        trace!(keys = groups.len(), entries = count, "built lookup");
        Ok(Lookup { groups })
    }

    /// Members under `key`; empty when the key never occurred.
    pub fn get(&self, key: &Value) -> &[Entry] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.groups.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn into_groups(self) -> impl Iterator<Item = (Value, Vec<Entry>)> {
        self.groups.into_iter()
    }
}

/// Composite key of an element under several key functions. A single
/// function's result is used as is.
pub fn composite_key(functions: &[Function], (key, value): &Entry) -> Result<Value> {
    let mut parts = functions
        .iter()
        .map(|f| f.call(&[value.clone(), key.clone()]))
        .collect::<Result<Vec<_>>>()?;
    if parts.len() == 1 {
        Ok(parts.remove(0))
    } else {
        Ok(Value::Array(parts))
    }
}

/// One entry per distinct composite key, keyed `0..n`; each value is the
/// sequence of that key's members with their original keys.
pub fn group_by(upstream: EntryIter, functions: Vec<Function>) -> EntryIter {
    deferred(move || {
        let lookup = Lookup::build(materialize(upstream)?, |entry| {
            composite_key(&functions, entry)
        })?;
        Ok(from_entries(
            lookup
                .into_groups()
                .enumerate()
                .map(|(i, (_, members))| (Value::from(i), Value::Sequence(Sequence::new(members))))
                .collect(),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(values: Vec<Value>) -> Vec<Entry> {
        Sequence::from_values(values).to_vec()
    }

    #[test]
    fn keys_are_strict() {
        let lookup = Lookup::build(
            entries(vec![Value::from(1), Value::from("1"), Value::from(1.0), Value::from(1)]),
            |(_, v)| Ok(v.clone()),
        )
        .unwrap();
        assert_eq!(lookup.len(), 3);
        assert_eq!(lookup.get(&Value::from(1)).len(), 2);
        assert!(lookup.get(&Value::from(2)).is_empty());
    }

    #[test]
    fn groups_keep_first_appearance_order() {
        let source = entries(vec![Value::from(3), Value::from(1), Value::from(4), Value::from(2)]);
        let grouped: Vec<Entry> = group_by(
            Box::new(source.into_iter().map(Ok)),
            vec![Function::unary(|v| v.as_int().unwrap() % 2)],
        )
        .collect::<Result<_>>()
        .unwrap();

        assert_eq!(grouped.len(), 2);
        let odd = grouped[0].1.as_sequence().unwrap();
        assert_eq!(
            odd.to_vec(),
            vec![(Value::from(0), Value::from(3)), (Value::from(1), Value::from(1))]
        );
        assert_eq!(grouped[1].0, Value::from(1));
    }

    #[test]
    fn composite_keys_combine_every_function() {
        let functions = vec![
            Function::unary(|v| v.as_int().unwrap() % 2),
            Function::unary(|v| v.as_int().unwrap() > 2),
        ];
        let key = composite_key(&functions, &(Value::from(0), Value::from(3))).unwrap();
        assert_eq!(key, Value::from(vec![Value::from(1), Value::from(true)]));
    }
}
