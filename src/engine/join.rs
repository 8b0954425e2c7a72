use crate::{
    engine::{EntryIter, deferred, lookup::Lookup, reindex},
    error::Result,
    function::Function,
    query::{JoinFilter, JoinSegment},
    value::{Entry, Sequence, Value},
};

/// Finds the inner entries matching one outer entry.
enum Matcher {
    /// Scans every inner entry per outer entry.
    Predicate {
        predicate: Function,
        inner: Sequence,
    },

    /// Probes a lookup built once over the inner entries.
    Equality { outer_key: Function, lookup: Lookup },
}

impl Matcher {
    fn new(filter: JoinFilter, inner: Sequence) -> Result<Self> {
        match filter {
            JoinFilter::On(predicate) => Ok(Matcher::Predicate { predicate, inner }),
            JoinFilter::OnEquality {
                outer_key,
                inner_key,
            } => {
                let lookup = Lookup::build(inner, |(key, value)| {
                    inner_key.call(&[value.clone(), key.clone()])
                })?;
                Ok(Matcher::Equality { outer_key, lookup })
            }
        }
    }

    fn matches(&self, (outer_key, outer_value): &Entry) -> Result<Vec<Entry>> {
        match self {
            Matcher::Predicate { predicate, inner } => {
                let mut matched = vec![];
                for (inner_key, inner_value) in inner {
                    let keep = predicate.call(&[
                        outer_value.clone(),
                        inner_value.clone(),
                        outer_key.clone(),
                        inner_key.clone(),
                    ])?;
                    if keep.is_truthy() {
                        matched.push((inner_key.clone(), inner_value.clone()));
                    }
                }
                Ok(matched)
            }
            Matcher::Equality {
                outer_key: key_function,
                lookup,
            } => {
                let key = key_function.call(&[outer_value.clone(), outer_key.clone()])?;
                Ok(lookup.get(&key).to_vec())
            }
        }
    }
}

fn combine(selector: &Function, grouped: bool, outer: Entry, matched: Vec<Entry>) -> Vec<Result<Entry>> {
    let (outer_key, outer_value) = outer;
    if grouped {
        let group = Value::Sequence(Sequence::new(matched));
        return vec![
            selector
                .call(&[outer_value, group, outer_key])
                .map(|v| (Value::Null, v)),
        ];
    }
    matched
        .into_iter()
        .map(|(inner_key, inner_value)| {
            selector
                .call(&[outer_value.clone(), inner_value, outer_key.clone(), inner_key])
                .map(|v| (Value::Null, v))
        })
        .collect()
}

/// Joins each outer entry with its matching inner entries.
///
/// A plain join yields one selector result per matching pair; a group join
/// yields exactly one per outer entry, with the (possibly empty) group. The
/// inner side is loaded, and the lookup built, on the first pull. Results
/// are keyed `0..n`.
pub fn join(upstream: EntryIter, segment: JoinSegment) -> EntryIter {
    let JoinSegment {
        values,
        grouped,
        filter,
        selector,
    } = segment;

    let joined = deferred(move || {
        let matcher = Matcher::new(filter, values.load()?)?;
        let per_outer = upstream.flat_map(move |outer| {
            let results = match outer.and_then(|o| matcher.matches(&o).map(|m| (o, m))) {
                Ok((outer, matched)) => combine(&selector, grouped, outer, matched),
                Err(e) => vec![Err(e)],
            };
            results.into_iter()
        });
        Ok(Box::new(per_outer) as EntryIter)
    });
    reindex(joined)
}
