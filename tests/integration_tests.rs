// tests/integration_tests.rs

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use fluent_query::output::from_json;
use fluent_query::{
    Function, FunctionConverter, InMemoryProvider, QueryError, Queryable, Sequence,
    SourceExtractionError, Value,
};
use serde_json::json;

fn f(source: &str) -> Function {
    Function::parse(source).unwrap()
}

fn one_to_ten() -> Queryable {
    Queryable::from_values(1..=10)
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|n| Value::from(*n)).collect()
}

fn strings(values: Vec<Value>) -> Vec<String> {
    values.iter().map(Value::to_display_string).collect()
}

fn people() -> Queryable {
    let json = json!([
        {"name": "ann", "age": 30},
        {"name": "bob", "age": 25},
        {"name": "cid", "age": 30},
        {"name": "dan", "age": 25}
    ]);
    Queryable::from_value(from_json(json), "people").unwrap()
}

// ============================================================================
// Fluent Segments
// ============================================================================

#[test]
fn test_filter_select_order() {
    let words = Queryable::from_values(vec!["pear", "fig", "apple", "kiwi"]);
    let result = words
        .filter(f("fn ($w) => strlen($w) > 3"))
        .unwrap()
        .select(f("fn ($w) => strtoupper($w)"))
        .unwrap()
        .order_by_descending(f("fn ($w) => $w"))
        .unwrap();

    assert_eq!(strings(result.values().unwrap()), vec!["PEAR", "KIWI", "APPLE"]);
}

#[test]
fn test_select_keeps_keys() {
    let doubled = one_to_ten().take(3).select(f("fn ($x, $k) => $x * 2 + $k")).unwrap();
    assert_eq!(
        doubled.entries().unwrap(),
        vec![
            (Value::from(0), Value::from(2)),
            (Value::from(1), Value::from(5)),
            (Value::from(2), Value::from(8)),
        ]
    );
}

#[test]
fn test_order_by_then_by() {
    let names = people()
        .order_by_descending(f("fn ($p) => $p->age"))
        .unwrap()
        .then_by_ascending(f("fn ($p) => $p['name']"))
        .unwrap()
        .select(f("fn ($p) => $p->name"))
        .unwrap();

    assert_eq!(strings(names.values().unwrap()), vec!["ann", "cid", "bob", "dan"]);
}

#[test]
fn test_ordering_is_stable() {
    let ordered = people().order_by_ascending(f("fn ($p) => $p->age")).unwrap();
    let names = ordered.select(f("fn ($p) => $p->name")).unwrap();
    assert_eq!(strings(names.values().unwrap()), vec!["bob", "dan", "ann", "cid"]);
}

#[test]
fn test_group_by() {
    let groups = people()
        .group_by(f("fn ($p) => $p->age"))
        .unwrap()
        .select(f("fn ($group) => $group->implode(',', fn ($p) => $p->name)"))
        .unwrap();

    assert_eq!(strings(groups.values().unwrap()), vec!["ann,cid", "bob,dan"]);
}

#[test]
fn test_group_by_and_by() {
    let groups = people()
        .group_by(f("fn ($p) => $p->age"))
        .unwrap()
        .and_by(f("fn ($p) => $p->name === 'ann'"))
        .unwrap();

    assert_eq!(groups.count().unwrap(), 3);
    let sizes = groups.select(f("fn ($g) => $g->count()")).unwrap();
    assert_eq!(sizes.values().unwrap(), ints(&[1, 2, 1]));
}

#[test]
fn test_select_many_reindexes() {
    let flattened = Queryable::from_values(vec![
        Value::from(vec![1, 2]),
        Value::from(vec![3]),
        Value::from(Vec::<i64>::new()),
        Value::from(vec![4, 5]),
    ])
    .select_many(Function::identity())
    .unwrap();

    let keys: Vec<Value> = flattened.entries().unwrap().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, ints(&[0, 1, 2, 3, 4]));
    assert_eq!(flattened.values().unwrap(), ints(&[1, 2, 3, 4, 5]));
}

#[test]
fn test_select_many_requires_iterables() {
    let err = one_to_ten()
        .select_many(Function::identity())
        .unwrap()
        .count()
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidArgument { .. }));
}

#[test]
fn test_skip_take_slice() {
    assert_eq!(one_to_ten().skip(8).values().unwrap(), ints(&[9, 10]));
    assert_eq!(one_to_ten().take(2).values().unwrap(), ints(&[1, 2]));

    let sliced = one_to_ten().slice(2, Some(3));
    assert_eq!(sliced.values().unwrap(), ints(&[3, 4, 5]));
    let keys: Vec<Value> = sliced.entries().unwrap().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, ints(&[2, 3, 4]));

    assert!(one_to_ten().skip(20).values().unwrap().is_empty());
}

#[test]
fn test_index_by_last_value_wins() {
    let indexed = Queryable::from_values(vec!["a", "bb", "cc", "d"])
        .index_by(Function::builtin("strlen").unwrap())
        .unwrap();

    assert_eq!(
        indexed.entries().unwrap(),
        vec![
            (Value::from(1), Value::from("d")),
            (Value::from(2), Value::from("cc")),
        ]
    );
    assert_eq!(indexed.get(2).unwrap(), Value::from("cc"));
}

#[test]
fn test_index_by_null_keeps_last_element() {
    let indexed = one_to_ten().index_by(f("fn () => null")).unwrap();
    assert_eq!(indexed.entries().unwrap(), vec![(Value::Null, Value::from(10))]);
}

// ============================================================================
// Set Operations
// ============================================================================

#[test]
fn test_difference_preserves_keys() {
    let other = Sequence::new(vec![
        (Value::from("test"), Value::from(1)),
        (Value::from("anotherkey"), Value::from(3)),
        (Value::from(1000), Value::from(5)),
    ]);
    let difference = one_to_ten().difference(other);

    let expected: Vec<(Value, Value)> = [(1, 2), (3, 4), (5, 6), (6, 7), (7, 8), (8, 9), (9, 10)]
        .into_iter()
        .map(|(k, v)| (Value::from(k), Value::from(v)))
        .collect();
    assert_eq!(difference.entries().unwrap(), expected);
}

#[test]
fn test_difference_with_self_is_empty() {
    let query = one_to_ten();
    assert_eq!(query.difference(query.clone()).count().unwrap(), 0);
    assert_eq!(query.except(Vec::<i64>::new()).count().unwrap(), 10);
}

#[test]
fn test_union_intersect_append() {
    let left = Queryable::from_values(vec![1, 2, 2, 3]);

    let union = left.union(vec![3, 4]);
    assert_eq!(union.values().unwrap(), ints(&[1, 2, 3, 4]));

    let intersect = left.intersect(vec![2, 3, 9]);
    assert_eq!(intersect.values().unwrap(), ints(&[2, 3]));

    let appended = left.append_values(vec![1]);
    assert_eq!(appended.values().unwrap(), ints(&[1, 2, 2, 3, 1]));
    let keys: Vec<Value> = appended.entries().unwrap().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, ints(&[0, 1, 2, 3, 4]));

    let kept = left.where_in(vec![2]);
    assert_eq!(kept.values().unwrap(), ints(&[2, 2]));
}

#[test]
fn test_set_operations_are_strict() {
    let mixed = Queryable::from_values(vec![Value::from(1), Value::from("1"), Value::from(1.0)]);
    assert_eq!(mixed.unique().count().unwrap(), 3);
    assert_eq!(mixed.intersect(vec!["1"]).values().unwrap(), vec![Value::from("1")]);
}

// ============================================================================
// Joins
// ============================================================================

#[test]
fn test_group_join_on_identity() {
    let joined = one_to_ten()
        .group_join(vec![
            Value::from(1),
            Value::from(2),
            Value::from(2),
            Value::from(3),
            Value::from("4"),
            Value::from("5"),
        ])
        .on(f("fn ($outer, $inner) => $outer === $inner"))
        .unwrap()
        .to(f("fn ($outer, $values) => $outer . '-' . $values->implode('-')"))
        .unwrap();

    assert_eq!(
        strings(joined.values().unwrap()),
        vec!["1-1", "2-2-2", "3-3", "4-", "5-", "6-", "7-", "8-", "9-", "10-"]
    );
}

#[test]
fn test_group_join_on_equality_matches_predicate() {
    let inner = vec![
        Value::from(1),
        Value::from(2),
        Value::from(2),
        Value::from(3),
        Value::from("4"),
    ];
    let selector = "fn ($outer, $values) => $outer . '-' . $values->implode('-')";

    let by_equality = one_to_ten()
        .take(4)
        .group_join(inner.clone())
        .on_equality(f("fn ($outer) => $outer"), f("fn ($inner) => $inner"))
        .unwrap()
        .to(f(selector))
        .unwrap();
    let by_predicate = one_to_ten()
        .take(4)
        .group_join(inner)
        .on(f("fn ($outer, $inner) => $outer === $inner"))
        .unwrap()
        .to(f(selector))
        .unwrap();

    let expected = vec!["1-1", "2-2-2", "3-3", "4-"];
    assert_eq!(strings(by_equality.values().unwrap()), expected);
    assert_eq!(strings(by_predicate.values().unwrap()), expected);
}

#[test]
fn test_group_join_with_builtin_key() {
    let words = vec!["foo", "bar", "baz", "tear", "cow", "tripod", "whisky", "sand", "which"];
    let joined = one_to_ten()
        .group_join(words)
        .on_equality(Function::identity(), Function::builtin("strlen").unwrap())
        .unwrap()
        .to(f("fn ($outer, $group) => $outer . ':' . $group->implode('|')"))
        .unwrap();

    assert_eq!(
        strings(joined.values().unwrap()),
        vec![
            "1:",
            "2:",
            "3:foo|bar|baz|cow",
            "4:tear|sand",
            "5:which",
            "6:tripod|whisky",
            "7:",
            "8:",
            "9:",
            "10:"
        ]
    );
}

#[test]
fn test_group_join_with_greater_than() {
    let query = one_to_ten().take(4);
    let joined = query
        .group_join(query.clone())
        .on(f("fn ($outer, $inner) => $outer >= $inner"))
        .unwrap()
        .to(f("fn ($outer, $group) => $outer . ':' . $group->implode('|')"))
        .unwrap();

    assert_eq!(
        strings(joined.values().unwrap()),
        vec!["1:1", "2:1|2", "3:1|2|3", "4:1|2|3|4"]
    );
}

#[test]
fn test_group_join_on_false_is_an_empty_left_join() {
    let joined = Queryable::from_values(vec![1, 2])
        .group_join(vec![1, 2])
        .on(f("fn () => false"))
        .unwrap()
        .to(f("fn ($outer, $group) => [$outer, $group->count()]"))
        .unwrap();

    assert_eq!(
        joined.values().unwrap(),
        vec![Value::from(vec![1, 0]), Value::from(vec![2, 0])]
    );
}

#[test]
fn test_join_pairs() {
    let pairs = Queryable::from_values(vec!["a", "bb", "c"])
        .join(vec![1, 2])
        .on_equality(Function::builtin("strlen").unwrap(), Function::identity())
        .unwrap()
        .to(f("fn ($word, $length) => $word . '=' . $length"))
        .unwrap();

    assert_eq!(strings(pairs.values().unwrap()), vec!["a=1", "bb=2", "c=1"]);
}

#[test]
fn test_join_inside_closure() {
    let query = f("fn ($xs) => $xs->join([2, 3])->on(fn ($a, $b) => $a === $b)->to(fn ($a, $b) => $a * $b)->sum()");
    let total = query.call(&[Value::from(vec![1, 2, 3])]).unwrap();
    assert_eq!(total, Value::from(13));
}

// ============================================================================
// Requests
// ============================================================================

#[test]
fn test_scalar_requests() {
    let query = one_to_ten();
    assert_eq!(query.first().unwrap(), Value::from(1));
    assert_eq!(query.last().unwrap(), Value::from(10));
    assert_eq!(query.count().unwrap(), 10);
    assert!(query.exists().unwrap());
    assert!(query.contains(5).unwrap());
    assert!(!query.contains("5").unwrap());
    assert_eq!(query.sum(None).unwrap(), Value::from(55));
    assert_eq!(query.average(None).unwrap(), Value::from(5.5));
    assert_eq!(query.maximum(Some(f("fn ($x) => $x % 7"))).unwrap(), Value::from(6));
    assert_eq!(query.minimum(None).unwrap(), Value::from(1));
    assert_eq!(
        query.take(5).aggregate(f("fn ($a, $b) => $a * $b")).unwrap(),
        Value::from(120)
    );
    assert!(query.all(Some(f("fn ($x) => $x > 0"))).unwrap());
    assert!(!query.any(Some(f("fn ($x) => $x > 10"))).unwrap());
    assert_eq!(query.take(3).implode(", ", None).unwrap(), "1, 2, 3");
}

#[test]
fn test_empty_requests() {
    let empty = Queryable::from_values(Vec::<i64>::new());
    assert_eq!(empty.first().unwrap(), Value::Null);
    assert_eq!(empty.last().unwrap(), Value::Null);
    assert_eq!(empty.count().unwrap(), 0);
    assert!(!empty.exists().unwrap());
    assert_eq!(empty.sum(None).unwrap(), Value::Null);
    assert_eq!(empty.average(None).unwrap(), Value::Null);
    assert_eq!(empty.maximum(None).unwrap(), Value::Null);
    assert_eq!(empty.aggregate(Function::identity()).unwrap(), Value::Null);
    assert!(empty.all(None).unwrap());
    assert!(!empty.any(None).unwrap());
    assert_eq!(empty.implode(",", None).unwrap(), "");
}

#[test]
fn test_index_requests() {
    let keyed = Queryable::from_sequence(Sequence::new(vec![
        (Value::from("a"), Value::from(1)),
        (Value::from("b"), Value::Null),
    ]));

    assert!(keyed.isset("a").unwrap());
    assert!(!keyed.isset("b").unwrap());
    assert!(!keyed.isset("c").unwrap());
    assert_eq!(keyed.get("a").unwrap(), Value::from(1));
    assert_eq!(keyed.get("c").unwrap(), Value::Null);
}

#[test]
fn test_index_mutation_is_unsupported() {
    let query = one_to_ten();
    assert_eq!(
        query.set(0, 5).unwrap_err(),
        QueryError::UnsupportedOperation { method: "set" }
    );
    assert_eq!(
        query.unset(0).unwrap_err(),
        QueryError::UnsupportedOperation { method: "unset" }
    );

    let err = f("fn ($xs) => $xs->offsetSet(0, 1)")
        .call(&[Value::from(vec![1])])
        .unwrap_err();
    assert_eq!(err, QueryError::UnsupportedOperation { method: "set" });
}

#[test]
fn test_as_sequence_and_to_value_agree() {
    let query = one_to_ten().take(2);
    assert_eq!(
        Value::Sequence(query.as_sequence().unwrap()),
        query.to_value().unwrap()
    );
    let iterated: Vec<Value> = query.iter().unwrap().map(|(_, v)| v).collect();
    assert_eq!(iterated, ints(&[1, 2]));
}

// ============================================================================
// Deferred Execution
// ============================================================================

#[test]
fn test_execution_is_deferred() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let counting = Function::unary(move |v| {
        counter.fetch_add(1, Ordering::SeqCst);
        v.clone()
    });

    let query = one_to_ten()
        .filter(counting.clone())
        .unwrap()
        .order_by_ascending(counting.clone())
        .unwrap()
        .group_join(vec![1])
        .on(counting.clone())
        .unwrap()
        .to(counting)
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    query.count().unwrap();
    assert!(calls.load(Ordering::SeqCst) > 0);
}

#[test]
fn test_source_queries_load_on_request() {
    let failing = one_to_ten()
        .select(Function::new(|_| Err(QueryError::function("boom"))))
        .unwrap();
    let union = one_to_ten().union(failing);

    assert_eq!(
        union.first().unwrap(),
        Value::from(1),
        "the second source is not read for the first element"
    );
    assert_eq!(union.count().unwrap_err(), QueryError::function("boom"));
}

#[test]
fn test_invalid_chain() {
    let err = f("fn ($xs) => $xs->where(fn ($x) => true)->thenBy(fn ($x) => $x)->count()")
        .call(&[Value::from(vec![1, 2])])
        .unwrap_err();
    assert_eq!(
        err,
        QueryError::InvalidChain {
            method: "then_by",
            required: "order_by"
        }
    );

    let err = f("fn ($xs) => $xs->orderBy(fn ($x) => $x)->andBy(fn ($x) => $x)")
        .call(&[Value::from(vec![1, 2])])
        .unwrap_err();
    assert_eq!(
        err,
        QueryError::InvalidChain {
            method: "and_by",
            required: "group_by"
        }
    );
}

#[test]
fn test_then_by_inside_closure() {
    let ordered = f("fn ($xs) => $xs->orderBy(fn ($x) => $x % 3)->thenBy(fn ($x) => $x, 'desc')->implode(',')")
        .call(&[Value::from(vec![1, 2, 3, 4, 5, 6])])
        .unwrap();
    assert_eq!(ordered, Value::from("6,3,4,1,5,2"));
}

#[test]
fn test_non_iterable_source_is_rejected() {
    let err = f("fn ($x) => $x->count()").call(&[Value::from(5)]).unwrap_err();
    assert!(matches!(err, QueryError::InvalidArgument { .. }), "{err}");
}

// ============================================================================
// Providers
// ============================================================================

#[test]
fn test_introspective_provider_requires_source() {
    let query = InMemoryProvider::new(vec![1, 2, 3])
        .with_function_converter(FunctionConverter::default())
        .into_queryable();

    let err = query.filter(Function::unary(|_| true)).unwrap_err();
    assert_eq!(
        err,
        QueryError::SourceExtraction(SourceExtractionError::NoSource)
    );

    let err = query
        .filter(Function::unary(|_| true).with_source("fn ($x) => { $x }"))
        .unwrap_err();
    assert!(matches!(err, QueryError::Parse(_)));

    let filtered = query.filter(Function::builtin("is_int").unwrap()).unwrap();
    assert_eq!(filtered.count().unwrap(), 3);
}

#[test]
fn test_as_repository_copies() {
    let query = one_to_ten().filter(f("fn ($x) => $x % 2 === 0")).unwrap();
    let repository = query.as_repository().unwrap();
    assert_eq!(repository.len(), 5);

    repository.add(12);
    assert_eq!(repository.len(), 6);
    assert_eq!(query.count().unwrap(), 5);
}

#[test]
fn test_parse_with_inlines_bindings() {
    let bindings = [("min".to_string(), Value::from(8))].into_iter().collect();
    let above = Function::parse_with("function ($x) use ($min) { return $x >= $min; }", &bindings)
        .unwrap();
    assert_eq!(one_to_ten().filter(above).unwrap().values().unwrap(), ints(&[8, 9, 10]));

    let missing = Function::parse("function ($x) use ($min) { return $x >= $min; }");
    assert!(missing.is_err());
}

#[test]
fn test_parse_with_bound_variables_are_local_copies() {
    let bindings = [("n".to_string(), Value::from(1))].into_iter().collect();
    let accumulate =
        Function::parse_with("function ($x) use ($n) { $n = $n + $x; return $n; }", &bindings).unwrap();
    assert_eq!(accumulate.call(&[Value::from(2)]).unwrap(), Value::from(3));
    assert_eq!(accumulate.call(&[Value::from(2)]).unwrap(), Value::from(3));

    let running = Function::parse_with(
        "function ($xs) use ($n) { return $xs->select(function ($x) use ($n) { $n .= $x; return $n; })->implode(','); }",
        &bindings,
    )
    .unwrap();
    assert_eq!(
        running.call(&[Value::from(vec![7, 8])]).unwrap(),
        Value::from("17,18")
    );
}
