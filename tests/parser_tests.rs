// tests/parser_tests.rs

use fluent_query::ast::{
    AssignOp, BinOp, CastType, ClosureExpr, Expr, Parameter, UnaryOp,
};
use fluent_query::error::ParseError;
use fluent_query::lexer::Lexer;
use fluent_query::parser::{Parser, parse_closure};
use fluent_query::value::Value;

fn parse(source: &str) -> Result<ClosureExpr, ParseError> {
    parse_closure(Lexer::new(source).tokenize().unwrap())
}

fn expr(source: &str) -> Expr {
    let tokens = Lexer::new(source).tokenize().unwrap();
    Parser::new(tokens).parse_standalone_expression().unwrap()
}

fn unsupported(source: &str) -> String {
    match parse(source) {
        Err(ParseError::UnsupportedConstruct(name)) => name,
        other => panic!("expected an unsupported construct, got {:?}", other),
    }
}

fn int(n: i64) -> Expr {
    Expr::Value(Value::Integer(n))
}

// ============================================================================
// Closure Shape
// ============================================================================

#[test]
fn test_arrow_function() {
    let closure = parse("fn ($x) => $x * 2").unwrap();

    assert_eq!(closure.parameters, vec![Parameter::named("x")]);
    assert!(closure.bound_variables.is_empty());
    assert_eq!(
        closure.body,
        vec![Expr::returning(Expr::binary(
            BinOp::Multiply,
            Expr::variable("x"),
            int(2)
        ))]
    );
}

#[test]
fn test_arrow_function_captures_free_variables() {
    let closure = parse("fn ($x) => $x > $min + $offset").unwrap();
    assert_eq!(closure.bound_variables, vec!["min", "offset"]);
}

#[test]
fn test_nested_arrow_captures_through_outer() {
    let closure = parse("fn ($x) => fn ($y) => $x + $y + $z").unwrap();
    assert_eq!(closure.bound_variables, vec!["z"]);

    match &closure.body[0] {
        Expr::Return(Some(inner)) => match inner.as_ref() {
            Expr::Closure(inner) => assert_eq!(inner.bound_variables, vec!["x", "z"]),
            other => panic!("expected a closure, got {:?}", other),
        },
        other => panic!("expected a return, got {:?}", other),
    }
}

#[test]
fn test_closure_with_use_and_statements() {
    let closure = parse(
        "function ($outer, $inner) use ($min, $max) {
            $total = $outer + $inner;
            return $total >= $min && $total <= $max;
        }",
    )
    .unwrap();

    let names: Vec<_> = closure.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["outer", "inner"]);
    assert_eq!(closure.bound_variables, vec!["min", "max"]);
    assert_eq!(closure.body.len(), 2);
    assert!(matches!(
        &closure.body[0],
        Expr::Assignment {
            op: AssignOp::Assign,
            ..
        }
    ));
    assert!(matches!(&closure.body[1], Expr::Return(Some(_))));
}

#[test]
fn test_type_hints_and_defaults() {
    let closure =
        parse("function (int $x, ?\\App\\Order $order = null, $y = 3): bool { return true; }")
            .unwrap();

    assert_eq!(closure.parameters[0].type_hint.as_deref(), Some("int"));
    assert_eq!(
        closure.parameters[1].type_hint.as_deref(),
        Some("?\\App\\Order")
    );
    assert_eq!(closure.parameters[1].default, Some(Expr::Value(Value::Null)));
    assert_eq!(closure.parameters[2].type_hint, None);
    assert_eq!(closure.parameters[2].default, Some(int(3)));
}

#[test]
fn test_static_closure_and_trailing_semicolon() {
    let closure = parse("static fn ($v) => $v;").unwrap();
    assert_eq!(closure.parameters, vec![Parameter::named("v")]);
}

#[test]
fn test_empty_statements_are_dropped() {
    let closure = parse("function () { ;; return; }").unwrap();
    assert_eq!(closure.body, vec![Expr::Return(None)]);
}

#[test]
fn test_not_a_function() {
    assert!(matches!(
        parse("$x + 1"),
        Err(ParseError::UnexpectedToken { .. })
    ));
    assert!(matches!(
        parse("fn ($x) =>"),
        Err(ParseError::UnexpectedEof(_))
    ));
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn test_multiplication_binds_tighter() {
    assert_eq!(
        expr("1 + 2 * 3"),
        Expr::binary(
            BinOp::Add,
            int(1),
            Expr::binary(BinOp::Multiply, int(2), int(3))
        )
    );
}

#[test]
fn test_parentheses() {
    assert_eq!(
        expr("(1 + 2) * 3"),
        Expr::binary(
            BinOp::Multiply,
            Expr::binary(BinOp::Add, int(1), int(2)),
            int(3)
        )
    );
}

#[test]
fn test_and_binds_tighter_than_or() {
    assert_eq!(
        expr("$a || $b && $c"),
        Expr::binary(
            BinOp::Or,
            Expr::variable("a"),
            Expr::binary(BinOp::And, Expr::variable("b"), Expr::variable("c"))
        )
    );
}

#[test]
fn test_word_operators_bind_looser_than_assignment() {
    match expr("$a = $b and $c") {
        Expr::BinaryOp {
            op: BinOp::And,
            left,
            ..
        } => assert!(matches!(*left, Expr::Assignment { .. })),
        other => panic!("expected `and` at the root, got {:?}", other),
    }
}

#[test]
fn test_coalesce_is_right_associative() {
    assert_eq!(
        expr("$a ?? $b ?? 0"),
        Expr::binary(
            BinOp::NullCoalesce,
            Expr::variable("a"),
            Expr::binary(BinOp::NullCoalesce, Expr::variable("b"), int(0))
        )
    );
}

#[test]
fn test_concat_is_additive() {
    assert_eq!(
        expr("$a . '-' . $b"),
        Expr::binary(
            BinOp::Concat,
            Expr::binary(
                BinOp::Concat,
                Expr::variable("a"),
                Expr::Value(Value::from("-"))
            ),
            Expr::variable("b")
        )
    );
}

#[test]
fn test_unary_operators() {
    assert_eq!(
        expr("!-$x"),
        Expr::UnaryOp {
            op: UnaryOp::Not,
            operand: Box::new(Expr::UnaryOp {
                op: UnaryOp::Negate,
                operand: Box::new(Expr::variable("x")),
            }),
        }
    );
}

#[test]
fn test_ternary_and_short_ternary() {
    match expr("$x ? 1 : 2") {
        Expr::Ternary { if_true, .. } => assert_eq!(if_true, Some(Box::new(int(1)))),
        other => panic!("expected a ternary, got {:?}", other),
    }
    match expr("$x ?: 2") {
        Expr::Ternary { if_true, .. } => assert_eq!(if_true, None),
        other => panic!("expected a ternary, got {:?}", other),
    }
}

// ============================================================================
// Access, Calls and Literals
// ============================================================================

#[test]
fn test_method_chain() {
    match expr("$orders->where($f)->count()") {
        Expr::MethodCall {
            receiver,
            name,
            args,
        } => {
            assert_eq!(name, "count");
            assert!(args.is_empty());
            assert!(matches!(*receiver, Expr::MethodCall { ref name, .. } if name == "where"));
        }
        other => panic!("expected a method call, got {:?}", other),
    }
}

#[test]
fn test_field_and_index_access() {
    assert_eq!(
        expr("$order->lines[0]"),
        Expr::Index {
            subject: Box::new(Expr::Field {
                object: Box::new(Expr::variable("order")),
                name: "lines".to_string(),
            }),
            index: Some(Box::new(int(0))),
        }
    );
}

#[test]
fn test_named_function_call() {
    assert_eq!(
        expr("strlen($name)"),
        Expr::FunctionCall {
            callee: Box::new(Expr::Value(Value::from("strlen"))),
            args: vec![Expr::variable("name")],
        }
    );
}

#[test]
fn test_array_literals() {
    let short = expr("['a' => 1, 2]");
    let long = expr("array('a' => 1, 2)");
    assert_eq!(short, long);

    match short {
        Expr::Array(items) => {
            assert_eq!(items.len(), 2);
            assert_eq!(items[0].key, Some(Expr::Value(Value::from("a"))));
            assert_eq!(items[1].key, None);
        }
        other => panic!("expected an array, got {:?}", other),
    }
}

#[test]
fn test_variable_variable() {
    assert_eq!(
        expr("$$name"),
        Expr::Variable {
            name: Box::new(Expr::variable("name")),
        }
    );
}

#[test]
fn test_empty_and_new() {
    assert_eq!(expr("empty($x)"), Expr::Empty(Box::new(Expr::variable("x"))));
    assert!(matches!(expr("new \\DateTime('now')"), Expr::New { args, .. } if args.len() == 1));
}

#[test]
fn test_static_method_call() {
    assert_eq!(
        expr("Str::upper($x)"),
        Expr::StaticMethodCall {
            class: "Str".to_string(),
            name: "upper".to_string(),
            args: vec![Expr::variable("x")],
        }
    );
}

// ============================================================================
// Casts and Assignment
// ============================================================================

#[test]
fn test_casts() {
    assert_eq!(
        expr("(int) $x"),
        Expr::Cast {
            target: CastType::Int,
            operand: Box::new(Expr::variable("x")),
        }
    );
    assert!(matches!(expr("(boolean) $x"), Expr::Cast { target: CastType::Bool, .. }));
}

#[test]
fn test_unknown_cast_type() {
    let tokens = Lexer::new("(object) $x").tokenize().unwrap();
    assert_eq!(
        Parser::new(tokens).parse_standalone_expression(),
        Err(ParseError::InvalidCastType("object".to_string()))
    );
}

#[test]
fn test_compound_assignment() {
    let closure = parse("function ($x) { $x .= 'a'; $y ??= 1; $z[] = $x; return $x; }").unwrap();
    let ops: Vec<_> = closure
        .body
        .iter()
        .filter_map(|statement| match statement {
            Expr::Assignment { op, .. } => Some(*op),
            _ => None,
        })
        .collect();
    assert_eq!(
        ops,
        vec![AssignOp::Concat, AssignOp::NullCoalesce, AssignOp::Assign]
    );
}

#[test]
fn test_invalid_assignment_target() {
    assert!(matches!(
        parse("fn () => 1 = 2"),
        Err(ParseError::InvalidAssignmentTarget(_))
    ));
}

// ============================================================================
// Unsupported Constructs
// ============================================================================

#[test]
fn test_control_flow_is_unsupported() {
    assert_eq!(unsupported("function ($x) { if ($x) { return 1; } }"), "if");
    assert_eq!(unsupported("function ($x) { FOREACH ($x as $y) {} }"), "foreach");
    assert_eq!(unsupported("function ($x) { while (true) {} }"), "while");
    assert_eq!(unsupported("function () { throw new \\Exception(); }"), "throw");
}

#[test]
fn test_references_are_unsupported() {
    assert_eq!(unsupported("function (&$x) { return $x; }"), "by-reference parameter");
    assert_eq!(
        unsupported("function () use (&$total) { return $total; }"),
        "by-reference bound variable"
    );
    assert_eq!(unsupported("function &() { return 1; }"), "by-reference return");
    assert_eq!(
        unsupported("function ($x) { $y = &$x; return $y; }"),
        "assignment by reference"
    );
}

#[test]
fn test_other_unsupported_constructs() {
    assert_eq!(unsupported("function (...$xs) { return $xs; }"), "variadic parameter");
    assert_eq!(unsupported("fn ($x) => $x++"), "increment/decrement");
    assert_eq!(unsupported("fn ($x) => $x->$name"), "dynamic member access");
    assert_eq!(unsupported("fn () => PHP_EOL"), "constant PHP_EOL");
    assert_eq!(unsupported("fn () => Order::STATUS"), "static property or class constant");
    assert_eq!(unsupported("fn ($x) => $x instanceof Order"), "instanceof");
    assert_eq!(unsupported("fn ($xs) => f(...$xs)"), "argument unpacking");
}

// ============================================================================
// Nesting Limits
// ============================================================================

#[test]
fn test_deep_nesting_is_an_error() {
    let nested = |open: &str, close: &str, depth: usize| {
        format!("fn ($x) => {}$x{}", open.repeat(depth), close.repeat(depth))
    };

    assert_eq!(unsupported(&nested("!", "", 200_000)), "nesting too deep");
    assert_eq!(unsupported(&nested("(", ")", 100_000)), "nesting too deep");
    assert_eq!(unsupported(&nested("[", "]", 100_000)), "nesting too deep");
    assert_eq!(unsupported(&nested("$", "", 100_000)), "nesting too deep");
    assert_eq!(
        unsupported(&format!("fn ($x) => $x{}", " + 1".repeat(100_000))),
        "nesting too deep"
    );
    assert_eq!(
        unsupported(&format!("fn ($x) => $x{}", "[0]".repeat(100_000))),
        "nesting too deep"
    );
    assert_eq!(
        unsupported(&format!("fn () => {}1", "fn () => ".repeat(100_000))),
        "nesting too deep"
    );
}

#[test]
fn test_moderate_nesting_parses() {
    let source = format!("fn ($x) => {}$x{}", "(".repeat(40), ")".repeat(40));
    assert_eq!(parse(&source).unwrap().body, vec![Expr::returning(Expr::variable("x"))]);

    let chain = format!("fn ($x) => $x{}", " + 1".repeat(60));
    assert!(parse(&chain).is_ok());
    assert!(parse(&format!("fn ($x) => {}$x", "-".repeat(60))).is_ok());
}
