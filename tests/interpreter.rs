use oleander::{
    value::{Value, ValueKind},
    OleanderError, Session,
};

fn session() -> Session {
    Session::bootstrap(Value::unit(), None, None)
}

fn eval(source: &str) -> Value {
    session()
        .run_batch(source)
        .expect("evaluation should succeed")
}

fn eval_error(source: &str) -> OleanderError {
    match session().run_batch(source) {
        Ok(value) => panic!("expected error, received value {value}"),
        Err(err) => err,
    }
}

fn expect_int(value: &Value) -> i64 {
    value
        .as_int()
        .unwrap_or_else(|| panic!("expected Int, found {}", value.type_name()))
}

fn expect_float(value: &Value) -> f64 {
    value
        .as_float()
        .unwrap_or_else(|| panic!("expected Float, found {}", value.type_name()))
}

fn expect_bool(value: &Value) -> bool {
    value
        .as_bool()
        .unwrap_or_else(|| panic!("expected Bool, found {}", value.type_name()))
}

fn expect_str(value: &Value) -> String {
    value
        .as_str()
        .unwrap_or_else(|| panic!("expected Str, found {}", value.type_name()))
        .to_string()
}

#[test]
fn evaluates_basic_arithmetic() {
    assert_eq!(expect_int(&eval("2 + 3 * 4")), 14);
    assert_eq!(expect_int(&eval("(2 + 3) * 4")), 20);
    assert_eq!(expect_int(&eval("10 % 3")), 1);
}

#[test]
fn division_always_produces_float() {
    assert_eq!(expect_float(&eval("7 / 2")), 3.5);
    assert_eq!(expect_float(&eval("6 / 3")), 2.0);
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    assert!(eval_error("1 / 0").is_runtime());
}

#[test]
fn string_concatenation_and_comparison() {
    assert_eq!(expect_str(&eval(r#""foo" + "bar""#)), "foobar");
    assert!(expect_bool(&eval(r#""abc" < "abd""#)));
}

#[test]
fn last_expression_is_the_program_value() {
    let value = eval(
        r#"
        x = 40
        x + 2
        "#,
    );
    assert_eq!(expect_int(&value), 42);
}

#[test]
fn assignment_produces_no_value() {
    assert!(eval("x = 5").is_unit());
}

#[test]
fn top_level_return_finishes_the_program() {
    assert_eq!(expect_int(&eval("return 7; 100")), 7);
}

#[test]
fn undefined_name_is_a_runtime_error() {
    let err = eval_error("missing + 1");
    assert!(err.is_runtime());
    assert!(err.to_string().contains("missing"));
}

#[test]
fn if_else_chain_selects_branch() {
    let value = eval(
        r#"
        grade = ""
        score = 85
        if score >= 90 {
            grade = "a"
        } else if score >= 80 {
            grade = "b"
        } else {
            grade = "c"
        }
        grade
        "#,
    );
    assert_eq!(expect_str(&value), "b");
}

#[test]
fn while_loop_with_break_and_continue() {
    let value = eval(
        r#"
        total = 0
        n = 0
        while true {
            n = n + 1
            if n > 10 { break }
            if n % 2 == 0 { continue }
            total = total + n
        }
        total
        "#,
    );
    assert_eq!(expect_int(&value), 25);
}

#[test]
fn for_loop_over_range_accumulates() {
    let value = eval(
        r#"
        total = 0
        for n in range(1, 5) {
            total = total + n
        }
        total
        "#,
    );
    assert_eq!(expect_int(&value), 10);
}

#[test]
fn for_loop_iterates_array_and_string() {
    let value = eval(
        r#"
        parts = ""
        for piece in ["a", "b", "c"] {
            parts = parts + piece
        }
        for ch in "de" {
            parts = parts + ch
        }
        parts
        "#,
    );
    assert_eq!(expect_str(&value), "abcde");
}

#[test]
fn loop_control_outside_loop_is_an_error() {
    assert!(eval_error("break").is_runtime());
    assert!(eval_error("continue").is_runtime());
}

#[test]
fn function_declaration_and_call() {
    let value = eval(
        r#"
        fn add(a, b) {
            a + b
        }
        add(19, 23)
        "#,
    );
    assert_eq!(expect_int(&value), 42);
}

#[test]
fn explicit_return_short_circuits_body() {
    let value = eval(
        r#"
        fn clamp(n) {
            if n > 100 { return 100 }
            n
        }
        clamp(250) + clamp(10)
        "#,
    );
    assert_eq!(expect_int(&value), 110);
}

#[test]
fn recursion_works() {
    let value = eval(
        r#"
        fn fib(n) {
            if n < 2 { return n }
            fib(n - 1) + fib(n - 2)
        }
        fib(10)
        "#,
    );
    assert_eq!(expect_int(&value), 55);
}

#[test]
fn functions_update_enclosing_bindings() {
    let value = eval(
        r#"
        counter = 0
        fn bump() {
            counter = counter + 1
        }
        bump()
        bump()
        counter
        "#,
    );
    assert_eq!(expect_int(&value), 2);
}

#[test]
fn parameters_shadow_outer_names() {
    let value = eval(
        r#"
        x = 1
        fn shadow(x) {
            x = x + 10
            x
        }
        shadow(5) + x
        "#,
    );
    assert_eq!(expect_int(&value), 16);
}

#[test]
fn anonymous_functions_are_values() {
    let value = eval(
        r#"
        twice = fn(f, x) { f(f(x)) }
        twice(fn(n) { n * 3 }, 2)
        "#,
    );
    assert_eq!(expect_int(&value), 18);
}

#[test]
fn wrong_argument_count_is_a_runtime_error() {
    let err = eval_error("fn pair(a, b) { a } pair(1)");
    assert!(err.is_runtime());
    assert!(err.to_string().contains("expected 2"));
}

#[test]
fn arrays_index_and_assign() {
    let value = eval(
        r#"
        items = [10, 20, 30]
        items[1] = 21
        items[0] + items[1] + items[-1]
        "#,
    );
    assert_eq!(expect_int(&value), 61);
}

#[test]
fn index_out_of_bounds_is_a_runtime_error() {
    assert!(eval_error("[1, 2][5]").is_runtime());
}

#[test]
fn arrays_alias_rather_than_copy() {
    let value = eval(
        r#"
        a = [1]
        b = a
        push(a, 2)
        len(b)
        "#,
    );
    assert_eq!(expect_int(&value), 2);
}

#[test]
fn maps_support_field_and_index_access() {
    let value = eval(
        r#"
        inventory = { apples: 3, "ripe bananas": 7 }
        inventory.apples = inventory.apples + 1
        inventory["ripe bananas"] + inventory.apples
        "#,
    );
    assert_eq!(expect_int(&value), 11);
}

#[test]
fn missing_map_key_is_a_runtime_error() {
    assert!(eval_error("{ a: 1 }.b").is_runtime());
}

#[test]
fn map_iteration_yields_key_value_pairs() {
    let value = eval(
        r#"
        keys = ""
        total = 0
        for entry in { a: 1, b: 2 } {
            keys = keys + entry[0]
            total = total + entry[1]
        }
        keys + str(total)
        "#,
    );
    assert_eq!(expect_str(&value), "ab3");
}

#[test]
fn logical_operators_return_the_deciding_operand() {
    assert_eq!(expect_int(&eval("0 || 5")), 5);
    assert_eq!(expect_int(&eval("3 && 7")), 7);
    assert_eq!(expect_int(&eval("0 && 7")), 0);
    assert!(expect_bool(&eval("!0")));
}

#[test]
fn equality_is_structural() {
    assert!(expect_bool(&eval("[1, [2]] == [1, [2]]")));
    assert!(expect_bool(&eval("{ a: 1 } == { a: 1 }")));
    assert!(expect_bool(&eval("1 == 1.0")));
    assert!(expect_bool(&eval("1 != \"1\"")));
}

#[test]
fn prelude_helpers_are_available() {
    assert_eq!(expect_int(&eval(r#"len("héllo")"#)), 5);
    assert_eq!(expect_str(&eval("str(42)")), "42");
    assert_eq!(expect_str(&eval("type_of([])")), "Array");
    assert_eq!(expect_int(&eval("std.math.abs(-3)")), 3);
    assert_eq!(expect_int(&eval("std.math.floor(3.9)")), 3);
    assert!(expect_bool(&eval(
        r#"std.strings.contains(std.strings.to_upper("abc"), "BC")"#
    )));
}

#[test]
fn split_produces_an_array() {
    let value = eval(r#"len(std.strings.split("a,b,c", ","))"#);
    assert_eq!(expect_int(&value), 3);
}

#[test]
fn raise_surfaces_as_a_runtime_error() {
    let err = eval_error(r#"raise("kaboom")"#);
    assert!(err.is_runtime());
    assert!(err.to_string().contains("kaboom"));
}

#[test]
fn module_exports_are_read_only() {
    assert!(eval_error("std.math = 1").is_runtime());
}

#[test]
fn comments_are_ignored() {
    let value = eval(
        r#"
        // line comment
        x = 1 /* inline
           block */ + 2
        x
        "#,
    );
    assert_eq!(expect_int(&value), 3);
}

#[test]
fn values_display_like_source() {
    let value = eval(r#"[1, "two", { n: 3 }]"#);
    assert_eq!(value.to_string(), "[1, two, {n: 3}]");
    assert!(matches!(value.kind(), ValueKind::Array(_)));
}
