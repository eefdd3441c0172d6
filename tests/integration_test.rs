// Integration tests for parser + evaluator + environment
//
// These drive complete expressions through compile and evaluate, the same
// path the CLI uses, and check the JSON that comes out the other end.

use jex::{compile, decode, evaluate, Environment, Error, Value};
use serde_json::json;

fn val(j: serde_json::Value) -> Value {
    serde_json::from_value(j).expect("fixture should decode")
}

fn eval(expr: &str, input: serde_json::Value) -> Value {
    evaluate(expr, val(input)).expect("expression should evaluate")
}

fn eval_json(expr: &str, input: serde_json::Value) -> String {
    serde_json::to_string(&eval(expr, input)).expect("result should encode")
}

#[test]
fn test_identity_round_trips_every_document() {
    let documents = [
        json!(null),
        json!(true),
        json!(false),
        json!(0),
        json!(42),
        json!(1.5),
        json!("hello world"),
        json!([1, 2, 3]),
        json!({"hello": "world"}),
        json!({"nested": {"list": [1, {"deep": null}]}}),
    ];
    for doc in documents {
        let text = serde_json::to_string(&doc).unwrap();
        let decoded = decode("<test>", &text).unwrap();
        let result = evaluate("d", decoded).unwrap();
        assert_eq!(serde_json::to_string(&result).unwrap(), text);
    }
}

#[test]
fn test_decoding_preserves_object_order() {
    let decoded = decode("<test>", r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
    let result = evaluate("d", decoded).unwrap();
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"z":1,"a":2,"m":3}"#
    );
}

#[test]
fn test_basic_arithmetic_on_input() {
    assert_eq!(eval("d + 1", json!(3)), Value::Int(4));
    assert_eq!(eval_json("d + \"bar\"", json!("foo")), r#""foobar""#);
    assert_eq!(eval("1", json!("hello")), Value::Int(1));
}

#[test]
fn test_map_covers_every_element() {
    let input = json!([3, 1, 4, 1, 5, 9, 2, 6]);
    let mapped = eval("d.map(_ * 2)", input.clone());
    let arr = mapped.as_array().unwrap();
    let original = val(input);
    let original = original.as_array().unwrap();

    assert_eq!(arr.len(), original.len());
    for (i, v) in arr.iter().enumerate() {
        let doubled = match &original[i] {
            Value::Int(n) => Value::Int(n * 2),
            other => panic!("unexpected element {:?}", other),
        };
        assert_eq!(*v, doubled);
    }
}

#[test]
fn test_filter_preserves_relative_order() {
    assert_eq!(
        eval_json("d.filter(_ % 2 == 1)", json!([9, 2, 7, 4, 5, 1])),
        "[9,7,5,1]"
    );
    assert_eq!(eval_json("d.filter(_ > 100)", json!([1, 2])), "[]");
}

#[test]
fn test_map_filter_operator_forms() {
    // the original's `|` and `&` forms
    assert_eq!(eval_json("d | _ + 1", json!([0, 1, 2])), "[1,2,3]");
    assert_eq!(eval_json("[0, 1, 2] | _ + 1", json!(null)), "[1,2,3]");
    assert_eq!(eval_json("list(range(0, 3)) | _ + 1", json!(null)), "[1,2,3]");
    assert_eq!(
        eval_json("[i for i in range(0, 3)] | _ + 1", json!(null)),
        "[1,2,3]"
    );

    assert_eq!(eval_json("d | _ + 1", json!({"foo": 1})), r#"{"foo":2}"#);
    assert_eq!(eval_json("{\"foo\": 1} | _ + 1", json!(null)), r#"{"foo":2}"#);
    assert_eq!(
        eval_json("dict({\"foo\": 1}) | _ + 1", json!(null)),
        r#"{"foo":2}"#
    );
    assert_eq!(
        eval_json("{k: v for k, v in [(\"foo\", 1)]} | _ + 1", json!(null)),
        r#"{"foo":2}"#
    );

    assert_eq!(eval_json("d & (_ % 2 == 1)", json!([1, 2, 3])), "[1,3]");
    assert_eq!(
        eval_json("d & (_ < 50)", json!({"hello": 41, "world": 53})),
        r#"{"hello":41}"#
    );
}

#[test]
fn test_out_of_range_yields_null_not_failure() {
    assert_eq!(eval_json("d[3]", json!([1, 2, 3])), "null");
    assert_eq!(eval_json("d[\"bar\"]", json!({"foo": "bar"})), "null");
    assert_eq!(eval_json("d[\"foo\"]", json!({"foo": "bar"})), r#""bar""#);
    assert_eq!(eval_json("d.missing", json!({"foo": 1})), "null");
}

#[test]
fn test_mapping_filter_keys_are_ordered_subset() {
    let input = json!({"a": 5, "b": 50, "c": 7, "d": 70, "e": 9});
    let filtered = eval("d.filter(_ < 10)", input);
    let keys: Vec<&String> = filtered.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["a", "c", "e"]);
}

#[test]
fn test_placeholder_composition_equivalence() {
    // ((_+1)*2)(x) == (_*2)(x+1) wherever both sides are defined
    for x in [-3_i64, 0, 1, 7, 100] {
        let lhs = evaluate("((_ + 1) * 2)(d)", Value::Int(x)).unwrap();
        let rhs = evaluate("(_ * 2)(d + 1)", Value::Int(x)).unwrap();
        assert_eq!(lhs, rhs);
    }
}

#[test]
fn test_placeholder_algebra_from_expressions() {
    assert_eq!(eval("(_ + 1)(2)", json!(null)), Value::Int(3));
    assert_eq!(eval("(1 + _)(2)", json!(null)), Value::Int(3));
    assert_eq!(eval("(2 * (_ + 1))(2)", json!(null)), Value::Int(6));
    assert_eq!(eval("(_ + _)(1)", json!(null)), Value::Int(2));
    assert_eq!(
        eval("abs((((_ + 1) - 2) * 3) / 4)(5)", json!(null)),
        Value::Float(3.0)
    );
    assert_eq!(eval("(_ + [2])([1])", json!(null)), val(json!([1, 2])));
    assert_eq!(eval("(_[0])([1])", json!(null)), Value::Int(1));
}

#[test]
fn test_comparison_placeholder_is_deferred() {
    // `_ == 1` is a placeholder, not a boolean; calling it decides
    assert_eq!(eval("(_ == 1)(1)", json!(null)), Value::Bool(true));
    assert_eq!(eval("(_ == 1)(2)", json!(null)), Value::Bool(false));
}

#[test]
fn test_nested_literals_are_extended_at_every_depth() {
    // depth-2 rewrite: a Sequence whose element is a Mapping
    let v = eval("[{}]", json!(null));
    let arr = v.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert!(arr[0].is_object());

    // the nested mapping still has non-raising access and map/filter
    assert_eq!(eval_json("[{}][0].map(_)", json!(null)), "{}");
    assert_eq!(eval_json("[[]][0]", json!(null)), "[]");
    assert_eq!(eval_json("{0: {}}[0]", json!(null)), "{}");
}

#[test]
fn test_constructor_names_resolve_to_extended_constructors() {
    let a = eval("list(range(0, 3))", json!(null));
    let b = eval("[i for i in range(0, 3)]", json!(null));
    let c = eval("[0, 1, 2]", json!(null));
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(a.as_array().unwrap().len(), 3);

    // `list` applied to an extended value is an idempotent copy
    assert_eq!(eval_json("list(list([1]))", json!(null)), "[1]");
    assert_eq!(eval_json("dict(dict({}))", json!(null)), "{}");
}

#[test]
fn test_multiple_inputs() {
    let expr = compile("inputs[0] + inputs[1]").unwrap();
    let mut env = Environment::with_inputs(vec![
        decode("a.json", "1").unwrap(),
        decode("b.json", "2").unwrap(),
    ]);
    assert_eq!(expr.evaluate(&mut env).unwrap(), Value::Int(3));
}

#[test]
fn test_primary_input_is_first() {
    let expr = compile("d").unwrap();
    let mut env = Environment::with_inputs(vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(expr.evaluate(&mut env).unwrap(), Value::Int(1));

    // no inputs at all: d is None
    let expr = compile("d").unwrap();
    let mut env = Environment::with_inputs(vec![]);
    assert_eq!(expr.evaluate(&mut env).unwrap(), Value::Null);
}

#[test]
fn test_environment_overrides() {
    let expr = compile("foo").unwrap();
    let mut env = Environment::with_inputs(vec![]);
    env.bind("foo", Value::from("bar"));
    assert_eq!(expr.evaluate(&mut env).unwrap(), Value::from("bar"));
}

#[test]
fn test_comprehensions_end_to_end() {
    assert_eq!(
        eval_json("[x * x for x in d if x % 2 == 0]", json!([1, 2, 3, 4])),
        "[4,16]"
    );
    assert_eq!(
        eval_json("{k: d[k] + 1 for k in d}", json!({"a": 1, "b": 2})),
        r#"{"a":2,"b":3}"#
    );
    assert_eq!(
        eval_json(
            "{k: v * 10 for k, v in d.items() if v > 1}",
            json!({"a": 1, "b": 2, "c": 3})
        ),
        r#"{"b":20,"c":30}"#
    );
}

#[test]
fn test_conditional_and_membership() {
    assert_eq!(
        eval("\"big\" if d > 10 else \"small\"", json!(42)),
        Value::from("big")
    );
    assert_eq!(eval("\"a\" in d", json!({"a": 1})), Value::Bool(true));
    assert_eq!(eval("5 not in d", json!([1, 2, 3])), Value::Bool(true));
}

#[test]
fn test_partial_application() {
    assert_eq!(eval("partial(len, _)(\"hello\")", json!(null)), Value::Int(5));
    assert_eq!(eval_json("d | partial(max, 2, _)", json!([1, 3])), "[2,3]");
}

#[test]
fn test_placeholder_serializes_as_readable_string() {
    // a raw placeholder has no JSON form; the fallback encoder keeps output valid
    assert_eq!(eval_json("_", json!(null)), r#""<placeholder>""#);
}

#[test]
fn test_failure_kinds() {
    assert!(matches!(compile("d +"), Err(Error::Syntax(_))));
    assert!(matches!(
        decode("broken.json", "{oops"),
        Err(Error::Data { .. })
    ));
    assert!(matches!(
        evaluate("d / 0", Value::Int(1)),
        Err(Error::Evaluation(_))
    ));
    assert!(matches!(
        evaluate("missing_name", Value::Null),
        Err(Error::Evaluation(_))
    ));

    // absent-marker reads are not failures
    assert!(evaluate("d[99]", val(json!([1]))).is_ok());
}

#[test]
fn test_each_run_gets_a_fresh_environment() {
    let expr = compile("[x for x in d]").unwrap();

    let mut env1 = Environment::with_inputs(vec![val(json!([1, 2]))]);
    let mut env2 = Environment::with_inputs(vec![val(json!([3]))]);
    assert_eq!(serde_json::to_string(&expr.evaluate(&mut env1).unwrap()).unwrap(), "[1,2]");
    assert_eq!(serde_json::to_string(&expr.evaluate(&mut env2).unwrap()).unwrap(), "[3]");

    // the loop variable never leaks between runs
    assert!(env1.lookup("x").is_none());
    assert!(env2.lookup("x").is_none());
}
