use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::convert::values_equal;

#[test]
fn test_scalars_to_json() {
    assert_eq!(to_json(&Value::Integer(42)).ok().as_deref(), Some("42"));
    assert_eq!(to_json(&Value::Float(1.5)).ok().as_deref(), Some("1.5"));
    assert_eq!(to_json(&Value::Boolean(true)).ok().as_deref(), Some("true"));
    assert_eq!(to_json(&Value::Nil).ok().as_deref(), Some("null"));
    assert_eq!(to_json(&Value::UNASSIGNED).ok().as_deref(), Some("null"));
}

#[test]
fn test_string_escaping() {
    let text = Value::string("a\"b\n\tc\\");
    assert_eq!(
        to_json(&text).ok().as_deref(),
        Some(r#""a\"b\n\tc\\""#)
    );
}

#[test]
fn test_non_finite_float_is_null() {
    assert_eq!(to_json(&Value::Float(f64::NAN)).ok().as_deref(), Some("null"));
}

#[test]
fn test_object_keys_keep_document_order() {
    let value = parse_json(r#"{"b": 1, "a": [true, null], "c": {"x": 2.5}}"#);
    let Ok(Value::Record(record)) = &value else {
        panic!("expected record, got {value:?}");
    };
    let names: Vec<String> = record.field_names().iter().map(ToString::to_string).collect();
    assert_eq!(names, vec!["b", "a", "c"]);
    assert_eq!(
        to_json(&Value::Record(record.clone())).ok().as_deref(),
        Some(r#"{"b":1,"a":[true,null],"c":{"x":2.5}}"#)
    );
}

#[test]
fn test_integer_and_float_literals_keep_kind() {
    assert_eq!(parse_json("7").ok(), Some(Value::Integer(7)));
    assert_eq!(parse_json("7.0").ok(), Some(Value::Float(7.0)));
    assert_eq!(parse_json("-1e3").ok(), Some(Value::Float(-1000.0)));
}

#[test]
fn test_object_fields_are_variant_boxed() {
    let Ok(Value::Record(record)) = parse_json(r#"{"n": 1, "x": 0.5, "s": "t"}"#) else {
        panic!("expected record");
    };
    let n = record.get("n");
    assert!(matches!(n, Some(Value::Variant(Some(_)))), "{n:?}");
    assert_eq!(n.as_ref().map(Value::unboxed), Some(&Value::Integer(1)));
    assert_eq!(record.get("x").as_ref().map(Value::unboxed), Some(&Value::Float(0.5)));
    assert_eq!(record.get("s").as_ref().map(Value::unboxed), Some(&Value::string("t")));
}

#[test]
fn test_floats_parse_back_exactly() {
    for x in [403_550_151.834_780_04, 496_672.906_872_466_03, 0.1, -2.5e-300] {
        let text = to_json(&Value::Float(x)).unwrap_or_default();
        assert_eq!(parse_json(&text).ok(), Some(Value::Float(x)), "{text}");
    }
}

#[test]
fn test_parse_error_reports_position() {
    let err = parse_json("{\n  \"a\": }").err();
    match err.map(|e| e.kind) {
        Some(crate::errors::EvalErrorKind::JsonParse { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_function_pointer_is_rejected() {
    let pointer = Value::Function(crate::value::FunctionPointer::builtin(dws_ir::Name::new(
        "PrintLn",
    )));
    assert!(to_json(&pointer).is_err());
}

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(Value::Integer),
        (-1.0e9..1.0e9f64).prop_map(Value::Float),
        any::<bool>().prop_map(Value::Boolean),
        "[a-zA-Z0-9 \\n\\t\"\\\\]{0,12}".prop_map(Value::String),
        Just(Value::Nil),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(|items| {
                Value::Array(ArrayValue::dynamic(
                    TypeRef::named("Variant"),
                    items.into_iter().map(Value::variant).collect(),
                ))
            }),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4).prop_map(|fields| {
                let ty = Rc::new(RecordType::anonymous(fields.keys().map(String::as_str)));
                let mut map = CiMap::new();
                for (k, v) in fields {
                    map.insert(k.as_str(), Value::variant(v));
                }
                Value::Record(RecordValue::new(ty, map))
            }),
        ]
    })
}

proptest! {
    #[test]
    fn prop_round_trip_preserves_value(value in json_value()) {
        let text = to_json(&value);
        prop_assert!(text.is_ok());
        let text = text.unwrap_or_default();
        let parsed = parse_json(&text);
        prop_assert!(parsed.is_ok());
        let parsed = parsed.unwrap_or(Value::Nil);
        prop_assert!(values_equal(&value, &parsed) || structurally_equal(&value, &parsed));
    }
}

/// Dynamic arrays compare by identity under `values_equal`; the round trip
/// yields a fresh array, so compare element-wise here.
fn structurally_equal(a: &Value, b: &Value) -> bool {
    match (a.unboxed(), b.unboxed()) {
        (Value::Array(x), Value::Array(y)) => {
            let (xs, ys) = (x.items(), y.items());
            xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(p, q)| structurally_equal(p, q))
        }
        (Value::Record(x), Value::Record(y)) => {
            let (fx, fy) = (x.fields(), y.fields());
            fx.len() == fy.len()
                && fx
                    .iter()
                    .all(|(k, v)| fy.get(k.key()).is_some_and(|w| structurally_equal(v, w)))
        }
        (l, r) => values_equal(l, r),
    }
}
