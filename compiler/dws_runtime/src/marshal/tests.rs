use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_scalars_from_value() {
    assert_eq!(i64::from_value(&Value::Integer(5)), Ok(5));
    assert_eq!(f64::from_value(&Value::Integer(5)), Ok(5.0));
    assert_eq!(bool::from_value(&Value::Boolean(true)), Ok(true));
    assert_eq!(
        String::from_value(&Value::variant(Value::string("hi"))),
        Ok("hi".to_string())
    );
}

#[test]
fn test_mismatch_names_types() {
    let err = i64::from_value(&Value::string("5")).err();
    assert_eq!(
        err.map(|e| e.at_argument(2).to_string()),
        Some("argument 2: expected Integer, got String".to_string())
    );
}

#[test]
fn test_vec_marshals_elementwise() {
    let array = Value::Array(ArrayValue::dynamic(
        TypeRef::named("Integer"),
        vec![Value::Integer(1), Value::Integer(2)],
    ));
    assert_eq!(Vec::<i64>::from_value(&array), Ok(vec![1, 2]));

    let back = vec![3_i64, 4].into_value();
    match back {
        Value::Array(a) => {
            assert_eq!(a.element_type(), &TypeRef::named("Integer"));
            assert_eq!(a.to_vec(), vec![Value::Integer(3), Value::Integer(4)]);
        }
        other => panic!("expected array, got {other:?}"),
    }
}

#[test]
fn test_record_round_trips_through_map() {
    let host = HostValue::Map(vec![
        ("Name".to_string(), HostValue::Str("x".to_string())),
        ("Tags".to_string(), HostValue::List(vec![HostValue::Int(1)])),
    ]);
    let value = host.clone().into_value();
    assert!(matches!(value, Value::Record(_)));
    assert_eq!(HostValue::from_value(&value), host);
}

#[test]
fn test_mixed_list_becomes_variant_array() {
    let value = HostValue::List(vec![HostValue::Int(1), HostValue::Str("a".into())]).into_value();
    match value {
        Value::Array(a) => assert_eq!(a.element_type(), &TypeRef::named("Variant")),
        other => panic!("expected array, got {other:?}"),
    }
}

#[test]
fn test_function_pointer_passes_through() {
    let pointer = FunctionPointer::builtin(dws_ir::Name::new("Inc"));
    let host = HostValue::from_value(&Value::Function(pointer.clone()));
    assert_eq!(host, HostValue::Function(pointer.clone()));
    assert_eq!(FunctionPointer::from_value(&host.into_value()), Ok(pointer));
}

#[test]
fn test_option_none_is_nil() {
    assert_eq!(None::<i64>.into_value(), Value::Nil);
    assert_eq!(Some(3_i64).into_value(), Value::Integer(3));
}
