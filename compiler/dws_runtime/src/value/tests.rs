use super::*;
use pretty_assertions::assert_eq;

use dws_ir::{CiMap, Name, TypeRef};

use crate::types::{ArrayType, EnumType, FieldInfo, RecordType, TypeId};

fn color_enum() -> Rc<EnumType> {
    Rc::new(EnumType {
        id: TypeId(7),
        name: Name::new("TColor"),
        members: vec![
            (Name::new("Red"), 0),
            (Name::new("Green"), 1),
            (Name::new("Blue"), 2),
        ],
        is_flags: false,
    })
}

fn point_type() -> Rc<RecordType> {
    let mut ty = RecordType::new(TypeId(3), Name::new("TPoint"));
    for field in ["X", "Y"] {
        ty.fields.insert(
            field,
            FieldInfo {
                name: Name::new(field),
                ty: TypeRef::named("Integer"),
                default: None,
            },
        );
    }
    Rc::new(ty)
}

fn point(x: i64, y: i64) -> RecordValue {
    let fields: CiMap<Value> = [("X", Value::Integer(x)), ("Y", Value::Integer(y))]
        .into_iter()
        .collect();
    RecordValue::new(point_type(), fields)
}

#[test]
fn test_display_scalars() {
    assert_eq!(Value::Integer(-3).to_string(), "-3");
    assert_eq!(Value::Float(2.5).to_string(), "2.5");
    assert_eq!(Value::Boolean(true).to_string(), "True");
    assert_eq!(Value::Boolean(false).to_string(), "False");
    assert_eq!(Value::Nil.to_string(), "nil");
    assert_eq!(Value::UNASSIGNED.to_string(), "Unassigned");
}

#[test]
fn test_display_composites() {
    let array = ArrayValue::dynamic(
        TypeRef::named("Integer"),
        vec![Value::Integer(1), Value::Integer(2)],
    );
    assert_eq!(Value::Array(array).to_string(), "[1, 2]");
    assert_eq!(Value::Record(point(1, 2)).to_string(), "TPoint(X: 1, Y: 2)");

    let set = SetValue::from_ordinals(SetDomain::Enum(color_enum()), [0, 2]);
    assert_eq!(Value::Set(set).to_string(), "[Red, Blue]");
}

#[test]
fn test_enum_displays_ordinal_and_names_member() {
    let green = EnumValue::new(color_enum(), 1);
    assert_eq!(green.name(), "Green");
    assert_eq!(Value::Enum(green).to_string(), "1");
}

#[test]
fn test_variant_boxing_does_not_nest() {
    let boxed = Value::variant(Value::Integer(4));
    let twice = Value::variant(boxed.clone());
    assert_eq!(boxed, twice);
    assert_eq!(twice.unboxed(), &Value::Integer(4));
    assert_eq!(twice.type_key(), "integer");
}

#[test]
fn test_nil_is_not_false_or_empty() {
    assert!(Value::Nil.is_nil());
    assert!(!Value::Boolean(false).is_nil());
    assert!(!Value::string("").is_nil());
    assert_ne!(Value::Nil, Value::Boolean(false));
}

#[test]
fn test_record_copy_is_independent() {
    let original = Value::Record(point(1, 2));
    let copy = original.copy_for_store();
    if let Value::Record(r) = &copy {
        assert!(r.set("X", Value::Integer(99)));
    }
    assert_eq!(original.to_string(), "TPoint(X: 1, Y: 2)");
    assert_eq!(copy.to_string(), "TPoint(X: 99, Y: 2)");
}

#[test]
fn test_record_rejects_unknown_field() {
    let p = point(0, 0);
    assert!(!p.set("Z", Value::Integer(1)));
    assert!(!p.has_field("Z"));
    assert!(p.has_field("x"));
}

#[test]
fn test_record_assign_from_keeps_identity() {
    let target = point(0, 0);
    let alias = target.clone();
    target.assign_from(&point(5, 6));
    assert!(alias.ptr_eq(&target));
    assert_eq!(alias.get("Y"), Some(Value::Integer(6)));
}

#[test]
fn test_static_array_copies_dynamic_array_shares() {
    let fixed = ArrayValue::new(
        Rc::new(ArrayType {
            element: TypeRef::named("Integer"),
            bounds: Some((1, 3)),
        }),
        vec![Value::Integer(0); 3],
    );
    let copy = Value::Array(fixed.clone()).copy_for_store();
    if let Value::Array(a) = &copy {
        a.set(0, Value::Integer(7));
    }
    assert_eq!(fixed.get(0), Some(Value::Integer(0)));

    let dynamic = ArrayValue::dynamic(TypeRef::named("Integer"), vec![Value::Integer(0)]);
    let shared = Value::Array(dynamic.clone()).copy_for_store();
    if let Value::Array(a) = &shared {
        a.set(0, Value::Integer(7));
    }
    assert_eq!(dynamic.get(0), Some(Value::Integer(7)));
}

#[test]
fn test_array_slot_of_respects_bounds() {
    let fixed = ArrayValue::new(
        Rc::new(ArrayType {
            element: TypeRef::named("Integer"),
            bounds: Some((5, 7)),
        }),
        vec![Value::Integer(0); 3],
    );
    assert_eq!(fixed.low(), 5);
    assert_eq!(fixed.high(), 7);
    assert_eq!(fixed.slot_of(5), Some(0));
    assert_eq!(fixed.slot_of(7), Some(2));
    assert_eq!(fixed.slot_of(4), None);
    assert_eq!(fixed.slot_of(8), None);

    let empty = ArrayValue::dynamic(TypeRef::named("Integer"), Vec::new());
    assert_eq!(empty.high(), -1);
    assert_eq!(empty.slot_of(0), None);
}

#[test]
fn test_array_remove_and_set_length_clamp() {
    let array = ArrayValue::dynamic(
        TypeRef::named("Integer"),
        (1..=4).map(Value::Integer).collect(),
    );
    array.remove(2, 10);
    assert_eq!(array.to_vec(), vec![Value::Integer(1), Value::Integer(2)]);
    array.set_length(4, || Value::Integer(0));
    assert_eq!(array.len(), 4);
    assert_eq!(array.get(3), Some(Value::Integer(0)));
}

#[test]
fn test_set_operations() {
    let domain = SetDomain::Enum(color_enum());
    let a = SetValue::from_ordinals(domain.clone(), [0, 1]);
    let b = SetValue::from_ordinals(domain, [1, 2]);
    assert_eq!(a.union(&b).ordinals(), vec![0, 1, 2]);
    assert_eq!(a.intersection(&b).ordinals(), vec![1]);
    assert_eq!(a.difference(&b).ordinals(), vec![0]);
    assert!(a.intersection(&b).is_subset(&a));
}

#[test]
fn test_sparse_set_holds_large_ordinals() {
    let mut set = SetValue::from_ordinals(SetDomain::Ordinal, [3, 200]);
    assert!(set.contains(200));
    set.remove(200);
    assert!(!set.contains(200));
    assert_eq!(set.len(), 1);
}

#[test]
fn test_object_ref_count_and_single_destroy() {
    let class = Rc::new(crate::types::ClassInfo::new(
        TypeId(9),
        Name::new("TRes"),
        None,
    ));
    let obj = ObjectRef::new(class, CiMap::new());
    assert_eq!(obj.add_ref(), 1);
    assert_eq!(obj.add_ref(), 2);
    assert_eq!(obj.release(), 1);
    assert_eq!(obj.release(), 0);
    assert_eq!(obj.release(), 0);
    assert!(obj.mark_destroyed());
    assert!(!obj.mark_destroyed());
    assert!(obj.is_destroyed());
}

#[test]
fn test_object_equality_is_identity() {
    let class = Rc::new(crate::types::ClassInfo::new(
        TypeId(9),
        Name::new("TRes"),
        None,
    ));
    let a = ObjectRef::new(Rc::clone(&class), CiMap::new());
    let b = ObjectRef::new(class, CiMap::new());
    assert_eq!(Value::Object(a.clone()), Value::Object(a.clone()));
    assert_ne!(Value::Object(a), Value::Object(b));
}

#[test]
fn test_reference_follows_chain() {
    use crate::environment::{LocalScope, Mutability, Scope};

    let scope = LocalScope::new(Scope::new());
    scope
        .borrow_mut()
        .define(Name::new("x"), Value::Integer(1), Mutability::Mutable);
    let inner = ReferenceValue::variable(scope.clone(), Name::new("x"));

    let outer_scope = LocalScope::new(Scope::new());
    outer_scope.borrow_mut().define(
        Name::new("p"),
        Value::Reference(inner),
        Mutability::Mutable,
    );
    let outer = ReferenceValue::variable(outer_scope, Name::new("p"));

    assert!(outer.set(Value::Integer(42)).is_ok());
    assert_eq!(scope.borrow().lookup(&Name::new("x")), Some(Value::Integer(42)));
    assert_eq!(outer.get(), Some(Value::Integer(42)));
}

#[test]
fn test_tag_names() {
    assert_eq!(Value::Integer(1).tag().as_str(), "INTEGER");
    assert_eq!(Value::UNASSIGNED.tag(), ValueTag::Variant);
}
