//! Equality, ordering, ordinals and built-in implicit conversions.
//!
//! Conversions fail closed: when the language defines no implicit
//! conversion the result is `None`, never a truncated or coerced value.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::types::{ArrayType, TypeMeta};
use crate::value::{ArrayValue, EnumValue, InterfaceValue, SetDomain, SetValue, Value};

/// Script-level `=`.
///
/// Nil and an unassigned variant are equal to each other and to nothing
/// else. Integers and floats compare numerically.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    let (l, r) = (left.unboxed(), right.unboxed());
    match (l, r) {
        (Value::Variant(None) | Value::Nil, Value::Variant(None) | Value::Nil) => true,
        (Value::Variant(None), _) | (_, Value::Variant(None)) => false,
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            l.as_float() == r.as_float()
        }
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Enum(a), Value::Enum(b)) => a.ty.id == b.ty.id && a.ordinal == b.ordinal,
        (Value::Enum(e), Value::Integer(n)) | (Value::Integer(n), Value::Enum(e)) => {
            e.ordinal == *n
        }
        (Value::Record(a), Value::Record(b)) => {
            if a.ptr_eq(b) {
                return true;
            }
            let (fa, fb) = (a.fields(), b.fields());
            fa.len() == fb.len()
                && fa
                    .iter()
                    .all(|(k, v)| fb.get(k.key()).is_some_and(|w| values_equal(v, w)))
        }
        (Value::Set(a), Value::Set(b)) => a.same_members(b),
        (Value::Array(a), Value::Array(b)) if a.is_static() && b.is_static() => {
            let (ia, ib) = (a.items(), b.items());
            ia.len() == ib.len() && ia.iter().zip(ib.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
        (Value::Function(a), Value::Function(b)) => a.same_target(b),
        (Value::ClassRef(a), Value::ClassRef(b)) => a.id == b.id,
        (Value::Type(a), Value::Type(b)) => a.same_type(b),
        (Value::Exception(a), Value::Exception(b)) => a.object.ptr_eq(&b.object),
        _ => match (object_identity(l), object_identity(r)) {
            (Some(a), Some(b)) => match (a, b) {
                (Some(a), Some(b)) => a.ptr_eq(&b),
                (None, None) => true,
                _ => false,
            },
            _ => false,
        },
    }
}

/// Identity of reference-typed values: `Some(None)` for nil-like values,
/// `Some(Some(obj))` for objects, `None` for everything else.
fn object_identity(value: &Value) -> Option<Option<crate::value::ObjectRef>> {
    match value {
        Value::Nil => Some(None),
        Value::Object(o) => Some(Some(o.clone())),
        Value::Interface(i) => Some(i.object.clone()),
        Value::Exception(e) => Some(Some(e.object.clone())),
        _ => None,
    }
}

/// Ordering for `<`, `<=`, `>`, `>=`. `None` when the values do not order.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    let (l, r) = (left.unboxed(), right.unboxed());
    match (l, r) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            l.as_float()?.partial_cmp(&r.as_float()?)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::Enum(a), Value::Enum(b)) if a.ty.id == b.ty.id => Some(a.ordinal.cmp(&b.ordinal)),
        _ => None,
    }
}

/// Ordinal of an ordinal-typed value: integers, enums, booleans and
/// one-character strings (by code point).
pub fn ordinal_value(value: &Value) -> Option<i64> {
    match value.unboxed() {
        Value::Integer(n) => Some(*n),
        Value::Enum(e) => Some(e.ordinal),
        Value::Boolean(b) => Some(i64::from(*b)),
        Value::String(s) => {
            let mut chars = s.chars();
            let c = chars.next()?;
            chars.next().is_none().then(|| i64::from(u32::from(c)))
        }
        _ => None,
    }
}

/// The type a slot holding `existing` accepts. `None` means the slot is
/// untyped (nil object and function slots) and takes any value as is.
pub fn slot_meta(existing: &Value) -> Option<TypeMeta> {
    Some(match existing {
        Value::Integer(_) => TypeMeta::Integer,
        Value::Float(_) => TypeMeta::Float,
        Value::String(_) => TypeMeta::String,
        Value::Boolean(_) => TypeMeta::Boolean,
        Value::Variant(_) => TypeMeta::Variant,
        Value::Enum(e) => TypeMeta::Enum(Rc::clone(&e.ty)),
        Value::Record(r) => TypeMeta::Record(Rc::clone(r.ty())),
        Value::Interface(i) => TypeMeta::Interface(Rc::clone(&i.info)),
        Value::Array(a) => TypeMeta::Array(Rc::clone(a.ty())),
        Value::Set(s) => TypeMeta::Set(Box::new(match s.domain() {
            SetDomain::Enum(e) => TypeMeta::Enum(Rc::clone(e)),
            SetDomain::Ordinal => TypeMeta::Integer,
        })),
        _ => return None,
    })
}

/// Built-in implicit conversion of `value` to `target`.
///
/// Integer widens to Float, anything boxes into Variant, variants unbox
/// into matching scalars, objects wrap into interfaces they satisfy, and
/// array/set literals retype to the declared element type.
pub fn convert_builtin(value: &Value, target: &TypeMeta) -> Option<Value> {
    match target {
        TypeMeta::Variant => Some(match value {
            Value::Variant(_) => value.copy_for_store(),
            other => Value::variant(other.copy_for_store()),
        }),
        TypeMeta::Integer => match value.unboxed() {
            v @ Value::Integer(_) => Some(v.clone()),
            _ => None,
        },
        TypeMeta::Float => value.unboxed().as_float().map(Value::Float),
        TypeMeta::String => match value.unboxed() {
            v @ Value::String(_) => Some(v.clone()),
            _ => None,
        },
        TypeMeta::Boolean => match value.unboxed() {
            v @ Value::Boolean(_) => Some(v.clone()),
            _ => None,
        },
        TypeMeta::Enum(ty) => match value.unboxed() {
            Value::Enum(e) if e.ty.id == ty.id => Some(Value::Enum(e.clone())),
            _ => None,
        },
        TypeMeta::Record(ty) => match value.unboxed() {
            Value::Record(r) if r.ty().id == ty.id => Some(Value::Record(r.deep_copy())),
            _ => None,
        },
        TypeMeta::Class(class) => match value.unboxed() {
            Value::Nil => Some(Value::Nil),
            Value::Object(o) if o.class().is_descendant_of(class) => Some(value.unboxed().clone()),
            Value::Interface(InterfaceValue { object: None, .. }) => Some(Value::Nil),
            _ => None,
        },
        TypeMeta::Interface(info) => match value.unboxed() {
            Value::Nil => Some(Value::Interface(InterfaceValue::nil(Rc::clone(info)))),
            Value::Object(o) if o.class().satisfies(info) => Some(Value::Interface(
                InterfaceValue::new(Rc::clone(info), Some(o.clone())),
            )),
            Value::Interface(i) if i.info.is_compatible_with(info) => Some(Value::Interface(
                InterfaceValue::new(Rc::clone(info), i.object.clone()),
            )),
            Value::Interface(InterfaceValue { object: Some(o), .. })
                if o.class().satisfies(info) =>
            {
                Some(Value::Interface(InterfaceValue::new(
                    Rc::clone(info),
                    Some(o.clone()),
                )))
            }
            _ => None,
        },
        TypeMeta::Array(ty) => match value.unboxed() {
            Value::Array(a) => retype_array(a, ty),
            _ => None,
        },
        TypeMeta::Set(element) => match value.unboxed() {
            Value::Set(s) => retype_set(s, element),
            _ => None,
        },
        TypeMeta::Function => match value.unboxed() {
            v @ (Value::Function(_) | Value::Nil) => Some(v.clone()),
            _ => None,
        },
    }
}

fn retype_array(array: &ArrayValue, target: &Rc<ArrayType>) -> Option<Value> {
    if **array.ty() == **target {
        return Some(Value::Array(array.clone()).copy_for_store());
    }
    if let Some(len) = target.static_len() {
        if len != array.len() {
            return None;
        }
    }
    let element = element_meta(&target.element);
    let items = array
        .items()
        .iter()
        .map(|item| match &element {
            Some(meta) => convert_builtin(item, meta),
            None => Some(item.copy_for_store()),
        })
        .collect::<Option<Vec<_>>>()?;
    Some(Value::Array(ArrayValue::new(Rc::clone(target), items)))
}

/// Element type of built-in scalar element types; user element types are
/// copied as is.
fn element_meta(element: &dws_ir::TypeRef) -> Option<TypeMeta> {
    crate::types::builtin_meta(element.as_named()?.as_str())
}

fn retype_set(set: &SetValue, element: &TypeMeta) -> Option<Value> {
    match (set.domain(), element) {
        (SetDomain::Enum(a), TypeMeta::Enum(b)) if a.id == b.id => Some(Value::Set(set.clone())),
        (SetDomain::Ordinal, TypeMeta::Enum(ty)) => {
            let ordinals = set.ordinals();
            ordinals
                .iter()
                .all(|o| ty.name_of(*o).is_some())
                .then(|| Value::Set(SetValue::from_ordinals(SetDomain::Enum(Rc::clone(ty)), ordinals)))
        }
        (_, TypeMeta::Integer | TypeMeta::String) => Some(Value::Set(set.clone())),
        _ => None,
    }
}

/// Enum value for `ordinal` of `ty`, used by `Succ`/`Pred` and casts.
pub fn enum_from_ordinal(ty: &Rc<crate::types::EnumType>, ordinal: i64) -> Value {
    Value::Enum(EnumValue::new(Rc::clone(ty), ordinal))
}
