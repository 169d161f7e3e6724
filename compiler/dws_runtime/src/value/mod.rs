//! Runtime values.
//!
//! `Value` is a closed tagged union. Scalars are stored inline; composite
//! values share their storage through `Rc`, and the copy discipline for
//! value-semantics types (records, static arrays) is explicit in
//! [`Value::copy_for_store`].

mod array;
mod function;
mod object;
mod record;
mod reference;
mod set;

use std::fmt;
use std::rc::Rc;

use dws_ir::fold_case;

pub use array::ArrayValue;
pub use function::{CallTarget, FunctionPointer, Thunk};
pub use object::{InterfaceValue, ObjectInstance, ObjectRef};
pub use record::RecordValue;
pub use reference::ReferenceValue;
pub use set::{EnumValue, SetDomain, SetValue};

use crate::exception::ExceptionValue;
use crate::types::{type_ref_key, ClassInfo, TypeMeta};

/// Stable type tag of a value, used for dispatch and `is`/`as` checks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueTag {
    Integer,
    Float,
    String,
    Boolean,
    Nil,
    Array,
    Record,
    Object,
    Interface,
    Set,
    Enum,
    Variant,
    Function,
    Reference,
    Lazy,
    Exception,
    ClassRef,
    Type,
}

impl ValueTag {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::String => "STRING",
            Self::Boolean => "BOOLEAN",
            Self::Nil => "NIL",
            Self::Array => "ARRAY",
            Self::Record => "RECORD",
            Self::Object => "OBJECT",
            Self::Interface => "INTERFACE",
            Self::Set => "SET",
            Self::Enum => "ENUM",
            Self::Variant => "VARIANT",
            Self::Function => "FUNCTION_POINTER",
            Self::Reference => "REFERENCE",
            Self::Lazy => "LAZY",
            Self::Exception => "EXCEPTION",
            Self::ClassRef => "CLASS",
            Self::Type => "TYPE",
        }
    }
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A runtime value.
#[derive(Clone, Debug)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    /// Nil object or class reference. Distinct from `false` and from empty
    /// collections.
    Nil,
    Array(ArrayValue),
    Record(RecordValue),
    Object(ObjectRef),
    Interface(InterfaceValue),
    Set(SetValue),
    Enum(EnumValue),
    /// Dynamically typed box; `None` is Unassigned.
    Variant(Option<Box<Value>>),
    Function(FunctionPointer),
    Reference(ReferenceValue),
    /// Pending lazy parameter.
    Lazy(Thunk),
    Exception(Rc<ExceptionValue>),
    /// A class used as a value (`TFoo`, `obj.ClassType`).
    ClassRef(Rc<ClassInfo>),
    /// A non-class type used as a value (`High(Integer)`).
    Type(TypeMeta),
}

impl Value {
    #[inline]
    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    /// Box `value` into a variant, unwrapping one that already is.
    pub fn variant(value: Value) -> Value {
        match value {
            Value::Variant(_) => value,
            other => Value::Variant(Some(Box::new(other))),
        }
    }

    pub const UNASSIGNED: Value = Value::Variant(None);

    pub fn tag(&self) -> ValueTag {
        match self {
            Value::Integer(_) => ValueTag::Integer,
            Value::Float(_) => ValueTag::Float,
            Value::String(_) => ValueTag::String,
            Value::Boolean(_) => ValueTag::Boolean,
            Value::Nil => ValueTag::Nil,
            Value::Array(_) => ValueTag::Array,
            Value::Record(_) => ValueTag::Record,
            Value::Object(_) => ValueTag::Object,
            Value::Interface(_) => ValueTag::Interface,
            Value::Set(_) => ValueTag::Set,
            Value::Enum(_) => ValueTag::Enum,
            Value::Variant(_) => ValueTag::Variant,
            Value::Function(_) => ValueTag::Function,
            Value::Reference(_) => ValueTag::Reference,
            Value::Lazy(_) => ValueTag::Lazy,
            Value::Exception(_) => ValueTag::Exception,
            Value::ClassRef(_) => ValueTag::ClassRef,
            Value::Type(_) => ValueTag::Type,
        }
    }

    /// Script-level type name for messages and `ClassName`-style output.
    pub fn type_name(&self) -> String {
        match self {
            Value::Integer(_) => "Integer".to_string(),
            Value::Float(_) => "Float".to_string(),
            Value::String(_) => "String".to_string(),
            Value::Boolean(_) => "Boolean".to_string(),
            Value::Nil => "nil".to_string(),
            Value::Array(a) => format!("array of {}", a.element_type()),
            Value::Record(r) if r.ty().anonymous => "record".to_string(),
            Value::Record(r) => r.type_name().to_string(),
            Value::Object(o) => o.class_name().to_string(),
            Value::Interface(i) => i.info.name.to_string(),
            Value::Set(s) => match s.enum_type() {
                Some(ty) => format!("set of {}", ty.name),
                None => "set".to_string(),
            },
            Value::Enum(e) => e.ty.name.to_string(),
            Value::Variant(_) => "Variant".to_string(),
            Value::Function(_) => "function pointer".to_string(),
            Value::Reference(r) => r
                .get()
                .map_or_else(|| "reference".to_string(), |v| v.type_name()),
            Value::Lazy(_) => "lazy".to_string(),
            Value::Exception(e) => e.class.name.to_string(),
            Value::ClassRef(c) => format!("class of {}", c.name),
            Value::Type(t) => t.name(),
        }
    }

    /// Folded key used to look up operator overloads, helpers and implicit
    /// conversions. Matches [`type_ref_key`] for declared types.
    pub fn type_key(&self) -> String {
        match self {
            Value::Integer(_) => "integer".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::String(_) => "string".to_string(),
            Value::Boolean(_) => "boolean".to_string(),
            Value::Variant(None) => "variant".to_string(),
            Value::Variant(Some(inner)) => inner.type_key(),
            Value::Array(a) => format!("array of {}", type_ref_key(a.element_type())),
            Value::Set(s) => match s.enum_type() {
                Some(ty) => format!("set of {}", ty.name.key()),
                None => "set".to_string(),
            },
            Value::Function(_) => "function".to_string(),
            other => fold_case(&other.type_name()).into_owned(),
        }
    }

    /// Strip variant boxes.
    pub fn unboxed(&self) -> &Value {
        match self {
            Value::Variant(Some(inner)) => inner.unboxed(),
            other => other,
        }
    }

    /// Strip variant boxes, by value.
    pub fn into_unboxed(self) -> Value {
        match self {
            Value::Variant(Some(inner)) => inner.into_unboxed(),
            other => other,
        }
    }

    pub fn is_nil(&self) -> bool {
        match self {
            Value::Nil => true,
            Value::Interface(i) => i.is_nil(),
            Value::Variant(Some(inner)) => inner.is_nil(),
            _ => false,
        }
    }

    pub fn is_unassigned(&self) -> bool {
        matches!(self, Value::Variant(None))
    }

    /// Copy applied whenever a value is stored into a slot: records and
    /// static arrays are duplicated, everything else is shared.
    #[must_use]
    pub fn copy_for_store(&self) -> Value {
        match self {
            Value::Record(r) => Value::Record(r.deep_copy()),
            Value::Array(a) if a.is_static() => Value::Array(a.deep_copy()),
            Value::Variant(Some(inner)) => Value::Variant(Some(Box::new(inner.copy_for_store()))),
            other => other.clone(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.unboxed() {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view: integers widen to float.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self.unboxed() {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.unboxed() {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.unboxed() {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self.unboxed() {
            Value::Object(o) => Some(o),
            Value::Interface(InterfaceValue {
                object: Some(o), ..
            }) => Some(o),
            Value::Exception(e) => Some(&e.object),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::Boolean(true) => f.write_str("True"),
            Value::Boolean(false) => f.write_str("False"),
            Value::Nil => f.write_str("nil"),
            Value::Array(a) => {
                f.write_str("[")?;
                for (i, item) in a.items().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Record(r) => {
                if r.ty().anonymous {
                    f.write_str("record(")?;
                } else {
                    write!(f, "{}(", r.type_name())?;
                }
                for (i, (name, value)) in r.fields().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str(")")
            }
            Value::Object(o) => write!(f, "{} instance", o.class_name()),
            Value::Interface(i) => match &i.object {
                Some(o) => write!(f, "{} instance", o.class_name()),
                None => f.write_str("nil"),
            },
            Value::Set(s) => write!(f, "[{}]", s.member_names().join(", ")),
            Value::Enum(e) => write!(f, "{}", e.ordinal),
            Value::Variant(None) => f.write_str("Unassigned"),
            Value::Variant(Some(inner)) => write!(f, "{inner}"),
            Value::Function(p) => match p.target {
                CallTarget::Lambda(_) => f.write_str("<lambda>"),
                _ => write!(f, "@{}", p.name()),
            },
            Value::Reference(r) => match r.get() {
                Some(v) => write!(f, "{v}"),
                None => write!(f, "&{}", r.describe()),
            },
            Value::Lazy(t) => match t.cached() {
                Some(v) => write!(f, "{v}"),
                None => f.write_str("<lazy>"),
            },
            Value::Exception(e) => write!(f, "{}: {}", e.class.name, e.message()),
            Value::ClassRef(c) => write!(f, "class {}", c.name),
            Value::Type(t) => f.write_str(&t.name()),
        }
    }
}

/// Structural equality for tests and host code. Script-level `=` uses
/// [`crate::convert::values_equal`], which also promotes numerics.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b) || *a.items() == *b.items(),
            (Value::Record(a), Value::Record(b)) => {
                a.ptr_eq(b) || (a.ty().id == b.ty().id && *a.fields() == *b.fields())
            }
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Interface(a), Value::Interface(b)) => a.object == b.object,
            (Value::Set(a), Value::Set(b)) => a.same_members(b),
            (Value::Enum(a), Value::Enum(b)) => a.ty.id == b.ty.id && a.ordinal == b.ordinal,
            (Value::Variant(a), Value::Variant(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.same_target(b),
            (Value::Reference(a), Value::Reference(b)) => a.get() == b.get(),
            (Value::Lazy(a), Value::Lazy(b)) => a.ptr_eq(b),
            (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
            (Value::ClassRef(a), Value::ClassRef(b)) => a.id == b.id,
            (Value::Type(a), Value::Type(b)) => a.same_type(b),
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

#[cfg(test)]
mod tests;
