//! Type registry and runtime type descriptors.
//!
//! Descriptors are written once while declarations are processed and read
//! during execution. Objects and records hold an `Rc` to their descriptor;
//! many instances share one.
//!
//! Every registered type receives a monotonically increasing [`TypeId`]
//! used for RTTI checks (`is`, `as`, interface compatibility).

mod class;
mod composite;
mod interface;
mod registry;

use std::fmt;
use std::rc::Rc;

use dws_ir::{fold_case, BinaryOp, Name, OperatorKind, Param, TypeRef};

pub use class::{ClassInfo, MethodRef};
pub use composite::{ArrayType, EnumType, HelperInfo, RecordType};
pub use interface::InterfaceInfo;
pub use registry::{TypeEntry, TypeRegistry};

use crate::value::Value;

/// Numeric type identity, assigned in registration order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    /// Shared by anonymous record types (JSON objects, untyped literals).
    pub const ANONYMOUS: TypeId = TypeId(0);
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A declared field with its initial value.
#[derive(Clone, Debug)]
pub struct FieldInfo {
    pub name: Name,
    pub ty: TypeRef,
    /// Value of the field initializer, evaluated at registration. `None`
    /// means the type's default value.
    pub default: Option<Value>,
}

/// How a property is read or written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyAccess {
    None,
    Field(Name),
    Method(Name),
}

#[derive(Clone, Debug)]
pub struct PropertyInfo {
    pub name: Name,
    pub ty: TypeRef,
    pub index_params: Vec<Param>,
    pub read: PropertyAccess,
    pub write: PropertyAccess,
    pub is_default: bool,
    pub is_class: bool,
}

/// A registered operator overload or implicit conversion.
#[derive(Clone, Debug)]
pub struct OperatorEntry {
    pub kind: OperatorKind,
    /// Folded type keys of the operands.
    pub operands: Vec<String>,
    pub result: TypeRef,
    /// Implementing function or method.
    pub uses: Name,
}

impl OperatorEntry {
    pub fn is_binary(&self, op: BinaryOp) -> bool {
        self.kind == OperatorKind::Binary(op)
    }

    /// Whether the operand values fit this overload: exact type key, or a
    /// class operand descending from the declared class.
    pub fn accepts(&self, operands: &[&Value]) -> bool {
        self.operands.len() == operands.len()
            && self
                .operands
                .iter()
                .zip(operands)
                .all(|(key, value)| value_matches_key(value, key))
    }

    /// Folded key of the result type.
    pub fn result_key(&self) -> String {
        type_ref_key(&self.result)
    }
}

fn value_matches_key(value: &Value, key: &str) -> bool {
    let value = value.unboxed();
    if value.type_key() == key {
        return true;
    }
    match value {
        Value::Object(obj) => obj.class().is_descendant_of_name(key),
        _ => false,
    }
}

/// Folded key for a type reference, matching `Value::type_key` for values
/// of that type. Built-in aliases collapse to their canonical name.
pub fn type_ref_key(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Named(name) => match builtin_meta(name.as_str()) {
            Some(meta) => meta.type_key(),
            None => name.key().to_string(),
        },
        TypeRef::Array { element, .. } => format!("array of {}", type_ref_key(element)),
        TypeRef::Set(element) => format!("set of {}", type_ref_key(element)),
        TypeRef::Function { .. } => "function".to_string(),
    }
}

/// Resolved runtime type, used for defaults, `High`/`Low`, `is`/`as` and as
/// the payload of type-meta values.
#[derive(Clone, Debug)]
pub enum TypeMeta {
    Integer,
    Float,
    String,
    Boolean,
    Variant,
    Class(Rc<ClassInfo>),
    Record(Rc<RecordType>),
    Interface(Rc<InterfaceInfo>),
    Enum(Rc<EnumType>),
    Array(Rc<ArrayType>),
    Set(Box<TypeMeta>),
    Function,
}

impl TypeMeta {
    pub fn name(&self) -> String {
        match self {
            TypeMeta::Integer => "Integer".to_string(),
            TypeMeta::Float => "Float".to_string(),
            TypeMeta::String => "String".to_string(),
            TypeMeta::Boolean => "Boolean".to_string(),
            TypeMeta::Variant => "Variant".to_string(),
            TypeMeta::Class(c) => c.name.to_string(),
            TypeMeta::Record(r) => r.name.to_string(),
            TypeMeta::Interface(i) => i.name.to_string(),
            TypeMeta::Enum(e) => e.name.to_string(),
            TypeMeta::Array(a) => format!("array of {}", a.element),
            TypeMeta::Set(e) => format!("set of {}", e.name()),
            TypeMeta::Function => "function".to_string(),
        }
    }

    pub fn type_key(&self) -> String {
        match self {
            TypeMeta::Array(a) => format!("array of {}", type_ref_key(&a.element)),
            TypeMeta::Set(e) => format!("set of {}", e.type_key()),
            other => fold_case(&other.name()).into_owned(),
        }
    }

    pub fn same_type(&self, other: &TypeMeta) -> bool {
        match (self, other) {
            (TypeMeta::Class(a), TypeMeta::Class(b)) => a.id == b.id,
            (TypeMeta::Record(a), TypeMeta::Record(b)) => a.id == b.id,
            (TypeMeta::Interface(a), TypeMeta::Interface(b)) => a.id == b.id,
            (TypeMeta::Enum(a), TypeMeta::Enum(b)) => a.id == b.id,
            (TypeMeta::Array(a), TypeMeta::Array(b)) => a == b,
            (TypeMeta::Set(a), TypeMeta::Set(b)) => a.same_type(b),
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

/// Built-in scalar types by (case-insensitive) name.
pub fn builtin_meta(name: &str) -> Option<TypeMeta> {
    let meta = match &*fold_case(name) {
        "integer" | "int64" | "longint" | "cardinal" | "smallint" | "shortint" | "byte"
        | "word" | "nativeint" => TypeMeta::Integer,
        "float" | "double" | "real" | "extended" | "single" | "currency" | "tdatetime" => {
            TypeMeta::Float
        }
        "string" | "unicodestring" | "ansistring" | "widestring" | "char" | "widechar" => {
            TypeMeta::String
        }
        "boolean" => TypeMeta::Boolean,
        "variant" | "olevariant" | "jsonvariant" => TypeMeta::Variant,
        _ => return None,
    };
    Some(meta)
}
