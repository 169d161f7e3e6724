//! Value marshaling at the host function boundary.
//!
//! [`HostValue`] is the host-side view of a script value: primitives,
//! sequences, string-keyed maps and script callables. [`FromValue`] and
//! [`IntoValue`] convert single arguments and results for typed host
//! functions.

use std::rc::Rc;

use dws_ir::{CiMap, TypeRef};
use thiserror::Error;

use crate::types::RecordType;
use crate::value::{ArrayValue, FunctionPointer, RecordValue, Value};

/// Failure reported by a host function. Surfaces in scripts as `EHost`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("argument {index}: expected {expected}, got {got}")]
    ArgumentType {
        index: usize,
        expected: &'static str,
        got: String,
    },
    #[error("expected {expected}, got {got}")]
    TypeMismatch { expected: &'static str, got: String },
    #[error("expected {expected} arguments, got {got}")]
    ArgumentCount { expected: usize, got: usize },
    #[error("{0}")]
    Failed(String),
}

impl HostError {
    pub fn failed(message: impl Into<String>) -> Self {
        HostError::Failed(message.into())
    }

    /// Attach the position of the offending argument.
    #[must_use]
    pub fn at_argument(self, index: usize) -> Self {
        match self {
            HostError::TypeMismatch { expected, got } => HostError::ArgumentType {
                index,
                expected,
                got,
            },
            other => other,
        }
    }
}

/// Host-side representation of a script value.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Nil,
    List(Vec<HostValue>),
    /// Ordered string-keyed map; records marshal to and from this.
    Map(Vec<(String, HostValue)>),
    /// A script callable, invoked through the interpreter's callback
    /// context.
    Function(FunctionPointer),
    /// Values with no host shape (objects, sets, enums) pass through
    /// untouched so a host function can hand them back.
    Opaque(Value),
}

impl HostValue {
    pub fn from_value(value: &Value) -> HostValue {
        match value.unboxed() {
            Value::Integer(n) => HostValue::Int(*n),
            Value::Float(x) => HostValue::Float(*x),
            Value::String(s) => HostValue::Str(s.clone()),
            Value::Boolean(b) => HostValue::Bool(*b),
            Value::Nil | Value::Variant(None) => HostValue::Nil,
            Value::Array(a) => HostValue::List(a.items().iter().map(HostValue::from_value).collect()),
            Value::Record(r) => HostValue::Map(
                r.fields()
                    .iter()
                    .map(|(k, v)| (k.as_str().to_string(), HostValue::from_value(v)))
                    .collect(),
            ),
            Value::Function(p) => HostValue::Function(p.clone()),
            Value::Reference(r) => r
                .get()
                .map_or(HostValue::Nil, |v| HostValue::from_value(&v)),
            other => HostValue::Opaque(other.clone()),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            HostValue::Int(n) => Value::Integer(n),
            HostValue::Float(x) => Value::Float(x),
            HostValue::Str(s) => Value::String(s),
            HostValue::Bool(b) => Value::Boolean(b),
            HostValue::Nil => Value::Nil,
            HostValue::List(items) => Value::Array(ArrayValue::dynamic(
                list_element_type(&items),
                items.into_iter().map(HostValue::into_value).collect(),
            )),
            HostValue::Map(entries) => {
                let ty = Rc::new(RecordType::anonymous(entries.iter().map(|(k, _)| k.as_str())));
                let mut fields = CiMap::new();
                for (key, item) in entries {
                    fields.insert(key.as_str(), Value::variant(item.into_value()));
                }
                Value::Record(RecordValue::new(ty, fields))
            }
            HostValue::Function(p) => Value::Function(p),
            HostValue::Opaque(v) => v,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HostValue::Int(_) => "Integer",
            HostValue::Float(_) => "Float",
            HostValue::Str(_) => "String",
            HostValue::Bool(_) => "Boolean",
            HostValue::Nil => "nil",
            HostValue::List(_) => "array",
            HostValue::Map(_) => "record",
            HostValue::Function(_) => "function pointer",
            HostValue::Opaque(_) => "opaque",
        }
    }
}

/// Element type of a list built on the host side: the common scalar type
/// when every item shares one, `Variant` otherwise.
fn list_element_type(items: &[HostValue]) -> TypeRef {
    let mut kinds = items.iter().map(HostValue::kind);
    let name = match kinds.next() {
        Some(first @ ("Integer" | "Float" | "String" | "Boolean")) if kinds.all(|k| k == first) => {
            first
        }
        _ => "Variant",
    };
    TypeRef::named(name)
}

/// Conversion from a script value to a host argument type.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, HostError>;
}

/// Conversion from a host result to a script value.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

fn mismatch(expected: &'static str, value: &Value) -> HostError {
    HostError::TypeMismatch {
        expected,
        got: value.type_name(),
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, HostError> {
        value.as_int().ok_or_else(|| mismatch("Integer", value))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, HostError> {
        value.as_float().ok_or_else(|| mismatch("Float", value))
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, HostError> {
        value.as_bool().ok_or_else(|| mismatch("Boolean", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, HostError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("String", value))
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, HostError> {
        match value.unboxed() {
            Value::Array(a) => a.items().iter().map(T::from_value).collect(),
            other => Err(mismatch("array", other)),
        }
    }
}

impl FromValue for FunctionPointer {
    fn from_value(value: &Value) -> Result<Self, HostError> {
        match value.unboxed() {
            Value::Function(p) => Ok(p.clone()),
            other => Err(mismatch("function pointer", other)),
        }
    }
}

impl FromValue for HostValue {
    fn from_value(value: &Value) -> Result<Self, HostError> {
        Ok(HostValue::from_value(value))
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, HostError> {
        Ok(value.clone())
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Integer(self)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Boolean(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_string())
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Nil
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        let items: Vec<Value> = self.into_iter().map(IntoValue::into_value).collect();
        let element = match items.first() {
            Some(first) if !matches!(first, Value::Variant(_)) => {
                TypeRef::named(&first.type_name())
            }
            _ => TypeRef::named("Variant"),
        };
        Value::Array(ArrayValue::dynamic(element, items))
    }
}

impl IntoValue for HostValue {
    fn into_value(self) -> Value {
        HostValue::into_value(self)
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Nil, IntoValue::into_value)
    }
}

#[cfg(test)]
mod tests;
