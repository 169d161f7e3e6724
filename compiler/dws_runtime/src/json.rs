//! Conversion between runtime values and JSON text.
//!
//! Numbers follow the host JSON conventions of `serde_json`: integers print
//! without a fraction, floats print the shortest text that round-trips.
//! Parsing maps integer literals to `Integer` and every other number to
//! `Float`, objects to anonymous records whose fields are all `Variant`, and
//! arrays to dynamic arrays of `Variant`. Nested values are boxed, so a
//! parsed field holds `Variant(Integer)` rather than a bare `Integer`.
//! Object keys keep their document order, and floats parse back to the
//! exact value they were printed from.

use std::rc::Rc;

use dws_ir::{CiMap, TypeRef};
use serde_json::{Map, Number};

use crate::errors::{json_parse_error, json_unsupported, EvalError};
use crate::types::RecordType;
use crate::value::{ArrayValue, RecordValue, Value};

/// Serialize `value` as compact JSON.
pub fn to_json(value: &Value) -> Result<String, EvalError> {
    let tree = to_tree(value)?;
    serde_json::to_string(&tree).map_err(|e| json_unsupported(&e.to_string()))
}

/// Serialize `value` as indented JSON.
pub fn to_json_pretty(value: &Value) -> Result<String, EvalError> {
    let tree = to_tree(value)?;
    serde_json::to_string_pretty(&tree).map_err(|e| json_unsupported(&e.to_string()))
}

/// Parse JSON text into a runtime value.
pub fn parse_json(text: &str) -> Result<Value, EvalError> {
    let tree: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| json_parse_error(&parse_message(&e), e.line(), e.column()))?;
    Ok(from_tree(tree))
}

/// `serde_json` appends " at line L column C"; the error kind carries the
/// position separately.
fn parse_message(err: &serde_json::Error) -> String {
    let text = err.to_string();
    match text.rfind(" at line ") {
        Some(cut) => text[..cut].to_string(),
        None => text,
    }
}

fn to_tree(value: &Value) -> Result<serde_json::Value, EvalError> {
    Ok(match value {
        Value::Nil | Value::Variant(None) => serde_json::Value::Null,
        Value::Variant(Some(inner)) => to_tree(inner)?,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Integer(n) => serde_json::Value::Number(Number::from(*n)),
        // NaN and infinities have no JSON spelling.
        Value::Float(x) => Number::from_f64(*x).map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Enum(e) => serde_json::Value::Number(Number::from(e.ordinal)),
        Value::Set(s) => serde_json::Value::Array(
            s.member_names()
                .into_iter()
                .map(serde_json::Value::String)
                .collect(),
        ),
        Value::Array(a) => serde_json::Value::Array(
            a.items().iter().map(to_tree).collect::<Result<_, _>>()?,
        ),
        Value::Record(r) => {
            let mut map = Map::new();
            for (name, field) in r.fields().iter() {
                map.insert(name.as_str().to_string(), to_tree(field)?);
            }
            serde_json::Value::Object(map)
        }
        Value::Object(_) | Value::Interface(_) | Value::Exception(_) => match value.as_object() {
            Some(obj) => {
                let mut map = Map::new();
                for (name, field) in obj.field_values() {
                    map.insert(name.as_str().to_string(), to_tree(&field)?);
                }
                serde_json::Value::Object(map)
            }
            None => serde_json::Value::Null,
        },
        Value::Reference(r) => match r.get() {
            Some(v) => to_tree(&v)?,
            None => serde_json::Value::Null,
        },
        Value::Lazy(t) => match t.cached() {
            Some(v) => to_tree(&v)?,
            None => return Err(json_unsupported("lazy")),
        },
        Value::Function(_) | Value::ClassRef(_) | Value::Type(_) => {
            return Err(json_unsupported(&value.type_name()))
        }
    })
}

fn from_tree(tree: serde_json::Value) -> Value {
    match tree {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::Array(ArrayValue::dynamic(
            TypeRef::named("Variant"),
            items.into_iter().map(|i| Value::variant(from_tree(i))).collect(),
        )),
        serde_json::Value::Object(map) => {
            let ty = Rc::new(RecordType::anonymous(map.keys().map(String::as_str)));
            let mut fields = CiMap::new();
            for (key, item) in map {
                fields.insert(key.as_str(), Value::variant(from_tree(item)));
            }
            Value::Record(RecordValue::new(ty, fields))
        }
    }
}

#[cfg(test)]
mod tests;
