//! Slot references for `var` parameters and `Result` aliasing.

use std::fmt;

use dws_ir::Name;

use super::{ArrayValue, ObjectRef, RecordValue, Value};
use crate::environment::{AssignError, LocalScope, Scope};

/// A non-owning pointer to a named slot.
///
/// Reads and writes go through on every access. When the target slot itself
/// holds a reference (a `var` parameter passed on to another `var`
/// parameter), the chain is followed to the final slot.
#[derive(Clone)]
pub enum ReferenceValue {
    /// A variable in a specific scope.
    Variable { scope: LocalScope<Scope>, name: Name },
    /// A field of an object.
    Field { object: ObjectRef, name: Name },
    /// A field of a record, by identity of the field map.
    RecordField { record: RecordValue, name: Name },
    /// An element of an array, by vector position.
    Element { array: ArrayValue, slot: usize },
}

impl ReferenceValue {
    pub fn variable(scope: LocalScope<Scope>, name: Name) -> Self {
        ReferenceValue::Variable { scope, name }
    }

    fn read_slot(&self) -> Option<Value> {
        match self {
            ReferenceValue::Variable { scope, name } => scope.borrow().lookup(name),
            ReferenceValue::Field { object, name } => object.get_field(name.as_str()),
            ReferenceValue::RecordField { record, name } => record.get(name.as_str()),
            ReferenceValue::Element { array, slot } => array.get(*slot),
        }
    }

    /// Current value of the referenced slot, following chained references.
    pub fn get(&self) -> Option<Value> {
        match self.read_slot()? {
            Value::Reference(inner) => inner.get(),
            value => Some(value),
        }
    }

    /// Overwrite the referenced slot, following chained references.
    pub fn set(&self, value: Value) -> Result<(), AssignError> {
        if let Some(Value::Reference(inner)) = self.read_slot() {
            return inner.set(value);
        }
        let stored = match self {
            ReferenceValue::Variable { scope, name } => {
                return scope.borrow_mut().assign(name, value);
            }
            ReferenceValue::Field { object, name } => object.set_field(name.as_str(), value),
            ReferenceValue::RecordField { record, name } => record.set(name.as_str(), value),
            ReferenceValue::Element { array, slot } => array.set(*slot, value),
        };
        if stored {
            Ok(())
        } else {
            Err(AssignError::Undefined)
        }
    }

    /// Name of the referenced slot, for messages.
    pub fn describe(&self) -> String {
        match self {
            ReferenceValue::Variable { name, .. } => name.to_string(),
            ReferenceValue::Field { object, name } => format!("{}.{name}", object.class_name()),
            ReferenceValue::RecordField { record, name } => {
                format!("{}.{name}", record.type_name())
            }
            ReferenceValue::Element { slot, .. } => format!("[{slot}]"),
        }
    }
}

impl fmt::Debug for ReferenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "&{}", self.describe())
    }
}
