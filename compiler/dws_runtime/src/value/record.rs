//! Record values.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use dws_ir::{CiMap, Name};

use super::Value;
use crate::types::RecordType;

/// A record instance.
///
/// Records have value semantics. The field map sits behind an `Rc` so a
/// method body can mutate `Self` in place, but every store into a variable,
/// field, element or parameter goes through [`Value::copy_for_store`], which
/// calls [`RecordValue::deep_copy`].
#[derive(Clone)]
pub struct RecordValue {
    ty: Rc<RecordType>,
    fields: Rc<RefCell<CiMap<Value>>>,
}

impl RecordValue {
    pub fn new(ty: Rc<RecordType>, fields: CiMap<Value>) -> Self {
        RecordValue {
            ty,
            fields: Rc::new(RefCell::new(fields)),
        }
    }

    pub fn ty(&self) -> &Rc<RecordType> {
        &self.ty
    }

    /// Declared type name; empty for anonymous records.
    pub fn type_name(&self) -> &Name {
        &self.ty.name
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.borrow().contains_key(name)
    }

    /// Overwrite an existing field. Unknown names are rejected: records never
    /// grow fields at runtime.
    pub fn set(&self, name: &str, value: Value) -> bool {
        match self.fields.borrow_mut().get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn fields(&self) -> Ref<'_, CiMap<Value>> {
        self.fields.borrow()
    }

    pub fn field_names(&self) -> Vec<Name> {
        self.fields.borrow().keys().cloned().collect()
    }

    /// Independent copy with every field copied for storage.
    pub fn deep_copy(&self) -> RecordValue {
        let fields = self
            .fields
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.copy_for_store()))
            .collect();
        RecordValue::new(Rc::clone(&self.ty), fields)
    }

    /// Replace this record's fields with `other`'s, keeping identity. Used
    /// to write a mutated receiver copy back into its variable.
    pub fn assign_from(&self, other: &RecordValue) {
        if self.ptr_eq(other) {
            return;
        }
        let copied = other.deep_copy();
        let fields = copied.fields.borrow().clone();
        *self.fields.borrow_mut() = fields;
    }

    pub fn ptr_eq(&self, other: &RecordValue) -> bool {
        Rc::ptr_eq(&self.fields, &other.fields)
    }

    /// No other value shares this field map.
    pub fn is_unique(&self) -> bool {
        Rc::strong_count(&self.fields) == 1
    }

    pub fn field_values(&self) -> Vec<Value> {
        self.fields.borrow().values().cloned().collect()
    }

    /// Move every field value out, leaving the record without fields.
    pub fn take_field_values(&self) -> Vec<Value> {
        std::mem::take(&mut *self.fields.borrow_mut())
            .into_iter()
            .map(|(_, v)| v)
            .collect()
    }
}

impl fmt::Debug for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.ty.name)?;
        f.debug_map().entries(self.fields.borrow().iter()).finish()
    }
}
