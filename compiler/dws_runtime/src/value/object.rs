//! Class instances and interface wrappers.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use dws_ir::CiMap;

use super::Value;
use crate::types::{ClassInfo, InterfaceInfo};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// A class instance.
///
/// Plain object lifetime is handled by `Rc`. `ref_count` only counts
/// interface references: it drives the destructor-on-zero rule and is
/// maintained by the evaluator, never by `Clone`.
pub struct ObjectInstance {
    class: Rc<ClassInfo>,
    fields: RefCell<CiMap<Value>>,
    ref_count: Cell<usize>,
    destroyed: Cell<bool>,
    id: u64,
}

/// Shared handle to an [`ObjectInstance`]. Equality is identity.
#[derive(Clone)]
pub struct ObjectRef(Rc<ObjectInstance>);

impl ObjectRef {
    pub fn new(class: Rc<ClassInfo>, fields: CiMap<Value>) -> Self {
        ObjectRef(Rc::new(ObjectInstance {
            class,
            fields: RefCell::new(fields),
            ref_count: Cell::new(0),
            destroyed: Cell::new(false),
            id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
        }))
    }

    #[inline]
    pub fn class(&self) -> &Rc<ClassInfo> {
        &self.0.class
    }

    pub fn class_name(&self) -> &str {
        self.0.class.name.as_str()
    }

    /// Process-unique instance number, for display and tracing.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.0.fields.borrow().get(name).cloned()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.0.fields.borrow().contains_key(name)
    }

    /// Overwrite a declared field. Returns `false` for unknown names.
    pub fn set_field(&self, name: &str, value: Value) -> bool {
        match self.0.fields.borrow_mut().get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Snapshot of all field values, in declaration order.
    pub fn field_values(&self) -> Vec<(dws_ir::Name, Value)> {
        self.0
            .fields
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn ref_count(&self) -> usize {
        self.0.ref_count.get()
    }

    /// Record one more interface reference. Returns the new count.
    pub fn add_ref(&self) -> usize {
        let count = self.0.ref_count.get().saturating_add(1);
        self.0.ref_count.set(count);
        count
    }

    /// Drop one interface reference. Returns the new count, never below 0.
    pub fn release(&self) -> usize {
        let count = self.0.ref_count.get().saturating_sub(1);
        self.0.ref_count.set(count);
        count
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.destroyed.get()
    }

    /// Mark the instance destroyed. Returns `true` the first time only, so
    /// the caller runs the destructor at most once.
    pub fn mark_destroyed(&self) -> bool {
        !self.0.destroyed.replace(true)
    }

    #[inline]
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Fields may point back at this object; keep it shallow.
        write!(f, "{}#{}", self.0.class.name, self.0.id)
    }
}

/// An interface reference: descriptor plus the implementing object, or
/// `None` for a nil interface.
#[derive(Clone)]
pub struct InterfaceValue {
    pub info: Rc<InterfaceInfo>,
    pub object: Option<ObjectRef>,
}

impl InterfaceValue {
    pub fn new(info: Rc<InterfaceInfo>, object: Option<ObjectRef>) -> Self {
        InterfaceValue { info, object }
    }

    pub fn nil(info: Rc<InterfaceInfo>) -> Self {
        InterfaceValue { info, object: None }
    }

    pub fn is_nil(&self) -> bool {
        self.object.is_none()
    }
}

impl fmt::Debug for InterfaceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.object {
            Some(obj) => write!(f, "{}({obj:?})", self.info.name),
            None => write!(f, "{}(nil)", self.info.name),
        }
    }
}
