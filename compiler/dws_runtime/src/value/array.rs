//! Array values.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use dws_ir::TypeRef;

use super::Value;
use crate::types::ArrayType;

/// A static or dynamic array.
///
/// Dynamic arrays are reference types: clones share the element vector.
/// Static arrays are value types and are deep-copied by
/// [`Value::copy_for_store`].
#[derive(Clone)]
pub struct ArrayValue {
    ty: Rc<ArrayType>,
    items: Rc<RefCell<Vec<Value>>>,
}

impl ArrayValue {
    pub fn new(ty: Rc<ArrayType>, items: Vec<Value>) -> Self {
        ArrayValue {
            ty,
            items: Rc::new(RefCell::new(items)),
        }
    }

    /// A dynamic array of `element` holding `items`.
    pub fn dynamic(element: TypeRef, items: Vec<Value>) -> Self {
        Self::new(Rc::new(ArrayType::dynamic(element)), items)
    }

    pub fn ty(&self) -> &Rc<ArrayType> {
        &self.ty
    }

    pub fn element_type(&self) -> &TypeRef {
        &self.ty.element
    }

    pub fn is_static(&self) -> bool {
        self.ty.is_static()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Lowest valid index: the declared low bound, or 0.
    pub fn low(&self) -> i64 {
        self.ty.bounds.map_or(0, |(lo, _)| lo)
    }

    /// Highest valid index; `low - 1` when empty.
    pub fn high(&self) -> i64 {
        match self.ty.bounds {
            Some((_, hi)) => hi,
            None => i64::try_from(self.len()).unwrap_or(i64::MAX) - 1,
        }
    }

    /// Map a script index to a position in the element vector.
    pub fn slot_of(&self, index: i64) -> Option<usize> {
        let offset = index.checked_sub(self.low())?;
        let slot = usize::try_from(offset).ok()?;
        (slot < self.len()).then_some(slot)
    }

    pub fn get(&self, slot: usize) -> Option<Value> {
        self.items.borrow().get(slot).cloned()
    }

    /// Overwrite an element. Returns `false` when out of range.
    pub fn set(&self, slot: usize, value: Value) -> bool {
        match self.items.borrow_mut().get_mut(slot) {
            Some(item) => {
                *item = value;
                true
            }
            None => false,
        }
    }

    pub fn push(&self, value: Value) {
        self.items.borrow_mut().push(value);
    }

    pub fn insert(&self, slot: usize, value: Value) {
        let mut items = self.items.borrow_mut();
        let slot = slot.min(items.len());
        items.insert(slot, value);
    }

    /// Remove `count` elements starting at `slot`, clamped to the length.
    pub fn remove(&self, slot: usize, count: usize) {
        let mut items = self.items.borrow_mut();
        let start = slot.min(items.len());
        let end = start.saturating_add(count).min(items.len());
        items.drain(start..end);
    }

    /// Grow or shrink a dynamic array, filling new slots from `fill`.
    pub fn set_length(&self, len: usize, mut fill: impl FnMut() -> Value) {
        self.items.borrow_mut().resize_with(len, &mut fill);
    }

    pub fn items(&self) -> Ref<'_, Vec<Value>> {
        self.items.borrow()
    }

    pub fn items_mut(&self) -> RefMut<'_, Vec<Value>> {
        self.items.borrow_mut()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }

    /// Independent copy, element values copied for storage.
    pub fn deep_copy(&self) -> ArrayValue {
        let items = self.items.borrow().iter().map(Value::copy_for_store).collect();
        ArrayValue::new(Rc::clone(&self.ty), items)
    }

    pub fn ptr_eq(&self, other: &ArrayValue) -> bool {
        Rc::ptr_eq(&self.items, &other.items)
    }

    /// No other value shares this element storage.
    pub fn is_unique(&self) -> bool {
        Rc::strong_count(&self.items) == 1
    }

    /// Move every element out, leaving the array empty.
    pub fn take_items(&self) -> Vec<Value> {
        std::mem::take(&mut *self.items.borrow_mut())
    }
}

impl fmt::Debug for ArrayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.borrow().iter()).finish()
    }
}
