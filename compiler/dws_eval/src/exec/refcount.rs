//! Interface reference counting and object destruction.
//!
//! Only interface values count references. Stores retain the new value and
//! release the old one; a call frame releases its parameters and locals
//! when it returns; interface results not stored anywhere are released at
//! the end of the statement that produced them. When the count of an
//! object reaches zero its destructor runs and the object is marked
//! destroyed.
//!
//! Records and static arrays are values, so every slot holding one counts
//! the interfaces inside it. Dynamic array elements are counted once, by
//! the shared element storage, and released when its last handle goes.
//!
//! A frame whose scope was captured by an escaping closure keeps its
//! values alive.

use std::rc::Rc;

use dws_ir::{Name, Pos};
use dws_runtime::errors::object_destroyed;
use dws_runtime::{
    ControlAction, EvalResult, InterfaceValue, LocalScope, ObjectRef, ReferenceValue, Scope, Value,
};

use super::{BoundArgs, Invocation};
use crate::interpreter::Interpreter;

/// Handles on a frame's scope that do not mean it was captured: the scope
/// stack entry and the handle taken while releasing.
const UNCAPTURED_HOLDERS: usize = 2;

impl Interpreter {
    /// Count one more holder of every interface `value` carries by value:
    /// the value itself, record fields and static array elements. Dynamic
    /// array elements belong to the shared element storage and were counted
    /// when they were stored into it.
    pub(crate) fn retain(&self, value: &Value) {
        match value.unboxed() {
            Value::Interface(InterfaceValue {
                object: Some(object),
                ..
            }) => {
                let count = object.add_ref();
                tracing::trace!(class = object.class_name(), id = object.id(), count, "retain");
            }
            Value::Record(record) => {
                for field in record.field_values() {
                    self.retain(&field);
                }
            }
            Value::Array(array) if array.is_static() => {
                for item in array.to_vec() {
                    self.retain(&item);
                }
            }
            _ => {}
        }
    }

    /// Undo [`Interpreter::retain`]. A dynamic array also gives up its
    /// elements once `value` is the last handle on its storage.
    pub(crate) fn release(&mut self, value: &Value) -> EvalResult<()> {
        let contents = match value.unboxed() {
            Value::Interface(InterfaceValue {
                object: Some(object),
                ..
            }) => {
                let count = object.release();
                tracing::trace!(class = object.class_name(), id = object.id(), count, "release");
                if count == 0 {
                    let object = object.clone();
                    self.destroy_object(&object)?;
                }
                return Ok(());
            }
            Value::Record(record) if record.is_unique() => record.take_field_values(),
            Value::Record(record) => record.field_values(),
            Value::Array(array) if array.is_unique() => array.take_items(),
            Value::Array(array) if array.is_static() => array.to_vec(),
            _ => return Ok(()),
        };
        self.release_all(&contents)
    }

    /// Release each value, keeping the first failure.
    fn release_all(&mut self, values: &[Value]) -> EvalResult<()> {
        let mut outcome = Ok(());
        for value in values {
            if let Err(action) = self.release(value) {
                if outcome.is_ok() {
                    outcome = Err(action);
                }
            }
        }
        outcome
    }

    /// Run the destructor of `object` once, then drop what its fields hold.
    pub(crate) fn destroy_object(&mut self, object: &ObjectRef) -> EvalResult<()> {
        if !object.mark_destroyed() {
            return Ok(());
        }
        tracing::debug!(class = object.class_name(), id = object.id(), "destroy");
        let destroy = self.names.destroy.clone();
        let destructor = object
            .class()
            .find_methods(destroy.as_str())
            .into_iter()
            .find(|m| m.decl.params.is_empty() && m.decl.body.is_some());
        if let Some(method) = destructor {
            let invocation = Invocation::method(
                Rc::clone(&method.decl),
                Value::Object(object.clone()),
                method.owner,
            );
            self.invoke(invocation, BoundArgs::new(), Pos::NONE)?;
        }
        for (_, value) in object.field_values() {
            self.release(&value)?;
        }
        Ok(())
    }

    /// `obj.Free`.
    pub(crate) fn free_object(&mut self, object: &ObjectRef) -> EvalResult<()> {
        if object.is_destroyed() {
            return Err(object_destroyed(object.class_name()).into());
        }
        self.destroy_object(object)
    }

    /// Release everything bound in the current scope except `keep`.
    ///
    /// A scope still reachable from a closure that outlives it keeps its
    /// values. Closures stored in the scope's own locals do not count.
    pub(crate) fn release_locals(&mut self, keep: Option<&Name>) -> EvalResult<()> {
        let scope = self.env.current_scope();
        let aliases: Vec<Name> = scope
            .borrow()
            .bindings()
            .filter(|(_, value)| {
                matches!(value, Value::Reference(ReferenceValue::Variable { scope: target, .. })
                    if target.ptr_eq(&scope))
            })
            .map(|(name, _)| name.clone())
            .collect();
        for name in &aliases {
            scope.borrow_mut().remove(name);
        }
        let own_closures = scope
            .borrow()
            .bindings()
            .filter(|(name, value)| {
                !keep.is_some_and(|k| k.matches(name.as_str())) && captures(value, &scope)
            })
            .count();
        let holders = scope.holders() - own_closures;
        if holders > UNCAPTURED_HOLDERS {
            tracing::trace!(holders, "scope captured, locals kept");
            return Ok(());
        }
        let values: Vec<Value> = scope
            .borrow_mut()
            .take_values()
            .into_iter()
            .filter(|(name, _)| {
                let kept = keep.is_some_and(|k| k.matches(name.as_str()));
                !kept && !name.matches(self.names.self_.as_str())
            })
            .map(|(_, value)| value)
            .collect();
        self.release_all(&values)
    }

    /// Release a frame's locals while `action` propagates. Errors raised by
    /// destructors here are dropped so the original action wins.
    pub(crate) fn unwind_locals(&mut self, action: &ControlAction) {
        if action.is_fatal() {
            return;
        }
        if self.release_locals(None).is_err() {
            tracing::warn!("destructor failed while unwinding");
        }
    }

    /// Finish a block scope: release its locals unless the block failed
    /// fatally.
    pub(crate) fn close_scope(&mut self, result: EvalResult<()>) -> EvalResult<()> {
        if matches!(result, Err(ControlAction::Fatal(_))) {
            return result;
        }
        let released = self.release_locals(None);
        result.and(released)
    }

    /// Release temporaries registered since `mark`.
    pub(crate) fn release_temporaries(
        &mut self,
        mark: usize,
        outcome: EvalResult<()>,
    ) -> EvalResult<()> {
        if self.temporaries.len() <= mark {
            return outcome;
        }
        let temporaries = self.temporaries.split_off(mark);
        if matches!(outcome, Err(ControlAction::Fatal(_))) {
            return outcome;
        }
        outcome.and(self.release_all(&temporaries))
    }
}

/// `value` is a closure over `scope`.
fn captures(value: &Value, scope: &LocalScope<Scope>) -> bool {
    matches!(value.unboxed(), Value::Function(pointer)
        if pointer.closure.as_ref().is_some_and(|closure| closure.ptr_eq(scope)))
}

/// `value` carries a live interface, directly or inside records and arrays.
pub(crate) fn holds_interfaces(value: &Value) -> bool {
    match value.unboxed() {
        Value::Interface(iface) => !iface.is_nil(),
        Value::Record(record) => record.field_values().iter().any(holds_interfaces),
        Value::Array(array) => array.items().iter().any(holds_interfaces),
        _ => false,
    }
}
