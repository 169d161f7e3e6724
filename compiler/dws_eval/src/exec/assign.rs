//! Assignment targets.
//!
//! `place_of` turns an assignable expression into a [`Place`] once, so a
//! compound assignment (`a[f()] += 1`) evaluates its target's operands a
//! single time. Every store converts the value to the slot's type, retains
//! the new interface value and then releases the old one.

use std::rc::Rc;

use dws_ir::{AssignOp, Expr, ExprKind, Name, Pos, TypeRef};
use dws_runtime::convert::{convert_builtin, slot_meta};
use dws_runtime::errors::{
    cannot_assign_immutable, index_out_of_bounds, invalid_assignment_target, nil_reference,
    object_destroyed, type_mismatch, undefined_member, undefined_variable,
    var_arg_not_assignable,
};
use dws_runtime::{
    ArrayValue, AssignError, ClassInfo, EvalError, EvalResult, LocalScope, ObjectRef,
    PropertyInfo, RecordValue, ReferenceValue, Scope, TypeMeta, Value,
};

use super::expr::{has_default_property, index_ordinal, string_char, Resolved};
use super::is_self_expr;
use crate::interpreter::Interpreter;

/// A resolved assignment target.
pub(crate) enum Place {
    Variable { scope: LocalScope<Scope>, name: Name },
    /// A `var` parameter or the function-name alias of `Result`.
    Reference(ReferenceValue),
    Field { object: ObjectRef, name: Name },
    RecordField { record: RecordValue, name: Name },
    Element { array: ArrayValue, slot: usize },
    Property {
        receiver: Value,
        property: PropertyInfo,
        index: Vec<Value>,
    },
    /// Class variable, stored on the class that declares it.
    ClassVar { class: Rc<ClassInfo>, name: Name },
    /// One character of the string held by `base`.
    StringChar { base: Box<Place>, index: i64 },
}

impl Interpreter {
    pub(crate) fn exec_assign(
        &mut self,
        target: &Expr,
        op: AssignOp,
        value: &Expr,
        pos: Pos,
    ) -> EvalResult<()> {
        let place = self.place_of(target)?;
        let value = match op.binary() {
            None => self.eval_expr(value)?,
            Some(binary) => {
                let current = self.read_place(&place, pos)?;
                let rhs = self.eval_expr(value)?;
                self.binary_values(binary, current, rhs)?
            }
        };
        self.write_place(place, value, pos)
    }

    pub(crate) fn place_of(&mut self, expr: &Expr) -> EvalResult<Place> {
        match &expr.kind {
            ExprKind::Ident(name) => self.name_place(name),
            ExprKind::Member { object, member } => {
                let receiver = self.eval_expr(object)?;
                self.member_place(receiver, member, !is_self_expr(object))
            }
            ExprKind::Index { object, indices } => self.index_place(object, indices, expr.pos),
            _ => Err(invalid_assignment_target().into()),
        }
    }

    /// The place a bare name denotes: a variable, a `var` parameter or a
    /// member of `Self`.
    pub(crate) fn name_place(&mut self, name: &Name) -> EvalResult<Place> {
        match self.resolve_ident(name) {
            Resolved::Variable(Value::Reference(reference)) => Ok(Place::Reference(reference)),
            Resolved::Variable(_) => {
                let scope = self
                    .env
                    .owner_of(name)
                    .ok_or_else(|| undefined_variable(name.as_str()))?;
                Ok(Place::Variable {
                    scope,
                    name: name.clone(),
                })
            }
            Resolved::SelfMember(receiver) => self.member_place(receiver, name, false),
            Resolved::Unbound => Err(undefined_variable(name.as_str()).into()),
        }
    }

    fn index_place(&mut self, object: &Expr, indices: &[Expr], pos: Pos) -> EvalResult<Place> {
        let mut value = self.eval_expr(object)?;
        let mut holder: Option<Place> = None;
        for (position, index_expr) in indices.iter().enumerate() {
            if has_default_property(&value) {
                let index = indices[position..]
                    .iter()
                    .map(|e| self.eval_expr(e))
                    .collect::<EvalResult<Vec<_>>>()?;
                let property = self.default_property(&value)?;
                return Ok(Place::Property {
                    receiver: value,
                    property,
                    index,
                });
            }
            let index = index_ordinal(&self.eval_expr(index_expr)?)?;
            let place = match value.unboxed() {
                Value::Array(array) => {
                    let slot = array
                        .slot_of(index)
                        .ok_or_else(|| index_out_of_bounds(index, array.low(), array.high()))?;
                    Place::Element {
                        array: array.clone(),
                        slot,
                    }
                }
                Value::String(_) => {
                    let base = match holder.take() {
                        Some(place) => place,
                        None => self.place_of(object)?,
                    };
                    Place::StringChar {
                        base: Box::new(base),
                        index,
                    }
                }
                other => return Err(type_mismatch("array", &other.type_name()).into()),
            };
            if position + 1 == indices.len() {
                return Ok(place);
            }
            value = self.read_place(&place, pos)?;
            holder = Some(place);
        }
        Err(invalid_assignment_target().into())
    }

    /// The place `receiver.name` denotes.
    pub(crate) fn member_place(
        &mut self,
        receiver: Value,
        name: &Name,
        checked: bool,
    ) -> EvalResult<Place> {
        match receiver.into_unboxed() {
            Value::Object(object) => object_member_place(object, name, checked),
            Value::Interface(iface) => match iface.object {
                Some(object) => object_member_place(object, name, true),
                None => Err(nil_reference(name.as_str()).into()),
            },
            Value::Exception(exc) => object_member_place(exc.object.clone(), name, true),
            Value::Nil => Err(nil_reference(name.as_str()).into()),
            Value::Record(record) => {
                if record.has_field(name.as_str()) {
                    return Ok(Place::RecordField {
                        record,
                        name: name.clone(),
                    });
                }
                let property = record.ty().properties.get(name.as_str()).cloned();
                match property {
                    Some(property) => Ok(Place::Property {
                        receiver: Value::Record(record),
                        property,
                        index: Vec::new(),
                    }),
                    None => Err(undefined_member(name.as_str(), record.type_name().as_str()).into()),
                }
            }
            Value::ClassRef(class) => {
                if let Some(owner) = class.class_var_owner(name.as_str()) {
                    return Ok(Place::ClassVar {
                        class: owner,
                        name: name.clone(),
                    });
                }
                match class.find_property(name.as_str()).filter(|p| p.is_class).cloned() {
                    Some(property) => Ok(Place::Property {
                        receiver: Value::ClassRef(class),
                        property,
                        index: Vec::new(),
                    }),
                    None => Err(undefined_member(name.as_str(), class.name.as_str()).into()),
                }
            }
            _ => Err(invalid_assignment_target().into()),
        }
    }

    pub(crate) fn read_place(&mut self, place: &Place, pos: Pos) -> EvalResult {
        let value = match place {
            Place::Variable { scope, name } => {
                let value = scope.borrow().lookup_local(name);
                let value = value.ok_or_else(|| undefined_variable(name.as_str()))?;
                return self.deref_value(value);
            }
            Place::Reference(reference) => reference
                .get()
                .ok_or_else(|| undefined_variable(&reference.describe()))?,
            Place::Field { object, name } => object
                .get_field(name.as_str())
                .ok_or_else(|| undefined_member(name.as_str(), object.class_name()))?,
            Place::RecordField { record, name } => record
                .get(name.as_str())
                .ok_or_else(|| undefined_member(name.as_str(), record.type_name().as_str()))?,
            Place::Element { array, slot } => array.get(*slot).unwrap_or(Value::Nil),
            Place::Property {
                receiver,
                property,
                index,
            } => return self.read_property(receiver.clone(), property, index.clone(), pos),
            Place::ClassVar { class, name } => {
                let value = class.class_vars.borrow().get(name.as_str()).cloned();
                value.ok_or_else(|| undefined_member(name.as_str(), class.name.as_str()))?
            }
            Place::StringChar { base, index } => {
                let text = self.read_place(base, pos)?;
                let text = text
                    .as_str()
                    .ok_or_else(|| type_mismatch("String", &text.type_name()))?;
                Value::String(string_char(text, *index)?.to_string())
            }
        };
        self.deref_value(value)
    }

    /// Store `value` into `place`.
    pub(crate) fn write_place(&mut self, place: Place, value: Value, pos: Pos) -> EvalResult<()> {
        let value = self.deref_value(value)?;
        match place {
            Place::Property {
                receiver,
                property,
                index,
            } => self.write_property(receiver, &property, index, value, pos),
            Place::StringChar { base, index } => {
                let text = self.read_place(&base, pos)?;
                let text = text
                    .as_str()
                    .ok_or_else(|| type_mismatch("String", &text.type_name()))?;
                let updated = replace_char(text, index, &value)?;
                self.write_place(*base, Value::String(updated), pos)
            }
            place => {
                let existing = raw_value(&place).unwrap_or(Value::Nil);
                let value = self.coerce_for_slot(&existing, value)?;
                self.retain(&value);
                store(&place, value)?;
                self.release(&existing)
            }
        }
    }

    /// Convert `value` for a slot currently holding `existing`.
    pub(crate) fn coerce_for_slot(&mut self, existing: &Value, value: Value) -> EvalResult {
        match slot_meta(existing) {
            Some(meta) => self.coerce(value, &meta),
            None => Ok(value.copy_for_store()),
        }
    }

    /// Convert `value` to `meta`: built-in conversions first, then user
    /// `implicit` operators.
    pub(crate) fn coerce(&mut self, value: Value, meta: &TypeMeta) -> EvalResult {
        let value = self.deref_value(value)?;
        if let Some(converted) = convert_builtin(&value, meta) {
            // A retyped dynamic array has fresh element storage, which
            // counts its elements on its own.
            if let (Value::Array(source), Value::Array(target)) = (value.unboxed(), converted.unboxed()) {
                if !target.is_static() && !source.ptr_eq(target) {
                    for item in target.to_vec() {
                        self.retain(&item);
                    }
                }
            }
            return Ok(converted);
        }
        if let (Value::Interface(iface), TypeMeta::Class(class)) = (value.unboxed(), meta) {
            if let Some(object) = iface.object.as_ref().filter(|o| o.class().is_descendant_of(class)) {
                return Ok(Value::Object(object.clone()));
            }
        }
        if let Some(converted) = self.convert_user(&value, meta)? {
            return Ok(converted);
        }
        Err(type_mismatch(&meta.name(), &value.type_name()).into())
    }

    /// Apply a chain of user conversion operators, if one leads to `meta`.
    fn convert_user(&mut self, value: &Value, meta: &TypeMeta) -> EvalResult<Option<Value>> {
        let path: Vec<Name> = self
            .types
            .conversion_path(&value.type_key(), &meta.type_key())
            .iter()
            .map(|entry| entry.uses.clone())
            .collect();
        if path.is_empty() {
            return Ok(None);
        }
        let mut current = value.clone();
        for uses in path {
            current = self.call_named(&uses, super::CallArgs::Values(vec![current]), Pos::NONE)?;
        }
        Ok(Some(current))
    }

    /// Convert `value` to a declared type; values of unknown types are
    /// stored as is.
    pub(crate) fn coerce_to_type(&mut self, value: Value, ty: &TypeRef) -> EvalResult {
        match self.types.resolve(ty) {
            Some(meta) => self.coerce(value, &meta),
            None => Ok(self.deref_value(value)?.copy_for_store()),
        }
    }

    /// A reference for a `var`/`out` argument of call `function`.
    pub(crate) fn reference_to(
        &mut self,
        expr: &Expr,
        function: &str,
        index: usize,
    ) -> EvalResult<ReferenceValue> {
        let place = match self.place_of(expr) {
            Ok(place) => place,
            Err(_) => return Err(var_arg_not_assignable(function, index).into()),
        };
        match place {
            Place::Variable { scope, name } => Ok(ReferenceValue::variable(scope, name)),
            Place::Reference(reference) => Ok(reference),
            Place::Field { object, name } => Ok(ReferenceValue::Field { object, name }),
            Place::RecordField { record, name } => Ok(ReferenceValue::RecordField { record, name }),
            Place::Element { array, slot } => Ok(ReferenceValue::Element { array, slot }),
            Place::ClassVar { .. } | Place::Property { .. } | Place::StringChar { .. } => {
                Err(var_arg_not_assignable(function, index).into())
            }
        }
    }
}

fn object_member_place(object: ObjectRef, name: &Name, checked: bool) -> EvalResult<Place> {
    if checked && object.is_destroyed() {
        return Err(object_destroyed(object.class_name()).into());
    }
    if object.has_field(name.as_str()) {
        return Ok(Place::Field {
            object,
            name: name.clone(),
        });
    }
    let class = Rc::clone(object.class());
    if let Some(property) = class.find_property(name.as_str()).cloned() {
        return Ok(Place::Property {
            receiver: Value::Object(object),
            property,
            index: Vec::new(),
        });
    }
    if let Some(owner) = class.class_var_owner(name.as_str()) {
        return Ok(Place::ClassVar {
            class: owner,
            name: name.clone(),
        });
    }
    Err(undefined_member(name.as_str(), class.name.as_str()).into())
}

/// What a plain slot holds right now, references not followed.
fn raw_value(place: &Place) -> Option<Value> {
    match place {
        Place::Variable { scope, name } => scope.borrow().lookup_local(name),
        Place::Reference(reference) => reference.get(),
        Place::Field { object, name } => object.get_field(name.as_str()),
        Place::RecordField { record, name } => record.get(name.as_str()),
        Place::Element { array, slot } => array.get(*slot),
        Place::ClassVar { class, name } => class.class_vars.borrow().get(name.as_str()).cloned(),
        Place::Property { .. } | Place::StringChar { .. } => None,
    }
}

fn store(place: &Place, value: Value) -> Result<(), EvalError> {
    let assign_error = |err: AssignError, name: &str| match err {
        AssignError::Immutable => cannot_assign_immutable(name),
        AssignError::Undefined => undefined_variable(name),
    };
    match place {
        Place::Variable { scope, name } => scope
            .borrow_mut()
            .assign(name, value)
            .map_err(|err| assign_error(err, name.as_str())),
        Place::Reference(reference) => reference
            .set(value)
            .map_err(|err| assign_error(err, &reference.describe())),
        Place::Field { object, name } => object
            .set_field(name.as_str(), value)
            .then_some(())
            .ok_or_else(|| undefined_member(name.as_str(), object.class_name())),
        Place::RecordField { record, name } => record
            .set(name.as_str(), value)
            .then_some(())
            .ok_or_else(|| undefined_member(name.as_str(), record.type_name().as_str())),
        Place::Element { array, slot } => array
            .set(*slot, value)
            .then_some(())
            .ok_or_else(|| index_out_of_bounds(i64::try_from(*slot).unwrap_or(i64::MAX), array.low(), array.high())),
        Place::ClassVar { class, name } => {
            class.class_vars.borrow_mut().insert(name.clone(), value);
            Ok(())
        }
        Place::Property { .. } | Place::StringChar { .. } => Err(invalid_assignment_target()),
    }
}

/// `text` with its `index`th character (1-based) replaced by `value`.
fn replace_char(text: &str, index: i64, value: &Value) -> Result<String, EvalError> {
    string_char(text, index)?;
    let replacement = value
        .as_str()
        .filter(|s| s.chars().count() == 1)
        .ok_or_else(|| type_mismatch("Char", &value.type_name()))?;
    let position = usize::try_from(index - 1).unwrap_or(0);
    Ok(text
        .chars()
        .enumerate()
        .map(|(i, c)| if i == position { replacement.to_string() } else { c.to_string() })
        .collect())
}
