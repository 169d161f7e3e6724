//! Member access and method dispatch.
//!
//! `x.M` looks at the value's own members first (fields, properties,
//! methods, class variables and constants), then at helpers declared for
//! its type, most recently declared first. Records are values: a method
//! runs on a copy of its receiver, and a procedure's changes are written
//! back when the receiver was a variable.

use std::rc::Rc;

use dws_ir::{Expr, FunctionDecl, Name, Pos};
use dws_runtime::convert::{enum_from_ordinal, values_equal};
use dws_runtime::errors::{
    abstract_instantiation, index_out_of_bounds, nil_reference, object_destroyed,
    undefined_member,
};
use dws_runtime::{
    ArrayValue, ClassInfo, EvalError, EvalResult, MethodRef, ObjectRef, PropertyAccess,
    PropertyInfo, RecordType, RecordValue, TypeMeta, Value,
};

use super::expr::{helper_keys, index_ordinal};
use super::{is_self_expr, CallArgs, Invocation};
use crate::interpreter::Interpreter;

/// How a member access was written.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct MemberAccess {
    /// Reject destroyed objects. Off for an explicit or implicit `Self`, so
    /// a destructor can still reach its own fields.
    pub checked: bool,
    /// The receiver is a variable, so a record procedure's changes to its
    /// receiver copy are written back.
    pub write_back: bool,
}

impl MemberAccess {
    pub(crate) const INTERNAL: MemberAccess = MemberAccess {
        checked: false,
        write_back: true,
    };
}

impl Interpreter {
    /// `object.member(args)`.
    pub(crate) fn call_member(
        &mut self,
        object: &Expr,
        member: &Name,
        args: &[Expr],
        pos: Pos,
    ) -> EvalResult {
        let receiver = self.eval_expr(object)?;
        let access = MemberAccess {
            checked: !is_self_expr(object),
            write_back: object.as_ident().is_some(),
        };
        self.call_method(receiver, member, CallArgs::Exprs(args), pos, access)
    }

    /// Call method `name` on `receiver`.
    pub(crate) fn call_method(
        &mut self,
        receiver: Value,
        name: &Name,
        args: CallArgs<'_>,
        pos: Pos,
        access: MemberAccess,
    ) -> EvalResult {
        match receiver.into_unboxed() {
            Value::Object(object) => self.call_object_method(object, name, args, pos, access.checked),
            Value::Interface(iface) => match iface.object {
                Some(object) => self.call_object_method(object, name, args, pos, true),
                None => Err(nil_reference(name.as_str()).into()),
            },
            Value::Exception(exc) => {
                self.call_object_method(exc.object.clone(), name, args, pos, true)
            }
            Value::Nil if name.matches("Free") => Ok(Value::Nil),
            Value::Nil => Err(nil_reference(name.as_str()).into()),
            Value::ClassRef(class) => self.call_class_method(class, name, args, pos),
            Value::Record(record) => {
                self.call_record_method(record, name, args, pos, access.write_back)
            }
            Value::Type(TypeMeta::Record(ty)) => self.call_record_static(ty, name, args, pos),
            Value::Array(array) => self.call_array_method(array, name, args, pos),
            other => self.call_value_method(other, name, args, pos),
        }
    }

    fn call_object_method(
        &mut self,
        object: ObjectRef,
        name: &Name,
        args: CallArgs<'_>,
        pos: Pos,
        checked: bool,
    ) -> EvalResult {
        if name.matches("Free") {
            self.free_object(&object)?;
            return Ok(Value::Nil);
        }
        if checked && object.is_destroyed() {
            return Err(object_destroyed(object.class_name()).into());
        }
        let class = Rc::clone(object.class());
        let methods = class.find_methods(name.as_str());
        if !methods.is_empty() {
            return self.dispatch_method(&methods, name, Value::Object(object), args, pos);
        }
        if name.matches("ClassName") {
            return Ok(Value::string(class.name.as_str()));
        }
        if name.matches("ClassType") {
            return Ok(Value::ClassRef(class));
        }
        if let Some(Value::Function(pointer)) = object.get_field(name.as_str()) {
            return self.call_pointer(&pointer, args, pos);
        }
        if let Some(property) = class.find_property(name.as_str()).cloned() {
            let index = self.eval_args(args)?;
            return self.read_property(Value::Object(object), &property, index, pos);
        }
        if let Some(result) = self.call_helper(&Value::Object(object), name, args, pos)? {
            return Ok(result);
        }
        Err(undefined_member(name.as_str(), class.name.as_str()).into())
    }

    /// Pick an overload among a class's methods and call it on `receiver`.
    fn dispatch_method(
        &mut self,
        methods: &[MethodRef],
        name: &Name,
        receiver: Value,
        args: CallArgs<'_>,
        pos: Pos,
    ) -> EvalResult {
        let decls: Vec<Rc<FunctionDecl>> = methods.iter().map(|m| Rc::clone(&m.decl)).collect();
        let (index, bound) = self.resolve_call(name.as_str(), &decls, args)?;
        let method = &methods[index];
        let receiver = match receiver {
            Value::Object(object) if method.decl.is_class_method() => {
                Value::ClassRef(Rc::clone(object.class()))
            }
            other => other,
        };
        let is_constructor = method.decl.is_constructor();
        let invocation =
            Invocation::method(Rc::clone(&method.decl), receiver.clone(), Rc::clone(&method.owner));
        let result = self.invoke(invocation, bound, pos)?;
        // A constructor called on an instance re-initializes it and yields it.
        Ok(if is_constructor { receiver } else { result })
    }

    /// `TFoo.M(args)`: constructors and class methods.
    pub(crate) fn call_class_method(
        &mut self,
        class: Rc<ClassInfo>,
        name: &Name,
        args: CallArgs<'_>,
        pos: Pos,
    ) -> EvalResult {
        let methods = class.find_methods(name.as_str());
        if methods.is_empty() {
            if name.matches("ClassName") {
                return Ok(Value::string(class.name.as_str()));
            }
            if let Some(owner) = class.class_var_owner(name.as_str()) {
                let held = owner.class_vars.borrow().get(name.as_str()).cloned();
                if let Some(Value::Function(pointer)) = held {
                    return self.call_pointer(&pointer, args, pos);
                }
            }
            return Err(undefined_member(name.as_str(), class.name.as_str()).into());
        }
        let decls: Vec<Rc<FunctionDecl>> = methods.iter().map(|m| Rc::clone(&m.decl)).collect();
        let (index, bound) = self.resolve_call(name.as_str(), &decls, args)?;
        let method = &methods[index];
        if method.decl.is_constructor() {
            return self.construct(&class, method, bound, pos);
        }
        if !method.decl.is_class_method() {
            return Err(EvalError::new(format!(
                "method {}.{} needs an instance",
                class.name, method.decl.name
            ))
            .into());
        }
        let invocation = Invocation::method(
            Rc::clone(&method.decl),
            Value::ClassRef(Rc::clone(&class)),
            Rc::clone(&method.owner),
        );
        self.invoke(invocation, bound, pos)
    }

    /// Allocate an instance of `class` and run `constructor` on it.
    fn construct(
        &mut self,
        class: &Rc<ClassInfo>,
        constructor: &MethodRef,
        args: super::BoundArgs,
        pos: Pos,
    ) -> EvalResult {
        if class.is_abstract() {
            return Err(abstract_instantiation(class.name.as_str()).into());
        }
        let fields = self.types.new_object_fields(class);
        let object = ObjectRef::new(Rc::clone(class), fields);
        tracing::trace!(class = %class.name, id = object.id(), "construct");
        let invocation = Invocation::method(
            Rc::clone(&constructor.decl),
            Value::Object(object.clone()),
            Rc::clone(&constructor.owner),
        );
        self.invoke(invocation, args, pos)?;
        Ok(Value::Object(object))
    }

    fn call_record_method(
        &mut self,
        record: RecordValue,
        name: &Name,
        args: CallArgs<'_>,
        pos: Pos,
        write_back: bool,
    ) -> EvalResult {
        let ty = Rc::clone(record.ty());
        let decls = ty.find_methods(name.as_str()).to_vec();
        if !decls.is_empty() {
            let (index, bound) = self.resolve_call(name.as_str(), &decls, args)?;
            let decl = Rc::clone(&decls[index]);
            if decl.is_class_method() {
                return self.invoke(Invocation::function(decl), bound, pos);
            }
            let copy = record.deep_copy();
            let receiver = Value::Record(copy.clone());
            self.retain(&receiver);
            let invocation = Invocation {
                decl: Rc::clone(&decl),
                receiver: Some(receiver.clone()),
                owner: None,
                closure: None,
            };
            let result = self.invoke(invocation, bound, pos);
            if write_back && !decl.has_result() && result.is_ok() {
                let original = Value::Record(record.clone());
                self.release(&original)?;
                record.assign_from(&copy);
                self.retain(&original);
            }
            self.release(&receiver)?;
            return result;
        }
        if let Some(Value::Function(pointer)) = record.get(name.as_str()) {
            return self.call_pointer(&pointer, args, pos);
        }
        if let Some(property) = ty.properties.get(name.as_str()).cloned() {
            let index = self.eval_args(args)?;
            return self.read_property(Value::Record(record), &property, index, pos);
        }
        if let Some(result) = self.call_helper(&Value::Record(record), name, args, pos)? {
            return Ok(result);
        }
        Err(undefined_member(name.as_str(), ty.name.as_str()).into())
    }

    /// `TPoint.M(args)`: record constructors and class methods.
    pub(crate) fn call_record_static(
        &mut self,
        ty: Rc<RecordType>,
        name: &Name,
        args: CallArgs<'_>,
        pos: Pos,
    ) -> EvalResult {
        let decls = ty.find_methods(name.as_str()).to_vec();
        if decls.is_empty() {
            return Err(undefined_member(name.as_str(), ty.name.as_str()).into());
        }
        let (index, bound) = self.resolve_call(name.as_str(), &decls, args)?;
        let decl = Rc::clone(&decls[index]);
        if decl.is_constructor() {
            let record = self.types.new_record(&ty);
            let invocation = Invocation {
                decl,
                receiver: Some(Value::Record(record.clone())),
                owner: None,
                closure: None,
            };
            self.invoke(invocation, bound, pos)?;
            return Ok(Value::Record(record));
        }
        self.invoke(Invocation::function(decl), bound, pos)
    }

    /// Built-in methods of dynamic arrays.
    pub(crate) fn call_array_method(
        &mut self,
        array: ArrayValue,
        name: &Name,
        args: CallArgs<'_>,
        pos: Pos,
    ) -> EvalResult {
        let values = self.eval_args(args)?;
        let len = i64::try_from(array.len()).unwrap_or(i64::MAX);
        let resizes = matches!(
            name.key(),
            "add" | "push" | "delete" | "insert" | "clear" | "pop" | "setlength"
        );
        if resizes && array.is_static() {
            return Err(EvalError::new(format!("cannot call {name} on a static array")).into());
        }
        match (name.key(), values.as_slice()) {
            ("add" | "push", items) => {
                for item in items {
                    let item = self.coerce_element(&array, item.clone())?;
                    self.retain(&item);
                    array.push(item);
                }
                Ok(Value::Nil)
            }
            ("count" | "length", []) => Ok(Value::Integer(len)),
            ("high", []) => Ok(Value::Integer(array.high())),
            ("low", []) => Ok(Value::Integer(array.low())),
            ("indexof", [item]) => {
                let found = array.items().iter().position(|v| values_equal(v, item));
                Ok(Value::Integer(found.map_or(-1, |i| {
                    array.low() + i64::try_from(i).unwrap_or(i64::MAX)
                })))
            }
            ("contains", [item]) => Ok(Value::Boolean(
                array.items().iter().any(|v| values_equal(v, item)),
            )),
            ("delete", [index]) => self.delete_elements(&array, index, &Value::Integer(1)),
            ("delete", [index, count]) => self.delete_elements(&array, index, count),
            ("insert", [index, item]) => {
                let at = index_ordinal(index)?;
                let slot = usize::try_from(at - array.low())
                    .ok()
                    .filter(|s| *s <= array.len())
                    .ok_or_else(|| index_out_of_bounds(at, array.low(), array.high()))?;
                let item = self.coerce_element(&array, item.clone())?;
                self.retain(&item);
                array.insert(slot, item);
                Ok(Value::Nil)
            }
            ("pop", []) => {
                let last = array.len().checked_sub(1).ok_or_else(|| index_out_of_bounds(0, 0, -1))?;
                let item = array.get(last).unwrap_or(Value::Nil);
                array.remove(last, 1);
                Ok(item)
            }
            ("clear", []) => {
                let removed = std::mem::take(&mut *array.items_mut());
                for item in &removed {
                    self.release(item)?;
                }
                Ok(Value::Nil)
            }
            ("setlength", [new_len]) => {
                let new_len = usize::try_from(index_ordinal(new_len)?).unwrap_or(0);
                let element = array.element_type().clone();
                let types = &self.types;
                array.set_length(new_len, || types.default_value(&element));
                Ok(Value::Nil)
            }
            ("reverse", []) => {
                array.items_mut().reverse();
                Ok(Value::Nil)
            }
            _ => {
                let receiver = Value::Array(array);
                match self.call_helper(&receiver, name, CallArgs::Values(values), pos)? {
                    Some(result) => Ok(result),
                    None => Err(undefined_member(name.as_str(), &receiver.type_name()).into()),
                }
            }
        }
    }

    pub(crate) fn delete_elements(&mut self, array: &ArrayValue, index: &Value, count: &Value) -> EvalResult {
        let at = index_ordinal(index)?;
        let count = usize::try_from(index_ordinal(count)?).unwrap_or(0);
        let slot = array
            .slot_of(at)
            .ok_or_else(|| index_out_of_bounds(at, array.low(), array.high()))?;
        let end = (slot + count).min(array.len());
        let removed: Vec<Value> = array.items()[slot..end].to_vec();
        array.remove(slot, end - slot);
        for item in &removed {
            self.release(item)?;
        }
        Ok(Value::Nil)
    }

    /// Convert `item` to `array`'s element type for storage.
    pub(crate) fn coerce_element(&mut self, array: &ArrayValue, item: Value) -> EvalResult {
        match self.types.resolve(array.element_type()) {
            Some(meta) => self.coerce(item, &meta),
            None => Ok(item.copy_for_store()),
        }
    }

    /// Methods of scalars, enums and sets: intrinsic ones, helpers, then any
    /// built-in taking the receiver as its first argument (`s.Trim`).
    fn call_value_method(
        &mut self,
        receiver: Value,
        name: &Name,
        args: CallArgs<'_>,
        pos: Pos,
    ) -> EvalResult {
        if let Value::Enum(value) = &receiver {
            match name.key() {
                "name" | "tostring" => return Ok(Value::string(value.name())),
                "value" | "ord" => return Ok(Value::Integer(value.ordinal)),
                _ => {}
            }
        }
        if name.matches("ToString") && args.len() == 0 {
            return Ok(Value::string(receiver.to_string()));
        }
        if let Some(result) = self.call_helper(&receiver, name, args.clone(), pos)? {
            return Ok(result);
        }
        let builtin = Name::new(builtin_alias(name.as_str()));
        if self.builtins.get(builtin.as_str()).is_some() {
            let mut values = vec![receiver];
            values.extend(self.eval_args(args)?);
            return self.call_builtin(&builtin, &values);
        }
        Err(undefined_member(name.as_str(), &receiver.type_name()).into())
    }

    /// Call a helper method (or helper property getter) for `receiver`'s
    /// type. `None` when no helper declares `name`.
    pub(crate) fn call_helper(
        &mut self,
        receiver: &Value,
        name: &Name,
        args: CallArgs<'_>,
        pos: Pos,
    ) -> EvalResult<Option<Value>> {
        let mut found = None;
        'keys: for key in helper_keys(receiver) {
            for helper in self.types.helpers_for(&key) {
                if let Some(overloads) = helper.methods.get(name.as_str()) {
                    found = Some(HelperMember::Method(overloads.clone()));
                    break 'keys;
                }
                if let Some(property) = helper.properties.get(name.as_str()) {
                    found = Some(HelperMember::Property(property.clone()));
                    break 'keys;
                }
            }
        }
        match found {
            None => Ok(None),
            Some(HelperMember::Method(decls)) => {
                let (index, bound) = self.resolve_call(name.as_str(), &decls, args)?;
                let invocation = Invocation {
                    decl: Rc::clone(&decls[index]),
                    receiver: Some(receiver.copy_for_store()),
                    owner: None,
                    closure: None,
                };
                self.invoke(invocation, bound, pos).map(Some)
            }
            Some(HelperMember::Property(property)) => match &property.read {
                PropertyAccess::Method(getter) | PropertyAccess::Field(getter) => {
                    let getter = getter.clone();
                    self.call_helper(receiver, &getter, args, pos)
                }
                PropertyAccess::None => Err(write_only(&property).into()),
            },
        }
    }

    // Reads

    /// `receiver.name` without arguments.
    pub(crate) fn read_member(
        &mut self,
        receiver: Value,
        name: &Name,
        pos: Pos,
        access: MemberAccess,
    ) -> EvalResult {
        match receiver.into_unboxed() {
            Value::Object(object) => self.read_object_member(object, name, pos, access.checked),
            Value::Interface(iface) => match iface.object {
                Some(object) => self.read_object_member(object, name, pos, true),
                None => Err(nil_reference(name.as_str()).into()),
            },
            Value::Exception(exc) => self.read_object_member(exc.object.clone(), name, pos, true),
            Value::Nil => Err(nil_reference(name.as_str()).into()),
            Value::Record(record) => self.read_record_member(record, name, pos, access),
            Value::ClassRef(class) => self.read_class_member(class, name, pos),
            Value::Type(meta) => self.read_type_member(meta, name, pos),
            other => self.call_method(other, name, CallArgs::empty(), pos, access),
        }
    }

    fn read_object_member(
        &mut self,
        object: ObjectRef,
        name: &Name,
        pos: Pos,
        checked: bool,
    ) -> EvalResult {
        if checked && object.is_destroyed() && !name.matches("Free") {
            return Err(object_destroyed(object.class_name()).into());
        }
        if let Some(value) = object.get_field(name.as_str()) {
            return Ok(value);
        }
        let class = Rc::clone(object.class());
        if let Some(property) = class.find_property(name.as_str()).cloned() {
            return self.read_property(Value::Object(object), &property, Vec::new(), pos);
        }
        if let Some(value) = class_var(&class, name) {
            return Ok(value);
        }
        if let Some(value) = class.find_constant(name.as_str()) {
            return Ok(value);
        }
        self.call_object_method(object, name, CallArgs::empty(), pos, checked)
    }

    fn read_record_member(
        &mut self,
        record: RecordValue,
        name: &Name,
        pos: Pos,
        access: MemberAccess,
    ) -> EvalResult {
        if let Some(value) = record.get(name.as_str()) {
            return Ok(value);
        }
        let ty = Rc::clone(record.ty());
        if let Some(property) = ty.properties.get(name.as_str()).cloned() {
            return self.read_property(Value::Record(record), &property, Vec::new(), pos);
        }
        if let Some(value) = ty.constants.get(name.as_str()) {
            return Ok(value.clone());
        }
        self.call_record_method(record, name, CallArgs::empty(), pos, access.write_back)
    }

    fn read_class_member(&mut self, class: Rc<ClassInfo>, name: &Name, pos: Pos) -> EvalResult {
        if let Some(value) = class_var(&class, name) {
            return Ok(value);
        }
        if let Some(value) = class.find_constant(name.as_str()) {
            return Ok(value);
        }
        if let Some(property) = class
            .find_property(name.as_str())
            .filter(|p| p.is_class)
            .cloned()
        {
            return self.read_property(Value::ClassRef(class), &property, Vec::new(), pos);
        }
        self.call_class_method(class, name, CallArgs::empty(), pos)
    }

    /// `TColor.Red`, `TColor.High`, `TPoint.Origin`.
    fn read_type_member(&mut self, meta: TypeMeta, name: &Name, pos: Pos) -> EvalResult {
        match meta {
            TypeMeta::Enum(ty) => {
                if let Some(ordinal) = ty.ordinal_of(name.as_str()) {
                    return Ok(enum_from_ordinal(&ty, ordinal));
                }
                match name.key() {
                    "low" => Ok(enum_from_ordinal(&ty, ty.low())),
                    "high" => Ok(enum_from_ordinal(&ty, ty.high())),
                    _ => Err(undefined_member(name.as_str(), ty.name.as_str()).into()),
                }
            }
            TypeMeta::Record(ty) => {
                if let Some(value) = ty.constants.get(name.as_str()) {
                    return Ok(value.clone());
                }
                self.call_record_static(ty, name, CallArgs::empty(), pos)
            }
            other => Err(undefined_member(name.as_str(), &other.name()).into()),
        }
    }

    /// Read a property through its getter field or method.
    pub(crate) fn read_property(
        &mut self,
        receiver: Value,
        property: &PropertyInfo,
        index: Vec<Value>,
        pos: Pos,
    ) -> EvalResult {
        match &property.read {
            PropertyAccess::Field(field) => {
                self.read_member(receiver, field, pos, MemberAccess::INTERNAL)
            }
            PropertyAccess::Method(getter) => self.call_method(
                receiver,
                getter,
                CallArgs::Values(index),
                pos,
                MemberAccess::INTERNAL,
            ),
            PropertyAccess::None => Err(write_only(property).into()),
        }
    }

    /// Write a property through its setter field or method.
    pub(crate) fn write_property(
        &mut self,
        receiver: Value,
        property: &PropertyInfo,
        index: Vec<Value>,
        value: Value,
        pos: Pos,
    ) -> EvalResult<()> {
        match &property.write {
            PropertyAccess::Field(field) => {
                let place = self.member_place(receiver, field, false)?;
                self.write_place(place, value, pos)
            }
            PropertyAccess::Method(setter) => {
                let mut args = index;
                args.push(value);
                self.call_method(
                    receiver,
                    setter,
                    CallArgs::Values(args),
                    pos,
                    MemberAccess::INTERNAL,
                )?;
                Ok(())
            }
            PropertyAccess::None => Err(EvalError::new(format!(
                "property {} is read-only",
                property.name
            ))
            .into()),
        }
    }

    /// The default (array) property of `receiver`.
    pub(crate) fn default_property(&self, receiver: &Value) -> EvalResult<PropertyInfo> {
        let found = match receiver.unboxed() {
            Value::Record(record) => record.ty().properties.values().find(|p| p.is_default).cloned(),
            other => other
                .as_object()
                .and_then(|o| o.class().default_property().cloned()),
        };
        found.ok_or_else(|| {
            EvalError::new(format!("{} has no default property", receiver.type_name())).into()
        })
    }

    pub(crate) fn read_default_property(
        &mut self,
        receiver: Value,
        index: Vec<Value>,
        pos: Pos,
    ) -> EvalResult {
        if receiver.is_nil() {
            return Err(nil_reference("[]").into());
        }
        let property = self.default_property(&receiver)?;
        self.read_property(receiver, &property, index, pos)
    }
}

enum HelperMember {
    Method(Vec<Rc<FunctionDecl>>),
    Property(PropertyInfo),
}

fn class_var(class: &Rc<ClassInfo>, name: &Name) -> Option<Value> {
    let owner = class.class_var_owner(name.as_str())?;
    let value = owner.class_vars.borrow().get(name.as_str()).cloned();
    value
}

fn write_only(property: &PropertyInfo) -> EvalError {
    EvalError::new(format!("property {} is write-only", property.name))
}

/// Built-in used for `value.Name(...)` when no helper declares `Name`.
fn builtin_alias(name: &str) -> &str {
    match name.to_ascii_lowercase().as_str() {
        "toupper" => "UpperCase",
        "tolower" => "LowerCase",
        "tointeger" => "StrToInt",
        "tofloat" => "StrToFloat",
        _ => name,
    }
}
