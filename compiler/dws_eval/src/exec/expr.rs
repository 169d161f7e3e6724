//! Expression evaluation.

use std::rc::Rc;

use dws_ir::{BinaryOp, CiMap, Expr, ExprKind, Name, Pos, SetElement, TypeRef};
use dws_runtime::convert::{convert_builtin, ordinal_value};
use dws_runtime::errors::{
    index_out_of_bounds, invalid_cast, not_callable, type_mismatch, undefined_function,
    undefined_member, undefined_type, undefined_variable,
};
use dws_runtime::{
    ArrayValue, ClassInfo, EvalError, EvalResult, FunctionPointer, RecordType,
    RecordValue, SetDomain, SetValue, Thunk, TypeMeta, Value,
};

use super::refcount::holds_interfaces;
use super::{at_pos, is_self_expr, CallArgs, Invocation, MemberAccess};
use crate::interpreter::Interpreter;
use crate::operators;
use crate::stack::ensure_sufficient_stack;

/// Largest `lo..hi` range a set literal may expand.
const MAX_SET_RANGE: i64 = 1 << 16;

/// What a bare identifier refers to.
pub(crate) enum Resolved {
    /// A binding in the scope chain, as stored (references and thunks not
    /// yet followed).
    Variable(Value),
    /// A member of the current `Self`.
    SelfMember(Value),
    Unbound,
}

/// Where a user-defined operator implementation lives.
enum OverloadTarget {
    Global(Name),
    Record(Rc<RecordType>, Name),
    Class(Rc<ClassInfo>, Name),
}

impl Interpreter {
    pub(crate) fn eval_expr(&mut self, expr: &Expr) -> EvalResult {
        ensure_sufficient_stack(|| {
            self.eval_expr_kind(expr)
                .map_err(|action| at_pos(action, expr.pos))
        })
    }

    fn eval_expr_kind(&mut self, expr: &Expr) -> EvalResult {
        match &expr.kind {
            ExprKind::Integer(n) => Ok(Value::Integer(*n)),
            ExprKind::Float(x) => Ok(Value::Float(*x)),
            ExprKind::String(s) => Ok(Value::String(s.clone())),
            ExprKind::Char(c) => Ok(Value::String(c.to_string())),
            ExprKind::Boolean(b) => Ok(Value::Boolean(*b)),
            ExprKind::Nil => Ok(Value::Nil),
            ExprKind::Ident(name) => self.eval_ident(name, expr.pos),
            ExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right),
            ExprKind::Unary { op, operand } => {
                let value = self.eval_expr(operand)?;
                Ok(operators::unary(*op, &value)?)
            }
            ExprKind::Call { callee, args } => self.eval_call(callee, args, expr.pos),
            ExprKind::Member { object, member } => {
                let receiver = self.eval_expr(object)?;
                let access = MemberAccess {
                    checked: !is_self_expr(object),
                    write_back: object.as_ident().is_some(),
                };
                self.read_member(receiver, member, expr.pos, access)
            }
            ExprKind::Index { object, indices } => self.eval_index(object, indices, expr.pos),
            ExprKind::New { class, args } => {
                let class = self
                    .types
                    .class(class.as_str())
                    .ok_or_else(|| undefined_type(class.as_str()))?;
                let create = self.names.create.clone();
                self.call_class_method(class, &create, CallArgs::Exprs(args), expr.pos)
            }
            ExprKind::Lambda(decl) => Ok(Value::Function(FunctionPointer::lambda(
                Rc::clone(decl),
                self.env.current_scope(),
            ))),
            ExprKind::AddressOf(target) => self.eval_address_of(target),
            ExprKind::Is { value, type_name } => self.eval_is(value, type_name),
            ExprKind::As { value, type_name } => self.eval_as(value, type_name),
            ExprKind::Implements { value, interface } => self.eval_implements(value, interface),
            ExprKind::ArrayLiteral(items) => self.eval_array_literal(items),
            ExprKind::SetLiteral(elements) => self.eval_set_literal(elements),
            ExprKind::RecordLiteral { type_name, fields } => {
                self.eval_record_literal(type_name.as_ref(), fields)
            }
            ExprKind::Inherited { method, args } => {
                self.eval_inherited(method.as_ref(), args.as_deref(), expr.pos)
            }
            ExprKind::IfExpr {
                cond,
                then_value,
                else_value,
            } => {
                if self.eval_condition(cond)? {
                    self.eval_expr(then_value)
                } else {
                    self.eval_expr(else_value)
                }
            }
        }
    }

    /// Evaluate a condition, which must be a Boolean.
    pub(crate) fn eval_condition(&mut self, expr: &Expr) -> EvalResult<bool> {
        let value = self.eval_expr(expr)?;
        match value.unboxed() {
            Value::Boolean(b) => Ok(*b),
            other => Err(at_pos(
                type_mismatch("Boolean", &other.type_name()).into(),
                expr.pos,
            )),
        }
    }

    // Identifiers

    /// The current `Self`, if a method is running.
    pub(crate) fn self_receiver(&self) -> Option<Value> {
        if self.methods.is_empty() {
            return None;
        }
        self.env
            .lookup(&self.names.self_)
            .filter(|v| !matches!(v, Value::Nil))
    }

    /// Resolve a bare name. Members of `Self` shadow globals but not locals
    /// or parameters.
    pub(crate) fn resolve_ident(&self, name: &Name) -> Resolved {
        let owner = self.env.owner_of(name);
        let global_or_unbound = match &owner {
            Some(scope) => scope.ptr_eq(&self.env.global()),
            None => true,
        };
        if global_or_unbound {
            if let Some(receiver) = self.self_receiver() {
                if self.has_self_member(&receiver, name) {
                    return Resolved::SelfMember(receiver);
                }
            }
        }
        let Some(scope) = owner else {
            return Resolved::Unbound;
        };
        let value = scope.borrow().lookup_local(name);
        value.map_or(Resolved::Unbound, Resolved::Variable)
    }

    fn has_self_member(&self, receiver: &Value, name: &Name) -> bool {
        let key = name.as_str();
        match receiver.unboxed() {
            Value::Object(obj) => {
                let class = obj.class();
                obj.has_field(key)
                    || class.find_property(key).is_some()
                    || class.has_method(key)
                    || class.class_var_owner(key).is_some()
                    || class.find_constant(key).is_some()
                    || is_intrinsic_member(key)
                    || self.helper_has_member(receiver, key)
            }
            Value::ClassRef(class) => {
                class.has_method(key)
                    || class.class_var_owner(key).is_some()
                    || class.find_constant(key).is_some()
                    || class.find_property(key).is_some_and(|p| p.is_class)
                    || name.matches("ClassName")
            }
            Value::Record(record) => {
                let ty = record.ty();
                record.has_field(key)
                    || ty.properties.contains_key(key)
                    || ty.methods.contains_key(key)
                    || ty.constants.contains_key(key)
            }
            other => self.helper_has_member(other, key),
        }
    }

    /// Whether `Name(...)` inside a method calls a member of `receiver`.
    pub(crate) fn self_member_callable(&self, receiver: &Value, name: &Name) -> bool {
        let key = name.as_str();
        match receiver.unboxed() {
            Value::Object(obj) => {
                obj.class().has_method(key)
                    || matches!(obj.get_field(key), Some(Value::Function(_)))
                    || obj
                        .class()
                        .find_property(key)
                        .is_some_and(|p| !p.index_params.is_empty())
                    || is_intrinsic_member(key)
                    || self.helper_has_member(receiver, key)
            }
            Value::ClassRef(class) => class.has_method(key),
            Value::Record(record) => {
                !record.ty().find_methods(key).is_empty()
                    || matches!(record.get(key), Some(Value::Function(_)))
            }
            other => self.helper_has_member(other, key),
        }
    }

    fn helper_has_member(&self, value: &Value, name: &str) -> bool {
        helper_keys(value).iter().any(|key| {
            self.types
                .helpers_for(key)
                .any(|h| h.methods.contains_key(name) || h.properties.contains_key(name))
        })
    }

    fn eval_ident(&mut self, name: &Name, pos: Pos) -> EvalResult {
        match self.resolve_ident(name) {
            Resolved::Variable(value) => {
                if let Value::Function(pointer) = &value {
                    // A nested function named without parentheses is a call.
                    if is_nested_binding(pointer, name) {
                        let pointer = pointer.clone();
                        return self.call_pointer(&pointer, CallArgs::empty(), pos);
                    }
                }
                self.deref_value(value)
            }
            Resolved::SelfMember(receiver) => {
                let access = MemberAccess {
                    checked: false,
                    write_back: true,
                };
                self.read_member(receiver, name, pos, access)
            }
            Resolved::Unbound => self.eval_unbound(name, pos),
        }
    }

    /// A name with no variable binding: an enum member, a function called
    /// without arguments, or a type.
    fn eval_unbound(&mut self, name: &Name, pos: Pos) -> EvalResult {
        if let Some(value) = self.types.enum_member(name.as_str()) {
            return Ok(value);
        }
        let key = name.as_str();
        if self.functions.contains_key(key)
            || self.builtins.get(key).is_some()
            || self.externals.contains_key(key)
        {
            return self.call_named(name, CallArgs::empty(), pos);
        }
        if let Some(class) = self.types.class(key) {
            return Ok(Value::ClassRef(class));
        }
        if let Some(meta) = self.types.resolve(&TypeRef::Named(name.clone())) {
            return Ok(Value::Type(meta));
        }
        Err(undefined_variable(key).into())
    }

    /// Follow references and force lazy arguments.
    pub(crate) fn deref_value(&mut self, value: Value) -> EvalResult {
        match value {
            Value::Reference(reference) => {
                let target = reference
                    .get()
                    .ok_or_else(|| undefined_variable(&reference.describe()))?;
                self.deref_value(target)
            }
            Value::Lazy(thunk) => self.force_thunk(&thunk),
            other => Ok(other),
        }
    }

    fn force_thunk(&mut self, thunk: &Thunk) -> EvalResult {
        if let Some(value) = thunk.cached() {
            return Ok(value);
        }
        let value = {
            let mut scoped = self.scoped_in(thunk.scope().clone());
            scoped.eval_expr(thunk.expr())?
        };
        thunk.store(value.clone());
        Ok(value)
    }

    // Operators

    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> EvalResult {
        let lhs = self.eval_expr(left)?;
        if let Some(result) = short_circuit(op, &lhs) {
            return Ok(result);
        }
        let rhs = self.eval_expr(right)?;
        if op == BinaryOp::Coalesce {
            return Ok(rhs);
        }
        self.binary_values(op, lhs, rhs)
    }

    /// Apply a binary operator to evaluated operands, consulting operator
    /// overloads for records, objects and operand types the built-in
    /// semantics reject.
    pub(crate) fn binary_values(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> EvalResult {
        let user_typed = |v: &Value| {
            matches!(
                v.unboxed(),
                Value::Record(_) | Value::Object(_) | Value::Interface(_)
            )
        };
        if user_typed(&lhs) || user_typed(&rhs) {
            if let Some(target) = self.find_overload(op, &lhs, &rhs) {
                return self.call_overload(target, lhs, rhs);
            }
            return Ok(operators::binary(op, &lhs, &rhs)?);
        }
        match operators::binary(op, &lhs, &rhs) {
            Ok(value) => Ok(value),
            Err(err) if operators::is_operand_error(&err) => {
                match self.types.find_operator(op, &[&lhs, &rhs]) {
                    Some(entry) => {
                        let uses = entry.uses.clone();
                        self.call_overload(OverloadTarget::Global(uses), lhs, rhs)
                    }
                    None => Err(err.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    fn find_overload(&self, op: BinaryOp, lhs: &Value, rhs: &Value) -> Option<OverloadTarget> {
        let operands = [lhs, rhs];
        for operand in operands {
            match operand.unboxed() {
                Value::Record(record) => {
                    let ty = record.ty();
                    if let Some(entry) =
                        ty.operators.iter().find(|e| e.is_binary(op) && e.accepts(&operands))
                    {
                        return Some(OverloadTarget::Record(Rc::clone(ty), entry.uses.clone()));
                    }
                }
                Value::Object(obj) => {
                    let class = obj.class();
                    if let Some(entry) = class
                        .all_operators()
                        .into_iter()
                        .find(|e| e.is_binary(op) && e.accepts(&operands))
                    {
                        return Some(OverloadTarget::Class(Rc::clone(class), entry.uses.clone()));
                    }
                }
                _ => {}
            }
        }
        self.types
            .find_operator(op, &operands)
            .map(|entry| OverloadTarget::Global(entry.uses.clone()))
    }

    fn call_overload(&mut self, target: OverloadTarget, lhs: Value, rhs: Value) -> EvalResult {
        let args = CallArgs::Values(vec![lhs, rhs]);
        match target {
            OverloadTarget::Global(name) => self.call_named(&name, args, Pos::NONE),
            OverloadTarget::Record(ty, name) => self.call_record_static(ty, &name, args, Pos::NONE),
            OverloadTarget::Class(class, name) => {
                self.call_class_method(class, &name, args, Pos::NONE)
            }
        }
    }

    // Calls and indexing

    fn eval_call(&mut self, callee: &Expr, args: &[Expr], pos: Pos) -> EvalResult {
        match &callee.kind {
            ExprKind::Ident(name) => self.call_ident(name, args, pos),
            ExprKind::Member { object, member } => self.call_member(object, member, args, pos),
            ExprKind::Inherited { method, args: None } => {
                self.eval_inherited(method.as_ref(), Some(args), pos)
            }
            _ => {
                let value = self.eval_expr(callee)?;
                match value.unboxed() {
                    Value::Function(pointer) => {
                        let pointer = pointer.clone();
                        self.call_pointer(&pointer, CallArgs::Exprs(args), pos)
                    }
                    other => Err(not_callable(&other.type_name()).into()),
                }
            }
        }
    }

    fn eval_index(&mut self, object: &Expr, indices: &[Expr], pos: Pos) -> EvalResult {
        let mut value = self.eval_expr(object)?;
        for (position, index) in indices.iter().enumerate() {
            if has_default_property(&value) {
                // `obj[i, j]` passes every remaining index to the property.
                let rest = indices[position..]
                    .iter()
                    .map(|e| self.eval_expr(e))
                    .collect::<EvalResult<Vec<_>>>()?;
                return self.read_default_property(value, rest, pos);
            }
            let index = self.eval_expr(index)?;
            value = self.index_value(value, index, pos)?;
        }
        Ok(value)
    }

    /// `base[index]` for arrays and strings (1-based characters).
    pub(crate) fn index_value(&mut self, base: Value, index: Value, pos: Pos) -> EvalResult {
        match base.unboxed() {
            Value::Array(array) => {
                let i = index_ordinal(&index)?;
                let slot = array
                    .slot_of(i)
                    .ok_or_else(|| index_out_of_bounds(i, array.low(), array.high()))?;
                Ok(array.get(slot).unwrap_or(Value::Nil))
            }
            Value::String(s) => {
                let i = index_ordinal(&index)?;
                Ok(Value::String(string_char(s, i)?.to_string()))
            }
            Value::Object(_) | Value::Interface(_) | Value::Record(_) => {
                self.read_default_property(base.clone(), vec![index], pos)
            }
            other => Err(type_mismatch("array", &other.type_name()).into()),
        }
    }

    // Type tests

    fn eval_is(&mut self, value: &Expr, type_name: &Name) -> EvalResult {
        let value = self.eval_expr(value)?;
        let class = self.types.class(type_name.as_str());
        let iface = self.types.interface(type_name.as_str());
        if class.is_none() && iface.is_none() {
            return Err(undefined_type(type_name.as_str()).into());
        }
        let Some(object) = value.as_object() else {
            return Ok(Value::Boolean(false));
        };
        let result = match (class, iface) {
            (Some(class), _) => object.class().is_descendant_of(&class),
            (None, Some(iface)) => object.class().satisfies(&iface),
            (None, None) => false,
        };
        Ok(Value::Boolean(result))
    }

    fn eval_as(&mut self, value: &Expr, type_name: &Name) -> EvalResult {
        let value = self.eval_expr(value)?;
        if let Some(class) = self.types.class(type_name.as_str()) {
            if value.is_nil() {
                return Ok(Value::Nil);
            }
            return match value.as_object() {
                Some(object) if object.class().is_descendant_of(&class) => {
                    Ok(Value::Object(object.clone()))
                }
                _ => Err(invalid_cast(&value.type_name(), class.name.as_str()).into()),
            };
        }
        if let Some(iface) = self.types.interface(type_name.as_str()) {
            let meta = TypeMeta::Interface(Rc::clone(&iface));
            return convert_builtin(&value, &meta)
                .ok_or_else(|| invalid_cast(&value.type_name(), iface.name.as_str()).into());
        }
        Err(undefined_type(type_name.as_str()).into())
    }

    fn eval_implements(&mut self, value: &Expr, interface: &Name) -> EvalResult {
        let value = self.eval_expr(value)?;
        let iface = self
            .types
            .interface(interface.as_str())
            .ok_or_else(|| undefined_type(interface.as_str()))?;
        let class = match value.unboxed() {
            Value::ClassRef(class) => Some(Rc::clone(class)),
            other => other.as_object().map(|o| Rc::clone(o.class())),
        };
        Ok(Value::Boolean(class.is_some_and(|c| c.satisfies(&iface))))
    }

    // Literals

    fn eval_array_literal(&mut self, items: &[Expr]) -> EvalResult {
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            let value = self.eval_expr(item)?.copy_for_store();
            self.retain(&value);
            values.push(value);
        }
        let element = common_element_type(&values);
        let array = Value::Array(ArrayValue::dynamic(element, values));
        if holds_interfaces(&array) {
            self.temporaries.push(array.clone());
        }
        Ok(array)
    }

    fn eval_set_literal(&mut self, elements: &[SetElement]) -> EvalResult {
        let mut ordinals = Vec::new();
        let mut domain = SetDomain::Ordinal;
        for element in elements {
            match element {
                SetElement::Single(expr) => {
                    let value = self.eval_expr(expr)?;
                    note_domain(&mut domain, &value);
                    ordinals.push(index_ordinal(&value)?);
                }
                SetElement::Range(low, high) => {
                    let low = self.eval_expr(low)?;
                    let high = self.eval_expr(high)?;
                    note_domain(&mut domain, &low);
                    let (lo, hi) = (index_ordinal(&low)?, index_ordinal(&high)?);
                    if hi.saturating_sub(lo) > MAX_SET_RANGE {
                        return Err(EvalError::new(format!("set range {lo}..{hi} is too large")).into());
                    }
                    match &domain {
                        SetDomain::Enum(ty) => {
                            ordinals.extend((lo..=hi).filter(|o| ty.name_of(*o).is_some()));
                        }
                        SetDomain::Ordinal => ordinals.extend(lo..=hi),
                    }
                }
            }
        }
        Ok(Value::Set(SetValue::from_ordinals(domain, ordinals)))
    }

    fn eval_record_literal(&mut self, type_name: Option<&Name>, fields: &[(Name, Expr)]) -> EvalResult {
        let Some(type_name) = type_name else {
            let ty = RecordType::anonymous(fields.iter().map(|(name, _)| name.as_str()));
            let mut values = CiMap::new();
            for (name, expr) in fields {
                let value = self.eval_expr(expr)?.copy_for_store();
                values.insert(name.clone(), value);
            }
            return Ok(Value::Record(RecordValue::new(Rc::new(ty), values)));
        };
        let ty = self
            .types
            .record(type_name.as_str())
            .ok_or_else(|| undefined_type(type_name.as_str()))?;
        let record = self.types.new_record(&ty);
        for (name, expr) in fields {
            let value = self.eval_expr(expr)?;
            let existing = record
                .get(name.as_str())
                .ok_or_else(|| undefined_member(name.as_str(), type_name.as_str()))?;
            let value = self.coerce_for_slot(&existing, value)?;
            record.set(name.as_str(), value);
        }
        Ok(Value::Record(record))
    }

    // Function pointers

    fn eval_address_of(&mut self, target: &Expr) -> EvalResult {
        match &target.kind {
            ExprKind::Ident(name) => {
                if let Some(value @ Value::Function(_)) = self.env.lookup(name) {
                    return Ok(value);
                }
                if let Some(receiver) = self.self_receiver() {
                    if let Some(pointer) = method_pointer(&receiver, name) {
                        return Ok(pointer);
                    }
                }
                let key = name.as_str();
                if let Some(first) = self.functions.get(key).and_then(|o| o.first()) {
                    return Ok(Value::Function(FunctionPointer::function(Rc::clone(first))));
                }
                if self.builtins.get(key).is_some() {
                    return Ok(Value::Function(FunctionPointer::builtin(name.clone())));
                }
                if self.externals.contains_key(key) {
                    return Ok(Value::Function(FunctionPointer::external(name.clone())));
                }
                Err(undefined_function(key).into())
            }
            ExprKind::Member { object, member } => {
                let receiver = self.eval_expr(object)?;
                method_pointer(&receiver, member)
                    .ok_or_else(|| undefined_member(member.as_str(), &receiver.type_name()).into())
            }
            _ => self.eval_expr(target),
        }
    }

    /// `inherited` / `inherited Name(args)`: call the parent class's
    /// implementation on the current `Self`.
    fn eval_inherited(&mut self, method: Option<&Name>, args: Option<&[Expr]>, pos: Pos) -> EvalResult {
        let context = self
            .methods
            .last()
            .cloned()
            .ok_or_else(|| EvalError::new("'inherited' used outside a method"))?;
        let owner = context
            .owner
            .ok_or_else(|| EvalError::new("'inherited' used outside a class method"))?;
        let Some(parent) = owner.parent.clone() else {
            return Ok(Value::Nil);
        };
        let name = method.cloned().unwrap_or_else(|| context.decl.name.clone());
        let receiver = self
            .env
            .lookup(&self.names.self_)
            .ok_or_else(|| undefined_variable("Self"))?;
        let methods = parent.find_methods(name.as_str());
        if methods.is_empty() {
            // Bare `inherited` with nothing above is a no-op.
            if method.is_none() {
                return Ok(Value::Nil);
            }
            return Err(undefined_member(name.as_str(), parent.name.as_str()).into());
        }
        let args = match (args, method) {
            (Some(args), _) => CallArgs::Exprs(args),
            (None, None) => {
                // Forward the running method's own parameters, references
                // included, so `var` parameters stay by reference.
                let mut values = Vec::with_capacity(context.decl.params.len());
                for param in &context.decl.params {
                    values.push(self.env.lookup(&param.name).unwrap_or(Value::Nil));
                }
                CallArgs::Values(values)
            }
            (None, Some(_)) => CallArgs::empty(),
        };
        let decls: Vec<_> = methods.iter().map(|m| Rc::clone(&m.decl)).collect();
        let (index, bound) = self.resolve_call(name.as_str(), &decls, args)?;
        let chosen = &methods[index];
        let is_constructor = chosen.decl.is_constructor();
        let invocation =
            Invocation::method(Rc::clone(&chosen.decl), receiver.clone(), Rc::clone(&chosen.owner));
        let result = self.invoke(invocation, bound, pos)?;
        Ok(if is_constructor { receiver } else { result })
    }
}

/// Value of `op` decided by the left operand alone.
fn short_circuit(op: BinaryOp, lhs: &Value) -> Option<Value> {
    match (op, lhs.unboxed()) {
        (BinaryOp::And, Value::Boolean(false)) => Some(Value::Boolean(false)),
        (BinaryOp::Or, Value::Boolean(true)) => Some(Value::Boolean(true)),
        (BinaryOp::Implies, Value::Boolean(false)) => Some(Value::Boolean(true)),
        (BinaryOp::Coalesce, _) if !lhs.is_nil() && !lhs.is_unassigned() => Some(lhs.clone()),
        _ => None,
    }
}

/// Members every object answers without a declaration.
fn is_intrinsic_member(name: &str) -> bool {
    ["ClassName", "ClassType", "Free"]
        .iter()
        .any(|m| m.eq_ignore_ascii_case(name))
}

fn is_nested_binding(pointer: &FunctionPointer, name: &Name) -> bool {
    pointer.closure.is_none()
        && matches!(&pointer.target, dws_runtime::CallTarget::Function(d) if d.name == *name)
}

/// Helper lookup keys for `value`: its own type, then ancestors for objects.
pub(crate) fn helper_keys(value: &Value) -> Vec<String> {
    match value.as_object() {
        Some(object) => object
            .class()
            .ancestry()
            .iter()
            .map(|c| c.name.key().to_string())
            .collect(),
        None => vec![value.unboxed().type_key()],
    }
}

pub(crate) fn has_default_property(value: &Value) -> bool {
    match value.unboxed() {
        Value::Record(record) => record.ty().properties.values().any(|p| p.is_default),
        other => other
            .as_object()
            .is_some_and(|o| o.class().default_property().is_some()),
    }
}

pub(crate) fn index_ordinal(value: &Value) -> Result<i64, EvalError> {
    ordinal_value(value.unboxed()).ok_or_else(|| type_mismatch("Integer", &value.type_name()))
}

/// Character `index` (1-based) of `s`.
pub(crate) fn string_char(s: &str, index: i64) -> Result<char, EvalError> {
    let len = i64::try_from(s.chars().count()).unwrap_or(i64::MAX);
    usize::try_from(index - 1)
        .ok()
        .and_then(|i| s.chars().nth(i))
        .ok_or_else(|| index_out_of_bounds(index, 1, len))
}

fn note_domain(domain: &mut SetDomain, value: &Value) {
    if let (SetDomain::Ordinal, Value::Enum(e)) = (&*domain, value.unboxed()) {
        *domain = SetDomain::Enum(Rc::clone(&e.ty));
    }
}

/// Element type of an array literal: the shared type of its items, `Float`
/// for mixed numbers, `Variant` otherwise.
fn common_element_type(values: &[Value]) -> TypeRef {
    let mut names = values.iter().map(|v| v.unboxed().type_name());
    let Some(first) = names.next() else {
        return TypeRef::named("Variant");
    };
    if values.iter().any(|v| matches!(v.unboxed(), Value::Array(_))) {
        return TypeRef::named("Variant");
    }
    if names.all(|n| n == first) {
        return TypeRef::Named(Name::new(&first));
    }
    if values
        .iter()
        .all(|v| matches!(v.unboxed(), Value::Integer(_) | Value::Float(_)))
    {
        return TypeRef::named("Float");
    }
    TypeRef::named("Variant")
}

/// `@receiver.Name` for objects, class references and records.
fn method_pointer(receiver: &Value, name: &Name) -> Option<Value> {
    let (decl, bound) = match receiver.unboxed() {
        Value::ClassRef(class) => (
            class.find_methods(name.as_str()).into_iter().next()?.decl,
            receiver.clone(),
        ),
        Value::Record(record) => (
            Rc::clone(record.ty().find_methods(name.as_str()).first()?),
            receiver.clone(),
        ),
        other => {
            let object = other.as_object()?;
            let method = object.class().find_methods(name.as_str()).into_iter().next()?;
            (method.decl, Value::Object(object.clone()))
        }
    };
    Some(Value::Function(FunctionPointer::method(decl, bound)))
}
