//! The call protocol.
//!
//! A call goes through three steps:
//!
//! 1. `resolve_call` picks an overload by arity, then by how well the
//!    argument types match (exact matches beat implicit conversions, ties
//!    go to the first declared). Arguments that every candidate takes as
//!    `lazy`, `var` or `out` are not evaluated to make that choice.
//! 2. `bind_args` turns argument expressions into values: `var`/`out`
//!    arguments become references, `lazy` arguments become thunks, missing
//!    trailing arguments take their defaults.
//! 3. `invoke` pushes a call-stack frame and a scope, binds `Self`, the
//!    parameters, `Result` and nested functions, runs the body, and
//!    releases what the frame owned.

use std::rc::Rc;

use dws_ir::{Expr, ExprKind, FunctionDecl, Name, Param, ParamMode, Pos, TypeRef};
use dws_runtime::convert::convert_builtin;
use dws_runtime::errors::{
    abstract_method_called, invalid_cast, no_matching_overload, undefined_function,
    wrong_arg_count,
};
use dws_runtime::{
    CallTarget, ClassInfo, ControlAction, EvalResult, FunctionPointer, LocalScope, Mutability,
    ReferenceValue, Scope, Thunk, TypeMeta, Value,
};
use smallvec::SmallVec;

use super::expr::Resolved;
use super::refcount::holds_interfaces;
use super::MemberAccess;
use crate::diagnostics::CallFrame;
use crate::interpreter::{Interpreter, MethodContext};
use crate::stack::ensure_sufficient_stack;

/// Argument values bound to a declaration's parameters, in order.
pub(crate) type BoundArgs = SmallVec<[Value; 4]>;

/// Arguments of a call before binding.
#[derive(Clone)]
pub(crate) enum CallArgs<'a> {
    /// Unevaluated argument expressions from the call site.
    Exprs(&'a [Expr]),
    /// Values supplied by the host, a built-in or a property accessor.
    Values(Vec<Value>),
    /// Expressions evaluated once to pick an overload. Positions left `None`
    /// were never evaluated; `var` and `lazy` parameters bind to the
    /// expressions either way.
    Scored(&'a [Expr], Vec<Option<Value>>),
}

impl CallArgs<'_> {
    pub(crate) fn len(&self) -> usize {
        match self {
            CallArgs::Exprs(exprs) | CallArgs::Scored(exprs, _) => exprs.len(),
            CallArgs::Values(values) => values.len(),
        }
    }

    pub(crate) fn empty() -> Self {
        CallArgs::Values(Vec::new())
    }
}

/// A resolved callee with its receiver and captured scope.
pub(crate) struct Invocation {
    pub decl: Rc<FunctionDecl>,
    /// Bound as `Self`: an object, a class reference or a record copy.
    pub receiver: Option<Value>,
    /// Class declaring the method, for `inherited`.
    pub owner: Option<Rc<ClassInfo>>,
    /// Captured scope of a lambda.
    pub closure: Option<LocalScope<Scope>>,
}

impl Invocation {
    pub(crate) fn function(decl: Rc<FunctionDecl>) -> Self {
        Invocation {
            decl,
            receiver: None,
            owner: None,
            closure: None,
        }
    }

    pub(crate) fn method(decl: Rc<FunctionDecl>, receiver: Value, owner: Rc<ClassInfo>) -> Self {
        Invocation {
            decl,
            receiver: Some(receiver),
            owner: Some(owner),
            closure: None,
        }
    }

    fn frame_name(&self) -> String {
        let name = if self.decl.name.as_str().is_empty() {
            "<lambda>"
        } else {
            self.decl.name.as_str()
        };
        match (&self.owner, &self.receiver) {
            (Some(owner), _) => format!("{}.{name}", owner.name),
            (None, Some(Value::Record(record))) => format!("{}.{name}", record.type_name()),
            _ => name.to_string(),
        }
    }
}

impl Interpreter {
    /// Evaluate arguments for callees that take plain values.
    pub(crate) fn eval_args(&mut self, args: CallArgs<'_>) -> EvalResult<Vec<Value>> {
        match args {
            CallArgs::Exprs(exprs) => exprs.iter().map(|e| self.eval_expr(e)).collect(),
            CallArgs::Scored(exprs, values) => exprs
                .iter()
                .zip(values)
                .map(|(expr, value)| match value {
                    Some(value) => Ok(value),
                    None => self.eval_expr(expr),
                })
                .collect(),
            CallArgs::Values(values) => Ok(values),
        }
    }

    /// Call a global function, built-in or host function by name.
    pub(crate) fn call_named(&mut self, name: &Name, args: CallArgs<'_>, pos: Pos) -> EvalResult {
        if let Some(overloads) = self.functions.get(name.as_str()).cloned() {
            let (index, bound) = self.resolve_call(name.as_str(), &overloads, args)?;
            return self.invoke(Invocation::function(Rc::clone(&overloads[index])), bound, pos);
        }
        if self.builtins.get(name.as_str()).is_some() {
            let values = self.eval_args(args)?;
            return self.call_builtin(name, &values);
        }
        if self.externals.contains_key(name.as_str()) {
            return self.call_external(name, args, pos);
        }
        Err(undefined_function(name.as_str()).into())
    }

    pub(crate) fn call_builtin(&mut self, name: &Name, values: &[Value]) -> EvalResult {
        match self.builtins.get(name.as_str()) {
            Some(function) => function(self, values),
            None => Err(undefined_function(name.as_str()).into()),
        }
    }

    /// Call `name(args)` written as a bare identifier call.
    ///
    /// Lookup order: a callable variable, a method of `Self`, global
    /// functions, built-ins taking `var` arguments, built-ins, host
    /// functions, and finally a type cast `T(x)`.
    pub(crate) fn call_ident(&mut self, name: &Name, args: &[Expr], pos: Pos) -> EvalResult {
        let receiver = match self.resolve_ident(name) {
            Resolved::Variable(raw) => {
                let value = self.deref_value(raw)?;
                if let Value::Function(pointer) = value.unboxed() {
                    let pointer = pointer.clone();
                    return self.call_pointer(&pointer, CallArgs::Exprs(args), pos);
                }
                // Inside a method, `Name(...)` still calls the method when
                // `Name` is bound to the method's result alias.
                self.self_receiver()
            }
            Resolved::SelfMember(receiver) => Some(receiver),
            Resolved::Unbound => None,
        };
        if let Some(receiver) = receiver.filter(|r| self.self_member_callable(r, name)) {
            let access = MemberAccess {
                checked: false,
                write_back: true,
            };
            return self.call_method(receiver, name, CallArgs::Exprs(args), pos, access);
        }
        if let Some(overloads) = self.functions.get(name.as_str()).cloned() {
            let (index, bound) = self.resolve_call(name.as_str(), &overloads, CallArgs::Exprs(args))?;
            return self.invoke(Invocation::function(Rc::clone(&overloads[index])), bound, pos);
        }
        if let Some(function) = self.builtins.var_arg(name.as_str()) {
            return function(self, args);
        }
        if let Some(function) = self.builtins.get(name.as_str()) {
            let values = self.eval_args(CallArgs::Exprs(args))?;
            return function(self, &values);
        }
        if self.externals.contains_key(name.as_str()) {
            return self.call_external(name, CallArgs::Exprs(args), pos);
        }
        if let [arg] = args {
            if let Some(meta) = self.types.resolve(&TypeRef::Named(name.clone())) {
                let value = self.eval_expr(arg)?;
                return self.cast_value(value, &meta);
            }
        }
        Err(undefined_function(name.as_str()).into())
    }

    /// Invoke a function pointer.
    pub(crate) fn call_pointer(
        &mut self,
        pointer: &FunctionPointer,
        args: CallArgs<'_>,
        pos: Pos,
    ) -> EvalResult {
        match &pointer.target {
            CallTarget::Function(decl) | CallTarget::Lambda(decl) => {
                let bound = self.bind_args(decl, args)?;
                let receiver = pointer.receiver.as_deref().cloned();
                let owner = receiver.as_ref().and_then(|r| method_owner(r, decl));
                let invocation = Invocation {
                    decl: Rc::clone(decl),
                    receiver,
                    owner,
                    closure: pointer.closure.clone(),
                };
                self.invoke(invocation, bound, pos)
            }
            CallTarget::Builtin(name) => {
                let values = self.eval_args(args)?;
                self.call_builtin(name, &values)
            }
            CallTarget::External(name) => self.call_external(name, args, pos),
        }
    }

    /// Explicit cast `T(value)`.
    pub(crate) fn cast_value(&mut self, value: Value, meta: &TypeMeta) -> EvalResult {
        let ordinal = dws_runtime::convert::ordinal_value(value.unboxed());
        let cast = match (meta, value.unboxed()) {
            (TypeMeta::Integer, Value::Float(_)) => None,
            (TypeMeta::Integer, _) => ordinal.map(Value::Integer),
            (TypeMeta::Boolean, Value::Integer(_) | Value::Enum(_)) => {
                ordinal.map(|o| Value::Boolean(o != 0))
            }
            (TypeMeta::Enum(ty), Value::Integer(_) | Value::Enum(_) | Value::Boolean(_)) => {
                ordinal.map(|o| dws_runtime::convert::enum_from_ordinal(ty, o))
            }
            (TypeMeta::String, Value::Integer(_) | Value::Float(_) | Value::Boolean(_)) => {
                Some(Value::string(value.to_string()))
            }
            (TypeMeta::Class(class), Value::Object(obj)) => obj
                .class()
                .is_descendant_of(class)
                .then(|| Value::Object(obj.clone())),
            _ => convert_builtin(&value, meta),
        };
        match cast {
            Some(value) => Ok(value),
            None => Err(invalid_cast(&value.type_name(), &meta.name()).into()),
        }
    }

    /// Pick an overload and bind the arguments to it.
    pub(crate) fn resolve_call(
        &mut self,
        name: &str,
        candidates: &[Rc<FunctionDecl>],
        args: CallArgs<'_>,
    ) -> EvalResult<(usize, BoundArgs)> {
        let count = args.len();
        let fitting: SmallVec<[usize; 4]> = candidates
            .iter()
            .enumerate()
            .filter(|(_, d)| d.required_params() <= count && count <= d.params.len())
            .map(|(i, _)| i)
            .collect();
        let (index, args) = match fitting.as_slice() {
            [] => {
                return Err(match candidates {
                    [only] => wrong_arg_count(name, only.required_params(), only.params.len(), count),
                    _ => no_matching_overload(name),
                }
                .into());
            }
            [only] => (*only, args),
            _ => match args {
                CallArgs::Exprs(exprs) => {
                    let values = self.eval_scored_args(candidates, &fitting, exprs, None)?;
                    let index = self.pick_overload(name, candidates, &fitting, exprs, &values)?;
                    (index, CallArgs::Scored(exprs, values))
                }
                CallArgs::Scored(exprs, given) => {
                    let values = self.eval_scored_args(candidates, &fitting, exprs, Some(given))?;
                    let index = self.pick_overload(name, candidates, &fitting, exprs, &values)?;
                    (index, CallArgs::Scored(exprs, values))
                }
                CallArgs::Values(values) => {
                    let scored: Vec<Option<Value>> = values.iter().cloned().map(Some).collect();
                    let index = self
                        .best_overload(candidates, &fitting, &scored)
                        .ok_or_else(|| no_matching_overload(name))?;
                    (index, CallArgs::Values(values))
                }
            },
        };
        let bound = self.bind_args(&candidates[index], args)?;
        Ok((index, bound))
    }

    /// Evaluate the argument positions some fitting overload takes by value.
    /// Positions that are `lazy`, `var` or `out` in every fitting overload
    /// stay `None`, so overload selection never runs them.
    fn eval_scored_args(
        &mut self,
        candidates: &[Rc<FunctionDecl>],
        fitting: &[usize],
        exprs: &[Expr],
        given: Option<Vec<Option<Value>>>,
    ) -> EvalResult<Vec<Option<Value>>> {
        let mut given = given.map(Vec::into_iter);
        let mut values = Vec::with_capacity(exprs.len());
        for (position, expr) in exprs.iter().enumerate() {
            let known = given.as_mut().and_then(Iterator::next).flatten();
            let by_value = fitting.iter().any(|&index| {
                candidates[index]
                    .params
                    .get(position)
                    .is_some_and(|param| matches!(param.mode, ParamMode::Value | ParamMode::Const))
            });
            let value = match known {
                Some(value) => Some(value),
                None if by_value => Some(self.eval_expr(expr)?),
                None => None,
            };
            values.push(value);
        }
        Ok(values)
    }

    /// Best fitting overload. Unevaluated positions are scored from what
    /// can be read without running code: literals and plain variables.
    fn pick_overload(
        &self,
        name: &str,
        candidates: &[Rc<FunctionDecl>],
        fitting: &[usize],
        exprs: &[Expr],
        values: &[Option<Value>],
    ) -> EvalResult<usize> {
        let scored: Vec<Option<Value>> = exprs
            .iter()
            .zip(values)
            .map(|(expr, value)| match value {
                Some(value) => Some(value.clone()),
                None => self.peek_arg(expr),
            })
            .collect();
        self.best_overload(candidates, fitting, &scored)
            .ok_or_else(|| no_matching_overload(name).into())
    }

    /// The value of `expr` when reading it has no side effects.
    fn peek_arg(&self, expr: &Expr) -> Option<Value> {
        match &expr.kind {
            ExprKind::Integer(i) => Some(Value::Integer(*i)),
            ExprKind::Float(f) => Some(Value::Float(*f)),
            ExprKind::String(s) => Some(Value::string(s.clone())),
            ExprKind::Boolean(b) => Some(Value::Boolean(*b)),
            ExprKind::Ident(name) => match self.resolve_ident(name) {
                Resolved::Variable(
                    Value::Function(_) | Value::Lazy(_) | Value::Reference(_),
                ) => None,
                Resolved::Variable(value) => Some(value),
                Resolved::SelfMember(_) | Resolved::Unbound => None,
            },
            _ => None,
        }
    }

    fn best_overload(
        &self,
        candidates: &[Rc<FunctionDecl>],
        fitting: &[usize],
        values: &[Option<Value>],
    ) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for &index in fitting {
            let Some(score) = self.overload_score(&candidates[index], values) else {
                continue;
            };
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, index));
            }
        }
        best.map(|(_, index)| index)
    }

    /// Number of exactly matching arguments, or `None` when some argument
    /// converts to neither the parameter type nor through a user conversion.
    /// Unknown arguments match nothing and rule nothing out.
    fn overload_score(&self, decl: &FunctionDecl, values: &[Option<Value>]) -> Option<usize> {
        let mut exact = 0;
        for (param, value) in decl.params.iter().zip(values) {
            let Some(value) = value else {
                continue;
            };
            let Some(meta) = self.types.resolve(&param.ty) else {
                continue;
            };
            if matches_exactly(value, &meta) {
                exact += 1;
                continue;
            }
            let convertible = convert_builtin(value, &meta).is_some()
                || !self
                    .types
                    .conversion_path(&value.type_key(), &meta.type_key())
                    .is_empty();
            if !convertible {
                return None;
            }
        }
        Some(exact)
    }

    /// Bind call arguments to `decl`'s parameters.
    pub(crate) fn bind_args(&mut self, decl: &FunctionDecl, args: CallArgs<'_>) -> EvalResult<BoundArgs> {
        let count = args.len();
        if count < decl.required_params() || count > decl.params.len() {
            return Err(wrong_arg_count(
                decl.name.as_str(),
                decl.required_params(),
                decl.params.len(),
                count,
            )
            .into());
        }
        let mut bound = BoundArgs::with_capacity(decl.params.len());
        match args {
            CallArgs::Exprs(exprs) => {
                for (index, (param, expr)) in decl.params.iter().zip(exprs).enumerate() {
                    let value = self.bind_expr_arg(decl, index, param, expr, None)?;
                    bound.push(value);
                }
            }
            CallArgs::Scored(exprs, values) => {
                let pairs = decl.params.iter().zip(exprs).zip(values);
                for (index, ((param, expr), value)) in pairs.enumerate() {
                    let value = self.bind_expr_arg(decl, index, param, expr, value)?;
                    bound.push(value);
                }
            }
            CallArgs::Values(values) => bound.extend(values),
        }
        for param in &decl.params[count..] {
            let Some(default) = &param.default else {
                return Err(wrong_arg_count(
                    decl.name.as_str(),
                    decl.required_params(),
                    decl.params.len(),
                    count,
                )
                .into());
            };
            let value = self.eval_expr(default)?;
            bound.push(value);
        }
        Ok(bound)
    }

    fn bind_expr_arg(
        &mut self,
        decl: &FunctionDecl,
        index: usize,
        param: &Param,
        expr: &Expr,
        evaluated: Option<Value>,
    ) -> EvalResult {
        match param.mode {
            ParamMode::Lazy => {
                let thunk = Thunk::new(expr.clone(), self.env.current_scope());
                if let Some(value) = evaluated {
                    thunk.store(value);
                }
                Ok(Value::Lazy(thunk))
            }
            ParamMode::Var | ParamMode::Out => {
                let reference = self.reference_to(expr, decl.name.as_str(), index)?;
                Ok(Value::Reference(reference))
            }
            ParamMode::Value | ParamMode::Const => match evaluated {
                Some(value) => Ok(value),
                None => self.eval_expr(expr),
            },
        }
    }

    /// Run a resolved callee with bound arguments.
    #[tracing::instrument(level = "debug", skip_all, fields(function = %inv.decl.name))]
    pub(crate) fn invoke(&mut self, inv: Invocation, args: BoundArgs, pos: Pos) -> EvalResult {
        let frame = inv.frame_name();
        if inv.decl.body.is_none() {
            if self.externals.contains_key(inv.decl.name.as_str()) {
                return self.call_external(&inv.decl.name.clone(), CallArgs::Values(args.into_vec()), pos);
            }
            if inv.decl.is_abstract() {
                return Err(abstract_method_called(&frame).into());
            }
            return Err(undefined_function(&frame).into());
        }
        if let Err(err) = self.call_stack.push(CallFrame {
            name: frame,
            call_pos: pos,
        }) {
            return Err(ControlAction::from(self.call_stack.attach_backtrace(err)));
        }
        let result = ensure_sufficient_stack(|| self.invoke_body(&inv, args));
        let result = result.map_err(|action| match action {
            ControlAction::Error(err) => ControlAction::Error(self.call_stack.attach_backtrace(err)),
            other => other,
        });
        self.call_stack.pop();
        result
    }

    fn invoke_body(&mut self, inv: &Invocation, args: BoundArgs) -> EvalResult {
        let parent = match &inv.closure {
            Some(scope) => scope.clone(),
            None => self.env.current_scope(),
        };
        let mut scoped = self.scoped_in(parent);
        scoped.methods.push(MethodContext {
            decl: Rc::clone(&inv.decl),
            owner: inv.owner.clone(),
        });
        let result = scoped.run_body(inv, args);
        scoped.methods.pop();
        result
    }

    fn run_body(&mut self, inv: &Invocation, args: BoundArgs) -> EvalResult {
        let decl = &inv.decl;
        for (param, arg) in decl.params.iter().zip(args) {
            if let Err(action) = self.bind_param(param, arg) {
                self.unwind_locals(&action);
                return Err(action);
            }
        }
        let self_name = self.names.self_.clone();
        match &inv.receiver {
            Some(receiver) => self.env.define(self_name, receiver.clone(), Mutability::Immutable),
            // A plain function runs in a scope enclosing its caller's; hide
            // the caller's `Self` so bare names do not resolve to its members.
            None if inv.closure.is_none() => {
                self.env.define(self_name, Value::Nil, Mutability::Immutable);
            }
            None => {}
        }
        self.bind_result(decl);
        for nested in &decl.nested {
            let pointer = FunctionPointer {
                target: CallTarget::Function(Rc::clone(nested)),
                closure: None,
                receiver: inv.receiver.clone().map(Box::new),
            };
            self.env
                .define(nested.name.clone(), Value::Function(pointer), Mutability::Immutable);
        }

        let body = decl.body.as_deref().unwrap_or_default();
        let outcome = match self.exec_stmts(body) {
            Ok(()) | Err(ControlAction::Exit) => Ok(()),
            Err(action) => Err(action),
        };
        if let Err(action) = outcome {
            self.unwind_locals(&action);
            return Err(action);
        }

        let result_name = self.names.result.clone();
        let result = if decl.has_result() {
            self.env.lookup(&result_name).unwrap_or(Value::Nil)
        } else {
            Value::Nil
        };
        self.release_locals(Some(&result_name))?;
        let result = match &decl.return_type {
            Some(ty) => self.coerce_to_type(result, ty)?,
            None => Value::Nil,
        };
        if holds_interfaces(&result) {
            self.temporaries.push(result.clone());
        }
        Ok(result)
    }

    fn bind_param(&mut self, param: &Param, arg: Value) -> EvalResult<()> {
        let value = match arg {
            value @ (Value::Reference(_) | Value::Lazy(_)) => value,
            value => {
                let value = self.coerce_to_type(value, &param.ty)?;
                self.retain(&value);
                value
            }
        };
        let mutability = if param.mode == ParamMode::Const {
            Mutability::Immutable
        } else {
            Mutability::Mutable
        };
        self.env.define(param.name.clone(), value, mutability);
        Ok(())
    }

    /// Bind `Result` and, for named functions, the function name as an
    /// alias of it.
    fn bind_result(&mut self, decl: &FunctionDecl) {
        let Some(ty) = &decl.return_type else {
            return;
        };
        let default = self.types.default_value(ty);
        let result_name = self.names.result.clone();
        self.env
            .define(result_name.clone(), default, Mutability::Mutable);
        if decl.name.as_str().is_empty() {
            return;
        }
        let scope = self.env.current_scope();
        let alias = ReferenceValue::variable(scope, result_name);
        self.env
            .define(decl.name.clone(), Value::Reference(alias), Mutability::Mutable);
    }
}

/// The value has exactly the parameter's type, no conversion needed.
fn matches_exactly(value: &Value, meta: &TypeMeta) -> bool {
    match (value.unboxed(), meta) {
        (Value::Object(obj), TypeMeta::Class(class)) => obj.class().id == class.id,
        (Value::Interface(iface), TypeMeta::Interface(info)) => iface.info.id == info.id,
        (_, TypeMeta::Variant) => matches!(value, Value::Variant(_)),
        (inner, meta) => inner.type_key() == meta.type_key(),
    }
}

/// Class declaring `decl` when `receiver` is an object or class reference.
fn method_owner(receiver: &Value, decl: &Rc<FunctionDecl>) -> Option<Rc<ClassInfo>> {
    let class = match receiver {
        Value::Object(obj) => Rc::clone(obj.class()),
        Value::ClassRef(class) => Rc::clone(class),
        _ => return None,
    };
    class.ancestry().into_iter().find(|c| {
        c.methods
            .get(decl.name.as_str())
            .is_some_and(|overloads| overloads.iter().any(|d| Rc::ptr_eq(d, decl)))
    })
}
