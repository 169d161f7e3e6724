//! `raise`, `try/except/finally` and the conversion of evaluation errors
//! into script exceptions.
//!
//! An evaluation error stays a plain `ControlAction::Error` until something
//! needs an exception object: an `except` clause testing it, a `finally`
//! block running while it is in flight, or the top level reporting it.

use std::rc::Rc;

use dws_ir::{ExceptClause, Expr, Name, Pos, Stmt};
use dws_runtime::errors::{bare_raise_outside_handler, internal_error, not_an_exception};
use dws_runtime::{
    class_names, ControlAction, EvalError, EvalErrorKind, EvalResult, ExceptionValue, Mutability,
    ObjectRef, Value,
};

use crate::interpreter::{Handling, Interpreter};

impl Interpreter {
    pub(crate) fn exec_raise(&mut self, value: Option<&Expr>, pos: Pos) -> EvalResult<()> {
        let Some(expr) = value else {
            // A `finally` block sees the in-flight exception but cannot
            // re-raise it.
            return match self.handling.iter().rev().find(|h| h.in_handler) {
                Some(handling) => {
                    let exc = &handling.exception;
                    tracing::debug!(class = exc.class_name(), "re-raise");
                    Err(ControlAction::Raise(Rc::clone(exc)))
                }
                None => Err(ControlAction::from(bare_raise_outside_handler().with_pos(pos))),
            };
        };
        let value = self.eval_expr(expr)?;
        if let Value::Exception(exc) = value.unboxed() {
            return Err(ControlAction::Raise(Rc::clone(exc)));
        }
        let object = match value.as_object() {
            Some(object) if object.class().is_descendant_of_name(class_names::EXCEPTION) => {
                object.clone()
            }
            _ => return Err(not_an_exception(&value.type_name()).into()),
        };
        let exc = ExceptionValue::new(object, self.call_stack.capture(), pos);
        tracing::debug!(class = exc.class_name(), message = %exc.message(), "raise");
        Err(ControlAction::Raise(Rc::new(exc)))
    }

    pub(crate) fn exec_try(
        &mut self,
        body: &[Stmt],
        except: Option<&ExceptClause>,
        finally: Option<&[Stmt]>,
    ) -> EvalResult<()> {
        let outcome = match (except, self.exec_stmts(body)) {
            (Some(clause), Err(action)) if action.is_catchable() => {
                self.handle_exception(action, clause)
            }
            (_, outcome) => outcome,
        };
        match finally {
            Some(stmts) => self.run_finally(stmts, outcome),
            None => outcome,
        }
    }

    /// Pick the first handler whose class matches, in declaration order.
    fn handle_exception(&mut self, action: ControlAction, clause: &ExceptClause) -> EvalResult<()> {
        let exc = match action {
            ControlAction::Raise(exc) => exc,
            ControlAction::Error(err) => self.exception_from_error(err)?,
            other => return Err(other),
        };
        for handler in &clause.handlers {
            if exc.is_instance_of(handler.class_name.as_str()) {
                tracing::debug!(class = exc.class_name(), handler = %handler.class_name, "caught");
                return self.run_handler(&exc, handler.var.as_ref(), |interp| {
                    interp.exec_stmt(&handler.body)
                });
            }
        }
        match &clause.else_branch {
            Some(stmts) => {
                tracing::debug!(class = exc.class_name(), "caught by else");
                self.run_handler(&exc, None, |interp| interp.exec_stmts(stmts))
            }
            None if clause.handlers.is_empty() => {
                tracing::debug!(class = exc.class_name(), "swallowed");
                Ok(())
            }
            None => Err(ControlAction::Raise(exc)),
        }
    }

    /// Run a handler body with `exc` as the exception being handled.
    fn run_handler(
        &mut self,
        exc: &Rc<ExceptionValue>,
        var: Option<&Name>,
        body: impl FnOnce(&mut Interpreter) -> EvalResult<()>,
    ) -> EvalResult<()> {
        self.handling.push(Handling {
            exception: Rc::clone(exc),
            in_handler: true,
        });
        let result = match var {
            Some(name) => {
                let mut scoped = self.scoped();
                scoped.env.define(
                    name.clone(),
                    Value::Object(exc.object.clone()),
                    Mutability::Immutable,
                );
                body(&mut *scoped)
            }
            None => body(self),
        };
        self.handling.pop();
        result
    }

    /// Run a `finally` block, then resume `outcome` unless the block itself
    /// left abnormally. Fatal errors skip it.
    fn run_finally(&mut self, stmts: &[Stmt], outcome: EvalResult<()>) -> EvalResult<()> {
        let outcome = match outcome {
            Err(ControlAction::Fatal(_)) => return outcome,
            Err(ControlAction::Error(err)) => Err(ControlAction::Raise(self.exception_from_error(err)?)),
            other => other,
        };
        let in_flight = match &outcome {
            Err(ControlAction::Raise(exc)) => Some(Rc::clone(exc)),
            _ => None,
        };
        if let Some(exc) = &in_flight {
            self.handling.push(Handling {
                exception: Rc::clone(exc),
                in_handler: false,
            });
        }
        let result = self.exec_stmts(stmts);
        if in_flight.is_some() {
            self.handling.pop();
        }
        match result {
            Ok(()) => outcome,
            Err(action) => {
                if let Some(exc) = in_flight {
                    tracing::warn!(class = exc.class_name(), "finally block replaced an in-flight exception");
                }
                Err(action)
            }
        }
    }

    /// Build the script exception an evaluation error turns into.
    pub(crate) fn exception_from_error(&mut self, err: EvalError) -> EvalResult<Rc<ExceptionValue>> {
        let class_name = err.kind.exception_class();
        let class = self.types.class(class_name).ok_or_else(|| {
            ControlAction::Fatal(internal_error(&format!(
                "exception class {class_name} is not declared"
            )))
        })?;
        let object = ObjectRef::new(Rc::clone(&class), self.types.new_object_fields(&class));
        object.set_field(self.names.message.as_str(), Value::string(err.message.clone()));
        if let EvalErrorKind::Host { host_class, .. } = &err.kind {
            object.set_field("ExceptionClass", Value::string(host_class.clone()));
        }
        let call_stack = match err.backtrace {
            Some(frames) => frames,
            None => self.call_stack.capture(),
        };
        let pos = err.pos.unwrap_or(Pos::NONE);
        tracing::debug!(class = class_name, message = %err.message, "error converted to exception");
        Ok(Rc::new(ExceptionValue::new(object, call_stack, pos)))
    }
}
