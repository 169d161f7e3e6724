//! The tree-walking interpreter.
//!
//! One `Interpreter` runs one program on one thread. It owns the scope
//! chain, the type registry, the declared functions, the built-in and host
//! function tables, the call stack and the output sink.
//!
//! Evaluation itself lives in `crate::exec`; this module holds the state and
//! the host-facing entry points.

mod builder;
mod declare;
mod known_names;
mod scope_guard;

#[cfg(test)]
mod tests;

use std::rc::Rc;

use dws_ir::{CiMap, Decl, Expr, FunctionDecl, Name, Pos, Program, Stmt};
use dws_runtime::{
    ClassInfo, ControlAction, Environment, EvalError, EvalResult, ExceptionReport,
    ExceptionValue, TypeRegistry, Value,
};
use thiserror::Error;

use crate::builtins::BuiltinRegistry;
use crate::config::InterpreterConfig;
use crate::diagnostics::CallStack;
use crate::exec::{holds_interfaces, CallArgs};
use crate::ffi::ExternalRegistry;
use crate::print_handler::SharedPrintHandler;

pub use builder::InterpreterBuilder;
pub(crate) use known_names::KnownNames;
pub use scope_guard::ScopedInterpreter;

/// Why a run stopped early.
#[derive(Debug, Error)]
pub enum RunError {
    /// A script exception reached the top level.
    #[error("{0}")]
    Unhandled(ExceptionReport),
    /// An error `try/except` cannot intercept (cancellation, bare `raise`
    /// outside a handler, internal failures).
    #[error("Fatal error: {0}")]
    Fatal(EvalError),
}

impl RunError {
    /// The unhandled exception, if that is why the run stopped.
    pub fn report(&self) -> Option<&ExceptionReport> {
        match self {
            RunError::Unhandled(report) => Some(report),
            RunError::Fatal(_) => None,
        }
    }
}

/// The method or function whose body is currently executing.
#[derive(Clone)]
pub(crate) struct MethodContext {
    pub decl: Rc<FunctionDecl>,
    /// Class declaring the running method; `inherited` looks up from its
    /// parent.
    pub owner: Option<Rc<ClassInfo>>,
}

/// An exception `ExceptObject` can see.
pub(crate) struct Handling {
    pub exception: Rc<ExceptionValue>,
    /// Entered through an `except` handler rather than a `finally` block.
    /// Only handlers accept a bare `raise`.
    pub in_handler: bool,
}

pub struct Interpreter {
    pub(crate) env: Environment,
    pub(crate) types: TypeRegistry,
    /// Global functions by name; overloads share one entry.
    pub(crate) functions: CiMap<Vec<Rc<FunctionDecl>>>,
    pub(crate) builtins: BuiltinRegistry,
    pub(crate) externals: ExternalRegistry,
    pub(crate) call_stack: CallStack,
    pub(crate) print_handler: SharedPrintHandler,
    pub(crate) config: InterpreterConfig,
    pub(crate) names: KnownNames,
    pub(crate) methods: Vec<MethodContext>,
    /// Exceptions being handled or unwinding through a `finally` block
    /// (innermost last). Feeds `ExceptObject` and bare `raise`.
    pub(crate) handling: Vec<Handling>,
    /// Interface values produced by calls and not yet stored anywhere.
    /// Released at the end of the statement that produced them.
    pub(crate) temporaries: Vec<Value>,
}

impl Interpreter {
    /// An interpreter with default configuration, printing to stdout.
    pub fn new() -> Self {
        InterpreterBuilder::new().build()
    }

    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::new()
    }

    /// Declare everything in `program`, then execute its main body.
    ///
    /// Global interface variables are released once the body completes, so
    /// destructors of objects still held by globals run before this returns.
    #[tracing::instrument(level = "debug", skip_all, fields(
        decls = program.decls.len(),
        stmts = program.body.len(),
    ))]
    pub fn run(&mut self, program: &Program) -> Result<(), RunError> {
        self.declare(&program.decls)?;
        self.execute(&program.body)?;
        let released = self.release_globals();
        self.finish(released)
    }

    /// Register declarations without running anything.
    pub fn declare(&mut self, decls: &[Decl]) -> Result<(), RunError> {
        let result = self.declare_all(decls);
        self.finish(result)
    }

    /// Execute statements in the global scope.
    pub fn execute(&mut self, stmts: &[Stmt]) -> Result<(), RunError> {
        let result = self.exec_stmts(stmts);
        self.finish(result)
    }

    /// Evaluate one expression in the global scope.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, RunError> {
        let mark = self.temporaries.len();
        let result = self.eval_expr(expr);
        let (value, outcome) = match result {
            Ok(value) => (value, Ok(())),
            Err(action) => (Value::Nil, Err(action)),
        };
        let outcome = self.release_temporaries(mark, outcome);
        self.finish(outcome).map(|()| value)
    }

    /// Call a declared global function by name with host-supplied arguments.
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, RunError> {
        let name = Name::new(name);
        let mark = self.temporaries.len();
        let result = self.call_named(&name, CallArgs::Values(args), Pos::NONE);
        let (value, outcome) = match result {
            Ok(value) => (value, Ok(())),
            Err(action) => (Value::Nil, Err(action)),
        };
        let outcome = self.release_temporaries(mark, outcome);
        self.finish(outcome).map(|()| value)
    }

    /// Current value of a global variable, with references followed.
    pub fn global(&self, name: &str) -> Option<Value> {
        let value = self.env.global().borrow().lookup_local(&Name::new(name))?;
        match value {
            Value::Reference(r) => r.get(),
            Value::Lazy(thunk) => thunk.cached(),
            other => Some(other),
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Number of script frames currently on the call stack.
    pub fn call_depth(&self) -> usize {
        self.call_stack.depth()
    }

    /// Output captured by a buffer sink; empty for other sinks.
    pub fn get_print_output(&self) -> String {
        self.print_handler.get_output()
    }

    pub fn clear_print_output(&self) {
        self.print_handler.clear();
    }

    pub(crate) fn print_handler(&self) -> &SharedPrintHandler {
        &self.print_handler
    }

    /// Map the outcome of a top-level entry point to the host-facing error.
    pub(crate) fn finish(&mut self, result: EvalResult<()>) -> Result<(), RunError> {
        match result {
            Ok(()) | Err(ControlAction::Exit | ControlAction::Break | ControlAction::Continue) => {
                Ok(())
            }
            Err(ControlAction::Raise(exc)) => {
                tracing::debug!(class = exc.class_name(), "unhandled exception");
                Err(RunError::Unhandled(exc.report()))
            }
            Err(ControlAction::Error(err)) => match self.exception_from_error(err) {
                Ok(exc) => Err(RunError::Unhandled(exc.report())),
                Err(ControlAction::Fatal(err) | ControlAction::Error(err)) => {
                    Err(RunError::Fatal(err))
                }
                Err(_) => Err(RunError::Fatal(dws_runtime::errors::internal_error(
                    "exception conversion unwound",
                ))),
            },
            Err(ControlAction::Fatal(err)) => Err(RunError::Fatal(err)),
        }
    }

    /// Release every interface held by a global binding. Interface
    /// globals are set to nil and dynamic arrays emptied; the bindings stay,
    /// so hosts can still inspect the other globals.
    fn release_globals(&mut self) -> EvalResult<()> {
        let global = self.env.global();
        let held: Vec<(Name, Value)> = global
            .borrow()
            .bindings()
            .filter(|(_, v)| holds_interfaces(v))
            .map(|(n, v)| (n.clone(), v.clone()))
            .collect();
        let mut outcome = Ok(());
        for (name, value) in held {
            let cleared = match &value {
                Value::Interface(iface) => Some(Value::Interface(
                    dws_runtime::InterfaceValue::nil(Rc::clone(&iface.info)),
                )),
                Value::Array(array) if !array.is_static() => Some(Value::Array(
                    dws_runtime::ArrayValue::new(Rc::clone(array.ty()), Vec::new()),
                )),
                _ => None,
            };
            // Constants holding interfaces are left alone.
            if let Some(cleared) = cleared {
                if global.borrow_mut().assign(&name, cleared).is_err() {
                    continue;
                }
            }
            if let Err(action) = self.release(&value) {
                tracing::warn!(%name, "releasing global failed");
                if outcome.is_ok() {
                    outcome = Err(action);
                }
            }
        }
        outcome
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
