//! DWS Eval - Tree-walking interpreter for DWScript programs.
//!
//! The interpreter consumes the syntax tree from `dws_ir` and evaluates it
//! directly over the value model in `dws_runtime`.
//!
//! # Architecture
//!
//! - `Interpreter`: owns the scope chain, type registry, declared
//!   functions, built-in and host function tables, call stack and output
//! - `exec`: statement and expression evaluation, the call engine
//!   (overloads, `var`/`lazy`/default parameters, closures), the object
//!   model and the exception machinery
//! - `operators`: direct enum-based binary and unary operator dispatch
//! - `builtins`: the standard library of built-in functions
//! - `ffi`: host functions, typed registration and re-entrant callbacks
//! - `prelude`: `TObject` and the standard exception classes
//!
//! # Example
//!
//! ```text
//! let mut interpreter = Interpreter::builder()
//!     .print_handler(buffer_handler())
//!     .build();
//! interpreter.run(&program)?;
//! print!("{}", interpreter.get_print_output());
//! ```

mod builtins;
mod config;
mod diagnostics;
mod exec;
mod ffi;
pub mod interpreter;
mod operators;
mod prelude;
mod print_handler;
mod stack;
mod tracing_setup;

pub use builtins::BuiltinFn;
pub use config::{CancellationToken, InterpreterConfig};
pub use diagnostics::{CallFrame, CallStack, DEFAULT_MAX_RECURSION_DEPTH};
pub use ffi::{CallbackContext, ExternalFunction, HostFn, TypedFunction};
pub use interpreter::{Interpreter, InterpreterBuilder, RunError, ScopedInterpreter};
pub use operators::{binary as evaluate_binary, unary as evaluate_unary};
pub use print_handler::{
    buffer_handler, silent_handler, stdout_handler, BufferPrintHandler, PrintHandlerImpl,
    SharedPrintHandler, StdoutPrintHandler,
};
pub use stack::ensure_sufficient_stack;
pub use tracing_setup::init_tracing;

// Re-export the runtime types hosts handle directly.
pub use dws_runtime::{
    EvalError, EvalErrorKind, ExceptionReport, FromValue, FunctionPointer, HostError, HostValue,
    IntoValue, StackFrame, Value,
};
