//! Built-in functions.
//!
//! Two tables: functions that take evaluated argument values, and the few
//! (`Inc`, `SetLength`, `Include`, ...) that take argument expressions
//! because they write back into a variable.

mod standard;
mod var_args;

#[cfg(test)]
mod tests;

use dws_ir::{CiMap, Expr};
use dws_runtime::errors::wrong_arg_count;
use dws_runtime::{EvalError, EvalResult, Value};

use crate::interpreter::Interpreter;

/// A built-in taking evaluated arguments.
pub type BuiltinFn = fn(&mut Interpreter, &[Value]) -> EvalResult;

/// A built-in taking argument expressions.
pub(crate) type VarArgFn = fn(&mut Interpreter, &[Expr]) -> EvalResult;

pub(crate) struct BuiltinRegistry {
    functions: CiMap<BuiltinFn>,
    var_args: CiMap<VarArgFn>,
}

impl BuiltinRegistry {
    /// The standard library every interpreter starts with.
    pub(crate) fn standard() -> Self {
        let mut registry = BuiltinRegistry {
            functions: CiMap::new(),
            var_args: CiMap::new(),
        };
        standard::register(&mut registry);
        var_args::register(&mut registry);
        registry
    }

    /// Add or replace a value-taking built-in.
    pub(crate) fn register(&mut self, name: &str, function: BuiltinFn) {
        self.functions.insert(name, function);
    }

    pub(crate) fn register_var_arg(&mut self, name: &str, function: VarArgFn) {
        self.var_args.insert(name, function);
    }

    pub(crate) fn get(&self, name: &str) -> Option<BuiltinFn> {
        self.functions.get(name).copied()
    }

    pub(crate) fn var_arg(&self, name: &str) -> Option<VarArgFn> {
        self.var_args.get(name).copied()
    }
}

// Argument Validation

#[inline]
pub(crate) fn require_args(
    name: &str,
    min: usize,
    max: usize,
    got: usize,
) -> Result<(), EvalError> {
    if got < min || got > max {
        return Err(wrong_arg_count(name, min, max, got));
    }
    Ok(())
}
