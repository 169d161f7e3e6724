//! `InterpreterBuilder` for configuring an interpreter before it runs.

use std::rc::Rc;

use dws_ir::{CiMap, Name};
use dws_runtime::{Environment, TypeRegistry};

use super::{Interpreter, KnownNames};
use crate::builtins::{BuiltinFn, BuiltinRegistry};
use crate::config::{CancellationToken, InterpreterConfig};
use crate::diagnostics::CallStack;
use crate::ffi::{ExternalFunction, ExternalRegistry};
use crate::print_handler::{stdout_handler, SharedPrintHandler};

/// Builder for [`Interpreter`].
///
/// ```text
/// let mut interpreter = Interpreter::builder()
///     .print_handler(buffer_handler())
///     .max_recursion_depth(Some(256))
///     .external("Now", NowFunction)
///     .build();
/// ```
pub struct InterpreterBuilder {
    config: InterpreterConfig,
    print_handler: Option<SharedPrintHandler>,
    externals: ExternalRegistry,
    builtins: Vec<(Name, BuiltinFn)>,
}

impl InterpreterBuilder {
    pub fn new() -> Self {
        Self {
            config: InterpreterConfig::default(),
            print_handler: None,
            externals: CiMap::new(),
            builtins: Vec::new(),
        }
    }

    /// Where `Print`/`PrintLn` output goes. Defaults to stdout.
    #[must_use]
    pub fn print_handler(mut self, handler: SharedPrintHandler) -> Self {
        self.print_handler = Some(handler);
        self
    }

    /// Limit on nested script calls. `None` removes the limit, leaving only
    /// the host's memory as a bound.
    #[must_use]
    pub fn max_recursion_depth(mut self, depth: Option<usize>) -> Self {
        self.config.max_recursion_depth = depth;
        self
    }

    /// File name recorded in call-stack frames of exception reports.
    #[must_use]
    pub fn source_file(mut self, file: impl Into<String>) -> Self {
        self.config.source_file = file.into();
        self
    }

    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.config.cancellation = Some(token);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    /// Make a host function callable from scripts under `name`.
    #[must_use]
    pub fn external(mut self, name: &str, function: impl ExternalFunction + 'static) -> Self {
        self.externals.insert(Name::new(name), Rc::new(function));
        self
    }

    /// Add a built-in, or replace a standard one of the same name.
    /// Built-ins see the interpreter directly and raise through the usual
    /// evaluation errors.
    #[must_use]
    pub fn builtin(mut self, name: &str, function: BuiltinFn) -> Self {
        self.builtins.push((Name::new(name), function));
        self
    }

    pub fn build(self) -> Interpreter {
        let config = self.config;
        let call_stack =
            CallStack::new(config.max_recursion_depth).with_file(config.source_file.clone());
        let mut builtins = BuiltinRegistry::standard();
        for (name, function) in self.builtins {
            builtins.register(name.as_str(), function);
        }
        let mut interpreter = Interpreter {
            env: Environment::new(),
            types: TypeRegistry::new(),
            functions: CiMap::new(),
            builtins,
            externals: self.externals,
            call_stack,
            print_handler: self.print_handler.unwrap_or_else(stdout_handler),
            config,
            names: KnownNames::new(),
            methods: Vec::new(),
            handling: Vec::new(),
            temporaries: Vec::new(),
        };
        interpreter.install_prelude();
        interpreter
    }
}

impl Default for InterpreterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
