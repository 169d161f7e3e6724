//! Host (external) functions.
//!
//! A host function is anything implementing [`ExternalFunction`]. It gets
//! its arguments as script values and a [`CallbackContext`] through which it
//! can call back into script function pointers or write `var` arguments.
//!
//! Every host call is isolated: a returned [`HostError`] and a panic both
//! become a catchable `EHost` exception whose `ExceptionClass` field names
//! the failure kind. A panic additionally restores the interpreter state
//! (call stack, scopes, active methods and handlers) to what it was when
//! the host function was entered.
//!
//! ```text
//! interpreter.register_fn("Twice", |n: i64| Ok::<_, HostError>(n * 2));
//! ```

use std::any::Any;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use dws_ir::{CiMap, Expr, Name, Pos};
use dws_runtime::errors::{host_error, undefined_function};
use dws_runtime::marshal::{FromValue, HostError, IntoValue};
use dws_runtime::{ControlAction, EvalResult, FunctionPointer, Value};

use crate::diagnostics::CallFrame;
use crate::exec::CallArgs;
use crate::interpreter::Interpreter;


/// A function implemented by the host.
pub trait ExternalFunction {
    fn call(&self, ctx: &mut CallbackContext<'_>, args: &[Value]) -> Result<Value, HostError>;

    /// Which positional parameters are passed by reference. The matching
    /// arguments arrive as `Value::Reference`; read them with
    /// [`CallbackContext::read`] and write them with
    /// [`CallbackContext::assign`].
    fn var_params(&self) -> &[bool] {
        &[]
    }
}

impl<F> ExternalFunction for F
where
    F: Fn(&mut CallbackContext<'_>, &[Value]) -> Result<Value, HostError>,
{
    fn call(&self, ctx: &mut CallbackContext<'_>, args: &[Value]) -> Result<Value, HostError> {
        self(ctx, args)
    }
}

pub(crate) type ExternalRegistry = CiMap<Rc<dyn ExternalFunction>>;

/// Re-entry point handed to a running host function.
pub struct CallbackContext<'a> {
    interpreter: &'a mut Interpreter,
    /// The first script-level failure raised by a callback. It replaces
    /// whatever the host function returns, so script exceptions pass
    /// through host frames unchanged.
    pending: Option<ControlAction>,
}

impl CallbackContext<'_> {
    /// Call a script function pointer with host-supplied arguments.
    ///
    /// If the script raises, the exception is remembered and re-raised once
    /// the host function returns; the host sees a `HostError::Failed`.
    pub fn call_function(
        &mut self,
        pointer: &FunctionPointer,
        args: Vec<Value>,
    ) -> Result<Value, HostError> {
        if self.pending.is_some() {
            return Err(HostError::failed("a previous callback raised"));
        }
        match self
            .interpreter
            .call_pointer(pointer, CallArgs::Values(args), Pos::NONE)
        {
            Ok(value) => Ok(value),
            Err(action) => {
                let message = match &action {
                    ControlAction::Raise(exc) => exc.message(),
                    ControlAction::Error(err) | ControlAction::Fatal(err) => err.message.clone(),
                    _ => "callback left through break, continue or exit".to_string(),
                };
                self.pending = Some(action);
                Err(HostError::Failed(message))
            }
        }
    }

    /// Current value behind a by-reference argument. Plain values are
    /// returned as they are.
    pub fn read(&self, arg: &Value) -> Value {
        match arg {
            Value::Reference(reference) => reference.get().unwrap_or(Value::Nil),
            other => other.clone(),
        }
    }

    /// Write through a by-reference argument.
    pub fn assign(&mut self, target: &Value, value: Value) -> Result<(), HostError> {
        let Value::Reference(reference) = target else {
            return Err(HostError::TypeMismatch {
                expected: "var parameter",
                got: target.type_name(),
            });
        };
        reference
            .set(value)
            .map_err(|_| HostError::failed(format!("cannot assign to {}", reference.describe())))
    }

    /// Write to the interpreter's output sink.
    pub fn print(&self, text: &str) {
        self.interpreter.print_handler().print(text);
    }
}

// Typed Host Functions

/// A closure whose parameters and result marshal through
/// [`FromValue`]/[`IntoValue`].
pub trait HostFn<Args>: 'static {
    fn invoke(&self, args: &[Value]) -> Result<Value, HostError>;
}

macro_rules! impl_host_fn {
    ($count:literal; $($arg:ident $index:tt),*) => {
        impl<F, R, $($arg),*> HostFn<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> Result<R, HostError> + 'static,
            R: IntoValue,
            $($arg: FromValue,)*
        {
            fn invoke(&self, args: &[Value]) -> Result<Value, HostError> {
                if args.len() != $count {
                    return Err(HostError::ArgumentCount {
                        expected: $count,
                        got: args.len(),
                    });
                }
                let result = self($(
                    <$arg as FromValue>::from_value(&args[$index])
                        .map_err(|err| err.at_argument($index + 1))?
                ),*)?;
                Ok(result.into_value())
            }
        }
    };
}

impl_host_fn!(0;);
impl_host_fn!(1; A 0);
impl_host_fn!(2; A 0, B 1);
impl_host_fn!(3; A 0, B 1, C 2);

/// Adapter from a [`HostFn`] closure to [`ExternalFunction`].
pub struct TypedFunction<F, Args> {
    function: F,
    marker: PhantomData<fn() -> Args>,
}

impl<F: HostFn<Args>, Args> TypedFunction<F, Args> {
    pub fn new(function: F) -> Self {
        TypedFunction {
            function,
            marker: PhantomData,
        }
    }
}

impl<F: HostFn<Args>, Args> ExternalFunction for TypedFunction<F, Args> {
    fn call(&self, _ctx: &mut CallbackContext<'_>, args: &[Value]) -> Result<Value, HostError> {
        self.function.invoke(args)
    }
}

// Registration

impl Interpreter {
    /// Make a host function callable from scripts under `name`, replacing
    /// any earlier registration.
    pub fn register_external(&mut self, name: &str, function: impl ExternalFunction + 'static) {
        tracing::debug!(name, "registering host function");
        self.externals.insert(Name::new(name), Rc::new(function));
    }

    /// Register a typed closure of up to three arguments.
    pub fn register_fn<F, Args>(&mut self, name: &str, function: F)
    where
        F: HostFn<Args>,
        Args: 'static,
    {
        self.register_external(name, TypedFunction::new(function));
    }

    pub fn has_external(&self, name: &str) -> bool {
        self.externals.contains_key(name)
    }
}

// Calling

/// Interpreter state a panicking host function may leave inconsistent.
struct Marks {
    call_depth: usize,
    scope_depth: usize,
    methods: usize,
    handling: usize,
    temporaries: usize,
}

impl Marks {
    fn take(interp: &Interpreter) -> Self {
        Marks {
            call_depth: interp.call_stack.depth(),
            scope_depth: interp.env.depth(),
            methods: interp.methods.len(),
            handling: interp.handling.len(),
            temporaries: interp.temporaries.len(),
        }
    }

    fn restore(&self, interp: &mut Interpreter) {
        interp.call_stack.truncate(self.call_depth);
        while interp.env.depth() > self.scope_depth {
            if interp.env.pop_scope().is_none() {
                break;
            }
        }
        interp.methods.truncate(self.methods);
        interp.handling.truncate(self.handling);
        interp.temporaries.truncate(self.temporaries);
    }
}

impl Interpreter {
    /// Call the host function registered as `name`.
    pub(crate) fn call_external(&mut self, name: &Name, args: CallArgs<'_>, pos: Pos) -> EvalResult {
        let Some(function) = self.externals.get(name.as_str()).cloned() else {
            return Err(undefined_function(name.as_str()).into());
        };
        let values = match args {
            CallArgs::Exprs(exprs) => self.external_args(function.as_ref(), name, exprs, None)?,
            CallArgs::Scored(exprs, values) => {
                self.external_args(function.as_ref(), name, exprs, Some(values))?
            }
            CallArgs::Values(values) => values,
        };
        self.invoke_external(name, function.as_ref(), &values, pos)
    }

    /// Evaluate arguments, turning `var` positions into references.
    fn external_args(
        &mut self,
        function: &dyn ExternalFunction,
        name: &Name,
        exprs: &[Expr],
        evaluated: Option<Vec<Option<Value>>>,
    ) -> EvalResult<Vec<Value>> {
        let var_params = function.var_params();
        let mut evaluated = evaluated.map(Vec::into_iter);
        let mut values = Vec::with_capacity(exprs.len());
        for (index, expr) in exprs.iter().enumerate() {
            let given = evaluated.as_mut().and_then(Iterator::next).flatten();
            let value = if var_params.get(index).copied().unwrap_or(false) {
                Value::Reference(self.reference_to(expr, name.as_str(), index + 1)?)
            } else {
                match given {
                    Some(value) => value,
                    None => self.eval_expr(expr)?,
                }
            };
            values.push(value);
        }
        Ok(values)
    }

    fn invoke_external(
        &mut self,
        name: &Name,
        function: &dyn ExternalFunction,
        args: &[Value],
        pos: Pos,
    ) -> EvalResult {
        if let Err(err) = self.call_stack.push(CallFrame {
            name: name.to_string(),
            call_pos: pos,
        }) {
            return Err(ControlAction::from(self.call_stack.attach_backtrace(err)));
        }
        let marks = Marks::take(self);
        tracing::trace!(function = %name, args = args.len(), "calling host function");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut ctx = CallbackContext {
                interpreter: &mut *self,
                pending: None,
            };
            let result = function.call(&mut ctx, args);
            (result, ctx.pending)
        }));

        let result = match outcome {
            Ok((_, Some(action))) => Err(action),
            Ok((Ok(value), None)) => Ok(value),
            Ok((Err(err), None)) => {
                tracing::debug!(function = %name, error = %err, "host function failed");
                Err(self.host_failure(name, host_error_class(&err), &err.to_string()))
            }
            Err(payload) => {
                marks.restore(self);
                let message = format!("panic: {}", panic_message(payload.as_ref()));
                tracing::warn!(function = %name, %message, "host function panicked");
                Err(self.host_failure(name, "panic", &message))
            }
        };
        self.call_stack.pop();
        result
    }

    fn host_failure(&self, name: &Name, host_class: &str, message: &str) -> ControlAction {
        let err = host_error(name.as_str(), host_class, message);
        ControlAction::Error(self.call_stack.attach_backtrace(err))
    }
}

/// Value of `EHost.ExceptionClass` for a reported failure.
fn host_error_class(err: &HostError) -> &'static str {
    match err {
        HostError::ArgumentType { .. } => "ArgumentType",
        HostError::TypeMismatch { .. } => "TypeMismatch",
        HostError::ArgumentCount { .. } => "ArgumentCount",
        HostError::Failed(_) => "Failed",
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "host function panicked".to_string()
    }
}
