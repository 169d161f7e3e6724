//! Evaluation errors and control-flow signals.
//!
//! # Error taxonomy
//!
//! - Evaluation errors ([`EvalError`]) are raised by runtime checks
//!   (division by zero, bad index, undefined name, wrong arity). They are
//!   catchable: the first `try/except` they reach converts them into a
//!   script exception of the class given by [`EvalErrorKind::exception_class`].
//! - Script exceptions travel as [`ControlAction::Raise`].
//! - Fatal errors ([`ControlAction::Fatal`]) are never caught by script code
//!   and skip `finally` blocks.
//!
//! Factory functions (`division_by_zero()`, `wrong_arg_count(..)`, ...)
//! are the public constructors; each fills in `kind` and `message`.

use std::fmt;
use std::rc::Rc;

use dws_ir::{BinaryOp, Pos, UnaryOp};

use crate::exception::{class_names, ExceptionValue, StackFrame};
use crate::value::Value;

/// Result of evaluating an expression or statement.
pub type EvalResult<T = Value> = Result<T, ControlAction>;

/// Non-value outcomes of evaluation, carried in the `Err` arm.
///
/// `Break`/`Continue` unwind to the nearest loop, `Exit` to the nearest
/// function boundary. They are not exceptions and are never caught by
/// `except`, but they do run `finally` blocks on the way out.
#[derive(Clone, Debug)]
pub enum ControlAction {
    /// A catchable evaluation error not yet turned into an exception object.
    Error(EvalError),
    /// A script exception in flight.
    Raise(Rc<ExceptionValue>),
    Break,
    Continue,
    Exit,
    /// Uncatchable failure.
    Fatal(EvalError),
}

impl ControlAction {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ControlAction::Fatal(_))
    }

    /// Whether `try/except` may intercept this action.
    pub fn is_catchable(&self) -> bool {
        matches!(self, ControlAction::Error(_) | ControlAction::Raise(_))
    }
}

impl From<EvalError> for ControlAction {
    fn from(err: EvalError) -> Self {
        if err.kind.is_fatal() {
            ControlAction::Fatal(err)
        } else {
            ControlAction::Error(err)
        }
    }
}

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    // Arithmetic
    DivisionByZero,
    IntegerOverflow {
        operation: String,
    },

    // Type/Operator
    TypeMismatch {
        expected: String,
        got: String,
    },
    InvalidBinaryOp {
        type_name: String,
        op: BinaryOp,
    },
    BinaryTypeMismatch {
        left: String,
        right: String,
        op: BinaryOp,
    },
    InvalidUnaryOp {
        type_name: String,
        op: UnaryOp,
    },
    ConversionFailed {
        value: String,
        target: String,
    },
    InvalidCast {
        from: String,
        to: String,
    },

    // Access
    UndefinedVariable {
        name: String,
    },
    UndefinedFunction {
        name: String,
    },
    UndefinedType {
        name: String,
    },
    UndefinedMember {
        member: String,
        type_name: String,
    },
    IndexOutOfBounds {
        index: i64,
        low: i64,
        high: i64,
    },
    ImmutableBinding {
        name: String,
    },
    InvalidAssignmentTarget,
    NilReference {
        member: String,
    },
    ObjectDestroyed {
        class: String,
    },

    // Calls
    ArityMismatch {
        name: String,
        min: usize,
        max: usize,
        got: usize,
    },
    NoMatchingOverload {
        name: String,
    },
    VarArgNotAssignable {
        name: String,
        index: usize,
    },
    StackOverflow {
        depth: usize,
    },
    NotCallable {
        type_name: String,
    },

    // Object model
    AbstractInstantiation {
        class: String,
    },
    AbstractMethodCalled {
        method: String,
    },
    NotAnException {
        type_name: String,
    },

    // Assertions
    AssertionFailed {
        message: String,
    },

    // Host boundary
    JsonParse {
        message: String,
        line: usize,
        column: usize,
    },
    JsonUnsupported {
        type_name: String,
    },
    Host {
        function: String,
        /// Host-side failure kind, exposed as `EHost.ExceptionClass`.
        host_class: String,
        message: String,
    },

    // Fatal
    BareRaiseOutsideHandler,
    Cancelled,
    Internal {
        message: String,
    },

    /// Uncategorised message.
    Custom {
        message: String,
    },
}

impl EvalErrorKind {
    /// Fatal kinds are never caught by `try/except`.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::BareRaiseOutsideHandler | Self::Cancelled | Self::Internal { .. }
        )
    }

    /// Built-in exception class this error becomes when caught.
    pub fn exception_class(&self) -> &'static str {
        match self {
            Self::DivisionByZero => class_names::EDIV_BY_ZERO,
            Self::IntegerOverflow { .. } | Self::IndexOutOfBounds { .. } => {
                class_names::ERANGE_ERROR
            }
            Self::ConversionFailed { .. } => class_names::ECONVERT_ERROR,
            Self::AssertionFailed { .. } => class_names::EASSERTION_FAILED,
            Self::InvalidCast { .. }
            | Self::AbstractInstantiation { .. }
            | Self::AbstractMethodCalled { .. } => class_names::EINVALID_OP,
            Self::StackOverflow { .. } => class_names::ESCRIPT_STACK_OVERFLOW,
            Self::Host { .. } => class_names::EHOST,
            _ => class_names::EXCEPTION,
        }
    }
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivisionByZero => write!(f, "Division by zero"),
            Self::IntegerOverflow { operation } => write!(f, "Integer overflow in {operation}"),

            Self::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {expected}, got {got}")
            }
            Self::InvalidBinaryOp { type_name, op } => write!(
                f,
                "operator \"{}\" cannot be applied to {type_name}",
                op.as_symbol()
            ),
            Self::BinaryTypeMismatch { left, right, op } => {
                write!(f, "type mismatch: {left} {} {right}", op.as_symbol())
            }
            Self::InvalidUnaryOp { type_name, op } => write!(
                f,
                "operator \"{}\" cannot be applied to {type_name}",
                op.as_symbol()
            ),
            Self::ConversionFailed { value, target } => {
                write!(f, "cannot convert \"{value}\" to {target}")
            }
            Self::InvalidCast { from, to } => write!(f, "cannot cast {from} to {to}"),

            Self::UndefinedVariable { name } => write!(f, "undefined variable: {name}"),
            Self::UndefinedFunction { name } => write!(f, "undefined function: {name}"),
            Self::UndefinedType { name } => write!(f, "undefined type: {name}"),
            Self::UndefinedMember { member, type_name } => {
                write!(f, "member not found: {member} in {type_name}")
            }
            Self::IndexOutOfBounds { index, low, high } => {
                write!(f, "index out of bounds: {index} (bounds are {low}..{high})")
            }
            Self::ImmutableBinding { name } => write!(f, "cannot assign to constant: {name}"),
            Self::InvalidAssignmentTarget => write!(f, "invalid assignment target"),
            Self::NilReference { member } => {
                if member.is_empty() {
                    write!(f, "Object not instantiated")
                } else {
                    write!(f, "Object not instantiated (accessing {member})")
                }
            }
            Self::ObjectDestroyed { class } => write!(f, "Object of class {class} already destroyed"),

            Self::ArityMismatch {
                name,
                min,
                max,
                got,
            } => {
                if min == max {
                    write!(
                        f,
                        "wrong number of arguments for {name}: expected {min}, got {got}"
                    )
                } else {
                    write!(
                        f,
                        "wrong number of arguments for {name}: expected {min}-{max}, got {got}"
                    )
                }
            }
            Self::NoMatchingOverload { name } => {
                write!(f, "no overload of {name} accepts these arguments")
            }
            Self::VarArgNotAssignable { name, index } => write!(
                f,
                "argument {index} of {name} must be a variable (var parameter)"
            ),
            Self::StackOverflow { depth } => write!(f, "Maximal recursion exceeded ({depth})"),
            Self::NotCallable { type_name } => write!(f, "{type_name} is not callable"),

            Self::AbstractInstantiation { class } => {
                write!(f, "Trying to create an instance of an abstract class {class}")
            }
            Self::AbstractMethodCalled { method } => {
                write!(f, "abstract method {method} called")
            }
            Self::NotAnException { type_name } => {
                write!(f, "raise expects an exception object, got {type_name}")
            }

            Self::AssertionFailed { message } => write!(f, "Assertion failed{message}"),

            Self::JsonParse {
                message,
                line,
                column,
            } => write!(f, "JSON parse error: {message} at line {line}, column {column}"),
            Self::JsonUnsupported { type_name } => {
                write!(f, "cannot serialize {type_name} to JSON")
            }
            Self::Host {
                function, message, ..
            } => write!(f, "{function}: {message}"),

            Self::BareRaiseOutsideHandler => {
                write!(f, "re-raise without an active exception")
            }
            Self::Cancelled => write!(f, "execution cancelled"),
            Self::Internal { message } => write!(f, "internal error: {message}"),

            Self::Custom { message } => write!(f, "{message}"),
        }
    }
}

/// Secondary information attached to an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalNote {
    pub message: String,
    pub pos: Option<Pos>,
}

impl EvalNote {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            pos: None,
        }
    }

    pub fn at(message: impl Into<String>, pos: Pos) -> Self {
        Self {
            message: message.into(),
            pos: Some(pos),
        }
    }
}

/// Evaluation error.
#[derive(Clone, Debug)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// For factory-created errors, equals `kind.to_string()`.
    pub message: String,
    /// Source location where the error occurred.
    pub pos: Option<Pos>,
    /// Call stack at the error site, oldest first. Attached by the call
    /// engine when the error first crosses a call boundary.
    pub backtrace: Option<Vec<StackFrame>>,
    pub notes: Vec<EvalNote>,
}

impl EvalError {
    /// An error with just a message (`Custom` kind).
    pub fn new(message: impl Into<String>) -> Self {
        let msg = message.into();
        Self {
            kind: EvalErrorKind::Custom {
                message: msg.clone(),
            },
            message: msg,
            pos: None,
            backtrace: None,
            notes: Vec::new(),
        }
    }

    pub fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            pos: None,
            backtrace: None,
            notes: Vec::new(),
        }
    }

    /// Attach a position unless one is already set (the innermost site
    /// wins).
    #[must_use]
    pub fn with_pos(mut self, pos: Pos) -> Self {
        if self.pos.is_none() && pos.is_known() {
            self.pos = Some(pos);
        }
        self
    }

    #[must_use]
    pub fn with_backtrace(mut self, frames: Vec<StackFrame>) -> Self {
        if self.backtrace.is_none() {
            self.backtrace = Some(frames);
        }
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: EvalNote) -> Self {
        self.notes.push(note);
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }

    /// Message as shown to scripts: the text plus the source position when
    /// known.
    pub fn script_message(&self) -> String {
        match self.pos {
            Some(pos) => format!("{} [{pos}]", self.message),
            None => self.message.clone(),
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.script_message())?;
        for note in &self.notes {
            write!(f, "\n  note: {}", note.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {}

// Arithmetic

#[cold]
pub fn division_by_zero() -> EvalError {
    EvalError::from_kind(EvalErrorKind::DivisionByZero)
}

#[cold]
pub fn integer_overflow(operation: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IntegerOverflow {
        operation: operation.to_string(),
    })
}

// Types and operators

#[cold]
pub fn type_mismatch(expected: &str, got: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::TypeMismatch {
        expected: expected.to_string(),
        got: got.to_string(),
    })
}

#[cold]
pub fn invalid_binary_op(type_name: &str, op: BinaryOp) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidBinaryOp {
        type_name: type_name.to_string(),
        op,
    })
}

#[cold]
pub fn binary_type_mismatch(left: &str, right: &str, op: BinaryOp) -> EvalError {
    EvalError::from_kind(EvalErrorKind::BinaryTypeMismatch {
        left: left.to_string(),
        right: right.to_string(),
        op,
    })
}

#[cold]
pub fn invalid_unary_op(type_name: &str, op: UnaryOp) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidUnaryOp {
        type_name: type_name.to_string(),
        op,
    })
}

#[cold]
pub fn conversion_failed(value: &str, target: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ConversionFailed {
        value: value.to_string(),
        target: target.to_string(),
    })
}

#[cold]
pub fn invalid_cast(from: &str, to: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidCast {
        from: from.to_string(),
        to: to.to_string(),
    })
}

// Access

#[cold]
pub fn undefined_variable(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedVariable {
        name: name.to_string(),
    })
}

#[cold]
pub fn undefined_function(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedFunction {
        name: name.to_string(),
    })
}

#[cold]
pub fn undefined_type(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedType {
        name: name.to_string(),
    })
}

#[cold]
pub fn undefined_member(member: &str, type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedMember {
        member: member.to_string(),
        type_name: type_name.to_string(),
    })
}

#[cold]
pub fn index_out_of_bounds(index: i64, low: i64, high: i64) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IndexOutOfBounds { index, low, high })
}

#[cold]
pub fn cannot_assign_immutable(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ImmutableBinding {
        name: name.to_string(),
    })
}

#[cold]
pub fn invalid_assignment_target() -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidAssignmentTarget)
}

#[cold]
pub fn nil_reference(member: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NilReference {
        member: member.to_string(),
    })
}

#[cold]
pub fn object_destroyed(class: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ObjectDestroyed {
        class: class.to_string(),
    })
}

// Calls

#[cold]
pub fn wrong_arg_count(name: &str, min: usize, max: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArityMismatch {
        name: name.to_string(),
        min,
        max,
        got,
    })
}

#[cold]
pub fn no_matching_overload(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NoMatchingOverload {
        name: name.to_string(),
    })
}

#[cold]
pub fn var_arg_not_assignable(name: &str, index: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::VarArgNotAssignable {
        name: name.to_string(),
        index,
    })
}

#[cold]
pub fn recursion_limit_exceeded(depth: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StackOverflow { depth })
}

#[cold]
pub fn not_callable(type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotCallable {
        type_name: type_name.to_string(),
    })
}

// Object model

#[cold]
pub fn abstract_instantiation(class: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::AbstractInstantiation {
        class: class.to_string(),
    })
}

#[cold]
pub fn abstract_method_called(method: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::AbstractMethodCalled {
        method: method.to_string(),
    })
}

#[cold]
pub fn not_an_exception(type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotAnException {
        type_name: type_name.to_string(),
    })
}

// Assertions

/// `Assert` failure; `message` is the optional user text.
#[cold]
pub fn assertion_failed(message: Option<&str>) -> EvalError {
    let message = message.map_or_else(String::new, |m| format!(": {m}"));
    EvalError::from_kind(EvalErrorKind::AssertionFailed { message })
}

// Host boundary

#[cold]
pub fn json_parse_error(message: &str, line: usize, column: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::JsonParse {
        message: message.to_string(),
        line,
        column,
    })
}

#[cold]
pub fn json_unsupported(type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::JsonUnsupported {
        type_name: type_name.to_string(),
    })
}

/// A host function failed or panicked; surfaces as `EHost`.
#[cold]
pub fn host_error(function: &str, host_class: &str, message: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Host {
        function: function.to_string(),
        host_class: host_class.to_string(),
        message: message.to_string(),
    })
}

// Fatal

#[cold]
pub fn bare_raise_outside_handler() -> EvalError {
    EvalError::from_kind(EvalErrorKind::BareRaiseOutsideHandler)
}

#[cold]
pub fn cancelled() -> EvalError {
    EvalError::from_kind(EvalErrorKind::Cancelled)
}

#[cold]
pub fn internal_error(message: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Internal {
        message: message.to_string(),
    })
}
