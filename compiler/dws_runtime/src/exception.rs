//! Script exceptions and the unhandled-exception report.

use std::fmt;
use std::rc::Rc;

use dws_ir::Pos;
use serde::Serialize;

use crate::types::ClassInfo;
use crate::value::{ObjectRef, Value};

/// Names of the built-in exception classes.
pub mod class_names {
    pub const TOBJECT: &str = "TObject";
    pub const EXCEPTION: &str = "Exception";
    pub const ECONVERT_ERROR: &str = "EConvertError";
    pub const ERANGE_ERROR: &str = "ERangeError";
    pub const EDIV_BY_ZERO: &str = "EDivByZero";
    pub const EASSERTION_FAILED: &str = "EAssertionFailed";
    pub const EINVALID_OP: &str = "EInvalidOp";
    pub const ESCRIPT_STACK_OVERFLOW: &str = "EScriptStackOverflow";
    pub const EHOST: &str = "EHost";
}

/// One call-stack entry captured at a raise site.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    pub function: String,
    pub file: String,
    pub pos: Pos,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.function, self.pos)
    }
}

/// An exception in flight.
///
/// Wraps the script-visible exception object so handlers can read custom
/// fields through `on E: T do`.
#[derive(Debug)]
pub struct ExceptionValue {
    pub class: Rc<ClassInfo>,
    /// Message at raise time; the object's `Message` field wins if a handler
    /// changed it before re-raising.
    pub raised_message: String,
    /// Oldest frame first.
    pub call_stack: Vec<StackFrame>,
    pub object: ObjectRef,
    pub pos: Pos,
}

impl ExceptionValue {
    pub fn new(object: ObjectRef, call_stack: Vec<StackFrame>, pos: Pos) -> Self {
        let class = Rc::clone(object.class());
        let raised_message = match object.get_field("Message") {
            Some(Value::String(s)) => s,
            _ => String::new(),
        };
        ExceptionValue {
            class,
            raised_message,
            call_stack,
            object,
            pos,
        }
    }

    pub fn class_name(&self) -> &str {
        self.class.name.as_str()
    }

    pub fn message(&self) -> String {
        match self.object.get_field("Message") {
            Some(Value::String(s)) => s,
            _ => self.raised_message.clone(),
        }
    }

    /// Whether a handler for `class_name` catches this exception.
    pub fn is_instance_of(&self, class_name: &str) -> bool {
        self.class.is_descendant_of_name(class_name)
    }

    pub fn report(&self) -> ExceptionReport {
        ExceptionReport {
            class_name: self.class_name().to_string(),
            message: self.message(),
            call_stack: self.call_stack.clone(),
            pos: self.pos,
        }
    }
}

/// Host-facing summary of an unhandled exception.
///
/// ```text
/// Runtime Error: ERangeError: Integer overflow
///   at Compute [line: 4, column: 3]
///   at Main [line: 9, column: 1]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExceptionReport {
    pub class_name: String,
    pub message: String,
    pub call_stack: Vec<StackFrame>,
    pub pos: Pos,
}

impl fmt::Display for ExceptionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runtime Error: {}: {}", self.class_name, self.message)?;
        for frame in &self.call_stack {
            write!(f, "\n  at {frame}")?;
        }
        Ok(())
    }
}
