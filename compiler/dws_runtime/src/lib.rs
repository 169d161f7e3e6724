//! DWS Runtime - Values, scopes, type descriptors and errors.
//!
//! This crate holds the data the evaluator manipulates:
//! - `Value`: the closed runtime value union with explicit copy discipline
//! - `Environment`/`Scope`: lexical scope chains with closure capture
//! - `TypeRegistry`: class, record, interface, enum and helper descriptors
//! - `EvalError`/`ControlAction`: the error taxonomy and unwinding signals
//! - `json` and `marshal`: the JSON and host-function value boundaries

pub mod convert;
mod environment;
pub mod errors;
mod exception;
pub mod json;
pub mod marshal;
pub mod types;
pub mod value;

pub use environment::{AssignError, Environment, LocalScope, Mutability, Scope};
pub use errors::{ControlAction, EvalError, EvalErrorKind, EvalNote, EvalResult};
pub use exception::{class_names, ExceptionReport, ExceptionValue, StackFrame};
pub use marshal::{FromValue, HostError, HostValue, IntoValue};
pub use types::{
    ArrayType, ClassInfo, EnumType, FieldInfo, HelperInfo, InterfaceInfo, MethodRef,
    OperatorEntry, PropertyAccess, PropertyInfo, RecordType, TypeEntry, TypeId, TypeMeta,
    TypeRegistry,
};
pub use value::{
    ArrayValue, CallTarget, EnumValue, FunctionPointer, InterfaceValue, ObjectRef, RecordValue,
    ReferenceValue, SetDomain, SetValue, Thunk, Value, ValueTag,
};
