//! Statement and expression evaluation.
//!
//! Every evaluation function is an `impl Interpreter` block in one of the
//! submodules:
//!
//! - `stmt`: statements, loops and `case`
//! - `expr`: expressions, identifiers, literals and type tests
//! - `assign`: assignable places and stores into them
//! - `call`: argument binding, overload resolution and the call protocol
//! - `oop`: member access, method dispatch, construction and properties
//! - `exceptions`: `raise`, `try/except/finally` and error conversion
//! - `refcount`: interface reference counting and destructors
//!
//! Errors carry the position of the innermost node they leave; `at_pos`
//! fills it in on the way out.

mod assign;
mod call;
mod exceptions;
mod expr;
mod oop;
mod refcount;
mod stmt;

use dws_ir::{Expr, ExprKind, Pos};
use dws_runtime::ControlAction;

pub(crate) use assign::Place;
pub(crate) use call::{BoundArgs, CallArgs, Invocation};
pub(crate) use oop::MemberAccess;
pub(crate) use refcount::holds_interfaces;

/// Attach `pos` to an error leaving the node at `pos`.
pub(crate) fn at_pos(action: ControlAction, pos: Pos) -> ControlAction {
    match action {
        ControlAction::Error(err) => ControlAction::Error(err.with_pos(pos)),
        ControlAction::Fatal(err) => ControlAction::Fatal(err.with_pos(pos)),
        other => other,
    }
}

/// `Self` written explicitly as a receiver.
pub(crate) fn is_self_expr(expr: &Expr) -> bool {
    matches!(&expr.kind, ExprKind::Ident(name) if name.matches("Self"))
}
