//! Function pointers and lazy-parameter thunks.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use dws_ir::{Expr, FunctionDecl, Name};

use super::Value;
use crate::environment::{LocalScope, Scope};

/// What a function pointer invokes.
#[derive(Clone)]
pub enum CallTarget {
    /// A declared function, procedure or method.
    Function(Rc<FunctionDecl>),
    /// An anonymous function literal.
    Lambda(Rc<FunctionDecl>),
    /// An entry of the built-in registry.
    Builtin(Name),
    /// An entry of the external (FFI) registry.
    External(Name),
}

impl CallTarget {
    pub fn decl(&self) -> Option<&Rc<FunctionDecl>> {
        match self {
            CallTarget::Function(decl) | CallTarget::Lambda(decl) => Some(decl),
            CallTarget::Builtin(_) | CallTarget::External(_) => None,
        }
    }
}

/// A callable value: target, captured scope and optional bound receiver.
#[derive(Clone)]
pub struct FunctionPointer {
    pub target: CallTarget,
    /// Scope captured at creation (lambdas and nested functions). `None`
    /// calls in a scope enclosing the caller's.
    pub closure: Option<LocalScope<Scope>>,
    /// `Self` for method pointers.
    pub receiver: Option<Box<Value>>,
}

impl FunctionPointer {
    pub fn function(decl: Rc<FunctionDecl>) -> Self {
        FunctionPointer {
            target: CallTarget::Function(decl),
            closure: None,
            receiver: None,
        }
    }

    pub fn lambda(decl: Rc<FunctionDecl>, closure: LocalScope<Scope>) -> Self {
        FunctionPointer {
            target: CallTarget::Lambda(decl),
            closure: Some(closure),
            receiver: None,
        }
    }

    pub fn method(decl: Rc<FunctionDecl>, receiver: Value) -> Self {
        FunctionPointer {
            target: CallTarget::Function(decl),
            closure: None,
            receiver: Some(Box::new(receiver)),
        }
    }

    pub fn builtin(name: Name) -> Self {
        FunctionPointer {
            target: CallTarget::Builtin(name),
            closure: None,
            receiver: None,
        }
    }

    pub fn external(name: Name) -> Self {
        FunctionPointer {
            target: CallTarget::External(name),
            closure: None,
            receiver: None,
        }
    }

    /// Display name: `Name`, `Class.Name` for method pointers, `<lambda>`.
    pub fn name(&self) -> String {
        match &self.target {
            CallTarget::Lambda(_) => "<lambda>".to_string(),
            CallTarget::Builtin(name) | CallTarget::External(name) => name.to_string(),
            CallTarget::Function(decl) => match self.receiver.as_deref() {
                Some(Value::Object(obj)) => format!("{}.{}", obj.class_name(), decl.name),
                Some(Value::Record(rec)) => format!("{}.{}", rec.type_name(), decl.name),
                Some(Value::ClassRef(class)) => format!("{}.{}", class.name, decl.name),
                _ => decl.name.to_string(),
            },
        }
    }

    /// Same target, same receiver identity.
    pub fn same_target(&self, other: &FunctionPointer) -> bool {
        let target = match (&self.target, &other.target) {
            (CallTarget::Function(a), CallTarget::Function(b))
            | (CallTarget::Lambda(a), CallTarget::Lambda(b)) => Rc::ptr_eq(a, b),
            (CallTarget::Builtin(a), CallTarget::Builtin(b))
            | (CallTarget::External(a), CallTarget::External(b)) => a == b,
            _ => false,
        };
        let receiver = match (self.receiver.as_deref(), other.receiver.as_deref()) {
            (None, None) => true,
            (Some(Value::Object(a)), Some(Value::Object(b))) => a.ptr_eq(b),
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        target && receiver
    }
}

impl PartialEq for FunctionPointer {
    fn eq(&self, other: &Self) -> bool {
        self.same_target(other)
    }
}

impl fmt::Debug for FunctionPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name())
    }
}

/// An unevaluated lazy argument and the scope to evaluate it in.
///
/// The first read forces the expression; later reads of the same binding
/// return the cached value.
#[derive(Clone)]
pub struct Thunk(Rc<ThunkState>);

struct ThunkState {
    expr: Expr,
    scope: LocalScope<Scope>,
    cached: RefCell<Option<Value>>,
}

impl Thunk {
    pub fn new(expr: Expr, scope: LocalScope<Scope>) -> Self {
        Thunk(Rc::new(ThunkState {
            expr,
            scope,
            cached: RefCell::new(None),
        }))
    }

    pub fn expr(&self) -> &Expr {
        &self.0.expr
    }

    pub fn scope(&self) -> &LocalScope<Scope> {
        &self.0.scope
    }

    pub fn cached(&self) -> Option<Value> {
        self.0.cached.borrow().clone()
    }

    pub fn store(&self, value: Value) {
        *self.0.cached.borrow_mut() = Some(value);
    }

    pub fn ptr_eq(&self, other: &Thunk) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0.cached.borrow() {
            Some(value) => write!(f, "Thunk({value:?})"),
            None => write!(f, "Thunk(<pending>)"),
        }
    }
}
