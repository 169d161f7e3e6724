//! RAII scope guards for the interpreter's scope chain.
//!
//! [`ScopedInterpreter`] holds `&mut Interpreter` and pops the scope it
//! pushed when dropped, including when a `?` leaves early. It derefs to the
//! interpreter, so code inside a scope reads the same as code outside.
//!
//! ```text
//! {
//!     let mut scoped = interpreter.scoped();
//!     scoped.env.define(name, value, Mutability::Mutable);
//!     scoped.exec_stmts(body)?;
//! } // scope popped here
//! ```

use std::ops::{Deref, DerefMut};

use dws_runtime::{LocalScope, Scope};

use super::Interpreter;

/// Guard that pops one scope on drop.
pub struct ScopedInterpreter<'guard> {
    interpreter: &'guard mut Interpreter,
}

impl Drop for ScopedInterpreter<'_> {
    fn drop(&mut self) {
        self.interpreter.env.pop_scope();
    }
}

impl Deref for ScopedInterpreter<'_> {
    type Target = Interpreter;

    fn deref(&self) -> &Self::Target {
        self.interpreter
    }
}

impl DerefMut for ScopedInterpreter<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.interpreter
    }
}

impl Interpreter {
    /// Push a child of the current scope; popped when the guard drops.
    pub fn scoped(&mut self) -> ScopedInterpreter<'_> {
        self.env.push_scope();
        ScopedInterpreter { interpreter: self }
    }

    /// Push a scope whose parent is `parent` rather than the current scope.
    ///
    /// Used for calls into lambdas and for forcing lazy arguments, where
    /// name lookup must follow the captured chain.
    pub fn scoped_in(&mut self, parent: LocalScope<Scope>) -> ScopedInterpreter<'_> {
        self.env.push_enclosed(parent);
        ScopedInterpreter { interpreter: self }
    }

    /// Run `f` inside a fresh child scope.
    pub fn with_env_scope<T, F>(&mut self, f: F) -> T
    where
        F: FnOnce(&mut ScopedInterpreter<'_>) -> T,
    {
        let mut scoped = self.scoped();
        f(&mut scoped)
    }
}
