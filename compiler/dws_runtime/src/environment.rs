//! Environment for variable scoping in the interpreter.
//!
//! Uses a scope stack (not cloning) for efficient scope management. Each
//! scope links to its lexical parent, so a closure can keep the scope it was
//! created in alive after the creating call has popped it.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use dws_ir::Name;

use crate::value::Value;

/// Whether a variable binding can be reassigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutability {
    /// `var` declarations, parameters, `Result`.
    Mutable,
    /// `const` declarations.
    Immutable,
}

impl Mutability {
    /// Returns `true` if this is `Mutable`.
    #[inline]
    pub fn is_mutable(self) -> bool {
        matches!(self, Mutability::Mutable)
    }
}

/// Error returned by `Scope::assign` when assignment fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignError {
    /// Variable exists but is a constant.
    Immutable,
    /// Variable not found in any scope. Assignment never creates bindings.
    Undefined,
}

/// A single-threaded scope wrapper for reference-counted interior mutability.
///
/// This type wraps `Rc<RefCell<T>>` and enforces that all scope allocations
/// go through the `LocalScope::new()` factory method.
///
/// `LocalScope<T>` is NOT thread-safe. One interpreter runs one program on
/// one thread.
#[repr(transparent)]
pub struct LocalScope<T>(Rc<RefCell<T>>);

impl<T> LocalScope<T> {
    #[inline]
    pub fn new(value: T) -> Self {
        LocalScope(Rc::new(RefCell::new(value)))
    }

    #[inline]
    pub fn borrow(&self) -> std::cell::Ref<'_, T> {
        self.0.borrow()
    }

    #[inline]
    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Identity comparison.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of live handles to this scope (stack entry, closures,
    /// thunks, references, child scopes).
    #[inline]
    pub fn holders(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl<T> Clone for LocalScope<T> {
    #[inline]
    fn clone(&self) -> Self {
        LocalScope(Rc::clone(&self.0))
    }
}

impl<T> fmt::Debug for LocalScope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Scopes are cyclic through closures; print identity only.
        write!(f, "LocalScope({:p})", Rc::as_ptr(&self.0))
    }
}

impl<T: Default> Default for LocalScope<T> {
    fn default() -> Self {
        LocalScope::new(T::default())
    }
}

impl<T> Deref for LocalScope<T> {
    type Target = RefCell<T>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A single scope containing variable bindings.
#[derive(Clone, Debug)]
pub struct Scope {
    /// Variable bindings in this scope, keyed case-insensitively.
    bindings: FxHashMap<Name, Binding>,
    /// Parent scope (lexical enclosure).
    parent: Option<LocalScope<Scope>>,
}

/// A variable binding.
#[derive(Clone, Debug)]
struct Binding {
    value: Value,
    mutability: Mutability,
}

impl Scope {
    /// Create a new empty scope with no parent.
    pub fn new() -> Self {
        Scope {
            bindings: FxHashMap::default(),
            parent: None,
        }
    }

    /// Create a new scope with a parent.
    pub fn with_parent(parent: LocalScope<Scope>) -> Self {
        Scope {
            bindings: FxHashMap::default(),
            parent: Some(parent),
        }
    }

    /// Define a variable in this scope, overwriting a binding of the same
    /// name in this scope only.
    #[inline]
    pub fn define(&mut self, name: Name, value: Value, mutability: Mutability) {
        self.bindings.insert(name, Binding { value, mutability });
    }

    /// Look up a variable, walking the parent chain.
    #[inline]
    pub fn lookup(&self, name: &Name) -> Option<Value> {
        if let Some(binding) = self.bindings.get(name) {
            return Some(binding.value.clone());
        }
        if let Some(parent) = &self.parent {
            return parent.borrow().lookup(name);
        }
        None
    }

    /// Look up a variable in this scope only.
    #[inline]
    pub fn lookup_local(&self, name: &Name) -> Option<Value> {
        self.bindings.get(name).map(|b| b.value.clone())
    }

    /// Whether this scope itself defines `name`.
    #[inline]
    pub fn defines(&self, name: &Name) -> bool {
        self.bindings.contains_key(name)
    }

    /// Assign to the nearest existing binding of `name`.
    #[inline]
    pub fn assign(&mut self, name: &Name, value: Value) -> Result<(), AssignError> {
        if let Some(binding) = self.bindings.get_mut(name) {
            if !binding.mutability.is_mutable() {
                return Err(AssignError::Immutable);
            }
            binding.value = value;
            return Ok(());
        }
        if let Some(parent) = &self.parent {
            return parent.borrow_mut().assign(name, value);
        }
        Err(AssignError::Undefined)
    }

    /// Find the scope in this chain that owns `name`.
    ///
    /// `this` must be the `LocalScope` wrapping `self`.
    pub fn owner_of(this: &LocalScope<Scope>, name: &Name) -> Option<LocalScope<Scope>> {
        let scope = this.borrow();
        if scope.bindings.contains_key(name) {
            return Some(this.clone());
        }
        let parent = scope.parent.clone()?;
        drop(scope);
        Scope::owner_of(&parent, name)
    }

    pub fn parent(&self) -> Option<&LocalScope<Scope>> {
        self.parent.as_ref()
    }

    /// Values bound directly in this scope.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.bindings.values().map(|b| &b.value)
    }

    /// Drop a binding from this scope only.
    pub fn remove(&mut self, name: &Name) -> Option<Value> {
        self.bindings.remove(name).map(|b| b.value)
    }

    /// Name and value of every binding in this scope.
    pub fn bindings(&self) -> impl Iterator<Item = (&Name, &Value)> {
        self.bindings.iter().map(|(name, b)| (name, &b.value))
    }

    /// Remove every binding, returning the values. Used when a call frame
    /// releases what it owned.
    pub fn take_values(&mut self) -> Vec<(Name, Value)> {
        self.bindings
            .drain()
            .map(|(name, binding)| (name, binding.value))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

/// Environment for the interpreter using a scope stack.
///
/// Instead of cloning environments, we maintain a stack of scopes that can
/// be pushed and popped efficiently. A pushed scope normally encloses the
/// current one; calls to closures push a scope enclosing the captured scope
/// instead (`push_enclosed`).
pub struct Environment {
    /// Stack of scopes, with current scope at the top.
    scopes: Vec<LocalScope<Scope>>,
    /// Global scope (always at the bottom).
    global: LocalScope<Scope>,
}

impl Environment {
    /// Create a new environment with a global scope.
    pub fn new() -> Self {
        let global = LocalScope::new(Scope::new());
        Environment {
            scopes: vec![global.clone()],
            global,
        }
    }

    /// Get the current scope depth.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Push a new scope enclosing the current one.
    #[inline]
    pub fn push_scope(&mut self) {
        let parent = self.current_scope();
        self.push_enclosed(parent);
    }

    /// Push a new scope whose lexical parent is `parent`.
    #[inline]
    pub fn push_enclosed(&mut self, parent: LocalScope<Scope>) {
        let new_scope = LocalScope::new(Scope::with_parent(parent));
        self.scopes.push(new_scope);
    }

    /// Pop the current scope from the stack. The global scope is never
    /// popped.
    #[inline]
    pub fn pop_scope(&mut self) -> Option<LocalScope<Scope>> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    /// The current (innermost) scope.
    #[inline]
    pub fn current_scope(&self) -> LocalScope<Scope> {
        self.scopes.last().unwrap_or(&self.global).clone()
    }

    /// The global scope.
    #[inline]
    pub fn global(&self) -> LocalScope<Scope> {
        self.global.clone()
    }

    /// Define a variable in the current scope.
    #[inline]
    pub fn define(&mut self, name: Name, value: Value, mutability: Mutability) {
        self.scopes
            .last()
            .unwrap_or(&self.global)
            .borrow_mut()
            .define(name, value, mutability);
    }

    /// Define a variable in the global scope.
    pub fn define_global(&mut self, name: Name, value: Value, mutability: Mutability) {
        self.global.borrow_mut().define(name, value, mutability);
    }

    /// Look up a variable, starting from the current scope.
    #[inline]
    pub fn lookup(&self, name: &Name) -> Option<Value> {
        self.scopes.last().unwrap_or(&self.global).borrow().lookup(name)
    }

    /// Assign to the nearest existing binding. Fails rather than creating a
    /// global when `name` is undefined.
    #[inline]
    pub fn assign(&mut self, name: &Name, value: Value) -> Result<(), AssignError> {
        self.scopes
            .last()
            .unwrap_or(&self.global)
            .borrow_mut()
            .assign(name, value)
    }

    /// The scope that currently owns `name`, if any.
    pub fn owner_of(&self, name: &Name) -> Option<LocalScope<Scope>> {
        Scope::owner_of(self.scopes.last().unwrap_or(&self.global), name)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
