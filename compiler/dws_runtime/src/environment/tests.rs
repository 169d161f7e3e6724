use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn name(s: &str) -> Name {
    Name::new(s)
}

#[test]
fn test_scope_define_lookup() {
    let mut scope = Scope::new();
    scope.define(name("x"), Value::Integer(42), Mutability::Immutable);
    assert_eq!(scope.lookup(&name("x")), Some(Value::Integer(42)));
}

#[test]
fn test_scope_lookup_ignores_case() {
    let mut scope = Scope::new();
    scope.define(name("Counter"), Value::Integer(1), Mutability::Mutable);
    assert_eq!(scope.lookup(&name("COUNTER")), Some(Value::Integer(1)));
    assert!(scope.assign(&name("counter"), Value::Integer(2)).is_ok());
    assert_eq!(scope.lookup(&name("Counter")), Some(Value::Integer(2)));
}

#[test]
fn test_scope_shadowing() {
    let parent = LocalScope::new(Scope::new());
    parent
        .borrow_mut()
        .define(name("x"), Value::Integer(1), Mutability::Immutable);

    let mut child = Scope::with_parent(parent);
    child.define(name("x"), Value::Integer(2), Mutability::Immutable);

    // Child's binding shadows parent's
    assert_eq!(child.lookup(&name("x")), Some(Value::Integer(2)));
}

#[test]
fn test_environment_push_pop() {
    let mut env = Environment::new();
    env.define(name("x"), Value::Integer(1), Mutability::Mutable);

    env.push_scope();
    env.define(name("x"), Value::Integer(2), Mutability::Mutable);
    assert_eq!(env.lookup(&name("x")), Some(Value::Integer(2)));

    env.pop_scope();
    assert_eq!(env.lookup(&name("x")), Some(Value::Integer(1)));
}

#[test]
fn test_assign_in_nested_scope_mutates_outer_binding() {
    let mut env = Environment::new();
    env.define(name("x"), Value::Integer(1), Mutability::Mutable);
    env.push_scope();
    assert!(env.assign(&name("x"), Value::Integer(5)).is_ok());
    env.pop_scope();
    assert_eq!(env.lookup(&name("x")), Some(Value::Integer(5)));
}

#[test]
fn test_assign_never_creates_a_binding() {
    let mut env = Environment::new();
    env.push_scope();
    assert_eq!(
        env.assign(&name("missing"), Value::Integer(1)),
        Err(AssignError::Undefined)
    );
    env.pop_scope();
    assert_eq!(env.lookup(&name("missing")), None);
}

#[test]
fn test_environment_immutable() {
    let mut env = Environment::new();
    env.define(name("x"), Value::Integer(1), Mutability::Immutable);
    assert_eq!(
        env.assign(&name("x"), Value::Integer(2)),
        Err(AssignError::Immutable)
    );
}

#[test]
fn test_global_scope_is_never_popped() {
    let mut env = Environment::new();
    assert!(env.pop_scope().is_none());
    assert_eq!(env.depth(), 1);
}

#[test]
fn test_push_enclosed_uses_given_parent() {
    let mut env = Environment::new();
    env.push_scope();
    env.define(name("captured"), Value::Integer(7), Mutability::Mutable);
    let closure_scope = env.current_scope();
    env.pop_scope();

    // The creating scope is gone from the stack but still reachable.
    assert_eq!(env.lookup(&name("captured")), None);
    env.push_enclosed(closure_scope.clone());
    assert_eq!(env.lookup(&name("captured")), Some(Value::Integer(7)));
    assert!(env.assign(&name("captured"), Value::Integer(8)).is_ok());
    env.pop_scope();
    assert_eq!(
        closure_scope.borrow().lookup(&name("captured")),
        Some(Value::Integer(8))
    );
}

#[test]
fn test_owner_of_finds_defining_scope() {
    let mut env = Environment::new();
    env.define(name("g"), Value::Integer(0), Mutability::Mutable);
    env.push_scope();
    let owner = env.owner_of(&name("g"));
    assert!(owner.is_some_and(|s| s.ptr_eq(&env.global())));
    assert!(env.owner_of(&name("nope")).is_none());
}

proptest! {
    #[test]
    fn nested_define_is_invisible_after_pop(
        outer in any::<i64>(),
        inner in any::<i64>(),
        depth in 1usize..8,
    ) {
        let mut env = Environment::new();
        env.define(name("v"), Value::Integer(outer), Mutability::Mutable);
        for _ in 0..depth {
            env.push_scope();
        }
        prop_assert_eq!(env.lookup(&name("v")), Some(Value::Integer(outer)));
        env.define(name("v"), Value::Integer(inner), Mutability::Mutable);
        env.define(name("only_inner"), Value::Integer(inner), Mutability::Mutable);
        for _ in 0..depth {
            env.pop_scope();
        }
        prop_assert_eq!(env.lookup(&name("v")), Some(Value::Integer(outer)));
        prop_assert_eq!(env.lookup(&name("only_inner")), None);
    }

    #[test]
    fn nested_set_mutates_outer(start in any::<i64>(), updated in any::<i64>(), depth in 1usize..8) {
        let mut env = Environment::new();
        env.define(name("v"), Value::Integer(start), Mutability::Mutable);
        for _ in 0..depth {
            env.push_scope();
        }
        prop_assert!(env.assign(&name("V"), Value::Integer(updated)).is_ok());
        for _ in 0..depth {
            env.pop_scope();
        }
        prop_assert_eq!(env.lookup(&name("v")), Some(Value::Integer(updated)));
    }
}
