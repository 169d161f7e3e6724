//! Built-in classes every program starts with.
//!
//! `TObject` is the root of all classes. `Exception` and its descendants
//! are what evaluation errors turn into when a script catches them.
//! `Free`, `ClassName` and `ClassType` are answered natively by the call
//! engine and are not declared here.

use dws_ir::build::{assign, ident, member, ty, ClassBuilder, FunctionBuilder};
use dws_ir::{Decl, MethodFlags};
use dws_runtime::class_names;

use crate::interpreter::Interpreter;

/// Exception classes that add nothing to `Exception` but their name.
const PLAIN_EXCEPTIONS: &[&str] = &[
    class_names::ECONVERT_ERROR,
    class_names::ERANGE_ERROR,
    class_names::EDIV_BY_ZERO,
    class_names::EASSERTION_FAILED,
    class_names::EINVALID_OP,
    class_names::ESCRIPT_STACK_OVERFLOW,
];

pub(crate) fn prelude_decls() -> Vec<Decl> {
    let mut decls = vec![
        ClassBuilder::new(class_names::TOBJECT)
            .method(
                FunctionBuilder::constructor("Create")
                    .flags(MethodFlags::VIRTUAL)
                    .build(),
            )
            .method(FunctionBuilder::destructor("Destroy").build())
            .decl(),
        ClassBuilder::new(class_names::EXCEPTION)
            .parent(class_names::TOBJECT)
            .field("Message", ty("String"))
            .method(
                FunctionBuilder::constructor("Create")
                    .param("Msg", ty("String"))
                    .body(vec![assign(member(ident("Self"), "Message"), ident("Msg"))])
                    .build(),
            )
            .decl(),
    ];
    decls.extend(PLAIN_EXCEPTIONS.iter().map(|name| {
        ClassBuilder::new(name)
            .parent(class_names::EXCEPTION)
            .decl()
    }));
    decls.push(
        ClassBuilder::new(class_names::EHOST)
            .parent(class_names::EXCEPTION)
            .field("ExceptionClass", ty("String"))
            .decl(),
    );
    decls
}

impl Interpreter {
    pub(crate) fn install_prelude(&mut self) {
        if let Err(err) = self.declare_all(&prelude_decls()) {
            tracing::error!(?err, "built-in class declaration failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_exception_classes_descend_from_exception() {
        let interpreter = Interpreter::new();
        for name in PLAIN_EXCEPTIONS.iter().chain([&class_names::EHOST]) {
            let class = interpreter.types().class(name);
            assert!(
                class.is_some_and(|c| c.is_descendant_of_name(class_names::EXCEPTION)),
                "{name} should descend from Exception"
            );
        }
    }

    #[test]
    fn test_exception_has_message_field() {
        let interpreter = Interpreter::new();
        let class = interpreter.types().class("Exception");
        let fields: Vec<String> = class
            .map(|c| c.all_fields().iter().map(|f| f.name.to_string()).collect())
            .unwrap_or_default();
        assert_eq!(fields, vec!["Message".to_string()]);
    }
}
