//! Variables, nested scopes and closures.

use dws_eval::RunError;
use dws_ir::build::{
    add, assign, block, call, ident, int, lambda, println, string, ty, var_init, FunctionBuilder,
};
use dws_ir::{Program, Stmt, TypeRef};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::common::{interpreter, run, unhandled};

fn int_function() -> TypeRef {
    TypeRef::Function {
        params: vec![],
        returns: Some(Box::new(ty("Integer"))),
    }
}

#[test]
fn assignment_in_nested_block_updates_outer_variable() {
    let output = run(
        vec![],
        vec![
            var_init("x", Some(ty("Integer")), int(1)),
            block(vec![
                assign(ident("x"), int(2)),
                block(vec![assign(ident("x"), add(ident("x"), int(40)))]),
            ]),
            println(ident("x")),
        ],
    );
    assert_eq!(output, "42\n");
}

#[test]
fn shadowing_declaration_leaves_outer_untouched() {
    let output = run(
        vec![],
        vec![
            var_init("x", Some(ty("Integer")), int(1)),
            block(vec![
                var_init("x", Some(ty("Integer")), int(100)),
                println(ident("x")),
            ]),
            println(ident("x")),
        ],
    );
    assert_eq!(output, "100\n1\n");
}

#[test]
fn block_local_is_gone_after_block() {
    let report = unhandled(
        vec![],
        vec![
            block(vec![var_init("inner", None, string("temp"))]),
            println(ident("inner")),
        ],
    );
    assert_eq!(report.class_name, "Exception");
    assert!(report.message.contains("inner"), "{}", report.message);
}

#[test]
fn names_are_case_insensitive() {
    let output = run(
        vec![],
        vec![
            var_init("Counter", Some(ty("Integer")), int(5)),
            assign(ident("COUNTER"), add(ident("counter"), int(1))),
            println(ident("cOuNtEr")),
        ],
    );
    assert_eq!(output, "6\n");
}

/// `function MakeCounter: function: Integer` returning a lambda over a local.
fn make_counter() -> dws_ir::Decl {
    let tick = FunctionBuilder::lambda(Some(ty("Integer")))
        .body(vec![
            assign(ident("count"), add(ident("count"), int(1))),
            assign(ident("Result"), ident("count")),
        ])
        .build();
    FunctionBuilder::function("MakeCounter", int_function())
        .body(vec![
            var_init("count", Some(ty("Integer")), int(0)),
            assign(ident("Result"), lambda(tick)),
        ])
        .decl()
}

#[test]
fn closure_outlives_creating_frame() {
    let output = run(
        vec![make_counter()],
        vec![
            var_init("c", None, call("MakeCounter", vec![])),
            println(call("c", vec![])),
            println(call("c", vec![])),
            var_init("d", None, call("MakeCounter", vec![])),
            println(call("d", vec![])),
            println(call("c", vec![])),
        ],
    );
    assert_eq!(output, "1\n2\n1\n3\n");
}

#[test]
fn lambda_sees_enclosing_globals() {
    let show = FunctionBuilder::lambda(None)
        .body(vec![println(ident("greeting"))])
        .build();
    let output = run(
        vec![],
        vec![
            var_init("greeting", None, string("before")),
            var_init("show", None, lambda(show)),
            assign(ident("greeting"), string("after")),
            dws_ir::build::expr_stmt(call("show", vec![])),
        ],
    );
    assert_eq!(output, "after\n");
}

/// Nest one block per value; each declares `localN` and adds it to `total`.
fn nested_blocks(values: &[i64], depth: usize) -> Vec<Stmt> {
    let Some((first, rest)) = values.split_first() else {
        return vec![];
    };
    let local = format!("local{depth}");
    let mut stmts = vec![
        var_init(&local, Some(ty("Integer")), int(*first)),
        assign(ident("total"), add(ident("total"), ident(&local))),
    ];
    if !rest.is_empty() {
        stmts.push(block(nested_blocks(rest, depth + 1)));
    }
    stmts
}

proptest! {
    #[test]
    fn nested_scopes_share_outer_and_drop_locals(values in prop::collection::vec(-1000_i64..1000, 1..8)) {
        let mut interp = interpreter();
        let program = Program::new(
            vec![],
            vec![
                var_init("total", Some(ty("Integer")), int(0)),
                block(nested_blocks(&values, 0)),
            ],
        );
        interp.run(&program).unwrap();

        let total = interp.global("total").and_then(|v| v.as_int());
        prop_assert_eq!(total, Some(values.iter().sum::<i64>()));
        for depth in 0..values.len() {
            let lookup = interp.evaluate(&ident(&format!("local{depth}")));
            prop_assert!(matches!(lookup, Err(RunError::Unhandled(_))));
        }
    }
}
