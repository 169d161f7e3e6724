//! Raising, handler selection, `finally` and fatal errors.

use dws_eval::{EvalErrorKind, RunError};
use dws_ir::build::{
    add, array, assign, binary, block, boolean, call, create, expr_stmt, ident, index, int, member,
    on, println, raise, reraise, string, try_except, try_except_else, try_finally, ty, var_init,
    ClassBuilder, FunctionBuilder,
};
use dws_ir::{BinaryOp, Decl, Stmt};
use pretty_assertions::assert_eq;

use crate::common::{run, run_result, unhandled};

fn raise_new(class: &str, message: &str) -> Stmt {
    raise(create(class, vec![string(message)]))
}

#[test]
fn caught_exception_sets_flag_and_is_not_reported() {
    let (result, output) = run_result(
        vec![],
        vec![
            var_init("caught", Some(ty("Boolean")), boolean(false)),
            try_except(
                vec![raise_new("Exception", "x")],
                vec![on(Some("E"), "Exception", assign(ident("caught"), boolean(true)))],
            ),
            println(ident("caught")),
        ],
    );
    assert!(result.is_ok(), "{result:?}");
    assert_eq!(output, "True\n");
}

#[test]
fn first_matching_handler_wins() {
    let output = run(
        vec![],
        vec![try_except(
            vec![raise_new("ERangeError", "r")],
            vec![
                on(Some("E"), "Exception", println(string("A"))),
                on(Some("E"), "ERangeError", println(string("B"))),
            ],
        )],
    );
    assert_eq!(output, "A\n");
}

#[test]
fn unmatched_handlers_let_the_exception_through() {
    let output = run(
        vec![],
        vec![try_except(
            vec![try_except(
                vec![raise_new("EConvertError", "bad number")],
                vec![on(None, "ERangeError", println(string("inner")))],
            )],
            vec![on(
                Some("E"),
                "EConvertError",
                println(add(string("outer: "), member(ident("E"), "Message"))),
            )],
        )],
    );
    assert_eq!(output, "outer: bad number\n");
}

#[test]
fn finally_runs_once_on_normal_completion() {
    let output = run(
        vec![],
        vec![try_finally(
            vec![println(string("body"))],
            vec![println(string("cleanup"))],
        )],
    );
    assert_eq!(output, "body\ncleanup\n");
}

#[test]
fn finally_runs_once_and_exception_reaches_caller() {
    let risky = FunctionBuilder::procedure("Risky")
        .body(vec![try_finally(
            vec![raise_new("Exception", "boom"), println(string("unreachable"))],
            vec![println(string("cleanup"))],
        )])
        .decl();
    let output = run(
        vec![risky],
        vec![try_except(
            vec![expr_stmt(call("Risky", vec![]))],
            vec![on(Some("E"), "Exception", println(member(ident("E"), "Message")))],
        )],
    );
    assert_eq!(output, "cleanup\nboom\n");
}

#[test]
fn bare_raise_in_handler_reraises_current_exception() {
    let output = run(
        vec![],
        vec![try_except(
            vec![try_except(
                vec![raise_new("ERangeError", "again")],
                vec![on(
                    None,
                    "Exception",
                    block(vec![println(string("inner")), reraise()]),
                )],
            )],
            vec![on(
                Some("E"),
                "ERangeError",
                println(add(string("outer "), member(ident("E"), "Message"))),
            )],
        )],
    );
    assert_eq!(output, "inner\nouter again\n");
}

#[test]
fn bare_raise_outside_handler_is_fatal_and_skips_finally() {
    let (result, output) = run_result(
        vec![],
        vec![try_except_else(
            vec![try_finally(vec![reraise()], vec![println(string("finally"))])],
            vec![],
            vec![println(string("caught"))],
        )],
    );
    let Err(RunError::Fatal(err)) = result else {
        panic!("expected a fatal error, got {result:?}");
    };
    assert_eq!(err.kind, EvalErrorKind::BareRaiseOutsideHandler);
    assert_eq!(output, "");
}

#[test]
fn bare_raise_in_finally_while_unwinding_is_fatal() {
    let (result, output) = run_result(
        vec![],
        vec![try_except_else(
            vec![try_finally(
                vec![raise_new("Exception", "boom")],
                vec![
                    println(member(call("ExceptObject", vec![]), "Message")),
                    reraise(),
                ],
            )],
            vec![],
            vec![println(string("caught"))],
        )],
    );
    let Err(RunError::Fatal(err)) = result else {
        panic!("expected a fatal error, got {result:?}");
    };
    assert_eq!(err.kind, EvalErrorKind::BareRaiseOutsideHandler);
    assert_eq!(output, "boom\n");
}

#[test]
fn bare_raise_in_finally_inside_handler_reraises_handled_exception() {
    let output = run(
        vec![],
        vec![try_except(
            vec![try_except(
                vec![raise_new("ERangeError", "handled")],
                vec![on(
                    None,
                    "Exception",
                    try_finally(vec![println(string("body"))], vec![reraise()]),
                )],
            )],
            vec![on(
                Some("E"),
                "ERangeError",
                println(add(string("outer "), member(ident("E"), "Message"))),
            )],
        )],
    );
    assert_eq!(output, "body\nouter handled\n");
}

#[test]
fn catch_all_except_swallows_script_exceptions() {
    let output = run(
        vec![],
        vec![
            try_except(vec![raise_new("Exception", "ignored")], vec![]),
            println(string("went on")),
        ],
    );
    assert_eq!(output, "went on\n");
}

#[test]
fn except_else_branch_catches_unmatched() {
    let output = run(
        vec![],
        vec![try_except_else(
            vec![raise_new("EConvertError", "c")],
            vec![on(None, "ERangeError", println(string("range")))],
            vec![println(string("other"))],
        )],
    );
    assert_eq!(output, "other\n");
}

/// Run `stmts` and print the class of whatever they raise.
fn raised_class(stmts: Vec<Stmt>) -> String {
    run(
        vec![],
        vec![try_except(
            stmts,
            vec![on(Some("E"), "Exception", println(member(ident("E"), "ClassName")))],
        )],
    )
}

#[test]
fn runtime_errors_become_catchable_exception_classes() {
    let cases: Vec<(Vec<Stmt>, &str)> = vec![
        (
            vec![println(binary(BinaryOp::IntDiv, int(1), int(0)))],
            "EDivByZero",
        ),
        (
            vec![
                var_init("big", None, call("High", vec![ident("Integer")])),
                println(add(ident("big"), int(1))),
            ],
            "ERangeError",
        ),
        (
            vec![
                var_init("a", None, array(vec![int(1), int(2), int(3)])),
                println(index(ident("a"), vec![int(5)])),
            ],
            "ERangeError",
        ),
        (
            vec![println(call("StrToInt", vec![string("forty")]))],
            "EConvertError",
        ),
        (
            vec![expr_stmt(call("Assert", vec![boolean(false)]))],
            "EAssertionFailed",
        ),
        (vec![println(ident("nowhere"))], "Exception"),
    ];
    for (stmts, expected) in cases {
        assert_eq!(raised_class(stmts), format!("{expected}\n"));
    }
}

#[test]
fn assertion_message_is_kept() {
    let report = unhandled(
        vec![],
        vec![expr_stmt(call(
            "Assert",
            vec![boolean(false), string("numbers must be positive")],
        ))],
    );
    assert_eq!(report.class_name, "EAssertionFailed");
    assert!(
        report.message.contains("numbers must be positive"),
        "{}",
        report.message
    );
}

#[test]
fn except_object_is_the_exception_being_handled() {
    let output = run(
        vec![],
        vec![
            println(call("Assigned", vec![call("ExceptObject", vec![])])),
            try_except(
                vec![raise_new("Exception", "current")],
                vec![on(
                    None,
                    "Exception",
                    println(member(call("ExceptObject", vec![]), "Message")),
                )],
            ),
        ],
    );
    assert_eq!(output, "False\ncurrent\n");
}

fn custom_error() -> Decl {
    ClassBuilder::new("EMyError")
        .parent("Exception")
        .field_init("Code", ty("Integer"), int(7))
        .decl()
}

#[test]
fn user_exception_class_carries_fields() {
    let output = run(
        vec![custom_error()],
        vec![try_except(
            vec![raise_new("EMyError", "custom")],
            vec![on(
                Some("E"),
                "EMyError",
                block(vec![
                    println(member(ident("E"), "Message")),
                    println(member(ident("E"), "Code")),
                ]),
            )],
        )],
    );
    assert_eq!(output, "custom\n7\n");
}

#[test]
fn unhandled_exception_reports_class_message_and_frames() {
    let fail = FunctionBuilder::procedure("Fail")
        .body(vec![raise_new("EMyError", "deep failure")])
        .decl();
    let caller = FunctionBuilder::procedure("Caller")
        .body(vec![expr_stmt(call("Fail", vec![]))])
        .decl();
    let report = unhandled(
        vec![custom_error(), fail, caller],
        vec![expr_stmt(call("Caller", vec![]))],
    );
    assert_eq!(report.class_name, "EMyError");
    assert_eq!(report.message, "deep failure");
    let frames: Vec<&str> = report
        .call_stack
        .iter()
        .map(|frame| frame.function.as_str())
        .collect();
    assert_eq!(frames, vec!["Caller", "Fail"]);
    assert!(report
        .to_string()
        .starts_with("Runtime Error: EMyError: deep failure"));
}

#[test]
fn exception_leaves_loop_and_function_frames() {
    let output = run(
        vec![],
        vec![
            var_init("count", Some(ty("Integer")), int(0)),
            try_except(
                vec![dws_ir::build::for_to(
                    "i",
                    int(1),
                    int(10),
                    block(vec![
                        assign(ident("count"), ident("i")),
                        dws_ir::build::if_then(
                            dws_ir::build::eq(ident("i"), int(3)),
                            raise_new("Exception", "stop"),
                        ),
                    ]),
                )],
                vec![on(None, "Exception", println(ident("count")))],
            ),
        ],
    );
    assert_eq!(output, "3\n");
}
