#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use dws_ir::build::{
    add, assign, call, expr_stmt, ident, int, println, raise, reraise, string, ty, var_init,
    FunctionBuilder,
};
use dws_ir::{Decl, Program};
use dws_runtime::{EvalErrorKind, EvalResult, Value};
use pretty_assertions::assert_eq;

use super::*;
use crate::config::CancellationToken;
use crate::print_handler::buffer_handler;

fn interpreter() -> Interpreter {
    Interpreter::builder().print_handler(buffer_handler()).build()
}

fn square() -> Decl {
    FunctionBuilder::function("Square", ty("Integer"))
        .param("x", ty("Integer"))
        .body(vec![assign(
            ident("Result"),
            dws_ir::build::mul(ident("x"), ident("x")),
        )])
        .decl()
}

/// `function Down(n: Integer): Integer; begin Result := Down(n + 1); end;`
fn endless() -> Decl {
    FunctionBuilder::function("Down", ty("Integer"))
        .param("n", ty("Integer"))
        .body(vec![assign(
            ident("Result"),
            call("Down", vec![add(ident("n"), int(1))]),
        )])
        .decl()
}

#[test]
fn print_handler_integration_println() {
    let interpreter = interpreter();
    interpreter.print_handler().println("hello world");
    assert_eq!(interpreter.get_print_output(), "hello world\n");
}

#[test]
fn print_handler_integration_clear() {
    let interpreter = interpreter();
    interpreter.print_handler().println("first");
    interpreter.clear_print_output();
    interpreter.print_handler().println("second");
    assert_eq!(interpreter.get_print_output(), "second\n");
}

#[test]
fn default_handler_is_stdout() {
    let interpreter = Interpreter::new();
    assert_eq!(interpreter.get_print_output(), "");
}

#[test]
fn handler_shared_between_interpreters() {
    let handler = buffer_handler();
    let mut first = Interpreter::builder().print_handler(handler.clone()).build();
    let mut second = Interpreter::builder().print_handler(handler.clone()).build();
    first.execute(&[println(string("from 1"))]).unwrap();
    second.execute(&[println(string("from 2"))]).unwrap();
    assert_eq!(handler.get_output(), "from 1\nfrom 2\n");
}

#[test]
fn test_host_calls_declared_function() {
    let mut interp = interpreter();
    interp.declare(&[square()]).unwrap();
    let result = interp.call("square", vec![Value::Integer(7)]).unwrap();
    assert_eq!(result.as_int(), Some(49));
}

#[test]
fn test_call_unknown_function_is_unhandled() {
    let mut interp = interpreter();
    let Err(RunError::Unhandled(report)) = interp.call("Nope", vec![]) else {
        panic!("expected an unhandled exception");
    };
    assert_eq!(report.class_name, "Exception");
}

#[test]
fn test_globals_are_visible_to_host() {
    let mut interp = interpreter();
    interp
        .run(&Program::new(
            vec![square()],
            vec![var_init("answer", None, call("Square", vec![int(6)]))],
        ))
        .unwrap();
    assert_eq!(interp.global("ANSWER").and_then(|v| v.as_int()), Some(36));
    assert!(interp.global("missing").is_none());
}

#[test]
fn test_evaluate_sees_previous_statements() {
    let mut interp = interpreter();
    interp
        .execute(&[var_init("x", Some(ty("Integer")), int(40))])
        .unwrap();
    let value = interp.evaluate(&add(ident("x"), int(2))).unwrap();
    assert_eq!(value.as_int(), Some(42));
}

#[test]
fn test_recursion_limit_raises_stack_overflow() {
    let mut interp = Interpreter::builder()
        .print_handler(buffer_handler())
        .max_recursion_depth(Some(16))
        .build();
    interp.declare(&[endless()]).unwrap();
    let Err(RunError::Unhandled(report)) = interp.call("Down", vec![Value::Integer(0)]) else {
        panic!("expected EScriptStackOverflow");
    };
    assert_eq!(report.class_name, "EScriptStackOverflow");
    assert_eq!(report.call_stack.len(), 16);
    assert_eq!(interp.call_depth(), 0);
}

#[test]
fn test_cancellation_is_fatal() {
    let token = CancellationToken::new();
    let mut interp = Interpreter::builder()
        .print_handler(buffer_handler())
        .cancellation(token.clone())
        .build();
    token.cancel();
    let Err(RunError::Fatal(err)) = interp.execute(&[println(string("never"))]) else {
        panic!("expected a fatal error");
    };
    assert_eq!(err.kind, EvalErrorKind::Cancelled);
    assert_eq!(interp.get_print_output(), "");

    token.reset();
    interp.execute(&[println(string("again"))]).unwrap();
    assert_eq!(interp.get_print_output(), "again\n");
}

#[test]
fn test_bare_raise_outside_handler_is_fatal() {
    let mut interp = interpreter();
    let Err(error) = interp.execute(&[reraise()]) else {
        panic!("expected a fatal error");
    };
    assert!(error.report().is_none());
    let RunError::Fatal(err) = error else {
        panic!("expected a fatal error");
    };
    assert_eq!(err.kind, EvalErrorKind::BareRaiseOutsideHandler);
}

#[test]
fn test_report_frames_are_oldest_first() {
    let inner = FunctionBuilder::procedure("Inner")
        .body(vec![raise(dws_ir::build::create(
            "Exception",
            vec![string("deep")],
        ))])
        .decl();
    let outer = FunctionBuilder::procedure("Outer")
        .body(vec![expr_stmt(call("Inner", vec![]))])
        .decl();
    let mut interp = Interpreter::builder()
        .print_handler(buffer_handler())
        .source_file("main.dws")
        .build();
    let result = interp.run(&Program::new(
        vec![inner, outer],
        vec![expr_stmt(call("Outer", vec![]))],
    ));
    let Err(RunError::Unhandled(report)) = result else {
        panic!("expected an unhandled exception");
    };
    let names: Vec<&str> = report
        .call_stack
        .iter()
        .map(|frame| frame.function.as_str())
        .collect();
    assert_eq!(names, vec!["Outer", "Inner"]);
    assert!(report.call_stack.iter().all(|frame| frame.file == "main.dws"));
    assert!(report.to_string().starts_with("Runtime Error: Exception: deep"));
}

fn shout(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    let text = args.first().and_then(Value::as_str).unwrap_or_default();
    Ok(Value::string(format!("{}!", text.to_uppercase())))
}

#[test]
fn test_builder_adds_and_replaces_builtins() {
    let mut interp = Interpreter::builder()
        .print_handler(buffer_handler())
        .builtin("Shout", shout)
        .builtin("UpperCase", shout)
        .build();
    interp
        .execute(&[
            println(call("shout", vec![string("hi")])),
            println(call("UpperCase", vec![string("x")])),
        ])
        .unwrap();
    assert_eq!(interp.get_print_output(), "HI!\nX!\n");
}

#[test]
fn test_scoped_guard_pops_on_drop() {
    let mut interp = interpreter();
    let depth = interp.env.depth();
    {
        let mut scoped = interp.scoped();
        scoped
            .env
            .define(Name::new("tmp"), Value::Integer(1), dws_runtime::Mutability::Mutable);
        assert_eq!(scoped.env.depth(), depth + 1);
    }
    assert_eq!(interp.env.depth(), depth);
    assert!(interp.env.lookup(&Name::new("tmp")).is_none());
}

#[test]
fn test_recursion_limit_holds_on_a_small_thread_stack() {
    let handle = std::thread::Builder::new()
        .stack_size(256 * 1024)
        .spawn(|| {
            let mut interp = interpreter();
            interp.declare(&[endless()]).unwrap();
            match interp.call("Down", vec![Value::Integer(0)]) {
                Err(RunError::Unhandled(report)) => (report.class_name, report.call_stack.len()),
                other => panic!("expected EScriptStackOverflow, got {other:?}"),
            }
        })
        .unwrap();
    let (class_name, frames) = handle.join().unwrap();
    assert_eq!(class_name, "EScriptStackOverflow");
    assert_eq!(frames, crate::DEFAULT_MAX_RECURSION_DEPTH);
}

#[test]
fn test_deeply_nested_expression_evaluates() {
    let handle = std::thread::Builder::new()
        .stack_size(256 * 1024)
        .spawn(|| {
            let mut expr = int(0);
            for _ in 0..2000 {
                expr = add(expr, int(1));
            }
            let value = interpreter()
                .evaluate(&expr)
                .map(|v| v.as_int())
                .map_err(|err| err.to_string());
            // Dropping the tree recurses too; keep it off this small stack.
            std::mem::forget(expr);
            value
        })
        .unwrap();
    assert_eq!(handle.join().unwrap().unwrap(), Some(2000));
}

#[test]
fn test_enums_get_distinct_type_ids() {
    let mut interp = interpreter();
    interp
        .declare(&[
            dws_ir::build::enum_decl("TSuit", &["Hearts", "Spades"]),
            dws_ir::build::enum_decl("TRank", &["Ace", "King"]),
        ])
        .unwrap();
    let enum_id = |name: &str| match interp.types().lookup(name) {
        Some(dws_runtime::types::TypeEntry::Enum(ty)) => ty.id,
        _ => panic!("{name} is not an enum"),
    };
    assert_ne!(enum_id("TSuit"), enum_id("TRank"));
}
