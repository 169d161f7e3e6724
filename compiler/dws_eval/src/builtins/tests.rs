#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use dws_ir::build::{
    array, call, enum_decl, expr_stmt, float, ident, int, on, println, set, set_item, string,
    try_except, ty, var, var_init,
};
use dws_ir::{Program, Stmt, TypeRef};
use dws_runtime::Value;
use pretty_assertions::assert_eq;

use crate::interpreter::{Interpreter, RunError};
use crate::print_handler::buffer_handler;

fn interpreter() -> Interpreter {
    Interpreter::builder().print_handler(buffer_handler()).build()
}

fn eval(name: &str, args: Vec<dws_ir::Expr>) -> Value {
    interpreter().evaluate(&call(name, args)).unwrap()
}

fn eval_str(name: &str, args: Vec<dws_ir::Expr>) -> String {
    eval(name, args).as_str().unwrap().to_string()
}

fn eval_int(name: &str, args: Vec<dws_ir::Expr>) -> i64 {
    eval(name, args).as_int().unwrap()
}

fn unhandled_class(result: Result<impl std::fmt::Debug, RunError>) -> String {
    match result {
        Err(RunError::Unhandled(report)) => report.class_name,
        other => panic!("expected an unhandled exception, got {other:?}"),
    }
}

fn run_output(decls: Vec<dws_ir::Decl>, body: Vec<Stmt>) -> String {
    let mut interp = interpreter();
    interp.run(&Program::new(decls, body)).unwrap();
    interp.get_print_output()
}

#[test]
fn test_string_builtins_are_one_based() {
    assert_eq!(eval_str("Copy", vec![string("hello"), int(2), int(3)]), "ell");
    assert_eq!(eval_str("Copy", vec![string("hello"), int(4)]), "lo");
    assert_eq!(eval_int("Pos", vec![string("lo"), string("hello")]), 4);
    assert_eq!(eval_int("Pos", vec![string("x"), string("hello")]), 0);
    assert_eq!(eval_int("Pos", vec![string("l"), string("hello"), int(4)]), 4);
    assert_eq!(eval_int("Length", vec![string("héllo")]), 5);
}

#[test]
fn test_case_and_trim() {
    assert_eq!(eval_str("UpperCase", vec![string("abc")]), "ABC");
    assert_eq!(eval_str("LowerCase", vec![string("ABC")]), "abc");
    assert_eq!(eval_str("Trim", vec![string("  x ")]), "x");
    assert_eq!(eval_str("StringOfChar", vec![string("-"), int(3)]), "---");
}

#[test]
fn test_conversions() {
    assert_eq!(eval_int("StrToInt", vec![string(" 42 ")]), 42);
    assert_eq!(eval_int("StrToInt", vec![string("$FF")]), 255);
    assert_eq!(eval_int("StrToIntDef", vec![string("x"), int(7)]), 7);
    assert_eq!(eval_str("IntToStr", vec![int(-3)]), "-3");
    assert_eq!(eval_str("IntToHex", vec![int(255), int(4)]), "00FF");
    assert_eq!(eval_str("Chr", vec![int(65)]), "A");
    assert_eq!(eval_int("Ord", vec![string("A")]), 65);
}

#[test]
fn test_failed_conversion_raises_econvert_error() {
    let mut interp = interpreter();
    let result = interp.evaluate(&call("StrToInt", vec![string("abc")]));
    assert_eq!(unhandled_class(result), "EConvertError");
}

#[test]
fn test_wrong_arg_count() {
    let mut interp = interpreter();
    let result = interp.evaluate(&call("Trim", vec![]));
    assert_eq!(unhandled_class(result), "Exception");
}

#[test]
fn test_high_low() {
    assert_eq!(eval_int("High", vec![ident("Integer")]), i64::MAX);
    assert_eq!(eval_int("Low", vec![ident("Integer")]), i64::MIN);
    assert_eq!(eval_int("High", vec![array(vec![int(1), int(2), int(3)])]), 2);
    assert_eq!(eval_int("Low", vec![array(vec![int(1)])]), 0);
}

#[test]
fn test_enum_succ_pred() {
    let output = run_output(
        vec![enum_decl("TColor", &["Red", "Green", "Blue"])],
        vec![
            println(call("Ord", vec![call("Succ", vec![ident("Red")])])),
            println(call("Ord", vec![call("Pred", vec![ident("Blue")])])),
            println(call("Ord", vec![call("High", vec![ident("TColor")])])),
        ],
    );
    assert_eq!(output, "1\n1\n2\n");
}

#[test]
fn test_succ_past_last_member_is_range_error() {
    let mut interp = interpreter();
    let result = interp.run(&Program::new(
        vec![enum_decl("TColor", &["Red", "Green"])],
        vec![expr_stmt(call("Succ", vec![ident("Green")]))],
    ));
    assert_eq!(unhandled_class(result), "ERangeError");
}

#[test]
fn test_min_max_keep_integers() {
    assert_eq!(eval_int("Min", vec![int(3), int(-2)]), -2);
    assert_eq!(eval_int("Max", vec![int(3), int(-2)]), 3);
    assert!(matches!(eval("Abs", vec![int(-4)]), Value::Integer(4)));
}

#[test]
fn test_inc_dec_write_back() {
    let output = run_output(
        vec![],
        vec![
            var_init("n", Some(ty("Integer")), int(10)),
            expr_stmt(call("Inc", vec![ident("n")])),
            expr_stmt(call("Inc", vec![ident("n"), int(5)])),
            expr_stmt(call("Dec", vec![ident("n"), int(2)])),
            println(ident("n")),
        ],
    );
    assert_eq!(output, "14\n");
}

#[test]
fn test_string_insert_delete_setlength() {
    let output = run_output(
        vec![],
        vec![
            var_init("s", Some(ty("String")), string("held")),
            expr_stmt(call("Insert", vec![string("llo wor"), ident("s"), int(3)])),
            println(ident("s")),
            expr_stmt(call("Delete", vec![ident("s"), int(1), int(6)])),
            println(ident("s")),
            expr_stmt(call("SetLength", vec![ident("s"), int(3)])),
            println(ident("s")),
        ],
    );
    assert_eq!(output, "hello world\nworld\nwor\n");
}

#[test]
fn test_setlength_grows_dynamic_array_with_defaults() {
    let output = run_output(
        vec![],
        vec![
            var("a", TypeRef::array_of(ty("Integer"))),
            expr_stmt(call("SetLength", vec![ident("a"), int(3)])),
            println(call("Length", vec![ident("a")])),
            println(ident("a")),
        ],
    );
    assert_eq!(output, "3\n[0, 0, 0]\n");
}

#[test]
fn test_include_exclude() {
    let output = run_output(
        vec![enum_decl("TColor", &["Red", "Green", "Blue"])],
        vec![
            var("s", TypeRef::set_of(ty("TColor"))),
            expr_stmt(call("Include", vec![ident("s"), ident("Blue")])),
            expr_stmt(call("Include", vec![ident("s"), ident("Red")])),
            expr_stmt(call("Exclude", vec![ident("s"), ident("Blue")])),
            println(ident("s")),
            var_init("t", None, set(vec![set_item(ident("Green"))])),
            println(call("Length", vec![ident("t")])),
        ],
    );
    assert_eq!(output, "[Red]\n1\n");
}

#[test]
fn test_assert_failure_carries_message() {
    let mut interp = interpreter();
    let result = interp.execute(&[expr_stmt(call(
        "Assert",
        vec![dws_ir::build::boolean(false), string("boom")],
    ))]);
    let Err(RunError::Unhandled(report)) = result else {
        panic!("expected EAssertionFailed");
    };
    assert_eq!(report.class_name, "EAssertionFailed");
    assert!(report.message.contains("boom"), "{}", report.message);
}

#[test]
fn test_except_object_inside_and_outside_handlers() {
    let output = run_output(
        vec![],
        vec![
            println(call("Assigned", vec![ident("ExceptObject")])),
            try_except(
                vec![expr_stmt(call("StrToInt", vec![string("nope")]))],
                vec![on(
                    None,
                    "EConvertError",
                    println(call("Assigned", vec![ident("ExceptObject")])),
                )],
            ),
        ],
    );
    assert_eq!(output, "False\nTrue\n");
}

#[test]
fn test_variant_helpers() {
    let output = run_output(
        vec![],
        vec![
            var("v", ty("Variant")),
            println(call("VarIsEmpty", vec![ident("v")])),
            println(ident("v")),
            println(call("VarToStr", vec![ident("v")])),
        ],
    );
    assert_eq!(output, "True\nUnassigned\n\n");
}

#[test]
fn test_json_builtins() {
    assert_eq!(eval_str("ToJSON", vec![array(vec![int(1), int(2)])]), "[1,2]");
    let parsed = eval("ParseJSON", vec![string(r#"{"a": 1, "b": [true]}"#)]);
    let Value::Record(record) = parsed else {
        panic!("expected a record");
    };
    // Fields of the anonymous record type are Variants holding the parsed kind.
    let field = record.get("a");
    assert!(matches!(field, Some(Value::Variant(Some(_)))), "{field:?}");
    assert_eq!(field.as_ref().map(Value::unboxed), Some(&Value::Integer(1)));
}

#[test]
fn test_print_concatenates_arguments() {
    let output = run_output(
        vec![],
        vec![
            expr_stmt(call("Print", vec![string("a"), int(1)])),
            expr_stmt(call("PrintLn", vec![string("b")])),
        ],
    );
    assert_eq!(output, "a1b\n");
}

#[test]
fn test_decode_date_and_time() {
    // 45000.75 is 2023-03-15 18:00.
    let output = run_output(
        vec![],
        vec![
            var("y", ty("Integer")),
            var("m", ty("Integer")),
            var("d", ty("Integer")),
            var("ms", ty("Integer")),
            expr_stmt(call(
                "DecodeDate",
                vec![float(45000.75), ident("y"), ident("m"), ident("d")],
            )),
            println(ident("y")),
            println(ident("m")),
            println(ident("d")),
            expr_stmt(call(
                "DecodeTime",
                vec![float(45000.75), ident("y"), ident("m"), ident("d"), ident("ms")],
            )),
            println(ident("y")),
            println(ident("m")),
            println(ident("ms")),
        ],
    );
    assert_eq!(output, "2023\n3\n15\n18\n0\n0\n");
}

#[test]
fn test_decode_date_day_zero() {
    let output = run_output(
        vec![],
        vec![
            var("y", ty("Integer")),
            var("m", ty("Integer")),
            var("d", ty("Integer")),
            expr_stmt(call(
                "DecodeDate",
                vec![int(0), ident("y"), ident("m"), ident("d")],
            )),
            println(ident("y")),
            println(ident("m")),
            println(ident("d")),
        ],
    );
    assert_eq!(output, "1899\n12\n30\n");
}
