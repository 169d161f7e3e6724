//! Parameter passing, overload resolution, recursion and `Exit`.

use dws_ir::build::{
    add, assign, call, eq, exit_with, expr_stmt, float, for_to, ident, if_else, if_then, int,
    lt, mul, println, string, sub, ty, var_init, FunctionBuilder,
};
use dws_ir::Decl;
use pretty_assertions::assert_eq;

use crate::common::{run, unhandled};

/// `procedure Swap(var a, b: Integer)`.
fn swap() -> Decl {
    FunctionBuilder::procedure("Swap")
        .var_param("a", ty("Integer"))
        .var_param("b", ty("Integer"))
        .body(vec![
            var_init("t", None, ident("a")),
            assign(ident("a"), ident("b")),
            assign(ident("b"), ident("t")),
        ])
        .decl()
}

#[test]
fn var_parameters_write_through() {
    let output = run(
        vec![swap()],
        vec![
            var_init("x", Some(ty("Integer")), int(1)),
            var_init("y", Some(ty("Integer")), int(2)),
            expr_stmt(call("Swap", vec![ident("x"), ident("y")])),
            println(ident("x")),
            println(ident("y")),
        ],
    );
    assert_eq!(output, "2\n1\n");
}

#[test]
fn value_parameters_are_copies() {
    let bump = FunctionBuilder::procedure("Bump")
        .param("n", ty("Integer"))
        .body(vec![assign(ident("n"), add(ident("n"), int(1)))])
        .decl();
    let output = run(
        vec![bump],
        vec![
            var_init("n", Some(ty("Integer")), int(5)),
            expr_stmt(call("Bump", vec![ident("n")])),
            println(ident("n")),
        ],
    );
    assert_eq!(output, "5\n");
}

/// `function Next: Integer` that logs every evaluation.
fn next() -> Decl {
    FunctionBuilder::function("Next", ty("Integer"))
        .body(vec![
            println(string("evaluated")),
            assign(ident("Result"), int(10)),
        ])
        .decl()
}

#[test]
fn lazy_parameter_is_evaluated_once_on_first_use() {
    let twice = FunctionBuilder::function("Twice", ty("Integer"))
        .lazy_param("x", ty("Integer"))
        .body(vec![
            println(string("start")),
            assign(ident("Result"), add(ident("x"), ident("x"))),
        ])
        .decl();
    let output = run(
        vec![next(), twice],
        vec![println(call("Twice", vec![call("Next", vec![])]))],
    );
    assert_eq!(output, "start\nevaluated\n20\n");
}

#[test]
fn unused_lazy_parameter_is_never_evaluated() {
    let maybe = FunctionBuilder::function("Maybe", ty("Integer"))
        .param("flag", ty("Boolean"))
        .lazy_param("x", ty("Integer"))
        .body(vec![if_else(
            ident("flag"),
            assign(ident("Result"), ident("x")),
            assign(ident("Result"), int(0)),
        )])
        .decl();
    let output = run(
        vec![next(), maybe],
        vec![println(call(
            "Maybe",
            vec![dws_ir::build::boolean(false), call("Next", vec![])],
        ))],
    );
    assert_eq!(output, "0\n");
}

#[test]
fn default_parameters_fill_missing_arguments() {
    let greet = FunctionBuilder::function("Greet", ty("String"))
        .param("name", ty("String"))
        .default_param("greeting", ty("String"), string("Hello"))
        .body(vec![assign(
            ident("Result"),
            add(add(ident("greeting"), string(", ")), ident("name")),
        )])
        .decl();
    let output = run(
        vec![greet],
        vec![
            println(call("Greet", vec![string("Ann")])),
            println(call("Greet", vec![string("Bob"), string("Hi")])),
        ],
    );
    assert_eq!(output, "Hello, Ann\nHi, Bob\n");
}

fn describe(param_type: &str, label: &str) -> Decl {
    FunctionBuilder::function("Describe", ty("String"))
        .param("x", ty(param_type))
        .body(vec![assign(ident("Result"), string(label))])
        .decl()
}

#[test]
fn overload_prefers_exact_match() {
    let output = run(
        vec![
            describe("Float", "float"),
            describe("Integer", "integer"),
            describe("String", "string"),
        ],
        vec![
            println(call("Describe", vec![int(1)])),
            println(call("Describe", vec![float(1.5)])),
            println(call("Describe", vec![string("a")])),
        ],
    );
    assert_eq!(output, "integer\nfloat\nstring\n");
}

#[test]
fn overload_tie_goes_to_first_declared() {
    // Integer converts to both; neither matches exactly.
    let output = run(
        vec![describe("Float", "float"), describe("Variant", "variant")],
        vec![println(call("Describe", vec![int(1)]))],
    );
    assert_eq!(output, "float\n");
}

#[test]
fn overload_with_no_acceptable_candidate_raises() {
    let report = unhandled(
        vec![describe("Integer", "integer"), describe("Boolean", "boolean")],
        vec![println(call("Describe", vec![string("x")]))],
    );
    assert!(report.message.contains("Describe"), "{}", report.message);
}

/// `procedure <name>(<mode> x: <param_type>)` that prints `label` and
/// optionally reads `x`.
fn overload(
    name: &str,
    builder: fn(FunctionBuilder, &str) -> FunctionBuilder,
    label: &str,
    reads: bool,
) -> Decl {
    let mut body = vec![println(string(label))];
    if reads {
        body.push(println(ident("x")));
    }
    builder(FunctionBuilder::procedure(name), "x").body(body).decl()
}

#[test]
fn lazy_overloads_leave_the_argument_unevaluated() {
    let output = run(
        vec![
            next(),
            overload("Skip", |b, x| b.lazy_param(x, ty("Integer")), "skip int", false),
            overload("Skip", |b, x| b.lazy_param(x, ty("String")), "skip string", false),
        ],
        vec![expr_stmt(call("Skip", vec![call("Next", vec![])]))],
    );
    assert_eq!(output, "skip int
");
}

#[test]
fn var_overload_is_chosen_by_the_variable_type() {
    let output = run(
        vec![
            overload("Touch", |b, x| b.var_param(x, ty("Integer")), "int", true),
            overload("Touch", |b, x| b.var_param(x, ty("String")), "string", true),
        ],
        vec![
            var_init("s", Some(ty("String")), string("abc")),
            expr_stmt(call("Touch", vec![ident("s")])),
        ],
    );
    assert_eq!(output, "string
abc
");
}

#[test]
fn lazy_argument_evaluated_for_overload_choice_is_not_rerun() {
    let output = run(
        vec![
            next(),
            overload("Once", |b, x| b.lazy_param(x, ty("Integer")), "lazy int", true),
            overload("Once", |b, x| b.param(x, ty("String")), "string", true),
        ],
        vec![expr_stmt(call("Once", vec![call("Next", vec![])]))],
    );
    assert_eq!(output, "evaluated\nlazy int\n10\n");
}

#[test]
fn nested_function_reads_enclosing_locals() {
    let inner = FunctionBuilder::function("Scaled", ty("Integer"))
        .param("n", ty("Integer"))
        .body(vec![assign(ident("Result"), mul(ident("n"), ident("factor")))])
        .build();
    let outer = FunctionBuilder::function("Outer", ty("Integer"))
        .body(vec![
            var_init("factor", Some(ty("Integer")), int(3)),
            assign(ident("Result"), call("Scaled", vec![int(14)])),
        ])
        .nested(inner)
        .decl();
    let output = run(vec![outer], vec![println(call("Outer", vec![]))]);
    assert_eq!(output, "42\n");
}

#[test]
fn recursion_and_function_name_as_result() {
    // function Fact(n): Fact := n * Fact(n - 1)
    let fact = FunctionBuilder::function("Fact", ty("Integer"))
        .param("n", ty("Integer"))
        .body(vec![if_else(
            lt(ident("n"), int(2)),
            assign(ident("Fact"), int(1)),
            assign(
                ident("Fact"),
                mul(ident("n"), call("Fact", vec![sub(ident("n"), int(1))])),
            ),
        )])
        .decl();
    let output = run(vec![fact], vec![println(call("Fact", vec![int(10)]))]);
    assert_eq!(output, "3628800\n");
}

#[test]
fn exit_with_value_leaves_function_early() {
    let find = FunctionBuilder::function("Find", ty("Integer"))
        .param("target", ty("Integer"))
        .body(vec![
            for_to(
                "i",
                int(1),
                int(10),
                if_then(eq(ident("i"), ident("target")), exit_with(mul(ident("i"), int(10)))),
            ),
            assign(ident("Result"), int(-1)),
        ])
        .decl();
    let output = run(
        vec![find],
        vec![
            println(call("Find", vec![int(4)])),
            println(call("Find", vec![int(40)])),
        ],
    );
    assert_eq!(output, "40\n-1\n");
}

#[test]
fn unbounded_recursion_raises_stack_overflow() {
    let down = FunctionBuilder::procedure("Down")
        .body(vec![expr_stmt(call("Down", vec![]))])
        .decl();
    let report = unhandled(vec![down], vec![expr_stmt(call("Down", vec![]))]);
    assert_eq!(report.class_name, "EScriptStackOverflow");
    assert_eq!(report.message, "Maximal recursion exceeded (1024)");
}

#[test]
fn forward_declaration_is_replaced_by_implementation() {
    let forward = FunctionBuilder::function("Later", ty("Integer")).no_body().decl();
    let user = FunctionBuilder::function("UsesLater", ty("Integer"))
        .body(vec![assign(ident("Result"), add(call("Later", vec![]), int(1)))])
        .decl();
    let implementation = FunctionBuilder::function("Later", ty("Integer"))
        .body(vec![assign(ident("Result"), int(41))])
        .decl();
    let output = run(
        vec![forward, user, implementation],
        vec![println(call("UsesLater", vec![]))],
    );
    assert_eq!(output, "42\n");
}
