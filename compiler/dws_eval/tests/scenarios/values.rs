//! Ordinals, sets, strings, arrays, variants and JSON.

use dws_ir::build::{
    add, array, assign, binary, boolean, call, case_branch, case_of, chr, enum_decl, expr_stmt,
    for_in, ident, index, int, label, label_range, member, method, println, record, set,
    set_item, set_range, string, ty, var, var_init,
};
use dws_ir::{BinaryOp, TypeRef};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::common::{run, unhandled};

#[test]
fn integer_type_bounds_are_i64_extremes() {
    let output = run(
        vec![],
        vec![
            println(call("High", vec![ident("Integer")])),
            println(call("Low", vec![ident("Integer")])),
        ],
    );
    assert_eq!(output, format!("{}\n{}\n", i64::MAX, i64::MIN));
}

#[test]
fn integer_overflow_is_reported_not_wrapped() {
    let report = unhandled(
        vec![],
        vec![println(add(call("High", vec![ident("Integer")]), int(1)))],
    );
    assert_eq!(report.class_name, "ERangeError");
}

// Enumerations and sets

fn colors() -> dws_ir::Decl {
    enum_decl("TColor", &["Red", "Green", "Blue"])
}

#[test]
fn enum_ordinals_names_and_bounds() {
    let output = run(
        vec![colors()],
        vec![
            println(call("Ord", vec![ident("Green")])),
            println(method(ident("Blue"), "Name", vec![])),
            println(method(call("Succ", vec![ident("Red")]), "Name", vec![])),
            println(method(call("High", vec![ident("TColor")]), "Name", vec![])),
            println(method(call("Low", vec![ident("TColor")]), "Name", vec![])),
        ],
    );
    assert_eq!(output, "1\nBlue\nGreen\nBlue\nRed\n");
}

#[test]
fn set_membership_and_include() {
    let output = run(
        vec![colors()],
        vec![
            var_init(
                "s",
                None,
                set(vec![set_item(ident("Red")), set_item(ident("Blue"))]),
            ),
            println(binary(BinaryOp::In, ident("Green"), ident("s"))),
            expr_stmt(call("Include", vec![ident("s"), ident("Green")])),
            println(binary(BinaryOp::In, ident("Green"), ident("s"))),
            expr_stmt(call("Exclude", vec![ident("s"), ident("Red")])),
            println(binary(BinaryOp::In, ident("Red"), ident("s"))),
            println(binary(
                BinaryOp::In,
                int(7),
                set(vec![set_range(int(1), int(10))]),
            )),
        ],
    );
    assert_eq!(output, "False\nTrue\nFalse\nTrue\n");
}

#[test]
fn case_selects_value_range_or_else() {
    let branches = || {
        vec![
            case_branch(vec![label(int(1))], println(string("one"))),
            case_branch(vec![label_range(int(2), int(5))], println(string("few"))),
        ]
    };
    let output = run(
        vec![],
        vec![for_in(
            "n",
            array(vec![int(1), int(3), int(9)]),
            case_of(ident("n"), branches(), Some(vec![println(string("many"))])),
        )],
    );
    assert_eq!(output, "one\nfew\nmany\n");
}

// Strings

#[test]
fn string_functions_are_one_based() {
    let output = run(
        vec![],
        vec![
            var_init("s", Some(ty("String")), string("hello")),
            println(call("Copy", vec![ident("s"), int(2), int(3)])),
            println(call("Pos", vec![string("l"), ident("s")])),
            println(call("Length", vec![ident("s")])),
            println(index(ident("s"), vec![int(1)])),
            println(method(ident("s"), "UpperCase", vec![])),
            assign(index(ident("s"), vec![int(1)]), chr('J')),
            println(ident("s")),
        ],
    );
    assert_eq!(output, "ell\n3\n5\nh\nHELLO\nJello\n");
}

#[test]
fn string_index_out_of_range_raises() {
    let report = unhandled(
        vec![],
        vec![println(index(string("abc"), vec![int(4)]))],
    );
    assert_eq!(report.class_name, "ERangeError");
}

// Arrays

#[test]
fn dynamic_array_methods_and_iteration() {
    let output = run(
        vec![],
        vec![
            var_init("a", None, array(vec![int(3), int(1), int(2)])),
            expr_stmt(method(ident("a"), "Add", vec![int(4)])),
            println(call("Length", vec![ident("a")])),
            println(call("High", vec![ident("a")])),
            println(member(ident("a"), "Count")),
            var_init("sum", Some(ty("Integer")), int(0)),
            for_in("x", ident("a"), assign(ident("sum"), add(ident("sum"), ident("x")))),
            println(ident("sum")),
            println(method(ident("a"), "IndexOf", vec![int(2)])),
        ],
    );
    assert_eq!(output, "4\n3\n4\n10\n2\n");
}

#[test]
fn static_arrays_copy_on_assignment() {
    let output = run(
        vec![],
        vec![
            var("s", TypeRef::static_array(ty("Integer"), 1, 3)),
            assign(index(ident("s"), vec![int(1)]), int(5)),
            var_init("t", None, ident("s")),
            assign(index(ident("t"), vec![int(1)]), int(9)),
            println(index(ident("s"), vec![int(1)])),
            println(index(ident("t"), vec![int(1)])),
            println(call("Low", vec![ident("s")])),
        ],
    );
    assert_eq!(output, "5\n9\n1\n");
}

// Variants

#[test]
fn variants_start_unassigned_and_take_any_value() {
    let output = run(
        vec![],
        vec![
            var("v", ty("Variant")),
            println(call("VarIsEmpty", vec![ident("v")])),
            assign(ident("v"), int(5)),
            println(add(ident("v"), int(1))),
            assign(ident("v"), string("text")),
            println(call("VarToStr", vec![ident("v")])),
            println(call("VarIsEmpty", vec![ident("v")])),
        ],
    );
    assert_eq!(output, "True\n6\ntext\nFalse\n");
}

// JSON

#[test]
fn to_json_keeps_field_and_element_order() {
    let value = record(
        None,
        vec![
            ("id", int(7)),
            ("tags", array(vec![string("a"), string("b")])),
            ("nested", record(None, vec![("ok", boolean(true))])),
        ],
    );
    let expected = r#"{"id":7,"tags":["a","b"],"nested":{"ok":true}}"#;
    let output = run(
        vec![],
        vec![
            var_init("v", None, value),
            println(call("ToJSON", vec![ident("v")])),
            println(call(
                "ToJSON",
                vec![call("ParseJSON", vec![call("ToJSON", vec![ident("v")])])],
            )),
        ],
    );
    assert_eq!(output, format!("{expected}\n{expected}\n"));
}

#[test]
fn parsed_json_fields_are_readable() {
    let output = run(
        vec![],
        vec![
            var_init(
                "v",
                None,
                call("ParseJSON", vec![string(r#"{"Name":"dws","n":[1,2,3]}"#)]),
            ),
            println(member(ident("v"), "name")),
            println(index(member(ident("v"), "n"), vec![int(1)])),
        ],
    );
    assert_eq!(output, "dws\n2\n");
}

#[test]
fn malformed_json_raises() {
    let report = unhandled(vec![], vec![println(call("ParseJSON", vec![string("{bad")]))]);
    assert!(!report.message.is_empty());
}

fn json_document() -> impl Strategy<Value = serde_json::Value> {
    (
        prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..5),
        prop::collection::vec("[ -~]{0,12}", 0..5),
        any::<bool>(),
        -1.0e6_f64..1.0e6,
    )
        .prop_map(|(counts, names, flag, score)| {
            serde_json::json!({
                "counts": counts,
                "names": names,
                "flag": flag,
                "score": score,
                "missing": null,
            })
        })
}

proptest! {
    #[test]
    fn parse_then_serialize_reproduces_document(document in json_document()) {
        let text = document.to_string();
        let output = run(
            vec![],
            vec![println(call("ToJSON", vec![call("ParseJSON", vec![string(&text)])]))],
        );
        let reparsed: serde_json::Value = serde_json::from_str(output.trim_end()).unwrap();
        prop_assert_eq!(reparsed, document);
    }
}
