//! Classes, records, interfaces, helpers and operator overloads.

use dws_ir::build::{
    add, as_type, assign, binary_operator, call, create, expr_stmt, helper, ident,
    implements, inherited, int, is, lambda, member, method, mul, nil, on, println, property, record,
    string, try_except, ty, var, var_init, ClassBuilder, FunctionBuilder, InterfaceBuilder,
    RecordBuilder,
};
use dws_ir::{BinaryOp, ClassFlags, Decl, MethodFlags, Stmt, TypeRef};
use pretty_assertions::assert_eq;

use crate::common::{run, unhandled};

// Inheritance and dispatch

/// `TAnimal` > `TDog` > `TPuppy`, with a virtual `Speak`.
fn animals() -> Vec<Decl> {
    let animal = ClassBuilder::new("TAnimal")
        .field("FName", ty("String"))
        .method(
            FunctionBuilder::constructor("Create")
                .param("name", ty("String"))
                .body(vec![assign(ident("FName"), ident("name"))])
                .build(),
        )
        .method(
            FunctionBuilder::function("Speak", ty("String"))
                .flags(MethodFlags::VIRTUAL)
                .body(vec![assign(ident("Result"), string("..."))])
                .build(),
        )
        .method(
            FunctionBuilder::function("Describe", ty("String"))
                .body(vec![assign(
                    ident("Result"),
                    add(add(ident("FName"), string(" says ")), ident("Speak")),
                )])
                .build(),
        )
        .method(
            FunctionBuilder::function("Kind", ty("String"))
                .flags(MethodFlags::CLASS_METHOD)
                .body(vec![assign(ident("Result"), string("animal"))])
                .build(),
        )
        .decl();
    let dog = ClassBuilder::new("TDog")
        .parent("TAnimal")
        .method(
            FunctionBuilder::function("Speak", ty("String"))
                .flags(MethodFlags::OVERRIDE)
                .body(vec![assign(ident("Result"), string("woof"))])
                .build(),
        )
        .decl();
    let puppy = ClassBuilder::new("TPuppy")
        .parent("TDog")
        .method(
            FunctionBuilder::function("Speak", ty("String"))
                .flags(MethodFlags::OVERRIDE)
                .body(vec![assign(
                    ident("Result"),
                    add(inherited(Some("Speak"), None), string(" (small)")),
                )])
                .build(),
        )
        .decl();
    vec![animal, dog, puppy]
}

#[test]
fn virtual_call_from_base_method_dispatches_on_runtime_class() {
    let output = run(
        animals(),
        vec![
            var_init("a", Some(ty("TAnimal")), create("TDog", vec![string("Rex")])),
            println(method(ident("a"), "Describe", vec![])),
            var_init("p", None, create("TPuppy", vec![string("Bit")])),
            println(method(ident("p"), "Describe", vec![])),
            println(member(ident("a"), "ClassName")),
            println(method(ident("TAnimal"), "Kind", vec![])),
        ],
    );
    assert_eq!(output, "Rex says woof\nBit says woof (small)\nTDog\nanimal\n");
}

#[test]
fn is_and_as_follow_the_class_hierarchy() {
    let output = run(
        animals(),
        vec![
            var_init("a", Some(ty("TAnimal")), create("TPuppy", vec![string("Bit")])),
            println(is(ident("a"), "TDog")),
            println(is(ident("a"), "TAnimal")),
            var_init("d", None, create("TDog", vec![string("Rex")])),
            println(is(ident("d"), "TPuppy")),
            println(method(as_type(ident("a"), "TDog"), "Speak", vec![])),
            try_except(
                vec![expr_stmt(as_type(ident("d"), "TPuppy"))],
                vec![on(None, "EInvalidOp", println(string("bad cast")))],
            ),
        ],
    );
    assert_eq!(output, "True\nTrue\nFalse\nwoof (small)\nbad cast\n");
}

#[test]
fn inherited_constructor_runs_before_derived_body() {
    let base = ClassBuilder::new("TBase")
        .field("FValue", ty("Integer"))
        .method(
            FunctionBuilder::constructor("Create")
                .param("n", ty("Integer"))
                .body(vec![assign(ident("FValue"), ident("n"))])
                .build(),
        )
        .decl();
    let derived = ClassBuilder::new("TDerived")
        .parent("TBase")
        .field("FDouble", ty("Integer"))
        .method(
            FunctionBuilder::constructor("Create")
                .param("n", ty("Integer"))
                .body(vec![
                    expr_stmt(inherited(Some("Create"), Some(vec![ident("n")]))),
                    assign(ident("FDouble"), mul(ident("FValue"), int(2))),
                ])
                .build(),
        )
        .decl();
    let output = run(
        vec![base, derived],
        vec![
            var_init("d", None, create("TDerived", vec![int(21)])),
            println(member(ident("d"), "FValue")),
            println(member(ident("d"), "FDouble")),
        ],
    );
    assert_eq!(output, "21\n42\n");
}

#[test]
fn property_reads_field_and_writes_through_setter() {
    let counter = ClassBuilder::new("TCounter")
        .field("FCount", ty("Integer"))
        .method(
            FunctionBuilder::procedure("SetCount")
                .param("value", ty("Integer"))
                .body(vec![assign(ident("FCount"), mul(ident("value"), int(10)))])
                .build(),
        )
        .property(property("Count", ty("Integer"), Some("FCount"), Some("SetCount")))
        .decl();
    let output = run(
        vec![counter],
        vec![
            var_init("c", None, create("TCounter", vec![])),
            assign(member(ident("c"), "Count"), int(4)),
            println(member(ident("c"), "Count")),
        ],
    );
    assert_eq!(output, "40\n");
}

#[test]
fn class_variables_are_shared_between_instances() {
    let tracker = ClassBuilder::new("TTracker")
        .class_var("Created", ty("Integer"), Some(int(0)))
        .constant("Limit", int(3))
        .method(
            FunctionBuilder::constructor("Create")
                .body(vec![assign(ident("Created"), add(ident("Created"), int(1)))])
                .build(),
        )
        .decl();
    let output = run(
        vec![tracker],
        vec![
            expr_stmt(create("TTracker", vec![])),
            var_init("t", None, create("TTracker", vec![])),
            println(member(ident("TTracker"), "Created")),
            println(member(ident("t"), "Created")),
            println(member(ident("TTracker"), "Limit")),
        ],
    );
    assert_eq!(output, "2\n2\n3\n");
}

#[test]
fn abstract_class_cannot_be_instantiated() {
    let shape = ClassBuilder::new("TShape")
        .flags(ClassFlags::ABSTRACT)
        .decl();
    let report = unhandled(vec![shape], vec![expr_stmt(create("TShape", vec![]))]);
    assert_eq!(report.class_name, "EInvalidOp");
}

#[test]
fn free_runs_destructor_and_later_access_raises() {
    let noisy = ClassBuilder::new("TNoisy")
        .field_init("FTag", ty("String"), string("n1"))
        .method(
            FunctionBuilder::destructor("Destroy")
                .body(vec![println(add(string("bye "), ident("FTag")))])
                .build(),
        )
        .decl();
    let report = unhandled(
        vec![noisy],
        vec![
            var_init("o", None, create("TNoisy", vec![])),
            expr_stmt(method(ident("o"), "Free", vec![])),
            println(member(ident("o"), "FTag")),
        ],
    );
    assert!(report.message.contains("destroyed"), "{}", report.message);
}

// Interfaces and reference counting

fn things() -> Vec<Decl> {
    let iface = InterfaceBuilder::new("IThing")
        .method("Name", &[], Some(ty("String")))
        .decl();
    let thing = ClassBuilder::new("TThing")
        .implements("IThing")
        .field("FName", ty("String"))
        .method(
            FunctionBuilder::constructor("Create")
                .param("name", ty("String"))
                .body(vec![assign(ident("FName"), ident("name"))])
                .build(),
        )
        .method(
            FunctionBuilder::function("Name", ty("String"))
                .body(vec![assign(ident("Result"), ident("FName"))])
                .build(),
        )
        .method(
            FunctionBuilder::destructor("Destroy")
                .body(vec![println(add(string("destroyed "), ident("FName")))])
                .build(),
        )
        .decl();
    vec![iface, thing]
}

#[test]
fn last_interface_reference_leaving_scope_destroys_once() {
    let use_thing = FunctionBuilder::procedure("UseThing")
        .body(vec![
            var_init("i", Some(ty("IThing")), create("TThing", vec![string("a")])),
            println(member(ident("i"), "Name")),
        ])
        .decl();
    let mut decls = things();
    decls.push(use_thing);
    let output = run(
        decls,
        vec![
            expr_stmt(call("UseThing", vec![])),
            println(string("after")),
        ],
    );
    assert_eq!(output, "a\ndestroyed a\nafter\n");
}

#[test]
fn destructor_waits_for_the_last_of_several_references() {
    let output = run(
        things(),
        vec![
            var_init("a", Some(ty("IThing")), create("TThing", vec![string("b")])),
            var_init("b", Some(ty("IThing")), ident("a")),
            assign(ident("a"), nil()),
            println(string("still alive")),
            assign(ident("b"), nil()),
            println(string("end")),
        ],
    );
    assert_eq!(output, "still alive\ndestroyed b\nend\n");
}

#[test]
fn unstored_interface_result_is_released_after_the_statement() {
    let make = FunctionBuilder::function("MakeThing", ty("IThing"))
        .body(vec![assign(ident("Result"), create("TThing", vec![string("t")]))])
        .decl();
    let mut decls = things();
    decls.push(make);
    let output = run(
        decls,
        vec![
            println(member(call("MakeThing", vec![]), "Name")),
            println(string("next")),
        ],
    );
    assert_eq!(output, "t\ndestroyed t\nnext\n");
}

#[test]
fn global_interface_is_released_when_the_program_ends() {
    let output = run(
        things(),
        vec![
            var_init("g", Some(ty("IThing")), create("TThing", vec![string("g")])),
            println(implements(ident("g"), "IThing")),
        ],
    );
    assert_eq!(output, "True\ndestroyed g\n");
}

/// `TBox = record T: IThing; procedure Put(name) end`.
fn boxes() -> Vec<Decl> {
    let mut decls = things();
    decls.push(
        RecordBuilder::new("TBox")
            .field("T", ty("IThing"))
            .method(
                FunctionBuilder::procedure("Put")
                    .param("name", ty("String"))
                    .body(vec![assign(
                        ident("T"),
                        create("TThing", vec![ident("name")]),
                    )])
                    .build(),
            )
            .decl(),
    );
    decls
}

/// Declares `body` as procedure `Work`, calls it, then prints "after".
fn run_in_procedure(mut decls: Vec<Decl>, body: Vec<Stmt>) -> String {
    decls.push(FunctionBuilder::procedure("Work").body(body).decl());
    run(
        decls,
        vec![
            expr_stmt(call("Work", vec![])),
            println(string("after")),
        ],
    )
}

#[test]
fn interfaces_in_a_local_dynamic_array_are_released() {
    let output = run_in_procedure(
        things(),
        vec![
            var("arr", TypeRef::array_of(ty("IThing"))),
            expr_stmt(method(
                ident("arr"),
                "Add",
                vec![create("TThing", vec![string("x")])],
            )),
            println(string("filled")),
        ],
    );
    assert_eq!(output, "filled\ndestroyed x\nafter\n");
}

#[test]
fn array_shared_with_a_global_keeps_its_elements() {
    let mut decls = things();
    decls.push(
        FunctionBuilder::procedure("Work")
            .body(vec![
                var("arr", TypeRef::array_of(ty("IThing"))),
                expr_stmt(method(
                    ident("arr"),
                    "Add",
                    vec![create("TThing", vec![string("kept")])],
                )),
                assign(ident("keep"), ident("arr")),
            ])
            .decl(),
    );
    let output = run(
        decls,
        vec![
            var("keep", TypeRef::array_of(ty("IThing"))),
            expr_stmt(call("Work", vec![])),
            println(string("after")),
        ],
    );
    assert_eq!(output, "after\ndestroyed kept\n");
}

#[test]
fn interface_in_record_copies_is_released_once() {
    let output = run_in_procedure(
        boxes(),
        vec![
            var("b", ty("TBox")),
            assign(member(ident("b"), "T"), create("TThing", vec![string("r")])),
            var_init("c", Some(ty("TBox")), ident("b")),
            println(string("copied")),
        ],
    );
    assert_eq!(output, "copied\ndestroyed r\nafter\n");
}

#[test]
fn record_method_replacing_an_interface_field_releases_the_old_one() {
    let output = run_in_procedure(
        boxes(),
        vec![
            var("b", ty("TBox")),
            expr_stmt(method(ident("b"), "Put", vec![string("p1")])),
            expr_stmt(method(ident("b"), "Put", vec![string("p2")])),
            println(string("put")),
        ],
    );
    assert_eq!(output, "destroyed p1\nput\ndestroyed p2\nafter\n");
}

#[test]
fn local_closure_does_not_keep_interface_locals_alive() {
    let show = FunctionBuilder::lambda(None)
        .body(vec![println(member(ident("i"), "Name"))])
        .build();
    let output = run_in_procedure(
        things(),
        vec![
            var_init("i", Some(ty("IThing")), create("TThing", vec![string("l")])),
            var_init("show", None, lambda(show)),
            expr_stmt(call("show", vec![])),
        ],
    );
    assert_eq!(output, "l\ndestroyed l\nafter\n");
}

#[test]
fn escaping_closure_keeps_captured_interface_alive() {
    let show = FunctionBuilder::lambda(None)
        .body(vec![println(member(ident("i"), "Name"))])
        .build();
    let make = FunctionBuilder::function(
        "MakeShow",
        TypeRef::Function {
            params: vec![],
            returns: None,
        },
    )
    .body(vec![
        var_init("i", Some(ty("IThing")), create("TThing", vec![string("k")])),
        assign(ident("Result"), lambda(show)),
    ])
    .decl();
    let mut decls = things();
    decls.push(make);
    let output = run(
        decls,
        vec![
            var_init("s", None, call("MakeShow", vec![])),
            expr_stmt(call("s", vec![])),
            println(string("end")),
        ],
    );
    assert_eq!(output, "k\nend\n");
}

// Records

fn point() -> Decl {
    RecordBuilder::new("TPoint")
        .field("X", ty("Integer"))
        .field("Y", ty("Integer"))
        .method(
            FunctionBuilder::procedure("Move")
                .param("dx", ty("Integer"))
                .body(vec![assign(ident("X"), add(ident("X"), ident("dx")))])
                .build(),
        )
        .decl()
}

#[test]
fn records_copy_on_assignment_and_mutate_through_methods() {
    let output = run(
        vec![point()],
        vec![
            var("p", ty("TPoint")),
            assign(member(ident("p"), "X"), int(1)),
            var_init("q", None, ident("p")),
            assign(member(ident("q"), "X"), int(100)),
            expr_stmt(method(ident("p"), "Move", vec![int(4)])),
            println(member(ident("p"), "X")),
            println(member(ident("q"), "X")),
        ],
    );
    assert_eq!(output, "5\n100\n");
}

#[test]
fn method_on_returned_record_does_not_touch_original() {
    let get = FunctionBuilder::function("GetP", ty("TPoint"))
        .body(vec![assign(ident("Result"), ident("p"))])
        .decl();
    let output = run(
        vec![point(), get],
        vec![
            var("p", ty("TPoint")),
            assign(member(ident("p"), "X"), int(5)),
            expr_stmt(method(call("GetP", vec![]), "Move", vec![int(50)])),
            println(member(ident("p"), "X")),
        ],
    );
    assert_eq!(output, "5\n");
}

#[test]
fn operator_overload_adds_records() {
    let add_points = FunctionBuilder::function("AddPoints", ty("TPoint"))
        .param("a", ty("TPoint"))
        .param("b", ty("TPoint"))
        .body(vec![
            assign(
                member(ident("Result"), "X"),
                add(member(ident("a"), "X"), member(ident("b"), "X")),
            ),
            assign(
                member(ident("Result"), "Y"),
                add(member(ident("a"), "Y"), member(ident("b"), "Y")),
            ),
        ])
        .decl();
    let operator = Decl::Operator(binary_operator(
        BinaryOp::Add,
        ty("TPoint"),
        ty("TPoint"),
        ty("TPoint"),
        "AddPoints",
    ));
    let output = run(
        vec![point(), add_points, operator],
        vec![
            var_init(
                "s",
                None,
                add(
                    record(Some("TPoint"), vec![("X", int(1)), ("Y", int(2))]),
                    record(Some("TPoint"), vec![("X", int(10)), ("Y", int(20))]),
                ),
            ),
            println(member(ident("s"), "X")),
            println(member(ident("s"), "Y")),
        ],
    );
    assert_eq!(output, "11\n22\n");
}

// Helpers

#[test]
fn helper_adds_methods_to_integers() {
    let doubled = FunctionBuilder::function("Doubled", ty("Integer"))
        .body(vec![assign(ident("Result"), mul(ident("Self"), int(2)))])
        .build();
    let output = run(
        vec![helper("TIntegerHelper", ty("Integer"), vec![doubled])],
        vec![
            var_init("n", Some(ty("Integer")), int(21)),
            println(method(ident("n"), "Doubled", vec![])),
            println(method(int(4), "Doubled", vec![])),
        ],
    );
    assert_eq!(output, "42\n8\n");
}

