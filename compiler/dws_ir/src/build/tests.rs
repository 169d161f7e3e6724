use super::*;
use pretty_assertions::assert_eq;

#[test]
fn function_builder_counts_required_params() {
    let f = FunctionBuilder::function("F", ty("Integer"))
        .param("a", ty("Integer"))
        .default_param("b", ty("Integer"), int(2))
        .build();
    assert_eq!(f.params.len(), 2);
    assert_eq!(f.required_params(), 1);
    assert!(f.has_result());
}

#[test]
fn positions_attach_with_at() {
    let e = ident("x").at(3, 7);
    assert_eq!(e.pos, Pos::new(3, 7));
    assert_eq!(e.as_ident().map(Name::as_str), Some("x"));
}

#[test]
fn method_call_shape() {
    let e = method(ident("obj"), "Run", vec![int(1)]);
    let ExprKind::Call { callee, args } = e.kind else {
        panic!("expected call");
    };
    assert_eq!(args.len(), 1);
    assert!(matches!(callee.kind, ExprKind::Member { .. }));
}
