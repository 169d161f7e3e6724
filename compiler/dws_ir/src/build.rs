//! Terse constructors for assembling syntax trees by hand.
//!
//! Nodes are created at `Pos::NONE`; chain `.at(line, column)` on an `Expr`
//! or `Stmt` when the position matters (call-stack frames, error reports).
//!
//! ```text
//! let f = FunctionBuilder::function("Twice", ty("Integer"))
//!     .param("x", ty("Integer"))
//!     .body(vec![assign(ident("Result"), mul(ident("x"), int(2)))])
//!     .build();
//! ```

use std::rc::Rc;

use crate::ast::{
    AssignOp, BinaryOp, CaseBranch, CaseLabel, ClassDecl, ClassFlags, ConstDecl, Decl, EnumDecl,
    EnumMember, ExceptClause, ExceptHandler, Expr, ExprKind, FieldDecl, ForDirection,
    FunctionDecl, FunctionKind, HelperDecl, InterfaceDecl, MethodFlags, MethodSig, OperatorDecl,
    OperatorKind, Param, ParamMode, PropertyDecl, RecordDecl, SetElement, Stmt, StmtKind, TypeRef,
    UnaryOp, VarDecl, Visibility,
};
use crate::{Name, Pos};

#[inline]
fn expr(kind: ExprKind) -> Expr {
    Expr::new(kind, Pos::NONE)
}

#[inline]
fn stmt(kind: StmtKind) -> Stmt {
    Stmt::new(kind, Pos::NONE)
}

// Types

pub fn ty(name: &str) -> TypeRef {
    TypeRef::named(name)
}

// Literals and names

pub fn int(n: i64) -> Expr {
    expr(ExprKind::Integer(n))
}

pub fn float(f: f64) -> Expr {
    expr(ExprKind::Float(f))
}

pub fn string(s: &str) -> Expr {
    expr(ExprKind::String(s.to_string()))
}

pub fn chr(c: char) -> Expr {
    expr(ExprKind::Char(c))
}

pub fn boolean(b: bool) -> Expr {
    expr(ExprKind::Boolean(b))
}

pub fn nil() -> Expr {
    expr(ExprKind::Nil)
}

pub fn ident(name: &str) -> Expr {
    expr(ExprKind::Ident(Name::new(name)))
}

// Operators

pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    expr(ExprKind::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn add(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Add, left, right)
}

pub fn sub(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Sub, left, right)
}

pub fn mul(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Mul, left, right)
}

pub fn eq(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Eq, left, right)
}

pub fn lt(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Lt, left, right)
}

pub fn gt(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Gt, left, right)
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    expr(ExprKind::Unary {
        op,
        operand: Box::new(operand),
    })
}

pub fn not(operand: Expr) -> Expr {
    unary(UnaryOp::Not, operand)
}

pub fn neg(operand: Expr) -> Expr {
    unary(UnaryOp::Neg, operand)
}

// Calls and access

/// `Name(args)`.
pub fn call(name: &str, args: Vec<Expr>) -> Expr {
    call_expr(ident(name), args)
}

pub fn call_expr(callee: Expr, args: Vec<Expr>) -> Expr {
    expr(ExprKind::Call {
        callee: Box::new(callee),
        args,
    })
}

/// `object.Name(args)`.
pub fn method(object: Expr, name: &str, args: Vec<Expr>) -> Expr {
    call_expr(member(object, name), args)
}

pub fn member(object: Expr, name: &str) -> Expr {
    expr(ExprKind::Member {
        object: Box::new(object),
        member: Name::new(name),
    })
}

pub fn index(object: Expr, indices: Vec<Expr>) -> Expr {
    expr(ExprKind::Index {
        object: Box::new(object),
        indices,
    })
}

/// `TClass.Create(args)`.
pub fn create(class: &str, args: Vec<Expr>) -> Expr {
    method(ident(class), "Create", args)
}

/// `new TClass(args)`.
pub fn new_object(class: &str, args: Vec<Expr>) -> Expr {
    expr(ExprKind::New {
        class: Name::new(class),
        args,
    })
}

pub fn lambda(decl: Rc<FunctionDecl>) -> Expr {
    expr(ExprKind::Lambda(decl))
}

pub fn address_of(target: Expr) -> Expr {
    expr(ExprKind::AddressOf(Box::new(target)))
}

pub fn is(value: Expr, type_name: &str) -> Expr {
    expr(ExprKind::Is {
        value: Box::new(value),
        type_name: Name::new(type_name),
    })
}

pub fn as_type(value: Expr, type_name: &str) -> Expr {
    expr(ExprKind::As {
        value: Box::new(value),
        type_name: Name::new(type_name),
    })
}

pub fn implements(value: Expr, interface: &str) -> Expr {
    expr(ExprKind::Implements {
        value: Box::new(value),
        interface: Name::new(interface),
    })
}

pub fn array(items: Vec<Expr>) -> Expr {
    expr(ExprKind::ArrayLiteral(items))
}

pub fn set(elements: Vec<SetElement>) -> Expr {
    expr(ExprKind::SetLiteral(elements))
}

pub fn set_item(value: Expr) -> SetElement {
    SetElement::Single(value)
}

pub fn set_range(low: Expr, high: Expr) -> SetElement {
    SetElement::Range(low, high)
}

pub fn record(type_name: Option<&str>, fields: Vec<(&str, Expr)>) -> Expr {
    expr(ExprKind::RecordLiteral {
        type_name: type_name.map(Name::new),
        fields: fields
            .into_iter()
            .map(|(n, e)| (Name::new(n), e))
            .collect(),
    })
}

/// `inherited Name(args)`; pass `None` for a bare `inherited`.
pub fn inherited(method: Option<&str>, args: Option<Vec<Expr>>) -> Expr {
    expr(ExprKind::Inherited {
        method: method.map(Name::new),
        args,
    })
}

pub fn if_expr(cond: Expr, then_value: Expr, else_value: Expr) -> Expr {
    expr(ExprKind::IfExpr {
        cond: Box::new(cond),
        then_value: Box::new(then_value),
        else_value: Box::new(else_value),
    })
}

// Statements

pub fn expr_stmt(e: Expr) -> Stmt {
    stmt(StmtKind::Expr(e))
}

/// `PrintLn(value)`.
pub fn println(value: Expr) -> Stmt {
    expr_stmt(call("PrintLn", vec![value]))
}

pub fn assign(target: Expr, value: Expr) -> Stmt {
    assign_op(target, AssignOp::Assign, value)
}

pub fn assign_op(target: Expr, op: AssignOp, value: Expr) -> Stmt {
    stmt(StmtKind::Assign { target, op, value })
}

/// `var name: ty;`
pub fn var(name: &str, ty: TypeRef) -> Stmt {
    stmt(StmtKind::Var(VarDecl {
        names: vec![Name::new(name)],
        ty: Some(ty),
        init: None,
    }))
}

/// `var name [: ty] := init;`
pub fn var_init(name: &str, ty: Option<TypeRef>, init: Expr) -> Stmt {
    stmt(StmtKind::Var(VarDecl {
        names: vec![Name::new(name)],
        ty,
        init: Some(init),
    }))
}

pub fn constant(name: &str, value: Expr) -> Stmt {
    stmt(StmtKind::Const(ConstDecl {
        name: Name::new(name),
        ty: None,
        value,
    }))
}

pub fn block(stmts: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Block(stmts))
}

pub fn if_then(cond: Expr, then_branch: Stmt) -> Stmt {
    stmt(StmtKind::If {
        cond,
        then_branch: Box::new(then_branch),
        else_branch: None,
    })
}

pub fn if_else(cond: Expr, then_branch: Stmt, else_branch: Stmt) -> Stmt {
    stmt(StmtKind::If {
        cond,
        then_branch: Box::new(then_branch),
        else_branch: Some(Box::new(else_branch)),
    })
}

pub fn while_loop(cond: Expr, body: Stmt) -> Stmt {
    stmt(StmtKind::While {
        cond,
        body: Box::new(body),
    })
}

pub fn repeat_until(body: Vec<Stmt>, until: Expr) -> Stmt {
    stmt(StmtKind::Repeat { body, until })
}

/// `for var v := start to end do body`.
pub fn for_to(var: &str, start: Expr, end: Expr, body: Stmt) -> Stmt {
    for_loop(var, start, end, ForDirection::To, None, body)
}

pub fn for_downto(var: &str, start: Expr, end: Expr, body: Stmt) -> Stmt {
    for_loop(var, start, end, ForDirection::DownTo, None, body)
}

pub fn for_loop(
    var: &str,
    start: Expr,
    end: Expr,
    direction: ForDirection,
    step: Option<Expr>,
    body: Stmt,
) -> Stmt {
    stmt(StmtKind::For {
        var: Name::new(var),
        declare: true,
        start,
        end,
        direction,
        step,
        body: Box::new(body),
    })
}

/// `for var v in iterable do body`.
pub fn for_in(var: &str, iterable: Expr, body: Stmt) -> Stmt {
    stmt(StmtKind::ForIn {
        var: Name::new(var),
        declare: true,
        iterable,
        body: Box::new(body),
    })
}

pub fn case_of(subject: Expr, branches: Vec<CaseBranch>, else_branch: Option<Vec<Stmt>>) -> Stmt {
    stmt(StmtKind::Case {
        subject,
        branches,
        else_branch,
    })
}

pub fn case_branch(labels: Vec<CaseLabel>, body: Stmt) -> CaseBranch {
    CaseBranch {
        labels,
        body: Box::new(body),
    }
}

pub fn label(value: Expr) -> CaseLabel {
    CaseLabel::Value(value)
}

pub fn label_range(low: Expr, high: Expr) -> CaseLabel {
    CaseLabel::Range(low, high)
}

/// `on var: Class do body`.
pub fn on(var: Option<&str>, class_name: &str, body: Stmt) -> ExceptHandler {
    ExceptHandler {
        var: var.map(Name::new),
        class_name: Name::new(class_name),
        body: Box::new(body),
        pos: Pos::NONE,
    }
}

pub fn try_except(body: Vec<Stmt>, handlers: Vec<ExceptHandler>) -> Stmt {
    stmt(StmtKind::Try {
        body,
        except: Some(ExceptClause {
            handlers,
            else_branch: None,
        }),
        finally: None,
    })
}

/// `try body except handlers else else_branch end`; with no handlers this
/// is the catch-all form.
pub fn try_except_else(
    body: Vec<Stmt>,
    handlers: Vec<ExceptHandler>,
    else_branch: Vec<Stmt>,
) -> Stmt {
    stmt(StmtKind::Try {
        body,
        except: Some(ExceptClause {
            handlers,
            else_branch: Some(else_branch),
        }),
        finally: None,
    })
}

pub fn try_finally(body: Vec<Stmt>, finally: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Try {
        body,
        except: None,
        finally: Some(finally),
    })
}

pub fn raise(value: Expr) -> Stmt {
    stmt(StmtKind::Raise(Some(value)))
}

/// Bare `raise`.
pub fn reraise() -> Stmt {
    stmt(StmtKind::Raise(None))
}

pub fn break_loop() -> Stmt {
    stmt(StmtKind::Break)
}

pub fn continue_loop() -> Stmt {
    stmt(StmtKind::Continue)
}

pub fn exit() -> Stmt {
    stmt(StmtKind::Exit(None))
}

pub fn exit_with(value: Expr) -> Stmt {
    stmt(StmtKind::Exit(Some(value)))
}

// Declarations

pub fn param(name: &str, ty: TypeRef) -> Param {
    Param {
        name: Name::new(name),
        ty,
        mode: ParamMode::Value,
        default: None,
    }
}

pub fn field(name: &str, ty: TypeRef) -> FieldDecl {
    FieldDecl {
        name: Name::new(name),
        ty,
        init: None,
        visibility: Visibility::Public,
    }
}

/// `property name: ty read r write w;`
pub fn property(name: &str, ty: TypeRef, read: Option<&str>, write: Option<&str>) -> PropertyDecl {
    PropertyDecl {
        name: Name::new(name),
        ty,
        index_params: Vec::new(),
        read: read.map(Name::new),
        write: write.map(Name::new),
        is_default: false,
        is_class: false,
    }
}

pub fn enum_decl(name: &str, members: &[&str]) -> Decl {
    Decl::Enum(Rc::new(EnumDecl {
        name: Name::new(name),
        members: members
            .iter()
            .map(|m| EnumMember {
                name: Name::new(m),
                value: None,
            })
            .collect(),
        is_flags: false,
        pos: Pos::NONE,
    }))
}

pub fn binary_operator(op: BinaryOp, left: TypeRef, right: TypeRef, result: TypeRef, uses: &str) -> OperatorDecl {
    OperatorDecl {
        kind: OperatorKind::Binary(op),
        operands: vec![left, right],
        result,
        uses: Name::new(uses),
        pos: Pos::NONE,
    }
}

pub fn implicit_operator(from: TypeRef, to: TypeRef, uses: &str) -> OperatorDecl {
    OperatorDecl {
        kind: OperatorKind::Implicit,
        operands: vec![from],
        result: to,
        uses: Name::new(uses),
        pos: Pos::NONE,
    }
}

/// Fluent construction of a [`FunctionDecl`].
#[must_use]
pub struct FunctionBuilder {
    decl: FunctionDecl,
}

impl FunctionBuilder {
    fn new(name: &str, kind: FunctionKind, return_type: Option<TypeRef>) -> Self {
        FunctionBuilder {
            decl: FunctionDecl {
                name: Name::new(name),
                kind,
                params: Vec::new(),
                return_type,
                body: Some(Vec::new()),
                nested: Vec::new(),
                flags: MethodFlags::empty(),
                visibility: Visibility::Public,
                pos: Pos::NONE,
            },
        }
    }

    pub fn function(name: &str, return_type: TypeRef) -> Self {
        Self::new(name, FunctionKind::Function, Some(return_type))
    }

    pub fn procedure(name: &str) -> Self {
        Self::new(name, FunctionKind::Procedure, None)
    }

    pub fn constructor(name: &str) -> Self {
        Self::new(name, FunctionKind::Constructor, None)
    }

    pub fn destructor(name: &str) -> Self {
        let mut builder = Self::new(name, FunctionKind::Destructor, None);
        builder.decl.flags |= MethodFlags::OVERRIDE;
        builder
    }

    /// Anonymous function; `return_type: None` makes it a procedure.
    pub fn lambda(return_type: Option<TypeRef>) -> Self {
        let kind = if return_type.is_some() {
            FunctionKind::Function
        } else {
            FunctionKind::Procedure
        };
        Self::new("", kind, return_type)
    }

    pub fn param(self, name: &str, ty: TypeRef) -> Self {
        self.param_with(name, ty, ParamMode::Value, None)
    }

    pub fn var_param(self, name: &str, ty: TypeRef) -> Self {
        self.param_with(name, ty, ParamMode::Var, None)
    }

    pub fn const_param(self, name: &str, ty: TypeRef) -> Self {
        self.param_with(name, ty, ParamMode::Const, None)
    }

    pub fn lazy_param(self, name: &str, ty: TypeRef) -> Self {
        self.param_with(name, ty, ParamMode::Lazy, None)
    }

    pub fn default_param(self, name: &str, ty: TypeRef, default: Expr) -> Self {
        self.param_with(name, ty, ParamMode::Value, Some(default))
    }

    pub fn param_with(mut self, name: &str, ty: TypeRef, mode: ParamMode, default: Option<Expr>) -> Self {
        self.decl.params.push(Param {
            name: Name::new(name),
            ty,
            mode,
            default,
        });
        self
    }

    pub fn flags(mut self, flags: MethodFlags) -> Self {
        self.decl.flags |= flags;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.decl.visibility = visibility;
        self
    }

    pub fn body(mut self, body: Vec<Stmt>) -> Self {
        self.decl.body = Some(body);
        self
    }

    /// Declaration without a body (abstract, forward or external).
    pub fn no_body(mut self) -> Self {
        self.decl.body = None;
        self
    }

    pub fn nested(mut self, function: Rc<FunctionDecl>) -> Self {
        self.decl.nested.push(function);
        self
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.decl.pos = Pos::new(line, column);
        self
    }

    pub fn build(self) -> Rc<FunctionDecl> {
        Rc::new(self.decl)
    }

    pub fn decl(self) -> Decl {
        Decl::Function(self.build())
    }
}

/// Fluent construction of a [`ClassDecl`].
#[must_use]
pub struct ClassBuilder {
    decl: ClassDecl,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        ClassBuilder {
            decl: ClassDecl {
                name: Name::new(name),
                parent: None,
                interfaces: Vec::new(),
                fields: Vec::new(),
                class_vars: Vec::new(),
                constants: Vec::new(),
                methods: Vec::new(),
                properties: Vec::new(),
                operators: Vec::new(),
                flags: ClassFlags::empty(),
                pos: Pos::NONE,
            },
        }
    }

    pub fn parent(mut self, parent: &str) -> Self {
        self.decl.parent = Some(Name::new(parent));
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.decl.interfaces.push(Name::new(interface));
        self
    }

    pub fn field(mut self, name: &str, ty: TypeRef) -> Self {
        self.decl.fields.push(field(name, ty));
        self
    }

    pub fn field_init(mut self, name: &str, ty: TypeRef, init: Expr) -> Self {
        let mut f = field(name, ty);
        f.init = Some(init);
        self.decl.fields.push(f);
        self
    }

    pub fn class_var(mut self, name: &str, ty: TypeRef, init: Option<Expr>) -> Self {
        let mut f = field(name, ty);
        f.init = init;
        self.decl.class_vars.push(f);
        self
    }

    pub fn constant(mut self, name: &str, value: Expr) -> Self {
        self.decl.constants.push(ConstDecl {
            name: Name::new(name),
            ty: None,
            value,
        });
        self
    }

    pub fn method(mut self, method: Rc<FunctionDecl>) -> Self {
        self.decl.methods.push(method);
        self
    }

    pub fn property(mut self, property: PropertyDecl) -> Self {
        self.decl.properties.push(property);
        self
    }

    pub fn operator(mut self, operator: OperatorDecl) -> Self {
        self.decl.operators.push(operator);
        self
    }

    pub fn flags(mut self, flags: ClassFlags) -> Self {
        self.decl.flags |= flags;
        self
    }

    pub fn build(self) -> Rc<ClassDecl> {
        Rc::new(self.decl)
    }

    pub fn decl(self) -> Decl {
        Decl::Class(self.build())
    }
}

/// Fluent construction of a [`RecordDecl`].
#[must_use]
pub struct RecordBuilder {
    decl: RecordDecl,
}

impl RecordBuilder {
    pub fn new(name: &str) -> Self {
        RecordBuilder {
            decl: RecordDecl {
                name: Name::new(name),
                fields: Vec::new(),
                constants: Vec::new(),
                methods: Vec::new(),
                properties: Vec::new(),
                operators: Vec::new(),
                pos: Pos::NONE,
            },
        }
    }

    pub fn field(mut self, name: &str, ty: TypeRef) -> Self {
        self.decl.fields.push(field(name, ty));
        self
    }

    pub fn field_init(mut self, name: &str, ty: TypeRef, init: Expr) -> Self {
        let mut f = field(name, ty);
        f.init = Some(init);
        self.decl.fields.push(f);
        self
    }

    pub fn method(mut self, method: Rc<FunctionDecl>) -> Self {
        self.decl.methods.push(method);
        self
    }

    pub fn property(mut self, property: PropertyDecl) -> Self {
        self.decl.properties.push(property);
        self
    }

    pub fn operator(mut self, operator: OperatorDecl) -> Self {
        self.decl.operators.push(operator);
        self
    }

    pub fn build(self) -> Rc<RecordDecl> {
        Rc::new(self.decl)
    }

    pub fn decl(self) -> Decl {
        Decl::Record(self.build())
    }
}

/// Fluent construction of an [`InterfaceDecl`].
#[must_use]
pub struct InterfaceBuilder {
    decl: InterfaceDecl,
}

impl InterfaceBuilder {
    pub fn new(name: &str) -> Self {
        InterfaceBuilder {
            decl: InterfaceDecl {
                name: Name::new(name),
                parent: None,
                methods: Vec::new(),
                properties: Vec::new(),
                pos: Pos::NONE,
            },
        }
    }

    pub fn parent(mut self, parent: &str) -> Self {
        self.decl.parent = Some(Name::new(parent));
        self
    }

    /// Add a method signature; `params` are `(name, type)` pairs.
    pub fn method(mut self, name: &str, params: &[(&str, TypeRef)], return_type: Option<TypeRef>) -> Self {
        self.decl.methods.push(MethodSig {
            name: Name::new(name),
            params: params.iter().map(|(n, t)| param(n, t.clone())).collect(),
            return_type,
        });
        self
    }

    pub fn build(self) -> Rc<InterfaceDecl> {
        Rc::new(self.decl)
    }

    pub fn decl(self) -> Decl {
        Decl::Interface(self.build())
    }
}

/// `helper for target` with the given methods.
pub fn helper(name: &str, target: TypeRef, methods: Vec<Rc<FunctionDecl>>) -> Decl {
    Decl::Helper(Rc::new(HelperDecl {
        name: Name::new(name),
        target,
        methods,
        properties: Vec::new(),
        pos: Pos::NONE,
    }))
}

#[cfg(test)]
mod tests;
