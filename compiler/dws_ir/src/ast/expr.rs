//! Expression nodes.

use std::rc::Rc;

use super::decl::FunctionDecl;
use super::operators::{BinaryOp, UnaryOp};
use crate::{Name, Pos};

/// An expression with its source position.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Pos,
}

impl Expr {
    #[inline]
    pub fn new(kind: ExprKind, pos: Pos) -> Self {
        Expr { kind, pos }
    }

    /// Replace the position, keeping the node.
    #[must_use]
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.pos = Pos::new(line, column);
        self
    }

    /// The identifier when this is a bare name.
    pub fn as_ident(&self) -> Option<&Name> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}

/// Expression node kinds.
///
/// Closed set: the evaluator matches exhaustively, so adding a kind here is a
/// compile error until every dispatcher handles it.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    // Literals
    Integer(i64),
    Float(f64),
    String(String),
    Char(char),
    Boolean(bool),
    Nil,

    /// Variable, constant, function, type or enum-member reference.
    Ident(Name),

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// `callee(args)`. A member callee (`obj.M(...)`) is a method call.
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `object.member`: field, property, method (called with no arguments),
    /// class member or enum member.
    Member {
        object: Box<Expr>,
        member: Name,
    },
    /// `object[i, j]`.
    Index {
        object: Box<Expr>,
        indices: Vec<Expr>,
    },
    /// `new TFoo(args)`: instantiate with the default constructor.
    New {
        class: Name,
        args: Vec<Expr>,
    },
    /// Anonymous function or procedure.
    Lambda(Rc<FunctionDecl>),
    /// `@F`, `@obj.Method`.
    AddressOf(Box<Expr>),

    Is {
        value: Box<Expr>,
        type_name: Name,
    },
    As {
        value: Box<Expr>,
        type_name: Name,
    },
    Implements {
        value: Box<Expr>,
        interface: Name,
    },

    /// `[a, b, c]` as an array constructor.
    ArrayLiteral(Vec<Expr>),
    /// `[a, b..c]` in a set context.
    SetLiteral(Vec<SetElement>),
    /// `(X: 1; Y: 2)`, optionally typed.
    RecordLiteral {
        type_name: Option<Name>,
        fields: Vec<(Name, Expr)>,
    },

    /// `inherited` / `inherited Name(args)`.
    ///
    /// `method: None` re-dispatches the enclosing method's own name with its
    /// own arguments when `args` is also `None`.
    Inherited {
        method: Option<Name>,
        args: Option<Vec<Expr>>,
    },

    /// `if c then a else b` in expression position.
    IfExpr {
        cond: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },
}

/// A set-literal element: a single ordinal or an inclusive range.
#[derive(Clone, Debug, PartialEq)]
pub enum SetElement {
    Single(Expr),
    Range(Expr, Expr),
}
