//! Statement nodes.

use super::decl::{ConstDecl, VarDecl};
use super::expr::Expr;
use super::operators::AssignOp;
use crate::{Name, Pos};

/// A statement with its source position.
#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: Pos,
}

impl Stmt {
    #[inline]
    pub fn new(kind: StmtKind, pos: Pos) -> Self {
        Stmt { kind, pos }
    }

    #[must_use]
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.pos = Pos::new(line, column);
        self
    }
}

/// Statement node kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    /// Expression evaluated for effect (calls).
    Expr(Expr),
    Assign {
        target: Expr,
        op: AssignOp,
        value: Expr,
    },
    Var(VarDecl),
    Const(ConstDecl),
    /// `begin ... end`; introduces a scope for inline `var` declarations.
    Block(Vec<Stmt>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    Repeat {
        body: Vec<Stmt>,
        until: Expr,
    },
    For {
        var: Name,
        /// `for var i := ...` declares the loop variable in a fresh scope.
        declare: bool,
        start: Expr,
        end: Expr,
        direction: ForDirection,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    ForIn {
        var: Name,
        declare: bool,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Case {
        subject: Expr,
        branches: Vec<CaseBranch>,
        else_branch: Option<Vec<Stmt>>,
    },
    Try {
        body: Vec<Stmt>,
        except: Option<ExceptClause>,
        finally: Option<Vec<Stmt>>,
    },
    /// `raise E` or bare `raise`.
    Raise(Option<Expr>),
    Break,
    Continue,
    /// `Exit` / `Exit(value)`.
    Exit(Option<Expr>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ForDirection {
    To,
    DownTo,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CaseBranch {
    pub labels: Vec<CaseLabel>,
    pub body: Box<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CaseLabel {
    Value(Expr),
    Range(Expr, Expr),
}

/// The `except` part of a `try`.
///
/// An empty `handlers` list with no `else_branch` is a catch-all written as a
/// plain statement list, which the parser stores in `else_branch`.
#[derive(Clone, Debug, PartialEq)]
pub struct ExceptClause {
    pub handlers: Vec<ExceptHandler>,
    pub else_branch: Option<Vec<Stmt>>,
}

/// `on E: EClass do stmt`.
#[derive(Clone, Debug, PartialEq)]
pub struct ExceptHandler {
    pub var: Option<Name>,
    pub class_name: Name,
    pub body: Box<Stmt>,
    pub pos: Pos,
}
