//! Abstract syntax tree.
//!
//! Owned, immutable tree. Nodes the runtime keeps alive past the end of a
//! call (function bodies captured by closures and method tables) are shared
//! through `Rc`.

mod decl;
mod expr;
mod operators;
mod stmt;
mod types;

use std::rc::Rc;

pub use decl::{
    ClassDecl, ClassFlags, ConstDecl, EnumDecl, EnumMember, FieldDecl, FunctionDecl,
    FunctionKind, HelperDecl, InterfaceDecl, MethodFlags, MethodSig, OperatorDecl, OperatorKind,
    Param, ParamMode, PropertyDecl, RecordDecl, VarDecl, Visibility,
};
pub use expr::{Expr, ExprKind, SetElement};
pub use operators::{AssignOp, BinaryOp, UnaryOp};
pub use stmt::{
    CaseBranch, CaseLabel, ExceptClause, ExceptHandler, ForDirection, Stmt, StmtKind,
};
pub use types::TypeRef;

use crate::Name;

/// A top-level declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    Function(Rc<FunctionDecl>),
    Class(Rc<ClassDecl>),
    Record(Rc<RecordDecl>),
    Interface(Rc<InterfaceDecl>),
    Enum(Rc<EnumDecl>),
    Helper(Rc<HelperDecl>),
    Operator(OperatorDecl),
    /// `type TName = <type>;` for arrays, sets, function pointers and aliases.
    TypeAlias { name: Name, target: TypeRef },
}

/// A complete script: declarations followed by the main statement list.
///
/// Global `var`/`const` sections appear as statements in `body`, in source
/// order relative to the main code.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Program {
    pub decls: Vec<Decl>,
    pub body: Vec<Stmt>,
}

impl Program {
    pub fn new(decls: Vec<Decl>, body: Vec<Stmt>) -> Self {
        Program { decls, body }
    }
}
