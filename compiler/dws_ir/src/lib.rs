//! DWS IR - Syntax tree types for the DWScript evaluation engine.
//!
//! The lexer and parser live outside this workspace. This crate defines the
//! immutable tree they hand to the evaluator:
//! - `Program`: top-level declarations plus the main statement list
//! - `Expr`/`ExprKind`, `Stmt`/`StmtKind`: closed sum types for node kinds
//! - `FunctionDecl`, `ClassDecl`, `RecordDecl`, ...: declarations
//! - `Name`/`CiMap`: case-insensitive identifiers and maps
//! - `Pos`: line/column source positions
//!
//! The [`build`] module offers terse constructors for assembling trees by
//! hand, which is how embedders without a parser (and the test suites) feed
//! the engine.

pub mod ast;
pub mod build;
mod name;
mod pos;

pub use ast::{
    AssignOp, BinaryOp, CaseBranch, CaseLabel, ClassDecl, ClassFlags, ConstDecl, Decl,
    EnumDecl, EnumMember, ExceptClause, ExceptHandler, Expr, ExprKind, FieldDecl, ForDirection,
    FunctionDecl, FunctionKind, HelperDecl, InterfaceDecl, MethodFlags, MethodSig, OperatorDecl,
    OperatorKind, Param, ParamMode, Program, PropertyDecl, RecordDecl, SetElement, Stmt,
    StmtKind, TypeRef, UnaryOp, VarDecl, Visibility,
};
pub use name::{fold_case, CiMap, Name};
pub use pos::Pos;
