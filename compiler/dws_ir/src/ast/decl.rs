//! Declarations: functions, classes, records, interfaces, enums, helpers,
//! operator overloads and variables.

use bitflags::bitflags;
use std::rc::Rc;

use super::expr::Expr;
use super::operators::BinaryOp;
use super::stmt::Stmt;
use super::types::TypeRef;
use crate::{Name, Pos};

bitflags! {
    /// Method and function modifiers.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct MethodFlags: u16 {
        const VIRTUAL = 1 << 0;
        const OVERRIDE = 1 << 1;
        const ABSTRACT = 1 << 2;
        const REINTRODUCE = 1 << 3;
        const OVERLOAD = 1 << 4;
        /// `class function` / `class procedure`: callable on the class
        /// reference, `Self` is the class.
        const CLASS_METHOD = 1 << 5;
        /// `static`: class method without a `Self` binding.
        const STATIC = 1 << 6;
        /// Declared `external`; the body comes from the FFI registry.
        const EXTERNAL = 1 << 7;
    }
}

bitflags! {
    /// Class-level modifiers.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct ClassFlags: u8 {
        const ABSTRACT = 1 << 0;
        const SEALED = 1 << 1;
        const PARTIAL = 1 << 2;
        const EXTERNAL = 1 << 3;
        const STATIC = 1 << 4;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Visibility {
    Private,
    Protected,
    #[default]
    Public,
    Published,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum FunctionKind {
    #[default]
    Function,
    Procedure,
    Constructor,
    Destructor,
}

/// How an argument is passed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ParamMode {
    #[default]
    Value,
    Const,
    /// By reference; the argument must be assignable.
    Var,
    /// By reference, write-only on entry.
    Out,
    /// Deferred: the argument expression is evaluated when first read.
    Lazy,
}

impl ParamMode {
    #[inline]
    pub const fn is_by_ref(self) -> bool {
        matches!(self, Self::Var | Self::Out)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Name,
    pub ty: TypeRef,
    pub mode: ParamMode,
    pub default: Option<Expr>,
}

/// A function, procedure, method, constructor, destructor or lambda.
///
/// Methods declared in a class carry their body inline; out-of-line
/// implementations (`procedure TFoo.Bar; begin ... end;`) are merged by the
/// parser before the tree reaches the evaluator.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDecl {
    pub name: Name,
    pub kind: FunctionKind,
    pub params: Vec<Param>,
    pub return_type: Option<TypeRef>,
    /// `None` for abstract, forward and external declarations.
    pub body: Option<Vec<Stmt>>,
    /// Functions declared locally inside this one.
    pub nested: Vec<Rc<FunctionDecl>>,
    pub flags: MethodFlags,
    pub visibility: Visibility,
    pub pos: Pos,
}

impl FunctionDecl {
    /// Number of parameters that must be supplied by the caller.
    pub fn required_params(&self) -> usize {
        self.params.iter().filter(|p| p.default.is_none()).count()
    }

    pub fn has_result(&self) -> bool {
        self.return_type.is_some()
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == FunctionKind::Constructor
    }

    pub fn is_destructor(&self) -> bool {
        self.kind == FunctionKind::Destructor
    }

    pub fn is_class_method(&self) -> bool {
        self.flags
            .intersects(MethodFlags::CLASS_METHOD | MethodFlags::STATIC)
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MethodFlags::ABSTRACT)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl {
    pub name: Name,
    pub ty: TypeRef,
    pub init: Option<Expr>,
    pub visibility: Visibility,
}

/// `property Name[Index: T]: T read X write Y; default;`
///
/// `read`/`write` name either a field or a method; the registry resolves
/// which when the owning type is registered.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDecl {
    pub name: Name,
    pub ty: TypeRef,
    pub index_params: Vec<Param>,
    pub read: Option<Name>,
    pub write: Option<Name>,
    pub is_default: bool,
    pub is_class: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstDecl {
    pub name: Name,
    pub ty: Option<TypeRef>,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl {
    pub names: Vec<Name>,
    pub ty: Option<TypeRef>,
    pub init: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassDecl {
    pub name: Name,
    /// `None` means `TObject` (or nothing, for `TObject` itself).
    pub parent: Option<Name>,
    pub interfaces: Vec<Name>,
    pub fields: Vec<FieldDecl>,
    pub class_vars: Vec<FieldDecl>,
    pub constants: Vec<ConstDecl>,
    pub methods: Vec<Rc<FunctionDecl>>,
    pub properties: Vec<PropertyDecl>,
    pub operators: Vec<OperatorDecl>,
    pub flags: ClassFlags,
    pub pos: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordDecl {
    pub name: Name,
    pub fields: Vec<FieldDecl>,
    pub constants: Vec<ConstDecl>,
    pub methods: Vec<Rc<FunctionDecl>>,
    pub properties: Vec<PropertyDecl>,
    pub operators: Vec<OperatorDecl>,
    pub pos: Pos,
}

/// An interface method signature.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodSig {
    pub name: Name,
    pub params: Vec<Param>,
    pub return_type: Option<TypeRef>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceDecl {
    pub name: Name,
    pub parent: Option<Name>,
    pub methods: Vec<MethodSig>,
    pub properties: Vec<PropertyDecl>,
    pub pos: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumMember {
    pub name: Name,
    /// Explicit ordinal (`Red = 5`); otherwise previous + 1.
    pub value: Option<i64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumDecl {
    pub name: Name,
    pub members: Vec<EnumMember>,
    /// `flags` enums get power-of-two ordinals.
    pub is_flags: bool,
    pub pos: Pos,
}

/// `TStringHelper = helper for String ... end;`
#[derive(Clone, Debug, PartialEq)]
pub struct HelperDecl {
    pub name: Name,
    pub target: TypeRef,
    pub methods: Vec<Rc<FunctionDecl>>,
    pub properties: Vec<PropertyDecl>,
    pub pos: Pos,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperatorKind {
    Binary(BinaryOp),
    /// `operator implicit (T): R uses F`.
    Implicit,
}

/// An operator overload: global `operator + (T, T): R uses F;` or a
/// `class operator` member of a record or class.
#[derive(Clone, Debug, PartialEq)]
pub struct OperatorDecl {
    pub kind: OperatorKind,
    pub operands: Vec<TypeRef>,
    pub result: TypeRef,
    /// Function (global) or class/record method implementing the operator.
    pub uses: Name,
    pub pos: Pos,
}
