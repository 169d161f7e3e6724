//! Record, enum, array, set and helper descriptors.

use std::rc::Rc;

use dws_ir::{CiMap, FunctionDecl, Name, TypeRef};

use super::{FieldInfo, OperatorEntry, PropertyInfo, TypeId};
use crate::value::Value;

/// Runtime descriptor of a record type.
#[derive(Debug)]
pub struct RecordType {
    pub id: TypeId,
    pub name: Name,
    pub fields: CiMap<FieldInfo>,
    pub methods: CiMap<Vec<Rc<FunctionDecl>>>,
    pub properties: CiMap<PropertyInfo>,
    pub constants: CiMap<Value>,
    pub operators: Vec<OperatorEntry>,
    /// Records produced by JSON parsing and untyped record literals.
    pub anonymous: bool,
}

impl RecordType {
    pub fn new(id: TypeId, name: Name) -> Self {
        RecordType {
            id,
            name,
            fields: CiMap::new(),
            methods: CiMap::new(),
            properties: CiMap::new(),
            constants: CiMap::new(),
            operators: Vec::new(),
            anonymous: false,
        }
    }

    /// An anonymous record type with `Variant` fields.
    pub fn anonymous<'a>(field_names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut ty = RecordType::new(TypeId::ANONYMOUS, Name::new(""));
        ty.anonymous = true;
        for name in field_names {
            ty.fields.insert(
                name,
                FieldInfo {
                    name: Name::new(name),
                    ty: TypeRef::named("Variant"),
                    default: None,
                },
            );
        }
        ty
    }

    pub fn find_methods(&self, name: &str) -> &[Rc<FunctionDecl>] {
        self.methods.get(name).map_or(&[], Vec::as_slice)
    }
}

/// Runtime descriptor of an enumeration.
#[derive(Debug)]
pub struct EnumType {
    pub id: TypeId,
    pub name: Name,
    /// Members in declaration order with their ordinals.
    pub members: Vec<(Name, i64)>,
    pub is_flags: bool,
}

impl EnumType {
    pub fn name_of(&self, ordinal: i64) -> Option<&Name> {
        self.members
            .iter()
            .find(|(_, ord)| *ord == ordinal)
            .map(|(name, _)| name)
    }

    pub fn ordinal_of(&self, name: &str) -> Option<i64> {
        self.members
            .iter()
            .find(|(member, _)| member.matches(name))
            .map(|(_, ord)| *ord)
    }

    pub fn low(&self) -> i64 {
        self.members.iter().map(|(_, o)| *o).min().unwrap_or(0)
    }

    pub fn high(&self) -> i64 {
        self.members.iter().map(|(_, o)| *o).max().unwrap_or(0)
    }

    /// Position of `ordinal` in declaration order, for `Succ`/`Pred`.
    pub fn position_of(&self, ordinal: i64) -> Option<usize> {
        self.members.iter().position(|(_, o)| *o == ordinal)
    }
}

/// Array shape: element type plus optional static bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    pub element: TypeRef,
    /// `Some((low, high))` for static arrays, `None` for dynamic ones.
    pub bounds: Option<(i64, i64)>,
}

impl ArrayType {
    pub fn dynamic(element: TypeRef) -> Self {
        ArrayType {
            element,
            bounds: None,
        }
    }

    pub fn is_static(&self) -> bool {
        self.bounds.is_some()
    }

    /// Element count of a static array.
    pub fn static_len(&self) -> Option<usize> {
        let (lo, hi) = self.bounds?;
        usize::try_from(hi.checked_sub(lo)?.checked_add(1)?).ok()
    }
}

/// Extension methods attached to an existing type.
#[derive(Debug)]
pub struct HelperInfo {
    pub name: Name,
    /// Folded type key of the helped type (see `Value::type_key`).
    pub target_key: String,
    pub methods: CiMap<Vec<Rc<FunctionDecl>>>,
    pub properties: CiMap<PropertyInfo>,
}
