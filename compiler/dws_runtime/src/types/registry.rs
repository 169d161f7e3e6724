//! Name-to-descriptor registry.

use std::collections::VecDeque;
use std::rc::Rc;

use dws_ir::{fold_case, BinaryOp, CiMap, Name, OperatorKind, TypeRef};
use rustc_hash::FxHashSet;

use super::{
    builtin_meta, ArrayType, ClassInfo, EnumType, HelperInfo, InterfaceInfo, OperatorEntry,
    RecordType, TypeId, TypeMeta,
};
use crate::errors::{undefined_type, EvalError};
use crate::value::{
    ArrayValue, EnumValue, InterfaceValue, RecordValue, SetDomain, SetValue, Value,
};

/// Longest chain of user-defined implicit conversions tried.
const MAX_CONVERSION_DEPTH: usize = 3;

/// A registered named type.
#[derive(Clone, Debug)]
pub enum TypeEntry {
    Class(Rc<ClassInfo>),
    Record(Rc<RecordType>),
    Interface(Rc<InterfaceInfo>),
    Enum(Rc<EnumType>),
    /// `type TName = <type>`.
    Alias(TypeRef),
}

/// Registry of every user-declared type, helper and operator.
///
/// Filled while declarations are processed, read-only afterwards (class
/// variables aside, which live inside their `ClassInfo`).
#[derive(Debug)]
pub struct TypeRegistry {
    types: CiMap<TypeEntry>,
    /// Enum members by bare name, for unqualified references (`Red`).
    enum_members: CiMap<(Rc<EnumType>, i64)>,
    /// Most recently declared last; lookups scan from the end.
    helpers: Vec<Rc<HelperInfo>>,
    operators: Vec<OperatorEntry>,
    conversions: Vec<OperatorEntry>,
    next_id: u32,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry {
            types: CiMap::new(),
            enum_members: CiMap::new(),
            helpers: Vec::new(),
            operators: Vec::new(),
            conversions: Vec::new(),
            // 0 is reserved for anonymous record types.
            next_id: 1,
        }
    }

    /// Allocate the next type id.
    pub fn next_id(&mut self) -> TypeId {
        let id = TypeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn insert(&mut self, name: &Name, entry: TypeEntry) {
        if self.types.insert(name.clone(), entry).is_some() {
            tracing::debug!(type_name = %name, "type redeclared; later declaration wins");
        }
    }

    pub fn register_class(&mut self, class: Rc<ClassInfo>) {
        let name = class.name.clone();
        self.insert(&name, TypeEntry::Class(class));
    }

    pub fn register_record(&mut self, record: Rc<RecordType>) {
        let name = record.name.clone();
        self.insert(&name, TypeEntry::Record(record));
    }

    pub fn register_interface(&mut self, iface: Rc<InterfaceInfo>) {
        let name = iface.name.clone();
        self.insert(&name, TypeEntry::Interface(iface));
    }

    /// Register an enum and make its members visible unqualified.
    pub fn register_enum(&mut self, ty: Rc<EnumType>) {
        for (member, ordinal) in &ty.members {
            self.enum_members
                .insert(member.clone(), (Rc::clone(&ty), *ordinal));
        }
        let name = ty.name.clone();
        self.insert(&name, TypeEntry::Enum(ty));
    }

    pub fn register_alias(&mut self, name: Name, target: TypeRef) {
        self.insert(&name, TypeEntry::Alias(target));
    }

    pub fn register_helper(&mut self, helper: Rc<HelperInfo>) {
        self.helpers.push(helper);
    }

    /// Register a global operator overload or implicit conversion.
    pub fn register_operator(&mut self, entry: OperatorEntry) {
        match entry.kind {
            OperatorKind::Implicit => self.conversions.push(entry),
            OperatorKind::Binary(_) => self.operators.push(entry),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeEntry> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name) || builtin_meta(name).is_some()
    }

    pub fn class(&self, name: &str) -> Option<Rc<ClassInfo>> {
        match self.types.get(name)? {
            TypeEntry::Class(c) => Some(Rc::clone(c)),
            TypeEntry::Alias(TypeRef::Named(target)) => self.class(target.as_str()),
            _ => None,
        }
    }

    pub fn record(&self, name: &str) -> Option<Rc<RecordType>> {
        match self.types.get(name)? {
            TypeEntry::Record(r) => Some(Rc::clone(r)),
            TypeEntry::Alias(TypeRef::Named(target)) => self.record(target.as_str()),
            _ => None,
        }
    }

    pub fn interface(&self, name: &str) -> Option<Rc<InterfaceInfo>> {
        match self.types.get(name)? {
            TypeEntry::Interface(i) => Some(Rc::clone(i)),
            TypeEntry::Alias(TypeRef::Named(target)) => self.interface(target.as_str()),
            _ => None,
        }
    }

    pub fn enum_type(&self, name: &str) -> Option<Rc<EnumType>> {
        match self.types.get(name)? {
            TypeEntry::Enum(e) => Some(Rc::clone(e)),
            TypeEntry::Alias(TypeRef::Named(target)) => self.enum_type(target.as_str()),
            _ => None,
        }
    }

    /// An unqualified enum member (`Red`) as a value.
    pub fn enum_member(&self, name: &str) -> Option<Value> {
        let (ty, ordinal) = self.enum_members.get(name)?;
        Some(Value::Enum(EnumValue::new(Rc::clone(ty), *ordinal)))
    }

    /// Helpers attached to the type with folded key `key`, most recently
    /// declared first.
    pub fn helpers_for(&self, key: &str) -> impl Iterator<Item = &Rc<HelperInfo>> + '_ {
        let key = key.to_string();
        self.helpers
            .iter()
            .rev()
            .filter(move |h| h.target_key == key)
    }

    /// First global overload of `op` accepting the operands.
    pub fn find_operator(&self, op: BinaryOp, operands: &[&Value]) -> Option<&OperatorEntry> {
        self.operators
            .iter()
            .find(|e| e.is_binary(op) && e.accepts(operands))
    }

    /// Shortest chain of implicit conversions from type key `from` to `to`,
    /// at most [`MAX_CONVERSION_DEPTH`] steps. Empty when none exists.
    pub fn conversion_path(&self, from: &str, to: &str) -> Vec<&OperatorEntry> {
        let from = fold_case(from).into_owned();
        let to = fold_case(to).into_owned();
        let mut queue: VecDeque<(String, Vec<&OperatorEntry>)> = VecDeque::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        seen.insert(from.clone());
        queue.push_back((from, Vec::new()));
        while let Some((key, path)) = queue.pop_front() {
            if path.len() >= MAX_CONVERSION_DEPTH {
                continue;
            }
            for entry in &self.conversions {
                if entry.operands.first() != Some(&key) {
                    continue;
                }
                let next = entry.result_key();
                let mut step = path.clone();
                step.push(entry);
                if next == to {
                    return step;
                }
                if seen.insert(next.clone()) {
                    queue.push_back((next, step));
                }
            }
        }
        Vec::new()
    }

    /// Resolve a declared type. `None` when the name is unknown.
    pub fn resolve(&self, ty: &TypeRef) -> Option<TypeMeta> {
        self.resolve_depth(ty, 0)
    }

    fn resolve_depth(&self, ty: &TypeRef, depth: usize) -> Option<TypeMeta> {
        // Alias chains are short; a cycle means a broken declaration.
        if depth > 16 {
            return None;
        }
        match ty {
            TypeRef::Named(name) => {
                if let Some(meta) = builtin_meta(name.as_str()) {
                    return Some(meta);
                }
                Some(match self.types.get(name.as_str())? {
                    TypeEntry::Class(c) => TypeMeta::Class(Rc::clone(c)),
                    TypeEntry::Record(r) => TypeMeta::Record(Rc::clone(r)),
                    TypeEntry::Interface(i) => TypeMeta::Interface(Rc::clone(i)),
                    TypeEntry::Enum(e) => TypeMeta::Enum(Rc::clone(e)),
                    TypeEntry::Alias(target) => return self.resolve_depth(target, depth + 1),
                })
            }
            TypeRef::Array { element, bounds } => {
                let element = self.canonical(element, depth + 1);
                Some(TypeMeta::Array(Rc::new(ArrayType {
                    element,
                    bounds: *bounds,
                })))
            }
            TypeRef::Set(element) => Some(TypeMeta::Set(Box::new(
                self.resolve_depth(element, depth + 1)?,
            ))),
            TypeRef::Function { .. } => Some(TypeMeta::Function),
        }
    }

    /// Replace aliases of array/set/function types by their targets so
    /// array element types are stored unaliased.
    fn canonical(&self, ty: &TypeRef, depth: usize) -> TypeRef {
        match ty {
            TypeRef::Named(name) if depth <= 16 => match self.types.get(name.as_str()) {
                Some(TypeEntry::Alias(target)) => self.canonical(target, depth + 1),
                _ => ty.clone(),
            },
            _ => ty.clone(),
        }
    }

    pub fn resolve_or_err(&self, ty: &TypeRef) -> Result<TypeMeta, EvalError> {
        self.resolve(ty).ok_or_else(|| undefined_type(&ty.to_string()))
    }

    /// Default value of a declared type.
    ///
    /// Unknown names default to an unassigned variant so a missing
    /// declaration surfaces at first use rather than at `var`.
    pub fn default_value(&self, ty: &TypeRef) -> Value {
        match self.resolve(ty) {
            Some(meta) => self.default_for(&meta),
            None => Value::UNASSIGNED,
        }
    }

    pub fn default_for(&self, meta: &TypeMeta) -> Value {
        match meta {
            TypeMeta::Integer => Value::Integer(0),
            TypeMeta::Float => Value::Float(0.0),
            TypeMeta::String => Value::String(String::new()),
            TypeMeta::Boolean => Value::Boolean(false),
            TypeMeta::Variant => Value::UNASSIGNED,
            TypeMeta::Class(_) | TypeMeta::Function => Value::Nil,
            TypeMeta::Interface(i) => Value::Interface(InterfaceValue::nil(Rc::clone(i))),
            TypeMeta::Enum(e) => Value::Enum(EnumValue::new(Rc::clone(e), e.low())),
            TypeMeta::Set(element) => Value::Set(SetValue::empty(match &**element {
                TypeMeta::Enum(e) => SetDomain::Enum(Rc::clone(e)),
                _ => SetDomain::Ordinal,
            })),
            TypeMeta::Record(r) => Value::Record(self.new_record(r)),
            TypeMeta::Array(a) => {
                let items = match a.static_len() {
                    Some(len) => (0..len).map(|_| self.default_value(&a.element)).collect(),
                    None => Vec::new(),
                };
                Value::Array(ArrayValue::new(Rc::clone(a), items))
            }
        }
    }

    /// A record with every field at its initializer or type default.
    pub fn new_record(&self, ty: &Rc<RecordType>) -> RecordValue {
        let fields = ty
            .fields
            .values()
            .map(|f| {
                let value = match &f.default {
                    Some(v) => v.copy_for_store(),
                    None => self.default_value(&f.ty),
                };
                (f.name.clone(), value)
            })
            .collect();
        RecordValue::new(Rc::clone(ty), fields)
    }

    /// Fresh field map for an instance of `class`, base fields first.
    pub fn new_object_fields(&self, class: &ClassInfo) -> CiMap<Value> {
        class
            .all_fields()
            .into_iter()
            .map(|f| {
                let value = match &f.default {
                    Some(v) => v.copy_for_store(),
                    None => self.default_value(&f.ty),
                };
                (f.name.clone(), value)
            })
            .collect()
    }

    /// Type meta for a value, used by `TypeOf`-style reflection and `High`.
    pub fn meta_of(&self, value: &Value) -> Option<TypeMeta> {
        Some(match value.unboxed() {
            Value::Integer(_) => TypeMeta::Integer,
            Value::Float(_) => TypeMeta::Float,
            Value::String(_) => TypeMeta::String,
            Value::Boolean(_) => TypeMeta::Boolean,
            Value::Enum(e) => TypeMeta::Enum(Rc::clone(&e.ty)),
            Value::Record(r) => TypeMeta::Record(Rc::clone(r.ty())),
            Value::Object(o) => TypeMeta::Class(Rc::clone(o.class())),
            Value::Interface(i) => TypeMeta::Interface(Rc::clone(&i.info)),
            Value::Array(a) => TypeMeta::Array(Rc::clone(a.ty())),
            Value::Function(_) => TypeMeta::Function,
            Value::Variant(None) => TypeMeta::Variant,
            Value::Type(t) => t.clone(),
            Value::ClassRef(c) => TypeMeta::Class(Rc::clone(c)),
            _ => return None,
        })
    }
}
