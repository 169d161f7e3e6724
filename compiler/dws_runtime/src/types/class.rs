//! Class descriptors.

use std::cell::RefCell;
use std::rc::Rc;

use dws_ir::{ClassFlags, CiMap, FunctionDecl, Name, Pos};

use super::interface::InterfaceInfo;
use super::{FieldInfo, OperatorEntry, PropertyInfo, TypeId};
use crate::value::Value;

/// A method found by walking a class hierarchy, paired with the class that
/// declares it (needed for `inherited`).
#[derive(Clone, Debug)]
pub struct MethodRef {
    pub owner: Rc<ClassInfo>,
    pub decl: Rc<FunctionDecl>,
}

/// Runtime descriptor of a class.
///
/// Immutable after registration except for class variables, whose values
/// are shared by every instance and live behind a `RefCell`.
#[derive(Debug)]
pub struct ClassInfo {
    pub id: TypeId,
    pub name: Name,
    pub parent: Option<Rc<ClassInfo>>,
    /// Interfaces declared on this class (not its ancestors).
    pub interfaces: Vec<Rc<InterfaceInfo>>,
    /// Fields declared on this class (not its ancestors).
    pub fields: CiMap<FieldInfo>,
    /// Methods declared on this class, grouped by name for overloads.
    pub methods: CiMap<Vec<Rc<FunctionDecl>>>,
    pub properties: CiMap<PropertyInfo>,
    pub constants: CiMap<Value>,
    pub class_vars: RefCell<CiMap<Value>>,
    pub operators: Vec<OperatorEntry>,
    pub flags: ClassFlags,
    pub pos: Pos,
}

impl ClassInfo {
    /// A bare descriptor; callers fill in members before sharing it.
    pub fn new(id: TypeId, name: Name, parent: Option<Rc<ClassInfo>>) -> Self {
        ClassInfo {
            id,
            name,
            parent,
            interfaces: Vec::new(),
            fields: CiMap::new(),
            methods: CiMap::new(),
            properties: CiMap::new(),
            constants: CiMap::new(),
            class_vars: RefCell::new(CiMap::new()),
            operators: Vec::new(),
            flags: ClassFlags::empty(),
            pos: Pos::NONE,
        }
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(ClassFlags::ABSTRACT)
    }

    /// This class and its ancestors, most derived first.
    pub fn ancestry(self: &Rc<Self>) -> Vec<Rc<ClassInfo>> {
        let mut chain = vec![Rc::clone(self)];
        let mut current = self.parent.clone();
        while let Some(class) = current {
            current = class.parent.clone();
            chain.push(class);
        }
        chain
    }

    /// Whether `self` is `other` or inherits from it.
    pub fn is_descendant_of(&self, other: &ClassInfo) -> bool {
        if self.id == other.id {
            return true;
        }
        self.parent
            .as_deref()
            .is_some_and(|p| p.is_descendant_of(other))
    }

    /// Whether `self` is the named class or inherits from it.
    pub fn is_descendant_of_name(&self, name: &str) -> bool {
        if self.name.matches(name) {
            return true;
        }
        self.parent
            .as_deref()
            .is_some_and(|p| p.is_descendant_of_name(name))
    }

    /// Overload candidates for `name`, most derived first.
    ///
    /// A parent declaration is hidden when a descendant already declares a
    /// method of the same name and arity (override).
    pub fn find_methods(self: &Rc<Self>, name: &str) -> Vec<MethodRef> {
        let mut found: Vec<MethodRef> = Vec::new();
        for class in self.ancestry() {
            if let Some(decls) = class.methods.get(name) {
                for decl in decls {
                    let overridden = found
                        .iter()
                        .any(|m| m.decl.params.len() == decl.params.len());
                    if !overridden {
                        found.push(MethodRef {
                            owner: Rc::clone(&class),
                            decl: Rc::clone(decl),
                        });
                    }
                }
            }
        }
        found
    }

    /// Whether any class in the chain declares a method called `name`.
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
            || self.parent.as_deref().is_some_and(|p| p.has_method(name))
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields
            .get(name)
            .or_else(|| self.parent.as_deref()?.find_field(name))
    }

    /// Every field in the hierarchy, base class first.
    pub fn all_fields(&self) -> Vec<&FieldInfo> {
        let mut fields = self
            .parent
            .as_deref()
            .map(ClassInfo::all_fields)
            .unwrap_or_default();
        fields.extend(self.fields.values());
        fields
    }

    pub fn find_property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties
            .get(name)
            .or_else(|| self.parent.as_deref()?.find_property(name))
    }

    pub fn default_property(&self) -> Option<&PropertyInfo> {
        self.properties
            .values()
            .find(|p| p.is_default)
            .or_else(|| self.parent.as_deref()?.default_property())
    }

    pub fn find_constant(&self, name: &str) -> Option<Value> {
        self.constants
            .get(name)
            .cloned()
            .or_else(|| self.parent.as_deref()?.find_constant(name))
    }

    /// The class in the chain that declares class variable `name`.
    pub fn class_var_owner(self: &Rc<Self>, name: &str) -> Option<Rc<ClassInfo>> {
        self.ancestry()
            .into_iter()
            .find(|c| c.class_vars.borrow().contains_key(name))
    }

    /// Whether the class (or an ancestor) declares `iface` or a descendant
    /// of it.
    pub fn declares_interface(&self, iface: &InterfaceInfo) -> bool {
        self.interfaces.iter().any(|i| i.is_descendant_of(iface))
            || self
                .parent
                .as_deref()
                .is_some_and(|p| p.declares_interface(iface))
    }

    /// Structural check: every method the interface and its ancestors
    /// declare exists on the class with a compatible arity.
    pub fn satisfies(self: &Rc<Self>, iface: &InterfaceInfo) -> bool {
        iface.all_methods().iter().all(|sig| {
            self.find_methods(sig.name.as_str())
                .iter()
                .any(|m| m.decl.params.len() == sig.params.len())
        })
    }

    /// Operator overloads declared on this class and its ancestors, most
    /// derived first.
    pub fn all_operators(&self) -> Vec<&OperatorEntry> {
        let mut ops: Vec<&OperatorEntry> = self.operators.iter().collect();
        if let Some(parent) = self.parent.as_deref() {
            ops.extend(parent.all_operators());
        }
        ops
    }
}
