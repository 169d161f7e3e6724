//! Interface descriptors.

use std::rc::Rc;

use dws_ir::{CiMap, MethodSig, Name};

use super::{PropertyInfo, TypeId};

#[derive(Debug)]
pub struct InterfaceInfo {
    pub id: TypeId,
    pub name: Name,
    pub parent: Option<Rc<InterfaceInfo>>,
    /// Methods declared on this interface (not its ancestors).
    pub methods: CiMap<MethodSig>,
    pub properties: CiMap<PropertyInfo>,
}

impl InterfaceInfo {
    pub fn new(id: TypeId, name: Name, parent: Option<Rc<InterfaceInfo>>) -> Self {
        InterfaceInfo {
            id,
            name,
            parent,
            methods: CiMap::new(),
            properties: CiMap::new(),
        }
    }

    /// Methods of this interface and all its ancestors.
    pub fn all_methods(&self) -> Vec<&MethodSig> {
        let mut methods: Vec<&MethodSig> = self.methods.values().collect();
        if let Some(parent) = self.parent.as_deref() {
            methods.extend(parent.all_methods());
        }
        methods
    }

    pub fn find_method(&self, name: &str) -> Option<&MethodSig> {
        self.methods
            .get(name)
            .or_else(|| self.parent.as_deref()?.find_method(name))
    }

    pub fn find_property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties
            .get(name)
            .or_else(|| self.parent.as_deref()?.find_property(name))
    }

    /// Whether `self` is `other` or extends it.
    pub fn is_descendant_of(&self, other: &InterfaceInfo) -> bool {
        if self.id == other.id {
            return true;
        }
        self.parent
            .as_deref()
            .is_some_and(|p| p.is_descendant_of(other))
    }

    /// Upcast check: the source method set must be a superset of the
    /// target's (by name and arity).
    pub fn is_compatible_with(&self, target: &InterfaceInfo) -> bool {
        if self.is_descendant_of(target) {
            return true;
        }
        let mine = self.all_methods();
        target.all_methods().iter().all(|wanted| {
            mine.iter().any(|have| {
                have.name == wanted.name && have.params.len() == wanted.params.len()
            })
        })
    }
}
