//! Declaration processing.
//!
//! Turns `Decl` nodes into type-registry entries and the global function
//! table. Types must be declared before they are referenced by a later
//! declaration (a parent class, an implemented interface); function bodies
//! are only resolved when called, so functions may appear in any order.

use std::rc::Rc;

use dws_ir::{
    CiMap, ClassDecl, ClassFlags, ConstDecl, Decl, EnumDecl, FieldDecl, FunctionDecl,
    HelperDecl, InterfaceDecl, MethodFlags, Name, OperatorDecl, PropertyDecl, RecordDecl,
};
use dws_runtime::errors::undefined_type;
use dws_runtime::types::type_ref_key;
use dws_runtime::{
    class_names, ClassInfo, EnumType, EvalResult, FieldInfo, HelperInfo, InterfaceInfo,
    OperatorEntry, PropertyAccess, PropertyInfo, RecordType,
};

use super::Interpreter;

impl Interpreter {
    pub(crate) fn declare_all(&mut self, decls: &[Decl]) -> EvalResult<()> {
        for decl in decls {
            self.declare_one(decl)?;
        }
        Ok(())
    }

    fn declare_one(&mut self, decl: &Decl) -> EvalResult<()> {
        match decl {
            Decl::Function(function) => {
                self.declare_function(function);
                Ok(())
            }
            Decl::Class(class) => self.declare_class(class),
            Decl::Record(record) => self.declare_record(record),
            Decl::Interface(iface) => self.declare_interface(iface),
            Decl::Enum(ty) => {
                self.declare_enum(ty);
                Ok(())
            }
            Decl::Helper(helper) => self.declare_helper(helper),
            Decl::Operator(op) => {
                self.types.register_operator(operator_entry(op));
                Ok(())
            }
            Decl::TypeAlias { name, target } => {
                self.types.register_alias(name.clone(), target.clone());
                Ok(())
            }
        }
    }

    /// Add a global function. An implementation replaces an earlier forward
    /// declaration with the same parameter list; anything else is another
    /// overload.
    fn declare_function(&mut self, decl: &Rc<FunctionDecl>) {
        tracing::trace!(name = %decl.name, "declare function");
        match self.functions.get_mut(decl.name.as_str()) {
            Some(overloads) => {
                let forward = overloads.iter_mut().find(|d| {
                    d.body.is_none()
                        && !d.flags.contains(MethodFlags::EXTERNAL)
                        && same_params(d, decl)
                });
                match forward {
                    Some(slot) => *slot = Rc::clone(decl),
                    None => overloads.push(Rc::clone(decl)),
                }
            }
            None => {
                self.functions
                    .insert(decl.name.clone(), vec![Rc::clone(decl)]);
            }
        }
    }

    fn declare_class(&mut self, decl: &ClassDecl) -> EvalResult<()> {
        tracing::debug!(class = %decl.name, "declare class");
        let existing = if decl.flags.contains(ClassFlags::PARTIAL) {
            self.types.class(decl.name.as_str())
        } else {
            None
        };
        let mut class = match &existing {
            Some(earlier) => reopen_class(earlier),
            None => {
                let parent = match &decl.parent {
                    Some(name) => Some(
                        self.types
                            .class(name.as_str())
                            .ok_or_else(|| undefined_type(name.as_str()))?,
                    ),
                    None if decl.name.matches(class_names::TOBJECT) => None,
                    None => self.types.class(class_names::TOBJECT),
                };
                ClassInfo::new(self.types.next_id(), decl.name.clone(), parent)
            }
        };
        class.flags |= decl.flags;
        class.pos = decl.pos;

        for name in &decl.interfaces {
            let iface = self
                .types
                .interface(name.as_str())
                .ok_or_else(|| undefined_type(name.as_str()))?;
            class.interfaces.push(iface);
        }
        for field in &decl.fields {
            let info = self.field_info(field)?;
            class.fields.insert(field.name.clone(), info);
        }
        for method in &decl.methods {
            add_method(&mut class.methods, method);
        }
        for constant in &decl.constants {
            let value = self.const_value(constant)?;
            class.constants.insert(constant.name.clone(), value);
        }
        for var in &decl.class_vars {
            let value = match &var.init {
                Some(init) => {
                    let value = self.eval_expr(init)?;
                    self.coerce_to_type(value, &var.ty)?
                }
                None => self.types.default_value(&var.ty),
            };
            class.class_vars.get_mut().insert(var.name.clone(), value);
        }
        for property in &decl.properties {
            let info = property_info(property, |name| {
                class.fields.contains_key(name)
                    || class.class_vars.borrow().contains_key(name)
                    || class.parent.as_ref().is_some_and(|p| {
                        p.find_field(name).is_some() || p.class_var_owner(name).is_some()
                    })
            });
            class.properties.insert(property.name.clone(), info);
        }
        class.operators.extend(decl.operators.iter().map(operator_entry));

        self.types.register_class(Rc::new(class));
        Ok(())
    }

    fn declare_record(&mut self, decl: &RecordDecl) -> EvalResult<()> {
        tracing::debug!(record = %decl.name, "declare record");
        let mut ty = RecordType::new(self.types.next_id(), decl.name.clone());
        for field in &decl.fields {
            let info = self.field_info(field)?;
            ty.fields.insert(field.name.clone(), info);
        }
        for method in &decl.methods {
            add_method(&mut ty.methods, method);
        }
        for constant in &decl.constants {
            let value = self.const_value(constant)?;
            ty.constants.insert(constant.name.clone(), value);
        }
        for property in &decl.properties {
            let info = property_info(property, |name| ty.fields.contains_key(name));
            ty.properties.insert(property.name.clone(), info);
        }
        ty.operators.extend(decl.operators.iter().map(operator_entry));
        self.types.register_record(Rc::new(ty));
        Ok(())
    }

    fn declare_interface(&mut self, decl: &InterfaceDecl) -> EvalResult<()> {
        let parent = match &decl.parent {
            Some(name) => Some(
                self.types
                    .interface(name.as_str())
                    .ok_or_else(|| undefined_type(name.as_str()))?,
            ),
            None => None,
        };
        let mut iface = InterfaceInfo::new(self.types.next_id(), decl.name.clone(), parent);
        for method in &decl.methods {
            iface.methods.insert(method.name.clone(), method.clone());
        }
        for property in &decl.properties {
            iface
                .properties
                .insert(property.name.clone(), property_info(property, |_| false));
        }
        self.types.register_interface(Rc::new(iface));
        Ok(())
    }

    fn declare_enum(&mut self, decl: &EnumDecl) {
        let mut members = Vec::with_capacity(decl.members.len());
        let mut next = if decl.is_flags { 1 } else { 0 };
        for member in &decl.members {
            let ordinal = member.value.unwrap_or(next);
            next = if decl.is_flags {
                ordinal.saturating_mul(2)
            } else {
                ordinal.saturating_add(1)
            };
            members.push((member.name.clone(), ordinal));
        }
        let id = self.types.next_id();
        self.types.register_enum(Rc::new(EnumType {
            id,
            name: decl.name.clone(),
            members,
            is_flags: decl.is_flags,
        }));
    }

    fn declare_helper(&mut self, decl: &HelperDecl) -> EvalResult<()> {
        let mut methods = CiMap::new();
        for method in &decl.methods {
            add_method(&mut methods, method);
        }
        let properties = decl
            .properties
            .iter()
            .map(|p| (p.name.clone(), property_info(p, |_| false)))
            .collect();
        let target_key = match self.types.resolve(&decl.target) {
            Some(meta) => meta.type_key(),
            None => type_ref_key(&decl.target),
        };
        self.types.register_helper(Rc::new(HelperInfo {
            name: decl.name.clone(),
            target_key,
            methods,
            properties,
        }));
        Ok(())
    }

    fn field_info(&mut self, field: &FieldDecl) -> EvalResult<FieldInfo> {
        let default = match &field.init {
            Some(init) => {
                let value = self.eval_expr(init)?;
                Some(self.coerce_to_type(value, &field.ty)?)
            }
            None => None,
        };
        Ok(FieldInfo {
            name: field.name.clone(),
            ty: field.ty.clone(),
            default,
        })
    }

    pub(crate) fn const_value(&mut self, decl: &ConstDecl) -> EvalResult {
        let value = self.eval_expr(&decl.value)?;
        match &decl.ty {
            Some(ty) => self.coerce_to_type(value, ty),
            None => Ok(value.copy_for_store()),
        }
    }
}

/// A fresh descriptor carrying every member of `earlier`, for a `partial`
/// class declared again.
fn reopen_class(earlier: &Rc<ClassInfo>) -> ClassInfo {
    let mut class = ClassInfo::new(earlier.id, earlier.name.clone(), earlier.parent.clone());
    class.interfaces = earlier.interfaces.clone();
    class.fields = earlier.fields.clone();
    class.methods = earlier.methods.clone();
    class.properties = earlier.properties.clone();
    class.constants = earlier.constants.clone();
    *class.class_vars.get_mut() = earlier.class_vars.borrow().clone();
    class.operators = earlier.operators.clone();
    class.flags = earlier.flags;
    class
}

fn add_method(table: &mut CiMap<Vec<Rc<FunctionDecl>>>, method: &Rc<FunctionDecl>) {
    match table.get_mut(method.name.as_str()) {
        Some(overloads) => overloads.push(Rc::clone(method)),
        None => {
            table.insert(method.name.clone(), vec![Rc::clone(method)]);
        }
    }
}

fn same_params(a: &FunctionDecl, b: &FunctionDecl) -> bool {
    a.params.len() == b.params.len()
        && a
            .params
            .iter()
            .zip(&b.params)
            .all(|(p, q)| p.mode == q.mode && type_ref_key(&p.ty) == type_ref_key(&q.ty))
}

/// Property descriptor; `is_field` decides whether an accessor name is a
/// field (or class variable) rather than a method.
fn property_info(decl: &PropertyDecl, is_field: impl Fn(&str) -> bool) -> PropertyInfo {
    let access = |name: &Option<Name>| match name {
        None => PropertyAccess::None,
        Some(name) if is_field(name.as_str()) => PropertyAccess::Field(name.clone()),
        Some(name) => PropertyAccess::Method(name.clone()),
    };
    PropertyInfo {
        name: decl.name.clone(),
        ty: decl.ty.clone(),
        index_params: decl.index_params.clone(),
        read: access(&decl.read),
        write: access(&decl.write),
        is_default: decl.is_default,
        is_class: decl.is_class,
    }
}

fn operator_entry(decl: &OperatorDecl) -> OperatorEntry {
    OperatorEntry {
        kind: decl.kind,
        operands: decl.operands.iter().map(type_ref_key).collect(),
        result: decl.result.clone(),
        uses: decl.uses.clone(),
    }
}

