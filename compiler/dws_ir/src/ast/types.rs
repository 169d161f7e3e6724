//! Type references as written in declarations.

use crate::Name;
use std::fmt;

/// A type as it appears in a declaration (`Integer`, `array of TPoint`,
/// `set of TColor`, `function(Integer): String`).
///
/// Named types are resolved against the interpreter's type registry when
/// needed; nothing here is pre-resolved.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A built-in or user-declared type by name.
    Named(Name),
    /// `array of T` (dynamic) or `array[lo..hi] of T` (static).
    Array {
        element: Box<TypeRef>,
        bounds: Option<(i64, i64)>,
    },
    /// `set of T`.
    Set(Box<TypeRef>),
    /// `function(...)`/`procedure(...)` pointer types.
    Function {
        params: Vec<TypeRef>,
        returns: Option<Box<TypeRef>>,
    },
}

impl TypeRef {
    pub fn named(name: &str) -> Self {
        TypeRef::Named(Name::new(name))
    }

    pub fn array_of(element: TypeRef) -> Self {
        TypeRef::Array {
            element: Box::new(element),
            bounds: None,
        }
    }

    pub fn static_array(element: TypeRef, low: i64, high: i64) -> Self {
        TypeRef::Array {
            element: Box::new(element),
            bounds: Some((low, high)),
        }
    }

    pub fn set_of(element: TypeRef) -> Self {
        TypeRef::Set(Box::new(element))
    }

    /// The name when this is a plain named reference.
    pub fn as_named(&self) -> Option<&Name> {
        match self {
            TypeRef::Named(name) => Some(name),
            _ => None,
        }
    }

    /// Whether this names the given type, ignoring case.
    pub fn is_named(&self, name: &str) -> bool {
        self.as_named().is_some_and(|n| n.matches(name))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{name}"),
            TypeRef::Array {
                element,
                bounds: None,
            } => write!(f, "array of {element}"),
            TypeRef::Array {
                element,
                bounds: Some((lo, hi)),
            } => write!(f, "array[{lo}..{hi}] of {element}"),
            TypeRef::Set(element) => write!(f, "set of {element}"),
            TypeRef::Function { params, returns } => {
                let kind = if returns.is_some() {
                    "function"
                } else {
                    "procedure"
                };
                write!(f, "{kind}(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")?;
                if let Some(ret) = returns {
                    write!(f, ": {ret}")?;
                }
                Ok(())
            }
        }
    }
}
