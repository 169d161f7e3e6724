//! Names the evaluator binds or looks up on every call.
//!
//! Built once per interpreter so the call path clones a `Name` instead of
//! folding the same literal again.

use dws_ir::Name;

#[derive(Clone)]
pub(crate) struct KnownNames {
    /// `Self` inside methods.
    pub(crate) self_: Name,
    /// `Result` inside functions.
    pub(crate) result: Name,
    pub(crate) create: Name,
    pub(crate) destroy: Name,
    pub(crate) message: Name,
}

impl KnownNames {
    pub(crate) fn new() -> Self {
        Self {
            self_: Name::new("Self"),
            result: Name::new("Result"),
            create: Name::new("Create"),
            destroy: Name::new("Destroy"),
            message: Name::new("Message"),
        }
    }
}
