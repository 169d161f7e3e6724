//! Interpreter settings and the cooperative cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::diagnostics::DEFAULT_MAX_RECURSION_DEPTH;

/// Resolved interpreter settings.
#[derive(Clone, Debug)]
pub struct InterpreterConfig {
    /// Maximum nested script calls; `None` disables the limit.
    pub max_recursion_depth: Option<usize>,
    /// File name recorded in call-stack frames.
    pub source_file: String,
    pub cancellation: Option<CancellationToken>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            max_recursion_depth: Some(DEFAULT_MAX_RECURSION_DEPTH),
            source_file: String::new(),
            cancellation: None,
        }
    }
}

/// A flag the host sets to stop a running script.
///
/// The interpreter polls it before every statement and stops with a fatal
/// `Cancelled` error once it is set. Clones share the flag, so the host can
/// keep one and hand another to the builder, possibly from another thread.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear the flag so the interpreter can run again.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}
