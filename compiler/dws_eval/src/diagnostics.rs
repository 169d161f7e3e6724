//! Call-stack tracking.
//!
//! `CallStack` is the live stack of script calls. It enforces the recursion
//! limit on `push` and snapshots itself into [`StackFrame`]s when an
//! exception is raised or an evaluation error first leaves a call.

use dws_ir::Pos;
use dws_runtime::errors::recursion_limit_exceeded;
use dws_runtime::{EvalError, StackFrame};

/// Default maximum number of nested script calls.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1024;

/// A single frame in the live call stack.
#[derive(Clone, Debug)]
pub struct CallFrame {
    /// Function name, `Class.Method` for methods.
    pub name: String,
    /// Where the call was made.
    pub call_pos: Pos,
}

/// Live call stack for the interpreter.
///
/// ```text
/// stack.push(CallFrame { name, call_pos })?;
/// // ... evaluate the body ...
/// stack.pop();
/// ```
#[derive(Clone, Debug)]
pub struct CallStack {
    frames: Vec<CallFrame>,
    max_depth: Option<usize>,
    file: String,
}

impl CallStack {
    /// `max_depth: None` disables the limit.
    pub fn new(max_depth: Option<usize>) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
            file: String::new(),
        }
    }

    /// Source file name recorded in captured frames.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Push a call frame, checking the depth limit.
    ///
    /// The frame is NOT pushed on overflow.
    pub fn push(&mut self, frame: CallFrame) -> Result<(), EvalError> {
        if let Some(max) = self.max_depth {
            if self.frames.len() >= max {
                return Err(recursion_limit_exceeded(max));
            }
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) {
        debug_assert!(
            !self.frames.is_empty(),
            "CallStack::pop() called on empty stack"
        );
        self.frames.pop();
    }

    /// Drop frames above `depth`. Restores the stack after a host function
    /// unwound through frames it pushed.
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Name of the innermost frame.
    pub fn current(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    /// Snapshot of the stack, oldest call first.
    pub fn capture(&self) -> Vec<StackFrame> {
        self.frames
            .iter()
            .map(|f| StackFrame {
                function: f.name.clone(),
                file: self.file.clone(),
                pos: f.call_pos,
            })
            .collect()
    }

    /// Attach a snapshot to `err` unless it already carries one.
    pub fn attach_backtrace(&self, err: EvalError) -> EvalError {
        if self.frames.is_empty() {
            return err;
        }
        err.with_backtrace(self.capture())
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new(Some(DEFAULT_MAX_RECURSION_DEPTH))
    }
}
