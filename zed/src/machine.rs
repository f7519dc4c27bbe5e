//! The driver's invocation contract with a VM.
//!
//! Opcode semantics during execution belong to the interpreter proper, which
//! is out of scope here (see the crate-level docs). What the driver needs is
//! just this: something it can hand a compiled event's bytes and a bit of
//! shared, mutable runtime state to, and get back either success or a
//! runtime error tagged with the failing instruction's offset.

use zed_asm::Offset;

/// Shared state threaded through every event invocation for one run of the
/// driver: the predefined globals and the buffered output.
#[derive(Debug, Default)]
pub struct RuntimeState {
    pub globals: Globals,
    /// Bytes written by `print`/`redir` with no target, flushed to stdout at
    /// the end of the run.
    pub output: Vec<u8>,
}

impl RuntimeState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The predefined globals a Zed program can read or, except for the
/// read-only three, write.
#[derive(Debug, Clone)]
pub struct Globals {
    /// `@file` — read-only, set by the driver before each file's `onFile`.
    pub file: String,
    /// `@frnum` — read-only, 1-based record number within the current file.
    pub frnum: u64,
    /// `@rnum` — read-only, 1-based record number across all files.
    pub rnum: u64,
    /// `@ics` — input column separator; only the first byte is used to split.
    pub ics: Vec<u8>,
    /// `@irs` — input record separator; only the first byte is used to split.
    pub irs: Vec<u8>,
    /// `@ocs` — output column separator.
    pub ocs: Vec<u8>,
    /// `@ors` — output record separator, appended after a record that grew
    /// the output buffer.
    pub ors: Vec<u8>,
    /// `@rec` — the current record's raw bytes.
    pub rec: Vec<u8>,
    /// `@cols` — the current record split into fields by `@ics`.
    pub cols: Vec<Vec<u8>>,
}

impl Default for Globals {
    fn default() -> Self {
        Self {
            file: String::new(),
            frnum: 0,
            rnum: 0,
            ics: vec![b','],
            irs: vec![b'\n'],
            ocs: vec![b','],
            ors: vec![b'\n'],
            rec: Vec::new(),
            cols: Vec::new(),
        }
    }
}

/// The one method a VM must offer the driver: execute a compiled event's
/// bytecode against the shared runtime state.
pub trait Machine {
    /// Runs `event`'s bytecode to completion (or a `func_return`/panic).
    fn run(&mut self, event: &[u8], state: &mut RuntimeState) -> Result<(), RuntimeError>;
}

/// An error raised by a VM while executing an instruction, tagged with that
/// instruction's embedded source offset.
#[derive(Debug, Clone, derive_more::Display)]
#[display(fmt = "{message}")]
pub struct RuntimeError {
    pub offset: Offset,
    pub message: String,
}

impl RuntimeError {
    pub fn new(offset: Offset, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
