//! Error types and offset-to-line/column diagnostics.
//!
//! Propagation policy: no local recovery. A compile error aborts compilation
//! of the whole program at the first offense; a runtime/IO error aborts the
//! phase it occurred in. Both are surfaced by the driver as
//! `<filename>:<line>:<col>: <kind>: <msg>`.

use zed_asm::Offset;

/// The specific reason a compile failed.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum CompileErrorKind {
    /// Assignment to `@file`, `@frnum`, or `@rnum`.
    #[display(fmt = "assignment to read-only global")]
    ReadOnlyGlobal,
    /// An AST variant the compiler refuses to lower, e.g. a parser bug.
    #[display(fmt = "unsupported node: {_0}")]
    UnsupportedNode(&'static str),
    /// A jump target, length, or count would not fit in 16 bits.
    #[display(fmt = "{_0} overflows the 16-bit bytecode encoding")]
    BytecodeOverflow(&'static str),
    /// `break` with no enclosing loop.
    #[display(fmt = "break outside of a loop")]
    BreakOutsideLoop,
    /// `continue` with no enclosing loop.
    #[display(fmt = "continue outside of a loop")]
    ContinueOutsideLoop,
}

impl std::error::Error for CompileErrorKind {}

/// A compile-time error, tagged with the offset of the offending node.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display(fmt = "{kind}")]
pub struct CompileError {
    /// Byte offset into the program source.
    pub offset: Offset,
    /// The underlying reason.
    pub kind: CompileErrorKind,
}

impl CompileError {
    pub fn new(offset: Offset, kind: CompileErrorKind) -> Self {
        Self { offset, kind }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Top-level error type covering every phase the driver runs through.
#[derive(Debug, derive_more::Display)]
pub enum ZedError {
    /// Lexer error, surfaced verbatim from the (out of scope) frontend.
    #[display(fmt = "{_0}")]
    Lex(String),
    /// Parser error, surfaced verbatim from the (out of scope) frontend.
    #[display(fmt = "{_0}")]
    Parse(String),
    /// A compiler diagnostic.
    #[display(fmt = "{_0}")]
    Compile(CompileError),
    /// A VM-reported runtime panic, tagged with the failing instruction's offset.
    #[display(fmt = "{_0}")]
    Runtime(crate::machine::RuntimeError),
    /// Malformed or truncated precompiled bytecode.
    #[display(fmt = "bytecode decode error: {_0}")]
    Decode(zed_asm::DecodeError),
    /// A `.zbc` file didn't carry all five declared payloads.
    #[display(fmt = "truncated .zbc file: {_0}")]
    TruncatedBytecodeFile(String),
    /// A compiled event's bytecode is too large for the `.zbc` length prefix.
    #[display(fmt = "compiled event is {_0} bytes, which overflows the .zbc u16 length prefix")]
    EventTooLargeForBytecodeFile(usize),
    /// A record exceeded the configured maximum length.
    #[display(fmt = "record exceeds maximum length of {limit} bytes")]
    RecordTooLong {
        /// The configured limit that was exceeded.
        limit: usize,
    },
    /// Any other I/O failure (opening a program/data file, writing output).
    #[display(fmt = "I/O error: {_0}")]
    Io(std::io::Error),
}

impl std::error::Error for ZedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ZedError::Compile(e) => Some(e),
            ZedError::Runtime(e) => Some(e),
            ZedError::Decode(e) => Some(e),
            ZedError::Io(e) => Some(e),
            ZedError::Lex(_)
            | ZedError::Parse(_)
            | ZedError::TruncatedBytecodeFile(_)
            | ZedError::EventTooLargeForBytecodeFile(_)
            | ZedError::RecordTooLong { .. } => None,
        }
    }
}

impl From<CompileError> for ZedError {
    fn from(e: CompileError) -> Self {
        ZedError::Compile(e)
    }
}

impl From<crate::machine::RuntimeError> for ZedError {
    fn from(e: crate::machine::RuntimeError) -> Self {
        ZedError::Runtime(e)
    }
}

impl From<zed_asm::DecodeError> for ZedError {
    fn from(e: zed_asm::DecodeError) -> Self {
        ZedError::Decode(e)
    }
}

impl From<std::io::Error> for ZedError {
    fn from(e: std::io::Error) -> Self {
        ZedError::Io(e)
    }
}

/// Converts a byte `offset` into a 1-based `(line, column)` pair by scanning
/// `source`. Column is counted in bytes, matching the offset's own units.
pub fn line_col(source: &[u8], offset: Offset) -> (usize, usize) {
    let offset = offset as usize;
    let mut line = 1usize;
    let mut col = 1usize;
    for &byte in source.iter().take(offset) {
        if byte == b'\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Formats a diagnostic the way the driver prints it:
/// `<filename>:<line>:<col>: <kind>: <msg>`.
pub fn format_diagnostic(
    filename: &str,
    source: &[u8],
    offset: Offset,
    kind: &str,
    msg: &dyn std::fmt::Display,
) -> String {
    let (line, col) = line_col(source, offset);
    format!("{filename}:{line}:{col}: {kind}: {msg}")
}
