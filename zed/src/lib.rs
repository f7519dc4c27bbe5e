//! Compiler, bytecode driver, and CLI support for the Zed record-processing
//! language.
//!
//! A Zed program has five lifecycle events — `onInit`, `onFile`, `onRec`,
//! record-range rules, and `onExit` — each compiled independently into a
//! flat bytecode string (see [`zed_asm`] for the instruction set). This
//! crate owns everything up to the point of execution: the AST
//! ([`ast`]), the compiler ([`compiler`]), the precompiled `.zbc` file
//! format ([`bytecode_file`]), and the top-level driver loop
//! ([`driver`]) that reads records and invokes a VM once per event.
//!
//! The VM itself — the thing that actually executes a compiled event's
//! bytecode — is out of scope for this crate. [`machine`] defines only the
//! narrow contract the driver needs from one (the [`machine::Machine`]
//! trait); a real interpreter is a separate, much larger concern. The
//! `test-helpers` feature adds [`reference_machine`], a minimal
//! implementation used by this crate's own integration tests.

#![warn(missing_docs)]

pub mod ast;
pub mod bytecode_file;
pub mod compiler;
pub mod driver;
pub mod error;
pub mod machine;

#[cfg(feature = "test-helpers")]
pub mod reference_machine;

pub use compiler::{compile_program, CompiledProgram};
pub use driver::Driver;
pub use error::ZedError;
pub use machine::{Globals, Machine, RuntimeError, RuntimeState};
