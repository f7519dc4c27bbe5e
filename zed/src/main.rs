//! `zed` — compile and run a Zed program against zero or more data files.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use zed::bytecode_file;
use zed::compiler::CompiledProgram;
use zed::error::ZedError;
use zed::Driver;

#[cfg(feature = "test-helpers")]
use zed::reference_machine::ReferenceMachine;

/// Compile and run a Zed program over a stream of records.
#[derive(Parser, Debug)]
#[command(name = "zed", version, about)]
struct Cli {
    /// Program file. A `.zbc` extension is read as precompiled bytecode;
    /// anything else is treated as Zed source.
    program: PathBuf,

    /// Data files to process, in order. Use `-` for standard input. With
    /// none given, only `onInit`/`onExit` run.
    data_files: Vec<String>,

    /// Maximum bytes allowed in a single record before it's an error.
    #[arg(long, default_value_t = zed::driver::DEFAULT_MAX_RECORD_LEN)]
    max_record_len: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("zed: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let program = load_program(&cli.program)?;

    #[cfg(feature = "test-helpers")]
    let machine = ReferenceMachine::new();
    #[cfg(not(feature = "test-helpers"))]
    let machine = NoMachine;

    let mut driver = Driver::new(machine, program).with_max_record_len(cli.max_record_len);
    driver.run(&cli.data_files, std::io::stdout())?;
    Ok(())
}

fn load_program(path: &PathBuf) -> Result<CompiledProgram, ZedError> {
    if path.extension().and_then(|e| e.to_str()) == Some("zbc") {
        let bytes = fs::read(path)?;
        bytecode_file::read_zbc(bytes.as_slice())
    } else {
        // Lexing and parsing Zed source is a separate concern this crate
        // doesn't implement; only precompiled `.zbc` programs can be run
        // without one. See `zed_asm`/`zed::compiler` for the bytecode side.
        Err(ZedError::Parse(format!(
            "{}: no source frontend is wired into this build; supply a precompiled .zbc program",
            path.display()
        )))
    }
}

#[cfg(not(feature = "test-helpers"))]
struct NoMachine;

#[cfg(not(feature = "test-helpers"))]
impl zed::Machine for NoMachine {
    fn run(
        &mut self,
        _event: &[u8],
        _state: &mut zed::RuntimeState,
    ) -> Result<(), zed::RuntimeError> {
        Err(zed::RuntimeError::new(
            0,
            "this build has no VM linked in; rebuild with the `test-helpers` feature \
             or link a real interpreter against the `zed::machine::Machine` trait",
        ))
    }
}
