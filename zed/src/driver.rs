//! The top-level loop: compile once, then invoke the five event programs
//! around a stream-of-records reading loop.
//!
//! Ordering is strictly sequential: init once, then per data file (in
//! argument order) the file event followed by each record's rec/rules
//! events (in physical record order), then exit once at the end. Everything
//! runs on one thread; a temporary arena's worth of state (the record
//! buffer, the split columns) is logically scoped to one record and
//! replaced on the next.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

use crate::compiler::CompiledProgram;
use crate::error::ZedError;
use crate::machine::{Machine, RuntimeState};

/// Default cap on a single record's length, in bytes. Chosen as a generous
/// but finite substitute for the reference implementation's fixed-size
/// on-stack record buffer.
pub const DEFAULT_MAX_RECORD_LEN: usize = 1 << 20;

/// Which of the five event programs is being invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Init,
    File,
    Rec,
    Rules,
    Exit,
}

/// Drives one run of a compiled program over a list of data files.
pub struct Driver<M> {
    machine: M,
    program: CompiledProgram,
    state: RuntimeState,
    max_record_len: usize,
}

impl<M: Machine> Driver<M> {
    /// Builds a driver around a compiled program and the VM that will
    /// execute it, with default globals and record-length limit.
    pub fn new(machine: M, program: CompiledProgram) -> Self {
        Self {
            machine,
            program,
            state: RuntimeState::new(),
            max_record_len: DEFAULT_MAX_RECORD_LEN,
        }
    }

    /// Overrides the maximum record length; exceeding it is a runtime error.
    pub fn with_max_record_len(mut self, max_record_len: usize) -> Self {
        self.max_record_len = max_record_len;
        self
    }

    /// Grants read access to the runtime state, mainly for tests that want
    /// to inspect globals after a run.
    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    /// Runs init, then each data file's file/rec/rules events in order, then
    /// exit, then flushes the output buffer to `stdout`.
    ///
    /// A data file named `-` reads from standard input.
    pub fn run<W: Write>(&mut self, data_files: &[String], mut stdout: W) -> Result<(), ZedError> {
        self.invoke(EventKind::Init)?;

        for filename in data_files {
            self.state.globals.file = filename.clone();
            self.state.globals.frnum = 1;
            self.invoke(EventKind::File)?;
            self.run_file(filename)?;
        }

        self.invoke(EventKind::Exit)?;
        stdout.write_all(&self.state.output)?;
        stdout.flush()?;
        Ok(())
    }

    fn run_file(&mut self, filename: &str) -> Result<(), ZedError> {
        let mut reader = open_data_file(filename)?;
        loop {
            let delim = self.state.globals.irs.first().copied().unwrap_or(b'\n');
            let Some(record) = read_record(&mut reader, delim, self.max_record_len)? else {
                break;
            };

            self.state.globals.rec = record;
            self.invoke(EventKind::Rec)?;
            self.split_columns();

            let output_before = self.state.output.len();
            self.invoke(EventKind::Rules)?;
            if self.state.output.len() > output_before {
                let ors = self.state.globals.ors.clone();
                self.state.output.extend_from_slice(&ors);
            }

            self.state.globals.rnum += 1;
            self.state.globals.frnum += 1;
        }
        Ok(())
    }

    fn split_columns(&mut self) {
        let ics = self.state.globals.ics.first().copied().unwrap_or(b',');
        self.state.globals.cols = self
            .state
            .globals
            .rec
            .split(|&b| b == ics)
            .map(|field| field.to_vec())
            .collect();
    }

    fn invoke(&mut self, event: EventKind) -> Result<(), ZedError> {
        let bytes = match event {
            EventKind::Init => &self.program.init,
            EventKind::File => &self.program.file,
            EventKind::Rec => &self.program.rec,
            EventKind::Rules => &self.program.rules,
            EventKind::Exit => &self.program.exit,
        };
        self.machine.run(bytes, &mut self.state)?;
        Ok(())
    }
}

fn open_data_file(filename: &str) -> io::Result<Box<dyn BufRead>> {
    if filename == "-" {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        Ok(Box::new(BufReader::new(File::open(filename)?)))
    }
}

/// Reads one record, delimited by `delim`, capped at `max_len` bytes.
/// Returns `None` at end of input. The final record need not end with the
/// delimiter.
fn read_record(
    reader: &mut dyn BufRead,
    delim: u8,
    max_len: usize,
) -> Result<Option<Vec<u8>>, ZedError> {
    let mut buf = Vec::new();
    let n = reader.read_until(delim, &mut buf)?;
    if n == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&delim) {
        buf.pop();
    }
    if buf.len() > max_len {
        return Err(ZedError::RecordTooLong { limit: max_len });
    }
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::RuntimeError;
    use std::io::Cursor;

    /// A machine whose event handlers are plain closures, for exercising the
    /// driver's record loop without any real opcode semantics.
    struct ScriptedMachine<F> {
        on_event: F,
    }

    impl<F> Machine for ScriptedMachine<F>
    where
        F: FnMut(&[u8], &mut RuntimeState) -> Result<(), RuntimeError>,
    {
        fn run(&mut self, event: &[u8], state: &mut RuntimeState) -> Result<(), RuntimeError> {
            (self.on_event)(event, state)
        }
    }

    fn compiled_with_tags() -> CompiledProgram {
        // Distinguish events by a one-byte tag so the test machine can tell
        // which one it was invoked for without decoding real opcodes.
        CompiledProgram {
            init: vec![b'i'],
            file: vec![b'f'],
            rec: vec![b'r'],
            rules: vec![b'u'],
            exit: vec![b'x'],
        }
    }

    #[test]
    fn echoes_each_record_and_appends_ors() {
        let program = compiled_with_tags();
        let machine = ScriptedMachine {
            on_event: |event, state: &mut RuntimeState| {
                if event == [b'u'] {
                    let rec = state.globals.rec.clone();
                    state.output.extend_from_slice(&rec);
                }
                Ok(())
            },
        };
        let mut driver = Driver::new(machine, program);

        let mut stdout = Vec::new();
        let mut reader: Box<dyn BufRead> = Box::new(Cursor::new(b"a\nb\n".to_vec()));
        let delim = driver.state.globals.irs[0];
        driver.state.globals.file = "-".into();
        driver.state.globals.frnum = 1;
        driver.invoke(EventKind::File).unwrap();

        while let Some(rec) = read_record(&mut reader, delim, driver.max_record_len).unwrap() {
            driver.state.globals.rec = rec;
            driver.invoke(EventKind::Rec).unwrap();
            driver.split_columns();
            let before = driver.state.output.len();
            driver.invoke(EventKind::Rules).unwrap();
            if driver.state.output.len() > before {
                let ors = driver.state.globals.ors.clone();
                driver.state.output.extend_from_slice(&ors);
            }
            driver.state.globals.rnum += 1;
            driver.state.globals.frnum += 1;
        }
        driver.invoke(EventKind::Exit).unwrap();
        stdout.write_all(&driver.state.output).unwrap();

        assert_eq!(stdout, b"a\nb\n");
    }

    #[test]
    fn no_data_files_runs_only_init_and_exit() {
        let program = compiled_with_tags();
        let seen = std::cell::RefCell::new(Vec::new());
        let machine = ScriptedMachine {
            on_event: |event, state: &mut RuntimeState| {
                seen.borrow_mut().push(event[0]);
                if event == [b'i'] {
                    state.output.extend_from_slice(b"hi");
                }
                Ok(())
            },
        };
        let mut driver = Driver::new(machine, program);
        let mut stdout = Vec::new();
        driver.run(&[], &mut stdout).unwrap();

        assert_eq!(*seen.borrow(), vec![b'i', b'x']);
        assert_eq!(stdout, b"hi");
    }

    #[test]
    fn dash_selects_standard_input() {
        assert!(open_data_file("-").is_ok());
    }

    #[test]
    fn record_over_the_limit_is_rejected() {
        let mut reader: Box<dyn BufRead> = Box::new(Cursor::new(b"abcdef\n".to_vec()));
        let err = read_record(&mut reader, b'\n', 3).unwrap_err();
        assert!(matches!(err, ZedError::RecordTooLong { limit: 3 }));
    }

    #[test]
    fn final_record_without_trailing_separator_is_still_read() {
        let mut reader: Box<dyn BufRead> = Box::new(Cursor::new(b"a\nb".to_vec()));
        assert_eq!(
            read_record(&mut reader, b'\n', 1024).unwrap(),
            Some(b"a".to_vec())
        );
        assert_eq!(
            read_record(&mut reader, b'\n', 1024).unwrap(),
            Some(b"b".to_vec())
        );
        assert_eq!(read_record(&mut reader, b'\n', 1024).unwrap(), None);
    }
}
