//! Reader/writer for the precompiled `.zbc` bytecode file format.
//!
//! Five back-to-back records, one per event in the fixed order `init, file,
//! rec, rules, exit`. Each record is a `u16` little-endian length prefix
//! followed by that many raw bytes. There is no header, version, or
//! checksum: a file shorter than its five declared payloads is rejected
//! outright, and the embedded 16/64-bit operands inside each payload follow
//! whatever endianness the producing compiler used (host-endian, here).

use std::io::{self, Read, Write};

use crate::compiler::CompiledProgram;
use crate::error::ZedError;

const EVENT_COUNT: usize = 5;

/// Serializes a compiled program as five length-prefixed records.
pub fn write_zbc<W: Write>(program: &CompiledProgram, mut w: W) -> Result<(), ZedError> {
    for event in program.as_array() {
        write_record(&mut w, event)?;
    }
    Ok(())
}

fn write_record<W: Write>(w: &mut W, bytes: &[u8]) -> Result<(), ZedError> {
    let len: u16 = bytes
        .len()
        .try_into()
        .map_err(|_| ZedError::EventTooLargeForBytecodeFile(bytes.len()))?;
    w.write_all(&len.to_le_bytes())?;
    w.write_all(bytes)?;
    Ok(())
}

/// Parses a `.zbc` byte stream into its five event payloads, in fixed order.
pub fn read_zbc<R: Read>(mut r: R) -> Result<CompiledProgram, ZedError> {
    let mut events: Vec<Vec<u8>> = Vec::with_capacity(EVENT_COUNT);
    for i in 0..EVENT_COUNT {
        events.push(read_record(&mut r, i)?);
    }
    let mut events = events.into_iter();
    Ok(CompiledProgram {
        init: events.next().expect("exactly five records read"),
        file: events.next().expect("exactly five records read"),
        rec: events.next().expect("exactly five records read"),
        rules: events.next().expect("exactly five records read"),
        exit: events.next().expect("exactly five records read"),
    })
}

fn read_record<R: Read>(r: &mut R, index: usize) -> Result<Vec<u8>, ZedError> {
    let mut len_buf = [0u8; 2];
    read_exact_or_truncated(r, &mut len_buf, index, "length prefix")?;
    let len = u16::from_le_bytes(len_buf) as usize;

    let mut data = vec![0u8; len];
    read_exact_or_truncated(r, &mut data, index, "payload")?;
    Ok(data)
}

fn read_exact_or_truncated<R: Read>(
    r: &mut R,
    buf: &mut [u8],
    index: usize,
    what: &str,
) -> Result<(), ZedError> {
    match r.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(
            ZedError::TruncatedBytecodeFile(format!("missing {what} for event {index}")),
        ),
        Err(e) => Err(e.into()),
    }
}
