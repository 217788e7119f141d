//! SRAM dump reader
//!
//! Dumps are CSV files with an `Address,Word` header followed by one
//! `address,byte` row per memory address, both in hexadecimal:
//!
//! ```text
//! Address,Word
//! 0000,a5
//! 0001,3c
//! ```
//!
//! The capture tool writes the header without a line break, so the first
//! record usually ends up glued to it (`Address,Word0000,a5`). The reader
//! recovers that record. A dual-chip capture writes the second chip's dump
//! straight after the first one in the same file; `split_captures` separates
//! them again.

use crate::bitstream::DumpRecord;
use crate::error::{AnalysisError, Result};
use std::fs;
use std::path::{Path, PathBuf};

const HEADER_ADDRESS: &str = "Address";
const HEADER_WORD: &str = "Word";

/// File name of run `index` (1-based) for a capture set named `stem`
///
/// # Example
/// ```
/// use pufstat::dump::run_file_name;
///
/// assert_eq!(run_file_name("AUG3", 12), "AUG3_12.csv");
/// ```
pub fn run_file_name(stem: &str, index: usize) -> String {
    format!("{}_{}.csv", stem, index)
}

/// Path of run `index` inside `dir`
pub fn run_file_path(dir: &Path, stem: &str, index: usize) -> PathBuf {
    dir.join(run_file_name(stem, index))
}

/// Parse the text of a dump into ordered records
///
/// Blank lines are ignored; line numbers in errors are 1-based.
pub fn parse_dump(content: &str) -> Result<Vec<DumpRecord>> {
    let mut records = Vec::new();
    let mut lines = content.lines().enumerate();

    if let Some((_, header)) = lines.next() {
        if let Some(glued) = glued_record(header) {
            records.push(parse_line(1, glued)?);
        }
    }

    for (index, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_line(index + 1, line)?);
    }

    Ok(records)
}

/// Text of a record glued onto the header line, if any
fn glued_record(header: &str) -> Option<&str> {
    let header = header.trim_start_matches('\u{feff}').trim();
    let rest = header.strip_prefix(HEADER_ADDRESS)?;
    let rest = rest.trim_start().strip_prefix(',')?;
    let rest = rest.trim_start().strip_prefix(HEADER_WORD)?;
    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}

fn parse_line(line: usize, text: &str) -> Result<DumpRecord> {
    let mut fields = text.split(',');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(address), Some(byte), None) => DumpRecord::parse_hex(line, address, byte),
        _ => Err(AnalysisError::format(
            line,
            format!("expected 'address,byte', got '{}'", text.trim()),
        )),
    }
}

/// Read and parse a dump file
///
/// # Errors
/// `Resource` if the file cannot be read, `Format` for malformed rows.
pub fn read_dump(path: &Path) -> Result<Vec<DumpRecord>> {
    let content = fs::read_to_string(path).map_err(|e| AnalysisError::resource(path, e))?;
    let records = parse_dump(&content)?;
    tracing::debug!(path = %path.display(), records = records.len(), "read dump");
    Ok(records)
}

/// Split back-to-back captures of `capture_len` records each
///
/// # Errors
/// `Format` when the record count is not a multiple of `capture_len`.
pub fn split_captures(records: Vec<DumpRecord>, capture_len: usize) -> Result<Vec<Vec<DumpRecord>>> {
    if capture_len == 0 {
        return Err(AnalysisError::InvalidConfig(
            "capture length must be positive".to_string(),
        ));
    }
    if records.len() % capture_len != 0 {
        return Err(AnalysisError::format(
            records.len() + 1,
            format!(
                "{} records do not divide into captures of {}",
                records.len(),
                capture_len
            ),
        ));
    }

    Ok(records
        .chunks(capture_len)
        .map(|capture| capture.to_vec())
        .collect())
}
