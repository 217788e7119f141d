//! Bit stream decoding for SRAM power-up dumps
//!
//! A dump is an ordered list of `(address, byte)` records. Decoding expands
//! every byte into its eight bits, most significant bit first, and
//! concatenates them in record order. The decoder never sorts records or
//! fills address gaps: completeness and order are the caller's contract.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// One memory address and the byte read from it at power-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpRecord {
    pub address: u32,
    pub byte: u8,
}

impl DumpRecord {
    /// Parse a record from its hexadecimal address and byte fields
    ///
    /// `line` is only used for error reporting.
    ///
    /// # Example
    /// ```
    /// use pufstat::bitstream::DumpRecord;
    ///
    /// let record = DumpRecord::parse_hex(2, "00ff", "a5").unwrap();
    /// assert_eq!(record.address, 0xff);
    /// assert_eq!(record.byte, 0xa5);
    /// ```
    pub fn parse_hex(line: usize, address: &str, byte: &str) -> Result<Self> {
        let address_text = address.trim();
        let address = u32::from_str_radix(address_text, 16).map_err(|e| {
            AnalysisError::format(line, format!("address '{}': {}", address_text, e))
        })?;

        let byte_text = byte.trim();
        // hex::decode wants an even digit count; a single digit is a valid byte
        let padded = if byte_text.len() == 1 {
            format!("0{}", byte_text)
        } else {
            byte_text.to_string()
        };
        let decoded = hex::decode(&padded)
            .map_err(|e| AnalysisError::format(line, format!("byte '{}': {}", byte_text, e)))?;
        let byte = match decoded.as_slice() {
            [b] => *b,
            _ => {
                return Err(AnalysisError::format(
                    line,
                    format!("byte '{}' is outside [00, ff]", byte_text),
                ))
            }
        };

        Ok(Self { address, byte })
    }
}

/// Ordered, immutable sequence of bits (each element 0 or 1)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BitArray {
    bits: Vec<u8>,
}

impl BitArray {
    /// Number of bits
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Bit at `index`, if in range
    pub fn get(&self, index: usize) -> Option<bool> {
        self.bits.get(index).map(|&b| b == 1)
    }

    /// Raw bits as 0/1 values
    pub fn as_slice(&self) -> &[u8] {
        &self.bits
    }

    pub fn count_ones(&self) -> usize {
        self.bits.iter().map(|&b| b as usize).sum()
    }

    /// Fraction of set bits over the whole array, `None` when empty
    pub fn density(&self) -> Option<f64> {
        if self.bits.is_empty() {
            None
        } else {
            Some(self.count_ones() as f64 / self.bits.len() as f64)
        }
    }

    pub(crate) fn from_raw(bits: Vec<u8>) -> Self {
        debug_assert!(bits.iter().all(|&b| b <= 1));
        Self { bits }
    }
}

impl FromIterator<bool> for BitArray {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self {
            bits: iter.into_iter().map(u8::from).collect(),
        }
    }
}

/// Expand records into a bit array, MSB first within each byte
pub fn decode(records: &[DumpRecord]) -> BitArray {
    let mut bits = Vec::with_capacity(records.len() * 8);
    for record in records {
        for shift in (0..8).rev() {
            bits.push((record.byte >> shift) & 1);
        }
    }
    BitArray::from_raw(bits)
}
