//! Inverted-polarity band correction
//!
//! Part of the SRAM address space reports power-up values with inverted
//! polarity. Negating every bit inside that band puts the whole array on the
//! same "density of ones" convention before any statistics are computed.

use crate::bitstream::BitArray;
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Inclusive bit-index band whose polarity is inverted
///
/// # Example
/// ```
/// use pufstat::inversion::InversionBand;
///
/// let band = InversionBand::default();
/// assert_eq!((band.low, band.high), (16384, 49150));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InversionBand {
    /// First inverted bit index
    pub low: usize,
    /// Last inverted bit index (inclusive)
    pub high: usize,
    /// When false, `apply` passes bits through unchanged
    pub enabled: bool,
}

impl Default for InversionBand {
    fn default() -> Self {
        Self {
            low: 16384,
            high: 49150,
            enabled: true,
        }
    }
}

impl InversionBand {
    pub fn new(low: usize, high: usize) -> Self {
        Self {
            low,
            high,
            enabled: true,
        }
    }

    /// A band that inverts nothing
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.enabled && self.low <= index && index <= self.high
    }

    pub fn validate(&self) -> Result<()> {
        if self.low > self.high {
            return Err(AnalysisError::InvalidConfig(format!(
                "inversion band low bound {} exceeds high bound {}",
                self.low, self.high
            )));
        }
        Ok(())
    }

    /// Return a copy of `bits` with every bit inside the band negated
    ///
    /// A band reaching past the end of the array is clipped to it.
    pub fn apply(&self, bits: &BitArray) -> BitArray {
        let raw = bits
            .as_slice()
            .iter()
            .enumerate()
            .map(|(i, &b)| if self.contains(i) { b ^ 1 } else { b })
            .collect();
        BitArray::from_raw(raw)
    }
}
