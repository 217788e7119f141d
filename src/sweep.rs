//! Block-count sweep over one chip run

use crate::bitstream::BitArray;
use crate::block_stats::{analyze, ConfigurationResult};
use crate::error::{AnalysisError, Result};
use crate::partition::Geometry;
use serde::{Deserialize, Serialize};

/// Range of block-grid sides `k`; each configuration uses `k²` blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockCountSweep {
    pub min_k: usize,
    /// Inclusive upper bound
    pub max_k: usize,
}

impl Default for BlockCountSweep {
    fn default() -> Self {
        Self { min_k: 2, max_k: 20 }
    }
}

impl BlockCountSweep {
    pub fn new(min_k: usize, max_k: usize) -> Self {
        Self { min_k, max_k }
    }

    /// Block counts `k²` in increasing order
    ///
    /// # Example
    /// ```
    /// use pufstat::sweep::BlockCountSweep;
    ///
    /// let counts: Vec<usize> = BlockCountSweep::new(2, 4).block_counts().collect();
    /// assert_eq!(counts, vec![4, 9, 16]);
    /// ```
    pub fn block_counts(&self) -> impl Iterator<Item = usize> {
        (self.min_k..=self.max_k).map_while(|k| k.checked_mul(k))
    }

    pub fn len(&self) -> usize {
        (self.min_k..=self.max_k).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_k == 0 {
            return Err(AnalysisError::InvalidConfig(
                "sweep min_k must be at least 1".to_string(),
            ));
        }
        if self.min_k > self.max_k {
            return Err(AnalysisError::InvalidConfig(format!(
                "sweep min_k {} exceeds max_k {}",
                self.min_k, self.max_k
            )));
        }
        if self.max_k.checked_mul(self.max_k).is_none() {
            return Err(AnalysisError::InvalidConfig(format!(
                "sweep max_k {} is too large",
                self.max_k
            )));
        }
        Ok(())
    }
}

/// Outcome of one block-count configuration within a sweep
#[derive(Debug)]
pub struct SweepOutcome {
    pub blocks: usize,
    pub result: Result<ConfigurationResult>,
}

/// Analyze `bits` once per block count of `sweep`
///
/// Every configuration is attempted; failures are returned in place so the
/// caller can decide whether to abort or skip.
pub fn sweep_run(bits: &BitArray, sweep: &BlockCountSweep, geometry: &Geometry) -> Vec<SweepOutcome> {
    sweep
        .block_counts()
        .map(|blocks| SweepOutcome {
            blocks,
            result: analyze(bits, blocks, geometry),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sweep() {
        let sweep = BlockCountSweep::default();
        let counts: Vec<usize> = sweep.block_counts().collect();
        assert_eq!(counts.len(), 19);
        assert_eq!(sweep.len(), 19);
        assert_eq!(counts[0], 4);
        assert_eq!(counts[18], 400);
    }

    #[test]
    fn test_validate() {
        assert!(BlockCountSweep::default().validate().is_ok());
        assert!(BlockCountSweep::new(0, 3).validate().is_err());
        assert!(BlockCountSweep::new(5, 4).validate().is_err());
        assert!(BlockCountSweep::new(5, 4).is_empty());
        assert!(BlockCountSweep::new(2, usize::MAX).validate().is_err());
    }

    #[test]
    fn test_block_counts_stop_before_overflow() {
        // (2^32)² no longer fits in 64 bits
        let k = 1usize << 32;
        let counts: Vec<usize> = BlockCountSweep::new(k - 1, k + 5).block_counts().collect();
        assert_eq!(counts, vec![(k - 1) * (k - 1)]);

        let big = 1usize << 31;
        let counts: Vec<usize> = BlockCountSweep::new(big, big).block_counts().collect();
        assert_eq!(counts, vec![1usize << 62]);
    }

    #[test]
    fn test_sweep_run_keeps_order_and_errors() {
        let bits: BitArray = (0..64).map(|i| i % 2 == 0).collect();
        let geometry = Geometry {
            bit_len: 64,
            row_width: 8,
            centering_divisor: 511,
        };
        // k = 1 is degenerate, k = 2..4 fit, k = 9 leaves no room
        let outcomes = sweep_run(&bits, &BlockCountSweep::new(1, 4), &geometry);
        let blocks: Vec<usize> = outcomes.iter().map(|o| o.blocks).collect();
        assert_eq!(blocks, vec![1, 4, 9, 16]);
        assert!(matches!(
            outcomes[0].result,
            Err(AnalysisError::DegenerateSample { samples: 1 })
        ));
        assert!(outcomes[1..].iter().all(|o| o.result.is_ok()));

        let outcomes = sweep_run(&bits, &BlockCountSweep::new(9, 9), &geometry);
        assert!(matches!(
            outcomes[0].result,
            Err(AnalysisError::Partition { blocks: 81, .. })
        ));
    }

    #[test]
    fn test_default_sweep_on_full_array() {
        let bits: BitArray = (0..65536).map(|i| (i * 7) % 5 < 2).collect();
        let outcomes = sweep_run(&bits, &BlockCountSweep::default(), &Geometry::default());
        assert_eq!(outcomes.len(), 19);
        for outcome in outcomes {
            let result = outcome.result.unwrap();
            assert_eq!(result.densities.len(), outcome.blocks);
        }
    }
}
