//! Per-block density statistics
//!
//! For one block-count configuration this computes the density of set bits
//! in every block, the mean of those densities and their sample standard
//! deviation (n − 1 denominator). Everything here is a pure function of its
//! inputs; the same block slices always give the same result, in the same
//! order.

use crate::bitstream::BitArray;
use crate::error::{AnalysisError, Result};
use crate::partition::{BlockLayout, Geometry};
use serde::{Deserialize, Serialize};

/// Arithmetic mean
///
/// # Errors
/// `DegenerateSample` on empty input.
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(AnalysisError::DegenerateSample { samples: 0 });
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Mean and sum of squared deviations from it
///
/// Both passes run on offsets from the first value, so identical inputs give
/// exactly zero spread and tightly clustered ones keep full f64 precision.
fn mean_and_sum_sq(values: &[f64]) -> Result<(f64, f64)> {
    let Some(&origin) = values.first() else {
        return Err(AnalysisError::DegenerateSample { samples: 0 });
    };
    let offset_mean = values.iter().map(|v| v - origin).sum::<f64>() / values.len() as f64;
    let sum_sq = values
        .iter()
        .map(|v| {
            let d = (v - origin) - offset_mean;
            d * d
        })
        .sum();
    Ok((origin + offset_mean, sum_sq))
}

/// Sample standard deviation (n − 1 denominator)
///
/// # Errors
/// `DegenerateSample` with fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> Result<f64> {
    if values.len() < 2 {
        return Err(AnalysisError::DegenerateSample {
            samples: values.len(),
        });
    }
    let (_, sum_sq) = mean_and_sum_sq(values)?;
    Ok((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Mean and population standard deviation (n denominator)
///
/// # Errors
/// `DegenerateSample` on empty input.
pub fn mean_and_population_std_dev(values: &[f64]) -> Result<(f64, f64)> {
    let (mean, sum_sq) = mean_and_sum_sq(values)?;
    Ok((mean, (sum_sq / values.len() as f64).sqrt()))
}

/// Density of ones in each slice, in input order
pub fn densities<I, S>(slices: I) -> Result<Vec<f64>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    slices
        .into_iter()
        .map(|slice| {
            let bits = slice.as_ref();
            if bits.is_empty() {
                return Err(AnalysisError::DegenerateSample { samples: 0 });
            }
            let ones: usize = bits.iter().map(|&b| b as usize).sum();
            Ok(ones as f64 / bits.len() as f64)
        })
        .collect()
}

/// Densities of the blocks in one configuration with their aggregates
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatistics {
    pub densities: Vec<f64>,
    pub mean: f64,
    pub std_dev: f64,
}

impl BlockStatistics {
    /// Compute statistics over ordered block member slices
    ///
    /// # Example
    /// ```
    /// use pufstat::block_stats::BlockStatistics;
    ///
    /// let stats = BlockStatistics::from_slices([[1u8, 1], [0, 1], [0, 0]]).unwrap();
    /// assert_eq!(stats.densities, vec![1.0, 0.5, 0.0]);
    /// assert_eq!(stats.mean, 0.5);
    /// ```
    ///
    /// # Errors
    /// `DegenerateSample` with fewer than two blocks or an empty block.
    pub fn from_slices<I, S>(slices: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let densities = densities(slices)?;
        let std_dev = sample_std_dev(&densities)?;
        let mean = mean(&densities)?;
        Ok(Self {
            densities,
            mean,
            std_dev,
        })
    }
}

/// Result of one (chip run, block count) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationResult {
    /// Geometry the blocks were cut with
    pub layout: BlockLayout,
    /// Block densities, row-major over the block grid
    pub densities: Vec<f64>,
    /// Mean block density ("avgtotal")
    pub mean: f64,
    /// Sample standard deviation of the block densities
    pub std_dev: f64,
}

impl ConfigurationResult {
    pub fn blocks(&self) -> usize {
        self.layout.blocks
    }

    pub fn block_area(&self) -> usize {
        self.layout.block_area()
    }
}

/// Partition `bits` into `blocks` square blocks and compute their statistics
///
/// The layout is computed for the actual length of `bits`; the row width and
/// centering divisor come from `geometry`.
///
/// # Errors
/// `Partition` when the block count does not fit the array,
/// `DegenerateSample` for a single block.
pub fn analyze(bits: &BitArray, blocks: usize, geometry: &Geometry) -> Result<ConfigurationResult> {
    let layout = BlockLayout::compute(bits.len(), geometry, blocks)?;
    let stats = BlockStatistics::from_slices(layout.blocks(bits).map(|block| block.bits))?;

    tracing::trace!(
        blocks,
        chunk_size = layout.chunk_size,
        excess = layout.excess,
        mean = stats.mean,
        "analyzed configuration"
    );

    Ok(ConfigurationResult {
        layout,
        densities: stats.densities,
        mean: stats.mean,
        std_dev: stats.std_dev,
    })
}
