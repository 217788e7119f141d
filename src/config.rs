//! Analysis configuration
//!
//! Every constant of the analysis is a named, overridable value. Defaults
//! describe the 8 KiB SRAM chips the tool was built for: 65536 bits laid out
//! in 256-bit rows, an inverted band from bit 16384 to 49150, and a sweep of
//! 2² to 20² blocks over 100 runs per chip.
//!
//! Configuration files are TOML; any omitted table or key keeps its default:
//!
//! ```toml
//! [geometry]
//! bit_len = 65536
//! row_width = 256
//! centering_divisor = 511
//!
//! [band]
//! low = 16384
//! high = 49150
//! enabled = true
//!
//! [sweep]
//! min_k = 2
//! max_k = 20
//!
//! [ensemble]
//! chips = 2
//! runs_per_chip = 100
//! ```

use crate::error::{AnalysisError, Result};
use crate::inversion::InversionBand;
use crate::partition::Geometry;
use crate::sweep::BlockCountSweep;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Number of chips and captures per chip in one capture set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// 1 or 2 chips
    pub chips: usize,
    pub runs_per_chip: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            chips: 1,
            runs_per_chip: 100,
        }
    }
}

impl EnsembleConfig {
    /// Total number of run files
    pub fn total_runs(&self) -> usize {
        self.chips * self.runs_per_chip
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=2).contains(&self.chips) {
            return Err(AnalysisError::InvalidConfig(format!(
                "chips must be 1 or 2, got {}",
                self.chips
            )));
        }
        if self.runs_per_chip == 0 {
            return Err(AnalysisError::InvalidConfig(
                "runs_per_chip must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// What to do when one (run, block count) pair fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop at the first failure
    #[default]
    Abort,
    /// Log the failure and leave the pair out of the report
    Skip,
}

/// Complete configuration for one analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub on_error: ErrorPolicy,
    /// Worker threads; `None` uses the available parallelism
    pub jobs: Option<usize>,
    pub geometry: Geometry,
    pub band: InversionBand,
    pub sweep: BlockCountSweep,
    pub ensemble: EnsembleConfig,
}

impl AnalysisConfig {
    /// Load a configuration from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, is not valid TOML, or fails
    /// validation.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read configuration file: {}", path.as_ref().display())
        })?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.as_ref().display()))?;
        Ok(config)
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self =
            toml::from_str(content).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration matching the single-capture tool: no band inversion
    pub fn single_capture() -> Self {
        Self {
            band: InversionBand::disabled(),
            ensemble: EnsembleConfig {
                chips: 1,
                runs_per_chip: 1,
            },
            ..Self::default()
        }
    }

    /// Number of worker threads to use
    pub fn worker_count(&self) -> usize {
        self.jobs
            .filter(|&jobs| jobs > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1)
    }

    pub fn validate(&self) -> Result<()> {
        self.geometry.validate()?;
        self.band.validate()?;
        self.sweep.validate()?;
        self.ensemble.validate()?;
        if self.geometry.bit_len % 8 != 0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "bit_len {} is not a whole number of bytes",
                self.geometry.bit_len
            )));
        }
        if self.jobs == Some(0) {
            return Err(AnalysisError::InvalidConfig(
                "jobs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
