//! pufstat - bit-density statistics over SRAM power-up captures
//!
//! This library decodes hex memory dumps into bit arrays, corrects the
//! inverted address band, partitions the array into square blocks for a
//! sweep of block counts, and reports per-block densities, their spread and
//! normal fits across repeated captures of one or two chips.

pub mod bitstream;
pub mod block_stats;
pub mod cli;
pub mod config;
pub mod csv_output;
pub mod distribution;
pub mod dump;
pub mod error;
pub mod inversion;
pub mod json_output;
pub mod orchestrator;
pub mod partition;
pub mod report;
pub mod sweep;

pub use error::{AnalysisError, Result};
