//! CLI argument parsing for pufstat

use crate::config::ErrorPolicy;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for report files
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// CSV tables (default)
    Csv,
    /// Pretty-printed JSON documents
    Json,
}

/// Which statistics to export
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportShape {
    /// Every block density, one file per run
    PerBlock,
    /// Block densities with their configuration aggregate, one file per run and block count
    PerChip,
    /// Normal fit of block densities per block count, one file per run
    Configuration,
    /// Normal fit of per-run means across each chip's runs
    Ensemble,
}

impl ReportShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportShape::PerBlock => "per-block",
            ReportShape::PerChip => "per-chip",
            ReportShape::Configuration => "configuration",
            ReportShape::Ensemble => "ensemble",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pufstat")]
#[command(version)]
#[command(about = "Bit-density statistics over SRAM power-up captures", long_about = None)]
pub struct Cli {
    /// Enable TRACE-level diagnostic output on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a directory of captures `<stem>_<i>.csv`
    Sweep(SweepArgs),
    /// Analyze one capture file
    File(FileArgs),
    /// Print the block layout for one block count
    Layout(LayoutArgs),
}

#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Directory holding the capture set
    #[arg(value_name = "INPUT_DIR")]
    pub input_dir: PathBuf,

    /// File name stem of the captures (default: the directory name)
    #[arg(long, value_name = "STEM")]
    pub stem: Option<String>,

    /// Number of chips in the capture set (1 or 2)
    #[arg(long, value_name = "N")]
    pub chips: Option<usize>,

    /// Captures per chip
    #[arg(long, value_name = "N")]
    pub runs: Option<usize>,

    /// Report shape
    #[arg(long, value_enum, default_value = "ensemble")]
    pub shape: ReportShape,

    /// Report format
    #[arg(long, value_enum, default_value = "csv")]
    pub format: OutputFormat,

    /// Root directory for `<stem>Stats/`
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Worker threads (default: available parallelism)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// What to do when one block count fails for one run
    #[arg(long = "on-error", value_enum, value_name = "POLICY")]
    pub on_error: Option<ErrorPolicy>,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Smallest block side k (N = k²)
    #[arg(long = "min-k", value_name = "K")]
    pub min_k: Option<usize>,

    /// Largest block side k (N = k²)
    #[arg(long = "max-k", value_name = "K")]
    pub max_k: Option<usize>,

    /// Do not invert the band
    #[arg(long = "no-invert")]
    pub no_invert: bool,
}

#[derive(Args, Debug)]
pub struct FileArgs {
    /// Capture file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Prefix for report file names (default: the file stem)
    #[arg(long, value_name = "LABEL")]
    pub label: Option<String>,

    /// Report shape
    #[arg(long, value_enum, default_value = "per-chip")]
    pub shape: ReportShape,

    /// Report format
    #[arg(long, value_enum, default_value = "csv")]
    pub format: OutputFormat,

    /// Root directory for `<label>Stats/`
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Invert the band (default: `band.enabled` from --config, off without one)
    #[arg(long, conflicts_with = "no_invert")]
    pub invert: bool,

    /// Do not invert the band, whatever --config says
    #[arg(long = "no-invert")]
    pub no_invert: bool,
}

#[derive(Args, Debug)]
pub struct LayoutArgs {
    /// Block count N (a perfect square)
    #[arg(long, value_name = "N")]
    pub blocks: usize,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
