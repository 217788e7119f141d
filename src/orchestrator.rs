//! Run orchestration over a capture set
//!
//! A capture set is a directory of dumps named `<stem>_<i>.csv`, numbered
//! from 1. With two chips the first `runs_per_chip` files belong to chip 0
//! and the next `runs_per_chip` to chip 1.
//!
//! Each run is decoded, band-corrected and swept over every block count.
//! Runs are independent, so they are spread over a scoped worker pool fed
//! from a lock-free job queue. Reports always come back ordered by file
//! index, whatever order the workers finish in.
//!
//! ```text
//!  load_runs ──► ArrayQueue<job> ──► worker 1 ─┐
//!                                 ├► worker 2 ─┼─► channel ──► sort by index
//!                                 └► worker N ─┘
//! ```

use crate::bitstream::{decode, BitArray, DumpRecord};
use crate::block_stats::ConfigurationResult;
use crate::config::{AnalysisConfig, ErrorPolicy};
use crate::distribution::NormalFit;
use crate::dump::{read_dump, run_file_path};
use crate::error::{AnalysisError, Result};
use crate::sweep::{sweep_run, BlockCountSweep};
use crossbeam::queue::ArrayQueue;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Identity of one chip run within a capture set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId {
    /// 1-based number used in the run's file name
    pub file_index: usize,
    /// 0-based chip
    pub chip: usize,
    /// 1-based capture number within the chip
    pub run: usize,
}

impl RunId {
    /// Identity of file number `file_index` (1-based)
    ///
    /// # Example
    /// ```
    /// use pufstat::orchestrator::RunId;
    ///
    /// let id = RunId::from_file_index(101, 100);
    /// assert_eq!((id.chip, id.run), (1, 1));
    /// ```
    pub fn from_file_index(file_index: usize, runs_per_chip: usize) -> Self {
        debug_assert!(file_index >= 1 && runs_per_chip >= 1);
        Self {
            file_index,
            chip: (file_index - 1) / runs_per_chip,
            run: (file_index - 1) % runs_per_chip + 1,
        }
    }
}

/// One decoded, band-corrected capture
#[derive(Debug, Clone)]
pub struct ChipRun {
    pub id: RunId,
    pub bits: BitArray,
}

/// Results of the whole sweep for one chip run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipRunReport {
    pub id: RunId,
    /// One result per block count, in sweep order
    pub results: Vec<ConfigurationResult>,
}

impl ChipRunReport {
    pub fn result_for(&self, blocks: usize) -> Option<&ConfigurationResult> {
        self.results.iter().find(|r| r.blocks() == blocks)
    }
}

/// Normal fit of one block count's mean density across a chip's runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleRow {
    pub chip: usize,
    pub blocks: usize,
    /// Bits per block (`chunk_size²`)
    pub block_area: usize,
    pub fit: NormalFit,
}

/// Drives decoding, band correction and the block-count sweep over runs
#[derive(Debug, Clone)]
pub struct RunOrchestrator {
    config: AnalysisConfig,
}

impl RunOrchestrator {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Decode records into a band-corrected bit array of the configured length
    ///
    /// # Errors
    /// `Format` when the records do not decode to exactly `bit_len` bits.
    pub fn prepare(&self, records: &[DumpRecord]) -> Result<BitArray> {
        let expected = self.config.geometry.bit_len;
        if records.len() * 8 != expected {
            return Err(AnalysisError::format(
                records.len() + 1,
                format!(
                    "dump holds {} bytes ({} bits), expected {} bits",
                    records.len(),
                    records.len() * 8,
                    expected
                ),
            ));
        }
        let bits = decode(records);
        Ok(self.config.band.apply(&bits))
    }

    /// Load and prepare run `file_index` of capture set `stem`
    pub fn load_run(&self, dir: &Path, stem: &str, file_index: usize) -> Result<ChipRun> {
        let path = run_file_path(dir, stem, file_index);
        let records = read_dump(&path)?;
        let bits = self.prepare(&records).map_err(|e| match e {
            AnalysisError::Format { line, reason } => AnalysisError::Format {
                line,
                reason: format!("{}: {}", path.display(), reason),
            },
            other => other,
        })?;
        Ok(ChipRun {
            id: RunId::from_file_index(file_index, self.config.ensemble.runs_per_chip),
            bits,
        })
    }

    /// Load every run of capture set `stem` from `dir`
    ///
    /// # Errors
    /// `Resource` when the directory or any run file is missing.
    pub fn load_runs(&self, dir: &Path, stem: &str) -> Result<Vec<ChipRun>> {
        if !dir.is_dir() {
            return Err(AnalysisError::resource(
                dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "directory does not exist"),
            ));
        }

        let total = self.config.ensemble.total_runs();
        let runs = (1..=total)
            .map(|index| self.load_run(dir, stem, index))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            dir = %dir.display(),
            stem,
            runs = runs.len(),
            chips = self.config.ensemble.chips,
            "loaded capture set"
        );
        Ok(runs)
    }

    /// Sweep every block count over one run, applying the error policy
    pub fn analyze_run(&self, run: &ChipRun) -> Result<ChipRunReport> {
        let mut results = Vec::with_capacity(self.config.sweep.len());
        for outcome in sweep_run(&run.bits, &self.config.sweep, &self.config.geometry) {
            match (outcome.result, self.config.on_error) {
                (Ok(result), _) => results.push(result),
                (Err(e), ErrorPolicy::Abort) => return Err(e),
                (Err(e), ErrorPolicy::Skip) => {
                    tracing::warn!(
                        file_index = run.id.file_index,
                        blocks = outcome.blocks,
                        error = %e,
                        "skipping configuration"
                    );
                }
            }
        }
        Ok(ChipRunReport {
            id: run.id,
            results,
        })
    }

    /// Analyze runs on the worker pool; reports are ordered by file index
    ///
    /// With the `Abort` policy the error of the lowest-numbered failing run is
    /// returned and idle workers stop picking up new runs.
    pub fn analyze_runs(&self, runs: &[ChipRun]) -> Result<Vec<ChipRunReport>> {
        if runs.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self.config.worker_count().min(runs.len());
        let jobs = ArrayQueue::new(runs.len());
        for index in 0..runs.len() {
            // capacity equals the number of runs
            let _ = jobs.push(index);
        }

        let failed = AtomicBool::new(false);
        let (tx, rx) = crossbeam::channel::unbounded();

        let scope_result = crossbeam::thread::scope(|s| {
            for _ in 0..workers {
                let tx = tx.clone();
                let jobs = &jobs;
                let failed = &failed;
                s.spawn(move |_| {
                    while !failed.load(Ordering::Relaxed) {
                        let Some(index) = jobs.pop() else {
                            break;
                        };
                        let report = self.analyze_run(&runs[index]);
                        if report.is_err() {
                            failed.store(true, Ordering::Relaxed);
                        }
                        if tx.send((index, report)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(tx);

        if let Err(panic) = scope_result {
            std::panic::resume_unwind(panic);
        }

        let mut collected: Vec<(usize, Result<ChipRunReport>)> = rx.iter().collect();
        collected.sort_by_key(|(index, _)| *index);

        let reports = collected
            .into_iter()
            .map(|(_, report)| report)
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(runs = reports.len(), workers, "analyzed runs");
        Ok(reports)
    }

    /// Load and analyze a whole capture set
    pub fn run_directory(&self, dir: &Path, stem: &str) -> Result<Vec<ChipRunReport>> {
        let runs = self.load_runs(dir, stem)?;
        self.analyze_runs(&runs)
    }
}

/// Fit each chip's per-run mean densities, per block count
///
/// Rows are ordered by chip, then by block count in sweep order. A block
/// count with no surviving result for a chip (all skipped) has no row.
pub fn ensemble(reports: &[ChipRunReport], sweep: &BlockCountSweep) -> Result<Vec<EnsembleRow>> {
    let mut chips: Vec<usize> = reports.iter().map(|r| r.id.chip).collect();
    chips.sort_unstable();
    chips.dedup();

    let mut rows = Vec::new();
    for chip in chips {
        for blocks in sweep.block_counts() {
            let results: Vec<&ConfigurationResult> = reports
                .iter()
                .filter(|r| r.id.chip == chip)
                .filter_map(|r| r.result_for(blocks))
                .collect();
            let Some(first) = results.first() else {
                continue;
            };
            let means: Vec<f64> = results.iter().map(|r| r.mean).collect();
            rows.push(EnsembleRow {
                chip,
                blocks,
                block_area: first.block_area(),
                fit: NormalFit::fit(&means)?,
            });
        }
    }
    Ok(rows)
}
