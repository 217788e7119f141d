//! Report strategies
//!
//! The same sweep results can be exported in four shapes. Each shape is a
//! `ReportStrategy` that turns chip-run reports into named tables; the tables
//! are then rendered as CSV or JSON and written to the output directory.
//!
//! | shape           | one table per | columns                                            |
//! |-----------------|---------------|----------------------------------------------------|
//! | `per-block`     | run           | NumBlocks, Average                                 |
//! | `per-chip`      | run × N       | Block, PercentageOfOnes, TotalAverage, OverallStdDev |
//! | `configuration` | run           | BlockSize, Average, StandardDeviation              |
//! | `ensemble`      | chip          | BlockSize, Average, StandardDeviation              |

use crate::cli::{OutputFormat, ReportShape};
use crate::csv_output::{format_real, CsvTable};
use crate::distribution::NormalFit;
use crate::error::{AnalysisError, Result};
use crate::json_output::{JsonTable, JsonValue};
use crate::orchestrator::{ensemble, ChipRunReport, RunId};
use crate::sweep::BlockCountSweep;
use std::fs;
use std::path::{Path, PathBuf};

/// How output files are named
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Naming {
    /// Directory of runs `<stem>_<i>.csv`
    CaptureSet { stem: String },
    /// One capture, files prefixed with `label`
    Single { label: String },
}

impl Naming {
    fn run_prefix(&self, id: &RunId) -> String {
        match self {
            Naming::CaptureSet { stem } => format!("{}_{}", stem, id.file_index),
            Naming::Single { label } => label.clone(),
        }
    }

    fn chip_prefix(&self, chip: usize) -> String {
        match self {
            Naming::CaptureSet { stem } => format!("{}_chip{}", stem, chip + 1),
            Naming::Single { label } => label.clone(),
        }
    }
}

/// Everything a strategy needs besides the reports themselves
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub naming: Naming,
    pub sweep: BlockCountSweep,
}

/// A table cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Int(usize),
    Real(f64),
}

/// A named table produced by a strategy
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    /// File name without extension
    pub name: String,
    pub shape: ReportShape,
    pub columns: &'static [&'static str],
    pub rows: Vec<Vec<Cell>>,
}

impl ReportTable {
    fn new(name: String, shape: ReportShape, columns: &'static [&'static str]) -> Self {
        Self {
            name,
            shape,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn to_csv(&self) -> String {
        let mut table = CsvTable::new(self.columns.iter().copied());
        for row in &self.rows {
            table.add_row(
                row.iter()
                    .map(|cell| match *cell {
                        Cell::Int(i) => i.to_string(),
                        Cell::Real(r) => format_real(r),
                    })
                    .collect(),
            );
        }
        table.to_csv()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut table = JsonTable::new(self.shape.as_str(), self.columns);
        for row in &self.rows {
            let values: Vec<JsonValue> = row
                .iter()
                .map(|cell| match *cell {
                    Cell::Int(i) => JsonValue::Integer(i as u64),
                    Cell::Real(r) => JsonValue::Real(r),
                })
                .collect();
            table.add_row(&values);
        }
        table.to_json()
    }

    /// Rendered file contents and extension
    pub fn render(&self, format: OutputFormat) -> Result<(String, &'static str)> {
        match format {
            OutputFormat::Csv => Ok((self.to_csv(), "csv")),
            OutputFormat::Json => Ok((self.to_json()?, "json")),
        }
    }
}

/// Turns chip-run reports into output tables
pub trait ReportStrategy: Send + Sync {
    fn shape(&self) -> ReportShape;

    fn tables(&self, ctx: &ReportContext, reports: &[ChipRunReport]) -> Result<Vec<ReportTable>>;
}

/// Every block density of every configuration, one file per run
#[derive(Debug, Default)]
pub struct PerBlockExport;

impl ReportStrategy for PerBlockExport {
    fn shape(&self) -> ReportShape {
        ReportShape::PerBlock
    }

    fn tables(&self, ctx: &ReportContext, reports: &[ChipRunReport]) -> Result<Vec<ReportTable>> {
        Ok(reports
            .iter()
            .map(|report| {
                let mut table = ReportTable::new(
                    format!("{}AvgList", ctx.naming.run_prefix(&report.id)),
                    self.shape(),
                    &["NumBlocks", "Average"],
                );
                for result in &report.results {
                    for &density in &result.densities {
                        table
                            .rows
                            .push(vec![Cell::Int(result.blocks()), Cell::Real(density)]);
                    }
                }
                table
            })
            .collect())
    }
}

/// Block densities with the configuration aggregate repeated per row,
/// one file per run and block count
#[derive(Debug, Default)]
pub struct PerChipExport;

impl ReportStrategy for PerChipExport {
    fn shape(&self) -> ReportShape {
        ReportShape::PerChip
    }

    fn tables(&self, ctx: &ReportContext, reports: &[ChipRunReport]) -> Result<Vec<ReportTable>> {
        let mut tables = Vec::new();
        for report in reports {
            for result in &report.results {
                let mut table = ReportTable::new(
                    format!(
                        "{}Stats{}Blocks",
                        ctx.naming.run_prefix(&report.id),
                        result.blocks()
                    ),
                    self.shape(),
                    &["Block", "PercentageOfOnes", "TotalAverage", "OverallStdDev"],
                );
                for (index, &density) in result.densities.iter().enumerate() {
                    table.rows.push(vec![
                        Cell::Int(index),
                        Cell::Real(density),
                        Cell::Real(result.mean),
                        Cell::Real(result.std_dev),
                    ]);
                }
                tables.push(table);
            }
        }
        Ok(tables)
    }
}

/// Normal fit of each configuration's block densities, one file per run
#[derive(Debug, Default)]
pub struct ConfigurationExport;

impl ReportStrategy for ConfigurationExport {
    fn shape(&self) -> ReportShape {
        ReportShape::Configuration
    }

    fn tables(&self, ctx: &ReportContext, reports: &[ChipRunReport]) -> Result<Vec<ReportTable>> {
        reports
            .iter()
            .map(|report| {
                let mut table = ReportTable::new(
                    format!("{}Stats", ctx.naming.run_prefix(&report.id)),
                    self.shape(),
                    &["BlockSize", "Average", "StandardDeviation"],
                );
                for result in &report.results {
                    let fit = NormalFit::fit(&result.densities)?;
                    table.rows.push(vec![
                        Cell::Int(result.block_area()),
                        Cell::Real(fit.mu),
                        Cell::Real(fit.sigma),
                    ]);
                }
                Ok(table)
            })
            .collect()
    }
}

/// Normal fit of per-run mean densities across each chip's runs
#[derive(Debug, Default)]
pub struct EnsembleExport;

impl ReportStrategy for EnsembleExport {
    fn shape(&self) -> ReportShape {
        ReportShape::Ensemble
    }

    fn tables(&self, ctx: &ReportContext, reports: &[ChipRunReport]) -> Result<Vec<ReportTable>> {
        let rows = ensemble(reports, &ctx.sweep)?;
        let mut tables: Vec<ReportTable> = Vec::new();
        for row in rows {
            let name = format!("{}Ensemble", ctx.naming.chip_prefix(row.chip));
            if tables.last().map(|t| t.name != name).unwrap_or(true) {
                tables.push(ReportTable::new(
                    name,
                    self.shape(),
                    &["BlockSize", "Average", "StandardDeviation"],
                ));
            }
            if let Some(table) = tables.last_mut() {
                table.rows.push(vec![
                    Cell::Int(row.block_area),
                    Cell::Real(row.fit.mu),
                    Cell::Real(row.fit.sigma),
                ]);
            }
        }
        Ok(tables)
    }
}

/// Strategy implementing `shape`
pub fn strategy_for(shape: ReportShape) -> Box<dyn ReportStrategy> {
    match shape {
        ReportShape::PerBlock => Box::new(PerBlockExport),
        ReportShape::PerChip => Box::new(PerChipExport),
        ReportShape::Configuration => Box::new(ConfigurationExport),
        ReportShape::Ensemble => Box::new(EnsembleExport),
    }
}

/// Render `tables` into `dir`, creating it if needed
///
/// Returns the written paths in table order.
pub fn write_tables(dir: &Path, tables: &[ReportTable], format: OutputFormat) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| AnalysisError::resource(dir, e))?;

    let mut written = Vec::with_capacity(tables.len());
    for table in tables {
        let (content, extension) = table.render(format)?;
        let path = dir.join(format!("{}.{}", table.name, extension));
        fs::write(&path, content).map_err(|e| AnalysisError::resource(&path, e))?;
        tracing::debug!(path = %path.display(), rows = table.rows.len(), "wrote report");
        written.push(path);
    }

    tracing::info!(dir = %dir.display(), files = written.len(), "reports written");
    Ok(written)
}
