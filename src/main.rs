use anyhow::{Context, Result};
use clap::Parser;
use pufstat::cli::{Cli, Command, FileArgs, LayoutArgs, SweepArgs};
use pufstat::config::AnalysisConfig;
use pufstat::dump::{read_dump, split_captures};
use pufstat::orchestrator::{ChipRun, RunId, RunOrchestrator};
use pufstat::report::{strategy_for, write_tables, Naming, ReportContext};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` forces TRACE
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, fallback: AnalysisConfig) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::from_toml(path),
        None => Ok(fallback),
    }
}

/// Last path component as a UTF-8 name
fn name_of(path: &Path, stem_only: bool) -> Option<String> {
    let name = if stem_only {
        path.file_stem()
    } else {
        path.file_name()
    };
    name.and_then(|n| n.to_str()).map(str::to_string)
}

fn run_sweep(args: SweepArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref(), AnalysisConfig::default())?;
    if let Some(chips) = args.chips {
        config.ensemble.chips = chips;
    }
    if let Some(runs) = args.runs {
        config.ensemble.runs_per_chip = runs;
    }
    if let Some(jobs) = args.jobs {
        config.jobs = Some(jobs);
    }
    if let Some(policy) = args.on_error {
        config.on_error = policy;
    }
    if let Some(min_k) = args.min_k {
        config.sweep.min_k = min_k;
    }
    if let Some(max_k) = args.max_k {
        config.sweep.max_k = max_k;
    }
    if args.no_invert {
        config.band.enabled = false;
    }

    let stem = match args.stem {
        Some(stem) => stem,
        None => {
            let canonical = args
                .input_dir
                .canonicalize()
                .with_context(|| format!("Cannot open input directory {}", args.input_dir.display()))?;
            name_of(&canonical, false).with_context(|| {
                format!("Cannot derive a capture stem from {}", args.input_dir.display())
            })?
        }
    };

    let sweep = config.sweep;
    let orchestrator = RunOrchestrator::new(config).context("Invalid analysis configuration")?;
    let reports = orchestrator
        .run_directory(&args.input_dir, &stem)
        .with_context(|| format!("Failed to analyze capture set {}", stem))?;

    let ctx = ReportContext {
        naming: Naming::CaptureSet { stem: stem.clone() },
        sweep,
    };
    let tables = strategy_for(args.shape).tables(&ctx, &reports)?;
    let dir = args.output.join(format!("{}Stats", stem));
    let written = write_tables(&dir, &tables, args.format)?;

    println!("Wrote {} report files to {}", written.len(), dir.display());
    Ok(())
}

fn run_file(args: FileArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref(), AnalysisConfig::single_capture())?;
    if args.invert {
        config.band.enabled = true;
    } else if args.no_invert {
        config.band.enabled = false;
    }
    config.ensemble.chips = 1;
    config.ensemble.runs_per_chip = 1;

    let label = match args.label {
        Some(label) => label,
        None => name_of(&args.file, true)
            .with_context(|| format!("Cannot derive a label from {}", args.file.display()))?,
    };

    let records = read_dump(&args.file)?;
    let capture_len = config.geometry.bit_len / 8;
    let captures = if records.len() == capture_len {
        vec![records]
    } else {
        split_captures(records, capture_len)
            .with_context(|| format!("{} is not a whole number of captures", args.file.display()))?
    };

    let sweep = config.sweep;
    let orchestrator = RunOrchestrator::new(config).context("Invalid analysis configuration")?;
    let runs = captures
        .iter()
        .enumerate()
        .map(|(chip, capture)| {
            Ok(ChipRun {
                id: RunId {
                    file_index: chip + 1,
                    chip,
                    run: 1,
                },
                bits: orchestrator.prepare(capture)?,
            })
        })
        .collect::<pufstat::Result<Vec<_>>>()
        .with_context(|| format!("Failed to decode {}", args.file.display()))?;
    let reports = orchestrator.analyze_runs(&runs)?;

    let strategy = strategy_for(args.shape);
    let mut tables = Vec::new();
    for report in &reports {
        // dual-chip dumps get one label per chip
        let capture_label = if reports.len() > 1 {
            format!("{}_chip{}", label, report.id.chip + 1)
        } else {
            label.clone()
        };
        let ctx = ReportContext {
            naming: Naming::Single {
                label: capture_label,
            },
            sweep,
        };
        tables.extend(strategy.tables(&ctx, std::slice::from_ref(report))?);
    }

    let dir: PathBuf = args.output.join(format!("{}Stats", label));
    let written = write_tables(&dir, &tables, args.format)?;

    println!("Wrote {} report files to {}", written.len(), dir.display());
    Ok(())
}

fn run_layout(args: LayoutArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), AnalysisConfig::default())?;
    let layout = config
        .geometry
        .layout(args.blocks)
        .with_context(|| format!("No layout for {} blocks", args.blocks))?;

    println!("blocks:      {} ({}x{})", layout.blocks, layout.k, layout.k);
    println!("bit_len:     {}", layout.len);
    println!("row_width:   {}", layout.row_width);
    println!("chunk_size:  {}", layout.chunk_size);
    println!("block_area:  {}", layout.block_area());
    println!("excess:      {}", layout.excess);
    println!("row_size:    {}", layout.row_size);
    println!("x_offset:    {}", layout.x_offset);
    println!("y_offset:    {}", layout.y_offset);
    println!("first_start: {}", layout.block_start(0, 0));
    println!("end_index:   {}", layout.end_index());
    println!("wraps_rows:  {}", layout.wraps_rows());
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    match args.command {
        Command::Sweep(sweep) => run_sweep(sweep),
        Command::File(file) => run_file(file),
        Command::Layout(layout) => run_layout(layout),
    }
}
