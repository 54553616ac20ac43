//! scaleplot - thread-scaling charts from benchmark results.
//!
//! Reads a results CSV (N, P, timings, speedup, efficiency) and writes one
//! time / speedup / efficiency plot per configured metric.

use anyhow::{Context, Result};
use clap::Parser;
use scaleplot::config::{ImageFormat, PlotConfig};
use scaleplot::logging;
use scaleplot::plot::{self, PlotOutcome};
use std::path::PathBuf;

/// Render scaling plots from a benchmark results CSV
#[derive(Parser, Debug)]
#[command(name = "scaleplot")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Results CSV with N, P and metric columns
    #[arg(default_value = "results.csv")]
    input: PathBuf,

    /// Output directory for generated plots
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// JSON plot configuration (defaults cover overall and work metrics)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Image format, overrides the configuration
    #[arg(long, value_enum)]
    format: Option<ImageFormat>,

    /// Resolution in dots per inch, overrides the configuration
    #[arg(long)]
    dpi: Option<u32>,

    /// TrueType font for PNG output
    #[arg(long)]
    font: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// More diagnostics (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long)]
    quiet: bool,
}

fn load_config(args: &Args) -> Result<PlotConfig> {
    let mut config = match &args.config {
        Some(path) => PlotConfig::load(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None => PlotConfig::default(),
    };

    if let Some(format) = args.format {
        config.format = format;
        // Default file names follow the format; explicit ones must be retargeted too.
        for metric in &mut config.metrics {
            if let Some(name) = metric.filename.take() {
                let stem = std::path::Path::new(&name)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(metric.key.as_str())
                    .to_string();
                metric.filename = Some(format!("{}.{}", stem, format.extension()));
            }
        }
    }
    if let Some(dpi) = args.dpi {
        config.style.dpi = dpi;
    }
    if let Some(ref font) = args.font {
        config.font_path = Some(font.clone());
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(logging::level_for(args.verbose, args.quiet));

    let config = load_config(&args)?;

    if args.print_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }

    if !args.quiet {
        eprintln!("Loading measurements from: {}", args.input.display());
        eprintln!("Generating plots in: {}", args.output_dir.display());
    }

    let outcomes = plot::generate_all_plots(&args.input, &config, &args.output_dir)
        .with_context(|| format!("Failed to generate plots from {}", args.input.display()))?;

    if !args.quiet {
        let written: Vec<&PathBuf> = outcomes
            .iter()
            .filter_map(|o| match o {
                PlotOutcome::Written { path, .. } => Some(path),
                PlotOutcome::Skipped { .. } => None,
            })
            .collect();

        eprintln!("\nGenerated {} plots:", written.len());
        for path in written {
            eprintln!("  • {}", path.display());
        }
        for outcome in &outcomes {
            if let PlotOutcome::Skipped { key, column } = outcome {
                eprintln!("  - skipped {} (no '{}' column)", key, column);
            }
        }
    }

    Ok(())
}
