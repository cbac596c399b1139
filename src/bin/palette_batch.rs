//! Batch CLI for character_palettes with JSON configuration
//!
//! Extracts palettes for every image under the configured input directory
//! (or reads a palette table CSV or workbook) and prints one similarity matrix per
//! archetype.

use anyhow::{bail, Context};
use character_palettes::{BatchReport, Pipeline, PipelineConfig, SimilarityMatrix};
use std::{env, path::Path, process};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 || args[1] == "-h" || args[1] == "--help" {
        print_help(&args[0]);
        process::exit(1);
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "character_palettes=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    match run(Path::new(&args[1])) {
        Ok(report) if report.processed() > 0 => {}
        Ok(_) => {
            eprintln!("No characters were processed");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn run(config_path: &Path) -> anyhow::Result<BatchReport> {
    if !config_path.exists() {
        bail!("Config file '{}' does not exist", config_path.display());
    }

    let config = PipelineConfig::from_json_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    eprintln!("Loaded configuration from {}", config_path.display());
    eprintln!("Input path: {}", config.input_path.display());
    match &config.output_path {
        Some(path) => eprintln!("Palette table: {}", path.display()),
        None => eprintln!("Palette table: not written"),
    }
    eprintln!();

    let report = Pipeline::new(config)?.run()?;

    for entry in &report.matrices {
        print_matrix(&entry.matrix);
    }

    eprintln!();
    eprintln!("Batch processing complete:");
    eprintln!("  Characters: {}", report.processed());
    eprintln!("  Skipped: {}", report.skipped());
    for failure in report.failures.iter().chain(report.omitted()) {
        eprintln!("    {}: {}", failure.input, failure.error);
    }

    Ok(report)
}

fn print_matrix(matrix: &SimilarityMatrix) {
    println!("{} ({} characters)", matrix.archetype(), matrix.size());
    println!("  {}", matrix.labels().join(", "));
    for (i, label) in matrix.labels().iter().enumerate() {
        let scores: Vec<String> = matrix.row(i).iter().map(|s| format!("{:.4}", s)).collect();
        println!("  {}: {}", label, scores.join(" "));
    }
}

fn print_help(program_name: &str) {
    eprintln!("Usage: {} <config.json>", program_name);
    eprintln!();
    eprintln!("Extract character palettes and score similarity within each archetype.");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  config.json    JSON file containing pipeline configuration");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  RUST_LOG       Log filter (default: character_palettes=info)");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} palettes.json", program_name);
    eprintln!("  RUST_LOG=character_palettes=debug {} palettes.json", program_name);
}
