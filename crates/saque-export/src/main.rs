//! saque-export CLI entry point.

use clap::{Parser, Subcommand};
use saque_common::cli::{styles, CommonArgs};
use saque_export::{run, BatchResult, ConfigValidator, ExportConfig, ModelOutcome};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "saque-export")]
#[command(about = "Convert trained swing classifiers to quantized artifacts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the export pipeline
    Run {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Override output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Dry run (validate and print the plan, don't convert)
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    let config = cli.common.to_cli();

    let result = match cli.command {
        Commands::Run {
            config: config_path,
            output,
            dry_run,
        } => run_command(&config_path, output, dry_run, &config),

        Commands::Validate {
            config: config_path,
        } => validate_command(&config_path, &config),
    };

    if let Err(e) = result {
        if !config.is_quiet() {
            eprintln!("{}", styles::error(&e.to_string()));
        }
        std::process::exit(1);
    }
}

fn run_command(
    config_path: &PathBuf,
    output: Option<PathBuf>,
    dry_run: bool,
    cli: &saque_common::Cli,
) -> saque_common::Result<()> {
    if !cli.is_quiet() {
        println!("{}", styles::header("saque-export"));
    }

    // Load configuration
    let mut config = ExportConfig::from_file(config_path)?;

    // Override output if specified
    if let Some(out) = output {
        config.output_dir = Some(out);
    }

    // Validate
    ConfigValidator::validate(&config)?;

    if dry_run {
        if !cli.is_quiet() {
            println!("{}", styles::success("Configuration valid"));
            println!("\nPlanned conversions:");
            for spec in &config.models {
                println!(
                    "  {} → {} ({} classes)",
                    config.model_path(&spec.name).display(),
                    config.artifact_path(&spec.name).display(),
                    spec.num_outputs
                );
            }
            println!(
                "  Calibration: {} samples, seed {}",
                config.calibration.samples, config.calibration.seed
            );
        }
        return Ok(());
    }

    // Run pipeline
    let result = run(&config)?;

    if cli.format == saque_common::OutputFormat::Json {
        print_json_summary(&result);
    } else {
        print_summary(&result, cli);
    }

    // Partial failures are reported in the summary, not the exit code.
    Ok(())
}

fn print_summary(result: &BatchResult, cli: &saque_common::Cli) {
    if !cli.is_quiet() {
        println!("\n{}", styles::header("CONVERSION SUMMARY"));
    }

    for report in &result.reports {
        match &report.outcome {
            ModelOutcome::Converted(outcome) => {
                println!(
                    "{}",
                    styles::success(&format!(
                        "{}: SUCCESS ({} bytes)",
                        report.name, outcome.artifact_bytes
                    ))
                );
                if !cli.is_quiet() {
                    println!("  Artifact: {}", outcome.artifact_path.display());
                    println!("  Test output: {:?}", outcome.smoke_output);
                    println!("  Output sum: {:.4}", outcome.smoke_sum);
                }
            }
            ModelOutcome::Failed { reason } => {
                println!("{}", styles::error(&format!("{}: FAILED", report.name)));
                if !cli.is_quiet() {
                    for line in reason.lines() {
                        println!("  {line}");
                    }
                }
            }
        }
    }

    if !cli.is_quiet() {
        if result.all_passed() {
            println!("\n{}", styles::success("All models converted"));
            println!("\nNext steps:");
            println!("  1. Run: saque-embed run --config <config>");
            println!("  2. Copy the generated headers into the firmware src/ folder");
        } else {
            println!(
                "\n{}",
                styles::warn(&format!(
                    "{} of {} models failed",
                    result.failed_count(),
                    result.reports.len()
                ))
            );
        }
        println!("Duration: {:.1}s", result.duration_seconds);
    }
}

fn print_json_summary(result: &BatchResult) {
    let models: Vec<serde_json::Value> = result
        .reports
        .iter()
        .map(|report| match &report.outcome {
            ModelOutcome::Converted(outcome) => serde_json::json!({
                "name": report.name,
                "status": "success",
                "artifact": outcome.artifact_path.display().to_string(),
                "bytes": outcome.artifact_bytes,
                "output": outcome.smoke_output,
                "output_sum": outcome.smoke_sum,
            }),
            ModelOutcome::Failed { reason } => serde_json::json!({
                "name": report.name,
                "status": "failed",
                "reason": reason,
            }),
        })
        .collect();

    println!(
        "{}",
        serde_json::json!({
            "models": models,
            "all_passed": result.all_passed(),
            "duration_seconds": result.duration_seconds,
        })
    );
}

fn validate_command(config_path: &PathBuf, cli: &saque_common::Cli) -> saque_common::Result<()> {
    let config = ExportConfig::from_file(config_path)?;
    ConfigValidator::validate(&config)?;

    if !cli.is_quiet() {
        println!("{}", styles::success("Configuration valid"));
    }

    Ok(())
}
