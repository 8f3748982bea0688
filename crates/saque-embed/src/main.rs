//! saque-embed CLI entry point.

use clap::{Parser, Subcommand};
use saque_common::cli::{styles, CommonArgs};
use saque_embed::{generate_header, run, BatchResult, EmbedConfig, EmbedOutcome, EmbedSpec};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "saque-embed")]
#[command(about = "Embed quantized artifacts into C headers for firmware")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate headers for every configured artifact
    Run {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Override output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a header for a single artifact
    File {
        /// Path to the artifact
        artifact: PathBuf,

        /// Byte array identifier (default: <stem>_data)
        #[arg(long)]
        array_name: Option<String>,

        /// Length constant identifier (default: <stem>_data_len)
        #[arg(long)]
        len_name: Option<String>,

        /// Output directory (default: next to the artifact)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    let config = cli.common.to_cli();

    let result = match cli.command {
        Commands::Run {
            config: config_path,
            output,
        } => run_command(&config_path, output, &config),

        Commands::File {
            artifact,
            array_name,
            len_name,
            output,
        } => file_command(&artifact, array_name, len_name, output, &config),
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
    cli: &saque_common::Cli,
) -> saque_common::Result<()> {
    if !cli.is_quiet() {
        println!("{}", styles::header("saque-embed"));
    }

    let mut config = EmbedConfig::from_file(config_path)?;
    if let Some(out) = output {
        config.output_dir = Some(out);
    }

    let result = run(&config)?;

    if cli.format == saque_common::OutputFormat::Json {
        print_json_summary(&result);
    } else {
        print_summary(&result, cli);
    }

    // Skipped artifacts are reported in the summary, not the exit code.
    Ok(())
}

fn print_summary(result: &BatchResult, cli: &saque_common::Cli) {
    for report in &result.reports {
        match &report.outcome {
            EmbedOutcome::Written(generated) => {
                println!(
                    "{}",
                    styles::success(&format!(
                        "{} → {} ({} bytes)",
                        report.file,
                        generated.header_path.display(),
                        generated.byte_len
                    ))
                );
            }
            EmbedOutcome::Skipped { reason } => {
                println!("{}", styles::error(&format!("{}: skipped", report.file)));
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
            println!(
                "\n{}",
                styles::success("Done! Headers exported for the firmware build")
            );
        } else {
            println!(
                "\n{}",
                styles::warn(&format!(
                    "{} of {} artifacts skipped",
                    result.skipped_count(),
                    result.reports.len()
                ))
            );
        }
    }
}

fn print_json_summary(result: &BatchResult) {
    let models: Vec<serde_json::Value> = result
        .reports
        .iter()
        .map(|report| match &report.outcome {
            EmbedOutcome::Written(generated) => serde_json::json!({
                "file": report.file,
                "status": "written",
                "header": generated.header_path.display().to_string(),
                "bytes": generated.byte_len,
            }),
            EmbedOutcome::Skipped { reason } => serde_json::json!({
                "file": report.file,
                "status": "skipped",
                "reason": reason,
            }),
        })
        .collect();

    println!(
        "{}",
        serde_json::json!({
            "artifacts": models,
            "all_passed": result.all_passed(),
        })
    );
}

fn file_command(
    artifact: &PathBuf,
    array_name: Option<String>,
    len_name: Option<String>,
    output: Option<PathBuf>,
    cli: &saque_common::Cli,
) -> saque_common::Result<()> {
    let file_name = artifact
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let defaults = EmbedSpec::for_file(file_name);

    let array_name = array_name.unwrap_or(defaults.array_name);
    let len_name = len_name.unwrap_or(defaults.len_name);
    let output_dir = output
        .or_else(|| artifact.parent().map(PathBuf::from))
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from("."));

    let generated = generate_header(artifact, &output_dir, &array_name, &len_name)?;

    if !cli.is_quiet() {
        println!(
            "{}",
            styles::success(&format!(
                "{} → {} ({} bytes)",
                artifact.display(),
                generated.header_path.display(),
                generated.byte_len
            ))
        );
    }

    Ok(())
}
