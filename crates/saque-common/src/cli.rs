//! Shared CLI arguments and terminal styling.
//!
//! Every saque binary flattens [`CommonArgs`] into its clap definition so
//! `--quiet` and `--format` behave identically across tools.

use clap::Args;

/// Arguments shared by all saque CLI tools.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format: table, json
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

impl CommonArgs {
    /// Resolve the parsed arguments into a [`Cli`] value.
    pub fn to_cli(&self) -> Cli {
        Cli { quiet: self.quiet, format: self.format }
    }
}

/// Resolved CLI behavior passed into command handlers.
#[derive(Debug, Clone, Copy)]
pub struct Cli {
    pub quiet: bool,
    pub format: OutputFormat,
}

impl Cli {
    /// Whether non-essential output should be suppressed.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable terminal output
    Table,
    /// Machine-readable JSON
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Use: table, json")),
        }
    }
}

/// ANSI styling helpers for terminal output.
pub mod styles {
    const BOLD: &str = "\x1b[1m";
    const RED: &str = "\x1b[31m";
    const GREEN: &str = "\x1b[32m";
    const YELLOW: &str = "\x1b[33m";
    const CYAN: &str = "\x1b[36m";
    const RESET: &str = "\x1b[0m";

    /// Section header.
    pub fn header(text: &str) -> String {
        format!("{BOLD}{CYAN}{text}{RESET}")
    }

    /// Successful operation.
    pub fn success(text: &str) -> String {
        format!("{GREEN}✓ {text}{RESET}")
    }

    /// Failed operation.
    pub fn error(text: &str) -> String {
        format!("{RED}✗ {text}{RESET}")
    }

    /// Non-fatal problem.
    pub fn warn(text: &str) -> String {
        format!("{YELLOW}! {text}{RESET}")
    }

    /// Neutral progress information.
    pub fn info(text: &str) -> String {
        format!("{CYAN}{text}{RESET}")
    }
}
