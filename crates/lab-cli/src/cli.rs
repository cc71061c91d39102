//! CLI argument definitions for the lab report host.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use lab_model::AgeUnit;

#[derive(Parser)]
#[command(
    name = "lab-report",
    version,
    about = "Resolve pathology report parameters for a patient",
    long_about = "Resolve pathology report parameters for a patient.\n\n\
                  Expands catalog tests, selects age/gender reference ranges,\n\
                  evaluates formula parameters and classifies each result."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow result values to appear in logs.
    ///
    /// Values are patient data and are redacted unless this is set.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Assemble a report for one patient and print its rows.
    Report(ReportArgs),

    /// List the tests in a catalog.
    Tests(CatalogArgs),
}

#[derive(Parser)]
pub struct CatalogArgs {
    /// Catalog JSON: an array of tests or `{ "tests": [...], "units": [...] }`.
    #[arg(long = "catalog", value_name = "FILE")]
    pub catalog: PathBuf,
}

#[derive(Parser)]
pub struct ReportArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Test name as written on the receipt (repeatable).
    #[arg(long = "test", value_name = "NAME", required = true)]
    pub tests: Vec<String>,

    /// Patient age.
    #[arg(long = "age", value_name = "VALUE")]
    pub age: f64,

    /// Unit of `--age`.
    #[arg(long = "age-unit", value_enum, default_value = "years")]
    pub age_unit: AgeUnitArg,

    /// Patient gender (male, female or any).
    #[arg(long = "gender", default_value = "any")]
    pub gender: String,

    /// Results JSON: `{ "<test>": { "<parameter>": "<value>" } }`.
    ///
    /// Inside a panel, `{ "<included test>": { ... } }` blocks address
    /// parameters whose names repeat across included tests.
    #[arg(long = "results", value_name = "FILE")]
    pub results: Option<PathBuf>,

    /// Engine options JSON (defaults apply to missing fields).
    #[arg(long = "options", value_name = "FILE")]
    pub options: Option<PathBuf>,

    /// How to print the assembled report.
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormatArg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AgeUnitArg {
    Days,
    Months,
    Years,
}

impl From<AgeUnitArg> for AgeUnit {
    fn from(value: AgeUnitArg) -> Self {
        match value {
            AgeUnitArg::Days => AgeUnit::Days,
            AgeUnitArg::Months => AgeUnit::Months,
            AgeUnitArg::Years => AgeUnit::Years,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    /// Bordered table per test.
    Table,
    /// Plain indented outline with group headings.
    Outline,
    /// Resolved rows as JSON.
    Json,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
