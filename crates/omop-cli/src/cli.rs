//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "isaric-omop",
    version,
    about = "Map ISARIC case report form exports onto OMOP CDM tables",
    long_about = "Map ISARIC case report form exports onto OMOP CDM tables.\n\n\
                  Reads one wide CSV export, resolves persons, locations and care sites,\n\
                  and appends condition, observation, measurement, procedure, drug and\n\
                  ICU visit rows to a DuckDB database."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
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
}

#[derive(Subcommand)]
pub enum Command {
    /// Map one CSV export into the CDM database.
    Run(RunArgs),

    /// Validate the concept table and list its domains.
    Vocab(VocabArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// ISARIC CSV export to map.
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// DuckDB database holding the CDM tables (created if missing).
    #[arg(long = "database", value_name = "PATH", env = "OMOP_DATABASE")]
    pub database: PathBuf,

    /// Concept table to use instead of the embedded one.
    #[arg(long = "vocab", value_name = "TOML", env = "OMOP_VOCAB")]
    pub vocab: Option<PathBuf>,

    /// Also write the run summary as JSON.
    #[arg(long = "summary-json", value_name = "PATH")]
    pub summary_json: Option<PathBuf>,

    /// Allow subject identifiers and source values in log output.
    ///
    /// Off by default: source values are replaced by a redaction marker.
    #[arg(long = "log-data")]
    pub log_data: bool,
}

#[derive(Parser)]
pub struct VocabArgs {
    /// Concept table to validate instead of the embedded one.
    #[arg(long = "vocab", value_name = "TOML", env = "OMOP_VOCAB")]
    pub vocab: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
