//! `isaric-omop`: ISARIC CSV exports into OMOP CDM tables.

use std::io::{self, IsTerminal};

use anyhow::Result;
use clap::{ColorChoice, Parser};
use omop_cli::logging::{LogConfig, LogFormat, init_logging};
use omop_cli::pipeline::{RunOptions, load_registry, run_file, write_summary_json};
use omop_cli::summary::{print_summary, vocab_table};
use tracing::info;
use tracing::level_filters::LevelFilter;

mod cli;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg, RunArgs, VocabArgs};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let result = match &cli.command {
        Command::Run(args) => run(args),
        Command::Vocab(args) => vocab(args),
    };
    if let Err(error) = result {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(args: &RunArgs) -> Result<()> {
    let summary = run_file(&RunOptions {
        input: args.input.clone(),
        database: args.database.clone(),
        vocab: args.vocab.clone(),
        log_data: args.log_data,
    })?;
    print_summary(&summary);
    if let Some(path) = &args.summary_json {
        write_summary_json(&summary, path)?;
        info!(path = %path.display(), "summary written");
    }
    Ok(())
}

fn vocab(args: &VocabArgs) -> Result<()> {
    let registry = load_registry(args.vocab.as_deref())?;
    println!("{}", vocab_table(&registry.domains()));
    Ok(())
}

fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
