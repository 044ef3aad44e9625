//! One CLI run: read the CSV, open the store, map, report.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use omop_core::{PopulateContext, PopulateOptions, run_pipeline};
use omop_ingest::{SourceTable, read_csv_table};
use omop_model::RunSummary;
use omop_store::DuckDbStore;
use omop_vocab::ConceptRegistry;
use tracing::{info, info_span};

/// Checkbox groups collapsed into one coded column before mapping.
const CHECKBOX_COLUMNS: &[&str] = &["ethnic"];

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub database: PathBuf,
    /// Concept table replacing the embedded one.
    pub vocab: Option<PathBuf>,
    pub log_data: bool,
}

pub fn load_registry(vocab: Option<&Path>) -> Result<ConceptRegistry> {
    let registry = match vocab {
        Some(path) => ConceptRegistry::load_path(path)?,
        None => ConceptRegistry::load_default()?,
    };
    Ok(registry)
}

pub fn read_source(path: &Path) -> Result<SourceTable> {
    let mut table = read_csv_table(path)?;
    for base in CHECKBOX_COLUMNS {
        table.merge_checkbox_columns(base);
    }
    table
        .into_source_table()
        .with_context(|| format!("build source table: {}", path.display()))
}

pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

pub fn run_file(options: &RunOptions) -> Result<RunSummary> {
    let started = Instant::now();
    let registry = load_registry(options.vocab.as_deref()).context("load concept registry")?;
    let ctx = PopulateContext::new(&registry).with_options(PopulateOptions {
        log_data: options.log_data,
    });

    let source = {
        let _span = info_span!("ingest", path = %options.input.display()).entered();
        read_source(&options.input)?
    };
    let mut store = DuckDbStore::open(&options.database)
        .with_context(|| format!("open database: {}", options.database.display()))?;
    let summary = run_pipeline(&source_name(&options.input), &source, &mut store, &ctx)?;
    info!(
        elapsed_ms = started.elapsed().as_millis(),
        persons = summary.persons,
        "mapping complete"
    );
    Ok(summary)
}

pub fn write_summary_json(summary: &RunSummary, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("serialize run summary")?;
    fs::write(path, json).with_context(|| format!("write summary: {}", path.display()))
}
