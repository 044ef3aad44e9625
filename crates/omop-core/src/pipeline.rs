//! End-to-end run over one source table.

use anyhow::{Context, Result};
use omop_ingest::SourceTable;
use omop_model::RunSummary;
use omop_store::CdmStore;
use tracing::{info, info_span};

use crate::context::PopulateContext;
use crate::identity::resolve_identities;
use crate::populators::{Populator, default_populators};

/// Resolves identities, then runs every populator in order.
///
/// Each batch is committed on its own; a failure part-way leaves earlier
/// tables written.
pub fn run_pipeline(
    source_name: &str,
    source: &SourceTable,
    store: &mut dyn CdmStore,
    ctx: &PopulateContext<'_>,
) -> Result<RunSummary> {
    let populators = default_populators()?;
    run_with(source_name, source, store, ctx, &populators)
}

pub fn run_with(
    source_name: &str,
    source: &SourceTable,
    store: &mut dyn CdmStore,
    ctx: &PopulateContext<'_>,
    populators: &[Box<dyn Populator>],
) -> Result<RunSummary> {
    let span = info_span!("run", source = source_name);
    let _guard = span.enter();
    info!(rows = source.height(), columns = source.headers().len(), "starting run");

    let identities = {
        let _stage = info_span!("identity").entered();
        resolve_identities(source, store, ctx).context("resolve persons")?
    };
    let mut summary = RunSummary {
        source: source_name.to_string(),
        source_rows: source.height(),
        persons: identities.persons.len(),
        tables: identities.reports,
    };

    for populator in populators {
        let _stage = info_span!("populate", stage = populator.name()).entered();
        let reports = populator
            .populate(&identities.source, store, ctx)
            .with_context(|| format!("populate {}", populator.name()))?;
        summary.tables.extend(reports);
    }

    info!(
        written = summary.total_written(),
        dropped = summary.total_dropped(),
        "run finished"
    );
    Ok(summary)
}
