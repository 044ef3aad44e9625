use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use omop_model::{CdmTable, RunSummary, TableReport};
use omop_vocab::DomainSummary;

pub fn print_summary(summary: &RunSummary) {
    println!("Source: {} ({} rows)", summary.source, summary.source_rows);
    println!("Persons: {}", summary.persons);
    println!("{}", summary_table(summary));
    let unmapped: Vec<&TableReport> = summary
        .tables
        .iter()
        .filter(|report| !report.unmapped_variables.is_empty())
        .collect();
    if !unmapped.is_empty() {
        println!();
        println!("Unmapped variables:");
        for report in unmapped {
            println!("- {}: {}", report.stage, report.unmapped_variables.join(", "));
        }
    }
}

pub fn summary_table(summary: &RunSummary) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Stage"),
        header_cell("Table"),
        header_cell("Candidates"),
        header_cell("Written"),
        header_cell("No value"),
        header_cell("No date"),
        header_cell("No concept"),
        header_cell("Truncated"),
        header_cell("Warnings"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 2..=8 {
        align_column(&mut table, index, CellAlignment::Right);
    }

    let mut warnings = 0;
    for report in &summary.tables {
        warnings += report.warning_count();
        table.add_row(vec![
            Cell::new(&report.stage)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(report.table.map_or("-", CdmTable::name)),
            Cell::new(report.candidates),
            Cell::new(report.written),
            count_cell(report.dropped_unavailable, Color::DarkYellow),
            count_cell(report.dropped_no_date, Color::Yellow),
            count_cell(report.dropped_no_concept, Color::Yellow),
            count_cell(report.truncated, Color::Yellow),
            count_cell(report.warning_count(), Color::Yellow),
        ]);
    }
    let total = |field: fn(&TableReport) -> usize| summary.tables.iter().map(field).sum::<usize>();
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(total(|r| r.candidates)).add_attribute(Attribute::Bold),
        Cell::new(summary.total_written()).add_attribute(Attribute::Bold),
        count_cell(total(|r| r.dropped_unavailable), Color::DarkYellow),
        count_cell(total(|r| r.dropped_no_date), Color::Yellow),
        count_cell(total(|r| r.dropped_no_concept), Color::Yellow),
        count_cell(total(|r| r.truncated), Color::Yellow),
        count_cell(warnings, Color::Yellow).add_attribute(Attribute::Bold),
    ]);
    table
}

pub fn vocab_table(domains: &[DomainSummary]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Domain"), header_cell("Entries")]);
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    align_column(&mut table, 1, CellAlignment::Right);
    for domain in domains {
        table.add_row(vec![Cell::new(domain.name), Cell::new(domain.entries)]);
    }
    table
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_row_adds_up_every_stage() {
        let mut condition = TableReport::new("condition", CdmTable::ConditionOccurrence);
        condition.written = 3;
        condition.dropped_no_date = 2;
        let mut drug = TableReport::new("drug", CdmTable::DrugExposure);
        drug.written = 4;
        drug.truncated = 1;
        let summary = RunSummary {
            source: "site.csv".to_string(),
            source_rows: 5,
            persons: 2,
            tables: vec![condition, drug],
        };

        let mut table = summary_table(&summary);
        table.force_no_tty();
        let rendered = table.to_string();
        assert!(rendered.contains("condition_occurrence"));
        let total = rendered
            .lines()
            .find(|line| line.contains("TOTAL"))
            .unwrap_or_default();
        assert!(total.contains('7'));
        assert_eq!(table.row_iter().count(), 3);
    }
}
