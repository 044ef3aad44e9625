use omop_model::CdmTable;

/// `CREATE TABLE IF NOT EXISTS` for one CDM table. The surrogate key is the
/// primary key; ids are always supplied by the caller.
pub fn create_table_sql(table: CdmTable) -> String {
    let primary_key = table.primary_key();
    let columns = table
        .columns()
        .iter()
        .map(|column| {
            let mut definition = format!("    {} {}", column.name, column.kind.sql_type());
            if column.name == primary_key {
                definition.push_str(" PRIMARY KEY");
            }
            definition
        })
        .collect::<Vec<_>>()
        .join(",\n");
    format!("CREATE TABLE IF NOT EXISTS {} (\n{columns}\n);", table.name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_key_is_declared_once() {
        let sql = create_table_sql(CdmTable::Measurement);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS measurement ("));
        assert!(sql.contains("measurement_id BIGINT PRIMARY KEY"));
        assert_eq!(sql.matches("PRIMARY KEY").count(), 1);
        assert!(sql.contains("measurement_date DATE"));
    }
}
