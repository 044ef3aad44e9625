//! `DuckDB` implementation of [`CdmStore`].

use std::path::Path;

use duckdb::types::Value;
use duckdb::{Connection, params_from_iter};
use omop_model::{CdmTable, ColumnKind};
use polars::prelude::{AnyValue, Column, DataFrame, NamedFrom, Series};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::predicate::Predicate;
use crate::schema;
use crate::CdmStore;

/// CDM tables in a single `DuckDB` database file.
pub struct DuckDbStore {
    conn: Connection,
}

impl DuckDbStore {
    /// Opens or creates a database file and creates any missing CDM tables.
    pub fn open(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "opening CDM database");
        let store = Self {
            conn: Connection::open(path)?,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        for table in CdmTable::WRITE_ORDER
            .into_iter()
            .chain(std::iter::once(CdmTable::Concept))
        {
            self.conn.execute_batch(&schema::create_table_sql(table))?;
        }
        Ok(())
    }

    pub fn row_count(&self, table: CdmTable) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table.name()), [], |row| {
                    row.get(0)
                })?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

fn checked_column(table: CdmTable, column: &str) -> Result<ColumnKind> {
    table
        .column(column)
        .map(|def| def.kind)
        .ok_or_else(|| StoreError::UnknownColumn {
            table,
            column: column.to_string(),
        })
}

impl CdmStore for DuckDbStore {
    fn max_value(&self, table: CdmTable, column: &str) -> Result<Option<i64>> {
        if checked_column(table, column)? != ColumnKind::Int {
            return Err(StoreError::NotInteger {
                table,
                column: column.to_string(),
            });
        }
        let sql = format!("SELECT MAX({column}) FROM {}", table.name());
        let max: Option<i64> = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(max)
    }

    fn select(
        &self,
        table: CdmTable,
        columns: &[&str],
        predicate: &Predicate,
    ) -> Result<DataFrame> {
        let columns: Vec<&str> = if columns.is_empty() {
            table.column_names()
        } else {
            columns.to_vec()
        };
        for column in &columns {
            checked_column(table, column)?;
        }
        let projection = columns
            .iter()
            .map(|column| format!("CAST({column} AS VARCHAR)"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT {projection} FROM {}", table.name());
        let mut params = Vec::new();
        if !predicate.is_empty() {
            let mut conditions = Vec::new();
            for (column, value) in predicate.clauses() {
                checked_column(table, column)?;
                conditions.push(format!("CAST({column} AS VARCHAR) = ?"));
                params.push(value.clone());
            }
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let width = columns.len();
        let rows = stmt
            .query_map(params_from_iter(params), |row| {
                (0..width)
                    .map(|idx| row.get::<_, Option<String>>(idx))
                    .collect::<std::result::Result<Vec<_>, _>>()
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut values: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(rows.len()); width];
        for row in rows {
            for (idx, value) in row.into_iter().enumerate() {
                values[idx].push(value);
            }
        }
        let frame_columns: Vec<Column> = columns
            .iter()
            .zip(values)
            .map(|(name, values)| Series::new((*name).into(), values).into())
            .collect();
        Ok(DataFrame::new(frame_columns)?)
    }

    fn append(&mut self, table: CdmTable, frame: &DataFrame) -> Result<usize> {
        if frame.height() == 0 {
            return Ok(0);
        }
        let names: Vec<String> = frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();
        let mut placeholders = Vec::with_capacity(names.len());
        for name in &names {
            let kind = checked_column(table, name)?;
            placeholders.push(format!("CAST(? AS {})", kind.sql_type()));
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name(),
            names.join(", "),
            placeholders.join(", ")
        );

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            let columns = frame.get_columns();
            for idx in 0..frame.height() {
                let mut row = Vec::with_capacity(columns.len());
                for (column, name) in columns.iter().zip(&names) {
                    row.push(to_sql_value(table, name, column.get(idx)?)?);
                }
                stmt.execute(params_from_iter(row))?;
            }
        }
        tx.commit()?;
        debug!(table = %table, rows = frame.height(), "appended batch");
        Ok(frame.height())
    }
}

fn to_sql_value(table: CdmTable, column: &str, value: AnyValue<'_>) -> Result<Value> {
    let value = match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(v) => Value::Boolean(v),
        AnyValue::Int32(v) => Value::BigInt(i64::from(v)),
        AnyValue::Int64(v) => Value::BigInt(v),
        AnyValue::UInt32(v) => Value::BigInt(i64::from(v)),
        AnyValue::Float32(v) => Value::Double(f64::from(v)),
        AnyValue::Float64(v) => Value::Double(v),
        AnyValue::String(v) => Value::Text(v.to_string()),
        AnyValue::StringOwned(v) => Value::Text(v.to_string()),
        other => {
            return Err(StoreError::UnsupportedValue {
                table,
                column: column.to_string(),
                value: other.to_string(),
            });
        }
    };
    Ok(value)
}
