pub mod csv_table;
pub mod source;
pub mod values;

pub use csv_table::{CsvTable, read_csv_table};
pub use source::SourceTable;
pub use values::{format_numeric, is_free_text, parse_code, parse_date, parse_f64};
