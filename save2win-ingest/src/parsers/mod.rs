pub mod context_payload;
pub mod csv_rows;
