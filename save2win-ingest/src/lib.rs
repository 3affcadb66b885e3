//! save2win-ingest: upstream payload decoding, CSV records and stub-data enrichment.

pub mod enrich;
pub mod parsers;
pub mod types;

pub use enrich::enrich_transactions;
pub use parsers::context_payload::{
    transactions_from_any, transactions_from_envelope, transactions_from_payload,
};
pub use parsers::csv_rows::{parse_csv_file, parse_csv_records};
pub use types::{ContextEnvelope, Provider, TransactionContext};
