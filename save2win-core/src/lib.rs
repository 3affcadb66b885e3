//! save2win-core: raw transaction field lookup, amount/time parsing and normalization

pub mod amount;
pub mod normalize;
pub mod time;
pub mod transaction;

pub use amount::{parse_amount, round2};
pub use normalize::{normalize, resolve_type};
pub use time::{parse_time, parse_time_str, to_iso_z};
pub use transaction::{NormalizedTransaction, RawTransaction, TxType};
