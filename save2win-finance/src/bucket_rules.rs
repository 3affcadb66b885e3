//! Deterministic spend buckets from transaction labels.
//!
//! Credits always land in "Income"; debits go to the first keyword bucket
//! whose list matches the lower-cased label, else "Other".

use save2win_core::{NormalizedTransaction, TxType};

pub const INCOME_BUCKET: &str = "Income";
pub const OTHER_BUCKET: &str = "Other";

/// Keyword buckets in match priority order. Keywords are lower-case.
pub const BUCKET_RULES: &[(&str, &[&str])] = &[
    (
        "Coffee",
        &["coffee", "cafe", "starbucks", "peet", "blue bottle", "costa", "nero"],
    ),
    (
        "Groceries",
        &[
            "grocery", "groceries", "supermarket", "whole foods", "trader joe", "safeway",
            "kroger", "aldi", "lidl", "costco",
        ],
    ),
    (
        "Transport",
        &[
            "uber", "lyft", "taxi", "transit", "metro", "train", "bus", "parking", "gas station",
            "fuel", "shell", "chevron",
        ],
    ),
    (
        "Bills",
        &[
            "rent", "electric", "utility", "utilities", "internet", "phone", "insurance",
            "water", "comcast", "verizon", "at&t", "bill",
        ],
    ),
    (
        "Entertainment",
        &[
            "netflix", "spotify", "hulu", "disney", "cinema", "movie", "theater", "theatre",
            "concert", "steam", "ticket",
        ],
    ),
];

/// Bucket name for a normalized transaction.
pub fn bucket_for(tx: &NormalizedTransaction) -> &'static str {
    bucket_for_parts(tx.tx_type, &tx.label)
}

pub fn bucket_for_parts(tx_type: TxType, label: &str) -> &'static str {
    if tx_type == TxType::Credit {
        return INCOME_BUCKET;
    }

    let label = label.to_lowercase();
    BUCKET_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| label.contains(k)))
        .map(|(name, _)| *name)
        .unwrap_or(OTHER_BUCKET)
}
