//! Raw → canonical transaction normalization.
//!
//! Never fails: bad fields degrade to defaults (zero amount, `Debit`,
//! empty label, unknown date).

use crate::amount::parse_amount;
use crate::time::parse_time;
use crate::transaction::{
    ACCOUNT_KEYS, AMOUNT_KEYS, DATE_KEYS, LABEL_KEYS, NormalizedTransaction, RawTransaction,
    TYPE_KEYS, TxType,
};

/// Normalize a single raw record.
pub fn normalize(raw: &RawTransaction) -> NormalizedTransaction {
    let label = raw.lookup_text(LABEL_KEYS).unwrap_or_default();
    let account = raw.lookup_text(ACCOUNT_KEYS);
    let amount = parse_amount(raw.lookup(AMOUNT_KEYS), 0.0);
    let type_hint = raw.lookup_text(TYPE_KEYS);

    let tx_type = resolve_type(type_hint.as_deref(), amount);
    let amount = enforce_sign(tx_type, amount);

    NormalizedTransaction {
        date: parse_time(raw.lookup(DATE_KEYS)),
        tx_type,
        account,
        label,
        amount,
        raw: raw.clone(),
    }
}

/// A positive amount always reads as a credit; otherwise the hint decides.
pub fn resolve_type(type_hint: Option<&str>, amount: f64) -> TxType {
    let hinted_credit = type_hint
        .map(|h| {
            let h = h.to_lowercase();
            h.contains("credit") || h.contains("income")
        })
        .unwrap_or(false);

    if hinted_credit || amount > 0.0 {
        TxType::Credit
    } else {
        TxType::Debit
    }
}

fn enforce_sign(tx_type: TxType, amount: f64) -> f64 {
    match tx_type {
        TxType::Credit if amount < 0.0 => -amount,
        TxType::Debit if amount > 0.0 => -amount,
        _ => amount,
    }
}
