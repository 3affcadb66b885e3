//! Transaction record types: the raw upstream shape and the canonical one.
//!
//! Upstream producers disagree on field names, so raw lookups go through
//! ordered candidate-key tables instead of fixed struct fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Candidate keys for the transaction timestamp, in priority order.
pub const DATE_KEYS: &[&str] = &["date", "time", "timestamp"];
/// Candidate keys for the amount.
pub const AMOUNT_KEYS: &[&str] = &["amount"];
/// Candidate keys for the credit/debit hint.
pub const TYPE_KEYS: &[&str] = &["type", "category"];
/// Candidate keys for the display label.
pub const LABEL_KEYS: &[&str] = &["label", "description", "merchant"];
/// Candidate keys for the account identifier.
pub const ACCOUNT_KEYS: &[&str] = &["account", "toAccountId", "fromAccountId"];

/// An unvalidated transaction record as received from upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTransaction(pub Map<String, Value>);

impl RawTransaction {
    /// Wrap a JSON value; only objects are accepted.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().map(|m| Self(m.clone()))
    }

    /// First candidate key whose value is present (not null, not "").
    pub fn lookup(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|k| self.0.get(*k))
            .find(|v| is_present(v))
    }

    /// Like [`lookup`](Self::lookup) but renders strings and numbers as text.
    pub fn lookup_text(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.0.get(*k))
            .find_map(value_as_text)
    }
}

fn is_present(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn value_as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Resolved direction of money movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TxType {
    Credit,
    Debit,
}

/// Canonical transaction with resolved sign and type.
///
/// `Credit` implies `amount >= 0`, `Debit` implies `amount <= 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTransaction {
    /// `None` until the summarizer assigns a placeholder for unparseable dates
    pub date: Option<DateTime<Utc>>,
    pub tx_type: TxType,
    pub account: Option<String>,
    pub label: String,
    pub amount: f64,
    pub raw: RawTransaction,
}

impl NormalizedTransaction {
    pub fn is_credit(&self) -> bool {
        self.tx_type == TxType::Credit
    }

    pub fn is_debit(&self) -> bool {
        self.tx_type == TxType::Debit
    }
}
