//! JSON payload decoding for the transaction history service and the
//! context gateway.
//!
//! The history service has answered with a bare list and with
//! `{"transactions": [...]}` across versions; both are accepted.

use serde_json::Value;

/// Extract raw records from a transaction history payload.
pub fn transactions_from_payload(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("transactions") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Extract `context.data` from a gateway envelope, or nothing.
pub fn transactions_from_envelope(envelope: Value) -> Vec<Value> {
    match envelope.pointer("/context/data") {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// Accept any of the shapes a local file may hold: a gateway envelope,
/// a wrapped payload or a bare list.
pub fn transactions_from_any(value: Value) -> Vec<Value> {
    if value.get("context").is_some() {
        transactions_from_envelope(value)
    } else {
        transactions_from_payload(value)
    }
}
