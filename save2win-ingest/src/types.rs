use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TRANSACTION_HISTORY: &str = "transaction_history";

/// Which upstream produced the context data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "bank-of-anthos")]
    BankOfAnthos,
    #[serde(rename = "bank-of-anthos-enriched")]
    BankOfAnthosEnriched,
}

/// Context bundle returned by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEnvelope {
    pub ok: bool,
    pub context: TransactionContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionContext {
    pub provider: Provider,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "accountId")]
    pub account_id: String,
    /// Raw upstream records, passed through untyped
    #[serde(default)]
    pub data: Vec<Value>,
}

impl ContextEnvelope {
    pub fn new(provider: Provider, account_id: impl Into<String>, data: Vec<Value>) -> Self {
        Self {
            ok: true,
            context: TransactionContext {
                provider,
                kind: TRANSACTION_HISTORY.to_string(),
                account_id: account_id.into(),
                data,
            },
        }
    }
}
