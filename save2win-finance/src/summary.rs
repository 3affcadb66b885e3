//! Summarizer: normalizes raw upstream transactions and derives the
//! summary contract (recent list, buckets, highlights, rolling windows).

use chrono::{DateTime, Duration, Utc};
use save2win_core::{NormalizedTransaction, RawTransaction, TxType, normalize, round2, to_iso_z};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::bucket_rules::bucket_for;

/// A normalized transaction as emitted to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionView {
    /// ISO-8601 UTC with a literal `Z`
    pub date: String,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub account: Option<String>,
    pub label: String,
    pub amount: f64,
}

impl TransactionView {
    fn from_normalized(tx: &NormalizedTransaction, date: DateTime<Utc>) -> Self {
        Self {
            date: to_iso_z(date),
            tx_type: tx.tx_type,
            account: tx.account.clone(),
            label: tx.label.clone(),
            amount: round2(tx.amount),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketTotals {
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Highlights {
    pub largest_debit: Option<TransactionView>,
    pub last_income: Option<TransactionView>,
}

/// Aggregates over a trailing window. `spend` is never positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub spend: f64,
    pub income: f64,
    pub net: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    /// Every transaction, most recent first
    pub recent: Vec<TransactionView>,
    pub buckets: BTreeMap<String, BucketTotals>,
    pub highlights: Highlights,
    pub last_7d: WindowStats,
    pub last_30d: WindowStats,
    pub avg_daily_spend_30d: f64,
}

/// A normalized transaction with its date resolved (parsed or placeholder).
struct Dated {
    tx: NormalizedTransaction,
    date: DateTime<Utc>,
}

/// Summarize raw upstream items anchored at `now`.
///
/// Non-object items are skipped. Undated records get `now - i minutes`,
/// where `i` is their position among the object items.
pub fn summarize(items: &[Value], now: DateTime<Utc>) -> Summary {
    let raws: Vec<RawTransaction> = items.iter().filter_map(RawTransaction::from_value).collect();
    summarize_records(&raws, now)
}

pub fn summarize_records(raws: &[RawTransaction], now: DateTime<Utc>) -> Summary {
    let mut txns: Vec<Dated> = raws
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let tx = normalize(raw);
            let date = tx.date.unwrap_or_else(|| now - Duration::minutes(i as i64));
            Dated { tx, date }
        })
        .collect();

    // stable: equal timestamps keep input order
    txns.sort_by(|a, b| b.date.cmp(&a.date));

    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for d in &txns {
        let entry = sums.entry(bucket_for(&d.tx).to_string()).or_insert((0.0, 0));
        entry.0 += d.tx.amount;
        entry.1 += 1;
    }
    let buckets = sums
        .into_iter()
        .map(|(name, (total, count))| {
            (
                name,
                BucketTotals {
                    total: round2(total),
                    count,
                },
            )
        })
        .collect();

    let last_7d = window_stats(&txns, now, 7);
    let last_30d = window_stats(&txns, now, 30);
    let avg_daily_spend_30d = if last_30d.spend == 0.0 {
        0.0
    } else {
        round2(last_30d.spend.abs() / 30.0)
    };

    Summary {
        count: txns.len(),
        recent: txns
            .iter()
            .map(|d| TransactionView::from_normalized(&d.tx, d.date))
            .collect(),
        buckets,
        highlights: highlights(&txns),
        last_7d,
        last_30d,
        avg_daily_spend_30d,
    }
}

fn highlights(txns: &[Dated]) -> Highlights {
    let mut largest: Option<&Dated> = None;
    for d in txns.iter().filter(|d| d.tx.is_debit()) {
        if largest.is_none_or(|cur| d.tx.amount < cur.tx.amount) {
            largest = Some(d);
        }
    }

    let last_income = txns.iter().find(|d| d.tx.is_credit());

    Highlights {
        largest_debit: largest.map(|d| TransactionView::from_normalized(&d.tx, d.date)),
        last_income: last_income.map(|d| TransactionView::from_normalized(&d.tx, d.date)),
    }
}

fn window_stats(txns: &[Dated], now: DateTime<Utc>, days: i64) -> WindowStats {
    let since = now - Duration::days(days);
    let (spend, income) = txns
        .iter()
        .filter(|d| d.date >= since)
        .fold((0.0, 0.0), |(spend, income), d| {
            let a = d.tx.amount;
            if a < 0.0 {
                (spend + a, income)
            } else if a > 0.0 {
                (spend, income + a)
            } else {
                (spend, income)
            }
        });

    WindowStats {
        spend: round2(spend),
        income: round2(income),
        net: round2(income + spend),
    }
}
