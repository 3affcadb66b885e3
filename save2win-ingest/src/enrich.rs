//! Optional enrichment of stub transaction data.
//!
//! Demo bank data carries bare amounts with no merchant information. This
//! pass rewrites deposits as paychecks and maps withdrawals onto merchant
//! profiles by amount range so downstream bucketing has labels to work with.

use rand::Rng;
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MerchantProfile {
    pub merchant: &'static str,
    pub category: &'static str,
    pub min_amt: f64,
    pub max_amt: f64,
}

const fn profile(
    merchant: &'static str,
    category: &'static str,
    min_amt: f64,
    max_amt: f64,
) -> MerchantProfile {
    MerchantProfile {
        merchant,
        category,
        min_amt,
        max_amt,
    }
}

/// Checked in order; the first range containing the amount wins.
pub const MERCHANT_PROFILES: &[MerchantProfile] = &[
    profile("The Coffee Spot", "Food & Drink", -15.0, -5.0),
    profile("SuperMart Groceries", "Groceries", -150.0, -40.0),
    profile("City Transit", "Transportation", -30.0, -20.0),
    profile("Gas Station", "Transportation", -70.0, -50.0),
    profile("Quick Eats", "Restaurants", -40.0, -15.0),
    profile("Cinema Plex", "Entertainment", -50.0, -30.0),
    profile("Online Store", "Shopping", -200.0, -70.0),
];

pub fn match_profile(amount: f64) -> Option<&'static MerchantProfile> {
    MERCHANT_PROFILES
        .iter()
        .find(|p| p.min_amt <= amount && amount <= p.max_amt)
}

/// Enrich every record. Non-object records and unmatched withdrawals pass
/// through unchanged.
pub fn enrich_transactions<R: Rng + ?Sized>(items: Vec<Value>, rng: &mut R) -> Vec<Value> {
    items.into_iter().map(|item| enrich_one(item, rng)).collect()
}

fn enrich_one<R: Rng + ?Sized>(item: Value, rng: &mut R) -> Value {
    let mut tx = match item {
        Value::Object(tx) => tx,
        other => return other,
    };
    let amount = tx.get("amount").and_then(Value::as_f64).unwrap_or(0.0);

    if amount > 0.0 {
        tx.insert("description".into(), json!("Paycheck Deposit"));
        tx.insert("category".into(), json!("Income"));
        tx.insert("merchant".into(), json!("Your Employer"));
        return Value::Object(tx);
    }

    let Some(p) = match_profile(amount) else {
        return Value::Object(tx);
    };

    let cents: f64 = rng.random_range(-0.99..=0.0);
    let new_amount = ((amount + cents) * 100.0).round() / 100.0;

    let mut out = Map::new();
    out.insert("fromAccountNum".into(), field(&tx, "fromAccountNum"));
    out.insert("toAccountNum".into(), field(&tx, "toAccountNum"));
    out.insert("amount".into(), json!(new_amount));
    out.insert("timestamp".into(), field(&tx, "timestamp"));
    out.insert("description".into(), json!(p.merchant));
    out.insert("category".into(), json!(p.category));
    out.insert("merchant".into(), json!(p.merchant));
    Value::Object(out)
}

fn field(tx: &Map<String, Value>, key: &str) -> Value {
    tx.get(key).cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_deposit_becomes_paycheck() {
        let out = enrich_transactions(vec![json!({"amount": 2500, "timestamp": "t"})], &mut rng());
        assert_eq!(out[0]["category"], json!("Income"));
        assert_eq!(out[0]["merchant"], json!("Your Employer"));
        assert_eq!(out[0]["amount"], json!(2500));
        assert_eq!(out[0]["timestamp"], json!("t"));
    }

    #[test]
    fn test_withdrawal_matches_first_profile() {
        let out = enrich_transactions(
            vec![json!({"amount": -10, "fromAccountNum": "111", "timestamp": "2024-01-01T00:00:00Z"})],
            &mut rng(),
        );
        let tx = &out[0];
        assert_eq!(tx["merchant"], json!("The Coffee Spot"));
        assert_eq!(tx["description"], json!("The Coffee Spot"));
        assert_eq!(tx["category"], json!("Food & Drink"));
        assert_eq!(tx["fromAccountNum"], json!("111"));
        assert_eq!(tx["toAccountNum"], Value::Null);

        let amt = tx["amount"].as_f64().unwrap();
        assert!((-10.99..=-10.0).contains(&amt), "{amt}");
    }

    #[test]
    fn test_overlapping_ranges_prefer_table_order() {
        // -45 falls in both the Groceries and Cinema Plex ranges
        assert_eq!(match_profile(-45.0).unwrap().merchant, "SuperMart Groceries");
        assert_eq!(match_profile(-35.0).unwrap().merchant, "Quick Eats");
    }

    #[test]
    fn test_unmatched_and_non_objects_pass_through() {
        let items = vec![json!({"amount": -500, "label": "Rent"}), json!("junk"), json!({"amount": 0})];
        let out = enrich_transactions(items.clone(), &mut rng());
        assert_eq!(out, items);
    }
}
