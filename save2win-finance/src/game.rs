//! Game rules: XP and badges from raw transactions plus narrative text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const BASE_XP: u32 = 100;
const COFFEE_XP: u32 = 250;
const MONEY_MAKER_XP: u32 = 500;

const DEFAULT_QUEST: &str = "No quest available.";
const DEFAULT_TIP: &str = "Save a little every day!";

/// Quest/tip pair supplied by the narrative provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeContent {
    pub quest: String,
    pub tip: String,
}

impl NarrativeContent {
    /// Content used when the provider is unavailable or returns garbage.
    pub fn fallback() -> Self {
        Self {
            quest: "The Frugal Foodie! Try packing your lunch twice this week for 500 XP."
                .to_string(),
            tip: "Did you know that packing your lunch can save you over $100 a month?"
                .to_string(),
        }
    }

    /// Read a provider JSON object; missing or non-string keys get defaults.
    pub fn from_json(value: &Value) -> Self {
        let field = |key: &str, default: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };
        Self {
            quest: field("quest", DEFAULT_QUEST),
            tip: field("tip", DEFAULT_TIP),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub title: String,
}

impl Badge {
    fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub xp: u32,
    pub level: u32,
    pub quest: String,
    pub tip: String,
    pub badges: Vec<Badge>,
}

/// Apply the badge rules to raw upstream transactions.
pub fn apply_game_rules(transactions: &[Value], content: &NarrativeContent) -> GameState {
    let mut xp = BASE_XP;
    let mut badges = Vec::new();

    if transactions.iter().any(is_coffee) {
        badges.push(Badge::new("coffee_crusader", "Coffee Crusader"));
        xp += COFFEE_XP;
    }
    if transactions.iter().any(is_income) {
        badges.push(Badge::new("money_maker", "Big Deposit!"));
        xp += MONEY_MAKER_XP;
    }

    GameState {
        xp,
        level: 1,
        quest: content.quest.clone(),
        tip: content.tip.clone(),
        badges,
    }
}

fn text_field<'a>(tx: &'a Value, key: &str) -> Option<&'a str> {
    tx.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn is_coffee(tx: &Value) -> bool {
    text_field(tx, "merchant")
        .or_else(|| text_field(tx, "label"))
        .map(|s| s.to_lowercase().contains("coffee"))
        .unwrap_or(false)
}

fn is_income(tx: &Value) -> bool {
    text_field(tx, "category") == Some("Income")
        || text_field(tx, "type") == Some("Credit")
        || tx
            .get("amount")
            .and_then(Value::as_f64)
            .is_some_and(|a| a > 0.0)
}
