//! save2win-finance: spend buckets, transaction summaries and game rules

pub mod bucket_rules;
pub mod game;
pub mod summary;

pub use bucket_rules::{bucket_for, bucket_for_parts};
pub use game::{Badge, GameState, NarrativeContent, apply_game_rules};
pub use summary::{BucketTotals, Highlights, Summary, TransactionView, WindowStats, summarize};
