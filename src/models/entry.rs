use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EntryKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Investment,
    Reversal,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Investment => "investment",
            EntryKind::Reversal => "reversal",
        }
    }
}

// ---------------------------------------------------------------------------
// InvestmentEntry: One immutable ledger line
// ---------------------------------------------------------------------------

/// A single ledger line. Never mutated or deleted once written.
///
/// Reversals carry the negated `amount` and `equity_percentage` of the entry
/// named in `reverses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentEntry {
    pub id: String,
    pub project_id: String,
    pub investor_id: String,
    pub amount: i64,
    pub equity_percentage: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub kind: EntryKind,
    pub reverses: Option<String>,
}

impl InvestmentEntry {
    pub fn is_reversal(&self) -> bool {
        self.kind == EntryKind::Reversal
    }
}
