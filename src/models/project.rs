use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ProjectStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Funded,
    Closed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Funded => "funded",
            ProjectStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Project: Terms of a funding round (persisted row)
// ---------------------------------------------------------------------------

/// The terms of a funding round. Everything except `status` is write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    /// Minor currency units.
    pub funding_goal: i64,
    pub minimum_investment: Option<i64>,
    pub maximum_investment: Option<i64>,
    /// Percentage of the company offered across the whole round, `(0, 100]`.
    pub equity_offered: f64,
    pub valuation: Option<i64>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub deadline: DateTime<Utc>,
    pub status: ProjectStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Whether the round accepts new money at `now`.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ProjectStatus::Active && now < self.deadline
    }

    /// Equity percentage a given amount buys under these terms.
    pub fn equity_for(&self, amount: i64) -> f64 {
        amount as f64 / self.funding_goal as f64 * self.equity_offered
    }

    /// Whole days until the deadline, zero once it has passed.
    pub fn days_left(&self, now: DateTime<Utc>) -> i64 {
        (self.deadline - now).num_days().max(0)
    }
}

// ---------------------------------------------------------------------------
// ProjectTerms: Input to project creation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTerms {
    /// Generated when absent.
    pub id: Option<String>,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub funding_goal: i64,
    pub minimum_investment: Option<i64>,
    pub maximum_investment: Option<i64>,
    pub equity_offered: f64,
    pub valuation: Option<i64>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub deadline: DateTime<Utc>,
}

impl ProjectTerms {
    pub fn new(
        owner_id: &str,
        title: &str,
        funding_goal: i64,
        equity_offered: f64,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            owner_id: owner_id.to_string(),
            title: title.to_string(),
            description: None,
            funding_goal,
            minimum_investment: None,
            maximum_investment: None,
            equity_offered,
            valuation: None,
            deadline,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_minimum(mut self, minimum: i64) -> Self {
        self.minimum_investment = Some(minimum);
        self
    }

    pub fn with_maximum(mut self, maximum: i64) -> Self {
        self.maximum_investment = Some(maximum);
        self
    }

    pub fn with_valuation(mut self, valuation: i64) -> Self {
        self.valuation = Some(valuation);
        self
    }
}

// ---------------------------------------------------------------------------
// ProjectSnapshot: Terms plus totals derived from the ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    #[serde(flatten)]
    pub project: Project,
    pub current_funding: i64,
    pub funding_percentage: f64,
    pub total_investors: usize,
    pub remaining_capacity: i64,
    pub entry_count: usize,
}
