use serde::{Deserialize, Serialize};

use super::project::ProjectStatus;

// ---------------------------------------------------------------------------
// Holding: One investor's net position in one project
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub project_id: String,
    pub title: String,
    pub status: ProjectStatus,
    pub invested: i64,
    pub equity_percentage: f64,
    pub estimated_value: i64,
    pub entry_count: usize,
}

// ---------------------------------------------------------------------------
// Portfolio: Investor roll-up across projects (derived, never persisted)
// ---------------------------------------------------------------------------

/// An investor's aggregate position.
///
/// `estimated_value` and everything derived from it are estimates produced by
/// the configured valuation source named in `valuation_basis`, never market
/// data. `is_estimate` is always `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub investor_id: String,
    pub total_invested: i64,
    pub total_equity: f64,
    pub estimated_value: i64,
    pub estimated_return: i64,
    pub roi_percentage: f64,
    pub active_project_count: usize,
    pub holdings: Vec<Holding>,
    pub skipped_projects: Vec<String>,
    pub valuation_basis: String,
    pub is_estimate: bool,
}
