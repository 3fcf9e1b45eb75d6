//! Derived totals over a project's ledger entries.
//!
//! Every function here is pure: it reads only the slice it is given and is
//! recomputed from the ledger on each read. Nothing is cached, so totals
//! cannot drift from the entries they summarize.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::models::{InvestmentEntry, Project, ProjectSnapshot};

/// Net position of one investor on one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorPosition {
    pub investor_id: String,
    pub amount: i64,
    pub equity_percentage: f64,
    pub entry_count: usize,
}

/// Sum of all entry amounts (reversals count negatively).
///
/// Summed in `i128` and saturated to the `i64` range.
pub fn current_funding(entries: &[InvestmentEntry]) -> i64 {
    saturate(entries.iter().map(|e| e.amount as i128).sum())
}

/// `current_funding / goal * 100`, capped at 100.
pub fn funding_percentage(entries: &[InvestmentEntry], goal: i64) -> Result<f64> {
    if goal <= 0 {
        return Err(LedgerError::InvalidGoal(goal));
    }
    let pct = current_funding(entries) as f64 / goal as f64 * 100.0;
    Ok(pct.clamp(0.0, 100.0))
}

/// Number of distinct investors holding a positive net position.
///
/// Two entries from the same investor count once. An investor whose every
/// investment was reversed no longer counts.
pub fn unique_investor_count(entries: &[InvestmentEntry]) -> usize {
    investor_positions(entries)
        .iter()
        .filter(|p| p.amount > 0)
        .count()
}

pub fn total_equity(entries: &[InvestmentEntry]) -> f64 {
    entries.iter().map(|e| e.equity_percentage).sum()
}

/// Capital the round can still accept; never negative.
pub fn remaining_capacity(entries: &[InvestmentEntry], goal: i64) -> i64 {
    saturate((goal as i128 - current_funding(entries) as i128).max(0))
}

fn saturate(value: i128) -> i64 {
    value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Net amount and equity per investor, ordered by investor id.
pub fn investor_positions(entries: &[InvestmentEntry]) -> Vec<InvestorPosition> {
    let mut by_investor: BTreeMap<&str, InvestorPosition> = BTreeMap::new();
    for entry in entries {
        let position = by_investor
            .entry(entry.investor_id.as_str())
            .or_insert_with(|| InvestorPosition {
                investor_id: entry.investor_id.clone(),
                amount: 0,
                equity_percentage: 0.0,
                entry_count: 0,
            });
        position.amount = position.amount.saturating_add(entry.amount);
        position.equity_percentage += entry.equity_percentage;
        position.entry_count += 1;
    }
    by_investor.into_values().collect()
}

/// Combine a project's terms with totals derived from its entries.
pub fn snapshot(project: Project, entries: &[InvestmentEntry]) -> Result<ProjectSnapshot> {
    let funding_percentage = funding_percentage(entries, project.funding_goal)?;
    Ok(ProjectSnapshot {
        current_funding: current_funding(entries),
        funding_percentage,
        total_investors: unique_investor_count(entries),
        remaining_capacity: remaining_capacity(entries, project.funding_goal),
        entry_count: entries.len(),
        project,
    })
}
