//! Pure aggregation functions over hand-built ledger entries.

mod common;

use venture_ledger::aggregation::{
    current_funding, funding_percentage, investor_positions, remaining_capacity, snapshot,
    total_equity, unique_investor_count,
};
use venture_ledger::models::{EntryKind, InvestmentEntry, Project, ProjectStatus};
use venture_ledger::LedgerError;

fn entry(id: &str, investor: &str, amount: i64, equity: f64) -> InvestmentEntry {
    InvestmentEntry {
        id: id.to_string(),
        project_id: "p".to_string(),
        investor_id: investor.to_string(),
        amount,
        equity_percentage: equity,
        timestamp: common::start(),
        kind: if amount < 0 {
            EntryKind::Reversal
        } else {
            EntryKind::Investment
        },
        reverses: None,
    }
}

fn project(goal: i64) -> Project {
    Project {
        id: "p".to_string(),
        owner_id: "o".to_string(),
        title: "Project".to_string(),
        description: None,
        funding_goal: goal,
        minimum_investment: None,
        maximum_investment: None,
        equity_offered: 10.0,
        valuation: None,
        deadline: common::deadline(),
        status: ProjectStatus::Active,
        created_at: common::start(),
    }
}

// ---------------------------------------------------------------------------
// Funding totals
// ---------------------------------------------------------------------------

#[test]
fn test_empty_ledger_has_zero_totals() {
    assert_eq!(current_funding(&[]), 0);
    assert_eq!(funding_percentage(&[], 1_000).unwrap(), 0.0);
    assert_eq!(unique_investor_count(&[]), 0);
    assert_eq!(total_equity(&[]), 0.0);
    assert_eq!(remaining_capacity(&[], 1_000), 1_000);
    assert!(investor_positions(&[]).is_empty());
}

#[test]
fn test_current_funding_sums_with_reversals() {
    let entries = vec![
        entry("1", "a", 20_000, 2.0),
        entry("2", "b", 10_000, 1.0),
        entry("3", "a", -20_000, -2.0),
    ];
    assert_eq!(current_funding(&entries), 10_000);
    assert!(common::approx_eq(total_equity(&entries), 1.0));
}

#[test]
fn test_funding_percentage_is_capped_at_one_hundred() {
    let entries = vec![entry("1", "a", 150, 1.0)];
    assert_eq!(funding_percentage(&entries, 100).unwrap(), 100.0);

    let entries = vec![entry("1", "a", 25, 1.0)];
    assert!(common::approx_eq(funding_percentage(&entries, 100).unwrap(), 25.0));
}

#[test]
fn test_funding_percentage_rejects_non_positive_goal() {
    let entries = vec![entry("1", "a", 25, 1.0)];
    assert!(matches!(funding_percentage(&entries, 0), Err(LedgerError::InvalidGoal(0))));
    assert!(matches!(funding_percentage(&entries, -10), Err(LedgerError::InvalidGoal(-10))));
    assert_eq!(LedgerError::InvalidGoal(0).code(), "invalid_goal");
}

#[test]
fn test_aggregation_is_idempotent() {
    let entries = vec![entry("1", "a", 20_000, 2.0), entry("2", "b", 7_000, 0.7)];
    let first = funding_percentage(&entries, 100_000).unwrap();
    let second = funding_percentage(&entries, 100_000).unwrap();
    assert_eq!(first, second);
    assert_eq!(investor_positions(&entries), investor_positions(&entries));
}

#[test]
fn test_remaining_capacity_never_negative() {
    let entries = vec![entry("1", "a", 120, 1.0)];
    assert_eq!(remaining_capacity(&entries, 100), 0);
}

// ---------------------------------------------------------------------------
// Investors
// ---------------------------------------------------------------------------

#[test]
fn test_repeat_investor_counts_once() {
    let entries = vec![
        entry("1", "a", 10_000, 1.0),
        entry("2", "a", 10_000, 1.0),
        entry("3", "b", 5_000, 0.5),
    ];
    assert_eq!(unique_investor_count(&entries), 2);
}

#[test]
fn test_fully_reversed_investor_is_not_counted() {
    let entries = vec![
        entry("1", "a", 10_000, 1.0),
        entry("2", "b", 5_000, 0.5),
        entry("3", "a", -10_000, -1.0),
    ];
    assert_eq!(unique_investor_count(&entries), 1);
}

#[test]
fn test_investor_positions_are_netted_and_sorted() {
    let entries = vec![
        entry("1", "zed", 10_000, 1.0),
        entry("2", "amy", 5_000, 0.5),
        entry("3", "zed", 2_000, 0.2),
        entry("4", "zed", -10_000, -1.0),
    ];
    let positions = investor_positions(&entries);
    assert_eq!(positions.len(), 2);
    assert_eq!(positions[0].investor_id, "amy");
    assert_eq!(positions[0].amount, 5_000);
    assert_eq!(positions[0].entry_count, 1);
    assert_eq!(positions[1].investor_id, "zed");
    assert_eq!(positions[1].amount, 2_000);
    assert!(common::approx_eq(positions[1].equity_percentage, 0.2));
    assert_eq!(positions[1].entry_count, 3);
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[test]
fn test_snapshot_combines_terms_and_totals() {
    let entries = vec![entry("1", "a", 30_000, 3.0), entry("2", "b", 20_000, 2.0)];
    let snap = snapshot(project(100_000), &entries).unwrap();
    assert_eq!(snap.project.id, "p");
    assert_eq!(snap.current_funding, 50_000);
    assert!(common::approx_eq(snap.funding_percentage, 50.0));
    assert_eq!(snap.total_investors, 2);
    assert_eq!(snap.remaining_capacity, 50_000);
    assert_eq!(snap.entry_count, 2);
}

#[test]
fn test_snapshot_propagates_invalid_goal() {
    assert!(matches!(
        snapshot(project(0), &[]),
        Err(LedgerError::InvalidGoal(0))
    ));
}

#[test]
fn test_funding_sums_saturate_instead_of_overflowing() {
    let entries = vec![entry("1", "a", i64::MAX, 1.0), entry("2", "b", i64::MAX, 1.0)];
    assert_eq!(current_funding(&entries), i64::MAX);
    assert_eq!(remaining_capacity(&entries, 100), 0);

    let mixed = vec![
        entry("1", "a", i64::MAX, 1.0),
        entry("2", "a", 5, 1.0),
        entry("3", "a", -10, -1.0),
    ];
    // i128 accumulation keeps the exact result when it fits
    assert_eq!(current_funding(&mixed), i64::MAX - 5);
}
