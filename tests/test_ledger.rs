//! Investment ledger tests: validation order, boundaries, status transitions
//! and reversals.

mod common;

use chrono::Duration;
use venture_ledger::models::{EntryKind, ProjectStatus, ProjectTerms};
use venture_ledger::{aggregation, LedgerError};

// ---------------------------------------------------------------------------
// Reference scenario
// ---------------------------------------------------------------------------

#[test]
fn test_record_investment_reference_round() {
    let (ledger, _clock) = common::setup_ledger();
    common::create_sample_project(&ledger, "solar");

    let first = ledger.ledger().record_investment("solar", "alice", 20_000).unwrap();
    assert_eq!(first.amount, 20_000);
    assert!(common::approx_eq(first.equity_percentage, 2.0));
    assert_eq!(first.kind, EntryKind::Investment);
    assert_eq!(first.reverses, None);
    assert_eq!(first.timestamp, common::start());
    assert!(first.id.starts_with("inv_"));

    let snapshot = ledger.projects().get_project("solar").unwrap();
    assert!(common::approx_eq(snapshot.funding_percentage, 20.0));
    assert_eq!(snapshot.total_investors, 1);

    let err = ledger.ledger().record_investment("solar", "bob", 3_000).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::BelowMinimum {
            amount: 3_000,
            minimum: 5_000
        }
    ));

    let err = ledger.ledger().record_investment("solar", "carol", 90_000).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientCapacity {
            amount: 90_000,
            remaining: 80_000
        }
    ));

    // Rejections leave the ledger untouched
    let snapshot = ledger.projects().get_project("solar").unwrap();
    assert_eq!(snapshot.current_funding, 20_000);
    assert_eq!(snapshot.entry_count, 1);

    let second = ledger.ledger().record_investment("solar", "bob", 80_000).unwrap();
    assert!(common::approx_eq(second.equity_percentage, 8.0));

    let snapshot = ledger.projects().get_project("solar").unwrap();
    assert_eq!(snapshot.current_funding, 100_000);
    assert!(common::approx_eq(snapshot.funding_percentage, 100.0));
    assert_eq!(snapshot.total_investors, 2);
    assert_eq!(snapshot.remaining_capacity, 0);
    assert_eq!(snapshot.project.status, ProjectStatus::Funded);
}

#[test]
fn test_recorded_entry_is_readable() {
    let (ledger, _clock) = common::setup_ledger();
    common::create_sample_project(&ledger, "solar");
    let entry = ledger.ledger().record_investment("solar", "alice", 20_000).unwrap();

    assert_eq!(ledger.investments().get_entry(&entry.id).unwrap(), entry);
    assert_eq!(ledger.investments().for_project("solar").unwrap(), vec![entry.clone()]);
    assert_eq!(ledger.investments().for_investor("alice").unwrap(), vec![entry]);
    assert!(ledger.investments().for_investor("bob").unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

#[test]
fn test_minimum_and_maximum_are_inclusive() {
    let (ledger, _clock) = common::setup_ledger();
    let terms = ProjectTerms::new("founder-1", "Bounded", 200_000, 20.0, common::deadline())
        .with_id("bounded")
        .with_minimum(5_000)
        .with_maximum(50_000);
    ledger.projects().create_project(terms).unwrap();

    assert!(ledger.ledger().record_investment("bounded", "a", 5_000).is_ok());
    assert!(ledger.ledger().record_investment("bounded", "b", 50_000).is_ok());
    assert!(matches!(
        ledger.ledger().record_investment("bounded", "c", 4_999),
        Err(LedgerError::BelowMinimum { .. })
    ));
    assert!(matches!(
        ledger.ledger().record_investment("bounded", "d", 50_001),
        Err(LedgerError::AboveMaximum {
            amount: 50_001,
            maximum: 50_000
        })
    ));
}

#[test]
fn test_exact_remaining_capacity_is_accepted() {
    let (ledger, _clock) = common::setup_ledger();
    common::create_sample_project(&ledger, "solar");
    ledger.ledger().record_investment("solar", "alice", 60_000).unwrap();

    assert!(matches!(
        ledger.ledger().record_investment("solar", "bob", 40_001),
        Err(LedgerError::InsufficientCapacity { remaining: 40_000, .. })
    ));
    ledger.ledger().record_investment("solar", "bob", 40_000).unwrap();

    let snapshot = ledger.projects().get_project("solar").unwrap();
    assert_eq!(snapshot.current_funding, common::GOAL);
    assert!(common::approx_eq(snapshot.funding_percentage, 100.0));
    assert_eq!(snapshot.remaining_capacity, 0);
}

// ---------------------------------------------------------------------------
// Validation order
// ---------------------------------------------------------------------------

#[test]
fn test_closed_check_precedes_amount_checks() {
    let (ledger, _clock) = common::setup_ledger();
    common::create_sample_project(&ledger, "solar");
    ledger.projects().close_project("solar").unwrap();

    let err = ledger.ledger().record_investment("solar", "alice", 1_000).unwrap_err();
    assert!(matches!(err, LedgerError::ProjectClosed(_)));
}

#[test]
fn test_minimum_check_precedes_capacity_check() {
    let (ledger, _clock) = common::setup_ledger();
    let terms = ProjectTerms::new("founder-1", "Tight", 10_000, 5.0, common::deadline())
        .with_id("tight")
        .with_minimum(8_000);
    ledger.projects().create_project(terms).unwrap();
    ledger.ledger().record_investment("tight", "alice", 8_000).unwrap();

    // 7000 is both below the minimum and above the remaining 2000
    let err = ledger.ledger().record_investment("tight", "bob", 7_000).unwrap_err();
    assert!(matches!(err, LedgerError::BelowMinimum { .. }));
}

#[test]
fn test_maximum_check_precedes_capacity_check() {
    let (ledger, _clock) = common::setup_ledger();
    let terms = ProjectTerms::new("founder-1", "Capped", 10_000, 5.0, common::deadline())
        .with_id("capped")
        .with_maximum(6_000);
    ledger.projects().create_project(terms).unwrap();
    ledger.ledger().record_investment("capped", "alice", 6_000).unwrap();

    let err = ledger.ledger().record_investment("capped", "bob", 7_000).unwrap_err();
    assert!(matches!(err, LedgerError::AboveMaximum { .. }));
}

// ---------------------------------------------------------------------------
// Deadline and status
// ---------------------------------------------------------------------------

#[test]
fn test_deadline_closes_the_round() {
    let (ledger, clock) = common::setup_ledger();
    common::create_sample_project(&ledger, "solar");

    clock.set(common::deadline() - Duration::milliseconds(1));
    assert!(ledger.ledger().record_investment("solar", "alice", 10_000).is_ok());

    clock.set(common::deadline());
    let err = ledger.ledger().record_investment("solar", "bob", 10_000).unwrap_err();
    assert!(matches!(err, LedgerError::ProjectClosed(_)));
    assert_eq!(err.code(), "project_closed");

    // The stored status is unaffected; the deadline alone closes the round
    let terms = ledger.projects().get_terms("solar").unwrap();
    assert_eq!(terms.status, ProjectStatus::Active);
    assert!(!terms.is_open_at(common::deadline()));
    assert_eq!(terms.days_left(common::deadline() + Duration::days(3)), 0);
}

#[test]
fn test_filling_the_goal_marks_project_funded() {
    let (ledger, _clock) = common::setup_ledger();
    common::create_sample_project(&ledger, "solar");
    ledger.ledger().record_investment("solar", "alice", 50_000).unwrap();
    assert_eq!(
        ledger.projects().get_terms("solar").unwrap().status,
        ProjectStatus::Active
    );

    ledger.ledger().record_investment("solar", "bob", 50_000).unwrap();
    assert_eq!(
        ledger.projects().get_terms("solar").unwrap().status,
        ProjectStatus::Funded
    );

    let err = ledger.ledger().record_investment("solar", "carol", 5_000).unwrap_err();
    assert!(matches!(err, LedgerError::ProjectClosed(_)));
}

// ---------------------------------------------------------------------------
// Invalid input
// ---------------------------------------------------------------------------

#[test]
fn test_non_positive_amount_is_invalid_argument() {
    let (ledger, _clock) = common::setup_ledger();
    common::create_sample_project(&ledger, "solar");

    for amount in [0, -1, -20_000] {
        let err = ledger.ledger().record_investment("solar", "alice", amount).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)), "amount {}", amount);
    }
    let err = ledger.ledger().record_investment("solar", "  ", 10_000).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));
    assert!(ledger.investments().for_project("solar").unwrap().is_empty());
}

#[test]
fn test_unknown_project_is_not_found() {
    let (ledger, _clock) = common::setup_ledger();
    let err = ledger.ledger().record_investment("ghost", "alice", 10_000).unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
    assert!(!err.is_retryable());
}

// ---------------------------------------------------------------------------
// Equity
// ---------------------------------------------------------------------------

#[test]
fn test_equity_is_proportional_and_conserved() {
    let (ledger, _clock) = common::setup_ledger();
    let terms = ProjectTerms::new("founder-1", "Odd", 30_000, 7.0, common::deadline()).with_id("odd");
    ledger.projects().create_project(terms).unwrap();

    for investor in ["a", "b", "c"] {
        ledger.ledger().record_investment("odd", investor, 10_000).unwrap();
    }

    let entries = ledger.investments().for_project("odd").unwrap();
    for entry in &entries {
        assert!((entry.equity_percentage - 7.0 / 3.0).abs() < venture_ledger::config::EQUITY_EPSILON);
    }
    let total = aggregation::total_equity(&entries);
    assert!(total <= 7.0 + venture_ledger::config::EQUITY_EPSILON);
    assert!((total - 7.0).abs() < venture_ledger::config::EQUITY_EPSILON);
}

// ---------------------------------------------------------------------------
// Reversals
// ---------------------------------------------------------------------------

#[test]
fn test_reversal_restores_capacity_and_keeps_history() {
    let (ledger, _clock) = common::setup_ledger();
    common::create_sample_project(&ledger, "solar");
    let original = ledger.ledger().record_investment("solar", "alice", 20_000).unwrap();
    ledger.ledger().record_investment("solar", "bob", 10_000).unwrap();

    let reversal = ledger.ledger().reverse_investment("solar", &original.id).unwrap();
    assert_eq!(reversal.kind, EntryKind::Reversal);
    assert!(reversal.is_reversal());
    assert_eq!(reversal.amount, -20_000);
    assert!(common::approx_eq(reversal.equity_percentage, -2.0));
    assert_eq!(reversal.investor_id, "alice");
    assert_eq!(reversal.reverses.as_deref(), Some(original.id.as_str()));
    assert!(reversal.id.starts_with("rev_"));

    let snapshot = ledger.projects().get_project("solar").unwrap();
    assert_eq!(snapshot.current_funding, 10_000);
    assert_eq!(snapshot.remaining_capacity, 90_000);
    assert_eq!(snapshot.total_investors, 1);
    assert_eq!(snapshot.entry_count, 3);

    // The original entry is never modified
    assert_eq!(ledger.investments().get_entry(&original.id).unwrap(), original);
}

#[test]
fn test_reversal_reopens_a_funded_round() {
    let (ledger, _clock) = common::setup_ledger();
    common::create_sample_project(&ledger, "solar");
    let entry = ledger.ledger().record_investment("solar", "alice", 100_000).unwrap();
    assert_eq!(
        ledger.projects().get_terms("solar").unwrap().status,
        ProjectStatus::Funded
    );

    ledger.ledger().reverse_investment("solar", &entry.id).unwrap();
    assert_eq!(
        ledger.projects().get_terms("solar").unwrap().status,
        ProjectStatus::Active
    );
    assert!(ledger.ledger().record_investment("solar", "bob", 30_000).is_ok());
}

#[test]
fn test_reversal_rejects_repeats_and_reversals() {
    let (ledger, _clock) = common::setup_ledger();
    common::create_sample_project(&ledger, "solar");
    let entry = ledger.ledger().record_investment("solar", "alice", 20_000).unwrap();
    let reversal = ledger.ledger().reverse_investment("solar", &entry.id).unwrap();

    assert!(matches!(
        ledger.ledger().reverse_investment("solar", &entry.id),
        Err(LedgerError::InvalidArgument(_))
    ));
    assert!(matches!(
        ledger.ledger().reverse_investment("solar", &reversal.id),
        Err(LedgerError::InvalidArgument(_))
    ));
    assert!(matches!(
        ledger.ledger().reverse_investment("solar", "inv_missing"),
        Err(LedgerError::NotFound(_))
    ));
}

#[test]
fn test_reversal_requires_matching_project() {
    let (ledger, _clock) = common::setup_ledger();
    common::create_sample_project(&ledger, "a");
    common::create_sample_project(&ledger, "b");
    let entry = ledger.ledger().record_investment("a", "alice", 20_000).unwrap();

    assert!(matches!(
        ledger.ledger().reverse_investment("b", &entry.id),
        Err(LedgerError::NotFound(_))
    ));
}

#[test]
fn test_reversal_on_closed_project_is_rejected() {
    let (ledger, clock) = common::setup_ledger();
    common::create_sample_project(&ledger, "solar");
    let entry = ledger.ledger().record_investment("solar", "alice", 20_000).unwrap();

    clock.advance(Duration::days(60));
    ledger.projects().close_project("solar").unwrap();
    assert!(matches!(
        ledger.ledger().reverse_investment("solar", &entry.id),
        Err(LedgerError::ProjectClosed(_))
    ));
}

#[test]
fn test_reversal_after_deadline_is_allowed_while_not_closed() {
    let (ledger, clock) = common::setup_ledger();
    common::create_sample_project(&ledger, "solar");
    let entry = ledger.ledger().record_investment("solar", "alice", 20_000).unwrap();

    clock.advance(Duration::days(60));
    let reversal = ledger.ledger().reverse_investment("solar", &entry.id).unwrap();
    assert_eq!(reversal.timestamp, common::start() + Duration::days(60));
    assert_eq!(ledger.projects().get_project("solar").unwrap().current_funding, 0);
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

#[test]
fn test_error_codes_are_distinct_and_stable() {
    let errors = [
        LedgerError::InvalidTerms("x".into()),
        LedgerError::ProjectClosed("x".into()),
        LedgerError::BelowMinimum { amount: 1, minimum: 2 },
        LedgerError::AboveMaximum { amount: 3, maximum: 2 },
        LedgerError::InsufficientCapacity { amount: 3, remaining: 2 },
        LedgerError::NotFound("x".into()),
        LedgerError::StoreUnavailable("x".into()),
        LedgerError::InvalidGoal(0),
        LedgerError::InvalidArgument("x".into()),
        LedgerError::Overflow("x".into()),
    ];
    let codes: std::collections::HashSet<&str> = errors.iter().map(|e| e.code()).collect();
    assert_eq!(codes.len(), errors.len());

    let retryable: Vec<&str> = errors
        .iter()
        .filter(|e| e.is_retryable())
        .map(|e| e.code())
        .collect();
    assert_eq!(retryable, vec!["store_unavailable"]);

    let message = LedgerError::InsufficientCapacity {
        amount: 90_000,
        remaining: 80_000,
    }
    .to_string();
    assert!(message.contains("90000"));
    assert!(message.contains("80000"));
}
