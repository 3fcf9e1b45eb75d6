//! Shared test fixtures for the ledger integration tests.
//!
//! Provides an in-memory ledger driven by a [`ManualClock`] pinned to a fixed
//! start time, plus the sample funding round used across test files.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use venture_ledger::models::{Project, ProjectTerms};
use venture_ledger::{ManualClock, VentureLedger};

pub const GOAL: i64 = 100_000;
pub const MINIMUM: i64 = 5_000;
pub const EQUITY: f64 = 10.0;
pub const VALUATION: i64 = 1_000_000;

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

pub fn deadline() -> DateTime<Utc> {
    start() + Duration::days(30)
}

/// Create an in-memory ledger and the clock that drives it.
pub fn setup_ledger() -> (VentureLedger, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start()));
    let ledger = VentureLedger::builder()
        .in_memory()
        .clock(clock.clone())
        .build()
        .unwrap();
    (ledger, clock)
}

/// The reference round: goal 100000, minimum 5000, 10% equity, 1M valuation.
pub fn sample_terms(id: &str) -> ProjectTerms {
    ProjectTerms::new("founder-1", "Solar Co-op", GOAL, EQUITY, deadline())
        .with_id(id)
        .with_description("Community solar installation")
        .with_minimum(MINIMUM)
        .with_valuation(VALUATION)
}

pub fn create_sample_project(ledger: &VentureLedger, id: &str) -> Project {
    ledger.projects().create_project(sample_terms(id)).unwrap()
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
