#![cfg(feature = "async")]

mod common;

use std::sync::Arc;

use venture_ledger::{AsyncVentureLedger, LedgerError, ManualClock};

async fn setup() -> AsyncVentureLedger {
    let ledger = AsyncVentureLedger::builder()
        .in_memory()
        .clock(Arc::new(ManualClock::new(common::start())))
        .build()
        .await
        .unwrap();
    ledger
        .run(|l| l.projects().create_project(common::sample_terms("solar")))
        .await
        .unwrap();
    ledger
}

#[tokio::test]
async fn test_async_record_and_read() {
    let ledger = setup().await;

    let entry = ledger.record_investment("solar", "alice", 20_000).await.unwrap();
    assert!(common::approx_eq(entry.equity_percentage, 2.0));

    let snapshot = ledger.get_project("solar").await.unwrap();
    assert_eq!(snapshot.current_funding, 20_000);

    let portfolio = ledger.portfolio("alice").await.unwrap();
    assert_eq!(portfolio.total_invested, 20_000);
}

#[tokio::test]
async fn test_async_errors_propagate() {
    let ledger = setup().await;
    let err = ledger.record_investment("solar", "bob", 3_000).await.unwrap_err();
    assert!(matches!(err, LedgerError::BelowMinimum { .. }));
    assert!(matches!(
        ledger.get_project("ghost").await,
        Err(LedgerError::NotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_async_concurrent_writers() {
    let ledger = setup().await;

    let mut tasks = Vec::new();
    for i in 0..12 {
        let ledger = ledger.clone();
        tasks.push(tokio::spawn(async move {
            ledger
                .record_investment("solar", &format!("investor-{}", i), 9_000)
                .await
        }));
    }
    let mut accepted = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 11);
    assert_eq!(ledger.get_project("solar").await.unwrap().current_funding, 99_000);
}
