//! Async wrapper around [`VentureLedger`] for use in async runtimes (Tokio, etc.).
//!
//! Runs all ledger operations on the blocking thread pool via
//! [`tokio::task::spawn_blocking`], keeping the async event loop free while
//! DuckDB works or a writer waits on a project lock.
//!
//! # Example
//!
//! ```no_run
//! use venture_ledger::AsyncVentureLedger;
//!
//! #[tokio::main]
//! async fn main() {
//!     let ledger = AsyncVentureLedger::builder().in_memory().build().await.unwrap();
//!
//!     let entry = ledger
//!         .record_investment("prj_1", "investor-a", 20_000)
//!         .await;
//!
//!     let portfolio = ledger.run(|l| l.portfolio().build_for_investor("investor-a")).await;
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::error::{LedgerError, Result};
use crate::models::{InvestmentEntry, Portfolio, ProjectSnapshot};
use crate::portfolio::ValuationSource;
use crate::VentureLedger;

// ---------------------------------------------------------------------------
// AsyncVentureLedgerBuilder
// ---------------------------------------------------------------------------

/// Builder for an [`AsyncVentureLedger`]; mirrors [`crate::VentureLedgerBuilder`].
#[derive(Default)]
pub struct AsyncVentureLedgerBuilder {
    db_path: Option<PathBuf>,
    in_memory: bool,
    store_timeout: Option<Duration>,
    clock: Option<Arc<dyn Clock>>,
    valuation: Option<Arc<dyn ValuationSource>>,
}

impl AsyncVentureLedgerBuilder {
    pub fn db_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.db_path = Some(path.as_ref().to_path_buf());
        self.in_memory = false;
        self
    }

    pub fn in_memory(mut self) -> Self {
        self.in_memory = true;
        self.db_path = None;
        self
    }

    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn valuation_source(mut self, source: Arc<dyn ValuationSource>) -> Self {
        self.valuation = Some(source);
        self
    }

    /// Build the ledger on the blocking thread pool.
    pub async fn build(self) -> Result<AsyncVentureLedger> {
        tokio::task::spawn_blocking(move || {
            let mut builder = VentureLedger::builder();
            if self.in_memory {
                builder = builder.in_memory();
            } else if let Some(path) = self.db_path {
                builder = builder.db_path(path);
            }
            if let Some(timeout) = self.store_timeout {
                builder = builder.store_timeout(timeout);
            }
            if let Some(clock) = self.clock {
                builder = builder.clock(clock);
            }
            if let Some(source) = self.valuation {
                builder = builder.valuation_source(source);
            }
            Ok(AsyncVentureLedger {
                inner: Arc::new(builder.build()?),
            })
        })
        .await
        .map_err(|e| LedgerError::InvalidArgument(format!("Task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// AsyncVentureLedger
// ---------------------------------------------------------------------------

/// Async wrapper around [`VentureLedger`].
///
/// The ledger is already thread-safe, so it is shared behind an [`Arc`]
/// without an extra lock; concurrent calls serialize only where the ledger
/// itself does (per project, on writes).
#[derive(Clone)]
pub struct AsyncVentureLedger {
    inner: Arc<VentureLedger>,
}

impl AsyncVentureLedger {
    pub fn builder() -> AsyncVentureLedgerBuilder {
        AsyncVentureLedgerBuilder::default()
    }

    /// Wrap an already-built ledger.
    pub fn from_ledger(ledger: VentureLedger) -> Self {
        Self {
            inner: Arc::new(ledger),
        }
    }

    /// Run a sync ledger operation on the blocking thread pool.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&VentureLedger) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let ledger = self.inner.clone();
        tokio::task::spawn_blocking(move || f(&ledger))
            .await
            .map_err(|e| LedgerError::InvalidArgument(format!("Task join error: {e}")))?
    }

    /// Asynchronous [`InvestmentLedger::record_investment`](crate::InvestmentLedger::record_investment).
    pub async fn record_investment(
        &self,
        project_id: &str,
        investor_id: &str,
        amount: i64,
    ) -> Result<InvestmentEntry> {
        let project_id = project_id.to_string();
        let investor_id = investor_id.to_string();
        self.run(move |l| l.ledger().record_investment(&project_id, &investor_id, amount))
            .await
    }

    pub async fn get_project(&self, project_id: &str) -> Result<ProjectSnapshot> {
        let project_id = project_id.to_string();
        self.run(move |l| l.projects().get_project(&project_id)).await
    }

    pub async fn portfolio(&self, investor_id: &str) -> Result<Portfolio> {
        let investor_id = investor_id.to_string();
        self.run(move |l| l.portfolio().build_for_investor(&investor_id))
            .await
    }
}
