//! Embeddable investment ledger.
//!
//! Records capital commitments against funding projects and derives
//! consistent views from them: funding percentage, equity shares, investor
//! counts and investor portfolios. Data lives in an embedded DuckDB store;
//! every derived figure is recomputed from the append-only ledger on read.
//!
//! # Quick start
//!
//! ```no_run
//! use chrono::{Duration, Utc};
//! use venture_ledger::models::ProjectTerms;
//! use venture_ledger::VentureLedger;
//!
//! let ledger = VentureLedger::builder().in_memory().build().unwrap();
//!
//! let terms = ProjectTerms::new("founder-1", "Solar Co-op", 100_000, 10.0, Utc::now() + Duration::days(30))
//!     .with_minimum(5_000);
//! let project = ledger.projects().create_project(terms).unwrap();
//!
//! let entry = ledger.ledger().record_investment(&project.id, "investor-a", 20_000).unwrap();
//! assert_eq!(entry.equity_percentage, 2.0);
//!
//! let snapshot = ledger.projects().get_project(&project.id).unwrap();
//! assert_eq!(snapshot.funding_percentage, 20.0);
//! ```

pub mod aggregation;
#[cfg(feature = "async")]
pub mod async_client;
pub mod clock;
pub mod config;
pub mod connection;
pub mod error;
pub mod ledger;
pub mod models;
pub mod portfolio;
pub mod queries;
pub mod snapshot;
pub mod sql_builder;

#[cfg(feature = "async")]
pub use async_client::AsyncVentureLedger;
pub use clock::{Clock, ManualClock, SystemClock};
pub use connection::Connection;
pub use error::{LedgerError, Result};
pub use ledger::{InvestmentLedger, ProjectLocks};
pub use portfolio::{FixedGrowth, HttpValuationFeed, PortfolioView, TermsValuation, ValuationSource};
pub use snapshot::{SnapshotManager, SnapshotSummary};
pub use sql_builder::SqlBuilder;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

// ---------------------------------------------------------------------------
// VentureLedgerBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`VentureLedger`].
///
/// Use [`VentureLedger::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](VentureLedgerBuilder::build).
pub struct VentureLedgerBuilder {
    db_path: Option<PathBuf>,
    in_memory: bool,
    store_timeout: Duration,
    clock: Arc<dyn Clock>,
    valuation: Arc<dyn ValuationSource>,
}

impl Default for VentureLedgerBuilder {
    fn default() -> Self {
        Self {
            db_path: None,
            in_memory: false,
            store_timeout: config::DEFAULT_STORE_TIMEOUT,
            clock: Arc::new(SystemClock),
            valuation: Arc::new(TermsValuation),
        }
    }
}

impl VentureLedgerBuilder {
    /// Store the ledger in this DuckDB file.
    ///
    /// If not set, `$VENTURE_LEDGER_DB` is used, falling back to
    /// `ledger.duckdb` under the platform data directory (e.g.
    /// `~/.local/share/venture-ledger` on Linux).
    pub fn db_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.db_path = Some(path.as_ref().to_path_buf());
        self.in_memory = false;
        self
    }

    /// Keep the ledger in memory only. Useful for tests and previews.
    pub fn in_memory(mut self) -> Self {
        self.in_memory = true;
        self.db_path = None;
        self
    }

    /// Upper bound on waits for the store or a project lock.
    ///
    /// Expiry surfaces as [`LedgerError::StoreUnavailable`]. Defaults to 5 seconds.
    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Time source for deadlines and entry timestamps. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Valuation source for portfolio estimates. Defaults to [`TermsValuation`].
    pub fn valuation_source(mut self, source: Arc<dyn ValuationSource>) -> Self {
        self.valuation = source;
        self
    }

    /// Open the store and create the schema if needed.
    pub fn build(self) -> Result<VentureLedger> {
        let conn = if self.in_memory {
            Connection::open_in_memory(self.store_timeout)?
        } else {
            let path = self.db_path.unwrap_or_else(config::default_db_path);
            Connection::open(path, self.store_timeout)?
        };
        info!(
            location = conn.location(),
            valuation_basis = self.valuation.label(),
            "venture ledger opened"
        );
        Ok(VentureLedger {
            conn,
            locks: ProjectLocks::new(),
            clock: self.clock,
            valuation: self.valuation,
        })
    }
}

// ---------------------------------------------------------------------------
// VentureLedger
// ---------------------------------------------------------------------------

/// The main entry point.
///
/// Owns the store connection, the per-project write locks and the injected
/// collaborators, and hands out lightweight borrowing wrappers for each
/// component. Safe to share across threads.
pub struct VentureLedger {
    conn: Connection,
    locks: ProjectLocks,
    clock: Arc<dyn Clock>,
    valuation: Arc<dyn ValuationSource>,
}

impl VentureLedger {
    pub fn builder() -> VentureLedgerBuilder {
        VentureLedgerBuilder::default()
    }

    // -- Component accessors -----------------------------------------------

    /// Project record store: create, read, list and close projects.
    pub fn projects(&self) -> queries::ProjectStore<'_> {
        queries::ProjectStore::new(&self.conn, self.clock.as_ref())
    }

    /// The investment ledger, the only writer of ledger entries.
    pub fn ledger(&self) -> InvestmentLedger<'_> {
        InvestmentLedger::new(&self.conn, &self.locks, self.clock.as_ref())
    }

    /// Read access to ledger entries.
    pub fn investments(&self) -> queries::InvestmentQuery<'_> {
        queries::InvestmentQuery::new(&self.conn)
    }

    /// Investor portfolio roll-ups using the configured valuation source.
    pub fn portfolio(&self) -> PortfolioView<'_> {
        PortfolioView::new(&self.conn, self.clock.as_ref(), self.valuation.as_ref())
    }

    /// Snapshot export and restore.
    pub fn snapshots(&self) -> SnapshotManager<'_> {
        SnapshotManager::new(&self.conn)
    }

    // -- Utility methods ---------------------------------------------------

    /// Execute a raw SQL query against the store.
    ///
    /// Escape hatch for reporting queries not covered by the components.
    pub fn sql(&self, query: &str, params: &[String]) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        self.conn.execute(query, params)
    }

    /// Return a reference to the underlying [`Connection`] for advanced usage.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// The per-project write locks currently held or awaited.
    pub fn locks(&self) -> &ProjectLocks {
        &self.locks
    }

    /// Consume the ledger and release the store.
    pub fn close(self) {
        drop(self);
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for VentureLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VentureLedger(store={}, timeout={:?}, valuation={})",
            self.conn.location(),
            self.conn.timeout(),
            self.valuation.label()
        )
    }
}
