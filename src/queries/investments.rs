//! Read-side access to ledger entries.
//!
//! Reads take no project lock. Each call sees the ledger as of the moment it
//! acquires the store, so an entry appended concurrently may or may not be
//! included.

use crate::config::INVESTMENTS_TABLE;
use crate::connection::Connection;
use crate::error::{LedgerError, Result};
use crate::models::InvestmentEntry;
use crate::sql_builder::SqlBuilder;

/// Query interface over the `investments` table.
pub struct InvestmentQuery<'a> {
    conn: &'a Connection,
}

impl<'a> InvestmentQuery<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// All entries of a project in ledger order.
    pub fn for_project(&self, project_id: &str) -> Result<Vec<InvestmentEntry>> {
        self.conn.query_documents(
            SqlBuilder::new(INVESTMENTS_TABLE)
                .where_eq("projectId", project_id)
                .order_by(&["timestamp ASC", "id ASC"]),
        )
    }

    /// All entries of an investor across projects in ledger order.
    pub fn for_investor(&self, investor_id: &str) -> Result<Vec<InvestmentEntry>> {
        self.conn.query_documents(
            SqlBuilder::new(INVESTMENTS_TABLE)
                .where_eq("investorId", investor_id)
                .order_by(&["timestamp ASC", "id ASC"]),
        )
    }

    /// A single entry by id.
    pub fn get_entry(&self, entry_id: &str) -> Result<InvestmentEntry> {
        match self.conn.get_document(INVESTMENTS_TABLE, entry_id)? {
            Some(doc) => Ok(serde_json::from_value(doc)?),
            None => Err(LedgerError::NotFound(format!("investment entry {}", entry_id))),
        }
    }

    /// Distinct project ids the investor has ledger entries on, sorted.
    pub fn projects_for_investor(&self, investor_id: &str) -> Result<Vec<String>> {
        let (sql, params) = SqlBuilder::new(INVESTMENTS_TABLE)
            .select(&["projectId"])
            .distinct()
            .where_eq("investorId", investor_id)
            .order_by(&["projectId ASC"])
            .build();
        let rows = self.conn.execute(&sql, &params)?;
        Ok(rows
            .into_iter()
            .filter_map(|r| {
                r.get("projectId")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
            })
            .collect())
    }
}
