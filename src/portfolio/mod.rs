//! Investor-centric roll-up across projects.

pub mod valuation;

pub use valuation::{FixedGrowth, HttpValuationFeed, TermsValuation, ValuationSource};

use valuation::to_minor_units;

use std::collections::HashSet;

use duckdb::ToSql;
use tracing::{debug, warn};

use crate::aggregation;
use crate::clock::Clock;
use crate::config::INVESTMENTS_TABLE;
use crate::connection::{query_rows, rows_into, Connection};
use crate::error::{LedgerError, Result};
use crate::models::{Holding, InvestmentEntry, Portfolio, Project, ProjectStatus};
use crate::queries::investments::InvestmentQuery;
use crate::queries::projects::{fetch_project, group_by_project};
use crate::sql_builder::SqlBuilder;

/// Builds [`Portfolio`] views for investors.
pub struct PortfolioView<'a> {
    conn: &'a Connection,
    clock: &'a dyn Clock,
    valuation: &'a dyn ValuationSource,
}

impl<'a> PortfolioView<'a> {
    pub fn new(conn: &'a Connection, clock: &'a dyn Clock, valuation: &'a dyn ValuationSource) -> Self {
        Self {
            conn,
            clock,
            valuation,
        }
    }

    /// Roll up `investor_id`'s positions on the referenced projects.
    ///
    /// A reference to a project that no longer exists is logged and listed
    /// in `skipped_projects`; the rest of the roll-up proceeds.
    pub fn build_portfolio(&self, investor_id: &str, project_ids: &[&str]) -> Result<Portfolio> {
        let mut seen = HashSet::new();
        let unique_ids: Vec<&str> = project_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        let (projects, mut entries_by_project, skipped) = self.conn.with_connection(|conn| {
            let mut projects: Vec<Project> = Vec::new();
            let mut skipped: Vec<String> = Vec::new();
            for id in &unique_ids {
                match fetch_project(conn, id)? {
                    Some(project) => projects.push(project),
                    None => {
                        warn!(investor_id, project_id = %id, "skipping orphaned project reference");
                        skipped.push(id.to_string());
                    }
                }
            }

            let found: Vec<&str> = projects.iter().map(|p| p.id.as_str()).collect();
            let entries = if found.is_empty() {
                Vec::new()
            } else {
                let (sql, params) = SqlBuilder::new(INVESTMENTS_TABLE)
                    .where_eq("investorId", investor_id)
                    .where_in("projectId", &found)
                    .order_by(&["timestamp ASC", "id ASC"])
                    .build();
                let param_values: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
                rows_into::<InvestmentEntry>(query_rows(conn, &sql, &param_values)?)?
            };
            Ok((projects, group_by_project(entries), skipped))
        })?;

        // Valuation sources may do I/O, so they run after the store is released.
        let now = self.clock.now();
        let mut holdings: Vec<Holding> = Vec::new();
        for project in projects {
            let Some(entries) = entries_by_project.remove(&project.id) else {
                continue;
            };
            let invested = aggregation::current_funding(&entries);
            let equity = aggregation::total_equity(&entries);
            let estimated_value = if invested <= 0 {
                0
            } else {
                match self.valuation.valuation(&project, now)? {
                    Some(company_value) => to_minor_units(
                        equity / 100.0 * company_value as f64,
                        "estimated holding value",
                    )?,
                    None => invested,
                }
            };
            holdings.push(Holding {
                project_id: project.id,
                title: project.title,
                status: project.status,
                invested,
                equity_percentage: equity,
                estimated_value,
                entry_count: entries.len(),
            });
        }

        let total_invested = checked_total(holdings.iter().map(|h| h.invested), "total invested")?;
        let total_equity: f64 = holdings.iter().map(|h| h.equity_percentage).sum();
        let estimated_value =
            checked_total(holdings.iter().map(|h| h.estimated_value), "estimated value")?;
        let estimated_return = estimated_value
            .checked_sub(total_invested)
            .ok_or_else(|| LedgerError::Overflow("estimated return exceeds the i64 range".into()))?;
        let roi_percentage = if total_invested > 0 {
            estimated_return as f64 / total_invested as f64 * 100.0
        } else {
            0.0
        };
        let active_project_count = holdings
            .iter()
            .filter(|h| {
                h.invested > 0 && matches!(h.status, ProjectStatus::Active | ProjectStatus::Funded)
            })
            .count();

        debug!(
            investor_id,
            holdings = holdings.len(),
            skipped = skipped.len(),
            total_invested,
            "portfolio built"
        );

        Ok(Portfolio {
            investor_id: investor_id.to_string(),
            total_invested,
            total_equity,
            estimated_value,
            estimated_return,
            roi_percentage,
            active_project_count,
            holdings,
            skipped_projects: skipped,
            valuation_basis: self.valuation.label().to_string(),
            is_estimate: true,
        })
    }

    /// Roll up every project the investor has ledger entries on.
    pub fn build_for_investor(&self, investor_id: &str) -> Result<Portfolio> {
        let project_ids = InvestmentQuery::new(self.conn).projects_for_investor(investor_id)?;
        let refs: Vec<&str> = project_ids.iter().map(|s| s.as_str()).collect();
        self.build_portfolio(investor_id, &refs)
    }
}

fn checked_total(mut values: impl Iterator<Item = i64>, what: &str) -> Result<i64> {
    values
        .try_fold(0i64, |acc, v| acc.checked_add(v))
        .ok_or_else(|| LedgerError::Overflow(format!("{} exceeds the i64 range", what)))
}
