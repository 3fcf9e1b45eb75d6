//! The investment ledger: the only writer of ledger entries.
//!
//! A write runs under the project's lock and inside one store transaction,
//! so the capacity check and the append it guards are atomic. Any failure
//! rolls the transaction back and leaves no partial entry.

pub mod locks;

pub use locks::ProjectLocks;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::aggregation;
use crate::clock::{truncate_to_millis, Clock};
use crate::config::INVESTMENTS_TABLE;
use crate::connection::{insert_model, Connection};
use crate::error::{LedgerError, Result};
use crate::models::{new_id, EntryKind, InvestmentEntry, Project, ProjectStatus};
use crate::queries::projects::{fetch_entries, require_project, set_status};

/// Records investments and reversals against funding projects.
pub struct InvestmentLedger<'a> {
    conn: &'a Connection,
    locks: &'a ProjectLocks,
    clock: &'a dyn Clock,
}

impl<'a> InvestmentLedger<'a> {
    pub fn new(conn: &'a Connection, locks: &'a ProjectLocks, clock: &'a dyn Clock) -> Self {
        Self { conn, locks, clock }
    }

    /// Commit `amount` from `investor_id` to a project.
    ///
    /// Checks run in this order: the project is open, the amount meets the
    /// minimum, the amount respects the maximum, the amount fits the
    /// remaining capacity. The first failing check is returned and nothing
    /// is written. A project whose goal is met by this entry becomes
    /// [`ProjectStatus::Funded`].
    pub fn record_investment(
        &self,
        project_id: &str,
        investor_id: &str,
        amount: i64,
    ) -> Result<InvestmentEntry> {
        if amount <= 0 {
            return Err(LedgerError::InvalidArgument(format!(
                "investment amount must be positive, got {}",
                amount
            )));
        }
        if investor_id.trim().is_empty() {
            return Err(LedgerError::InvalidArgument(
                "investor id must not be blank".into(),
            ));
        }

        let now = truncate_to_millis(self.clock.now());
        let result = self.locks.with_project(project_id, self.conn.timeout(), || {
            self.conn.run_transaction(|tx| {
                let project = require_project(tx, project_id)?;
                ensure_open(&project, now)?;

                if let Some(minimum) = project.minimum_investment {
                    if amount < minimum {
                        return Err(LedgerError::BelowMinimum { amount, minimum });
                    }
                }
                if let Some(maximum) = project.maximum_investment {
                    if amount > maximum {
                        return Err(LedgerError::AboveMaximum { amount, maximum });
                    }
                }

                let entries = fetch_entries(tx, project_id)?;
                let remaining = aggregation::remaining_capacity(&entries, project.funding_goal);
                if amount > remaining {
                    return Err(LedgerError::InsufficientCapacity { amount, remaining });
                }

                let entry = InvestmentEntry {
                    id: new_id("inv"),
                    project_id: project.id.clone(),
                    investor_id: investor_id.to_string(),
                    amount,
                    equity_percentage: project.equity_for(amount),
                    timestamp: now,
                    kind: EntryKind::Investment,
                    reverses: None,
                };
                insert_model(tx, INVESTMENTS_TABLE, &entry)?;

                if amount == remaining {
                    set_status(tx, project_id, ProjectStatus::Funded)?;
                }
                Ok(entry)
            })
        });

        match result {
            Ok(entry) => {
                info!(
                    project_id = %entry.project_id,
                    investor_id = %entry.investor_id,
                    entry_id = %entry.id,
                    amount = entry.amount,
                    equity_percentage = entry.equity_percentage,
                    "investment recorded"
                );
                Ok(entry)
            }
            Err(e) => {
                debug!(project_id, investor_id, amount, code = e.code(), "investment rejected: {}", e);
                Err(e)
            }
        }
    }

    /// Append a reversal of a prior investment entry.
    ///
    /// The original entry stays untouched; the reversal carries its negated
    /// amount and equity. A funded project that drops below its goal
    /// returns to [`ProjectStatus::Active`].
    pub fn reverse_investment(&self, project_id: &str, entry_id: &str) -> Result<InvestmentEntry> {
        let now = truncate_to_millis(self.clock.now());
        let reversal = self.locks.with_project(project_id, self.conn.timeout(), || {
            self.conn.run_transaction(|tx| {
                let project = require_project(tx, project_id)?;
                if project.status == ProjectStatus::Closed {
                    return Err(LedgerError::ProjectClosed(format!(
                        "project {} is closed",
                        project_id
                    )));
                }

                let entries = fetch_entries(tx, project_id)?;
                let original = entries
                    .iter()
                    .find(|e| e.id == entry_id)
                    .ok_or_else(|| {
                        LedgerError::NotFound(format!(
                            "investment entry {} on project {}",
                            entry_id, project_id
                        ))
                    })?;
                if original.is_reversal() {
                    return Err(LedgerError::InvalidArgument(format!(
                        "entry {} is a reversal and cannot be reversed",
                        entry_id
                    )));
                }
                if entries.iter().any(|e| e.reverses.as_deref() == Some(entry_id)) {
                    return Err(LedgerError::InvalidArgument(format!(
                        "entry {} has already been reversed",
                        entry_id
                    )));
                }

                let reversal = InvestmentEntry {
                    id: new_id("rev"),
                    project_id: project.id.clone(),
                    investor_id: original.investor_id.clone(),
                    amount: -original.amount,
                    equity_percentage: -original.equity_percentage,
                    timestamp: now,
                    kind: EntryKind::Reversal,
                    reverses: Some(original.id.clone()),
                };
                insert_model(tx, INVESTMENTS_TABLE, &reversal)?;

                let funding_after = aggregation::current_funding(&entries).saturating_add(reversal.amount);
                if project.status == ProjectStatus::Funded && funding_after < project.funding_goal {
                    set_status(tx, project_id, ProjectStatus::Active)?;
                }
                Ok(reversal)
            })
        })?;

        info!(
            project_id = %reversal.project_id,
            investor_id = %reversal.investor_id,
            entry_id = %reversal.id,
            reverses = ?reversal.reverses,
            amount = reversal.amount,
            "investment reversed"
        );
        Ok(reversal)
    }
}

fn ensure_open(project: &Project, now: DateTime<Utc>) -> Result<()> {
    if project.is_open_at(now) {
        return Ok(());
    }
    let reason = if project.status != ProjectStatus::Active {
        format!("is {}", project.status)
    } else {
        format!("passed its deadline {}", project.deadline)
    };
    Err(LedgerError::ProjectClosed(format!("project {} {}", project.id, reason)))
}
