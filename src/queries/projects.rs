//! Project record store: funding-round terms and their derived snapshots.

use std::collections::HashMap;

use duckdb::{Connection as DuckDbConnection, ToSql};
use tracing::{info, warn};

use crate::aggregation;
use crate::clock::{truncate_to_millis, Clock};
use crate::config::{EQUITY_DRIFT_TOLERANCE, INVESTMENTS_TABLE, PROJECTS_TABLE};
use crate::connection::{insert_model, query_rows, rows_into, Connection};
use crate::error::{LedgerError, Result};
use crate::models::{new_id, InvestmentEntry, Project, ProjectSnapshot, ProjectStatus, ProjectTerms};
use crate::sql_builder::SqlBuilder;

// ---------------------------------------------------------------------------
// ListProjectsParams
// ---------------------------------------------------------------------------

/// Filters for the project listing.
///
/// All fields are optional. When `None`, the corresponding filter is skipped.
#[derive(Debug, Clone, Default)]
pub struct ListProjectsParams {
    pub status: Option<ProjectStatus>,
    pub owner_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// ---------------------------------------------------------------------------
// ProjectStore
// ---------------------------------------------------------------------------

/// Creates and reads funding projects.
pub struct ProjectStore<'a> {
    conn: &'a Connection,
    clock: &'a dyn Clock,
}

impl<'a> ProjectStore<'a> {
    pub fn new(conn: &'a Connection, clock: &'a dyn Clock) -> Self {
        Self { conn, clock }
    }

    /// Validate `terms` and persist a new active project.
    ///
    /// Fails with [`LedgerError::InvalidTerms`] when any term is out of range
    /// or the id is already taken.
    pub fn create_project(&self, terms: ProjectTerms) -> Result<Project> {
        let now = self.clock.now();
        validate_terms(&terms, now)?;

        let project = Project {
            id: terms.id.unwrap_or_else(|| new_id("prj")),
            owner_id: terms.owner_id,
            title: terms.title,
            description: terms.description,
            funding_goal: terms.funding_goal,
            minimum_investment: terms.minimum_investment,
            maximum_investment: terms.maximum_investment,
            equity_offered: terms.equity_offered,
            valuation: terms.valuation,
            deadline: truncate_to_millis(terms.deadline),
            status: ProjectStatus::Active,
            created_at: truncate_to_millis(now),
        };

        self.conn.run_transaction(|tx| {
            if fetch_project(tx, &project.id)?.is_some() {
                return Err(LedgerError::InvalidTerms(format!(
                    "project {} already exists",
                    project.id
                )));
            }
            insert_model(tx, PROJECTS_TABLE, &project)
        })?;

        info!(
            project_id = %project.id,
            owner_id = %project.owner_id,
            funding_goal = project.funding_goal,
            equity_offered = project.equity_offered,
            "project created"
        );
        Ok(project)
    }

    /// Current snapshot of a project with totals recomputed from its ledger.
    pub fn get_project(&self, id: &str) -> Result<ProjectSnapshot> {
        self.conn.with_connection(|conn| {
            let project = require_project(conn, id)?;
            let entries = fetch_entries(conn, id)?;
            aggregation::snapshot(project, &entries)
        })
    }

    /// The stored terms of a project, without aggregation.
    pub fn get_terms(&self, id: &str) -> Result<Project> {
        self.conn.with_connection(|conn| require_project(conn, id))
    }

    /// List projects (oldest first) with their derived totals.
    pub fn list_projects(&self, params: &ListProjectsParams) -> Result<Vec<ProjectSnapshot>> {
        let mut qb = SqlBuilder::new(PROJECTS_TABLE);
        if let Some(status) = params.status {
            qb.where_eq("status", status.as_str());
        }
        if let Some(ref owner) = params.owner_id {
            qb.where_eq("ownerId", owner);
        }
        qb.order_by(&["createdAt ASC", "id ASC"]);
        if let Some(n) = params.limit {
            qb.limit(n);
        }
        if let Some(n) = params.offset {
            qb.offset(n);
        }
        let (sql, sql_params) = qb.build();

        self.conn.with_connection(|conn| {
            let param_values: Vec<&dyn ToSql> =
                sql_params.iter().map(|p| p as &dyn ToSql).collect();
            let projects: Vec<Project> = rows_into(query_rows(conn, &sql, &param_values)?)?;

            let ids: Vec<&str> = projects.iter().map(|p| p.id.as_str()).collect();
            let mut by_project = group_by_project(fetch_entries_for(conn, &ids)?);

            projects
                .into_iter()
                .map(|p| {
                    let entries = by_project.remove(&p.id).unwrap_or_default();
                    aggregation::snapshot(p, &entries)
                })
                .collect()
        })
    }

    /// Close a round to new investment. Closing a closed project is a no-op.
    pub fn close_project(&self, id: &str) -> Result<Project> {
        let project = self.conn.run_transaction(|tx| {
            let mut project = require_project(tx, id)?;
            if project.status != ProjectStatus::Closed {
                set_status(tx, id, ProjectStatus::Closed)?;
                project.status = ProjectStatus::Closed;
            }
            Ok(project)
        })?;
        info!(project_id = %id, "project closed");
        Ok(project)
    }
}

fn validate_terms(terms: &ProjectTerms, now: chrono::DateTime<chrono::Utc>) -> Result<()> {
    if terms.deadline <= now {
        return Err(LedgerError::InvalidTerms(format!(
            "deadline {} is not in the future",
            terms.deadline
        )));
    }
    check_terms(terms)
}

/// Re-check the stored terms of a project, ignoring the deadline.
pub(crate) fn check_stored_terms(project: &Project) -> Result<()> {
    check_terms(&ProjectTerms {
        id: Some(project.id.clone()),
        owner_id: project.owner_id.clone(),
        title: project.title.clone(),
        description: project.description.clone(),
        funding_goal: project.funding_goal,
        minimum_investment: project.minimum_investment,
        maximum_investment: project.maximum_investment,
        equity_offered: project.equity_offered,
        valuation: project.valuation,
        deadline: project.deadline,
    })
}

/// Every rule on the terms except the future deadline.
fn check_terms(terms: &ProjectTerms) -> Result<()> {
    let invalid = |msg: String| Err(LedgerError::InvalidTerms(msg));

    if let Some(ref id) = terms.id {
        if id.trim().is_empty() {
            return invalid("project id must not be blank".into());
        }
    }
    if terms.owner_id.trim().is_empty() {
        return invalid("owner id must not be blank".into());
    }
    if terms.title.trim().is_empty() {
        return invalid("title must not be blank".into());
    }
    if terms.funding_goal <= 0 {
        return invalid(format!("funding goal must be positive, got {}", terms.funding_goal));
    }
    if !(terms.equity_offered.is_finite() && terms.equity_offered > 0.0 && terms.equity_offered <= 100.0) {
        return invalid(format!(
            "equity offered must be in (0, 100], got {}",
            terms.equity_offered
        ));
    }
    if let Some(min) = terms.minimum_investment {
        if min <= 0 {
            return invalid(format!("minimum investment must be positive, got {}", min));
        }
        if min > terms.funding_goal {
            return invalid(format!(
                "minimum investment {} exceeds funding goal {}",
                min, terms.funding_goal
            ));
        }
    }
    if let Some(max) = terms.maximum_investment {
        if max <= 0 {
            return invalid(format!("maximum investment must be positive, got {}", max));
        }
    }
    if let (Some(min), Some(max)) = (terms.minimum_investment, terms.maximum_investment) {
        if min > max {
            return invalid(format!(
                "minimum investment {} exceeds maximum investment {}",
                min, max
            ));
        }
    }
    if let Some(valuation) = terms.valuation {
        if valuation <= 0 {
            return invalid(format!("valuation must be positive, got {}", valuation));
        }
        if valuation < terms.funding_goal {
            return invalid(format!(
                "valuation {} is below the funding goal {}",
                valuation, terms.funding_goal
            ));
        }
        let implied = terms.funding_goal as f64 / valuation as f64 * 100.0;
        if (implied - terms.equity_offered).abs() > EQUITY_DRIFT_TOLERANCE {
            warn!(
                title = %terms.title,
                implied_equity = implied,
                equity_offered = terms.equity_offered,
                "equity offered does not match the goal/valuation ratio"
            );
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Raw-connection helpers (also used inside ledger transactions)
// ---------------------------------------------------------------------------

pub(crate) fn fetch_project(conn: &DuckDbConnection, id: &str) -> Result<Option<Project>> {
    let sql = format!("SELECT * FROM {} WHERE \"id\" = ?", PROJECTS_TABLE);
    let mut projects: Vec<Project> = rows_into(query_rows(conn, &sql, &[&id as &dyn ToSql])?)?;
    Ok(projects.pop())
}

pub(crate) fn require_project(conn: &DuckDbConnection, id: &str) -> Result<Project> {
    fetch_project(conn, id)?
        .ok_or_else(|| LedgerError::NotFound(format!("project {}", id)))
}

pub(crate) fn fetch_entries(conn: &DuckDbConnection, project_id: &str) -> Result<Vec<InvestmentEntry>> {
    fetch_entries_for(conn, &[project_id])
}

/// Entries for several projects, in ledger order.
pub(crate) fn fetch_entries_for(
    conn: &DuckDbConnection,
    project_ids: &[&str],
) -> Result<Vec<InvestmentEntry>> {
    if project_ids.is_empty() {
        return Ok(Vec::new());
    }
    let (sql, params) = SqlBuilder::new(INVESTMENTS_TABLE)
        .where_in("projectId", project_ids)
        .order_by(&["timestamp ASC", "id ASC"])
        .build();
    let param_values: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
    rows_into(query_rows(conn, &sql, &param_values)?)
}

pub(crate) fn set_status(conn: &DuckDbConnection, id: &str, status: ProjectStatus) -> Result<()> {
    let sql = format!("UPDATE {} SET \"status\" = ? WHERE \"id\" = ?", PROJECTS_TABLE);
    conn.execute(&sql, duckdb::params![status.as_str(), id])?;
    Ok(())
}

pub(crate) fn group_by_project(
    entries: Vec<InvestmentEntry>,
) -> HashMap<String, Vec<InvestmentEntry>> {
    let mut grouped: HashMap<String, Vec<InvestmentEntry>> = HashMap::new();
    for entry in entries {
        grouped.entry(entry.project_id.clone()).or_default().push(entry);
    }
    grouped
}
