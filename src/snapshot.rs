//! Gzipped NDJSON export and restore of the whole ledger.
//!
//! An export writes `projects.ndjson.gz` and `investments.ndjson.gz`. Each
//! file is written to a temp file in the target directory and renamed on
//! success, so an interrupted export never leaves a partial file behind.
//! A restore parses both files completely before touching the store and
//! loads them in one transaction.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use crate::config::{
    EQUITY_EPSILON, INVESTMENTS_SNAPSHOT, INVESTMENTS_TABLE, PROJECTS_SNAPSHOT, PROJECTS_TABLE,
};
use crate::connection::{insert_model, query_rows, rows_into, Connection};
use crate::error::{LedgerError, Result};
use crate::models::{EntryKind, InvestmentEntry, Project};
use crate::queries::projects::check_stored_terms;

/// Counts from an export or restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub directory: PathBuf,
    pub projects: usize,
    pub entries: usize,
}

/// Exports and restores ledger snapshots.
pub struct SnapshotManager<'a> {
    conn: &'a Connection,
}

impl<'a> SnapshotManager<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Write every project and ledger entry under `dir`.
    pub fn export<P: AsRef<Path>>(&self, dir: P) -> Result<SnapshotSummary> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let (projects, entries) = self.conn.with_connection(|conn| {
            let projects: Vec<Project> = rows_into(query_rows(
                conn,
                &format!("SELECT * FROM {} ORDER BY \"createdAt\", \"id\"", PROJECTS_TABLE),
                &[],
            )?)?;
            let entries: Vec<InvestmentEntry> = rows_into(query_rows(
                conn,
                &format!("SELECT * FROM {} ORDER BY \"timestamp\", \"id\"", INVESTMENTS_TABLE),
                &[],
            )?)?;
            Ok((projects, entries))
        })?;

        write_ndjson_gz(&dir.join(PROJECTS_SNAPSHOT), &projects)?;
        write_ndjson_gz(&dir.join(INVESTMENTS_SNAPSHOT), &entries)?;

        info!(
            directory = %dir.display(),
            projects = projects.len(),
            entries = entries.len(),
            "ledger snapshot exported"
        );
        Ok(SnapshotSummary {
            directory: dir.to_path_buf(),
            projects: projects.len(),
            entries: entries.len(),
        })
    }

    /// Load a snapshot from `dir` into an empty store.
    ///
    /// The snapshot must satisfy the same rules the ledger enforces on
    /// writes: valid terms, linked reversals, equity per amount and funding
    /// within the goal. Fails with
    /// [`LedgerError::InvalidArgument`] when it does not, or when the store
    /// already holds projects. Nothing is committed on failure.
    pub fn restore<P: AsRef<Path>>(&self, dir: P) -> Result<SnapshotSummary> {
        let dir = dir.as_ref();
        let projects: Vec<Project> = read_ndjson_gz(&dir.join(PROJECTS_SNAPSHOT))?;
        let entries: Vec<InvestmentEntry> = read_ndjson_gz(&dir.join(INVESTMENTS_SNAPSHOT))?;

        check_snapshot(&projects, &entries)?;

        self.conn.run_transaction(|tx| {
            let existing = query_rows(
                tx,
                &format!("SELECT COUNT(*) AS n FROM {}", PROJECTS_TABLE),
                &[],
            )?;
            let count = existing
                .first()
                .and_then(|r| r.get("n"))
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            if count > 0 {
                return Err(LedgerError::InvalidArgument(format!(
                    "cannot restore into a store holding {} projects",
                    count
                )));
            }
            for project in &projects {
                insert_model(tx, PROJECTS_TABLE, project)?;
            }
            for entry in &entries {
                insert_model(tx, INVESTMENTS_TABLE, entry)?;
            }
            Ok(())
        })?;

        info!(
            directory = %dir.display(),
            projects = projects.len(),
            entries = entries.len(),
            "ledger snapshot restored"
        );
        Ok(SnapshotSummary {
            directory: dir.to_path_buf(),
            projects: projects.len(),
            entries: entries.len(),
        })
    }
}

/// Check a parsed snapshot against the ledger's write rules:
///
/// - project terms are valid (the deadline may have passed) and ids are unique;
/// - every entry references a project in the snapshot and has a unique id;
/// - investments are positive and carry `equity_for(amount)`;
/// - each reversal negates an earlier investment by the same investor on the
///   same project, and no investment is reversed twice;
/// - replayed in ledger order, no project's funding ever exceeds its goal.
fn check_snapshot(projects: &[Project], entries: &[InvestmentEntry]) -> Result<()> {
    let mut by_id: HashMap<&str, &Project> = HashMap::with_capacity(projects.len());
    for project in projects {
        check_stored_terms(project).map_err(|e| {
            LedgerError::InvalidArgument(format!("snapshot project {}: {}", project.id, e))
        })?;
        if by_id.insert(project.id.as_str(), project).is_some() {
            return Err(LedgerError::InvalidArgument(format!(
                "snapshot repeats project {}",
                project.id
            )));
        }
    }

    let mut entry_ids: HashSet<&str> = HashSet::with_capacity(entries.len());
    let mut investments: HashMap<&str, &InvestmentEntry> = HashMap::new();
    for entry in entries {
        if !entry_ids.insert(entry.id.as_str()) {
            return Err(LedgerError::InvalidArgument(format!(
                "snapshot repeats entry {}",
                entry.id
            )));
        }
        let Some(project) = by_id.get(entry.project_id.as_str()) else {
            return Err(LedgerError::InvalidArgument(format!(
                "snapshot entry {} references unknown project {}",
                entry.id, entry.project_id
            )));
        };
        if entry.kind != EntryKind::Investment {
            continue;
        }
        if entry.amount <= 0 || entry.reverses.is_some() {
            return Err(LedgerError::InvalidArgument(format!(
                "snapshot investment {} is malformed",
                entry.id
            )));
        }
        let expected = project.equity_for(entry.amount);
        if (entry.equity_percentage - expected).abs() > EQUITY_EPSILON {
            return Err(LedgerError::InvalidArgument(format!(
                "snapshot investment {} carries equity {} instead of {}",
                entry.id, entry.equity_percentage, expected
            )));
        }
        investments.insert(entry.id.as_str(), entry);
    }

    let mut reversed: HashSet<&str> = HashSet::new();
    for entry in entries.iter().filter(|e| e.is_reversal()) {
        let original = entry
            .reverses
            .as_deref()
            .and_then(|id| investments.get(id))
            .ok_or_else(|| {
                LedgerError::InvalidArgument(format!(
                    "snapshot reversal {} does not name an investment",
                    entry.id
                ))
            })?;
        let matches = original.project_id == entry.project_id
            && original.investor_id == entry.investor_id
            && entry.amount == -original.amount
            && (entry.equity_percentage + original.equity_percentage).abs() <= EQUITY_EPSILON
            && entry.timestamp >= original.timestamp;
        if !matches {
            return Err(LedgerError::InvalidArgument(format!(
                "snapshot reversal {} does not negate entry {}",
                entry.id, original.id
            )));
        }
        if !reversed.insert(original.id.as_str()) {
            return Err(LedgerError::InvalidArgument(format!(
                "snapshot reverses entry {} more than once",
                original.id
            )));
        }
    }

    // Within one millisecond reversals replay first, so freed capacity is
    // available to investments recorded in the same instant
    let mut ordered: Vec<&InvestmentEntry> = entries.iter().collect();
    ordered.sort_by(|a, b| {
        (a.timestamp, !a.is_reversal(), &a.id).cmp(&(b.timestamp, !b.is_reversal(), &b.id))
    });
    let mut funding: HashMap<&str, i64> = HashMap::new();
    for entry in ordered {
        let Some(project) = by_id.get(entry.project_id.as_str()) else {
            continue;
        };
        let total = funding.entry(entry.project_id.as_str()).or_insert(0);
        *total = total
            .checked_add(entry.amount)
            .filter(|t| *t <= project.funding_goal)
            .ok_or_else(|| {
                LedgerError::InvalidArgument(format!(
                    "snapshot funding of project {} exceeds its goal {}",
                    project.id, project.funding_goal
                ))
            })?;
    }
    Ok(())
}

fn write_ndjson_gz<T: Serialize>(dest: &Path, rows: &[T]) -> Result<()> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let tmp = NamedTempFile::new_in(parent)?;
    {
        let mut encoder = GzEncoder::new(BufWriter::new(tmp.as_file()), Compression::default());
        for row in rows {
            serde_json::to_writer(&mut encoder, row)?;
            encoder.write_all(b"\n")?;
        }
        encoder.finish()?.flush()?;
    }
    // A dropped NamedTempFile deletes itself, so failures above leave nothing behind
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

fn read_ndjson_gz<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)?;
    let reader = BufReader::new(GzDecoder::new(BufReader::new(file)));
    let mut rows = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        rows.push(serde_json::from_str(&line)?);
    }
    Ok(rows)
}
