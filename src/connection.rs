//! DuckDB-backed document store with bounded locking and transactions.
//!
//! Rows travel as `serde_json` objects keyed by column name, so models
//! round-trip through serde without per-table mapping code. The single
//! DuckDB connection sits behind a mutex; every acquisition is bounded by the
//! configured store timeout and surfaces [`LedgerError::StoreUnavailable`]
//! when it expires.

use crate::error::{LedgerError, Result};
use crate::sql_builder::SqlBuilder;
use duckdb::types::{Value as SqlValue, ValueRef};
use duckdb::{Connection as DuckDbConnection, ToSql, Transaction};
use parking_lot::{Mutex, MutexGuard};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// One result row, keyed by column name.
pub type Row = HashMap<String, Value>;

/// Wraps a DuckDB connection and exposes the store primitives the ledger
/// depends on: keyed get/put, filtered queries and a transactional
/// read-modify-write.
pub struct Connection {
    conn: Mutex<DuckDbConnection>,
    timeout: Duration,
    location: String,
}

impl Connection {
    /// Open an in-memory store. Contents vanish when the connection drops.
    pub fn open_in_memory(timeout: Duration) -> Result<Self> {
        let conn = DuckDbConnection::open_in_memory()?;
        Self::init(conn, timeout, ":memory:".to_string())
    }

    /// Open (or create) a file-backed store, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P, timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = DuckDbConnection::open(path)?;
        Self::init(conn, timeout, path.display().to_string())
    }

    fn init(conn: DuckDbConnection, timeout: Duration, location: String) -> Result<Self> {
        conn.execute_batch(&crate::config::schema_sql())?;
        debug!(%location, "ledger schema ready");
        Ok(Self {
            conn: Mutex::new(conn),
            timeout,
            location,
        })
    }

    /// The bound applied to every lock acquisition.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `":memory:"` or the database file path.
    pub fn location(&self) -> &str {
        &self.location
    }

    fn lock(&self) -> Result<MutexGuard<'_, DuckDbConnection>> {
        self.conn.try_lock_for(self.timeout).ok_or_else(|| {
            LedgerError::StoreUnavailable(format!(
                "timed out after {:?} waiting for store {}",
                self.timeout, self.location
            ))
        })
    }

    /// Run `f` against the raw connection while holding the store lock.
    ///
    /// Everything `f` reads comes from one consistent view of the store.
    pub fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&DuckDbConnection) -> Result<T>,
    {
        let guard = self.lock()?;
        f(&*guard)
    }

    /// Run `f` inside a transaction; commit on `Ok`, roll back on `Err`.
    ///
    /// Nothing `f` writes is visible to other callers unless it returns `Ok`
    /// and the commit succeeds.
    pub fn run_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut guard = self.lock()?;
        let tx = guard.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Execute SQL and return results as a `Vec` of rows.
    pub fn execute(&self, sql: &str, params: &[String]) -> Result<Vec<Row>> {
        let param_values: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
        self.with_connection(|conn| query_rows(conn, sql, &param_values))
    }

    /// Execute SQL and deserialize each row into type `T`.
    pub fn execute_into<T: DeserializeOwned>(&self, sql: &str, params: &[String]) -> Result<Vec<T>> {
        rows_into(self.execute(sql, params)?)
    }

    /// Execute SQL and return the first column of the first row.
    ///
    /// Returns `None` if the result set is empty.
    pub fn execute_scalar(&self, sql: &str, params: &[String]) -> Result<Option<Value>> {
        let param_values: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let mut rows = stmt.query(param_values.as_slice())?;
            match rows.next()? {
                Some(row) => Ok(Some(convert_value_ref(row.get_ref(0)?))),
                None => Ok(None),
            }
        })
    }

    /// Fetch one document by its `id` column.
    pub fn get_document(&self, table: &str, id: &str) -> Result<Option<Value>> {
        check_identifier(table)?;
        let sql = format!("SELECT * FROM {} WHERE \"id\" = ?", table);
        let mut rows = self.execute(&sql, &[id.to_string()])?;
        Ok(rows.pop().map(row_to_object))
    }

    /// Insert a document, replacing any existing one with the same `id`.
    pub fn put_document(&self, table: &str, doc: &Value) -> Result<()> {
        let object = doc.as_object().ok_or_else(|| {
            LedgerError::InvalidArgument("documents must be JSON objects".into())
        })?;
        self.with_connection(|conn| write_document(conn, table, object, true))
    }

    /// Run a builder query and deserialize the matching documents.
    pub fn query_documents<T: DeserializeOwned>(&self, builder: &SqlBuilder) -> Result<Vec<T>> {
        let (sql, params) = builder.build();
        self.execute_into(&sql, &params)
    }
}

/// Execute a query on a raw connection (or transaction) and collect the rows.
pub(crate) fn query_rows(
    conn: &DuckDbConnection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;

    // Column metadata is only reliable after execution in duckdb-rs
    let column_names: Vec<String> = rows.as_ref().map(|s| s.column_names()).unwrap_or_default();

    let mut out: Vec<Row> = Vec::new();
    while let Some(row) = rows.next()? {
        let mut map = HashMap::with_capacity(column_names.len());
        for (i, name) in column_names.iter().enumerate() {
            map.insert(name.clone(), convert_value_ref(row.get_ref(i)?));
        }
        out.push(map);
    }
    Ok(out)
}

/// Deserialize rows into `T` through `serde_json`.
pub(crate) fn rows_into<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>> {
    let mut results = Vec::with_capacity(rows.len());
    for row in rows {
        results.push(serde_json::from_value(row_to_object(row))?);
    }
    Ok(results)
}

/// Insert a serializable model as a row of `table`.
pub(crate) fn insert_model<T: serde::Serialize>(
    conn: &DuckDbConnection,
    table: &str,
    model: &T,
) -> Result<()> {
    match serde_json::to_value(model)? {
        Value::Object(object) => write_document(conn, table, &object, false),
        _ => Err(LedgerError::InvalidArgument(
            "models must serialize to JSON objects".into(),
        )),
    }
}

fn write_document(
    conn: &DuckDbConnection,
    table: &str,
    object: &Map<String, Value>,
    replace: bool,
) -> Result<()> {
    check_identifier(table)?;
    if !object.contains_key("id") {
        return Err(LedgerError::InvalidArgument(
            "documents must carry an \"id\" field".into(),
        ));
    }

    let columns: Vec<String> = object.keys().map(|k| format!("\"{}\"", k.replace('"', ""))).collect();
    let placeholders: Vec<&str> = object.keys().map(|_| "?").collect();
    let values: Vec<SqlValue> = object.values().map(json_to_sql).collect();
    let param_values: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();

    let verb = if replace { "INSERT OR REPLACE INTO" } else { "INSERT INTO" };
    let sql = format!(
        "{} {} ({}) VALUES ({})",
        verb,
        table,
        columns.join(", "),
        placeholders.join(", ")
    );
    conn.execute(&sql, param_values.as_slice())?;
    Ok(())
}

fn check_identifier(name: &str) -> Result<()> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(LedgerError::InvalidArgument(format!(
            "Invalid table name: {}",
            name
        )))
    }
}

fn row_to_object(row: Row) -> Value {
    Value::Object(row.into_iter().collect::<Map<String, Value>>())
}

fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::BigInt(i),
            None => SqlValue::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> Value {
    match val {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(n) => Value::Number(n.into()),
        ValueRef::SmallInt(n) => Value::Number(n.into()),
        ValueRef::Int(n) => Value::Number(n.into()),
        ValueRef::BigInt(n) => Value::Number(n.into()),
        ValueRef::HugeInt(n) => {
            // SUM over BIGINT widens to HUGEINT
            match i64::try_from(n) {
                Ok(i) => Value::Number(i.into()),
                Err(_) => Value::String(n.to_string()),
            }
        }
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).to_string()),
        _ => Value::Null,
    }
}
