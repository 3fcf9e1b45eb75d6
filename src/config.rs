use std::path::PathBuf;
use std::time::Duration;

pub const PROJECTS_TABLE: &str = "projects";
pub const INVESTMENTS_TABLE: &str = "investments";

pub const DB_FILE_NAME: &str = "ledger.duckdb";
pub const DB_PATH_ENV: &str = "VENTURE_LEDGER_DB";

pub const PROJECTS_SNAPSHOT: &str = "projects.ndjson.gz";
pub const INVESTMENTS_SNAPSHOT: &str = "investments.ndjson.gz";

/// Upper bound on any wait for the store connection or a project lock.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for valuation feed requests.
pub const DEFAULT_FEED_TIMEOUT: Duration = Duration::from_secs(30);

/// Implied-equity drift (percentage points) tolerated before a warning is logged.
pub const EQUITY_DRIFT_TOLERANCE: f64 = 1.0;

/// Slack for floating-point equity sums.
pub const EQUITY_EPSILON: f64 = 1e-9;

pub fn schema_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {projects} (\
            \"id\" VARCHAR PRIMARY KEY, \
            \"ownerId\" VARCHAR NOT NULL, \
            \"title\" VARCHAR NOT NULL, \
            \"description\" VARCHAR, \
            \"fundingGoal\" BIGINT NOT NULL, \
            \"minimumInvestment\" BIGINT, \
            \"maximumInvestment\" BIGINT, \
            \"equityOffered\" DOUBLE NOT NULL, \
            \"valuation\" BIGINT, \
            \"deadline\" BIGINT NOT NULL, \
            \"status\" VARCHAR NOT NULL, \
            \"createdAt\" BIGINT NOT NULL\
        ); \
        CREATE TABLE IF NOT EXISTS {investments} (\
            \"id\" VARCHAR PRIMARY KEY, \
            \"projectId\" VARCHAR NOT NULL, \
            \"investorId\" VARCHAR NOT NULL, \
            \"amount\" BIGINT NOT NULL, \
            \"equityPercentage\" DOUBLE NOT NULL, \
            \"timestamp\" BIGINT NOT NULL, \
            \"kind\" VARCHAR NOT NULL, \
            \"reverses\" VARCHAR\
        ); \
        CREATE INDEX IF NOT EXISTS idx_investments_project ON {investments}(\"projectId\"); \
        CREATE INDEX IF NOT EXISTS idx_investments_investor ON {investments}(\"investorId\");",
        projects = PROJECTS_TABLE,
        investments = INVESTMENTS_TABLE,
    )
}

pub fn default_data_dir() -> PathBuf {
    if let Some(data) = dirs::data_dir() {
        data.join("venture-ledger")
    } else {
        PathBuf::from(".venture-ledger")
    }
}

/// Resolve the default database path, honoring `VENTURE_LEDGER_DB`.
pub fn default_db_path() -> PathBuf {
    match std::env::var_os(DB_PATH_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => default_data_dir().join(DB_FILE_NAME),
    }
}
