#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid project terms: {0}")]
    InvalidTerms(String),

    #[error("Project closed: {0}")]
    ProjectClosed(String),

    #[error("Investment of {amount} is below the minimum of {minimum}")]
    BelowMinimum { amount: i64, minimum: i64 },

    #[error("Investment of {amount} is above the maximum of {maximum}")]
    AboveMaximum { amount: i64, maximum: i64 },

    #[error("Investment of {amount} exceeds the remaining capacity of {remaining}")]
    InsufficientCapacity { amount: i64, remaining: i64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid funding goal: {0}")]
    InvalidGoal(i64),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Amount out of range: {0}")]
    Overflow(String),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LedgerError {
    /// Stable machine-readable code, one per error kind.
    ///
    /// The consuming layer maps these to user-facing messages.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidTerms(_) => "invalid_terms",
            LedgerError::ProjectClosed(_) => "project_closed",
            LedgerError::BelowMinimum { .. } => "below_minimum",
            LedgerError::AboveMaximum { .. } => "above_maximum",
            LedgerError::InsufficientCapacity { .. } => "insufficient_capacity",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::StoreUnavailable(_) => "store_unavailable",
            LedgerError::InvalidGoal(_) => "invalid_goal",
            LedgerError::InvalidArgument(_) => "invalid_argument",
            LedgerError::Overflow(_) => "overflow",
            LedgerError::DuckDb(_) => "store_error",
            LedgerError::Http(_) => "http_error",
            LedgerError::Io(_) => "io_error",
            LedgerError::Json(_) => "json_error",
        }
    }

    /// Whether the caller may retry the same request unchanged (with backoff).
    ///
    /// Everything else needs a corrected request.
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::StoreUnavailable(_) => true,
            LedgerError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
