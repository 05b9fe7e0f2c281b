use thiserror::Error;

/// Errors raised while loading reference data or running the sizing pipeline.
#[derive(Error, Debug)]
pub enum SizingError {
    #[error("invalid input for {country}: {field} {reason}")]
    InvalidInput {
        country: String,
        field: &'static str,
        reason: String,
    },

    #[error("country '{0}' appears more than once in the reference table")]
    DuplicateCountry(String),

    #[error("country '{country}' has no value for indicator '{indicator}'")]
    MissingIndicator { country: String, indicator: String },

    #[error("country '{country}' has no row in the {table} table")]
    JoinMiss { country: String, table: &'static str },

    #[error("invalid assumptions: {0}")]
    InvalidAssumptions(String),

    #[error("malformed table {path}: {reason}")]
    MalformedTable { path: String, reason: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SizingResult<T> = Result<T, SizingError>;
