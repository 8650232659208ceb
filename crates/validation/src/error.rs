use thiserror::Error;

pub type Result<T> = std::result::Result<T, ValidationError>;

#[derive(Debug, Error)]
pub enum ValidationError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (missing computed column, bad threshold, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// Caller passed a parameter outside the accepted set.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing required column in input data.
    #[error("table '{table}': missing column '{column}'")]
    MissingColumn { table: String, column: String },

    /// A cell that must be numeric could not be parsed.
    #[error("table '{table}', row {row}: cannot parse {column} '{value}'")]
    ValueParse {
        table: String,
        row: usize,
        column: String,
        value: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
