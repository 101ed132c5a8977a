pub mod config;
pub mod optimize;
pub mod route;
pub mod rule;
pub mod statement;
pub mod types;

use thiserror::Error;

pub use optimize::{OptimizeContext, OptimizeEngineFactory, OptimizeResult};
pub use route::{RouteValue, ShardingCondition, ShardingConditions};
pub use statement::SqlStatementParser;
pub use types::{ShardingValue, SqlValue};

#[derive(Error, Debug)]
pub enum ShardingError {
    #[error("Sharding value type error: {0}")]
    ShardingValueType(String),

    #[error("Unsupported sharding operation: {0}")]
    UnsupportedShardingOperation(String),

    #[error("Missing generated key: {0}")]
    MissingGeneratedKey(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Feature not supported: {0}")]
    NotSupported(String),

    #[error("SQL parse error: {0}")]
    SqlParse(#[from] sqlparser::parser::ParserError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ShardingError>;

impl ShardingError {
    /// Get the SQLSTATE-style code a proxy should report for this error
    pub fn error_code(&self) -> &str {
        match self {
            ShardingError::ShardingValueType(_) => "22P02", // invalid_text_representation
            ShardingError::UnsupportedShardingOperation(_) => "0A000", // feature_not_supported
            ShardingError::MissingGeneratedKey(_) => "23502", // not_null_violation
            ShardingError::InvalidParameter(_) => "22023", // invalid_parameter_value
            ShardingError::NotSupported(_) => "0A000", // feature_not_supported
            ShardingError::SqlParse(_) => "42601", // syntax_error
            ShardingError::Config(_) => "F0000", // config_file_error
            ShardingError::Io(_) => "58030", // io_error
            ShardingError::Json(_) => "22032", // invalid_json_text
        }
    }

    /// Whether the statement must be rejected before it reaches any data node
    pub fn is_statement_rejection(&self) -> bool {
        matches!(
            self,
            ShardingError::ShardingValueType(_)
                | ShardingError::UnsupportedShardingOperation(_)
                | ShardingError::MissingGeneratedKey(_)
                | ShardingError::InvalidParameter(_)
        )
    }
}
