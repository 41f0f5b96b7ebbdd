//! Errors for location recorder
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocationError {
    #[error("Serialization error")]
    SerdeError(#[from] serde_json::Error),

    #[error("Configuration error")]
    ConfigError(#[from] config::ConfigError),

    #[error("Invalid configuration: {message}")]
    ConfigurationError { message: String },

    #[error("IO error")]
    IoError(#[from] std::io::Error),

    #[error("Invalid value in column {column}: {value:?}")]
    InvalidColumn { column: &'static str, value: String },

    #[error("Database migration error")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),
}
