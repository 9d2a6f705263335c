//! Error types for pgcrab

use thiserror::Error;

/// Result type for pgcrab operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for pgcrab
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not connected to a database")]
    NotConnected,

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Changelog entry '{name}' already exists")]
    UniquenessViolation { name: String },

    #[error("Malformed patch filename '{0}': expected <patch>.<name>.<extension>")]
    MalformedFilename(String),

    #[error("Unknown baseline table: {0}")]
    UnknownTable(String),

    #[error("Invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl Error {
    /// True when the failure means the changelog entry was applied before
    pub fn is_already_applied(&self) -> bool {
        matches!(self, Error::UniquenessViolation { .. })
    }
}

/// Convert SQLx errors, sorting connection failures from statement failures
impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        crate::db::connection::classify(error)
    }
}

/// Convert TOML deserialization errors to pgcrab errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
