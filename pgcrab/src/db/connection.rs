//! Database connection handling
//!
//! This module opens and closes single PostgreSQL sessions and sorts driver
//! errors into pgcrab's error kinds.

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection};

use crate::config::DatabaseConfig;
use crate::error::Error;
use crate::error::Result;

/// Seconds allowed for establishing a session
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// SQLSTATE duplicate_database
pub const DUPLICATE_DATABASE: &str = "42P04";
/// SQLSTATE unique_violation
pub const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE invalid_catalog_name (target database missing)
pub const INVALID_CATALOG_NAME: &str = "3D000";

/// Build connect options for `dbname` on the configured server
pub fn connect_options(config: &DatabaseConfig, dbname: &str) -> PgConnectOptions {
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .database(dbname)
        .application_name("pgcrab");

    match &config.password {
        Some(password) => options.password(password),
        None => options,
    }
}

/// Open a session to `dbname`
///
/// Every failure while establishing the session is a connection error.
pub async fn open(config: &DatabaseConfig, dbname: &str) -> Result<PgConnection> {
    let options = connect_options(config, dbname);
    let timeout = Duration::from_secs(config.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS));

    tracing::debug!(host = %config.host, port = config.port, dbname, "Opening connection");

    match tokio::time::timeout(timeout, options.connect()).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(e)) => Err(Error::Connection(format!(
            "{}@{}:{}/{}: {}",
            config.user, config.host, config.port, dbname, e
        ))),
        Err(_) => Err(Error::Connection(format!(
            "{}:{}/{}: timed out after {}s",
            config.host,
            config.port,
            dbname,
            timeout.as_secs()
        ))),
    }
}

/// Close a session, logging instead of failing
pub async fn close(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, "Failed to close connection cleanly");
    }
}

/// SQLSTATE code of a database-reported error
pub fn sqlstate(error: &sqlx::Error) -> Option<String> {
    match error {
        sqlx::Error::Database(db_error) => db_error.code().map(|code| code.into_owned()),
        _ => None,
    }
}

/// Sort a driver error into pgcrab's error kinds
pub(crate) fn classify(error: sqlx::Error) -> Error {
    let code = sqlstate(&error);

    match code.as_deref() {
        Some(DUPLICATE_DATABASE) => Error::AlreadyExists(error.to_string()),
        // Class 08 is connection exception, class 28 invalid authorization
        Some(c) if c.starts_with("08") || c.starts_with("28") || c == INVALID_CATALOG_NAME => {
            Error::Connection(error.to_string())
        }
        Some(_) => Error::Database(error),
        None => match error {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Configuration(_) => Error::Connection(error.to_string()),
            other => Error::Database(other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn database_config() -> DatabaseConfig {
        DatabaseConfig {
            host: "db.internal".to_string(),
            port: 5442,
            user: "ivt".to_string(),
            password: None,
            dbname: "ivttest".to_string(),
            maintenance_db: None,
            timeout_seconds: Some(1),
        }
    }

    #[test]
    fn test_io_errors_are_connection_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(classify(sqlx::Error::Io(io)), Error::Connection(_)));
    }

    #[test]
    fn test_other_errors_are_database_errors() {
        assert!(matches!(classify(sqlx::Error::RowNotFound), Error::Database(_)));
        assert_eq!(sqlstate(&sqlx::Error::RowNotFound), None);
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let mut config = database_config();
        config.host = "127.0.0.1".to_string();
        config.port = 1;

        let result = open(&config, "postgres").await;
        assert!(matches!(result, Err(Error::Connection(_))));
    }
}
