//! Database administration
//!
//! [`Administrator`] owns one session to the target database and issues the
//! DDL and changelog writes. Creating and dropping whole databases goes
//! through short-lived sessions to the maintenance database instead.

use chrono::Local;
use sqlx::postgres::PgConnection;
use sqlx::{Connection, Executor};

use crate::config::DatabaseConfig;
use crate::db::baseline::Baseline;
use crate::db::connection::{self, sqlstate, UNIQUE_VIOLATION};
use crate::error::{Error, Result};
use crate::schema::changelog::{
    ChangelogEntry, PatchFile, CHANGELOG_MAJOR, CHANGELOG_MINOR, INSERT_CHANGELOG,
    SELECT_CHANGELOG,
};
use crate::schema::tables::BaselineTable;
use crate::utils::identifiers::validate_identifier;

/// Owner of a single session to the target database
#[derive(Default)]
pub struct Administrator {
    connection: Option<PgConnection>,
    dbname: Option<String>,
}

impl Administrator {
    /// Create an administrator with no open session
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `dbname` owned by the configured user.
    ///
    /// Succeeds when the database already exists.
    pub async fn create_db(config: &DatabaseConfig, dbname: &str) -> Result<()> {
        let dbname = validate_identifier(dbname)?;
        let owner = validate_identifier(&config.user)?;
        let sql = format!("CREATE DATABASE {} WITH OWNER {}", dbname, owner);

        match execute_autocommit(config, &sql).await {
            Ok(()) => {
                tracing::info!(dbname, owner, "Created database");
                Ok(())
            }
            Err(Error::AlreadyExists(_)) => {
                tracing::info!(dbname, "Database already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Drop `dbname` if it exists
    pub async fn drop_db(config: &DatabaseConfig, dbname: &str) -> Result<()> {
        let dbname = validate_identifier(dbname)?;
        let sql = format!("DROP DATABASE IF EXISTS {}", dbname);

        execute_autocommit(config, &sql).await?;
        tracing::info!(dbname, "Dropped database");
        Ok(())
    }

    /// Open a session to the configured database, replacing any open one
    pub async fn connect(&mut self, config: &DatabaseConfig) -> Result<()> {
        self.close().await;

        let conn = connection::open(config, &config.dbname).await?;
        tracing::info!(host = %config.host, port = config.port, dbname = %config.dbname, "Connected");

        self.connection = Some(conn);
        self.dbname = Some(config.dbname.clone());
        Ok(())
    }

    /// Release the session; does nothing when none is open
    pub async fn close(&mut self) {
        let dbname = self.dbname.take();
        if let Some(conn) = self.connection.take() {
            connection::close(conn).await;
            tracing::debug!(dbname = ?dbname, "Connection closed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Name of the database the open session is bound to
    pub fn dbname(&self) -> Option<&str> {
        self.dbname.as_deref()
    }

    fn connection(&mut self) -> Result<&mut PgConnection> {
        self.connection.as_mut().ok_or(Error::NotConnected)
    }

    pub async fn create_table_roles(&mut self) -> Result<()> {
        self.create_table(BaselineTable::Roles).await
    }

    pub async fn create_table_users(&mut self) -> Result<()> {
        self.create_table(BaselineTable::Users).await
    }

    pub async fn create_table_changelog(&mut self) -> Result<()> {
        self.create_table(BaselineTable::Changelog).await
    }

    /// Also creates the `priority_ind` index
    pub async fn create_table_installationstep(&mut self) -> Result<()> {
        self.create_table(BaselineTable::InstallationStep).await
    }

    /// Create `table` with its canonical schema if it does not exist
    pub async fn create_table(&mut self, table: BaselineTable) -> Result<()> {
        self.execute_in_transaction(table.create_statements()).await?;
        tracing::info!(table = %table, "Created table");
        Ok(())
    }

    /// Grant all privileges on `table` to `principal`
    pub async fn grant_access(&mut self, table: BaselineTable, principal: &str) -> Result<()> {
        let principal = validate_identifier(principal)?;
        let sql = table.grant_statement(principal);

        self.execute_in_transaction(&[sql.as_str()]).await?;
        tracing::info!(table = %table, principal, "Granted access");
        Ok(())
    }

    /// Drop `table` and everything depending on it
    pub async fn drop_table(&mut self, table: BaselineTable) -> Result<()> {
        self.execute_in_transaction(&[table.drop_statement()]).await?;
        tracing::info!(table = %table, "Dropped table");
        Ok(())
    }

    /// Drop every table in `tables`, last one first
    pub async fn drop_all(&mut self, tables: &[BaselineTable]) -> Result<()> {
        for &table in tables.iter().rev() {
            self.drop_table(table).await?;
        }
        Ok(())
    }

    /// Recreate the baseline tables and write the sentinel changelog row
    pub async fn create_baseline(
        &mut self,
        tables: &[BaselineTable],
        principal: &str,
    ) -> Result<i32> {
        let mut baseline = Baseline::new(self);
        baseline.create_tables(tables, principal).await?;
        baseline.insert_base_version().await
    }

    /// Record the patch named by `filename` in the changelog.
    ///
    /// Returns the new row id. A filename that does not follow
    /// `<patch>.<name>.<extension>` fails before anything is written; a
    /// patch recorded before fails with [`Error::UniquenessViolation`].
    pub async fn insert_changelog_record(&mut self, filename: &str) -> Result<i32> {
        let patch = PatchFile::parse(filename).map_err(|e| {
            tracing::error!(filename, "Rejected malformed patch filename");
            e
        })?;

        self.insert_changelog(&patch.patch, &patch.name).await
    }

    /// Insert one changelog row, rolling back on any failure
    pub(crate) async fn insert_changelog(&mut self, patch: &str, name: &str) -> Result<i32> {
        let applied = Local::now().naive_local();
        let conn = self.connection()?;
        let mut tx = conn.begin().await?;

        let inserted = sqlx::query_scalar::<_, i32>(INSERT_CHANGELOG)
            .bind(CHANGELOG_MAJOR)
            .bind(CHANGELOG_MINOR)
            .bind(patch)
            .bind(name)
            .bind(applied)
            .fetch_one(&mut *tx)
            .await;

        match inserted {
            Ok(id) => {
                tx.commit().await?;
                tracing::info!(id, patch, name, "Recorded changelog entry");
                Ok(id)
            }
            Err(e) => {
                if let Err(rollback_error) = tx.rollback().await {
                    tracing::warn!(error = %rollback_error, "Rollback failed");
                }

                let error = if sqlstate(&e).as_deref() == Some(UNIQUE_VIOLATION) {
                    Error::UniquenessViolation {
                        name: name.to_string(),
                    }
                } else {
                    Error::from(e)
                };
                tracing::error!(patch, name, error = %error, "Changelog insert rolled back");
                Err(error)
            }
        }
    }

    /// All changelog rows in insertion order
    pub async fn changelog_entries(&mut self) -> Result<Vec<ChangelogEntry>> {
        let conn = self.connection()?;
        let entries = sqlx::query_as::<_, ChangelogEntry>(SELECT_CHANGELOG)
            .fetch_all(&mut *conn)
            .await?;
        Ok(entries)
    }

    /// Execute statements in one transaction, committing at the end
    async fn execute_in_transaction(&mut self, statements: &[&str]) -> Result<()> {
        let conn = self.connection()?;
        let mut tx = conn.begin().await?;

        for statement in statements {
            if let Err(e) = sqlx::query(statement).execute(&mut *tx).await {
                tracing::error!(error = %e, sql = statement.trim(), "Statement failed, rolling back");
                if let Err(rollback_error) = tx.rollback().await {
                    tracing::warn!(error = %rollback_error, "Rollback failed");
                }
                return Err(e.into());
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Run one statement on the maintenance database outside any transaction.
///
/// CREATE/DROP DATABASE refuse to run inside a transaction block, so the
/// statement goes over the simple query protocol on a fresh session.
async fn execute_autocommit(config: &DatabaseConfig, sql: &str) -> Result<()> {
    let maintenance_db = validate_identifier(config.maintenance_db())?;
    let mut conn = connection::open(config, maintenance_db).await?;

    tracing::debug!(sql, maintenance_db, "Executing outside transaction");
    let result = conn.execute(sql).await;
    connection::close(conn).await;

    result.map(|_| ()).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_close_without_connection_is_noop() {
        let mut admin = Administrator::new();
        admin.close().await;
        admin.close().await;
        assert!(!admin.is_connected());
        assert_eq!(admin.dbname(), None);
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let mut admin = Administrator::new();

        assert!(matches!(
            admin.create_table_roles().await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            admin.drop_table(BaselineTable::Users).await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            admin.insert_changelog_record("0001.first.sql").await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            admin.changelog_entries().await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_malformed_filename_checked_before_session() {
        let mut admin = Administrator::new();
        let result = admin.insert_changelog_record("malformed_no_dot.sql").await;
        assert!(matches!(result, Err(Error::MalformedFilename(f)) if f == "malformed_no_dot.sql"));
    }

    #[tokio::test]
    async fn test_grant_rejects_unsafe_principal() {
        let mut admin = Administrator::new();
        let result = admin
            .grant_access(BaselineTable::Roles, "ivt; DROP TABLE roles")
            .await;
        assert!(matches!(result, Err(Error::InvalidIdentifier(_))));
    }

    #[tokio::test]
    async fn test_create_db_rejects_unsafe_name() {
        let config = DatabaseConfig {
            host: "localhost".to_string(),
            port: 5432,
            user: "ivt".to_string(),
            password: None,
            dbname: "ivt".to_string(),
            maintenance_db: None,
            timeout_seconds: Some(1),
        };

        let result = Administrator::create_db(&config, "ivt; DROP DATABASE prod").await;
        assert!(matches!(result, Err(Error::InvalidIdentifier(_))));
        let result = Administrator::drop_db(&config, "prod--").await;
        assert!(matches!(result, Err(Error::InvalidIdentifier(_))));
    }
}
