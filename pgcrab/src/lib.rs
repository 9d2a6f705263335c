//! pgcrab: puts the baseline ingredients into a PostgreSQL database
//!
//! pgcrab creates and drops databases, lays down a fixed set of baseline
//! tables and keeps a changelog of the migration patches applied on top.

pub mod config;
pub mod db;
pub mod error;
pub mod schema;
pub mod utils;

// Re-export main types for easier access
pub use config::Config;
pub use db::admin::Administrator;
pub use db::baseline::Baseline;
pub use error::{Error, Result};
pub use schema::changelog::{ChangelogEntry, PatchFile};
pub use schema::tables::BaselineTable;

/// Load the configuration file and build a client (not yet connected)
pub fn init(config_path: &str) -> Result<PgCrabClient> {
    let config = config::load_from_file(config_path)?;
    Ok(PgCrabClient::new(config))
}

/// Outcome of recording one patch file
#[derive(Debug)]
pub enum RecordOutcome {
    Recorded { filename: String, id: i32 },
    AlreadyApplied { filename: String },
    Failed { filename: String, error: Error },
}

/// Configuration plus the administrator driven by it
pub struct PgCrabClient {
    config: Config,
    admin: Administrator,
}

impl PgCrabClient {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            admin: Administrator::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create the configured database (no-op if it exists)
    pub async fn create_db(&self) -> Result<()> {
        Administrator::create_db(&self.config.database, &self.config.database.dbname).await
    }

    /// Drop the configured database if it exists
    pub async fn drop_db(&self) -> Result<()> {
        Administrator::drop_db(&self.config.database, &self.config.database.dbname).await
    }

    pub async fn connect(&mut self) -> Result<()> {
        self.admin.connect(&self.config.database).await
    }

    pub async fn close(&mut self) {
        self.admin.close().await
    }

    /// Recreate the configured baseline tables and write the sentinel row
    pub async fn create_baseline(&mut self) -> Result<i32> {
        let tables = self.config.baseline.tables()?;
        self.admin
            .create_baseline(&tables, self.config.baseline.grant_to())
            .await
    }

    /// Drop the configured baseline tables
    pub async fn drop_all(&mut self) -> Result<()> {
        let tables = self.config.baseline.tables()?;
        self.admin.drop_all(&tables).await
    }

    /// Record each patch file, continuing past failures
    pub async fn record<S: AsRef<str>>(&mut self, filenames: &[S]) -> Vec<RecordOutcome> {
        let mut outcomes = Vec::with_capacity(filenames.len());

        for filename in filenames {
            let filename = filename.as_ref().to_string();
            let outcome = match self.admin.insert_changelog_record(&filename).await {
                Ok(id) => RecordOutcome::Recorded { filename, id },
                Err(e) if e.is_already_applied() => RecordOutcome::AlreadyApplied { filename },
                Err(error) => RecordOutcome::Failed { filename, error },
            };
            outcomes.push(outcome);
        }

        outcomes
    }

    pub async fn changelog(&mut self) -> Result<Vec<ChangelogEntry>> {
        self.admin.changelog_entries().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn client() -> PgCrabClient {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"
            [database]
            host = "localhost"
            port = 5432
            user = "ivt"
            dbname = "ivttest"
            "#,
        )
        .unwrap();

        init(file.path().to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_init_loads_config() {
        let client = client();
        assert_eq!(client.config().database.dbname, "ivttest");
        assert!(client.config().logging.is_none());
    }

    #[tokio::test]
    async fn test_record_continues_past_failures() {
        let mut client = client();
        let outcomes = client.record(&["bad.sql", "0001.x.sql"]).await;

        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            &outcomes[0],
            RecordOutcome::Failed { filename, error: Error::MalformedFilename(_) }
                if filename == "bad.sql"
        ));
        assert!(matches!(
            &outcomes[1],
            RecordOutcome::Failed { filename, error: Error::NotConnected }
                if filename == "0001.x.sql"
        ));
    }
}
