use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use pgcrab::utils::logging::init_logging;
use pgcrab::{PgCrabClient, RecordOutcome};

#[derive(Parser)]
#[command(name = "pgcrab", version, about = "Bootstrap and version a PostgreSQL database")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "pgcrab.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the configured database (succeeds if it already exists)
    CreateDb,
    /// Drop the configured database if it exists
    DropDb,
    /// Recreate the baseline tables and write the initial changelog row
    Baseline,
    /// Record applied patch files (<patch>.<name>.<ext>) in the changelog
    Record {
        #[arg(required = true)]
        filenames: Vec<String>,
    },
    /// List changelog entries
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Drop every configured baseline table
    DropAll,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut client =
        pgcrab::init(&cli.config).with_context(|| format!("loading {}", cli.config))?;
    init_logging(&client.config().logging)?;

    match cli.command {
        Command::CreateDb => client.create_db().await?,
        Command::DropDb => client.drop_db().await?,
        command => {
            client.connect().await?;
            let result = run_connected(&mut client, command).await;
            client.close().await;
            result?;
        }
    }

    Ok(())
}

async fn run_connected(client: &mut PgCrabClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Baseline => {
            let id = client.create_baseline().await?;
            println!("baseline created (changelog id {})", id);
        }
        Command::Record { filenames } => {
            let mut failed = 0;
            for outcome in client.record(&filenames).await {
                match outcome {
                    RecordOutcome::Recorded { filename, id } => {
                        println!("recorded {} (id {})", filename, id)
                    }
                    RecordOutcome::AlreadyApplied { filename } => {
                        failed += 1;
                        eprintln!("already applied: {}", filename)
                    }
                    RecordOutcome::Failed { filename, error } => {
                        failed += 1;
                        eprintln!("failed: {}: {}", filename, error)
                    }
                }
            }
            if failed > 0 {
                bail!("{} of {} patch files were not recorded", failed, filenames.len());
            }
        }
        Command::Status { json } => {
            let entries = client.changelog().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in entries {
                    println!(
                        "{:>5}  {}.{}.{}  {:<40}  {}",
                        entry.id, entry.major, entry.minor, entry.patch, entry.name, entry.applied
                    );
                }
            }
        }
        Command::DropAll => client.drop_all().await?,
        Command::CreateDb | Command::DropDb => bail!("command runs without a database session"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> PgCrabClient {
        let config = toml::from_str(
            r#"
            [database]
            host = "localhost"
            port = 5432
            user = "ivt"
            dbname = "ivttest"
            "#,
        )
        .unwrap();
        PgCrabClient::new(config)
    }

    #[test]
    fn test_cli_parses_record() {
        let cli = Cli::parse_from(["pgcrab", "-c", "db.toml", "record", "0001.a.sql", "0002.b.sql"]);
        assert_eq!(cli.config, "db.toml");
        assert!(matches!(cli.command, Command::Record { filenames } if filenames.len() == 2));
    }

    #[tokio::test]
    async fn test_database_commands_rejected_in_session() {
        let mut client = client();
        assert!(run_connected(&mut client, Command::CreateDb).await.is_err());
        assert!(run_connected(&mut client, Command::DropDb).await.is_err());
    }
}
