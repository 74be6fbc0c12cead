//! Command-line interface.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::models::user::validate_registration;
use crate::models::{Album, CreateUser, User};
use crate::schema::Schema;
use crate::services::ImportService;
use crate::services::ImportReport;
use crate::services::import::parse_batch;

/// Curio museum catalogue server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve,

    /// Create an admin account, or promote an existing one.
    CreateAdmin {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        /// Display name; defaults to the email local part.
        #[arg(long)]
        username: Option<String>,
    },

    /// Import artifact records from a JSON file.
    Import {
        /// File holding an array of records or `{"records": [...]}`.
        file: PathBuf,
    },
}

impl Cli {
    /// The subcommand to run; `serve` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

/// Create an admin user, or grant admin to the user with that email.
pub async fn create_admin(
    config: &Config,
    email: &str,
    password: &str,
    username: Option<&str>,
) -> Result<i64> {
    let email = email.trim();
    if let Err(message) = validate_registration(email, password) {
        bail!("{message}");
    }

    let pool = db::create_pool(config)?;
    db::ensure_app_tables(&pool).await?;
    let mut conn = pool.acquire().await.context("failed to connect to the database")?;

    let user_id = match User::find_by_email(&mut conn, email).await? {
        Some(user) => {
            User::set_admin(&mut conn, user.user_id, true).await?;
            info!(user_id = user.user_id, "existing user promoted to admin");
            user.user_id
        }
        None => {
            let user_id = User::create(
                &mut conn,
                CreateUser {
                    email: email.to_string(),
                    password: password.to_string(),
                    username: username.map(str::to_string),
                    is_admin: true,
                },
            )
            .await?;
            info!(user_id, "admin user created");
            user_id
        }
    };
    Album::default_for_user(&mut conn, user_id).await?;

    Ok(user_id)
}

/// Import a JSON file of artifact records.
pub async fn import_file(config: &Config, file: &std::path::Path) -> Result<ImportReport> {
    let body = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let records = parse_batch(&body)?;

    let pool = db::create_pool(config)?;
    let importer = ImportService::new(pool, Schema::default());
    let report = importer.import(records).await;

    info!(
        imported = report.imported,
        failed = report.failed.len(),
        "import finished"
    );
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::try_parse_from(["curio"]).unwrap();
        assert_eq!(cli.command(), Command::Serve);
    }

    #[test]
    fn create_admin_arguments() {
        let cli = Cli::try_parse_from([
            "curio",
            "create-admin",
            "--email",
            "admin@example.org",
            "--password",
            "secret1",
        ])
        .unwrap();
        assert_eq!(
            cli.command(),
            Command::CreateAdmin {
                email: "admin@example.org".to_string(),
                password: "secret1".to_string(),
                username: None,
            }
        );
    }

    #[test]
    fn import_takes_a_file() {
        let cli = Cli::try_parse_from(["curio", "import", "records.json"]).unwrap();
        assert_eq!(
            cli.command(),
            Command::Import {
                file: PathBuf::from("records.json")
            }
        );
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["curio", "migrate"]).is_err());
    }
}
