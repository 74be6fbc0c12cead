//! Database connection pool management.

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tracing::info;

use crate::config::Config;

/// Create a MySQL connection pool.
///
/// The pool connects lazily so the server starts, and pages render degraded,
/// while the database is unreachable.
pub fn create_pool(config: &Config) -> Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(config.database_acquire_timeout_secs))
        .connect_lazy(&config.database_url)
        .context("invalid MySQL connection URL")?;

    Ok(pool)
}

/// Check if the database connection is healthy.
pub async fn check_health(pool: &MySqlPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

/// Application-owned tables. The catalogue tables are loaded externally and
/// never created here.
const APP_TABLES: &[(&str, &str)] = &[
    (
        "Users",
        "CREATE TABLE IF NOT EXISTS Users (
            user_id INT AUTO_INCREMENT PRIMARY KEY,
            email VARCHAR(255) UNIQUE NOT NULL,
            password_hash VARCHAR(255) NOT NULL,
            username VARCHAR(100),
            is_admin BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            collection_count INT DEFAULT 0
        )",
    ),
    (
        "Albums",
        "CREATE TABLE IF NOT EXISTS Albums (
            album_id INT AUTO_INCREMENT PRIMARY KEY,
            user_id INT NOT NULL,
            name VARCHAR(255) NOT NULL,
            is_public BOOLEAN DEFAULT TRUE,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (user_id) REFERENCES Users(user_id) ON DELETE CASCADE
        )",
    ),
    (
        "Collections",
        "CREATE TABLE IF NOT EXISTS Collections (
            collection_id INT AUTO_INCREMENT PRIMARY KEY,
            album_id INT NOT NULL,
            artifact_id INT NOT NULL,
            created_at TIMESTAMP(6) DEFAULT CURRENT_TIMESTAMP(6),
            FOREIGN KEY (album_id) REFERENCES Albums(album_id) ON DELETE CASCADE
        )",
    ),
    (
        "ExportRecords",
        "CREATE TABLE IF NOT EXISTS ExportRecords (
            export_id INT AUTO_INCREMENT PRIMARY KEY,
            user_id INT NOT NULL,
            album_id INT,
            description VARCHAR(500),
            format VARCHAR(50),
            status VARCHAR(50) DEFAULT '处理中',
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (user_id) REFERENCES Users(user_id) ON DELETE CASCADE,
            FOREIGN KEY (album_id) REFERENCES Albums(album_id) ON DELETE SET NULL
        )",
    ),
    (
        "LOGS",
        "CREATE TABLE IF NOT EXISTS LOGS (
            Log_PK BIGINT AUTO_INCREMENT PRIMARY KEY,
            Action VARCHAR(64) NOT NULL,
            Entity_Type VARCHAR(64) NOT NULL,
            Entity_ID VARCHAR(64) NOT NULL,
            User_ID INT NULL,
            IP_Address VARCHAR(64) NOT NULL,
            Details TEXT,
            Created_At TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            INDEX idx_logs_action (Action),
            INDEX idx_logs_created (Created_At)
        )",
    ),
];

/// Create the application tables if they are missing.
pub async fn ensure_app_tables(pool: &MySqlPool) -> Result<()> {
    for (name, ddl) in APP_TABLES {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .with_context(|| format!("failed to create table {name}"))?;
    }

    // Users tables created before the admin console lack the flag.
    let (has_admin_flag,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM information_schema.COLUMNS \
         WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = 'Users' AND COLUMN_NAME = 'is_admin'",
    )
    .fetch_one(pool)
    .await
    .context("failed to inspect Users columns")?;
    if has_admin_flag == 0 {
        sqlx::query("ALTER TABLE Users ADD COLUMN is_admin BOOLEAN NOT NULL DEFAULT FALSE")
            .execute(pool)
            .await
            .context("failed to add Users.is_admin")?;
        info!("added is_admin column to Users");
    }

    info!(tables = APP_TABLES.len(), "application tables ready");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn app_tables_are_idempotent_ddl() {
        for (name, ddl) in APP_TABLES {
            assert!(ddl.starts_with(&format!("CREATE TABLE IF NOT EXISTS {name} (")));
        }
    }

    #[test]
    fn users_precede_dependent_tables() {
        let order: Vec<_> = APP_TABLES.iter().map(|(name, _)| *name).collect();
        let users = order.iter().position(|n| *n == "Users").unwrap();
        let albums = order.iter().position(|n| *n == "Albums").unwrap();
        let collections = order.iter().position(|n| *n == "Collections").unwrap();
        assert!(users < albums && albums < collections);
    }

    #[test]
    fn logs_ddl_matches_the_schema_descriptor() {
        let schema = crate::schema::Schema::default();
        let (_, ddl) = APP_TABLES
            .iter()
            .find(|(name, _)| *name == schema.tables.logs)
            .unwrap();
        let log = &schema.log;
        for column in [
            log.id,
            log.action,
            log.entity_type,
            log.entity_id,
            log.user_id,
            log.ip_address,
            log.details,
            log.created_at,
        ] {
            assert!(ddl.contains(&format!("{column} ")), "{column}");
        }
    }

    #[test]
    fn app_tables_never_shadow_catalogue_tables() {
        let tables = crate::schema::Schema::default().tables;
        let catalogue = [
            tables.sources,
            tables.artifacts,
            tables.dimensions,
            tables.properties,
            tables.image_versions,
        ];
        for (name, _) in APP_TABLES {
            assert!(!catalogue.contains(name), "{name}");
        }
    }
}
