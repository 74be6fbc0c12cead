//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 5000).
    pub port: u16,

    /// MySQL connection URL.
    ///
    /// Taken from `DATABASE_URL`, or assembled from `DB_HOST`, `DB_USER`,
    /// `DB_PASSWORD` and `DB_NAME`.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Seconds to wait for a connection before a page degrades (default: 3).
    pub database_acquire_timeout_secs: u64,

    /// Redis connection URL for sessions.
    pub redis_url: String,

    /// Directory holding the Tera templates (default: ./templates).
    pub templates_dir: PathBuf,

    /// Directory served under `/static` (default: ./static).
    pub static_dir: PathBuf,

    /// Whether the session cookie carries the `Secure` attribute (default: false).
    pub cookie_secure: bool,

    /// Cookie SameSite policy: "strict", "lax", or "none" (default: "lax").
    pub cookie_same_site: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url = match env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => database_url_from_parts(
                &env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
                &env::var("DB_USER").unwrap_or_else(|_| "root".to_string()),
                &env::var("DB_PASSWORD").unwrap_or_default(),
                &env::var("DB_NAME").unwrap_or_else(|_| "project".to_string()),
            )?,
        };

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let database_acquire_timeout_secs = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .context("DATABASE_ACQUIRE_TIMEOUT_SECS must be a valid u64")?;

        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let templates_dir = env::var("TEMPLATES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./templates"));

        let static_dir = env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./static"));

        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let cookie_same_site = env::var("COOKIE_SAME_SITE")
            .unwrap_or_else(|_| "lax".to_string())
            .to_lowercase();

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            database_acquire_timeout_secs,
            redis_url,
            templates_dir,
            static_dir,
            cookie_secure,
            cookie_same_site,
        })
    }
}

/// Assemble a `mysql://` URL from its parts, percent-encoding credentials.
pub fn database_url_from_parts(
    host: &str,
    user: &str,
    password: &str,
    database: &str,
) -> Result<String> {
    let mut url = url::Url::parse(&format!("mysql://{host}/"))
        .with_context(|| format!("DB_HOST is not a valid host: {host}"))?;
    url.set_path(database);
    url.set_username(user)
        .map_err(|()| anyhow::anyhow!("DB_USER cannot be used in a URL"))?;
    if !password.is_empty() {
        url.set_password(Some(password))
            .map_err(|()| anyhow::anyhow!("DB_PASSWORD cannot be used in a URL"))?;
    }
    Ok(url.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn url_from_parts() {
        assert_eq!(
            database_url_from_parts("localhost", "root", "", "project").unwrap(),
            "mysql://root@localhost/project"
        );
        assert_eq!(
            database_url_from_parts("db:3307", "curio", "p@ss word", "museum").unwrap(),
            "mysql://curio:p%40ss%20word@db:3307/museum"
        );
    }
}
