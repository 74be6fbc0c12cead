//! Application state shared across all handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::MySqlPool;
use sqlx::pool::PoolConnection;
use sqlx::MySql;
use tracing::{info, warn};

use crate::catalog::CatalogQueryBuilder;
use crate::config::Config;
use crate::db;
use crate::schema::Schema;
use crate::services::{AuditService, ImportService};
use crate::theme::ThemeEngine;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// MySQL connection pool (lazily connected).
    db: MySqlPool,

    /// Catalogue schema descriptor, built once.
    schema: Schema,

    /// Theme engine for template rendering.
    theme: Arc<ThemeEngine>,

    /// Audit logging service.
    audit: Arc<AuditService>,

    /// Bulk artifact importer.
    importer: Arc<ImportService>,

    /// Directory served under `/static`.
    static_dir: PathBuf,
}

impl AppState {
    /// Create application state from configuration.
    ///
    /// The database may be down at startup: table setup failures are logged
    /// and the server still starts, serving degraded pages.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = db::create_pool(config).context("failed to create database pool")?;

        match db::ensure_app_tables(&db).await {
            Ok(()) => info!("application tables ready"),
            Err(e) => warn!(error = %e, "database unavailable at startup, pages will degrade"),
        }

        let theme = ThemeEngine::new(&config.templates_dir)
            .with_context(|| format!("failed to load templates from {:?}", config.templates_dir))?;

        Ok(Self::from_parts(db, theme, config.static_dir.clone()))
    }

    /// Assemble state from already-built parts.
    pub fn from_parts(db: MySqlPool, theme: ThemeEngine, static_dir: PathBuf) -> Self {
        let schema = Schema::default();
        let audit = AuditService::new(db.clone(), schema.clone());
        let importer = ImportService::new(db.clone(), schema.clone());

        Self {
            inner: Arc::new(AppStateInner {
                db,
                schema,
                theme: Arc::new(theme),
                audit: Arc::new(audit),
                importer: Arc::new(importer),
                static_dir,
            }),
        }
    }

    /// Get the database pool.
    pub fn db(&self) -> &MySqlPool {
        &self.inner.db
    }

    /// Get the schema descriptor.
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Query builder over the shared schema.
    pub fn queries(&self) -> CatalogQueryBuilder<'_> {
        CatalogQueryBuilder::new(&self.inner.schema)
    }

    /// Get the theme engine.
    pub fn theme(&self) -> &Arc<ThemeEngine> {
        &self.inner.theme
    }

    /// Get the audit service.
    pub fn audit(&self) -> &Arc<AuditService> {
        &self.inner.audit
    }

    /// Get the importer.
    pub fn importer(&self) -> &Arc<ImportService> {
        &self.inner.importer
    }

    /// Directory served under `/static`.
    pub fn static_dir(&self) -> &Path {
        &self.inner.static_dir
    }

    /// Take a connection for one request.
    ///
    /// `None` means the datastore is unreachable; callers render a degraded
    /// page instead of failing.
    pub async fn acquire(&self) -> Option<PoolConnection<MySql>> {
        match self.inner.db.acquire().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                warn!(error = %e, "database connection unavailable");
                None
            }
        }
    }

    /// Check if MySQL is healthy.
    pub async fn database_healthy(&self) -> bool {
        db::check_health(&self.inner.db).await
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("static_dir", &self.inner.static_dir)
            .finish()
    }
}
