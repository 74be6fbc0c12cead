//! Audit logging service.
//!
//! Records account, album, favorite, and import actions in the `LOGS` table
//! and lists them for the admin console.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_query::{Alias, Expr, MysqlQueryBuilder, Order, Query};
use serde::Serialize;
use sqlx::MySqlPool;
use tracing::debug;

use crate::schema::Schema;

/// Default number of entries listed by the admin console.
pub const DEFAULT_AUDIT_LIMIT: u64 = 50;

/// Upper bound on a requested listing size.
pub const MAX_AUDIT_LIMIT: u64 = 500;

/// One row of the audit trail.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: i64,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub user_id: Option<i64>,
    pub ip_address: Option<String>,
    /// JSON document, stored as text.
    pub details: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Audit logging service.
#[derive(Clone)]
pub struct AuditService {
    pool: MySqlPool,
    schema: Schema,
}

impl AuditService {
    /// Create a new audit service.
    pub fn new(pool: MySqlPool, schema: Schema) -> Self {
        Self { pool, schema }
    }

    /// Sanitize an IP address string for storage.
    ///
    /// Validates that the string is a valid IP address (v4 or v6). If not,
    /// returns "invalid" to prevent arbitrary string injection.
    fn sanitize_ip(ip: &str) -> &str {
        if ip.parse::<std::net::IpAddr>().is_ok() {
            ip
        } else {
            "invalid"
        }
    }

    /// Log an auditable action.
    pub async fn log(
        &self,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        user_id: Option<i64>,
        ip_address: &str,
        details: serde_json::Value,
    ) -> Result<()> {
        let ip_address = Self::sanitize_ip(ip_address);
        let f = &self.schema.log;

        let sql = format!(
            "INSERT INTO {} ({}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?)",
            self.schema.tables.logs,
            f.action,
            f.entity_type,
            f.entity_id,
            f.user_id,
            f.ip_address,
            f.details,
        );
        sqlx::query(&sql)
            .bind(action)
            .bind(entity_type)
            .bind(entity_id)
            .bind(user_id)
            .bind(ip_address)
            .bind(details.to_string())
            .execute(&self.pool)
            .await
            .context("failed to write audit log")?;

        debug!(
            action = %action,
            entity_type = %entity_type,
            entity_id = %entity_id,
            "audit log entry created"
        );

        Ok(())
    }

    /// Log an action, downgrading a failure to a warning.
    ///
    /// Used on request paths where the audited action has already succeeded.
    pub async fn record(
        &self,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        user_id: Option<i64>,
        ip_address: &str,
        details: serde_json::Value,
    ) {
        if let Err(e) = self
            .log(action, entity_type, entity_id, user_id, ip_address, details)
            .await
        {
            tracing::warn!(error = %e, action = %action, "failed to write audit entry");
        }
    }

    /// Build the listing statement, newest first.
    fn recent_sql(&self, limit: u64, action: Option<&str>) -> (String, sea_query::Values) {
        let f = &self.schema.log;
        let mut query = Query::select();
        query
            .expr_as(Expr::col(Alias::new(f.id)), Alias::new("id"))
            .expr_as(Expr::col(Alias::new(f.action)), Alias::new("action"))
            .expr_as(Expr::col(Alias::new(f.entity_type)), Alias::new("entity_type"))
            .expr_as(Expr::col(Alias::new(f.entity_id)), Alias::new("entity_id"))
            .expr_as(Expr::col(Alias::new(f.user_id)), Alias::new("user_id"))
            .expr_as(Expr::col(Alias::new(f.ip_address)), Alias::new("ip_address"))
            .expr_as(Expr::col(Alias::new(f.details)), Alias::new("details"))
            .expr_as(Expr::col(Alias::new(f.created_at)), Alias::new("created_at"))
            .from(Alias::new(self.schema.tables.logs))
            .order_by(Alias::new(f.created_at), Order::Desc)
            .order_by(Alias::new(f.id), Order::Desc)
            .limit(limit.clamp(1, MAX_AUDIT_LIMIT));

        if let Some(action) = action.filter(|a| !a.is_empty()) {
            query.and_where(Expr::col(Alias::new(f.action)).eq(action));
        }

        query.build(MysqlQueryBuilder)
    }

    /// Most recent entries, optionally restricted to one action.
    pub async fn recent(&self, limit: u64, action: Option<&str>) -> Result<Vec<AuditEntry>> {
        let (sql, values) = self.recent_sql(limit, action);

        let mut query = sqlx::query_as::<_, AuditEntry>(&sql);
        for value in values.0 {
            query = match value {
                sea_query::Value::String(Some(s)) => query.bind(*s),
                sea_query::Value::BigUnsigned(Some(n)) => query.bind(n),
                sea_query::Value::Unsigned(Some(n)) => query.bind(n),
                sea_query::Value::BigInt(Some(n)) => query.bind(n),
                other => anyhow::bail!("unsupported audit query value: {other:?}"),
            };
        }

        query
            .fetch_all(&self.pool)
            .await
            .context("failed to list audit log")
    }
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService").finish()
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use sqlx::mysql::MySqlPoolOptions;

    use super::*;

    fn service() -> AuditService {
        let pool = MySqlPoolOptions::new()
            .connect_lazy("mysql://nobody@127.0.0.1:1/none")
            .unwrap();
        AuditService::new(pool, Schema::default())
    }

    #[test]
    fn ip_address_sanitization() {
        assert_eq!(AuditService::sanitize_ip("192.168.1.1"), "192.168.1.1");
        assert_eq!(AuditService::sanitize_ip("::1"), "::1");
        assert_eq!(AuditService::sanitize_ip("2001:db8::1"), "2001:db8::1");
        assert_eq!(AuditService::sanitize_ip("not-an-ip"), "invalid");
        assert_eq!(AuditService::sanitize_ip(""), "invalid");
        assert_eq!(
            AuditService::sanitize_ip("192.168.1.1; DROP TABLE"),
            "invalid"
        );
    }

    #[tokio::test]
    async fn listing_without_filter() {
        let (sql, values) = service().recent_sql(20, None);
        assert!(sql.starts_with("SELECT `Log_PK` AS `id`"));
        assert!(sql.contains("FROM `LOGS`"));
        assert!(sql.contains("ORDER BY `Created_At` DESC, `Log_PK` DESC"));
        assert!(!sql.contains("WHERE"));
        assert_eq!(values.0.len(), 1);
    }

    #[tokio::test]
    async fn listing_with_action_filter_binds_it() {
        let (sql, values) = service().recent_sql(20, Some("import"));
        assert!(sql.contains("WHERE `Action` = ?"));
        assert_eq!(values.0.len(), 2);
        assert_eq!(values.0[0], sea_query::Value::String(Some(Box::new("import".into()))));
    }

    #[tokio::test]
    async fn blank_action_is_no_filter() {
        let (sql, _) = service().recent_sql(20, Some(""));
        assert!(!sql.contains("WHERE"));
    }

    #[tokio::test]
    async fn limit_is_clamped() {
        let (_, values) = service().recent_sql(100_000, None);
        assert_eq!(values.0, vec![sea_query::Value::BigUnsigned(Some(MAX_AUDIT_LIMIT))]);
    }
}
