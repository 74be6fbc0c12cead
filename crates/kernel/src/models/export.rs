//! Export history shown in the user center.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::MySqlConnection;

/// How many export records the user center lists.
pub const RECENT_EXPORT_LIMIT: i64 = 10;

/// One past export of an album.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ExportRecord {
    pub export_id: i64,
    pub album_id: Option<i64>,
    /// Name of the exported album; `None` once the album is deleted.
    pub album_name: Option<String>,
    pub description: Option<String>,
    pub format: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ExportRecord {
    /// Latest exports of a user, newest first.
    pub async fn recent_for_user(conn: &mut MySqlConnection, user_id: i64) -> Result<Vec<Self>> {
        sqlx::query_as::<_, ExportRecord>(
            "SELECT e.export_id, e.album_id, al.name AS album_name, e.description, e.format, e.status, e.created_at \
             FROM ExportRecords e LEFT JOIN Albums al ON e.album_id = al.album_id \
             WHERE e.user_id = ? ORDER BY e.created_at DESC, e.export_id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(RECENT_EXPORT_LIMIT)
        .fetch_all(conn)
        .await
        .context("failed to list export records")
    }
}
