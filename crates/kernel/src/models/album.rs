//! Albums: named, user-owned sets of collected artifacts.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::MySqlConnection;

use super::artifact::{ArtifactCard, normalize_cards};
use crate::image_path::normalize_image_path;
use crate::schema::Schema;
use crate::search::{FacetDimension, SearchRow, facet_table};

/// Name of the album every user has and cannot delete.
pub const DEFAULT_ALBUM_NAME: &str = "默认收藏夹";

/// Album id used in templates for the guest's session-backed album.
pub const GUEST_ALBUM_ID: &str = "guest_default";

/// Album with item count and cover image.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Album {
    pub album_id: i64,
    pub user_id: i64,
    pub name: String,
    pub is_public: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub item_count: i64,
    /// Image of the most recently collected artifact.
    pub cover_image: Option<String>,
}

impl Album {
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_ALBUM_NAME
    }

    /// Summary select shared by the list and single-album lookups; the
    /// caller appends the `WHERE` clause.
    fn summary_select(schema: &Schema) -> String {
        format!(
            "SELECT al.album_id, al.user_id, al.name, al.is_public, \
             al.created_at, COUNT(DISTINCT c.collection_id) AS item_count, \
             (SELECT iv.{path} FROM Collections c2 \
              INNER JOIN {artifacts} art ON c2.artifact_id = art.{id} \
              LEFT JOIN {images} iv ON art.{id} = iv.{image_artifact} \
              WHERE c2.album_id = al.album_id AND iv.{path} IS NOT NULL AND iv.{path} != '' \
              ORDER BY c2.created_at DESC, c2.collection_id DESC LIMIT 1) AS cover_image \
             FROM Albums al LEFT JOIN Collections c ON al.album_id = c.album_id",
            path = schema.image.local_path,
            artifacts = schema.tables.artifacts,
            images = schema.tables.image_versions,
            id = schema.artifact.id,
            image_artifact = schema.image.artifact_id,
        )
    }

    fn normalized(mut self) -> Self {
        self.cover_image = normalize_image_path(self.cover_image.as_deref());
        self
    }

    /// Albums of one user, newest first.
    pub async fn list_for_user(
        conn: &mut MySqlConnection,
        schema: &Schema,
        user_id: i64,
    ) -> Result<Vec<Self>> {
        let sql = format!(
            "{} WHERE al.user_id = ? GROUP BY al.album_id \
             ORDER BY al.created_at DESC, al.album_id DESC",
            Self::summary_select(schema)
        );
        let albums = sqlx::query_as::<_, Album>(&sql)
            .bind(user_id)
            .fetch_all(conn)
            .await
            .context("failed to list albums")?;
        Ok(albums.into_iter().map(Self::normalized).collect())
    }

    /// One album, only if `user_id` owns it.
    pub async fn find_owned(
        conn: &mut MySqlConnection,
        schema: &Schema,
        user_id: i64,
        album_id: i64,
    ) -> Result<Option<Self>> {
        let sql = format!(
            "{} WHERE al.album_id = ? AND al.user_id = ? GROUP BY al.album_id",
            Self::summary_select(schema)
        );
        let album = sqlx::query_as::<_, Album>(&sql)
            .bind(album_id)
            .bind(user_id)
            .fetch_optional(conn)
            .await
            .context("failed to fetch album")?;
        Ok(album.map(Self::normalized))
    }

    /// Create an album and return its id.
    pub async fn create(
        conn: &mut MySqlConnection,
        user_id: i64,
        name: &str,
        is_public: bool,
    ) -> Result<i64> {
        let result = sqlx::query("INSERT INTO Albums (user_id, name, is_public) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(name)
            .bind(is_public)
            .execute(conn)
            .await
            .context("failed to create album")?;
        Ok(result.last_insert_id() as i64)
    }

    /// Id of the user's default album, creating it if missing.
    pub async fn default_for_user(conn: &mut MySqlConnection, user_id: i64) -> Result<i64> {
        let existing: Option<(i64,)> = sqlx::query_as(
            "SELECT album_id FROM Albums WHERE user_id = ? AND name = ? ORDER BY album_id LIMIT 1",
        )
        .bind(user_id)
        .bind(DEFAULT_ALBUM_NAME)
        .fetch_optional(&mut *conn)
        .await
        .context("failed to look up default album")?;

        match existing {
            Some((album_id,)) => Ok(album_id),
            None => Self::create(conn, user_id, DEFAULT_ALBUM_NAME, true).await,
        }
    }

    /// Rename an owned album.
    pub async fn rename(
        conn: &mut MySqlConnection,
        user_id: i64,
        album_id: i64,
        name: &str,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE Albums SET name = ? WHERE album_id = ? AND user_id = ?")
            .bind(name)
            .bind(album_id)
            .bind(user_id)
            .execute(conn)
            .await
            .context("failed to rename album")?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an owned album; its collection rows cascade.
    pub async fn delete(conn: &mut MySqlConnection, user_id: i64, album_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM Albums WHERE album_id = ? AND user_id = ?")
            .bind(album_id)
            .bind(user_id)
            .execute(conn)
            .await
            .context("failed to delete album")?;
        Ok(result.rows_affected() > 0)
    }

    /// Artifact ids in an album, in collection order.
    pub async fn artifact_ids(conn: &mut MySqlConnection, album_id: i64) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT artifact_id FROM Collections WHERE album_id = ? \
             GROUP BY artifact_id ORDER BY MIN(created_at), MIN(collection_id)",
        )
        .bind(album_id)
        .fetch_all(conn)
        .await
        .context("failed to list album artifact ids")?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Add an artifact; returns false when it was already present.
    pub async fn add_artifact(
        conn: &mut MySqlConnection,
        album_id: i64,
        artifact_id: i64,
    ) -> Result<bool> {
        let existing: Option<(i64,)> = sqlx::query_as(
            "SELECT collection_id FROM Collections WHERE album_id = ? AND artifact_id = ? LIMIT 1",
        )
        .bind(album_id)
        .bind(artifact_id)
        .fetch_optional(&mut *conn)
        .await
        .context("failed to check album membership")?;
        if existing.is_some() {
            return Ok(false);
        }

        sqlx::query("INSERT INTO Collections (album_id, artifact_id) VALUES (?, ?)")
            .bind(album_id)
            .bind(artifact_id)
            .execute(conn)
            .await
            .context("failed to add artifact to album")?;
        Ok(true)
    }

    /// Remove an artifact; returns false when it was not in the album.
    pub async fn remove_artifact(
        conn: &mut MySqlConnection,
        album_id: i64,
        artifact_id: i64,
    ) -> Result<bool> {
        let result = sqlx::query("DELETE FROM Collections WHERE album_id = ? AND artifact_id = ?")
            .bind(album_id)
            .bind(artifact_id)
            .execute(conn)
            .await
            .context("failed to remove artifact from album")?;
        Ok(result.rows_affected() > 0)
    }

    /// Grid cards of an album, oldest collected first.
    pub async fn artifacts(
        conn: &mut MySqlConnection,
        schema: &Schema,
        album_id: i64,
    ) -> Result<Vec<ArtifactCard>> {
        let sql = format!(
            "SELECT a.{id} AS artifact_id, a.{title} AS title, a.{date} AS date_text, \
             ANY_VALUE(iv.{path}) AS local_path \
             FROM Collections c \
             INNER JOIN {artifacts} a ON c.artifact_id = a.{id} \
             LEFT JOIN {images} iv ON a.{id} = iv.{image_artifact} \
             WHERE c.album_id = ? \
             GROUP BY a.{id}, a.{title}, a.{date} \
             ORDER BY MIN(c.created_at) ASC",
            id = schema.artifact.id,
            title = schema.artifact.title_cn,
            date = schema.artifact.date_cn,
            path = schema.image.local_path,
            artifacts = schema.tables.artifacts,
            images = schema.tables.image_versions,
            image_artifact = schema.image.artifact_id,
        );
        let cards = sqlx::query_as::<_, ArtifactCard>(&sql)
            .bind(album_id)
            .fetch_all(conn)
            .await
            .context("failed to load album artifacts")?;
        Ok(normalize_cards(cards))
    }

    /// Every distinct artifact a user has collected, shaped for facet
    /// extraction.
    pub async fn collected_rows(
        conn: &mut MySqlConnection,
        schema: &Schema,
        user_id: i64,
    ) -> Result<Vec<SearchRow>> {
        let sql = format!(
            "SELECT a.{id} AS artifact_id, a.{title} AS title, a.{date} AS date_text, \
             NULL AS local_path, ANY_VALUE(p.{culture}) AS culture_name, \
             a.{material} AS medium, a.{start} AS start_year \
             FROM Collections c \
             INNER JOIN Albums al ON c.album_id = al.album_id \
             INNER JOIN {artifacts} a ON c.artifact_id = a.{id} \
             LEFT JOIN {properties} p ON a.{id} = p.{property_artifact} \
             WHERE al.user_id = ? \
             GROUP BY a.{id}",
            id = schema.artifact.id,
            title = schema.artifact.title_cn,
            date = schema.artifact.date_cn,
            culture = schema.property.culture,
            material = schema.artifact.material,
            start = schema.artifact.start_year,
            artifacts = schema.tables.artifacts,
            properties = schema.tables.properties,
            property_artifact = schema.property.artifact_id,
        );
        sqlx::query_as::<_, SearchRow>(&sql)
            .bind(user_id)
            .fetch_all(conn)
            .await
            .context("failed to load collected artifacts")
    }
}

/// Share of one material within a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialShare {
    pub label: String,
    pub count: i64,
    /// Whole-number percentage of the collection.
    pub percent: i64,
}

/// Aggregate view of a user's collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionStats {
    pub total_count: i64,
    pub material_composition: Vec<MaterialShare>,
}

impl CollectionStats {
    /// Materials beyond this many are folded into "其他".
    const MAX_MATERIALS: usize = 5;

    /// Summarize collected rows using the search facet extractor.
    pub fn from_rows(rows: &[SearchRow]) -> Self {
        let total_count = rows.len() as i64;
        let mut table = facet_table(rows, FacetDimension::Material);

        let mut shares: Vec<(String, i64)> = Vec::new();
        let rest: i64 = if table.len() > Self::MAX_MATERIALS {
            table
                .split_off(Self::MAX_MATERIALS)
                .iter()
                .map(|f| f.count)
                .sum()
        } else {
            0
        };
        shares.extend(table.into_iter().map(|f| (f.label, f.count)));
        if rest > 0 {
            shares.push(("其他".to_string(), rest));
        }

        let material_composition = shares
            .into_iter()
            .map(|(label, count)| MaterialShare {
                percent: if total_count == 0 {
                    0
                } else {
                    (count * 100 + total_count / 2) / total_count
                },
                label,
                count,
            })
            .collect();

        Self {
            total_count,
            material_composition,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn row(id: i64, medium: Option<&str>) -> SearchRow {
        SearchRow {
            artifact_id: id,
            title: None,
            date_text: None,
            local_path: None,
            culture_name: None,
            medium: medium.map(str::to_string),
            start_year: None,
        }
    }

    #[test]
    fn stats_of_empty_collection() {
        let stats = CollectionStats::from_rows(&[]);
        assert_eq!(stats.total_count, 0);
        assert!(stats.material_composition.is_empty());
    }

    #[test]
    fn stats_count_materials_with_percentages() {
        let rows = vec![
            row(1, Some("青铜")),
            row(2, Some("青铜")),
            row(3, Some("玉")),
            row(4, None),
        ];
        let stats = CollectionStats::from_rows(&rows);
        assert_eq!(stats.total_count, 4);
        assert_eq!(
            stats.material_composition,
            vec![
                MaterialShare {
                    label: "青铜".into(),
                    count: 2,
                    percent: 50
                },
                MaterialShare {
                    label: "玉".into(),
                    count: 1,
                    percent: 25
                },
            ]
        );
    }

    #[test]
    fn long_tail_folds_into_other() {
        let materials = ["a", "b", "c", "d", "e", "f", "g"];
        let rows: Vec<_> = materials
            .iter()
            .enumerate()
            .map(|(i, m)| row(i as i64, Some(m)))
            .collect();
        let stats = CollectionStats::from_rows(&rows);
        assert_eq!(stats.material_composition.len(), 6);
        let other = stats.material_composition.last().unwrap();
        assert_eq!(other.label, "其他");
        assert_eq!(other.count, 2);
    }

    #[test]
    fn default_album_detection() {
        let album = Album {
            album_id: 1,
            user_id: 1,
            name: DEFAULT_ALBUM_NAME.into(),
            is_public: true,
            created_at: None,
            item_count: 0,
            cover_image: None,
        };
        assert!(album.is_default());
    }
}
