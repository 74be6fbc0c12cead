//! Artifact listings, detail, and homepage image strips.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::MySqlConnection;

use crate::catalog::{CatalogQueryBuilder, ImageStrip};
use crate::image_path::normalize_image_path;

/// One tile of an artifact grid.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ArtifactCard {
    pub artifact_id: i64,
    pub title: Option<String>,
    pub date_text: Option<String>,
    pub local_path: Option<String>,
}

impl ArtifactCard {
    /// All artifacts, newest first.
    pub async fn list(conn: &mut MySqlConnection, queries: &CatalogQueryBuilder<'_>) -> Result<Vec<Self>> {
        let cards = sqlx::query_as::<_, Self>(&queries.build_listing_query())
            .fetch_all(conn)
            .await
            .context("failed to list artifacts")?;
        Ok(normalize_cards(cards))
    }

    /// All artifacts in random order.
    pub async fn list_random(
        conn: &mut MySqlConnection,
        queries: &CatalogQueryBuilder<'_>,
    ) -> Result<Vec<Self>> {
        let cards = sqlx::query_as::<_, Self>(&queries.build_random_listing_query())
            .fetch_all(conn)
            .await
            .context("failed to list random artifacts")?;
        Ok(normalize_cards(cards))
    }

    /// Cards for an explicit id list, newest first. Unknown ids are skipped.
    pub async fn list_by_ids(
        conn: &mut MySqlConnection,
        queries: &CatalogQueryBuilder<'_>,
        ids: &[i64],
    ) -> Result<Vec<Self>> {
        let Some(sql) = queries.build_artifacts_by_ids_query(ids) else {
            return Ok(Vec::new());
        };
        let cards = sqlx::query_as::<_, Self>(&sql)
            .fetch_all(conn)
            .await
            .context("failed to load artifacts by id")?;
        Ok(normalize_cards(cards))
    }
}

/// Normalize the image path of every card.
pub fn normalize_cards(mut cards: Vec<ArtifactCard>) -> Vec<ArtifactCard> {
    for card in &mut cards {
        card.local_path = normalize_image_path(card.local_path.as_deref());
    }
    cards
}

/// One measurement of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Dimension {
    pub size_type: Option<String>,
    pub size_value: Option<String>,
    pub size_unit: Option<String>,
}

/// Render measurements as `"type: value unit"` entries joined by `"; "`.
///
/// Entries without a value are skipped; `None` when nothing remains.
pub fn format_dimensions(dimensions: &[Dimension]) -> Option<String> {
    let parts: Vec<String> = dimensions
        .iter()
        .filter_map(|d| {
            let value = d.size_value.as_deref().filter(|v| !v.is_empty())?;
            let kind = d.size_type.as_deref().unwrap_or_default();
            Some(match d.size_unit.as_deref().filter(|u| !u.is_empty()) {
                Some(unit) => format!("{kind}: {value} {unit}"),
                None => format!("{kind}: {value}"),
            })
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

/// Columns of the detail query.
#[derive(Debug, Clone, sqlx::FromRow)]
struct DetailRow {
    artifact_id: i64,
    source_id: Option<i64>,
    original_id: Option<String>,
    title: Option<String>,
    title_en: Option<String>,
    description: Option<String>,
    classification: Option<String>,
    medium: Option<String>,
    date_text: Option<String>,
    date_en: Option<String>,
    start_year: Option<i64>,
    end_year: Option<i64>,
    geography: Option<String>,
    culture_name: Option<String>,
    artist_name: Option<String>,
    credit_text: Option<String>,
    source_url: Option<String>,
    dept_name: Option<String>,
}

#[derive(sqlx::FromRow)]
struct PathRow {
    local_path: Option<String>,
}

/// Everything the detail page shows about one artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactDetail {
    pub artifact_id: i64,
    pub source_id: Option<i64>,
    pub original_id: Option<String>,
    pub title: Option<String>,
    pub title_en: Option<String>,
    pub description: Option<String>,
    pub classification: Option<String>,
    pub medium: Option<String>,
    pub date_text: Option<String>,
    pub date_en: Option<String>,
    pub start_year: Option<i64>,
    pub end_year: Option<i64>,
    pub geography: Option<String>,
    pub culture_name: Option<String>,
    pub artist_name: Option<String>,
    pub credit_text: Option<String>,
    pub source_url: Option<String>,
    pub dept_name: Option<String>,
    /// Main image: the first of `image_paths`.
    pub local_path: Option<String>,
    pub image_paths: Vec<String>,
    pub dimensions: Option<String>,
}

impl ArtifactDetail {
    /// Load one artifact with its images and measurements.
    pub async fn find(
        conn: &mut MySqlConnection,
        queries: &CatalogQueryBuilder<'_>,
        artifact_id: i64,
    ) -> Result<Option<Self>> {
        let row = sqlx::query_as::<_, DetailRow>(&queries.build_detail_query())
            .bind(artifact_id)
            .fetch_optional(&mut *conn)
            .await
            .context("failed to fetch artifact detail")?;
        let Some(row) = row else {
            return Ok(None);
        };

        let image_paths: Vec<String> = sqlx::query_as::<_, PathRow>(&queries.build_images_query())
            .bind(artifact_id)
            .fetch_all(&mut *conn)
            .await
            .context("failed to fetch artifact images")?
            .into_iter()
            .filter_map(|r| normalize_image_path(r.local_path.as_deref()))
            .collect();

        let dimensions = sqlx::query_as::<_, Dimension>(&queries.build_dimensions_query())
            .bind(artifact_id)
            .fetch_all(&mut *conn)
            .await
            .context("failed to fetch artifact dimensions")?;

        Ok(Some(Self {
            artifact_id: row.artifact_id,
            source_id: row.source_id,
            original_id: row.original_id,
            title: row.title,
            title_en: row.title_en,
            description: row.description,
            classification: row.classification,
            medium: row.medium,
            date_text: row.date_text,
            date_en: row.date_en,
            start_year: row.start_year,
            end_year: row.end_year,
            geography: row.geography,
            culture_name: row.culture_name,
            artist_name: row.artist_name,
            credit_text: row.credit_text,
            source_url: row.source_url,
            dept_name: row.dept_name,
            local_path: image_paths.first().cloned(),
            image_paths,
            dimensions: format_dimensions(&dimensions),
        }))
    }

    /// Whether an artifact with this id exists.
    pub async fn exists(
        conn: &mut MySqlConnection,
        queries: &CatalogQueryBuilder<'_>,
        artifact_id: i64,
    ) -> Result<bool> {
        let found: Option<(i64,)> = sqlx::query_as(&queries.build_artifact_exists_query())
            .bind(artifact_id)
            .fetch_optional(conn)
            .await
            .context("failed to check artifact existence")?;
        Ok(found.is_some())
    }
}

/// Normalized image paths for one homepage strip.
pub async fn strip_images(
    conn: &mut MySqlConnection,
    queries: &CatalogQueryBuilder<'_>,
    strip: ImageStrip,
) -> Result<Vec<String>> {
    let rows = sqlx::query_as::<_, PathRow>(&queries.build_strip_query(strip))
        .fetch_all(conn)
        .await
        .context("failed to fetch homepage images")?;
    Ok(rows
        .into_iter()
        .filter_map(|r| normalize_image_path(r.local_path.as_deref()))
        .collect())
}
