//! Culture and geography categories.
//!
//! Categories are not stored; they are the distinct non-empty values of a
//! `PROPERTIES` column. Each is addressed by [`facet_key`] so its URL stays
//! stable as counts change.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::MySqlConnection;

use super::artifact::{ArtifactCard, normalize_cards};
use crate::catalog::{CatalogQueryBuilder, CategoryDimension};
use crate::image_path::normalize_image_path;
use crate::search::facet_key;

/// Curated blurbs for the best-known cultures.
const CULTURE_DESCRIPTIONS: &[(&str, &str)] = &[
    ("中华文化", "包含中原、楚、巴蜀、吴越等地域文化遗产。"),
    ("日本文化", "绳文陶器、浮世绘、刀剑与漆器艺术。"),
    ("西亚文化", "美索不达米亚、波斯与伊斯兰文明的瑰宝。"),
    ("埃及文化", "尼罗河流域的法老文明、神庙与墓葬艺术。"),
    ("希腊罗马文化", "古典雕塑、建筑构件与地中海文明遗存。"),
    ("印度文化", "佛教造像、印度教神像与南亚次大陆艺术。"),
];

/// Description shown on a category tile.
pub fn describe(dimension: CategoryDimension, name: &str) -> String {
    match dimension {
        CategoryDimension::Culture => CULTURE_DESCRIPTIONS
            .iter()
            .find(|(culture, _)| *culture == name)
            .map(|(_, text)| (*text).to_string())
            .unwrap_or_else(|| format!("探索{name}的丰富文化遗产和艺术珍品。")),
        CategoryDimension::Geography => format!("探索{name}地区的丰富文化遗产和艺术珍品。"),
    }
}

#[derive(sqlx::FromRow)]
struct BrowseRow {
    name: String,
    artifact_count: i64,
    representative_image: Option<String>,
}

/// One tile on a browse page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub key: String,
    pub name: String,
    pub artifact_count: i64,
    pub representative_image: Option<String>,
    pub description: String,
}

impl CategorySummary {
    fn from_row(dimension: CategoryDimension, row: BrowseRow) -> Self {
        Self {
            key: facet_key(&row.name),
            description: describe(dimension, &row.name),
            representative_image: normalize_image_path(row.representative_image.as_deref()),
            artifact_count: row.artifact_count,
            name: row.name,
        }
    }

    /// Every category of a dimension, most populated first.
    pub async fn browse(
        conn: &mut MySqlConnection,
        queries: &CatalogQueryBuilder<'_>,
        dimension: CategoryDimension,
    ) -> Result<Vec<Self>> {
        let rows = sqlx::query_as::<_, BrowseRow>(&queries.build_category_browse_query(dimension))
            .fetch_all(conn)
            .await
            .with_context(|| format!("failed to browse {} categories", dimension.as_str()))?;
        Ok(rows
            .into_iter()
            .map(|row| Self::from_row(dimension, row))
            .collect())
    }
}

/// A resolved category with its artifacts.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryPage {
    pub key: String,
    pub name: String,
    pub description: String,
    pub artifacts: Vec<ArtifactCard>,
}

impl CategoryPage {
    /// Resolve `key` and load its artifacts; `None` for an unknown key.
    pub async fn load(
        conn: &mut MySqlConnection,
        queries: &CatalogQueryBuilder<'_>,
        dimension: CategoryDimension,
        key: &str,
    ) -> Result<Option<Self>> {
        if !is_well_formed_key(key) {
            return Ok(None);
        }

        let lookup = queries.build_category_lookup_query(dimension, key);
        let Some((name,)) = lookup
            .fetch_optional::<(String,)>(&mut *conn)
            .await
            .context("failed to resolve category key")?
        else {
            return Ok(None);
        };

        let artifacts = queries
            .build_category_artifacts_query(dimension, &name)
            .fetch_all::<ArtifactCard>(&mut *conn)
            .await
            .context("failed to load category artifacts")?;

        Ok(Some(Self {
            key: facet_key(&name),
            description: describe(dimension, &name),
            artifacts: normalize_cards(artifacts),
            name,
        }))
    }
}

/// Category keys are 16 hex digits.
pub fn is_well_formed_key(key: &str) -> bool {
    key.len() == 16 && key.chars().all(|c| c.is_ascii_hexdigit())
}
