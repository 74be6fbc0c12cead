//! Bulk artifact import.
//!
//! Accepts a JSON array of artifact records and upserts each one, keyed by
//! `(source museum code, original id)`. Every record runs in its own
//! transaction: a failing record rolls back only itself and is reported by
//! its index, the rest of the batch still lands.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{MySqlConnection, MySqlPool};
use tracing::{debug, info, warn};

use crate::schema::Schema;

/// Largest batch accepted in one request.
pub const MAX_IMPORT_RECORDS: usize = 5_000;

/// Museum an artifact belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportSource {
    pub museum_code: String,
    #[serde(default)]
    pub museum_name_cn: Option<String>,
}

/// Curated properties of an artifact.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportProperty {
    pub geography: Option<String>,
    pub culture: Option<String>,
    pub artist: Option<String>,
    pub credit_line: Option<String>,
    pub page_link: Option<String>,
}

/// One stored image.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportImage {
    #[serde(default)]
    pub version_type: Option<String>,
    #[serde(default)]
    pub image_link: Option<String>,
    #[serde(default)]
    pub local_path: Option<String>,
}

/// One measurement.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportDimension {
    pub size_type: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub size_value: Option<String>,
    #[serde(default)]
    pub size_unit: Option<String>,
}

/// One artifact record of an import batch.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportRecord {
    pub source: ImportSource,
    #[serde(default, deserialize_with = "text_or_number")]
    pub original_id: Option<String>,
    #[serde(default)]
    pub title_cn: Option<String>,
    #[serde(default)]
    pub title_en: Option<String>,
    #[serde(default)]
    pub description_cn: Option<String>,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub date_cn: Option<String>,
    #[serde(default)]
    pub date_en: Option<String>,
    #[serde(default)]
    pub start_year: Option<i64>,
    #[serde(default)]
    pub end_year: Option<i64>,
    #[serde(default)]
    pub property: Option<ImportProperty>,
    #[serde(default)]
    pub images: Vec<ImportImage>,
    #[serde(default)]
    pub dimensions: Vec<ImportDimension>,
}

/// Accept ids and measurements written either as strings or as numbers.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl ImportRecord {
    /// Check the fields the upsert relies on.
    pub fn validate(&self) -> Result<()> {
        if self.source.museum_code.trim().is_empty() {
            bail!("source.museum_code is required");
        }
        if self.original_id.is_none() {
            bail!("original_id is required");
        }
        if !non_empty(&self.title_cn) && !non_empty(&self.title_en) {
            bail!("title_cn or title_en is required");
        }
        if let (Some(start), Some(end)) = (self.start_year, self.end_year) {
            if start > end {
                bail!("start_year {start} is after end_year {end}");
            }
        }
        for (i, image) in self.images.iter().enumerate() {
            if !non_empty(&image.local_path) && !non_empty(&image.image_link) {
                bail!("images[{i}] needs local_path or image_link");
            }
        }
        for (i, dimension) in self.dimensions.iter().enumerate() {
            if dimension.size_type.trim().is_empty() {
                bail!("dimensions[{i}].size_type is required");
            }
        }
        Ok(())
    }
}

/// A record that did not import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    pub index: usize,
    pub message: String,
}

/// Outcome of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub failed: Vec<ImportFailure>,
}

impl ImportReport {
    fn fail(&mut self, index: usize, error: &anyhow::Error) {
        self.failed.push(ImportFailure {
            index,
            message: format!("{error:#}"),
        });
    }
}

/// Split an import body into raw records.
///
/// Accepts either a bare array or `{"records": [...]}`. Records stay raw so
/// that one malformed record is reported by index instead of failing the
/// whole batch.
pub fn parse_batch(body: &str) -> Result<Vec<serde_json::Value>> {
    let value: serde_json::Value =
        serde_json::from_str(body).context("import body is not valid JSON")?;
    let records = match value {
        serde_json::Value::Array(records) => records,
        serde_json::Value::Object(mut map) => match map.remove("records") {
            Some(serde_json::Value::Array(records)) => records,
            _ => bail!("import body must be an array or an object with a records array"),
        },
        _ => bail!("import body must be an array or an object with a records array"),
    };
    if records.len() > MAX_IMPORT_RECORDS {
        bail!(
            "import batch has {} records, the limit is {MAX_IMPORT_RECORDS}",
            records.len()
        );
    }
    Ok(records)
}

/// Artifact importer.
#[derive(Clone)]
pub struct ImportService {
    pool: MySqlPool,
    schema: Schema,
}

impl ImportService {
    pub fn new(pool: MySqlPool, schema: Schema) -> Self {
        Self { pool, schema }
    }

    /// Import every record, one transaction each.
    pub async fn import(&self, records: Vec<serde_json::Value>) -> ImportReport {
        let mut report = ImportReport::default();

        for (index, raw) in records.into_iter().enumerate() {
            let record = match serde_json::from_value::<ImportRecord>(raw)
                .context("malformed record")
                .and_then(|record| record.validate().map(|()| record))
            {
                Ok(record) => record,
                Err(e) => {
                    report.fail(index, &e);
                    continue;
                }
            };

            match self.import_one(&record).await {
                Ok(artifact_id) => {
                    debug!(index, artifact_id, "imported artifact");
                    report.imported += 1;
                }
                Err(e) => {
                    warn!(index, error = %e, "artifact import failed");
                    report.fail(index, &e);
                }
            }
        }

        info!(
            imported = report.imported,
            failed = report.failed.len(),
            "import finished"
        );
        report
    }

    async fn import_one(&self, record: &ImportRecord) -> Result<i64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to start transaction")?;

        let source_id = self.upsert_source(&mut *tx, &record.source).await?;
        let artifact_id = self.upsert_artifact(&mut *tx, source_id, record).await?;
        self.replace_children(&mut *tx, artifact_id, record).await?;

        tx.commit().await.context("failed to commit transaction")?;
        Ok(artifact_id)
    }

    async fn upsert_source(&self, conn: &mut MySqlConnection, source: &ImportSource) -> Result<i64> {
        let t = &self.schema.tables;
        let f = &self.schema.source;
        let code = source.museum_code.trim();

        let existing: Option<(i64,)> = sqlx::query_as(&format!(
            "SELECT {} FROM {} WHERE {} = ? LIMIT 1",
            f.id, t.sources, f.museum_code
        ))
        .bind(code)
        .fetch_optional(&mut *conn)
        .await
        .context("failed to look up source")?;

        if let Some((source_id,)) = existing {
            if let Some(name) = source.museum_name_cn.as_deref().filter(|n| !n.is_empty()) {
                sqlx::query(&format!(
                    "UPDATE {} SET {} = ? WHERE {} = ?",
                    t.sources, f.museum_name_cn, f.id
                ))
                .bind(name)
                .bind(source_id)
                .execute(&mut *conn)
                .await
                .context("failed to update source")?;
            }
            return Ok(source_id);
        }

        let result = sqlx::query(&format!(
            "INSERT INTO {} ({}, {}) VALUES (?, ?)",
            t.sources, f.museum_code, f.museum_name_cn
        ))
        .bind(code)
        .bind(source.museum_name_cn.as_deref())
        .execute(&mut *conn)
        .await
        .context("failed to insert source")?;
        Ok(result.last_insert_id() as i64)
    }

    async fn upsert_artifact(
        &self,
        conn: &mut MySqlConnection,
        source_id: i64,
        record: &ImportRecord,
    ) -> Result<i64> {
        let t = &self.schema.tables;
        let a = &self.schema.artifact;

        let existing: Option<(i64,)> = sqlx::query_as(&format!(
            "SELECT {id} FROM {table} WHERE {source} = ? AND CAST({original} AS CHAR) = ? LIMIT 1",
            id = a.id,
            table = t.artifacts,
            source = a.source_id,
            original = a.original_id,
        ))
        .bind(source_id)
        .bind(record.original_id.as_deref())
        .fetch_optional(&mut *conn)
        .await
        .context("failed to look up artifact")?;

        let columns = [
            a.title_cn,
            a.title_en,
            a.description_cn,
            a.classification,
            a.material,
            a.date_cn,
            a.date_en,
            a.start_year,
            a.end_year,
        ];

        let sql = match existing {
            Some(_) => format!(
                "UPDATE {} SET {} WHERE {} = ?",
                t.artifacts,
                columns
                    .iter()
                    .map(|c| format!("{c} = ?"))
                    .collect::<Vec<_>>()
                    .join(", "),
                a.id
            ),
            None => format!(
                "INSERT INTO {} ({}, {}, {}) VALUES (?, ?, {})",
                t.artifacts,
                a.source_id,
                a.original_id,
                columns.join(", "),
                vec!["?"; columns.len()].join(", ")
            ),
        };

        let mut query = sqlx::query(&sql);
        if existing.is_none() {
            query = query.bind(source_id).bind(record.original_id.as_deref());
        }
        query = query
            .bind(record.title_cn.as_deref())
            .bind(record.title_en.as_deref())
            .bind(record.description_cn.as_deref())
            .bind(record.classification.as_deref())
            .bind(record.material.as_deref())
            .bind(record.date_cn.as_deref())
            .bind(record.date_en.as_deref())
            .bind(record.start_year)
            .bind(record.end_year);
        if let Some((artifact_id,)) = existing {
            query = query.bind(artifact_id);
        }

        let result = query
            .execute(&mut *conn)
            .await
            .context("failed to write artifact")?;

        Ok(match existing {
            Some((artifact_id,)) => artifact_id,
            None => result.last_insert_id() as i64,
        })
    }

    /// Replace the property, image, and dimension rows of an artifact.
    async fn replace_children(
        &self,
        conn: &mut MySqlConnection,
        artifact_id: i64,
        record: &ImportRecord,
    ) -> Result<()> {
        let t = &self.schema.tables;
        let p = &self.schema.property;
        let iv = &self.schema.image;
        let d = &self.schema.dimension;

        for (table, column) in [
            (t.properties, p.artifact_id),
            (t.image_versions, iv.artifact_id),
            (t.dimensions, d.artifact_id),
        ] {
            sqlx::query(&format!("DELETE FROM {table} WHERE {column} = ?"))
                .bind(artifact_id)
                .execute(&mut *conn)
                .await
                .with_context(|| format!("failed to clear {table}"))?;
        }

        if let Some(property) = &record.property {
            sqlx::query(&format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?)",
                t.properties,
                p.artifact_id,
                p.geography,
                p.culture,
                p.artist,
                p.credit_line,
                p.page_link
            ))
            .bind(artifact_id)
            .bind(property.geography.as_deref())
            .bind(property.culture.as_deref())
            .bind(property.artist.as_deref())
            .bind(property.credit_line.as_deref())
            .bind(property.page_link.as_deref())
            .execute(&mut *conn)
            .await
            .context("failed to insert property")?;
        }

        let image_sql = format!(
            "INSERT INTO {} ({}, {}, {}, {}) VALUES (?, ?, ?, ?)",
            t.image_versions, iv.artifact_id, iv.version_type, iv.image_link, iv.local_path
        );
        for image in &record.images {
            sqlx::query(&image_sql)
                .bind(artifact_id)
                .bind(image.version_type.as_deref())
                .bind(image.image_link.as_deref())
                .bind(image.local_path.as_deref())
                .execute(&mut *conn)
                .await
                .context("failed to insert image")?;
        }

        let dimension_sql = format!(
            "INSERT INTO {} ({}, {}, {}, {}) VALUES (?, ?, ?, ?)",
            t.dimensions, d.artifact_id, d.size_type, d.size_value, d.size_unit
        );
        for dimension in &record.dimensions {
            sqlx::query(&dimension_sql)
                .bind(artifact_id)
                .bind(dimension.size_type.trim())
                .bind(dimension.size_value.as_deref())
                .bind(dimension.size_unit.as_deref())
                .execute(&mut *conn)
                .await
                .context("failed to insert dimension")?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for ImportService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportService").finish()
    }
}
