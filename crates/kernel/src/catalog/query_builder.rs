//! Catalogue query builder.
//!
//! Every method is pure: it interpolates the schema descriptor into SQL text
//! and returns it. Values are never interpolated; they are bound as
//! positional `?` parameters by the caller (see [`BoundQuery`]).
//!
//! [`BoundQuery`]: super::BoundQuery

use sea_query::{Alias, Expr, JoinType, MysqlQueryBuilder, Order, Query};

use super::{BoundQuery, CategoryDimension, ImageStrip};
use crate::schema::Schema;

/// Number of `LIKE ?` clauses in the search query; the search pattern must be
/// bound this many times.
pub const SEARCH_COLUMN_COUNT: usize = 10;

/// Images shown per homepage strip.
pub const HOMEPAGE_STRIP_LIMIT: u32 = 6;

/// Builds catalogue SQL from a [`Schema`].
#[derive(Debug, Clone, Copy)]
pub struct CatalogQueryBuilder<'a> {
    schema: &'a Schema,
}

impl<'a> CatalogQueryBuilder<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Physical column holding a category dimension on `PROPERTIES`.
    fn dimension_column(&self, dimension: CategoryDimension) -> &'static str {
        match dimension {
            CategoryDimension::Culture => self.schema.property.culture,
            CategoryDimension::Geography => self.schema.property.geography,
        }
    }

    /// Grid columns shared by every artifact listing.
    fn listing_select(&self) -> String {
        let a = &self.schema.artifact;
        let mut select = vec![
            format!("a.{} AS artifact_id", a.id),
            format!("a.{} AS title", a.title_cn),
            format!("a.{} AS date_text", a.date_cn),
        ];
        select.extend(self.schema.images_join().select);
        select.join(", ")
    }

    /// All artifacts, newest first, with one arbitrary image each.
    pub fn build_listing_query(&self) -> String {
        let s = self.schema;
        format!(
            "SELECT {} FROM {} a {} GROUP BY a.{} ORDER BY a.{} DESC",
            self.listing_select(),
            s.tables.artifacts,
            s.images_join().left_join(),
            s.artifact.id,
            s.artifact.id,
        )
    }

    /// All artifacts in random order, with one arbitrary image each.
    pub fn build_random_listing_query(&self) -> String {
        let s = self.schema;
        format!(
            "SELECT {} FROM {} a {} GROUP BY a.{} ORDER BY RAND()",
            self.listing_select(),
            s.tables.artifacts,
            s.images_join().left_join(),
            s.artifact.id,
        )
    }

    /// Full attribute set of one artifact. Binds: artifact id.
    pub fn build_detail_query(&self) -> String {
        let s = self.schema;
        let a = &s.artifact;
        let properties = s.properties_join();
        let sources = s.sources_join();

        let mut select = vec![
            format!("a.{} AS artifact_id", a.id),
            format!("a.{} AS source_id", a.source_id),
            format!("CAST(a.{} AS CHAR) AS original_id", a.original_id),
            format!("a.{} AS title", a.title_cn),
            format!("a.{} AS title_en", a.title_en),
            format!("a.{} AS description", a.description_cn),
            format!("a.{} AS classification", a.classification),
            format!("a.{} AS medium", a.material),
            format!("a.{} AS date_text", a.date_cn),
            format!("a.{} AS date_en", a.date_en),
            format!("a.{} AS start_year", a.start_year),
            format!("a.{} AS end_year", a.end_year),
        ];
        select.extend(properties.select.iter().cloned());
        select.push(format!("s.{} AS dept_name", s.source.museum_name_cn));

        format!(
            "SELECT {} FROM {} a {} {} WHERE a.{} = ?",
            select.join(", "),
            s.tables.artifacts,
            properties.left_join(),
            sources.left_join(),
            a.id,
        )
    }

    /// Every image path of one artifact in stable order. Binds: artifact id.
    pub fn build_images_query(&self) -> String {
        let s = self.schema;
        let i = &s.image;
        format!(
            "SELECT iv.{} AS local_path FROM {} iv WHERE iv.{} = ? ORDER BY iv.{}",
            i.local_path, s.tables.image_versions, i.artifact_id, i.id,
        )
    }

    /// Measurement rows of one artifact. Binds: artifact id.
    pub fn build_dimensions_query(&self) -> String {
        let s = self.schema;
        let d = &s.dimension;
        format!(
            "SELECT d.{} AS size_type, CAST(d.{} AS CHAR) AS size_value, d.{} AS size_unit \
             FROM {} d WHERE d.{} = ? ORDER BY d.{}",
            d.size_type,
            d.size_value,
            d.size_unit,
            s.tables.dimensions,
            d.artifact_id,
            d.id,
        )
    }

    /// Case-insensitive substring search across ten columns.
    ///
    /// Returns `None` for an empty term. Otherwise the query carries exactly
    /// [`SEARCH_COLUMN_COUNT`] `LIKE ?` placeholders, each of which must be
    /// bound to the same `%term%` pattern (see [`Self::bind_search`]).
    pub fn build_search_query(&self, term: &str) -> Option<String> {
        if term.is_empty() {
            return None;
        }

        let s = self.schema;
        let a = &s.artifact;
        let p = &s.property;
        let i = &s.image;

        let like_columns = [
            format!("a.{}", a.title_cn),
            format!("a.{}", a.title_en),
            format!("a.{}", a.date_cn),
            format!("a.{}", a.date_en),
            format!("a.{}", a.material),
            format!("a.{}", a.description_cn),
            format!("COALESCE(p.{}, '')", p.artist),
            format!("COALESCE(p.{}, '')", p.culture),
            format!("COALESCE(p.{}, '')", p.geography),
            format!("COALESCE(s.{}, '')", s.source.museum_name_cn),
        ];
        let where_clause = like_columns
            .iter()
            .map(|column| format!("{column} LIKE ?"))
            .collect::<Vec<_>>()
            .join(" OR ");

        Some(format!(
            "SELECT DISTINCT a.{id} AS artifact_id, a.{title} AS title, a.{date} AS date_text, \
             ANY_VALUE(iv.{path}) AS local_path, ANY_VALUE(p.{culture}) AS culture_name, \
             ANY_VALUE(a.{material}) AS medium, ANY_VALUE(a.{start}) AS start_year \
             FROM {artifacts} a {images} {properties} {sources} \
             WHERE {where_clause} \
             GROUP BY a.{id} ORDER BY a.{id} DESC",
            id = a.id,
            title = a.title_cn,
            date = a.date_cn,
            path = i.local_path,
            culture = p.culture,
            material = a.material,
            start = a.start_year,
            artifacts = s.tables.artifacts,
            images = s.images_join().left_join(),
            properties = s.properties_join().left_join(),
            sources = s.sources_join().left_join(),
        ))
    }

    /// Search query bound to the `%term%` pattern once per `LIKE` clause.
    pub fn bind_search(&self, term: &str) -> Option<BoundQuery> {
        let sql = self.build_search_query(term)?;
        let pattern = format!("%{term}%");
        Some(BoundQuery::new(sql, vec![pattern; SEARCH_COLUMN_COUNT]))
    }

    /// Distinct values of one dimension with their artifact counts.
    ///
    /// NULL and empty values and zero-count groups are excluded. Ordered by
    /// count descending, then name ascending.
    pub fn build_category_browse_query(&self, dimension: CategoryDimension) -> String {
        let s = self.schema;
        let column = self.dimension_column(dimension);
        format!(
            "SELECT p.{column} AS name, COUNT(DISTINCT a.{id}) AS artifact_count, \
             ANY_VALUE(iv.{path}) AS representative_image \
             FROM {properties} p \
             LEFT JOIN {artifacts} a ON p.{p_artifact} = a.{id} \
             LEFT JOIN {images} iv ON a.{id} = iv.{i_artifact} \
             WHERE p.{column} IS NOT NULL AND p.{column} != '' \
             GROUP BY p.{column} \
             HAVING artifact_count > 0 \
             ORDER BY artifact_count DESC, p.{column}",
            id = s.artifact.id,
            path = s.image.local_path,
            properties = s.tables.properties,
            artifacts = s.tables.artifacts,
            images = s.tables.image_versions,
            p_artifact = s.property.artifact_id,
            i_artifact = s.image.artifact_id,
        )
    }

    /// Artifacts carrying one exact dimension value, newest first.
    pub fn build_category_artifacts_query(
        &self,
        dimension: CategoryDimension,
        value: &str,
    ) -> BoundQuery {
        let s = self.schema;
        let sql = format!(
            "SELECT {} FROM {} a {} {} WHERE p.{} = ? GROUP BY a.{} ORDER BY a.{} DESC",
            self.listing_select(),
            s.tables.artifacts,
            s.properties_join().left_join(),
            s.images_join().left_join(),
            self.dimension_column(dimension),
            s.artifact.id,
            s.artifact.id,
        );
        BoundQuery::new(sql, vec![value.to_string()])
    }

    /// Resolve a facet key (see [`crate::search::facet_key`]) back to the
    /// dimension value it was derived from.
    pub fn build_category_lookup_query(&self, dimension: CategoryDimension, key: &str) -> BoundQuery {
        let s = self.schema;
        let column = self.dimension_column(dimension);
        let sql = format!(
            "SELECT p.{column} AS name FROM {properties} p \
             WHERE p.{column} IS NOT NULL AND p.{column} != '' \
             AND LEFT(SHA2(p.{column}, 256), 16) = ? LIMIT 1",
            properties = s.tables.properties,
        );
        BoundQuery::new(sql, vec![key.to_ascii_lowercase()])
    }

    /// Representative image paths for a homepage strip.
    pub fn build_strip_query(&self, strip: ImageStrip) -> String {
        let s = self.schema;
        let i = &s.image;
        let a = &s.artifact;
        match strip {
            ImageStrip::Random => format!(
                "SELECT iv.{path} AS local_path FROM {images} iv \
                 INNER JOIN {artifacts} a ON iv.{i_artifact} = a.{id} \
                 WHERE iv.{path} IS NOT NULL AND iv.{path} != '' \
                 ORDER BY RAND() LIMIT {HOMEPAGE_STRIP_LIMIT}",
                path = i.local_path,
                images = s.tables.image_versions,
                artifacts = s.tables.artifacts,
                i_artifact = i.artifact_id,
                id = a.id,
            ),
            ImageStrip::Dimension(dimension) => {
                let column = self.dimension_column(dimension);
                format!(
                    "SELECT DISTINCT iv.{path} AS local_path FROM {images} iv \
                     INNER JOIN {artifacts} a ON iv.{i_artifact} = a.{id} \
                     INNER JOIN {properties} p ON a.{id} = p.{p_artifact} \
                     WHERE iv.{path} IS NOT NULL AND iv.{path} != '' \
                     AND p.{column} IS NOT NULL AND p.{column} != '' \
                     GROUP BY p.{column}, iv.{path} \
                     ORDER BY RAND() LIMIT {HOMEPAGE_STRIP_LIMIT}",
                    path = i.local_path,
                    images = s.tables.image_versions,
                    artifacts = s.tables.artifacts,
                    properties = s.tables.properties,
                    i_artifact = i.artifact_id,
                    p_artifact = s.property.artifact_id,
                    id = a.id,
                )
            }
        }
    }

    /// Whether an artifact exists. Binds: artifact id.
    pub fn build_artifact_exists_query(&self) -> String {
        format!(
            "SELECT a.{id} AS artifact_id FROM {artifacts} a WHERE a.{id} = ?",
            id = self.schema.artifact.id,
            artifacts = self.schema.tables.artifacts,
        )
    }

    /// Grid rows for an explicit set of artifact ids, newest first.
    ///
    /// Returns `None` when `ids` is empty. The ids are integers and are
    /// rendered inline.
    pub fn build_artifacts_by_ids_query(&self, ids: &[i64]) -> Option<String> {
        if ids.is_empty() {
            return None;
        }

        let s = self.schema;
        let a = Alias::new("a");
        let iv = Alias::new("iv");

        let mut query = Query::select();
        query
            .expr_as(
                Expr::col((a.clone(), Alias::new(s.artifact.id))),
                Alias::new("artifact_id"),
            )
            .expr_as(
                Expr::col((a.clone(), Alias::new(s.artifact.title_cn))),
                Alias::new("title"),
            )
            .expr_as(
                Expr::col((a.clone(), Alias::new(s.artifact.date_cn))),
                Alias::new("date_text"),
            )
            .expr_as(
                Expr::cust(format!("ANY_VALUE(`iv`.`{}`)", s.image.local_path)),
                Alias::new("local_path"),
            )
            .from_as(Alias::new(s.tables.artifacts), a.clone())
            .join_as(
                JoinType::LeftJoin,
                Alias::new(s.tables.image_versions),
                iv.clone(),
                Expr::col((a.clone(), Alias::new(s.artifact.id)))
                    .equals((iv, Alias::new(s.image.artifact_id))),
            )
            .and_where(Expr::col((a.clone(), Alias::new(s.artifact.id))).is_in(ids.iter().copied()))
            .group_by_col((a.clone(), Alias::new(s.artifact.id)))
            .order_by((a, Alias::new(s.artifact.id)), Order::Desc);

        Some(query.to_string(MysqlQueryBuilder))
    }
}
