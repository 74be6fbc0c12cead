//! Artifact search.
//!
//! The datastore does the substring matching (see
//! [`CatalogQueryBuilder::build_search_query`]); everything after that runs
//! in process over the materialized rows:
//!
//! 1. facet extraction over the unfiltered rows,
//! 2. culture/material filtering,
//! 3. sorting,
//! 4. image path normalization.
//!
//! [`CatalogQueryBuilder::build_search_query`]: crate::catalog::CatalogQueryBuilder::build_search_query

mod facets;
mod params;
mod pipeline;

use serde::{Deserialize, Serialize};

pub use facets::{FacetTables, FilterFacet, extract_facets, facet_key, facet_table};
pub use params::SearchParams;
pub use pipeline::{FacetSelection, SearchOutcome, SortKey, apply_filters, run_pipeline, sort_rows};

/// A facet dimension offered as a search filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetDimension {
    Culture,
    Material,
}

/// Row accessors the search pipeline needs.
pub trait ResultRow {
    fn artifact_id(&self) -> i64;

    fn start_year(&self) -> Option<i64>;

    /// Raw (untrimmed) value of a facet dimension.
    fn facet_value(&self, dimension: FacetDimension) -> Option<&str>;
}

/// One search hit, enriched with the columns the pipeline works on.
///
/// The enrichment columns always serialize, as `null` when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SearchRow {
    pub artifact_id: i64,
    pub title: Option<String>,
    pub date_text: Option<String>,
    pub local_path: Option<String>,
    pub culture_name: Option<String>,
    pub medium: Option<String>,
    pub start_year: Option<i64>,
}

impl ResultRow for SearchRow {
    fn artifact_id(&self) -> i64 {
        self.artifact_id
    }

    fn start_year(&self) -> Option<i64> {
        self.start_year
    }

    fn facet_value(&self, dimension: FacetDimension) -> Option<&str> {
        match dimension {
            FacetDimension::Culture => self.culture_name.as_deref(),
            FacetDimension::Material => self.medium.as_deref(),
        }
    }
}
