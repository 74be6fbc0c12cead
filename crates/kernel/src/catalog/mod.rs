//! Catalogue queries.
//!
//! SQL for the artifact listing, detail, search, and category pages is
//! assembled here from the [`Schema`](crate::schema::Schema) descriptor.

mod bound;
mod query_builder;

use serde::Serialize;

pub use bound::BoundQuery;
pub use query_builder::{CatalogQueryBuilder, HOMEPAGE_STRIP_LIMIT, SEARCH_COLUMN_COUNT};

/// A property dimension used for category browsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryDimension {
    Culture,
    Geography,
}

impl CategoryDimension {
    /// URL segment and template name fragment for this dimension.
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryDimension::Culture => "culture",
            CategoryDimension::Geography => "geography",
        }
    }
}

/// Which set of representative images to pick for a homepage strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStrip {
    /// Any artifact image.
    Random,
    /// Images of artifacts that have a curated value for the dimension.
    Dimension(CategoryDimension),
}
