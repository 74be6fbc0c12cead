//! Search request parameters.

use serde::Serialize;

use super::pipeline::{FacetSelection, SortKey};

/// Parameters of one `/search` request.
///
/// Filter keys may repeat (`culture=A&culture=B`), which the stock axum
/// `Query` extractor cannot express, so the raw query string is parsed here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchParams {
    pub q: String,
    pub culture: Vec<String>,
    pub material: Vec<String>,
    pub era: Vec<String>,
    pub region: Vec<String>,
    pub sort: SortKey,
}

impl SearchParams {
    /// Parse an `application/x-www-form-urlencoded` query string.
    ///
    /// Blank filter values are dropped and duplicates kept once, in first
    /// occurrence order.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            let target = match key.as_ref() {
                "q" => {
                    params.q = value.to_string();
                    continue;
                }
                "sort" => {
                    params.sort = SortKey::parse(value);
                    continue;
                }
                "culture" => &mut params.culture,
                "material" => &mut params.material,
                "era" => &mut params.era,
                "region" => &mut params.region,
                _ => continue,
            };
            if !value.is_empty() && !target.iter().any(|v| v == value) {
                target.push(value.to_string());
            }
        }
        params
    }

    /// The culture/material selection the pipeline filters on.
    ///
    /// Era and region are echoed back to the page but not applied.
    pub fn selection(&self) -> FacetSelection {
        FacetSelection {
            culture: self.culture.clone(),
            material: self.material.clone(),
        }
    }

    /// True when any filter dimension (applied or echoed) has a selection.
    pub fn has_active_filters(&self) -> bool {
        !(self.culture.is_empty()
            && self.material.is_empty()
            && self.era.is_empty()
            && self.region.is_empty())
    }
}
