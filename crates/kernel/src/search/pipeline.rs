//! In-process filtering and sorting of search rows.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::facets::{FacetTables, extract_facets};
use super::params::SearchParams;
use super::{FacetDimension, ResultRow, SearchRow};
use crate::image_path::normalize_image_path;

/// Result ordering requested by the `sort` parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Keep datastore order.
    #[default]
    Relevance,
    EraAsc,
    EraDesc,
    /// Highest artifact id first.
    Newest,
}

impl SortKey {
    /// Parse a sort key; anything unrecognized means relevance.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "era_asc" => SortKey::EraAsc,
            "era_desc" => SortKey::EraDesc,
            "newest" => SortKey::Newest,
            _ => SortKey::Relevance,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Relevance => "relevance",
            SortKey::EraAsc => "era_asc",
            SortKey::EraDesc => "era_desc",
            SortKey::Newest => "newest",
        }
    }
}

/// Selected culture and material values.
///
/// A row passes when, for every dimension with a selection, its trimmed
/// value is one of the selected values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetSelection {
    pub culture: Vec<String>,
    pub material: Vec<String>,
}

impl FacetSelection {
    pub fn is_empty(&self) -> bool {
        self.culture.is_empty() && self.material.is_empty()
    }

    fn selected(&self, dimension: FacetDimension) -> &[String] {
        match dimension {
            FacetDimension::Culture => &self.culture,
            FacetDimension::Material => &self.material,
        }
    }

    pub fn matches<R: ResultRow>(&self, row: &R) -> bool {
        [FacetDimension::Culture, FacetDimension::Material]
            .into_iter()
            .all(|dimension| {
                let selected = self.selected(dimension);
                if selected.is_empty() {
                    return true;
                }
                match row.facet_value(dimension).map(str::trim) {
                    Some(value) => selected.iter().any(|s| s == value),
                    None => false,
                }
            })
    }
}

/// Keep the rows matching `selection`, preserving their order.
pub fn apply_filters<R: ResultRow>(mut rows: Vec<R>, selection: &FacetSelection) -> Vec<R> {
    if !selection.is_empty() {
        rows.retain(|row| selection.matches(row));
    }
    rows
}

/// Missing years order after present ones regardless of direction.
fn compare_years(a: Option<i64>, b: Option<i64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable in-place sort.
pub fn sort_rows<R: ResultRow>(rows: &mut [R], key: SortKey) {
    match key {
        SortKey::Relevance => {}
        SortKey::EraAsc => rows.sort_by(|a, b| compare_years(a.start_year(), b.start_year(), false)),
        SortKey::EraDesc => rows.sort_by(|a, b| compare_years(a.start_year(), b.start_year(), true)),
        SortKey::Newest => rows.sort_by(|a, b| b.artifact_id().cmp(&a.artifact_id())),
    }
}

/// Rows and facet tables ready for rendering.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    pub rows: Vec<SearchRow>,
    pub facets: FacetTables,
    /// Row count before filtering.
    pub unfiltered_total: usize,
}

/// Run facet extraction, filtering, sorting and path normalization over the
/// rows returned by the datastore.
pub fn run_pipeline(rows: Vec<SearchRow>, params: &SearchParams) -> SearchOutcome {
    let unfiltered_total = rows.len();
    let facets = extract_facets(&rows);
    let mut rows = apply_filters(rows, &params.selection());
    sort_rows(&mut rows, params.sort);
    for row in &mut rows {
        row.local_path = normalize_image_path(row.local_path.as_deref());
    }

    debug!(
        term = %params.q,
        unfiltered = unfiltered_total,
        shown = rows.len(),
        sort = params.sort.as_str(),
        "search pipeline complete"
    );

    SearchOutcome {
        rows,
        facets,
        unfiltered_total,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn row(id: i64, culture: Option<&str>, medium: Option<&str>, year: Option<i64>) -> SearchRow {
        SearchRow {
            artifact_id: id,
            title: Some(format!("artifact {id}")),
            date_text: None,
            local_path: None,
            culture_name: culture.map(str::to_string),
            medium: medium.map(str::to_string),
            start_year: year,
        }
    }

    fn ids(rows: &[SearchRow]) -> Vec<i64> {
        rows.iter().map(|r| r.artifact_id).collect()
    }

    fn years(rows: &[SearchRow]) -> Vec<Option<i64>> {
        rows.iter().map(|r| r.start_year).collect()
    }

    #[test]
    fn filters_and_across_dimensions_or_within() {
        let rows = vec![
            row(1, Some("A"), Some("x"), None),
            row(2, Some("B"), Some("x"), None),
            row(3, Some("A"), Some("y"), None),
        ];
        let selection = FacetSelection {
            culture: vec!["A".into()],
            material: vec!["x".into()],
        };
        assert_eq!(ids(&apply_filters(rows.clone(), &selection)), vec![1]);

        let selection = FacetSelection {
            culture: vec!["A".into(), "B".into()],
            material: vec![],
        };
        assert_eq!(ids(&apply_filters(rows, &selection)), vec![1, 2, 3]);
    }

    #[test]
    fn filter_compares_trimmed_values() {
        let rows = vec![row(1, Some(" A "), None, None), row(2, None, None, None)];
        let selection = FacetSelection {
            culture: vec!["A".into()],
            material: vec![],
        };
        assert_eq!(ids(&apply_filters(rows, &selection)), vec![1]);
    }

    #[test]
    fn empty_selection_keeps_everything() {
        let rows = vec![row(1, None, None, None), row(2, Some("A"), None, None)];
        assert_eq!(ids(&apply_filters(rows, &FacetSelection::default())), vec![1, 2]);
    }

    #[test]
    fn era_asc_puts_missing_years_last() {
        let mut rows = vec![
            row(1, None, None, None),
            row(2, None, None, Some(1046)),
            row(3, None, None, Some(-300)),
        ];
        sort_rows(&mut rows, SortKey::EraAsc);
        assert_eq!(years(&rows), vec![Some(-300), Some(1046), None]);
    }

    #[test]
    fn era_desc_puts_missing_years_last() {
        let mut rows = vec![
            row(1, None, None, None),
            row(2, None, None, Some(1046)),
            row(3, None, None, Some(-300)),
        ];
        sort_rows(&mut rows, SortKey::EraDesc);
        assert_eq!(years(&rows), vec![Some(1046), Some(-300), None]);
    }

    #[test]
    fn newest_orders_by_id_descending() {
        let mut rows = vec![
            row(5, None, None, None),
            row(9, None, None, None),
            row(7, None, None, None),
        ];
        sort_rows(&mut rows, SortKey::Newest);
        assert_eq!(ids(&rows), vec![9, 7, 5]);
    }

    #[test]
    fn unknown_sort_key_preserves_order() {
        assert_eq!(SortKey::parse("bogus"), SortKey::Relevance);
        assert_eq!(SortKey::parse(""), SortKey::Relevance);
        let mut rows = vec![
            row(3, None, None, Some(5)),
            row(1, None, None, Some(1)),
            row(2, None, None, None),
        ];
        sort_rows(&mut rows, SortKey::parse("bogus"));
        assert_eq!(ids(&rows), vec![3, 1, 2]);
    }

    #[test]
    fn sort_is_stable_for_equal_years() {
        let mut rows = vec![
            row(1, None, None, Some(10)),
            row(2, None, None, None),
            row(3, None, None, Some(10)),
            row(4, None, None, None),
        ];
        sort_rows(&mut rows, SortKey::EraAsc);
        assert_eq!(ids(&rows), vec![1, 3, 2, 4]);
    }

    #[test]
    fn facets_come_from_unfiltered_rows() {
        let rows = vec![
            row(1, Some("A"), Some("x"), None),
            row(2, Some("B"), Some("y"), None),
        ];
        let params = SearchParams::from_query("q=t&culture=A");
        let outcome = run_pipeline(rows, &params);
        assert_eq!(ids(&outcome.rows), vec![1]);
        assert_eq!(outcome.unfiltered_total, 2);
        assert_eq!(outcome.facets.cultures.len(), 2);
        assert_eq!(outcome.facets.materials.len(), 2);
    }

    #[test]
    fn era_filter_is_not_applied() {
        let rows = vec![row(1, None, None, Some(1)), row(2, None, None, None)];
        let params = SearchParams::from_query("q=t&era=tang&region=asia");
        assert_eq!(ids(&run_pipeline(rows, &params).rows), vec![1, 2]);
    }

    #[test]
    fn pipeline_normalizes_image_paths() {
        let mut hit = row(1, None, None, None);
        hit.local_path = Some(r"D:\data\static\images\met\1.jpg".into());
        let outcome = run_pipeline(vec![hit], &SearchParams::from_query("q=t"));
        assert_eq!(outcome.rows[0].local_path.as_deref(), Some("images/met/1.jpg"));
    }

    #[test]
    fn serialized_rows_always_carry_enrichment_keys() {
        let value = serde_json::to_value(row(1, None, None, None)).unwrap();
        for key in ["culture_name", "medium", "start_year"] {
            assert!(value.get(key).is_some(), "missing {key}");
            assert!(value[key].is_null());
        }
    }
}
