//! Facet extraction.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{FacetDimension, ResultRow};

/// One selectable filter value and how many rows carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterFacet {
    pub value: String,
    pub label: String,
    pub count: i64,
}

/// Frequency tables for every facet dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetTables {
    pub cultures: Vec<FilterFacet>,
    pub materials: Vec<FilterFacet>,
}

/// Build the frequency table of one dimension.
///
/// Values are trimmed; empty and missing values are skipped. The table is
/// ordered by count descending, then by value in byte order.
pub fn facet_table<R: ResultRow>(rows: &[R], dimension: FacetDimension) -> Vec<FilterFacet> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for row in rows {
        let Some(value) = row.facet_value(dimension).map(str::trim) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut table: Vec<FilterFacet> = counts
        .into_iter()
        .map(|(value, count)| FilterFacet {
            value: value.to_string(),
            label: value.to_string(),
            count,
        })
        .collect();
    table.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    table
}

/// Build the culture and material tables from an unfiltered result set.
pub fn extract_facets<R: ResultRow>(rows: &[R]) -> FacetTables {
    FacetTables {
        cultures: facet_table(rows, FacetDimension::Culture),
        materials: facet_table(rows, FacetDimension::Material),
    }
}

/// Stable URL key for a category value: the first 16 hex digits of its
/// SHA-256 digest. MySQL computes the same key with
/// `LEFT(SHA2(value, 256), 16)`.
pub fn facet_key(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let mut key = hex::encode(digest);
    key.truncate(16);
    key
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::search::SearchRow;

    fn row(id: i64, culture: Option<&str>, medium: Option<&str>) -> SearchRow {
        SearchRow {
            artifact_id: id,
            title: Some(format!("artifact {id}")),
            date_text: None,
            local_path: None,
            culture_name: culture.map(str::to_string),
            medium: medium.map(str::to_string),
            start_year: None,
        }
    }

    #[test]
    fn culture_table_skips_empty_and_missing() {
        let rows = vec![
            row(1, Some("A"), None),
            row(2, Some("A"), None),
            row(3, Some(""), None),
            row(4, Some("B"), None),
            row(5, None, None),
        ];
        let table = facet_table(&rows, FacetDimension::Culture);
        assert_eq!(
            table,
            vec![
                FilterFacet {
                    value: "A".into(),
                    label: "A".into(),
                    count: 2
                },
                FilterFacet {
                    value: "B".into(),
                    label: "B".into(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn values_are_trimmed_before_counting() {
        let rows = vec![
            row(1, Some(" 青铜 "), None),
            row(2, Some("青铜"), None),
            row(3, Some("   "), None),
        ];
        let table = facet_table(&rows, FacetDimension::Culture);
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].value, "青铜");
        assert_eq!(table[0].count, 2);
    }

    #[test]
    fn ties_break_by_value_ascending() {
        let rows = vec![
            row(1, None, Some("jade")),
            row(2, None, Some("bronze")),
            row(3, None, Some("ceramic")),
            row(4, None, Some("jade")),
        ];
        let values: Vec<_> = facet_table(&rows, FacetDimension::Material)
            .into_iter()
            .map(|f| (f.value, f.count))
            .collect();
        assert_eq!(
            values,
            vec![
                ("jade".to_string(), 2),
                ("bronze".to_string(), 1),
                ("ceramic".to_string(), 1)
            ]
        );
    }

    #[test]
    fn counts_sum_to_rows_with_values() {
        let rows = vec![
            row(1, Some("A"), Some("x")),
            row(2, Some("B"), None),
            row(3, None, Some("y")),
            row(4, Some("A"), Some("")),
        ];
        let facets = extract_facets(&rows);
        let culture_total: i64 = facets.cultures.iter().map(|f| f.count).sum();
        let material_total: i64 = facets.materials.iter().map(|f| f.count).sum();
        assert_eq!(culture_total, 3);
        assert_eq!(material_total, 2);
    }

    #[test]
    fn facet_key_is_stable_hex_prefix() {
        let key = facet_key("中华文化");
        assert_eq!(key.len(), 16);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(key, facet_key("中华文化"));
        assert_ne!(key, facet_key("日本文化"));
        // SHA-256("abc") = ba7816bf8f01cfea...
        assert_eq!(facet_key("abc"), "ba7816bf8f01cfea");
    }
}
