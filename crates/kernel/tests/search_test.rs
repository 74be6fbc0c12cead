#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Search against a live MySQL database.
//!
//! Set `TEST_DATABASE_URL` to a database holding the catalogue tables to run
//! these; without it every test returns early. Rows are seeded through the
//! importer under a dedicated source museum.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestApp, body_json, get, unique_number};

const TEST_MUSEUM: &str = "CURIO-SEARCH-TEST";

#[tokio::test]
async fn search_matches_title_and_culture() {
    let Some(app) = TestApp::live().await else {
        return;
    };
    let base = unique_number();
    // Unique per run so rows from earlier runs or the real catalogue never match.
    let term = format!("商{base}");

    let by_title = format!("{term}青铜鼎");
    let by_culture = "玉琮".to_string();
    let unrelated = "唐三彩马".to_string();

    let report = app
        .state
        .importer()
        .import(vec![
            json!({
                "source": { "museum_code": TEST_MUSEUM, "museum_name_cn": "测试博物馆" },
                "original_id": base,
                "title_cn": by_title,
                "material": "青铜",
                "start_year": -1300,
                "property": { "culture": "商" },
            }),
            json!({
                "source": { "museum_code": TEST_MUSEUM },
                "original_id": base + 1,
                "title_cn": by_culture,
                "material": "玉",
                "property": { "culture": format!("{term}文化") },
            }),
            json!({
                "source": { "museum_code": TEST_MUSEUM },
                "original_id": base + 2,
                "title_cn": unrelated,
                "material": "陶",
                "start_year": 700,
                "property": { "culture": "唐" },
            }),
        ])
        .await;
    assert_eq!(report.imported, 3, "{:?}", report.failed);

    let query: String = url::form_urlencoded::byte_serialize(term.as_bytes()).collect();
    let response = app.request(get(&format!("/api/search?q={query}"))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["total"], 2);
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);

    let mut titles: Vec<&str> = rows.iter().map(|r| r["title"].as_str().unwrap()).collect();
    titles.sort_unstable();
    let mut expected = vec![by_title.as_str(), by_culture.as_str()];
    expected.sort_unstable();
    assert_eq!(titles, expected);

    for row in rows {
        let row = row.as_object().unwrap();
        for key in ["artifact_id", "culture_name", "medium", "start_year"] {
            assert!(row.contains_key(key), "missing {key}");
        }
    }

    let title_row = rows.iter().find(|r| r["title"] == by_title.as_str()).unwrap();
    assert_eq!(title_row["culture_name"], "商");
    assert_eq!(title_row["medium"], "青铜");
    assert_eq!(title_row["start_year"], -1300);

    let culture_row = rows.iter().find(|r| r["title"] == by_culture.as_str()).unwrap();
    assert_eq!(culture_row["start_year"], serde_json::Value::Null);
}

#[tokio::test]
async fn search_sorts_by_era_with_unknown_years_last() {
    let Some(app) = TestApp::live().await else {
        return;
    };
    let base = unique_number();
    let term = format!("鼎{base}");

    let report = app
        .state
        .importer()
        .import(
            [(base, Some(200)), (base + 1, None), (base + 2, Some(-500))]
                .into_iter()
                .map(|(original_id, start_year)| {
                    json!({
                        "source": { "museum_code": TEST_MUSEUM },
                        "original_id": original_id,
                        "title_cn": format!("{term}-{original_id}"),
                        "start_year": start_year,
                    })
                })
                .collect(),
        )
        .await;
    assert_eq!(report.imported, 3, "{:?}", report.failed);

    let query: String = url::form_urlencoded::byte_serialize(term.as_bytes()).collect();
    for (sort, expected) in [
        ("era_asc", vec![json!(-500), json!(200), json!(null)]),
        ("era_desc", vec![json!(200), json!(-500), json!(null)]),
    ] {
        let response = app
            .request(get(&format!("/api/search?q={query}&sort={sort}")))
            .await;
        let body = body_json(response).await;
        assert_eq!(body["sort"], sort);
        let years: Vec<serde_json::Value> = body["rows"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["start_year"].clone())
            .collect();
        assert_eq!(years, expected, "{sort}");
    }
}
