//! Search route handlers.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Serialize;
use sqlx::MySqlConnection;
use tower_sessions::Session;

use crate::catalog::CatalogQueryBuilder;
use crate::search::{FilterFacet, SearchOutcome, SearchParams, SearchRow, run_pipeline};
use crate::state::AppState;

use super::helpers::{DATABASE_UNAVAILABLE, page_context, render, render_error};

/// Create the search router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search_html))
        .route("/api/search", get(search_json))
}

/// Filter choices offered beside the results.
///
/// Era and region have no facet source, so their lists stay empty.
#[derive(Debug, Serialize)]
struct FilterOptions<'a> {
    eras: Vec<FilterFacet>,
    cultures: &'a [FilterFacet],
    materials: &'a [FilterFacet],
    regions: Vec<FilterFacet>,
}

/// Selected filters keyed by dimension; empty dimensions are omitted.
fn active_filters(params: &SearchParams) -> BTreeMap<&'static str, &[String]> {
    [
        ("era", params.era.as_slice()),
        ("culture", params.culture.as_slice()),
        ("material", params.material.as_slice()),
        ("region", params.region.as_slice()),
    ]
    .into_iter()
    .filter(|(_, values)| !values.is_empty())
    .collect()
}

/// Run the datastore query and the in-process pipeline.
async fn run_search(
    conn: &mut MySqlConnection,
    queries: &CatalogQueryBuilder<'_>,
    params: &SearchParams,
) -> anyhow::Result<SearchOutcome> {
    let Some(query) = queries.bind_search(&params.q) else {
        return Ok(SearchOutcome::default());
    };
    let rows = query.fetch_all::<SearchRow>(conn).await?;
    Ok(run_pipeline(rows, params))
}

/// HTML search page.
///
/// An empty term redirects to the homepage.
async fn search_html(
    State(state): State<AppState>,
    session: Session,
    RawQuery(raw): RawQuery,
) -> Response {
    let params = SearchParams::from_query(raw.as_deref().unwrap_or_default());
    if params.q.is_empty() {
        return Redirect::to("/").into_response();
    }

    let mut context = page_context(&session, "/search").await;
    context.insert("search_term", &params.q);
    context.insert("sort_by", params.sort.as_str());
    context.insert("active_filters", &active_filters(&params));
    context.insert("has_active_filters", &params.has_active_filters());

    let outcome = match state.acquire().await {
        Some(mut conn) => match run_search(&mut conn, &state.queries(), &params).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, term = %params.q, "search query failed");
                return render_error(
                    &state,
                    &session,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "数据库查询错误",
                )
                .await;
            }
        },
        None => {
            context.insert("degraded", &true);
            SearchOutcome::default()
        }
    };

    context.insert(
        "filter_options",
        &FilterOptions {
            eras: Vec::new(),
            cultures: &outcome.facets.cultures,
            materials: &outcome.facets.materials,
            regions: Vec::new(),
        },
    );
    context.insert("unfiltered_total", &outcome.unfiltered_total);
    context.insert("artifacts", &outcome.rows);
    render(&state, "search.html", &context)
}

/// JSON search response.
#[derive(Debug, Serialize)]
struct SearchJsonResponse {
    query: String,
    sort: &'static str,
    total: usize,
    #[serde(flatten)]
    outcome: SearchOutcome,
}

#[derive(Debug, Serialize)]
struct SearchJsonError {
    error: String,
}

/// JSON search, same pipeline as the HTML page.
async fn search_json(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<SearchJsonResponse>, (StatusCode, Json<SearchJsonError>)> {
    let params = SearchParams::from_query(raw.as_deref().unwrap_or_default());
    if params.q.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(SearchJsonError {
                error: "q must not be empty".to_string(),
            }),
        ));
    }

    let Some(mut conn) = state.acquire().await else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(SearchJsonError {
                error: DATABASE_UNAVAILABLE.to_string(),
            }),
        ));
    };

    let outcome = run_search(&mut conn, &state.queries(), &params)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, term = %params.q, "search query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SearchJsonError {
                    error: "search failed".to_string(),
                }),
            )
        })?;

    Ok(Json(SearchJsonResponse {
        sort: params.sort.as_str(),
        total: outcome.rows.len(),
        query: params.q,
        outcome,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn active_filters_skip_empty_dimensions() {
        let params = SearchParams::from_query("q=鼎&era=商周时期&material=青铜&material=玉");
        let active = active_filters(&params);
        assert_eq!(active.len(), 2);
        assert_eq!(active["era"], ["商周时期".to_string()]);
        assert_eq!(active["material"].len(), 2);
        assert!(!active.contains_key("culture"));
    }
}
