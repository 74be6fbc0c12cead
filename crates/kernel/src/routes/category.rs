//! Culture and geography browsing.

use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::response::Response;
use axum::{Router, routing::get};
use tower_sessions::Session;

use crate::catalog::CategoryDimension;
use crate::models::category::is_well_formed_key;
use crate::models::{CategoryPage, CategorySummary};
use crate::state::AppState;

use super::helpers::{page_context, render, render_error, unavailable};

/// Create the category router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/browse", get(browse_cultures))
        .route("/culture/{key}", get(culture_detail))
        .route("/geographies", get(browse_geographies))
        .route("/browse_geographies", get(browse_geographies))
        .route("/geography/{key}", get(geography_detail))
}

fn browse_title(dimension: CategoryDimension) -> &'static str {
    match dimension {
        CategoryDimension::Culture => "文化浏览",
        CategoryDimension::Geography => "地域浏览",
    }
}

/// Category tiles of one dimension. Degrades to an empty grid.
async fn render_browse(
    state: &AppState,
    session: &Session,
    path: &str,
    dimension: CategoryDimension,
) -> Response {
    let mut context = page_context(session, path).await;
    context.insert("page_title", browse_title(dimension));
    context.insert("dimension", dimension.as_str());

    let categories = match state.acquire().await {
        Some(mut conn) => {
            match CategorySummary::browse(&mut conn, &state.queries(), dimension).await {
                Ok(categories) => categories,
                Err(e) => {
                    tracing::error!(error = %e, dimension = dimension.as_str(), "browse query failed");
                    return render_error(
                        state,
                        session,
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "数据库查询错误",
                    )
                    .await;
                }
            }
        }
        None => {
            context.insert("degraded", &true);
            Vec::new()
        }
    };

    context.insert("categories", &categories);
    render(state, "browse.html", &context)
}

/// Artifacts of one category, addressed by its stable key.
async fn render_category(
    state: &AppState,
    session: &Session,
    dimension: CategoryDimension,
    key: &str,
) -> Response {
    if !is_well_formed_key(key) {
        return render_error(state, session, StatusCode::NOT_FOUND, "未找到该分类").await;
    }

    let Some(mut conn) = state.acquire().await else {
        return unavailable(state, session).await;
    };

    match CategoryPage::load(&mut conn, &state.queries(), dimension, key).await {
        Ok(Some(category)) => {
            let path = format!("/{}/{}", dimension.as_str(), category.key);
            let mut context = page_context(session, &path).await;
            context.insert("dimension", dimension.as_str());
            context.insert("category", &category);
            render(state, "category_detail.html", &context)
        }
        Ok(None) => render_error(state, session, StatusCode::NOT_FOUND, "未找到该分类").await,
        Err(e) => {
            tracing::error!(error = %e, key = %key, "category query failed");
            render_error(
                state,
                session,
                StatusCode::INTERNAL_SERVER_ERROR,
                "数据库查询错误",
            )
            .await
        }
    }
}

async fn browse_cultures(State(state): State<AppState>, session: Session) -> Response {
    render_browse(&state, &session, "/browse", CategoryDimension::Culture).await
}

async fn browse_geographies(State(state): State<AppState>, session: Session, uri: Uri) -> Response {
    render_browse(&state, &session, uri.path(), CategoryDimension::Geography).await
}

async fn culture_detail(
    State(state): State<AppState>,
    session: Session,
    Path(key): Path<String>,
) -> Response {
    render_category(&state, &session, CategoryDimension::Culture, &key).await
}

async fn geography_detail(
    State(state): State<AppState>,
    session: Session,
    Path(key): Path<String>,
) -> Response {
    render_category(&state, &session, CategoryDimension::Geography, &key).await
}
