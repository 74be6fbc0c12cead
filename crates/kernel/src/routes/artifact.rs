//! Artifact detail page.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Router, routing::get};
use tower_sessions::Session;

use crate::models::ArtifactDetail;
use crate::state::AppState;

use super::helpers::{page_context, render, render_error, unavailable};

/// Create the artifact router.
pub fn router() -> Router<AppState> {
    Router::new().route("/artifact/{id}", get(detail))
}

/// Parse an artifact id path segment; only plain decimal ids are accepted.
pub(crate) fn parse_artifact_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Artifact detail with all images and measurements.
///
/// A malformed id redirects to the homepage; an unknown id is a 404.
async fn detail(
    State(state): State<AppState>,
    session: Session,
    Path(raw_id): Path<String>,
) -> Response {
    let Some(artifact_id) = parse_artifact_id(&raw_id) else {
        return Redirect::to("/").into_response();
    };

    let Some(mut conn) = state.acquire().await else {
        return unavailable(&state, &session).await;
    };

    match ArtifactDetail::find(&mut conn, &state.queries(), artifact_id).await {
        Ok(Some(artifact)) => {
            let mut context = page_context(&session, &format!("/artifact/{artifact_id}")).await;
            context.insert("artifact", &artifact);
            render(&state, "detail.html", &context)
        }
        Ok(None) => render_error(&state, &session, StatusCode::NOT_FOUND, "未找到该文物").await,
        Err(e) => {
            tracing::error!(error = %e, artifact_id, "artifact detail query failed");
            render_error(
                &state,
                &session,
                StatusCode::INTERNAL_SERVER_ERROR,
                "数据库查询错误",
            )
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_ids_must_be_plain_digits() {
        assert_eq!(parse_artifact_id("42"), Some(42));
        assert_eq!(parse_artifact_id("007"), Some(7));
        assert_eq!(parse_artifact_id(""), None);
        assert_eq!(parse_artifact_id("abc"), None);
        assert_eq!(parse_artifact_id("-3"), None);
        assert_eq!(parse_artifact_id("4e2"), None);
        assert_eq!(parse_artifact_id("99999999999999999999"), None);
    }
}
