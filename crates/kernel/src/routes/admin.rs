//! Admin console: dashboard, bulk import, audit log.

use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::middleware::ClientIp;
use crate::models::User;
use crate::services::ImportReport;
use crate::services::audit::{DEFAULT_AUDIT_LIMIT, MAX_AUDIT_LIMIT};
use crate::services::import::parse_batch;
use crate::session;
use crate::state::AppState;

use super::helpers::{
    DATABASE_UNAVAILABLE, LOGIN_REDIRECT, page_context, render, render_error, require_admin,
    unavailable,
};

/// Audit entries shown on the dashboard.
const DASHBOARD_AUDIT_LIMIT: u64 = 20;

/// Create the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/import", post(import))
        .route("/admin/logs", get(logs))
}

/// Error response.
#[derive(Debug, Serialize)]
struct AdminError {
    error: String,
}

type AdminJsonError = (StatusCode, Json<AdminError>);

fn admin_error(status: StatusCode, message: &str) -> AdminJsonError {
    (
        status,
        Json(AdminError {
            error: message.to_string(),
        }),
    )
}

/// Require admin for JSON API endpoints, returning a JSON error on failure.
async fn require_admin_json(state: &AppState, session: &Session) -> Result<User, AdminJsonError> {
    let Some(user_id) = session::current_user_id(session).await else {
        return Err(admin_error(StatusCode::UNAUTHORIZED, "Login required"));
    };
    let Some(mut conn) = state.acquire().await else {
        return Err(admin_error(StatusCode::SERVICE_UNAVAILABLE, DATABASE_UNAVAILABLE));
    };
    match User::find_by_id(&mut conn, user_id).await {
        Ok(Some(user)) if user.is_admin => Ok(user),
        Ok(_) => Err(admin_error(StatusCode::FORBIDDEN, "Admin access required")),
        Err(e) => {
            tracing::error!(error = %e, "failed to load admin user");
            Err(admin_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to check access"))
        }
    }
}

/// Load the admin or produce the page to show instead.
async fn admin_page_guard(state: &AppState, session: &Session) -> Result<User, Response> {
    if session::current_user_id(session).await.is_none() {
        return Err(Redirect::to(LOGIN_REDIRECT).into_response());
    }
    let Some(mut conn) = state.acquire().await else {
        return Err(unavailable(state, session).await);
    };
    require_admin(&mut conn, session).await
}

/// Admin dashboard with the latest audit entries.
///
/// GET /admin
async fn dashboard(State(state): State<AppState>, session: Session) -> Response {
    let admin = match admin_page_guard(&state, &session).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let entries = match state.audit().recent(DASHBOARD_AUDIT_LIMIT, None).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(error = %e, "failed to load audit entries");
            Vec::new()
        }
    };

    let mut context = page_context(&session, "/admin").await;
    context.insert("admin", &admin);
    context.insert("entries", &entries);
    render(&state, "admin/dashboard.html", &context)
}

/// Bulk import artifact records from a JSON body.
///
/// POST /admin/import
async fn import(
    State(state): State<AppState>,
    session: Session,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    body: String,
) -> Result<Json<ImportReport>, AdminJsonError> {
    let admin = require_admin_json(&state, &session).await?;

    let records = parse_batch(&body).map_err(|e| {
        tracing::debug!(error = %e, "rejected import body");
        admin_error(StatusCode::BAD_REQUEST, &format!("{e:#}"))
    })?;
    let submitted = records.len();

    let report = state.importer().import(records).await;

    tracing::info!(
        user_id = admin.user_id,
        submitted,
        imported = report.imported,
        failed = report.failed.len(),
        "artifact import finished"
    );
    state
        .audit()
        .record(
            "import",
            "artifact",
            "batch",
            Some(admin.user_id),
            &ip,
            serde_json::json!({
                "submitted": submitted,
                "imported": report.imported,
                "failed": report.failed.len(),
            }),
        )
        .await;

    Ok(Json(report))
}

/// Audit log filter.
#[derive(Debug, Deserialize)]
struct LogsQuery {
    action: Option<String>,
    limit: Option<u64>,
}

impl LogsQuery {
    fn action(&self) -> Option<&str> {
        self.action.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }

    fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).clamp(1, MAX_AUDIT_LIMIT)
    }
}

/// Audit log listing.
///
/// GET /admin/logs?action=&limit=
async fn logs(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LogsQuery>,
) -> Response {
    if let Err(response) = admin_page_guard(&state, &session).await {
        return response;
    }

    let entries = match state.audit().recent(query.limit(), query.action()).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(error = %e, "failed to load audit log");
            return render_error(
                &state,
                &session,
                StatusCode::INTERNAL_SERVER_ERROR,
                "数据库查询错误",
            )
            .await;
        }
    };

    let mut context = page_context(&session, "/admin/logs").await;
    context.insert("entries", &entries);
    context.insert("action", &query.action().unwrap_or_default());
    context.insert("limit", &query.limit());
    render(&state, "admin/logs.html", &context)
}
