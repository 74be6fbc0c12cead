//! Shared route helpers for page rendering.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Serialize;
use sqlx::MySqlConnection;
use tower_sessions::Session;

use crate::models::User;
use crate::session::{self, SESSION_USER_ID};
use crate::state::AppState;
use crate::theme::ThemeEngine;

/// Message shown when the datastore cannot be reached.
pub const DATABASE_UNAVAILABLE: &str = "无法连接到数据库。请检查数据库配置和连接状态。";

/// Where anonymous visitors are sent when a page needs an account.
pub const LOGIN_REDIRECT: &str = "/user_center";

/// Header summary of the logged-in user.
#[derive(Debug, Clone, Serialize)]
struct CurrentUser {
    user_id: i64,
    username: String,
}

/// Build the context every page shares.
///
/// Adds: `current_user`, `is_logged_in`, `flashes`, `degraded`, `admin_section`.
pub async fn page_context(session: &Session, path: &str) -> tera::Context {
    let mut context = tera::Context::new();

    let current_user = match session::current_user_id(session).await {
        Some(user_id) => Some(CurrentUser {
            user_id,
            username: session::current_username(session).await.unwrap_or_default(),
        }),
        None => None,
    };
    context.insert("is_logged_in", &current_user.is_some());
    context.insert("current_user", &current_user);
    context.insert("flashes", &session::take_flashes(session).await);
    context.insert("degraded", &false);
    context.insert("admin_section", &ThemeEngine::is_admin_path(path));
    context
}

/// Render a template, falling back to a bare error page.
pub fn render(state: &AppState, template: &str, context: &tera::Context) -> Response {
    render_with_status(state, StatusCode::OK, template, context)
}

/// Render a template with an explicit status code.
pub fn render_with_status(
    state: &AppState,
    status: StatusCode,
    template: &str,
    context: &tera::Context,
) -> Response {
    match state.theme().render(template, context) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, template = %template, "failed to render template");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!(
                    r#"<!DOCTYPE html>
<html><head><title>Error</title></head>
<body><h1>Template Error</h1><pre>{}</pre></body></html>"#,
                    html_escape(&format!("{e:#}"))
                )),
            )
                .into_response()
        }
    }
}

/// Render the error page.
pub async fn render_error(
    state: &AppState,
    session: &Session,
    status: StatusCode,
    message: &str,
) -> Response {
    let mut context = page_context(session, "").await;
    context.insert("status", &status.as_u16());
    context.insert("error_message", message);
    render_with_status(state, status, "error.html", &context)
}

/// Page shown when the datastore is unreachable for a page that cannot
/// degrade to empty data.
pub async fn unavailable(state: &AppState, session: &Session) -> Response {
    render_error(state, session, StatusCode::SERVICE_UNAVAILABLE, DATABASE_UNAVAILABLE).await
}

/// Require an authenticated user, or redirect to the user center.
///
/// A session pointing at a deleted account is cleared.
pub async fn require_login(
    conn: &mut MySqlConnection,
    session: &Session,
) -> Result<User, Response> {
    let user_id: Option<i64> = session.get(SESSION_USER_ID).await.ok().flatten();

    if let Some(id) = user_id {
        match User::find_by_id(conn, id).await {
            Ok(Some(user)) => return Ok(user),
            Ok(None) => session::sign_out(session).await,
            Err(e) => tracing::error!(error = %e, "failed to load session user"),
        }
    }

    Err(Redirect::to(LOGIN_REDIRECT).into_response())
}

/// Require an authenticated **admin** user, or redirect/reject.
///
/// Returns 403 if the user exists but is not an admin.
pub async fn require_admin(
    conn: &mut MySqlConnection,
    session: &Session,
) -> Result<User, Response> {
    let user = require_login(conn, session).await?;
    if user.is_admin {
        return Ok(user);
    }
    Err((StatusCode::FORBIDDEN, Html("Access denied")).into_response())
}

/// HTML-escape a string for safe output.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;
    use crate::session::{FlashLevel, push_flash};

    #[test]
    fn test_html_escape_special_chars() {
        assert_eq!(
            html_escape("<script>alert('xss')</script>"),
            "&lt;script&gt;alert(&#x27;xss&#x27;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_html_escape_plain_text() {
        assert_eq!(html_escape("青铜鼎 & 玉璧"), "青铜鼎 &amp; 玉璧");
    }

    #[tokio::test]
    async fn page_context_for_guest() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        push_flash(&session, FlashLevel::Info, "已退出登录").await;

        let context = page_context(&session, "/admin/logs").await.into_json();
        assert_eq!(context["is_logged_in"], false);
        assert!(context["current_user"].is_null());
        assert_eq!(context["flashes"][0]["message"], "已退出登录");
        assert_eq!(context["flashes"][0]["level"], "info");
        assert_eq!(context["admin_section"], true);
        assert_eq!(context["degraded"], false);
    }

    #[tokio::test]
    async fn page_context_for_member() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        session::sign_in(&session, 9, "curator").await.unwrap();

        let context = page_context(&session, "/").await.into_json();
        assert_eq!(context["is_logged_in"], true);
        assert_eq!(context["current_user"]["username"], "curator");
        assert_eq!(context["admin_section"], false);
    }
}
