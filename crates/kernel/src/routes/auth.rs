//! Authentication routes (register, login, logout).
//!
//! All three answer with a flash message and a redirect to the user center.

use axum::extract::{Extension, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::info;

use crate::middleware::ClientIp;
use crate::models::user::{default_username, validate_registration};
use crate::models::{Album, CreateUser, User};
use crate::session::{self, FlashLevel, push_flash};
use crate::state::AppState;

use super::helpers::LOGIN_REDIRECT;

/// Registration form.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub username: String,
}

/// Login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Create the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", get(to_user_center).post(register))
        .route("/login", get(to_user_center).post(login))
        .route("/logout", get(logout))
}

async fn to_user_center() -> Redirect {
    Redirect::to(LOGIN_REDIRECT)
}

/// Flash a message and go back to the user center.
async fn flash_redirect(session: &Session, level: FlashLevel, message: &str) -> Response {
    push_flash(session, level, message).await;
    Redirect::to(LOGIN_REDIRECT).into_response()
}

/// Registration handler.
///
/// POST /register (form data)
async fn register(
    State(state): State<AppState>,
    session: Session,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let email = form.email.trim();
    let password = form.password.trim();
    let username = form.username.trim();

    if let Err(message) = validate_registration(email, password) {
        return flash_redirect(&session, FlashLevel::Error, message).await;
    }

    let Some(mut conn) = state.acquire().await else {
        return flash_redirect(&session, FlashLevel::Error, "注册失败，请稍后重试").await;
    };

    match User::find_by_email(&mut conn, email).await {
        Ok(Some(_)) => {
            return flash_redirect(&session, FlashLevel::Error, "该邮箱已被注册").await;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, "failed to check existing email");
            return flash_redirect(&session, FlashLevel::Error, "注册失败，请稍后重试").await;
        }
    }

    let input = CreateUser {
        email: email.to_string(),
        password: password.to_string(),
        username: Some(username.to_string()).filter(|name| !name.is_empty()),
        is_admin: false,
    };
    let user_id = match User::create(&mut conn, input).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "failed to create user");
            return flash_redirect(&session, FlashLevel::Error, "注册失败，请稍后重试").await;
        }
    };

    if let Err(e) = Album::default_for_user(&mut conn, user_id).await {
        tracing::warn!(error = %e, user_id, "failed to create default album");
    }

    let display_name = if username.is_empty() {
        default_username(email)
    } else {
        username.to_string()
    };
    if let Err(e) = session::sign_in(&session, user_id, &display_name).await {
        tracing::error!(error = %e, "failed to start session after registration");
        return flash_redirect(&session, FlashLevel::Error, "注册失败，请稍后重试").await;
    }

    state
        .audit()
        .record(
            "register",
            "user",
            &user_id.to_string(),
            Some(user_id),
            &ip,
            serde_json::json!({ "email": email }),
        )
        .await;

    info!(user_id, "user registered");
    flash_redirect(&session, FlashLevel::Success, "注册成功！").await
}

/// Login handler.
///
/// POST /login (form data)
async fn login(
    State(state): State<AppState>,
    session: Session,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    Form(form): Form<LoginForm>,
) -> Response {
    let email = form.email.trim();
    let password = form.password.trim();

    if email.is_empty() || password.is_empty() {
        return flash_redirect(&session, FlashLevel::Error, "邮箱和密码不能为空").await;
    }

    let Some(mut conn) = state.acquire().await else {
        return flash_redirect(&session, FlashLevel::Error, "登录失败，请稍后重试").await;
    };

    let user = match User::find_by_email(&mut conn, email).await {
        Ok(Some(user)) if user.verify_password(password) => user,
        Ok(_) => {
            info!("failed login attempt");
            return flash_redirect(&session, FlashLevel::Error, "邮箱或密码错误").await;
        }
        Err(e) => {
            tracing::error!(error = %e, "database error during login");
            return flash_redirect(&session, FlashLevel::Error, "登录失败，请稍后重试").await;
        }
    };

    if let Err(e) = session::sign_in(&session, user.user_id, &user.display_name()).await {
        tracing::error!(error = %e, "failed to start session after login");
        return flash_redirect(&session, FlashLevel::Error, "登录失败，请稍后重试").await;
    }

    state
        .audit()
        .record(
            "login",
            "user",
            &user.user_id.to_string(),
            Some(user.user_id),
            &ip,
            serde_json::json!({}),
        )
        .await;

    info!(user_id = user.user_id, "user logged in");
    flash_redirect(&session, FlashLevel::Success, "登录成功！").await
}

/// Logout handler.
///
/// GET /logout
async fn logout(
    State(state): State<AppState>,
    session: Session,
    Extension(ClientIp(ip)): Extension<ClientIp>,
) -> Response {
    if let Some(user_id) = session::current_user_id(&session).await {
        state
            .audit()
            .record(
                "logout",
                "user",
                &user_id.to_string(),
                Some(user_id),
                &ip,
                serde_json::json!({}),
            )
            .await;
        info!(user_id, "user logged out");
    }

    session::sign_out(&session).await;
    flash_redirect(&session, FlashLevel::Info, "已退出登录").await
}
