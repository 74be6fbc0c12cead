//! Session management using Redis.

use anyhow::{Context, Result};
use fred::prelude::*;
use serde::{Deserialize, Serialize};
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};
use tower_sessions_redis_store::RedisStore;

/// Session key for the authenticated user id.
pub const SESSION_USER_ID: &str = "user_id";

/// Session key for the display name shown in the page header.
pub const SESSION_USERNAME: &str = "username";

/// Session key for the guest favorites list.
pub const SESSION_GUEST_FAVORITES: &str = "guest_collections";

/// Session key for pending flash messages.
const SESSION_FLASH: &str = "flash_messages";

/// Default session expiry (24 hours).
pub const DEFAULT_SESSION_EXPIRY_HOURS: i64 = 24;

/// Map a `COOKIE_SAME_SITE` value to a policy; unknown values mean `Lax`.
pub fn parse_same_site(value: &str) -> SameSite {
    match value {
        "strict" => SameSite::Strict,
        "none" => SameSite::None,
        _ => SameSite::Lax,
    }
}

/// Apply the cookie policy shared by every store.
pub fn configure_layer<S: SessionStore + Clone>(
    store: S,
    same_site: SameSite,
    secure: bool,
) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_secure(secure)
        .with_http_only(true)
        .with_same_site(same_site)
        .with_expiry(Expiry::OnInactivity(Duration::hours(DEFAULT_SESSION_EXPIRY_HOURS)))
}

/// Create the session layer using Redis as the backend.
pub async fn create_session_layer(
    redis_url: &str,
    same_site: SameSite,
    secure: bool,
) -> Result<SessionManagerLayer<RedisStore<Pool>>> {
    let config = Config::from_url(redis_url).context("failed to parse Redis URL")?;

    let pool = Builder::from_config(config)
        .build_pool(1)
        .context("failed to create Redis pool")?;

    pool.init()
        .await
        .context("failed to connect to Redis for sessions")?;

    Ok(configure_layer(RedisStore::new(pool), same_site, secure))
}

/// Severity of a flash message; doubles as the CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

/// A one-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

/// Queue a flash message.
pub async fn push_flash(session: &Session, level: FlashLevel, message: impl Into<String>) {
    let mut pending: Vec<Flash> = session.get(SESSION_FLASH).await.ok().flatten().unwrap_or_default();
    pending.push(Flash {
        level,
        message: message.into(),
    });
    if let Err(e) = session.insert(SESSION_FLASH, pending).await {
        tracing::warn!(error = %e, "failed to store flash message");
    }
}

/// Take and clear every pending flash message.
pub async fn take_flashes(session: &Session) -> Vec<Flash> {
    session
        .remove::<Vec<Flash>>(SESSION_FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Id of the logged-in user, if any.
pub async fn current_user_id(session: &Session) -> Option<i64> {
    session.get(SESSION_USER_ID).await.ok().flatten()
}

/// Display name of the logged-in user, if any.
pub async fn current_username(session: &Session) -> Option<String> {
    session.get(SESSION_USERNAME).await.ok().flatten()
}

/// Mark the session as belonging to a user.
///
/// The session id is rotated so a pre-login id cannot be reused.
pub async fn sign_in(session: &Session, user_id: i64, username: &str) -> Result<()> {
    session
        .cycle_id()
        .await
        .context("failed to rotate session id")?;
    session
        .insert(SESSION_USER_ID, user_id)
        .await
        .context("failed to store user id in session")?;
    session
        .insert(SESSION_USERNAME, username)
        .await
        .context("failed to store username in session")?;
    Ok(())
}

/// Drop everything the session holds, guest favorites included.
pub async fn sign_out(session: &Session) {
    session.clear().await;
}
