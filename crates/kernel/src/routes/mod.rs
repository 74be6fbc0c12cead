//! HTTP route handlers.

pub mod admin;
pub mod album;
pub mod artifact;
pub mod auth;
pub mod category;
pub mod front;
pub mod health;
pub mod helpers;
pub mod search;
pub mod static_files;
pub mod user;

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::state::AppState;

/// Assemble the full application router.
///
/// Generic over the session store so tests can run against an in-memory
/// store instead of Redis.
pub fn build_app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    Router::new()
        .merge(front::router())
        .merge(artifact::router())
        .merge(search::router())
        .merge(category::router())
        .merge(auth::router())
        .merge(user::router())
        .merge(album::router())
        .merge(admin::router())
        .merge(health::router())
        .merge(static_files::router())
        // Middleware layers (last added = first executed in request flow):
        // TraceLayer → compression → session → client ip → routes
        .layer(axum::middleware::from_fn(
            crate::middleware::resolve_client_ip,
        ))
        .layer(session_layer)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
