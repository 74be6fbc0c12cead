//! User center and album pages.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Router, routing::get};
use serde::Serialize;
use sqlx::MySqlConnection;
use tower_sessions::Session;

use crate::favorites::{FavoriteStore, GuestFavorites};
use crate::models::{
    Album, ArtifactCard, CollectionStats, DEFAULT_ALBUM_NAME, ExportRecord, GUEST_ALBUM_ID, User,
};
use crate::session;
use crate::state::AppState;

use super::helpers::{LOGIN_REDIRECT, page_context, render, render_error, require_login, unavailable};

/// Create the user center router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user", get(dashboard))
        .route("/user_center", get(dashboard))
        .route("/user/collections", get(collections))
        .route("/album/guest", get(guest_album))
        .route("/album/{id}", get(album_detail))
}

/// Which half of the user center is shown.
#[derive(Debug, Clone, Copy)]
enum PageView {
    Dashboard,
    Collections,
}

impl PageView {
    fn as_str(self) -> &'static str {
        match self {
            PageView::Dashboard => "dashboard",
            PageView::Collections => "collections",
        }
    }
}

/// The guest's session favorites presented as a single album.
#[derive(Debug, Clone, Serialize)]
struct GuestAlbum {
    album_id: &'static str,
    name: &'static str,
    is_public: bool,
    item_count: usize,
    cover_image: Option<String>,
}

impl GuestAlbum {
    fn new(item_count: usize, cover_image: Option<String>) -> Self {
        Self {
            album_id: GUEST_ALBUM_ID,
            name: DEFAULT_ALBUM_NAME,
            is_public: true,
            item_count,
            cover_image,
        }
    }
}

/// Everything the member dashboard shows.
struct MemberDashboard {
    albums: Vec<Album>,
    stats: CollectionStats,
    export_records: Vec<ExportRecord>,
}

async fn load_member_dashboard(
    conn: &mut MySqlConnection,
    state: &AppState,
    user: &User,
) -> anyhow::Result<MemberDashboard> {
    let schema = state.schema();
    let mut albums = Album::list_for_user(conn, schema, user.user_id).await?;
    if !albums.iter().any(Album::is_default) {
        Album::default_for_user(conn, user.user_id).await?;
        albums = Album::list_for_user(conn, schema, user.user_id).await?;
    }

    let collected = Album::collected_rows(conn, schema, user.user_id).await?;
    let export_records = ExportRecord::recent_for_user(conn, user.user_id).await?;

    Ok(MemberDashboard {
        albums,
        stats: CollectionStats::from_rows(&collected),
        export_records,
    })
}

/// Render the user center for a logged-in user.
async fn render_member(
    state: &AppState,
    session: &Session,
    conn: &mut MySqlConnection,
    user: User,
    path: &str,
    view: PageView,
) -> Response {
    let dashboard = match load_member_dashboard(conn, state, &user).await {
        Ok(dashboard) => dashboard,
        Err(e) => {
            tracing::error!(error = %e, user_id = user.user_id, "failed to load user center");
            return render_error(
                state,
                session,
                StatusCode::INTERNAL_SERVER_ERROR,
                "数据库查询错误",
            )
            .await;
        }
    };

    let mut context = page_context(session, path).await;
    context.insert("page_view", view.as_str());
    context.insert("user", &user);
    context.insert("albums", &dashboard.albums);
    context.insert("stats", &dashboard.stats);
    context.insert("export_records", &dashboard.export_records);
    render(state, "user_center.html", &context)
}

/// Render the guest view with the virtual default album.
async fn render_guest(state: &AppState, session: &Session) -> Response {
    let favorites = GuestFavorites::new(session)
        .list_favorites()
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to read guest favorites");
            Vec::new()
        });

    let mut context = page_context(session, LOGIN_REDIRECT).await;
    let cover_image = match (favorites.first(), state.acquire().await) {
        (Some(first), Some(mut conn)) => {
            match ArtifactCard::list_by_ids(&mut conn, &state.queries(), &[*first]).await {
                Ok(cards) => cards.into_iter().next().and_then(|card| card.local_path),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to load guest album cover");
                    None
                }
            }
        }
        (Some(_), None) => {
            context.insert("degraded", &true);
            None
        }
        (None, _) => None,
    };

    context.insert("page_view", PageView::Dashboard.as_str());
    context.insert("albums", &[GuestAlbum::new(favorites.len(), cover_image)]);
    render(state, "user_center.html", &context)
}

async fn render_user_center(
    state: &AppState,
    session: &Session,
    path: &str,
    view: PageView,
) -> Response {
    if session::current_user_id(session).await.is_none() {
        return match view {
            PageView::Dashboard => render_guest(state, session).await,
            PageView::Collections => Redirect::to(LOGIN_REDIRECT).into_response(),
        };
    }

    let Some(mut conn) = state.acquire().await else {
        return unavailable(state, session).await;
    };
    let user = match require_login(&mut conn, session).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    render_member(state, session, &mut conn, user, path, view).await
}

/// Dashboard: albums, collection statistics, export history.
///
/// GET /user, GET /user_center
async fn dashboard(State(state): State<AppState>, session: Session) -> Response {
    render_user_center(&state, &session, LOGIN_REDIRECT, PageView::Dashboard).await
}

/// Album management view; members only.
///
/// GET /user/collections
async fn collections(State(state): State<AppState>, session: Session) -> Response {
    render_user_center(&state, &session, "/user/collections", PageView::Collections).await
}

/// One of the user's own albums.
///
/// GET /album/{id}
async fn album_detail(
    State(state): State<AppState>,
    session: Session,
    Path(album_id): Path<i64>,
) -> Response {
    if session::current_user_id(&session).await.is_none() {
        return Redirect::to(LOGIN_REDIRECT).into_response();
    }
    let Some(mut conn) = state.acquire().await else {
        return unavailable(&state, &session).await;
    };
    let user = match require_login(&mut conn, &session).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let loaded = match Album::find_owned(&mut conn, state.schema(), user.user_id, album_id).await {
        Ok(Some(album)) => Album::artifacts(&mut conn, state.schema(), album.album_id)
            .await
            .map(|artifacts| Some((album, artifacts))),
        Ok(None) => Ok(None),
        Err(e) => Err(e),
    };

    match loaded {
        Ok(Some((album, artifacts))) => {
            let mut context = page_context(&session, &format!("/album/{album_id}")).await;
            context.insert("album", &album);
            context.insert("artifacts", &artifacts);
            render(&state, "album_detail.html", &context)
        }
        Ok(None) => render_error(&state, &session, StatusCode::NOT_FOUND, "未找到该图集").await,
        Err(e) => {
            tracing::error!(error = %e, album_id, "album query failed");
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

/// The guest's session-backed default album.
///
/// GET /album/guest
async fn guest_album(State(state): State<AppState>, session: Session) -> Response {
    let favorites = GuestFavorites::new(&session)
        .list_favorites()
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to read guest favorites");
            Vec::new()
        });

    let mut context = page_context(&session, "/album/guest").await;
    let artifacts = if favorites.is_empty() {
        Vec::new()
    } else {
        match state.acquire().await {
            Some(mut conn) => ArtifactCard::list_by_ids(&mut conn, &state.queries(), &favorites)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "failed to load guest album");
                    Vec::new()
                }),
            None => {
                context.insert("degraded", &true);
                Vec::new()
            }
        }
    };

    context.insert("album", &GuestAlbum::new(artifacts.len(), None));
    context.insert("artifacts", &artifacts);
    render(&state, "album_detail.html", &context)
}
