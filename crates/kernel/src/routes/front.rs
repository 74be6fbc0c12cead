//! Homepage and artifact listings.

use axum::http::{StatusCode, Uri};
use axum::{Router, extract::State, response::Response, routing::get};
use tower_sessions::Session;

use crate::catalog::{CategoryDimension, ImageStrip};
use crate::models::ArtifactCard;
use crate::models::artifact::strip_images;
use crate::state::AppState;

use super::helpers::{page_context, render, render_error};

/// Create the front page router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(homepage))
        .route("/collection", get(collection))
        .route("/explore", get(random_browse))
        .route("/random", get(random_browse))
}

/// Homepage with three image strips.
///
/// Any datastore problem leaves the strips empty; the page always renders.
async fn homepage(State(state): State<AppState>, session: Session) -> Response {
    let mut context = page_context(&session, "/").await;

    let strips = [
        ("random_images", ImageStrip::Random),
        ("culture_images", ImageStrip::Dimension(CategoryDimension::Culture)),
        ("geography_images", ImageStrip::Dimension(CategoryDimension::Geography)),
    ];

    let mut conn = state.acquire().await;
    context.insert("degraded", &conn.is_none());

    let queries = state.queries();
    for (key, strip) in strips {
        let images = match conn.as_mut() {
            Some(conn) => strip_images(conn, &queries, strip).await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, strip = key, "homepage strip query failed");
                Vec::new()
            }),
            None => Vec::new(),
        };
        context.insert(key, &images);
    }

    render(&state, "homepage.html", &context)
}

/// Which listing a request asked for.
#[derive(Debug, Clone, Copy)]
enum Listing {
    Newest,
    Random,
}

impl Listing {
    fn title(self) -> &'static str {
        match self {
            Listing::Newest => "全部藏品",
            Listing::Random => "随机浏览",
        }
    }
}

async fn render_listing(
    state: &AppState,
    session: &Session,
    path: &str,
    listing: Listing,
) -> Response {
    let mut context = page_context(session, path).await;
    context.insert("page_title", listing.title());

    let Some(mut conn) = state.acquire().await else {
        context.insert("degraded", &true);
        context.insert("artifacts", &Vec::<ArtifactCard>::new());
        return render(state, "listing.html", &context);
    };

    let queries = state.queries();
    let artifacts = match listing {
        Listing::Newest => ArtifactCard::list(&mut conn, &queries).await,
        Listing::Random => ArtifactCard::list_random(&mut conn, &queries).await,
    };

    match artifacts {
        Ok(artifacts) => {
            context.insert("artifacts", &artifacts);
            render(state, "listing.html", &context)
        }
        Err(e) => {
            tracing::error!(error = %e, "artifact listing failed");
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

/// All artifacts, newest first.
async fn collection(State(state): State<AppState>, session: Session) -> Response {
    render_listing(&state, &session, "/collection", Listing::Newest).await
}

/// All artifacts in random order.
async fn random_browse(State(state): State<AppState>, session: Session, uri: Uri) -> Response {
    render_listing(&state, &session, uri.path(), Listing::Random).await
}
