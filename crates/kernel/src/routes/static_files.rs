//! Static file serving.
//!
//! Artifact images live under `images/` in the static directory, which is
//! where normalized image paths point.

use std::path::{Component, Path as FsPath, PathBuf};

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::fs;
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Create the static files router.
pub fn router() -> Router<AppState> {
    Router::new().route("/static/{*path}", get(serve_static))
}

/// Resolve a request path inside `root`.
///
/// Only plain segments are accepted, so the result never leaves `root`.
fn resolve(root: &FsPath, requested: &str) -> Option<PathBuf> {
    let requested = requested.trim_start_matches('/');
    if requested.is_empty() || requested.contains('\0') {
        return None;
    }
    let relative = FsPath::new(requested);
    if !relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

/// Serve a static file.
async fn serve_static(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> AppResult<Response> {
    let file_path = resolve(state.static_dir(), &path).ok_or(AppError::NotFound)?;

    let content = match fs::read(&file_path).await {
        Ok(content) => content,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %file_path.display(), error = %e, "failed to read static file");
            }
            return Err(AppError::NotFound);
        }
    };

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime_from_path(&file_path)),
            // 1 day cache
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        content,
    )
        .into_response())
}

fn mime_from_path(path: &FsPath) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("html") => "text/html",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("svg") => "image/svg+xml",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn resolve_stays_inside_root() {
        let root = FsPath::new("/srv/static");
        assert_eq!(
            resolve(root, "images/met/1.jpg"),
            Some(PathBuf::from("/srv/static/images/met/1.jpg"))
        );
        assert_eq!(resolve(root, "../secrets.txt"), None);
        assert_eq!(resolve(root, "images/../../etc/passwd"), None);
        assert_eq!(resolve(root, "./images/a.jpg"), None);
        assert_eq!(resolve(root, ""), None);
    }

    #[test]
    fn leading_slashes_are_ignored() {
        let root = FsPath::new("static");
        assert_eq!(resolve(root, "//css/site.css"), Some(PathBuf::from("static/css/site.css")));
    }

    #[test]
    fn image_types_by_extension() {
        assert_eq!(mime_from_path(FsPath::new("a/b.JPG")), "image/jpeg");
        assert_eq!(mime_from_path(FsPath::new("a/b.webp")), "image/webp");
        assert_eq!(mime_from_path(FsPath::new("a/b")), "application/octet-stream");
    }
}
