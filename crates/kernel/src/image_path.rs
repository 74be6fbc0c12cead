//! Canonicalization of stored image paths.
//!
//! Image rows were loaded from several machines, so stored paths may be
//! Windows-style, absolute, or carry a redundant `static/` prefix. Pages
//! serve them from `/static/images/...`, so every path is reduced to a
//! relative path under `images/`.

/// Logical prefix every served image path starts with.
pub const IMAGE_PREFIX: &str = "images/";

/// Directory the scraped images were originally downloaded into.
const KNOWN_IMAGE_DIR: &str = "met_images";

/// Drop everything up to and including the last `static` segment.
///
/// Returns `None` when there is no such segment.
fn after_static_segment(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').collect();
    let index = segments
        .iter()
        .rposition(|segment| segment.eq_ignore_ascii_case("static"))?;
    Some(segments[index + 1..].join("/"))
}

/// Keep everything from the first known image directory segment onward.
fn from_image_dir_segment(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').collect();
    let index = segments
        .iter()
        .position(|segment| segment.eq_ignore_ascii_case(KNOWN_IMAGE_DIR))?;
    Some(segments[index..].join("/"))
}

/// Normalize a stored image path into a web-servable relative path.
///
/// Returns `None` for missing or empty input, or when nothing remains after
/// stripping. Otherwise the result is non-empty and starts with
/// [`IMAGE_PREFIX`]. Normalizing a normalized path returns it unchanged.
pub fn normalize_image_path(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    let slashed = raw.replace('\\', "/");
    let mut path = slashed
        .strip_prefix('/')
        .unwrap_or(slashed.as_str())
        .to_string();

    if let Some(rest) = after_static_segment(&path) {
        path = rest;
    }

    // A drive letter survived, so the path was absolute on some machine.
    if path.contains(':') {
        if let Some(rest) = after_static_segment(&path).or_else(|| from_image_dir_segment(&path)) {
            path = rest;
        }
    }

    if path.is_empty() {
        return None;
    }
    if path.starts_with(IMAGE_PREFIX) {
        Some(path)
    } else {
        Some(format!("{IMAGE_PREFIX}{path}"))
    }
}
