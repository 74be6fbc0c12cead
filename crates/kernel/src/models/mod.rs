//! Database models.

pub mod album;
pub mod artifact;
pub mod category;
pub mod export;
pub mod user;

pub use album::{Album, CollectionStats, DEFAULT_ALBUM_NAME, GUEST_ALBUM_ID};
pub use artifact::{ArtifactCard, ArtifactDetail};
pub use category::{CategoryPage, CategorySummary};
pub use export::ExportRecord;
pub use user::{CreateUser, User};
