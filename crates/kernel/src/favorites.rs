//! Favorited artifacts.
//!
//! Guests keep favorites in their session; logged-in users keep them as
//! album membership. Both sides implement [`FavoriteStore`] so handlers can
//! add and remove without caring which one they hold.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::MySqlConnection;
use tower_sessions::Session;

use crate::models::Album;
use crate::session::SESSION_GUEST_FAVORITES;

/// Something that holds a set of favorited artifact ids.
#[async_trait]
pub trait FavoriteStore: Send {
    /// Favorited ids in the order they were added.
    async fn list_favorites(&mut self) -> Result<Vec<i64>>;

    /// Add an id; returns false when it was already present.
    async fn add_favorite(&mut self, artifact_id: i64) -> Result<bool>;

    /// Remove an id; returns false when it was not present.
    async fn remove_favorite(&mut self, artifact_id: i64) -> Result<bool>;
}

/// Favorites of an anonymous visitor, stored in the session.
pub struct GuestFavorites<'a> {
    session: &'a Session,
}

impl<'a> GuestFavorites<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    async fn store(&self, ids: Vec<i64>) -> Result<()> {
        self.session
            .insert(SESSION_GUEST_FAVORITES, ids)
            .await
            .context("failed to store guest favorites")
    }
}

#[async_trait]
impl FavoriteStore for GuestFavorites<'_> {
    async fn list_favorites(&mut self) -> Result<Vec<i64>> {
        let ids: Option<Vec<i64>> = self
            .session
            .get(SESSION_GUEST_FAVORITES)
            .await
            .context("failed to read guest favorites")?;
        Ok(ids.unwrap_or_default())
    }

    async fn add_favorite(&mut self, artifact_id: i64) -> Result<bool> {
        let mut ids = self.list_favorites().await?;
        if ids.contains(&artifact_id) {
            return Ok(false);
        }
        ids.push(artifact_id);
        self.store(ids).await?;
        Ok(true)
    }

    async fn remove_favorite(&mut self, artifact_id: i64) -> Result<bool> {
        let mut ids = self.list_favorites().await?;
        let before = ids.len();
        ids.retain(|id| *id != artifact_id);
        if ids.len() == before {
            return Ok(false);
        }
        self.store(ids).await?;
        Ok(true)
    }
}

/// Favorites kept as membership of one album.
pub struct AlbumFavorites<'a> {
    conn: &'a mut MySqlConnection,
    album_id: i64,
}

impl<'a> AlbumFavorites<'a> {
    /// The caller has already checked that the album belongs to the user.
    pub fn new(conn: &'a mut MySqlConnection, album_id: i64) -> Self {
        Self { conn, album_id }
    }
}

#[async_trait]
impl FavoriteStore for AlbumFavorites<'_> {
    async fn list_favorites(&mut self) -> Result<Vec<i64>> {
        Album::artifact_ids(self.conn, self.album_id).await
    }

    async fn add_favorite(&mut self, artifact_id: i64) -> Result<bool> {
        Album::add_artifact(self.conn, self.album_id, artifact_id).await
    }

    async fn remove_favorite(&mut self, artifact_id: i64) -> Result<bool> {
        Album::remove_artifact(self.conn, self.album_id, artifact_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn guest_favorites_start_empty() {
        let session = session();
        let mut favorites = GuestFavorites::new(&session);
        assert!(favorites.list_favorites().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn guest_add_is_deduplicated_and_ordered() {
        let session = session();
        let mut favorites = GuestFavorites::new(&session);
        assert!(favorites.add_favorite(3).await.unwrap());
        assert!(favorites.add_favorite(1).await.unwrap());
        assert!(!favorites.add_favorite(3).await.unwrap());
        assert_eq!(favorites.list_favorites().await.unwrap(), vec![3, 1]);

        let stored: Vec<i64> = session.get(SESSION_GUEST_FAVORITES).await.unwrap().unwrap();
        assert_eq!(stored, vec![3, 1]);
    }

    #[tokio::test]
    async fn guest_remove_reports_membership() {
        let session = session();
        let mut favorites = GuestFavorites::new(&session);
        favorites.add_favorite(5).await.unwrap();
        assert!(!favorites.remove_favorite(9).await.unwrap());
        assert!(favorites.remove_favorite(5).await.unwrap());
        assert!(favorites.list_favorites().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn works_through_trait_object() {
        let session = session();
        let mut guest = GuestFavorites::new(&session);
        let store: &mut dyn FavoriteStore = &mut guest;
        store.add_favorite(42).await.unwrap();
        assert_eq!(store.list_favorites().await.unwrap(), vec![42]);
    }
}
