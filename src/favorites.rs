//! Favorite speakers, persisted as a flat JSON array of identifiers

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Favorites file on disk. Every change rewrites the whole file.
#[derive(Debug, Clone)]
pub struct FavoritesStore {
    path: PathBuf,
}

impl FavoritesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current favorites; a missing file means none
    pub async fn load(&self) -> Result<BTreeSet<String>> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No favorites file at {}", self.path.display());
                return Ok(BTreeSet::new());
            }
            Err(e) => return Err(e.into()),
        };

        let ids: Vec<String> = serde_json::from_str(&json)?;
        Ok(ids.into_iter().collect())
    }

    pub async fn save(&self, favorites: &BTreeSet<String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(favorites)?;
        tokio::fs::write(&self.path, json).await?;
        log::info!("Saved {} favorites to {}", favorites.len(), self.path.display());
        Ok(())
    }

    /// Flip membership of `id` and persist. Returns whether `id` is now a favorite.
    pub async fn toggle(&self, id: &str) -> Result<bool> {
        let mut favorites = self.load().await?;
        let now_favorite = if favorites.remove(id) {
            false
        } else {
            favorites.insert(id.to_string());
            true
        };
        self.save(&favorites).await?;
        Ok(now_favorite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LineupError;

    #[tokio::test]
    async fn missing_file_is_an_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = FavoritesStore::new(dir.path().join("favorites.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggle_adds_then_removes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FavoritesStore::new(dir.path().join("nested").join("favorites.json"));

        assert!(store.toggle("388f246b-8c41-4ac1-8e2d-5d79f3ff56d9").await.unwrap());
        assert!(store.toggle("7ffcb7ce-00ec-4bdc-82cd-45a8889e43ff").await.unwrap());
        assert!(!store.toggle("388f246b-8c41-4ac1-8e2d-5d79f3ff56d9").await.unwrap());

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains("7ffcb7ce-00ec-4bdc-82cd-45a8889e43ff"));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let on_disk: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(on_disk, vec!["7ffcb7ce-00ec-4bdc-82cd-45a8889e43ff"]);
    }

    #[tokio::test]
    async fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = FavoritesStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, LineupError::Json(_)));
    }
}
