// File-backed key-value store for the signed-in user and preferences
use crate::domain::preferences::{Preferences, PreferencesUpdate};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_sync: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preferences: Option<PreferencesUpdate>,
}

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn save_username(&self, username: &str) -> Result<()> {
        let mut data = self.read().await;
        data.username = Some(username.to_string());
        self.write(&data).await?;
        tracing::info!("Username saved: {}", username);
        Ok(())
    }

    pub async fn get_username(&self) -> Option<String> {
        self.read().await.username
    }

    pub async fn remove_username(&self) -> Result<()> {
        let mut data = self.read().await;
        if data.username.take().is_some() {
            self.write(&data).await?;
            tracing::info!("Username removed");
        }
        Ok(())
    }

    pub async fn is_logged_in(&self) -> bool {
        self.get_username()
            .await
            .is_some_and(|username| !username.trim().is_empty())
    }

    pub async fn save_last_sync(&self, timestamp: &str) -> Result<()> {
        let mut data = self.read().await;
        data.last_sync = Some(timestamp.to_string());
        self.write(&data).await
    }

    pub async fn get_last_sync(&self) -> Option<String> {
        self.read().await.last_sync
    }

    /// Merge `update` over the stored preferences and persist the result.
    pub async fn save_preferences(&self, update: &PreferencesUpdate) -> Result<Preferences> {
        let mut data = self.read().await;
        let merged = resolve_preferences(data.preferences.as_ref()).merged(update);
        data.preferences = Some(PreferencesUpdate {
            auto_refresh: Some(merged.auto_refresh),
            refresh_interval: Some(merged.refresh_interval),
            theme: Some(merged.theme),
            notifications: Some(merged.notifications),
        });
        self.write(&data).await?;
        tracing::info!("Preferences saved: {:?}", merged);
        Ok(merged)
    }

    /// Stored preferences over the defaults. Never fails.
    pub async fn get_preferences(&self) -> Preferences {
        resolve_preferences(self.read().await.preferences.as_ref())
    }

    pub async fn clear_all(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to remove {}", self.path.display()));
            }
        }
        tracing::info!("All stored data cleared");
        Ok(())
    }

    /// Missing or unreadable files read as empty.
    async fn read(&self) -> StoredData {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return StoredData::default(),
            Err(e) => {
                tracing::error!("Failed to read {}: {}", self.path.display(), e);
                return StoredData::default();
            }
        };

        toml::from_str(&contents).unwrap_or_else(|e| {
            tracing::error!("Ignoring corrupt store {}: {}", self.path.display(), e);
            StoredData::default()
        })
    }

    async fn write(&self, data: &StoredData) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string(data).context("Failed to serialize store")?;
        tokio::fs::write(&self.path, contents)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

fn resolve_preferences(stored: Option<&PreferencesUpdate>) -> Preferences {
    match stored {
        Some(update) => Preferences::default().merged(update),
        None => Preferences::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::preferences::Theme;

    fn temp_store(name: &str) -> FileStore {
        let path = std::env::temp_dir()
            .join(format!("amper-tracker-{}-{}", std::process::id(), name))
            .join("store.toml");
        let _ = std::fs::remove_file(&path);
        FileStore::new(path)
    }

    #[tokio::test]
    async fn test_username_round_trip() {
        let store = temp_store("username");
        assert_eq!(store.get_username().await, None);
        assert!(!store.is_logged_in().await);

        store.save_username("ayse").await.unwrap();
        assert_eq!(store.get_username().await.as_deref(), Some("ayse"));
        assert!(store.is_logged_in().await);

        store.remove_username().await.unwrap();
        assert_eq!(store.get_username().await, None);
    }

    #[tokio::test]
    async fn test_preferences_merge_and_persist() {
        let store = temp_store("preferences");
        assert_eq!(store.get_preferences().await, Preferences::default());

        let update = PreferencesUpdate { theme: Some(Theme::Dark), ..Default::default() };
        store.save_preferences(&update).await.unwrap();

        let update = PreferencesUpdate { refresh_interval: Some(30), ..Default::default() };
        let saved = store.save_preferences(&update).await.unwrap();

        assert_eq!(saved.theme, Theme::Dark);
        assert_eq!(saved.refresh_interval, 30);
        assert_eq!(store.get_preferences().await, saved);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = temp_store("independent");
        store.save_username("berk").await.unwrap();
        store.save_last_sync("2024-05-01T10:00:00Z").await.unwrap();
        store
            .save_preferences(&PreferencesUpdate { notifications: Some(false), ..Default::default() })
            .await
            .unwrap();

        assert_eq!(store.get_username().await.as_deref(), Some("berk"));
        assert_eq!(store.get_last_sync().await.as_deref(), Some("2024-05-01T10:00:00Z"));
        assert!(!store.get_preferences().await.notifications);

        store.clear_all().await.unwrap();
        assert_eq!(store.get_username().await, None);
        assert_eq!(store.get_last_sync().await, None);
        assert_eq!(store.get_preferences().await, Preferences::default());
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_empty() {
        let store = temp_store("corrupt");
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "username = [not toml").unwrap();

        assert_eq!(store.get_username().await, None);
        assert_eq!(store.get_preferences().await, Preferences::default());

        // Writing replaces the corrupt contents
        store.save_username("cem").await.unwrap();
        assert_eq!(store.get_username().await.as_deref(), Some("cem"));
    }

    #[tokio::test]
    async fn test_partial_preferences_fall_back_to_defaults() {
        let store = temp_store("partial");
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "[preferences]\ntheme = \"light\"\n").unwrap();

        let prefs = store.get_preferences().await;
        assert_eq!(prefs.theme, Theme::Light);
        assert_eq!(prefs.refresh_interval, 60);
    }
}
