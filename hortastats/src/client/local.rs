//! Local persistent storage for the client fallback path
//!
//! A `LocalStore` is a string key-value store with browser local storage
//! semantics. Posts live under a single key as one JSON array, newest
//! first; every operation reads the whole array and writes it back.

use crate::config::{POSTS_STORAGE_KEY, POST_AUTHOR};
use crate::database::{Post, PostFields};
use crate::error::{AppError, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Synchronous string key-value store
pub trait LocalStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

impl<S: LocalStore + ?Sized> LocalStore for Arc<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }
}

/// In-memory store, gone with the process
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| AppError::Generic("Local store lock poisoned".to_string()))
    }
}

impl LocalStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items()?.remove(key);
        Ok(())
    }
}

/// Store persisted as one JSON object on disk
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::Generic(format!("Failed to parse local store: {}", e)))
    }

    fn save(&self, items: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write to temp file first (atomic write)
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, serde_json::to_string_pretty(items)?)?;
        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    fn update<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| AppError::Generic("Local store lock poisoned".to_string()))?;

        let mut items = self.load()?;
        apply(&mut items);
        self.save(&items)
    }
}

impl LocalStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.update(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.update(|items| {
            items.remove(key);
        })
    }
}

/// Read the locally kept posts, initializing the key with `[]` on first use
pub fn load_posts<S: LocalStore + ?Sized>(store: &S) -> Result<Vec<Post>> {
    match store.get_item(POSTS_STORAGE_KEY)? {
        Some(saved) => Ok(serde_json::from_str(&saved)?),
        None => {
            let posts = Vec::new();
            store.set_item(POSTS_STORAGE_KEY, &serde_json::to_string(&posts)?)?;
            Ok(posts)
        }
    }
}

fn save_posts<S: LocalStore + ?Sized>(store: &S, posts: &[Post]) -> Result<()> {
    store.set_item(POSTS_STORAGE_KEY, &serde_json::to_string(posts)?)
}

/// Timestamp-derived id, bumped past the newest existing one so two
/// creates in the same millisecond still get distinct ids
fn next_local_id(posts: &[Post]) -> i64 {
    let now = Utc::now().timestamp_millis();
    let highest = posts.iter().map(|post| post.id).max().unwrap_or(0);
    now.max(highest + 1)
}

/// Prepend a new post to the local array
pub fn insert_post<S: LocalStore + ?Sized>(store: &S, fields: &PostFields) -> Result<Post> {
    let mut posts = match store.get_item(POSTS_STORAGE_KEY)? {
        Some(saved) => serde_json::from_str(&saved)?,
        None => Vec::new(),
    };

    let post = Post {
        id: next_local_id(&posts),
        plant_type: fields.plant_type.clone(),
        plant_age: fields.plant_age.clone(),
        planting_date: fields.planting_date.clone(),
        height: fields.height.clone(),
        weather: fields.weather.clone(),
        temperature: fields.temperature.clone(),
        watering: fields.watering.clone(),
        fertilizer: fields.fertilizer.clone(),
        pest_problems: fields.pest_problems.clone(),
        notes: fields.notes.clone(),
        expected_harvest: fields.expected_harvest.clone(),
        author: POST_AUTHOR.to_string(),
        created_at: Utc::now(),
        updated_at: None,
        images: Vec::new(),
    };

    posts.insert(0, post.clone());
    save_posts(store, &posts)?;

    Ok(post)
}

/// Drop a post from the local array. A missing key or id is not an error.
pub fn remove_post<S: LocalStore + ?Sized>(store: &S, id: i64) -> Result<()> {
    if let Some(saved) = store.get_item(POSTS_STORAGE_KEY)? {
        let mut posts: Vec<Post> = serde_json::from_str(&saved)?;
        posts.retain(|post| post.id != id);
        save_posts(store, &posts)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fields(plant: &str) -> PostFields {
        PostFields {
            plant_type: Some(plant.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_load_initializes_empty_array() {
        let store = MemoryStore::new();

        assert!(load_posts(&store).unwrap().is_empty());
        assert_eq!(
            store.get_item(POSTS_STORAGE_KEY).unwrap().as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn test_insert_prepends_with_unique_ids() {
        let store = MemoryStore::new();

        let first = insert_post(&store, &fields("Basil")).unwrap();
        let second = insert_post(&store, &fields("Chili")).unwrap();

        assert!(second.id > first.id);
        assert_eq!(second.author, "admin");

        let posts = load_posts(&store).unwrap();
        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_remove_filters_by_id() {
        let store = MemoryStore::new();
        let keep = insert_post(&store, &fields("Kale")).unwrap();
        let drop = insert_post(&store, &fields("Leek")).unwrap();

        remove_post(&store, drop.id).unwrap();
        remove_post(&store, 1).unwrap();

        let posts = load_posts(&store).unwrap();
        assert_eq!(posts, vec![keep]);
    }

    #[test]
    fn test_remove_without_key_is_noop() {
        let store = MemoryStore::new();

        remove_post(&store, 5).unwrap();

        assert!(store.get_item(POSTS_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_blob_is_an_error() {
        let store = MemoryStore::new();
        store.set_item(POSTS_STORAGE_KEY, "{oops").unwrap();

        assert!(load_posts(&store).is_err());
        assert!(insert_post(&store, &fields("Pea")).is_err());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("local").join("storage.json");

        let store = FileStore::new(path.clone());
        store.set_item("adminToken", "local-token-1").unwrap();
        let post = insert_post(&store, &fields("Onion")).unwrap();

        let reopened = FileStore::new(path);
        assert_eq!(
            reopened.get_item("adminToken").unwrap().as_deref(),
            Some("local-token-1")
        );
        assert_eq!(load_posts(&reopened).unwrap(), vec![post]);

        reopened.remove_item("adminToken").unwrap();
        assert!(reopened.get_item("adminToken").unwrap().is_none());
    }
}
