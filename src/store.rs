//! Persistent watch state, keyed by normalized page path.
//!
//! The whole map lives in one JSON blob. Every mutation is a single
//! read-full-map / patch-one-key / write-full-map step, so edits to other
//! paths in the same blob are never lost.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Fixed key the state map is stored under
pub const STATE_KEY: &str = "tagwatch:state";

/// Opaque string storage addressed by key
pub trait BlobStore {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// In-process blob storage for tests
#[derive(Debug, Default)]
pub struct MemoryBlob {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryBlob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value, bypassing serialization
    pub fn with_raw(key: &str, value: &str) -> Self {
        let blob = Self::new();
        blob.values.borrow_mut().insert(key.to_string(), value.to_string());
        blob
    }
}

impl BlobStore for MemoryBlob {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.values.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Watch state of one page path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchState {
    #[serde(default)]
    pub watching: bool,
    /// Tag names already notified on
    #[serde(default)]
    pub seen: BTreeSet<String>,
}

/// Field-level patch applied by `StateStore::set_state`
#[derive(Debug, Clone, Default)]
pub struct WatchPatch {
    pub watching: Option<bool>,
    /// Replaces the seen set wholesale
    pub seen: Option<BTreeSet<String>>,
}

impl WatchPatch {
    pub fn watching(watching: bool) -> Self {
        Self { watching: Some(watching), seen: None }
    }

    pub fn seen(seen: BTreeSet<String>) -> Self {
        Self { watching: None, seen: Some(seen) }
    }

    pub fn with_watching(mut self, watching: bool) -> Self {
        self.watching = Some(watching);
        self
    }

    fn apply(self, state: &mut WatchState) {
        if let Some(watching) = self.watching {
            state.watching = watching;
        }
        if let Some(seen) = self.seen {
            state.seen = seen;
        }
    }
}

pub type StateMap = BTreeMap<String, WatchState>;

/// Normalize a page path so it always ends with `/`
pub fn normalize_path(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// Derive the state key for a page URL
pub fn path_key(url: &url::Url) -> String {
    normalize_path(url.path())
}

/// Persistent state store over any blob backend
pub struct StateStore<B: BlobStore> {
    blob: B,
}

impl<B: BlobStore> StateStore<B> {
    pub fn new(blob: B) -> Self {
        Self { blob }
    }

    /// Load the full map. Missing, unreadable or corrupt blobs load as empty.
    pub fn load(&self) -> StateMap {
        let raw = match self.blob.read(STATE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return StateMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read watch state, starting empty");
                return StateMap::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(error = %e, "watch state is corrupt, starting empty");
                StateMap::new()
            }
        }
    }

    /// State of one path, defaulted when absent
    pub fn get_state(&self, path: &str) -> WatchState {
        self.load()
            .remove(&normalize_path(path))
            .unwrap_or_default()
    }

    /// Merge a patch into one path's entry and write the full map back
    pub fn set_state(&self, path: &str, patch: WatchPatch) -> Result<WatchState> {
        let mut map = self.load();
        let entry = map.entry(normalize_path(path)).or_default();
        patch.apply(entry);
        let updated = entry.clone();
        self.blob.write(STATE_KEY, &serde_json::to_string(&map)?)?;
        Ok(updated)
    }

    pub fn blob(&self) -> &B {
        &self.blob
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/p1"), "/p1/");
        assert_eq!(normalize_path("/p1/"), "/p1/");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn test_path_key_ignores_query() {
        let url = url::Url::parse("https://intra.example/projects/p1?tab=tags").unwrap();
        assert_eq!(path_key(&url), "/projects/p1/");
    }

    #[test]
    fn test_get_state_defaults() {
        let store = StateStore::new(MemoryBlob::new());
        assert_eq!(store.get_state("/p1/"), WatchState::default());
    }

    #[test]
    fn test_corrupt_blob_is_empty() {
        let store = StateStore::new(MemoryBlob::with_raw(STATE_KEY, "{not json"));
        assert!(store.load().is_empty());
        // and writing over it recovers
        store.set_state("/p1", WatchPatch::watching(true)).unwrap();
        assert!(store.get_state("/p1/").watching);
    }

    #[test]
    fn test_patch_is_shallow() {
        let store = StateStore::new(MemoryBlob::new());
        store.set_state("/p1/", WatchPatch::seen(names(&["a", "b"]))).unwrap();
        store.set_state("/p1/", WatchPatch::watching(true)).unwrap();

        let state = store.get_state("/p1/");
        assert!(state.watching);
        assert_eq!(state.seen, names(&["a", "b"]));

        // seen replaces, it does not merge
        store.set_state("/p1/", WatchPatch::seen(names(&["c"]))).unwrap();
        assert_eq!(store.get_state("/p1/").seen, names(&["c"]));
    }

    #[test]
    fn test_paths_are_independent() {
        let store = StateStore::new(MemoryBlob::new());
        store.set_state("/p1", WatchPatch::watching(true)).unwrap();
        store.set_state("/p2", WatchPatch::seen(names(&["x"]))).unwrap();

        let map = store.load();
        assert_eq!(map.len(), 2);
        assert!(map["/p1/"].watching);
        assert!(map["/p1/"].seen.is_empty());
        assert!(!map["/p2/"].watching);
        assert_eq!(map["/p2/"].seen, names(&["x"]));
    }

    #[test]
    fn test_blob_format() {
        let store = StateStore::new(MemoryBlob::new());
        store
            .set_state("/p1/", WatchPatch::seen(names(&["t1"])).with_watching(true))
            .unwrap();
        let raw = store.blob().read(STATE_KEY).unwrap().unwrap();
        assert_eq!(raw, r#"{"/p1/":{"watching":true,"seen":["t1"]}}"#);
    }
}
