use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::platform::SeenKey;

/// Maximum number of remembered posts; the oldest are evicted first.
pub const SEEN_CAPACITY: usize = 500;

/// On-disk layout of the state file
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    seen: Vec<String>,
}

/// Result of reading the state file at startup
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Vec<String>),
    Absent,
    Corrupt(String),
}

/// Result of writing the state file after a mutation
#[derive(Debug, PartialEq, Eq)]
pub enum PersistOutcome {
    Persisted,
    Failed(String),
}

/// Insertion-ordered, capped set of seen keys
#[derive(Debug, Default)]
struct SeenRecord {
    order: VecDeque<String>,
    index: HashSet<String>,
}

impl SeenRecord {
    fn from_keys(keys: Vec<String>, capacity: usize) -> Self {
        let mut record = Self::default();
        for key in keys {
            record.insert(key, capacity);
        }
        record
    }

    /// Returns false if the key was already present.
    fn insert(&mut self, key: String, capacity: usize) -> bool {
        if self.index.contains(&key) {
            return false;
        }
        self.index.insert(key.clone());
        self.order.push_back(key);
        while self.order.len() > capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.index.remove(&evicted);
            }
        }
        true
    }

    fn snapshot(&self) -> StateFile {
        StateFile {
            seen: self.order.iter().cloned().collect(),
        }
    }
}

/// Durable record of posts that were already relayed.
///
/// The lock is held across check, insert and persist, so two concurrent
/// calls for the same key can never both report it as new.
pub struct SeenStore {
    path: PathBuf,
    capacity: usize,
    record: Mutex<SeenRecord>,
}

impl SeenStore {
    /// Open the store at `path`. A missing or malformed file yields an
    /// empty store; startup never fails here.
    pub async fn open(path: &Path) -> Self {
        Self::open_with_capacity(path, SEEN_CAPACITY).await
    }

    pub async fn open_with_capacity(path: &Path, capacity: usize) -> Self {
        let keys = match load(path).await {
            LoadOutcome::Loaded(keys) => {
                info!("Loaded {} seen posts from {}", keys.len(), path.display());
                keys
            }
            LoadOutcome::Absent => {
                info!("No state file at {}, starting empty", path.display());
                Vec::new()
            }
            LoadOutcome::Corrupt(reason) => {
                warn!(
                    "State file {} is unreadable ({}), starting empty",
                    path.display(),
                    reason
                );
                Vec::new()
            }
        };

        Self {
            path: path.to_path_buf(),
            capacity,
            record: Mutex::new(SeenRecord::from_keys(keys, capacity)),
        }
    }

    /// Record `key` as seen. Returns true if it was new, false for a duplicate.
    pub async fn check_and_mark(&self, key: SeenKey) -> bool {
        let mut record = self.record.lock().await;
        if !record.insert(key.to_string(), self.capacity) {
            debug!("Already relayed {}", key);
            return false;
        }

        if let PersistOutcome::Failed(reason) = persist(&self.path, &record.snapshot()).await {
            warn!(
                "Failed to persist seen posts to {}: {}",
                self.path.display(),
                reason
            );
        }
        true
    }

    pub async fn len(&self) -> usize {
        self.record.lock().await.order.len()
    }

    /// Seen keys, oldest first
    #[cfg(test)]
    pub async fn keys(&self) -> Vec<String> {
        self.record.lock().await.order.iter().cloned().collect()
    }
}

async fn load(path: &Path) -> LoadOutcome {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LoadOutcome::Absent,
        Err(e) => return LoadOutcome::Corrupt(e.to_string()),
    };

    match serde_json::from_str::<StateFile>(&content) {
        Ok(state) => LoadOutcome::Loaded(state.seen),
        Err(e) => LoadOutcome::Corrupt(e.to_string()),
    }
}

async fn persist(path: &Path, state: &StateFile) -> PersistOutcome {
    match write_atomically(path, state).await {
        Ok(()) => PersistOutcome::Persisted,
        Err(e) => PersistOutcome::Failed(format!("{:#}", e)),
    }
}

/// Write and sync a sibling temp file, then rename over the target.
async fn write_atomically(path: &Path, state: &StateFile) -> Result<()> {
    let json = serde_json::to_vec(state).context("Failed to serialize state")?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = tokio::fs::File::create(&tmp)
        .await
        .with_context(|| format!("Failed to create {}", tmp.display()))?;
    file.write_all(&json)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    file.sync_all()
        .await
        .with_context(|| format!("Failed to sync {}", tmp.display()))?;
    drop(file);

    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key(channel_id: i64, message_id: i32) -> SeenKey {
        SeenKey {
            channel_id,
            message_id,
        }
    }

    #[tokio::test]
    async fn test_duplicate_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenStore::open(&dir.path().join("state.json")).await;

        assert!(store.check_and_mark(key(-100, 42)).await);
        assert!(!store.check_and_mark(key(-100, 42)).await);
        assert!(store.check_and_mark(key(-100, 43)).await);
        assert!(store.check_and_mark(key(-200, 42)).await);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_evicts_oldest_beyond_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenStore::open(&dir.path().join("state.json")).await;

        for id in 0..520 {
            assert!(store.check_and_mark(key(-1, id)).await);
        }

        let keys = store.keys().await;
        assert_eq!(keys.len(), SEEN_CAPACITY);
        assert_eq!(keys.first().map(String::as_str), Some("-1:20"));
        assert_eq!(keys.last().map(String::as_str), Some("-1:519"));

        let raw = std::fs::read_to_string(dir.path().join("state.json")).unwrap();
        let persisted: StateFile = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted.seen, keys);

        // An evicted key is treated as new again
        assert!(store.check_and_mark(key(-1, 0)).await);
        assert_eq!(store.keys().await.first().map(String::as_str), Some("-1:21"));
    }

    #[tokio::test]
    async fn test_reload_preserves_keys_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = SeenStore::open(&path).await;
        for id in [7, 3, 9] {
            store.check_and_mark(key(-5, id)).await;
        }

        let reopened = SeenStore::open(&path).await;
        assert_eq!(reopened.keys().await, vec!["-5:7", "-5:3", "-5:9"]);
        assert!(!reopened.check_and_mark(key(-5, 3)).await);
    }

    #[tokio::test]
    async fn test_state_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = SeenStore::open(&path).await;
        store.check_and_mark(key(-1001, 42)).await;

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({ "seen": ["-1001:42"] }));
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(load(&path).await, LoadOutcome::Corrupt(_)));

        let store = SeenStore::open(&path).await;
        assert_eq!(store.len().await, 0);
        assert!(store.check_and_mark(key(1, 1)).await);
    }

    #[tokio::test]
    async fn test_missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");

        assert!(matches!(load(&path).await, LoadOutcome::Absent));
        assert_eq!(SeenStore::open(&path).await.len().await, 0);
    }

    #[tokio::test]
    async fn test_oversized_file_is_trimmed_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let seen: Vec<String> = (0..10).map(|i| format!("-1:{}", i)).collect();
        std::fs::write(&path, serde_json::to_string(&StateFile { seen }).unwrap()).unwrap();

        let store = SeenStore::open_with_capacity(&path, 4).await;
        assert_eq!(store.keys().await, vec!["-1:6", "-1:7", "-1:8", "-1:9"]);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("state.json");

        let store = SeenStore::open(&path).await;
        assert!(store.check_and_mark(key(-1, 1)).await);
        assert!(!store.check_and_mark(key(-1, 1)).await);
        assert!(!path.exists());

        let outcome = persist(&path, &StateFile::default()).await;
        assert!(matches!(outcome, PersistOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_concurrent_marks_admit_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SeenStore::open(&dir.path().join("state.json")).await);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.check_and_mark(key(-9, 77)).await
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }
}
