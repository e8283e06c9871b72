//! JSON-file record store.
//!
//! Layout: `<root>/<collection>/<id>.json`, pretty-printed. Writes go to a
//! temporary file that is then moved into place, so readers never see a
//! partially written record. `insert_new` links the temporary file to its
//! final name, which fails atomically when the id is already taken.

use async_trait::async_trait;
use council_application::{Collection, CouncilStore, RecordFilter, StoreError};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

const EXTENSION: &str = "json";

/// File-per-record store rooted at a data directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Open (and create if needed) the collection directories under `root`
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        for collection in Collection::ALL {
            let dir = root.join(collection.as_str());
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| io_error(&dir, e))?;
        }
        debug!("Opened record store at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, collection: Collection) -> PathBuf {
        self.root.join(collection.as_str())
    }

    fn record_path(&self, collection: Collection, id: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_id(id) {
            return Err(StoreError::Io(format!("invalid record id '{}'", id)));
        }
        Ok(self
            .collection_dir(collection)
            .join(format!("{}.{}", id, EXTENSION)))
    }

    /// Write `record` next to `path` under a unique temporary name
    async fn write_temp(&self, path: &Path, record: &Value) -> Result<PathBuf, StoreError> {
        let bytes = serde_json::to_vec_pretty(record)?;
        let temp = path.with_extension(format!("{}.{}.tmp", EXTENSION, uuid::Uuid::new_v4()));
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await.map_err(|e| io_error(dir, e))?;
        }
        fs::write(&temp, bytes).await.map_err(|e| io_error(&temp, e))?;
        Ok(temp)
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Io(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl CouncilStore for JsonFileStore {
    async fn put(&self, collection: Collection, id: &str, record: Value) -> Result<(), StoreError> {
        let path = self.record_path(collection, id)?;
        let temp = self.write_temp(&path, &record).await?;
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(io_error(&path, e));
        }
        debug!("Stored {}/{}", collection, id);
        Ok(())
    }

    async fn insert_new(
        &self,
        collection: Collection,
        id: &str,
        record: Value,
    ) -> Result<(), StoreError> {
        let path = self.record_path(collection, id)?;
        let temp = self.write_temp(&path, &record).await?;
        let linked = fs::hard_link(&temp, &path).await;
        let _ = fs::remove_file(&temp).await;
        match linked {
            Ok(()) => {
                debug!("Inserted {}/{}", collection, id);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StoreError::AlreadyExists {
                collection: collection.as_str(),
                id: id.to_string(),
            }),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let path = self.record_path(collection, id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(|e| {
                StoreError::Serialization(format!("{}: {}", path.display(), e))
            })?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn list(
        &self,
        collection: Collection,
        filter: &RecordFilter,
    ) -> Result<Vec<Value>, StoreError> {
        let dir = self.collection_dir(collection);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&dir, e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && is_valid_id(stem)
            {
                ids.push(stem.to_string());
            }
        }
        ids.sort();

        let mut records = Vec::new();
        for id in ids {
            if filter.limit.is_some_and(|limit| records.len() >= limit) {
                break;
            }
            // A record removed between listing and reading is skipped
            let Some(record) = self.get(collection, &id).await? else {
                warn!("{}/{} disappeared while listing", collection, id);
                continue;
            };
            if filter.matches(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_application::ports::store;
    use council_domain::{CandidatePattern, Observation};
    use serde_json::json;

    async fn open() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("data")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_open_creates_collection_dirs() {
        let (_dir, store) = open().await;
        for collection in Collection::ALL {
            assert!(store.root().join(collection.as_str()).is_dir());
        }
    }

    #[tokio::test]
    async fn test_put_get_and_replace() {
        let (_dir, store) = open().await;
        store
            .put(Collection::Proposals, "p-1", json!({"id": "p-1", "title": "First"}))
            .await
            .unwrap();
        store
            .put(Collection::Proposals, "p-1", json!({"id": "p-1", "title": "Second"}))
            .await
            .unwrap();

        let record = store.get(Collection::Proposals, "p-1").await.unwrap().unwrap();
        assert_eq!(record["title"], "Second");
        assert!(store.get(Collection::Proposals, "p-2").await.unwrap().is_none());
        assert!(store.get(Collection::Teams, "p-1").await.unwrap().is_none());

        let files: Vec<_> = std::fs::read_dir(store.root().join("proposals")).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_new_rejects_existing_id() {
        let (_dir, store) = open().await;
        store
            .insert_new(Collection::Decisions, "p-1", json!({"status": "pending"}))
            .await
            .unwrap();

        let err = store
            .insert_new(Collection::Decisions, "p-1", json!({"status": "needs_review"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { collection: "decisions", .. }));

        let record = store.get(Collection::Decisions, "p-1").await.unwrap().unwrap();
        assert_eq!(record["status"], "pending");
        let files: Vec<_> = std::fs::read_dir(store.root().join("decisions")).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_list_orders_filters_and_limits() {
        let (_dir, store) = open().await;
        for (id, persona) in [("c", "budget"), ("a", "technical"), ("b", "technical")] {
            store
                .put(Collection::Observations, id, json!({"id": id, "persona_id": persona}))
                .await
                .unwrap();
        }
        std::fs::write(store.root().join("observations").join("notes.txt"), "ignored").unwrap();

        let all = store.list(Collection::Observations, &RecordFilter::all()).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let technical = store
            .list(
                Collection::Observations,
                &RecordFilter::all().eq("persona_id", "technical").limit(1),
            )
            .await
            .unwrap();
        assert_eq!(technical.len(), 1);
        assert_eq!(technical[0]["id"], "a");
    }

    #[tokio::test]
    async fn test_invalid_ids_are_rejected() {
        let (_dir, store) = open().await;
        for id in ["", "../escape", "a/b", "dot.ted"] {
            let err = store.put(Collection::Teams, id, json!({})).await.unwrap_err();
            assert!(matches!(err, StoreError::Io(_)), "{id}");
        }
    }

    #[tokio::test]
    async fn test_corrupt_record_is_a_serialization_error() {
        let (_dir, store) = open().await;
        std::fs::write(store.root().join("teams").join("t-1.json"), "{ not json").unwrap();
        let err = store.get(Collection::Teams, "t-1").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_typed_helpers_round_trip_entities() {
        let (_dir, store) = open().await;
        let candidate = CandidatePattern {
            pattern: "Solo teams miss deadlines".to_string(),
            context: "single-member teams".to_string(),
            tags: vec!["solo_team".to_string()],
        };
        let observation = Observation::new_draft("technical", &candidate, "p-1", "e-1");
        store::save(&store, &observation).await.unwrap();

        let loaded: Observation = store::require(&store, &observation.id).await.unwrap();
        assert_eq!(loaded, observation);
        let drafts: Vec<Observation> =
            store::load_all(&store, &RecordFilter::all().eq("status", "draft")).await.unwrap();
        assert_eq!(drafts.len(), 1);
    }
}
