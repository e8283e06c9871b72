//! Record store port
//!
//! An async record store over independently addressable collections.
//! Records travel as JSON values so the trait stays object-safe; the
//! typed helpers ([`save`], [`load`], [`load_all`], [`insert`]) convert to
//! and from domain entities through [`StoredRecord`].
//!
//! There are no cross-collection transactions. Callers write each
//! collection only after the owning stage has fully resolved, and every
//! update is idempotent on retry.

use async_trait::async_trait;
use council_domain::{
    Decision, DeliberationRecord, EntityProfile, EvaluationSet, LearningEvent, LearningReceipt,
    Observation, Proposal,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Record collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Proposals,
    Teams,
    Evaluations,
    Deliberations,
    Decisions,
    Observations,
    LearningEvents,
    LearningReceipts,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Proposals,
        Collection::Teams,
        Collection::Evaluations,
        Collection::Deliberations,
        Collection::Decisions,
        Collection::Observations,
        Collection::LearningEvents,
        Collection::LearningReceipts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Proposals => "proposals",
            Collection::Teams => "teams",
            Collection::Evaluations => "evaluations",
            Collection::Deliberations => "deliberations",
            Collection::Decisions => "decisions",
            Collection::Observations => "observations",
            Collection::LearningEvents => "learning_events",
            Collection::LearningReceipts => "learning_receipts",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("{collection} record not found: {id}")]
    NotFound {
        collection: &'static str,
        id: String,
    },

    #[error("{collection} record already exists: {id}")]
    AlreadyExists {
        collection: &'static str,
        id: String,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Equality filter with an optional result limit
///
/// Field names may be dotted paths (`team_match.profile_id`). A field
/// holding an object with a `state` key (such as a proposal status)
/// compares against that key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub equals: Vec<(String, String)>,
    pub limit: Option<usize>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.equals.push((field.into(), value.into()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &Value) -> bool {
        self.equals
            .iter()
            .all(|(field, expected)| field_matches(record, field, expected))
    }
}

fn field_matches(record: &Value, field: &str, expected: &str) -> bool {
    let mut current = record;
    for part in field.split('.') {
        match current.get(part) {
            Some(next) => current = next,
            None => return false,
        }
    }
    match current {
        Value::String(s) => s == expected,
        Value::Bool(b) => b.to_string() == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Object(map) => map
            .get("state")
            .and_then(Value::as_str)
            .is_some_and(|s| s == expected),
        _ => false,
    }
}

/// Async record store
#[async_trait]
pub trait CouncilStore: Send + Sync {
    /// Insert or replace a record
    async fn put(&self, collection: Collection, id: &str, record: Value) -> Result<(), StoreError>;

    /// Insert a record, failing with [`StoreError::AlreadyExists`] if the id
    /// is taken
    async fn insert_new(&self, collection: Collection, id: &str, record: Value)
    -> Result<(), StoreError>;

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError>;

    /// Records matching `filter`, in ascending id order
    async fn list(&self, collection: Collection, filter: &RecordFilter)
    -> Result<Vec<Value>, StoreError>;
}

/// A domain entity persisted in one collection
pub trait StoredRecord: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    fn record_id(&self) -> &str;
}

impl StoredRecord for Proposal {
    const COLLECTION: Collection = Collection::Proposals;
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl StoredRecord for EntityProfile {
    const COLLECTION: Collection = Collection::Teams;
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl StoredRecord for EvaluationSet {
    const COLLECTION: Collection = Collection::Evaluations;
    fn record_id(&self) -> &str {
        &self.proposal_id
    }
}

impl StoredRecord for DeliberationRecord {
    const COLLECTION: Collection = Collection::Deliberations;
    fn record_id(&self) -> &str {
        &self.proposal_id
    }
}

impl StoredRecord for Decision {
    const COLLECTION: Collection = Collection::Decisions;
    fn record_id(&self) -> &str {
        &self.proposal_id
    }
}

impl StoredRecord for Observation {
    const COLLECTION: Collection = Collection::Observations;
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl StoredRecord for LearningEvent {
    const COLLECTION: Collection = Collection::LearningEvents;
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl StoredRecord for LearningReceipt {
    const COLLECTION: Collection = Collection::LearningReceipts;
    fn record_id(&self) -> &str {
        &self.event_id
    }
}

/// Insert or replace a typed record
pub async fn save<R: StoredRecord>(store: &dyn CouncilStore, record: &R) -> Result<(), StoreError> {
    let value = serde_json::to_value(record)?;
    store.put(R::COLLECTION, record.record_id(), value).await
}

/// Insert a typed record that must not exist yet
pub async fn insert<R: StoredRecord>(store: &dyn CouncilStore, record: &R) -> Result<(), StoreError> {
    let value = serde_json::to_value(record)?;
    store.insert_new(R::COLLECTION, record.record_id(), value).await
}

pub async fn load<R: StoredRecord>(
    store: &dyn CouncilStore,
    id: &str,
) -> Result<Option<R>, StoreError> {
    match store.get(R::COLLECTION, id).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Load a typed record that must exist
pub async fn require<R: StoredRecord>(store: &dyn CouncilStore, id: &str) -> Result<R, StoreError> {
    load(store, id).await?.ok_or_else(|| StoreError::NotFound {
        collection: R::COLLECTION.as_str(),
        id: id.to_string(),
    })
}

pub async fn load_all<R: StoredRecord>(
    store: &dyn CouncilStore,
    filter: &RecordFilter,
) -> Result<Vec<R>, StoreError> {
    store
        .list(R::COLLECTION, filter)
        .await?
        .into_iter()
        .map(|value| serde_json::from_value(value).map_err(StoreError::from))
        .collect()
}
