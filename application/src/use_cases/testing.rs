//! Test doubles shared by the use-case tests

use crate::config::CouncilConfig;
use crate::use_cases::council::Council;
use crate::ports::store::{Collection, CouncilStore, RecordFilter, StoreError};
use crate::ports::text_generator::{GenerationError, TextGenerator};
use async_trait::async_trait;
use council_domain::{DeliberationPolicy, DeliberationTrigger, PersonaConfig};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ==================== Test Mocks ====================

/// Generator scripted per persona id.
///
/// Queued results are returned first, in order; afterwards the persona's
/// standing response (if any) repeats.
#[derive(Default)]
pub(crate) struct MockGenerator {
    queued: Mutex<HashMap<String, VecDeque<Result<String, GenerationError>>>>,
    standing: Mutex<HashMap<String, String>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `persona_id` with `text` once its queue is empty
    pub fn respond(self, persona_id: &str, text: impl Into<String>) -> Self {
        self.standing
            .lock()
            .unwrap()
            .insert(persona_id.to_string(), text.into());
        self
    }

    pub fn then(self, persona_id: &str, result: Result<String, GenerationError>) -> Self {
        self.push(persona_id, result);
        self
    }

    pub fn fail(self, persona_id: &str, error: GenerationError) -> Self {
        self.standing.lock().unwrap().remove(persona_id);
        self.then(persona_id, Err(error))
    }

    pub fn delay(self, persona_id: &str, delay: Duration) -> Self {
        self.delays
            .lock()
            .unwrap()
            .insert(persona_id.to_string(), delay);
        self
    }

    pub fn push(&self, persona_id: &str, result: Result<String, GenerationError>) {
        self.queued
            .lock()
            .unwrap()
            .entry(persona_id.to_string())
            .or_default()
            .push_back(result);
    }

    /// Prompts sent on behalf of `persona_id`, in call order
    pub fn prompts_for(&self, persona_id: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == persona_id)
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(
        &self,
        persona: &PersonaConfig,
        prompt: &str,
    ) -> Result<String, GenerationError> {
        self.calls
            .lock()
            .unwrap()
            .push((persona.id.clone(), prompt.to_string()));

        let delay = self.delays.lock().unwrap().get(&persona.id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&persona.id)
            .and_then(VecDeque::pop_front);
        if let Some(result) = queued {
            return result;
        }
        self.standing
            .lock()
            .unwrap()
            .get(&persona.id)
            .cloned()
            .ok_or_else(|| GenerationError::Transport(format!("no response scripted for {}", persona.id)))
    }
}

/// In-memory store with optional write failures per collection
#[derive(Default)]
pub(crate) struct MemoryStore {
    records: Mutex<BTreeMap<&'static str, BTreeMap<String, Value>>>,
    failing: Mutex<Vec<Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write to `collection` fail
    pub fn fail_writes_to(&self, collection: Collection) {
        self.failing.lock().unwrap().push(collection);
    }

    pub fn allow_writes_to(&self, collection: Collection) {
        self.failing.lock().unwrap().retain(|c| *c != collection);
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.records
            .lock()
            .unwrap()
            .get(collection.as_str())
            .map_or(0, BTreeMap::len)
    }

    fn check_writable(&self, collection: Collection) -> Result<(), StoreError> {
        if self.failing.lock().unwrap().contains(&collection) {
            return Err(StoreError::Io(format!("{} is read-only", collection)));
        }
        Ok(())
    }
}

#[async_trait]
impl CouncilStore for MemoryStore {
    async fn put(&self, collection: Collection, id: &str, record: Value) -> Result<(), StoreError> {
        self.check_writable(collection)?;
        self.records
            .lock()
            .unwrap()
            .entry(collection.as_str())
            .or_default()
            .insert(id.to_string(), record);
        Ok(())
    }

    async fn insert_new(
        &self,
        collection: Collection,
        id: &str,
        record: Value,
    ) -> Result<(), StoreError> {
        self.check_writable(collection)?;
        let mut records = self.records.lock().unwrap();
        let bucket = records.entry(collection.as_str()).or_default();
        if bucket.contains_key(id) {
            return Err(StoreError::AlreadyExists {
                collection: collection.as_str(),
                id: id.to_string(),
            });
        }
        bucket.insert(id.to_string(), record);
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(collection.as_str())
            .and_then(|bucket| bucket.get(id))
            .cloned())
    }

    async fn list(
        &self,
        collection: Collection,
        filter: &RecordFilter,
    ) -> Result<Vec<Value>, StoreError> {
        let records = self.records.lock().unwrap();
        let Some(bucket) = records.get(collection.as_str()) else {
            return Ok(Vec::new());
        };
        let matching = bucket.values().filter(|v| filter.matches(v)).cloned();
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }
}

// ==================== Fixtures ====================

pub(crate) const PERSONAS: [&str; 4] = ["technical", "ecosystem", "budget", "impact"];

/// Default panel without deliberation and with a short timeout
pub(crate) fn test_config() -> CouncilConfig {
    CouncilConfig::default()
        .with_deliberation(DeliberationPolicy {
            trigger: DeliberationTrigger::Never,
            rounds: 1,
        })
        .with_request_timeout(Duration::from_secs(5))
}

pub(crate) fn evaluation_response(score: u32, recommendation: &str) -> String {
    format!(
        "SCORE: {}\nRECOMMENDATION: {}\nCONFIDENCE: HIGH\nRATIONALE: Scored {} after reviewing the plan.\n\
         STRENGTHS:\n- Clear milestones\n- Shipped similar work\nCONCERNS:\n- Tight timeline\n\
         QUESTIONS:\n- Who maintains it after the grant?\n",
        score, recommendation, score
    )
}

/// Every persona answers with the same evaluation
pub(crate) fn unanimous(score: u32, recommendation: &str) -> MockGenerator {
    PERSONAS.iter().fold(MockGenerator::new(), |generator, id| {
        generator.respond(id, evaluation_response(score, recommendation))
    })
}

pub(crate) fn proposal_json(title: &str, team: &str, amount: f64, address: &str) -> String {
    serde_json::json!({
        "title": title,
        "summary": format!("{} for the ecosystem", title),
        "description": "Build and maintain open tooling.",
        "requesting_entity": team,
        "team_members": [
            { "name": "Ada Lovelace", "role": "lead" },
            { "name": "Grace Hopper", "role": "engineer" }
        ],
        "payment_address": address,
        "requested_amount": amount,
        "budget_breakdown": [
            { "category": "engineering", "description": "Development", "amount": amount }
        ],
        "milestones": [
            { "title": "Alpha", "description": "First release", "deliverables": ["alpha build"] }
        ],
        "category": "Developer Tooling"
    })
    .to_string()
}

/// Council over a fresh in-memory store
pub(crate) fn council(
    generator: MockGenerator,
) -> (Council<MockGenerator>, Arc<MockGenerator>, Arc<MemoryStore>) {
    let generator = Arc::new(generator);
    let store = Arc::new(MemoryStore::new());
    let council = Council::new(generator.clone(), store.clone(), test_config());
    (council, generator, store)
}

pub(crate) fn reflection_response(pattern: &str, tags: &str) -> String {
    format!(
        "I underweighted the delivery risk.\n\nPATTERN: {}\nCONTEXT: Requests with thin milestone plans\nTAGS: {}\n",
        pattern, tags
    )
}
