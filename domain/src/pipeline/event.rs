//! Pipeline lifecycle events.
//!
//! A streaming submission yields a finite sequence of [`PipelineEvent`]s:
//! a start/complete pair for each stage, then exactly one terminal
//! `complete` or `error` event. Nothing follows a terminal event.

use super::stage::Stage;
use serde::{Serialize, Serializer};

/// Tag of a pipeline event (`stage1_start` ... `stage4_complete`,
/// `complete`, `error`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StageStart(Stage),
    StageComplete(Stage),
    Complete,
    Error,
}

impl EventKind {
    pub fn tag(&self) -> String {
        match self {
            EventKind::StageStart(stage) => format!("stage{}_start", stage.number()),
            EventKind::StageComplete(stage) => format!("stage{}_complete", stage.number()),
            EventKind::Complete => "complete".to_string(),
            EventKind::Error => "error".to_string(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::Complete | EventKind::Error)
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            EventKind::StageStart(stage) | EventKind::StageComplete(stage) => Some(*stage),
            EventKind::Complete | EventKind::Error => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.tag())
    }
}

/// One event in a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Empty until Stage 1 has assigned an id
    pub proposal_id: String,
    pub payload: serde_json::Value,
}

impl PipelineEvent {
    pub fn new(
        kind: EventKind,
        proposal_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            proposal_id: proposal_id.into(),
            payload,
        }
    }

    pub fn stage_start(stage: Stage, proposal_id: impl Into<String>) -> Self {
        Self::new(
            EventKind::StageStart(stage),
            proposal_id,
            serde_json::json!({ "stage": stage.as_str(), "name": stage.display_name() }),
        )
    }

    pub fn error(
        proposal_id: impl Into<String>,
        stage: Option<Stage>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            EventKind::Error,
            proposal_id,
            serde_json::json!({
                "stage": stage.map(|s| s.as_str().to_string()),
                "message": message.into(),
            }),
        )
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}
