//! Pipeline stages

use serde::{Deserialize, Serialize};

/// Stage of the review pipeline
///
/// Stages run strictly in order; each one fully resolves before the next
/// starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Parse the submission and link it to a known team
    Contextualize,
    /// Independent per-persona evaluation
    Evaluate,
    /// Anonymized peer review and position revision
    Deliberate,
    /// Vote aggregation and routing
    Decide,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Contextualize,
        Stage::Evaluate,
        Stage::Deliberate,
        Stage::Decide,
    ];

    /// 1-based stage number used in event tags (`stage1_start`, ...)
    pub fn number(&self) -> u8 {
        match self {
            Stage::Contextualize => 1,
            Stage::Evaluate => 2,
            Stage::Deliberate => 3,
            Stage::Decide => 4,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Stage::Contextualize => "contextualize",
            Stage::Evaluate => "evaluate",
            Stage::Deliberate => "deliberate",
            Stage::Decide => "decide",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Stage::Contextualize => "Parse & Contextualize",
            Stage::Evaluate => "Evaluation",
            Stage::Deliberate => "Deliberation",
            Stage::Decide => "Vote & Decide",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_numbers_follow_pipeline_order() {
        let numbers: Vec<u8> = Stage::ALL.iter().map(Stage::number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        let json = serde_json::to_string(&Stage::Deliberate).unwrap();
        assert_eq!(json, "\"deliberate\"");
    }
}
