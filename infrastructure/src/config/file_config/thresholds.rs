//! Threshold sections from TOML (`[routing]`, `[matching]`, `[learning]`)

use council_domain::{LearningPolicy, MatchingThresholds, RoutingThresholds};
use serde::{Deserialize, Serialize};

/// Raw routing thresholds (`[routing]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRoutingConfig {
    pub auto_approve_consensus: f64,
    pub auto_reject_consensus: f64,
    /// Requests at or above this amount always go to a human
    pub human_review_amount: f64,
}

impl Default for FileRoutingConfig {
    fn default() -> Self {
        let defaults = RoutingThresholds::default();
        Self {
            auto_approve_consensus: defaults.auto_approve_consensus,
            auto_reject_consensus: defaults.auto_reject_consensus,
            human_review_amount: defaults.human_review_amount,
        }
    }
}

impl FileRoutingConfig {
    pub fn to_thresholds(&self) -> RoutingThresholds {
        RoutingThresholds {
            auto_approve_consensus: self.auto_approve_consensus,
            auto_reject_consensus: self.auto_reject_consensus,
            human_review_amount: self.human_review_amount,
        }
    }
}

/// Raw matching thresholds (`[matching]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMatchingConfig {
    pub name_similarity: f64,
    pub min_member_overlap: usize,
}

impl Default for FileMatchingConfig {
    fn default() -> Self {
        let defaults = MatchingThresholds::default();
        Self {
            name_similarity: defaults.name_similarity,
            min_member_overlap: defaults.min_member_overlap,
        }
    }
}

impl FileMatchingConfig {
    pub fn to_thresholds(&self) -> MatchingThresholds {
        MatchingThresholds {
            name_similarity: self.name_similarity,
            min_member_overlap: self.min_member_overlap,
        }
    }
}

/// Raw learning settings (`[learning]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLearningConfig {
    /// Evidence needed before a draft is promoted to reviewed
    pub min_evidence: u32,
    pub similarity_threshold: f64,
    /// Active observations per evaluation prompt
    pub max_prompt_observations: usize,
    /// Similar past proposals per evaluation prompt
    pub similar_proposals: usize,
}

impl Default for FileLearningConfig {
    fn default() -> Self {
        let defaults = LearningPolicy::default();
        Self {
            min_evidence: defaults.min_evidence,
            similarity_threshold: defaults.similarity_threshold,
            max_prompt_observations: defaults.max_prompt_observations,
            similar_proposals: 3,
        }
    }
}

impl FileLearningConfig {
    pub fn to_policy(&self) -> LearningPolicy {
        LearningPolicy {
            min_evidence: self.min_evidence,
            similarity_threshold: self.similarity_threshold,
            max_prompt_observations: self.max_prompt_observations,
        }
    }
}
