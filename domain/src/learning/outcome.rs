//! Real-world grant outcomes

use crate::core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a funded project turned out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeResult {
    Success,
    Failure,
    Partial,
}

impl OutcomeResult {
    pub fn as_str(&self) -> &str {
        match self {
            OutcomeResult::Success => "success",
            OutcomeResult::Failure => "failure",
            OutcomeResult::Partial => "partial",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, OutcomeResult::Success)
    }
}

impl std::fmt::Display for OutcomeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutcomeResult {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "success" | "completed" => Ok(OutcomeResult::Success),
            "failure" | "failed" => Ok(OutcomeResult::Failure),
            "partial" => Ok(OutcomeResult::Partial),
            _ => Err(DomainError::InvalidValue {
                field: "outcome result",
                value: s.to_string(),
            }),
        }
    }
}

/// Outcome report for a resolved proposal (Value Object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub result: OutcomeResult,
    /// Share of the promised scope delivered, 0-100
    #[serde(default)]
    pub completion_percentage: Option<f64>,
    /// Reviewer-assigned delivery quality, 1-10
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub impact_assessment: String,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub notes: String,
    pub recorded_at: DateTime<Utc>,
}

impl Outcome {
    pub fn new(result: OutcomeResult) -> Self {
        Self {
            result,
            completion_percentage: None,
            quality_score: None,
            impact_assessment: String::new(),
            issues: Vec::new(),
            notes: String::new(),
            recorded_at: Utc::now(),
        }
    }

    pub fn with_completion(mut self, percentage: f64) -> Self {
        self.completion_percentage = Some(percentage);
        self
    }

    pub fn with_quality(mut self, score: f64) -> Self {
        self.quality_score = Some(score);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Reject out-of-range numbers
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(pct) = self.completion_percentage
            && !(0.0..=100.0).contains(&pct)
        {
            return Err(DomainError::InvalidValue {
                field: "completion percentage",
                value: pct.to_string(),
            });
        }
        if let Some(quality) = self.quality_score
            && !(1.0..=10.0).contains(&quality)
        {
            return Err(DomainError::InvalidValue {
                field: "quality score",
                value: quality.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_parse() {
        assert_eq!("Success".parse::<OutcomeResult>().unwrap(), OutcomeResult::Success);
        assert_eq!("failed".parse::<OutcomeResult>().unwrap(), OutcomeResult::Failure);
        assert!("maybe".parse::<OutcomeResult>().is_err());
    }

    #[test]
    fn test_validate_ranges() {
        assert!(Outcome::new(OutcomeResult::Partial).with_completion(60.0).validate().is_ok());
        assert!(Outcome::new(OutcomeResult::Partial).with_completion(140.0).validate().is_err());
        assert!(Outcome::new(OutcomeResult::Success).with_quality(0.0).validate().is_err());
    }
}
