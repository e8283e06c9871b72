//! Recommendation scale and confidence levels

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which way a recommendation leans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Approve,
    Reject,
}

impl Side {
    pub fn as_str(&self) -> &str {
        match self {
            Side::Approve => "approve",
            Side::Reject => "reject",
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Approve => Side::Reject,
            Side::Reject => Side::Approve,
        }
    }
}

/// Words that invert the verb directly after them
const NEGATIONS: [&str; 6] = ["not", "don't", "don’t", "dont", "never", "no"];

fn negated(text: &str, verb_at: usize) -> bool {
    text[..verb_at]
        .split_whitespace()
        .next_back()
        .is_some_and(|word| NEGATIONS.contains(&word))
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered recommendation scale, from most favorable to most critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongApprove,
    Approve,
    LeanApprove,
    LeanReject,
    Reject,
    StrongReject,
}

impl Recommendation {
    /// All values, most favorable first
    pub const ALL: [Recommendation; 6] = [
        Recommendation::StrongApprove,
        Recommendation::Approve,
        Recommendation::LeanApprove,
        Recommendation::LeanReject,
        Recommendation::Reject,
        Recommendation::StrongReject,
    ];

    /// Position on the scale; higher is more favorable (0..=5)
    pub fn ordinal(&self) -> u8 {
        match self {
            Recommendation::StrongApprove => 5,
            Recommendation::Approve => 4,
            Recommendation::LeanApprove => 3,
            Recommendation::LeanReject => 2,
            Recommendation::Reject => 1,
            Recommendation::StrongReject => 0,
        }
    }

    pub fn side(&self) -> Side {
        if self.ordinal() >= 3 {
            Side::Approve
        } else {
            Side::Reject
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Recommendation::StrongApprove => "strong_approve",
            Recommendation::Approve => "approve",
            Recommendation::LeanApprove => "lean_approve",
            Recommendation::LeanReject => "lean_reject",
            Recommendation::Reject => "reject",
            Recommendation::StrongReject => "strong_reject",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Recommendation::StrongApprove => "Strong Approve",
            Recommendation::Approve => "Approve",
            Recommendation::LeanApprove => "Lean Approve",
            Recommendation::LeanReject => "Lean Reject",
            Recommendation::Reject => "Reject",
            Recommendation::StrongReject => "Strong Reject",
        }
    }

    /// Tolerant parse of a free-text recommendation tag.
    ///
    /// Accepts `STRONG_APPROVE`, `strong approve`, `Lean-Reject`,
    /// `weakly approve`, and similar spellings.
    pub fn parse_tolerant(text: &str) -> Option<Self> {
        let lower = text.to_lowercase().replace(['_', '-'], " ");
        let strong = lower.contains("strong");
        let lean = ["lean", "weak", "slight", "tentative"]
            .iter()
            .any(|w| lower.contains(w));
        let reject_at = ["reject", "decline", "deny"]
            .iter()
            .filter_map(|w| lower.find(w))
            .min();
        let approve_at = ["approve", "accept", "fund"]
            .iter()
            .filter_map(|w| lower.find(w))
            .min();

        // The earliest verb decides, so "approve rather than reject" approves
        // and "do not approve" rejects
        let (side, verb_at) = match (approve_at, reject_at) {
            (Some(a), Some(r)) if a < r => (Side::Approve, a),
            (_, Some(r)) => (Side::Reject, r),
            (Some(a), None) => (Side::Approve, a),
            (None, None) => return None,
        };
        let side = if negated(&lower, verb_at) { side.opposite() } else { side };

        Some(match (side, strong, lean) {
            (Side::Approve, true, _) => Recommendation::StrongApprove,
            (Side::Approve, false, true) => Recommendation::LeanApprove,
            (Side::Approve, false, false) => Recommendation::Approve,
            (Side::Reject, true, _) => Recommendation::StrongReject,
            (Side::Reject, false, true) => Recommendation::LeanReject,
            (Side::Reject, false, false) => Recommendation::Reject,
        })
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Recommendation {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Recommendation::parse_tolerant(s).ok_or_else(|| DomainError::InvalidValue {
            field: "recommendation",
            value: s.to_string(),
        })
    }
}

/// Categorical confidence of a reviewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }

    pub fn parse_tolerant(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        if lower.contains("high") {
            Some(Confidence::High)
        } else if lower.contains("medium") || lower.contains("moderate") {
            Some(Confidence::Medium)
        } else if lower.contains("low") {
            Some(Confidence::Low)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Confidence {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Confidence::parse_tolerant(s).ok_or_else(|| DomainError::InvalidValue {
            field: "confidence",
            value: s.to_string(),
        })
    }
}
