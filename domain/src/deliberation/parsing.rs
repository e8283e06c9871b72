//! Deliberation response parsing

use crate::core::sections::{Sections, first_number};
use crate::evaluation::{MAX_SCORE, MIN_SCORE, Recommendation};
use serde::{Deserialize, Serialize};

const LABELS: &[&str] = &[
    "POSITION_CHANGE",
    "UPDATED_RECOMMENDATION",
    "UPDATED_SCORE",
    "DELIBERATION_RESPONSE",
];

/// What the persona says happened to its position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclaredPosition {
    Maintained,
    Strengthened,
    Weakened,
    Reversed,
}

impl DeclaredPosition {
    fn parse(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        if lower.contains("maintain") || lower.contains("unchanged") {
            Some(DeclaredPosition::Maintained)
        } else if lower.contains("strength") {
            Some(DeclaredPosition::Strengthened)
        } else if lower.contains("weaken") {
            Some(DeclaredPosition::Weakened)
        } else if lower.contains("revers") {
            Some(DeclaredPosition::Reversed)
        } else {
            None
        }
    }
}

/// Fields recovered from one deliberation response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDeliberation {
    pub position: Option<DeclaredPosition>,
    pub recommendation: Option<Recommendation>,
    pub score: Option<f64>,
    pub response: String,
}

impl ParsedDeliberation {
    /// Revised fields to apply. A persona that declares it maintained its
    /// position keeps its stance even if it restates a recommendation.
    pub fn revision(&self) -> (Option<f64>, Option<Recommendation>) {
        if self.position == Some(DeclaredPosition::Maintained) {
            (None, None)
        } else {
            (self.score, self.recommendation)
        }
    }
}

/// Parse a deliberation response. Never fails: an unstructured reply is
/// kept as the response text with no revision.
pub fn parse_deliberation_response(text: &str) -> ParsedDeliberation {
    let sections = Sections::parse(text, LABELS);
    let response = sections
        .get("DELIBERATION_RESPONSE")
        .map(str::to_string)
        .unwrap_or_else(|| {
            if sections.is_empty() {
                text.trim().to_string()
            } else {
                String::new()
            }
        });

    ParsedDeliberation {
        position: sections
            .get("POSITION_CHANGE")
            .and_then(DeclaredPosition::parse),
        recommendation: sections
            .get("UPDATED_RECOMMENDATION")
            .and_then(Recommendation::parse_tolerant),
        score: sections
            .get("UPDATED_SCORE")
            .and_then(first_number)
            .map(|s| s.clamp(MIN_SCORE, MAX_SCORE)),
        response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weakened_with_updates() {
        let text = "POSITION_CHANGE: weakened\nUPDATED_RECOMMENDATION: lean_reject\nUPDATED_SCORE: 4\nDELIBERATION_RESPONSE:\nThe budget concerns are valid.";
        let parsed = parse_deliberation_response(text);
        assert_eq!(parsed.position, Some(DeclaredPosition::Weakened));
        assert_eq!(
            parsed.revision(),
            (Some(4.0), Some(Recommendation::LeanReject))
        );
        assert_eq!(parsed.response, "The budget concerns are valid.");
    }

    #[test]
    fn test_maintained_ignores_restated_recommendation() {
        let text = "POSITION_CHANGE: maintained\nUPDATED_RECOMMENDATION: approve\nDELIBERATION_RESPONSE: I stand by it.";
        let parsed = parse_deliberation_response(text);
        assert_eq!(parsed.revision(), (None, None));
    }

    #[test]
    fn test_placeholder_recommendation_is_ignored() {
        let text = "POSITION_CHANGE: strengthened\nUPDATED_RECOMMENDATION: n/a\nDELIBERATION_RESPONSE: fine";
        let parsed = parse_deliberation_response(text);
        assert_eq!(parsed.recommendation, None);
    }

    #[test]
    fn test_unstructured_reply_kept_as_response() {
        let parsed = parse_deliberation_response("  I agree with the others.  ");
        assert_eq!(parsed.position, None);
        assert_eq!(parsed.response, "I agree with the others.");
        assert_eq!(parsed.revision(), (None, None));
    }
}
