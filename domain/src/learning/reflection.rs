//! Reflection response parsing
//!
//! A reflection is free text that may end with a pattern block:
//!
//! ```text
//! PATTERN: one sentence
//! CONTEXT: when it applies
//! TAGS: small_grant, new_team
//! CONTRADICTS: <observation id>, <observation id>
//! ```
//!
//! Without a `PATTERN:` section the reflection yields no candidate; any
//! `CONTRADICTS:` ids are still honored.

use crate::core::sections::Sections;
use serde::{Deserialize, Serialize};

const LABELS: &[&str] = &["PATTERN", "CONTEXT", "TAGS", "CONTRADICTS"];

/// Pattern proposed by a persona's reflection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePattern {
    pub pattern: String,
    pub context: String,
    pub tags: Vec<String>,
}

/// Parsed reflection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reflection {
    pub candidate: Option<CandidatePattern>,
    /// Observation ids the persona says this case contradicts
    pub contradicts: Vec<String>,
}

impl Reflection {
    pub fn is_empty(&self) -> bool {
        self.candidate.is_none() && self.contradicts.is_empty()
    }
}

pub fn parse_reflection(text: &str) -> Reflection {
    let sections = Sections::parse(text, LABELS);

    let candidate = sections
        .get("PATTERN")
        .map(clean)
        .filter(|p| !p.is_empty() && !is_placeholder(p))
        .map(|pattern| CandidatePattern {
            pattern,
            context: sections.get("CONTEXT").map(clean).unwrap_or_default(),
            tags: sections.get("TAGS").map(split_tags).unwrap_or_default(),
        });

    let contradicts = sections
        .get("CONTRADICTS")
        .map(|ids| {
            ids.split([',', '\n', ' '])
                .map(|id| id.trim().trim_matches(['[', ']', '-', '*']))
                .filter(|id| !id.is_empty() && !is_placeholder(id))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Reflection {
        candidate,
        contradicts,
    }
}

fn clean(text: &str) -> String {
    text.trim().trim_matches(['[', ']']).trim().to_string()
}

fn is_placeholder(text: &str) -> bool {
    matches!(
        text.to_lowercase().trim_end_matches('.'),
        "none" | "n/a" | "no pattern" | "no clear pattern"
    )
}

fn split_tags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in clean(text).split(',') {
        let tag = tag.trim().to_lowercase().replace([' ', '-'], "_");
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_pattern_block() {
        let text = "\
I weighted the team's enthusiasm over their track record.

PATTERN: First-time teams asking for large grants rarely hit their first milestone
CONTEXT: Applies when the team has no shipped work
TAGS: large_grant, New Team, infrastructure
";
        let reflection = parse_reflection(text);
        let candidate = reflection.candidate.unwrap();
        assert!(candidate.pattern.starts_with("First-time teams"));
        assert_eq!(candidate.context, "Applies when the team has no shipped work");
        assert_eq!(candidate.tags, vec!["large_grant", "new_team", "infrastructure"]);
        assert!(reflection.contradicts.is_empty());
    }

    #[test]
    fn test_no_pattern_yields_no_candidate() {
        let reflection = parse_reflection("The human was right, but this looks like a one-off.");
        assert!(reflection.is_empty());
        assert!(parse_reflection("PATTERN: none").candidate.is_none());
    }

    #[test]
    fn test_contradicts_without_pattern() {
        let reflection = parse_reflection("CONTRADICTS: obs-1, obs-2");
        assert!(reflection.candidate.is_none());
        assert_eq!(reflection.contradicts, vec!["obs-1", "obs-2"]);
    }

    #[test]
    fn test_bracketed_template_text_is_cleaned() {
        let reflection = parse_reflection("PATTERN: [Budgets without line items hide padding]\nTAGS: [small_grant]");
        let candidate = reflection.candidate.unwrap();
        assert_eq!(candidate.pattern, "Budgets without line items hide padding");
        assert_eq!(candidate.tags, vec!["small_grant"]);
    }
}
