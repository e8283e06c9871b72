//! Labelled-section extraction from free-text model responses.
//!
//! Reviewer personas are asked to answer in `LABEL: value` blocks. Models
//! rarely comply exactly, so matching is tolerant: labels are
//! case-insensitive, may be wrapped in markdown emphasis or prefixed by
//! list markers, and a section runs until the next known label.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static NUMBER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").ok());

/// Sections found in a response, keyed by upper-cased label
#[derive(Debug, Clone, Default)]
pub struct Sections {
    values: HashMap<String, String>,
}

impl Sections {
    /// Split `text` on the given labels. The first occurrence of a label wins.
    pub fn parse(text: &str, labels: &[&str]) -> Self {
        let mut values = HashMap::new();
        if labels.is_empty() {
            return Self { values };
        }

        let alternatives = labels
            .iter()
            .map(|l| regex::escape(l))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(
            r"(?im)^[ \t>#*\-]*(?:\*\*)?({})(?:\*\*)?[ \t]*:(?:\*\*)?",
            alternatives
        );
        let Ok(re) = Regex::new(&pattern) else {
            return Self { values };
        };

        let headers: Vec<(String, usize, usize)> = re
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let label = caps.get(1)?.as_str().to_uppercase();
                Some((label, whole.start(), whole.end()))
            })
            .collect();

        for (i, (label, _, value_start)) in headers.iter().enumerate() {
            let value_end = headers.get(i + 1).map_or(text.len(), |(_, start, _)| *start);
            let value = text[*value_start..value_end].trim().trim_matches('*').trim();
            if !value.is_empty() {
                values.entry(label.clone()).or_insert_with(|| value.to_string());
            }
        }

        Self { values }
    }

    /// Raw text of a section
    pub fn get(&self, label: &str) -> Option<&str> {
        self.values.get(&label.to_uppercase()).map(String::as_str)
    }

    /// Section text as a list, one item per line, list markers stripped.
    ///
    /// A lone "none" / "n/a" entry yields an empty list.
    pub fn list(&self, label: &str) -> Vec<String> {
        let Some(value) = self.get(label) else {
            return Vec::new();
        };
        value
            .lines()
            .map(strip_list_marker)
            .filter(|item| !item.is_empty())
            .filter(|item| {
                let lower = item.to_lowercase();
                !matches!(lower.as_str(), "none" | "n/a" | "none noted" | "-")
            })
            .map(str::to_string)
            .collect()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.values.contains_key(&label.to_uppercase())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();
    // "1." / "2)" numbering
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return stripped.trim();
        }
    }
    line
}

/// First number in a text, e.g. `"7/10"` -> 7.0, `"score of 8.5"` -> 8.5
pub fn first_number(text: &str) -> Option<f64> {
    NUMBER.as_ref()?.find(text)?.as_str().parse().ok()
}
