//! String utilities for the domain layer.
//!
//! Name normalization and similarity scoring used by team matching and by
//! observation de-duplication, plus UTF-8 safe truncation for prompts.

use std::collections::{HashMap, HashSet};

/// Truncate a string to a maximum length with ellipsis (UTF-8 safe)
///
/// Uses byte length for max_len but ensures truncation occurs at valid
/// UTF-8 character boundaries.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let target = max_len.saturating_sub(3);
        let mut end = target.min(s.len());
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

/// Normalize a name for comparison.
///
/// Lowercases, drops punctuation and collapses runs of whitespace, so
/// `"  Acme-Labs, Inc. "` and `"acme labs inc"` normalize identically.
pub fn normalize_name(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a payment address: trimmed and lowercased.
pub fn normalize_address(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Similarity of two names in `[0, 1]` (Sørensen-Dice over character bigrams).
///
/// Both inputs are normalized first and whitespace is ignored, so the score
/// is insensitive to case, punctuation and spacing.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = normalize_name(a).chars().filter(|c| *c != ' ').collect();
    let b: Vec<char> = normalize_name(b).chars().filter(|c| *c != ' ').collect();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut bigrams: HashMap<(char, char), usize> = HashMap::new();
    for pair in a.windows(2) {
        *bigrams.entry((pair[0], pair[1])).or_insert(0) += 1;
    }

    let mut shared = 0usize;
    for pair in b.windows(2) {
        if let Some(count) = bigrams.get_mut(&(pair[0], pair[1]))
            && *count > 0
        {
            *count -= 1;
            shared += 1;
        }
    }

    (2 * shared) as f64 / ((a.len() - 1) + (b.len() - 1)) as f64
}

/// Significant word tokens of a text (normalized, at least three characters).
pub fn tokens(s: &str) -> HashSet<String> {
    normalize_name(s)
        .split_whitespace()
        .filter(|t| t.chars().count() >= 3)
        .map(str::to_string)
        .collect()
}

/// Jaccard overlap of the significant word tokens of two texts.
pub fn token_jaccard(a: &str, b: &str) -> f64 {
    let a = tokens(a);
    let b = tokens(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    intersection as f64 / union as f64
}

/// Format an amount with thousands separators and two decimals
/// (`12500.0` -> `"12,500.00"`)
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, cents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn test_truncate_multibyte() {
        // "é" is 2 bytes; cutting inside it backs up to the previous boundary
        assert_eq!(truncate("réévaluation", 5), "r...");
        assert_eq!(truncate("réévaluation", 6), "ré...");
        assert_eq!(truncate("café", 10), "café");
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Acme-Labs, Inc. "), "acme labs inc");
        assert_eq!(normalize_name("ACME   labs"), "acme labs");
        assert_eq!(normalize_name("!!!"), "");
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("  0xABcd  "), "0xabcd");
    }

    #[test]
    fn test_name_similarity_identical_after_normalization() {
        assert_eq!(name_similarity("Acme Labs", "acme-labs."), 1.0);
    }

    #[test]
    fn test_name_similarity_close_names() {
        let score = name_similarity("Acme Labs", "Acme Lab");
        assert!(score > 0.9, "score was {score}");
    }

    #[test]
    fn test_name_similarity_unrelated_names() {
        assert!(name_similarity("Acme Labs", "Zenith Collective") < 0.3);
        assert_eq!(name_similarity("", "Acme"), 0.0);
    }

    #[test]
    fn test_token_jaccard() {
        let a = "Budgets without milestone breakdown tend to overrun";
        let b = "budgets without a milestone breakdown overrun";
        assert!(token_jaccard(a, b) >= 0.6);
        assert!(token_jaccard(a, "teams with audits ship on time") < 0.2);
        assert_eq!(token_jaccard("", a), 0.0);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(12_500.0), "12,500.00");
        assert_eq!(format_amount(999.5), "999.50");
        assert_eq!(format_amount(1_234_567.891), "1,234,567.89");
        assert_eq!(format_amount(-50_000.0), "-50,000.00");
    }
}
