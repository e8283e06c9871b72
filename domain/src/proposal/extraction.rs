//! Structured extraction, validation and tagging of proposal details

use super::entities::ProposalDetails;
use crate::core::error::DomainError;

/// Amount band boundaries used for tagging
const SMALL_GRANT_LIMIT: f64 = 10_000.0;
const MEDIUM_GRANT_LIMIT: f64 = 50_000.0;

/// Budget totals may differ from the requested amount by at most this much
const BUDGET_TOLERANCE: f64 = 1.0;

/// Find the JSON object inside a free-text response.
///
/// Accepts a fenced ```` ```json ```` block, a bare object, or falls back to
/// the span between the first `{` and the last `}`.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let body_start = after.find('\n').map_or(0, |i| i + 1);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            let block = body[..end].trim();
            if block.starts_with('{') {
                return Some(block);
            }
        }
    }

    let open = trimmed.find('{')?;
    let close = trimmed.rfind('}')?;
    (close > open).then(|| &trimmed[open..=close])
}

/// Parse proposal details from a JSON document or a response containing one
pub fn parse_details(text: &str) -> Result<ProposalDetails, DomainError> {
    let block = extract_json_block(text)
        .ok_or_else(|| DomainError::Extraction("no JSON object found".to_string()))?;
    serde_json::from_str(block).map_err(|e| DomainError::Extraction(e.to_string()))
}

/// Outcome of validating an extraction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Missing required fields (fatal)
    pub errors: Vec<String>,
    /// Quality findings that do not stop the pipeline
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert into a domain error when any required field is missing
    pub fn into_result(self) -> Result<Vec<String>, DomainError> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(DomainError::InvalidProposal(self.errors))
        }
    }
}

impl ProposalDetails {
    /// Check required fields and budget consistency
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        if self.title.trim().is_empty() {
            report.errors.push("missing title".to_string());
        }
        if self.requesting_entity.trim().is_empty() {
            report.errors.push("missing requesting entity".to_string());
        }
        if self.requested_amount.is_nan() || self.requested_amount <= 0.0 {
            report
                .errors
                .push("requested amount must be greater than zero".to_string());
        }

        if self.description.trim().is_empty() && self.summary.trim().is_empty() {
            report.warnings.push("no description provided".to_string());
        }
        if self.milestones.is_empty() {
            report.warnings.push("no milestones defined".to_string());
        }
        if self.budget_breakdown.is_empty() {
            report.warnings.push("no budget breakdown provided".to_string());
        } else if self.requested_amount > 0.0 {
            let total = self.budget_total();
            if (total - self.requested_amount).abs() > BUDGET_TOLERANCE {
                report.warnings.push(format!(
                    "budget total ({:.2}) does not match requested amount ({:.2})",
                    total, self.requested_amount
                ));
            }
        }

        report
    }

    /// Context tags used to rank observations and find similar proposals
    pub fn tags(&self) -> Vec<String> {
        let mut tags = Vec::new();

        if let Some(category) = self.category.as_deref() {
            let category = category.trim().to_lowercase().replace(' ', "_");
            if !category.is_empty() {
                tags.push(category);
            }
        }

        tags.push(
            if self.requested_amount < SMALL_GRANT_LIMIT {
                "small_grant"
            } else if self.requested_amount < MEDIUM_GRANT_LIMIT {
                "medium_grant"
            } else {
                "large_grant"
            }
            .to_string(),
        );

        match self.team_members.len() {
            0 | 1 => tags.push("solo_founder".to_string()),
            2..=3 => tags.push("small_team".to_string()),
            _ => tags.push("larger_team".to_string()),
        }

        tags.push(
            if self.milestones.len() <= 2 {
                "few_milestones"
            } else {
                "detailed_milestones"
            }
            .to_string(),
        );

        if self.github_url.is_some() {
            tags.push("open_source".to_string());
        }

        tags
    }
}
