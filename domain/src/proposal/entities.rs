//! Proposal domain entities

use crate::core::error::DomainError;
use crate::core::string::normalize_address;
use crate::pipeline::Stage;
use crate::team::EntityMatch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle status of a proposal inside the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Submitted, not yet parsed
    Received,
    /// Structured extraction succeeded
    Parsed,
    /// Stage 2 completed
    Evaluated,
    /// Stage 3 completed (or was skipped)
    Deliberated,
    /// A Decision exists
    Decided,
    /// The pipeline aborted at `stage`
    Failed { stage: Stage, reason: String },
}

impl ProposalStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ProposalStatus::Received => "received",
            ProposalStatus::Parsed => "parsed",
            ProposalStatus::Evaluated => "evaluated",
            ProposalStatus::Deliberated => "deliberated",
            ProposalStatus::Decided => "decided",
            ProposalStatus::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Decided | ProposalStatus::Failed { .. }
        )
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProposalStatus::Failed { stage, reason } => {
                write!(f, "failed at {}: {}", stage.as_str(), reason)
            }
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// A member of the requesting team
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamMember {
    pub name: String,
    pub role: Option<String>,
    #[serde(alias = "payment_addresses")]
    pub wallet_addresses: Vec<String>,
    pub aliases: Vec<String>,
}

/// One line of the requested budget
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetItem {
    pub category: String,
    pub description: String,
    #[serde(deserialize_with = "de_amount")]
    pub amount: f64,
    pub justification: Option<String>,
}

/// A deliverable checkpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Milestone {
    pub title: String,
    pub description: String,
    pub deliverables: Vec<String>,
    pub timeline: Option<String>,
    pub funding_percentage: Option<f64>,
}

/// Structured extraction of a submitted proposal
///
/// Field aliases accept both the council's own vocabulary (`title`,
/// `requesting_entity`, `payment_address`) and common application-form
/// vocabulary (`project_name`, `team_name`, `wallet_address`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalDetails {
    #[serde(alias = "project_name")]
    pub title: String,
    pub summary: String,
    pub description: String,
    #[serde(alias = "team_name")]
    pub requesting_entity: String,
    pub team_members: Vec<TeamMember>,
    pub team_background: Option<String>,
    pub prior_work: Option<String>,
    #[serde(alias = "wallet_address")]
    pub payment_address: Option<String>,
    #[serde(deserialize_with = "de_amount")]
    pub requested_amount: f64,
    pub budget_breakdown: Vec<BudgetItem>,
    pub milestones: Vec<Milestone>,
    pub timeline: Option<String>,
    pub category: Option<String>,
    pub ecosystem_benefit: Option<String>,
    pub github_url: Option<String>,
    pub website_url: Option<String>,
}

impl ProposalDetails {
    /// Names of all listed team members (non-empty only)
    pub fn member_names(&self) -> Vec<&str> {
        self.team_members
            .iter()
            .map(|m| m.name.trim())
            .filter(|n| !n.is_empty())
            .collect()
    }

    /// Every payment address mentioned, normalized and de-duplicated
    pub fn payment_addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self
            .payment_address
            .iter()
            .chain(self.team_members.iter().flat_map(|m| m.wallet_addresses.iter()))
            .map(|a| normalize_address(a))
            .filter(|a| !a.is_empty())
            .collect();
        addresses.sort();
        addresses.dedup();
        addresses
    }

    /// Sum of the budget breakdown
    pub fn budget_total(&self) -> f64 {
        self.budget_breakdown.iter().map(|b| b.amount).sum()
    }
}

/// A submitted proposal (Entity)
///
/// Owned by the pipeline; immutable once parsed except for `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    /// Raw submitted text
    pub raw_content: String,
    /// Structured extraction, present once Stage 1 has parsed it
    pub details: Option<ProposalDetails>,
    pub status: ProposalStatus,
    /// Team linkage computed in Stage 1
    pub team_match: Option<EntityMatch>,
    /// Context tags derived from the extraction
    pub tags: Vec<String>,
    /// Non-fatal validation findings
    pub warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    /// Create a freshly received proposal with a generated id
    pub fn new(raw_content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            raw_content: raw_content.into(),
            details: None,
            status: ProposalStatus::Received,
            team_match: None,
            tags: Vec::new(),
            warnings: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Title of the parsed proposal, or a placeholder before parsing
    pub fn title(&self) -> &str {
        self.details
            .as_ref()
            .map(|d| d.title.as_str())
            .unwrap_or("(unparsed)")
    }

    /// Requested amount (0 before parsing)
    pub fn requested_amount(&self) -> f64 {
        self.details.as_ref().map_or(0.0, |d| d.requested_amount)
    }

    /// Linked team profile id, if the match was definitive or confirmed
    pub fn team_id(&self) -> Option<&str> {
        self.team_match.as_ref().and_then(|m| m.linked_profile_id())
    }

    pub fn set_status(&mut self, status: ProposalStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, stage: Stage, reason: impl Into<String>) {
        self.set_status(ProposalStatus::Failed {
            stage,
            reason: reason.into(),
        });
    }
}

/// Accept amounts as JSON numbers or as strings such as `"$50,000"`,
/// `"120k"` or `"1.5 million USD"`.
fn de_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
        Missing(()),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(n) => Ok(n),
        Amount::Text(s) => parse_amount(&s).map_err(serde::de::Error::custom),
        Amount::Missing(()) => Ok(0.0),
    }
}

const CURRENCY_CODES: [&str; 5] = ["usdc", "usdt", "usd", "dollars", "dollar"];

const MAGNITUDES: [(&str, f64); 6] = [
    ("thousand", 1e3),
    ("million", 1e6),
    ("billion", 1e9),
    ("k", 1e3),
    ("m", 1e6),
    ("b", 1e9),
];

/// Read a free-text amount.
///
/// Currency symbols, codes and digit separators are ignored and a trailing
/// magnitude word multiplies the number. An empty string reads as zero.
/// Anything else that is not a finite number is an error.
pub fn parse_amount(text: &str) -> Result<f64, DomainError> {
    let invalid = || DomainError::InvalidValue {
        field: "amount",
        value: text.to_string(),
    };

    let compact: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | ',' | '_'))
        .collect();
    if compact.is_empty() {
        return Ok(0.0);
    }

    let mut rest = compact.as_str();
    for code in CURRENCY_CODES {
        if let Some(stripped) = rest.strip_prefix(code).or_else(|| rest.strip_suffix(code)) {
            rest = stripped;
            break;
        }
    }
    let (number, multiplier) = MAGNITUDES
        .iter()
        .find_map(|&(suffix, factor)| rest.strip_suffix(suffix).map(|n| (n, factor)))
        .unwrap_or((rest, 1.0));

    if !number.starts_with(|c: char| c.is_ascii_digit() || c == '.' || c == '-') {
        return Err(invalid());
    }
    let value: f64 = number.parse().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }
    Ok(value * multiplier)
}
