//! Entity profile ("team") entity

use crate::core::string::{normalize_address, normalize_name};
use crate::learning::OutcomeResult;
use crate::proposal::ProposalDetails;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Durable identity of a returning applicant.
///
/// Statistics are derived from per-proposal id sets, so every update is
/// idempotent: replaying the same funding or outcome record is a no-op.
/// Profiles are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityProfile {
    pub id: String,
    pub canonical_name: String,
    /// Other names this team has applied under
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Known member names
    #[serde(default)]
    pub members: Vec<String>,
    /// Normalized payment addresses
    #[serde(default)]
    pub payment_addresses: Vec<String>,
    /// Every proposal linked to this team
    #[serde(default)]
    pub proposal_ids: BTreeSet<String>,
    /// Funded proposals and their awarded amount
    #[serde(default)]
    pub funded: BTreeMap<String, f64>,
    #[serde(default)]
    pub completed: BTreeSet<String>,
    #[serde(default)]
    pub failed: BTreeSet<String>,
    #[serde(default)]
    pub partial: BTreeSet<String>,
    #[serde(default)]
    pub reputation_notes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EntityProfile {
    /// Create a profile from the first unmatched proposal of a team
    pub fn from_details(details: &ProposalDetails, proposal_id: &str) -> Self {
        let now = Utc::now();
        let mut profile = Self {
            id: uuid::Uuid::new_v4().to_string(),
            canonical_name: details.requesting_entity.trim().to_string(),
            aliases: Vec::new(),
            members: Vec::new(),
            payment_addresses: Vec::new(),
            proposal_ids: BTreeSet::new(),
            funded: BTreeMap::new(),
            completed: BTreeSet::new(),
            failed: BTreeSet::new(),
            partial: BTreeSet::new(),
            reputation_notes: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        profile.absorb(details, proposal_id);
        profile
    }

    /// Merge identity attributes of a newly linked proposal.
    ///
    /// A differing team name becomes an alias; new members and addresses
    /// are appended. Returns true if anything changed.
    pub fn absorb(&mut self, details: &ProposalDetails, proposal_id: &str) -> bool {
        let mut changed = self.proposal_ids.insert(proposal_id.to_string());

        let name = details.requesting_entity.trim();
        if !name.is_empty() && !self.has_name(name) {
            self.aliases.push(name.to_string());
            changed = true;
        }

        for member in details.member_names() {
            let normalized = normalize_name(member);
            if !self.members.iter().any(|m| normalize_name(m) == normalized) {
                self.members.push(member.to_string());
                changed = true;
            }
        }

        for address in details.payment_addresses() {
            if !self.payment_addresses.contains(&address) {
                self.payment_addresses.push(address);
                changed = true;
            }
        }

        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }

    /// Whether `name` equals the canonical name or an alias after normalization
    pub fn has_name(&self, name: &str) -> bool {
        let normalized = normalize_name(name);
        self.names().any(|n| normalize_name(n) == normalized)
    }

    /// Canonical name followed by all aliases
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical_name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn has_address(&self, address: &str) -> bool {
        let address = normalize_address(address);
        self.payment_addresses.iter().any(|a| *a == address)
    }

    /// Record that a proposal was funded. Idempotent per proposal.
    pub fn record_funding(&mut self, proposal_id: &str, amount: f64) -> bool {
        if self.funded.contains_key(proposal_id) {
            return false;
        }
        self.funded.insert(proposal_id.to_string(), amount);
        self.proposal_ids.insert(proposal_id.to_string());
        self.updated_at = Utc::now();
        true
    }

    /// Undo a funding record (a human rejected an auto-approved proposal)
    pub fn revoke_funding(&mut self, proposal_id: &str) -> bool {
        let removed = self.funded.remove(proposal_id).is_some();
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// Record the real-world result of a proposal.
    ///
    /// A later outcome for the same proposal replaces the earlier one.
    pub fn record_outcome(&mut self, proposal_id: &str, result: OutcomeResult) -> bool {
        let id = proposal_id.to_string();
        let already = match result {
            OutcomeResult::Success => self.completed.contains(&id),
            OutcomeResult::Failure => self.failed.contains(&id),
            OutcomeResult::Partial => self.partial.contains(&id),
        };
        if already {
            return false;
        }

        self.completed.remove(&id);
        self.failed.remove(&id);
        self.partial.remove(&id);
        match result {
            OutcomeResult::Success => self.completed.insert(id),
            OutcomeResult::Failure => self.failed.insert(id),
            OutcomeResult::Partial => self.partial.insert(id),
        };
        self.updated_at = Utc::now();
        true
    }

    pub fn grants_received(&self) -> usize {
        self.funded.len()
    }

    pub fn grants_completed(&self) -> usize {
        self.completed.len()
    }

    pub fn grants_failed(&self) -> usize {
        self.failed.len()
    }

    pub fn total_funding(&self) -> f64 {
        self.funded.values().sum()
    }

    /// Share of resolved grants that were delivered (partials count half).
    ///
    /// `None` until at least one outcome is recorded.
    pub fn reputation_score(&self) -> Option<f64> {
        let resolved = self.completed.len() + self.failed.len() + self.partial.len();
        if resolved == 0 {
            return None;
        }
        Some((self.completed.len() as f64 + 0.5 * self.partial.len() as f64) / resolved as f64)
    }

    /// Short history block for evaluation prompts
    pub fn history_summary(&self) -> String {
        let mut summary = format!(
            "Team: {}\nPrevious proposals: {}\nGrants received: {} (total {:.0})\nCompleted: {}, failed: {}, partial: {}\n",
            self.canonical_name,
            self.proposal_ids.len(),
            self.grants_received(),
            self.total_funding(),
            self.completed.len(),
            self.failed.len(),
            self.partial.len(),
        );
        if let Some(score) = self.reputation_score() {
            summary.push_str(&format!("Reputation score: {:.2}\n", score));
        }
        if !self.aliases.is_empty() {
            summary.push_str(&format!("Also known as: {}\n", self.aliases.join(", ")));
        }
        for note in &self.reputation_notes {
            summary.push_str(&format!("Note: {}\n", note));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::TeamMember;

    fn details(name: &str) -> ProposalDetails {
        ProposalDetails {
            title: "Indexer".to_string(),
            requesting_entity: name.to_string(),
            payment_address: Some("0xABC".to_string()),
            team_members: vec![TeamMember {
                name: "Ada Lovelace".to_string(),
                ..Default::default()
            }],
            requested_amount: 5_000.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_from_details() {
        let profile = EntityProfile::from_details(&details("Acme Labs"), "p1");
        assert_eq!(profile.canonical_name, "Acme Labs");
        assert_eq!(profile.payment_addresses, vec!["0xabc"]);
        assert_eq!(profile.members, vec!["Ada Lovelace"]);
        assert!(profile.proposal_ids.contains("p1"));
        assert!(profile.aliases.is_empty());
    }

    #[test]
    fn test_absorb_adds_alias_once() {
        let mut profile = EntityProfile::from_details(&details("Acme Labs"), "p1");
        assert!(profile.absorb(&details("Acme Research"), "p2"));
        assert!(!profile.absorb(&details("acme research"), "p2"));
        assert_eq!(profile.aliases, vec!["Acme Research"]);
        assert!(profile.has_name("ACME-Research"));
    }

    #[test]
    fn test_record_funding_is_idempotent() {
        let mut profile = EntityProfile::from_details(&details("Acme"), "p1");
        assert!(profile.record_funding("p1", 5_000.0));
        assert!(!profile.record_funding("p1", 5_000.0));
        assert_eq!(profile.grants_received(), 1);
        assert_eq!(profile.total_funding(), 5_000.0);

        assert!(profile.revoke_funding("p1"));
        assert_eq!(profile.grants_received(), 0);
    }

    #[test]
    fn test_record_outcome_replaces_previous_result() {
        let mut profile = EntityProfile::from_details(&details("Acme"), "p1");
        assert!(profile.record_outcome("p1", OutcomeResult::Partial));
        assert!(!profile.record_outcome("p1", OutcomeResult::Partial));
        assert!(profile.record_outcome("p1", OutcomeResult::Success));
        assert_eq!(profile.grants_completed(), 1);
        assert!(profile.partial.is_empty());
    }

    #[test]
    fn test_reputation_score() {
        let mut profile = EntityProfile::from_details(&details("Acme"), "p1");
        assert_eq!(profile.reputation_score(), None);
        profile.record_outcome("p1", OutcomeResult::Success);
        profile.record_outcome("p2", OutcomeResult::Failure);
        profile.record_outcome("p3", OutcomeResult::Partial);
        assert_eq!(profile.reputation_score(), Some(0.5));
    }
}
