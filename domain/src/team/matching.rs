//! Team matching engine
//!
//! Links a parsed proposal to a known [`EntityProfile`] through ordered
//! tiers, stopping at the first tier that yields a candidate:
//!
//! 1. **Exact**: a shared payment address
//! 2. **Fuzzy**: normalized name or alias similarity above a threshold
//! 3. **Overlap**: enough shared member names
//! 4. **None**: no tier satisfied, a new profile should be created
//!
//! More than one candidate at a tier is an ambiguous result that requires
//! external confirmation instead of a silent pick.

use super::profile::EntityProfile;
use crate::core::string::{name_similarity, normalize_name};
use crate::proposal::ProposalDetails;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Tier at which a match was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Fuzzy,
    Overlap,
    None,
}

impl MatchTier {
    pub fn as_str(&self) -> &str {
        match self {
            MatchTier::Exact => "exact",
            MatchTier::Fuzzy => "fuzzy",
            MatchTier::Overlap => "overlap",
            MatchTier::None => "none",
        }
    }

    /// Confidence label attached to a single-candidate match at this tier
    pub fn confidence_label(&self) -> &str {
        match self {
            MatchTier::Exact => "definitive",
            MatchTier::Fuzzy => "high",
            MatchTier::Overlap => "medium",
            MatchTier::None => "none",
        }
    }
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Thresholds for tiers 2 and 3
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchingThresholds {
    /// Minimum name similarity in `[0, 1]` for a fuzzy match
    pub name_similarity: f64,
    /// Minimum number of shared member names for an overlap match
    pub min_member_overlap: usize,
}

impl Default for MatchingThresholds {
    fn default() -> Self {
        Self {
            name_similarity: 0.85,
            min_member_overlap: 2,
        }
    }
}

/// Result of matching a proposal against known profiles (Value Object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMatch {
    pub tier: MatchTier,
    /// The matched (or newly created) profile; `None` while ambiguous
    pub profile_id: Option<String>,
    /// All profiles that satisfied the tier
    #[serde(default)]
    pub candidates: Vec<String>,
    /// Human-readable description of what matched
    pub matched_on: String,
    /// True when several candidates tied and a human must choose
    pub requires_confirmation: bool,
    /// Set once an ambiguous match has been resolved externally
    #[serde(default)]
    pub confirmed: bool,
    /// True when Stage 1 created a fresh profile for this proposal
    #[serde(default)]
    pub created_profile: bool,
}

impl EntityMatch {
    fn single(tier: MatchTier, profile_id: String, matched_on: String) -> Self {
        Self {
            tier,
            candidates: vec![profile_id.clone()],
            profile_id: Some(profile_id),
            matched_on,
            requires_confirmation: false,
            confirmed: false,
            created_profile: false,
        }
    }

    fn ambiguous(tier: MatchTier, candidates: Vec<String>, matched_on: String) -> Self {
        Self {
            tier,
            profile_id: None,
            candidates,
            matched_on,
            requires_confirmation: true,
            confirmed: false,
            created_profile: false,
        }
    }

    /// No tier matched
    pub fn none() -> Self {
        Self {
            tier: MatchTier::None,
            profile_id: None,
            candidates: Vec::new(),
            matched_on: "no known team matched".to_string(),
            requires_confirmation: false,
            confirmed: false,
            created_profile: false,
        }
    }

    /// Link a no-match result to the profile created for it
    pub fn with_created_profile(mut self, profile_id: impl Into<String>) -> Self {
        self.profile_id = Some(profile_id.into());
        self.created_profile = true;
        self
    }

    /// Whether this result still waits for a human to pick a candidate
    pub fn is_ambiguous(&self) -> bool {
        self.requires_confirmation && !self.confirmed
    }

    /// The profile that may be updated for this proposal
    pub fn linked_profile_id(&self) -> Option<&str> {
        if self.is_ambiguous() {
            None
        } else {
            self.profile_id.as_deref()
        }
    }

    /// Resolve an ambiguous match to the chosen profile
    pub fn confirm(&mut self, profile_id: impl Into<String>) {
        self.profile_id = Some(profile_id.into());
        self.confirmed = true;
    }
}

/// Match a proposal's identity attributes against the known profiles
pub fn match_entity(
    details: &ProposalDetails,
    profiles: &[EntityProfile],
    thresholds: &MatchingThresholds,
) -> EntityMatch {
    // Tier 1: payment address
    let addresses = details.payment_addresses();
    if !addresses.is_empty() {
        let candidates: Vec<&EntityProfile> = profiles
            .iter()
            .filter(|p| addresses.iter().any(|a| p.has_address(a)))
            .collect();
        if let Some(result) = resolve(MatchTier::Exact, candidates, "shared payment address") {
            return result;
        }
    }

    // Tier 2: fuzzy name / alias
    let name = details.requesting_entity.trim();
    if !name.is_empty() {
        let scored: Vec<(&EntityProfile, f64)> = profiles
            .iter()
            .filter_map(|p| {
                let best = p
                    .names()
                    .map(|n| name_similarity(name, n))
                    .fold(0.0_f64, f64::max);
                (best >= thresholds.name_similarity).then_some((p, best))
            })
            .collect();
        if !scored.is_empty() {
            let top = scored.iter().map(|(_, s)| *s).fold(0.0_f64, f64::max);
            let description = format!("name similar to '{}' ({:.2})", name, top);
            let candidates = scored.into_iter().map(|(p, _)| p).collect();
            if let Some(result) = resolve(MatchTier::Fuzzy, candidates, &description) {
                return result;
            }
        }
    }

    // Tier 3: member overlap
    let members: HashSet<String> = details
        .member_names()
        .into_iter()
        .map(normalize_name)
        .filter(|m| !m.is_empty())
        .collect();
    if members.len() >= thresholds.min_member_overlap && thresholds.min_member_overlap > 0 {
        let candidates: Vec<&EntityProfile> = profiles
            .iter()
            .filter(|p| {
                let shared = p
                    .members
                    .iter()
                    .map(|m| normalize_name(m))
                    .collect::<HashSet<_>>()
                    .intersection(&members)
                    .count();
                shared >= thresholds.min_member_overlap
            })
            .collect();
        let description = format!(
            "at least {} shared team members",
            thresholds.min_member_overlap
        );
        if let Some(result) = resolve(MatchTier::Overlap, candidates, &description) {
            return result;
        }
    }

    EntityMatch::none()
}

fn resolve(
    tier: MatchTier,
    candidates: Vec<&EntityProfile>,
    matched_on: &str,
) -> Option<EntityMatch> {
    match candidates.as_slice() {
        [] => None,
        [only] => Some(EntityMatch::single(
            tier,
            only.id.clone(),
            matched_on.to_string(),
        )),
        many => Some(EntityMatch::ambiguous(
            tier,
            many.iter().map(|p| p.id.clone()).collect(),
            format!("{} ({} candidates)", matched_on, many.len()),
        )),
    }
}
