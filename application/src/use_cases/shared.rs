//! Shared utilities for use cases.
//!
//! Timed, transcript-logged text generation used by every stage that talks
//! to the generator, and the team-statistics updates shared by the
//! decision-related use cases.

use crate::ports::store::{self, CouncilStore, StoreError};
use crate::ports::text_generator::{GenerationError, TextGenerator};
use crate::ports::transcript_logger::{TranscriptEvent, TranscriptLogger};
use crate::use_cases::locks::CouncilLocks;
use council_domain::{DecisionStatus, EntityProfile, PersonaConfig, Proposal, Side};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// What a generation request is for; goes into the transcript
#[derive(Debug, Clone, Copy)]
pub(crate) struct Purpose {
    pub kind: &'static str,
    pub round: Option<u32>,
}

impl Purpose {
    pub fn new(kind: &'static str) -> Self {
        Self { kind, round: None }
    }

    pub fn round(kind: &'static str, round: u32) -> Self {
        Self {
            kind,
            round: Some(round),
        }
    }
}

/// Generate with an independent timeout; expiry becomes
/// [`GenerationError::Timeout`]. Prompt and outcome are logged.
pub(crate) async fn generate_logged<G: TextGenerator + ?Sized>(
    generator: &G,
    transcript: &dyn TranscriptLogger,
    persona: &PersonaConfig,
    prompt: &str,
    timeout: Duration,
    proposal_id: &str,
    purpose: Purpose,
) -> Result<String, GenerationError> {
    transcript.log(TranscriptEvent::new(
        "generation_request",
        json!({
            "purpose": purpose.kind,
            "round": purpose.round,
            "proposal_id": proposal_id,
            "persona": persona.id,
            "model": persona.model,
            "prompt": prompt,
        }),
    ));

    let result = match tokio::time::timeout(timeout, generator.generate(persona, prompt)).await {
        Ok(result) => result,
        Err(_) => Err(GenerationError::Timeout(timeout)),
    };

    match &result {
        Ok(text) => {
            debug!("{} responded for {} ({} bytes)", persona.id, purpose.kind, text.len());
            transcript.log(TranscriptEvent::new(
                "generation_response",
                json!({
                    "purpose": purpose.kind,
                    "round": purpose.round,
                    "proposal_id": proposal_id,
                    "persona": persona.id,
                    "response": text,
                }),
            ));
        }
        Err(e) => {
            transcript.log(TranscriptEvent::new(
                "generation_error",
                json!({
                    "purpose": purpose.kind,
                    "round": purpose.round,
                    "proposal_id": proposal_id,
                    "persona": persona.id,
                    "kind": e.kind(),
                    "error": e.to_string(),
                }),
            ));
        }
    }
    result
}

/// Reload a team profile under its lock, apply `update`, and save when it
/// reports a change. Missing profiles are skipped.
pub(crate) async fn update_team<F>(
    store: &dyn CouncilStore,
    locks: &CouncilLocks,
    team_id: &str,
    update: F,
) -> Result<bool, StoreError>
where
    F: FnOnce(&mut EntityProfile) -> bool,
{
    let _guard = locks.teams.lock(team_id).await;
    let Some(mut profile) = store::load::<EntityProfile>(store, team_id).await? else {
        return Ok(false);
    };
    if !update(&mut profile) {
        return Ok(false);
    }
    store::save(store, &profile).await?;
    Ok(true)
}

/// Bring the linked team's funding record in line with a decision status.
///
/// Approved statuses record the grant, rejected ones revoke it, and
/// unresolved statuses leave the profile alone. Proposals whose team match
/// is still ambiguous are skipped until the match is confirmed.
pub(crate) async fn sync_funding(
    store: &dyn CouncilStore,
    locks: &CouncilLocks,
    proposal: &Proposal,
    status: DecisionStatus,
) -> Result<bool, StoreError> {
    let Some(team_id) = proposal.team_id() else {
        debug!("Proposal {} has no confirmed team; funding deferred", proposal.id);
        return Ok(false);
    };
    let amount = proposal.requested_amount();
    match status.resolved_side() {
        Some(Side::Approve) => {
            update_team(store, locks, team_id, |p| p.record_funding(&proposal.id, amount)).await
        }
        Some(Side::Reject) => {
            update_team(store, locks, team_id, |p| p.revoke_funding(&proposal.id)).await
        }
        None => Ok(false),
    }
}
