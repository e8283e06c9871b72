//! Prompt templates for the council pipeline

use crate::core::string::{format_amount, truncate};
use crate::deliberation::PeerBundle;
use crate::evaluation::Evaluation;
use crate::learning::{Observation, Outcome};
use crate::persona::PersonaConfig;
use crate::proposal::{ProposalDetails, SimilarProposal};
use crate::team::EntityProfile;

const RECOMMENDATION_SCALE: &str =
    "strong_approve/approve/lean_approve/lean_reject/reject/strong_reject";

/// Everything a persona sees when evaluating a proposal
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub details: &'a ProposalDetails,
    pub team: Option<&'a EntityProfile>,
    pub observations: &'a [&'a Observation],
    pub similar: &'a [SimilarProposal],
}

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// Stage 1: ask the parser target for the structured JSON extraction
    pub fn extraction(content: &str) -> String {
        format!(
            r#"Extract the structured fields of the following grant application.

## Application
{}

---

Reply with a single JSON object of this shape. Use null for anything the
application does not state; never guess.

{{
  "project_name": "string",
  "summary": "string, two or three sentences",
  "description": "string, the full project description",
  "team_name": "string, team or organization name",
  "team_members": [{{"name": "string", "role": "string or null", "wallet_addresses": ["string"], "aliases": ["string"]}}],
  "team_background": "string or null",
  "prior_work": "string or null",
  "wallet_address": "string or null, address that receives funds",
  "requested_amount": 0,
  "budget_breakdown": [{{"category": "string", "description": "string", "amount": 0, "justification": "string or null"}}],
  "milestones": [{{"title": "string", "description": "string", "deliverables": ["string"], "timeline": "string or null", "funding_percentage": null}}],
  "timeline": "string or null",
  "category": "string or null, e.g. Infrastructure, Tooling, Education",
  "ecosystem_benefit": "string or null",
  "github_url": "string or null",
  "website_url": "string or null"
}}

Respond with the JSON object only."#,
            content
        )
    }

    /// Stage 2: one persona's evaluation request
    pub fn evaluation(persona: &PersonaConfig, context: &EvaluationContext<'_>) -> String {
        let mut prompt = String::new();

        if !context.observations.is_empty() {
            prompt.push_str("## Patterns You've Learned\n\n");
            for obs in context.observations {
                prompt.push_str(&format!(
                    "- **{}** (confidence: {}, based on {} cases)\n",
                    obs.pattern,
                    obs.confidence_level(),
                    obs.evidence_count
                ));
                if !obs.context.is_empty() {
                    prompt.push_str(&format!("  Context: {}\n", obs.context));
                }
            }
            prompt.push_str("\n---\n\n");
        }

        if let Some(team) = context.team {
            prompt.push_str("## Team History\n\n");
            prompt.push_str(&team.history_summary());
            prompt.push_str("\n---\n\n");
        }

        if !context.similar.is_empty() {
            prompt.push_str("## Similar Applications\n\n");
            for similar in context.similar {
                prompt.push_str(&format!(
                    "**{}**\n- Requested: ${}\n- Decision: {}\n",
                    similar.title,
                    format_amount(similar.requested_amount),
                    similar.decision
                ));
                if let Some(outcome) = &similar.outcome {
                    prompt.push_str(&format!("- Outcome: {}\n", outcome));
                }
                if !similar.summary.is_empty() {
                    prompt.push_str(&format!("- Summary: {}\n", similar.summary));
                }
                prompt.push('\n');
            }
            prompt.push_str("---\n\n");
        }

        prompt.push_str("## Current Application\n\n");
        prompt.push_str(&Self::proposal_block(context.details));
        prompt.push_str("\n---\n\n## Your Evaluation\n\n");

        if !persona.evaluation_instructions.is_empty() {
            prompt.push_str(&persona.evaluation_instructions);
            prompt.push_str("\n\n");
        }
        if !persona.focus_areas.is_empty() {
            prompt.push_str(&format!("Focus areas: {}\n\n", persona.focus_areas.join(", ")));
        }

        prompt.push_str(&format!(
            r#"Format your response as follows:

SCORE: [1-10]
RECOMMENDATION: [{}]
CONFIDENCE: [high/medium/low]

RATIONALE:
[Your reasoning]

STRENGTHS:
- [Strength]

CONCERNS:
- [Concern]

QUESTIONS:
- [Question that would clarify your assessment]
"#,
            RECOMMENDATION_SCALE
        ));

        prompt
    }

    /// Full structured proposal as markdown
    pub fn proposal_block(details: &ProposalDetails) -> String {
        let mut block = format!("**Project Name:** {}\n\n**Team:** {}\n", details.title, details.requesting_entity);
        if !details.team_members.is_empty() {
            let members: Vec<String> = details
                .team_members
                .iter()
                .map(|m| match &m.role {
                    Some(role) => format!("{} ({})", m.name, role),
                    None => m.name.clone(),
                })
                .collect();
            block.push_str(&format!("**Team Members:** {}\n", members.join(", ")));
        }
        block.push_str(&format!(
            "\n**Requested Amount:** ${}\n\n",
            format_amount(details.requested_amount)
        ));
        if !details.summary.is_empty() {
            block.push_str(&format!("**Summary:**\n{}\n\n", details.summary));
        }
        if !details.description.is_empty() {
            block.push_str(&format!("**Full Description:**\n{}\n\n", details.description));
        }
        if let Some(background) = &details.team_background {
            block.push_str(&format!("**Team Background:**\n{}\n\n", background));
        }
        if let Some(prior) = &details.prior_work {
            block.push_str(&format!("**Prior Work:**\n{}\n\n", prior));
        }
        if !details.budget_breakdown.is_empty() {
            block.push_str("**Budget Breakdown:**\n");
            for item in &details.budget_breakdown {
                block.push_str(&format!("- {}: ${}", item.category, format_amount(item.amount)));
                if !item.description.is_empty() {
                    block.push_str(&format!(" - {}", item.description));
                }
                block.push('\n');
            }
            block.push('\n');
        }
        if !details.milestones.is_empty() {
            block.push_str("**Milestones:**\n");
            for (i, milestone) in details.milestones.iter().enumerate() {
                block.push_str(&format!("{}. **{}**", i + 1, milestone.title));
                if let Some(timeline) = &milestone.timeline {
                    block.push_str(&format!(" ({})", timeline));
                }
                block.push_str(&format!("\n   {}\n", milestone.description));
                if !milestone.deliverables.is_empty() {
                    block.push_str(&format!("   Deliverables: {}\n", milestone.deliverables.join(", ")));
                }
            }
            block.push('\n');
        }
        if let Some(timeline) = &details.timeline {
            block.push_str(&format!("**Timeline:** {}\n", timeline));
        }
        if let Some(benefit) = &details.ecosystem_benefit {
            block.push_str(&format!("**Ecosystem Benefit:**\n{}\n\n", benefit));
        }
        if let Some(url) = &details.github_url {
            block.push_str(&format!("**GitHub:** {}\n", url));
        }
        if let Some(url) = &details.website_url {
            block.push_str(&format!("**Website:** {}\n", url));
        }
        block
    }

    /// Stage 3: peer review of anonymized colleague evaluations
    pub fn deliberation(
        own: &Evaluation,
        bundle: &PeerBundle,
        proposal_summary: &str,
        round: u32,
    ) -> String {
        let mut prompt = format!(
            "## Deliberation Round {}\n\nYou already evaluated this application. You can now see how other reviewers assessed it.\n\n**Application Summary:** {}\n\n",
            round, proposal_summary
        );

        prompt.push_str(&format!(
            "### Your Current Evaluation\n- Score: {}/10\n- Recommendation: {}\n- Confidence: {}\n- Key points: {}\n\n",
            own.score,
            own.recommendation,
            own.confidence,
            truncate(&own.rationale, 500)
        ));

        prompt.push_str("### Other Reviewers' Evaluations\n\n");
        for peer in &bundle.peers {
            prompt.push_str(&format!(
                "**{}:**\n- Score: {}/10\n- Recommendation: {}\n- Confidence: {}\n- Key reasoning: {}\n",
                peer.label, peer.score, peer.recommendation, peer.confidence, peer.rationale
            ));
            if !peer.strengths.is_empty() {
                prompt.push_str(&format!("- Strengths: {}\n", peer.strengths.join(", ")));
            }
            if !peer.concerns.is_empty() {
                prompt.push_str(&format!("- Concerns: {}\n", peer.concerns.join(", ")));
            }
            prompt.push('\n');
        }

        prompt.push_str(&format!(
            r#"---

## Your Task

Decide whether the other reviewers raise points you missed or whether your assessment stands. You may:
1. **Maintain** your position
2. **Strengthen** it if their concerns do not apply
3. **Weaken** it if they raise valid points
4. **Reverse** it if you are convinced you were wrong

Format your response:

POSITION_CHANGE: [maintained/strengthened/weakened/reversed]
UPDATED_RECOMMENDATION: [only if changed: {}]
UPDATED_SCORE: [only if changed: 1-10]

DELIBERATION_RESPONSE:
[What you agree with, what you dispute, and why your position moved or held]
"#,
            RECOMMENDATION_SCALE
        ));

        prompt
    }

    /// Learning: reflect on a human decision that went against the panel
    pub fn override_reflection(
        evaluation: &Evaluation,
        details: &ProposalDetails,
        human_verdict: &str,
        human_rationale: &str,
        known: &[&Observation],
    ) -> String {
        let mut prompt = Self::reflection_header(
            "You are reflecting on a decision that a human reviewer overrode.",
            evaluation,
            details,
        );
        prompt.push_str(&format!(
            "## What Happened\nYour recommendation: {}\nHuman decision: {}\nHuman rationale: {}\n\n",
            evaluation.recommendation,
            human_verdict,
            if human_rationale.is_empty() { "No rationale provided" } else { human_rationale }
        ));
        prompt.push_str(
            "## Your Task\nReflect on why the human decided differently:\n\
             1. What signals did you miss that the human caught?\n\
             2. What did you overweight or underweight?\n\
             3. Is there a pattern that could inform future evaluations?\n\n",
        );
        prompt.push_str(&Self::reflection_footer(known));
        prompt
    }

    /// Learning: reflect on the recorded real-world outcome
    pub fn outcome_reflection(
        evaluation: &Evaluation,
        details: &ProposalDetails,
        outcome: &Outcome,
        known: &[&Observation],
    ) -> String {
        let mut prompt = Self::reflection_header(
            "You are reflecting on the outcome of a grant you evaluated.",
            evaluation,
            details,
        );
        prompt.push_str(&format!(
            "## Grant Outcome\nResult: {}\nCompletion: {}\nQuality Score: {}\nImpact Assessment: {}\nIssues: {}\n",
            outcome.result,
            outcome
                .completion_percentage
                .map_or_else(|| "N/A".to_string(), |p| format!("{:.0}%", p)),
            outcome
                .quality_score
                .map_or_else(|| "N/A".to_string(), |q| format!("{}/10", q)),
            if outcome.impact_assessment.is_empty() { "None provided" } else { outcome.impact_assessment.as_str() },
            join_or_none(&outcome.issues)
        ));
        if !outcome.notes.is_empty() {
            prompt.push_str(&format!("Notes: {}\n", outcome.notes));
        }
        prompt.push_str(
            "\n## Your Task\nJudge how well your evaluation predicted the outcome:\n\
             1. Did your concerns materialize or were they unfounded?\n\
             2. Did the strengths you identified hold up?\n\
             3. What would you evaluate differently knowing the outcome?\n\
             4. Is there a pattern that could improve future evaluations?\n\n",
        );
        prompt.push_str(&Self::reflection_footer(known));
        prompt
    }

    fn reflection_header(
        opening: &str,
        evaluation: &Evaluation,
        details: &ProposalDetails,
    ) -> String {
        format!(
            "{}\n\n## Your Original Evaluation\nScore: {}/10\nRecommendation: {}\nRationale: {}\nConcerns: {}\nStrengths: {}\n\n## The Application\nProject: {}\nTeam: {}\nAmount: ${}\nSummary: {}\n\n",
            opening,
            evaluation.original.score,
            evaluation.original.recommendation,
            evaluation.rationale,
            join_or_none(&evaluation.concerns),
            join_or_none(&evaluation.strengths),
            details.title,
            details.requesting_entity,
            format_amount(details.requested_amount),
            details.summary
        )
    }

    fn reflection_footer(known: &[&Observation]) -> String {
        let mut footer = String::new();
        if !known.is_empty() {
            footer.push_str("## Patterns You Currently Hold\n");
            for obs in known {
                footer.push_str(&format!("- [{}] {}\n", obs.id, obs.pattern));
            }
            footer.push('\n');
        }
        footer.push_str(
            "If you identify a useful pattern, end with:\n\n\
             PATTERN: [One sentence describing the pattern]\n\
             CONTEXT: [When this pattern applies]\n\
             TAGS: [comma-separated tags such as small_grant, infrastructure, new_team]\n",
        );
        if !known.is_empty() {
            footer.push_str("CONTRADICTS: [ids of patterns above that this case contradicts, if any]\n");
        }
        footer.push_str("\nIf there is no clear pattern, explain your reflection without the PATTERN block.\n");
        footer
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None noted".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deliberation::PeerView;
    use crate::evaluation::{Confidence, Recommendation};
    use crate::learning::{CandidatePattern, OutcomeResult};
    use crate::proposal::Milestone;

    fn details() -> ProposalDetails {
        ProposalDetails {
            title: "Indexer SDK".into(),
            requesting_entity: "Acme Labs".into(),
            requested_amount: 12_500.0,
            summary: "A typed SDK for the chain indexer.".into(),
            milestones: vec![Milestone {
                title: "Alpha".into(),
                timeline: Some("4 weeks".into()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn evaluation() -> Evaluation {
        Evaluation::new(
            "p1",
            &PersonaConfig::technical(),
            7.0,
            Recommendation::Approve,
            Confidence::High,
            "Solid plan.",
        )
    }

    #[test]
    fn test_evaluation_prompt_sections() {
        let details = details();
        let persona = PersonaConfig::technical();
        let mut obs = Observation::new_draft(
            "technical",
            &CandidatePattern {
                pattern: "Teams without prototypes slip".into(),
                context: "Early-stage tooling".into(),
                tags: vec![],
            },
            "p0",
            "e0",
        );
        obs.approve().unwrap();
        let observations = [&obs];
        let context = EvaluationContext {
            details: &details,
            team: None,
            observations: &observations,
            similar: &[],
        };
        let prompt = PromptTemplate::evaluation(&persona, &context);
        assert!(prompt.contains("## Patterns You've Learned"));
        assert!(prompt.contains("Teams without prototypes slip"));
        assert!(prompt.contains("**Requested Amount:** $12,500.00"));
        assert!(prompt.contains("1. **Alpha** (4 weeks)"));
        assert!(prompt.contains("RECOMMENDATION: [strong_approve"));
        assert!(!prompt.contains("## Team History"));
    }

    #[test]
    fn test_deliberation_prompt_hides_identity() {
        let own = evaluation();
        let bundle = PeerBundle {
            persona_id: "technical".into(),
            peers: vec![PeerView {
                label: "Reviewer A".into(),
                score: 4.0,
                recommendation: Recommendation::LeanReject,
                confidence: Confidence::Medium,
                rationale: "Budget is thin.".into(),
                strengths: vec![],
                concerns: vec!["Budget".into()],
            }],
        };
        let prompt = PromptTemplate::deliberation(&own, &bundle, "SDK", 1);
        assert!(prompt.contains("**Reviewer A:**"));
        assert!(prompt.contains("- Concerns: Budget"));
        assert!(prompt.contains("POSITION_CHANGE:"));
        assert!(!prompt.contains("Budget Analyst"));
    }

    #[test]
    fn test_reflection_prompts() {
        let details = details();
        let prompt = PromptTemplate::override_reflection(&evaluation(), &details, "reject", "", &[]);
        assert!(prompt.contains("Human rationale: No rationale provided"));
        assert!(prompt.contains("PATTERN:"));
        assert!(!prompt.contains("CONTRADICTS:"));

        let outcome = Outcome::new(OutcomeResult::Partial).with_completion(60.0);
        let known = Observation::new_draft(
            "technical",
            &CandidatePattern {
                pattern: "x y z".into(),
                context: String::new(),
                tags: vec![],
            },
            "p0",
            "e0",
        );
        let prompt = PromptTemplate::outcome_reflection(&evaluation(), &details, &outcome, &[&known]);
        assert!(prompt.contains("Completion: 60%"));
        assert!(prompt.contains("Quality Score: N/A"));
        assert!(prompt.contains(&format!("[{}]", known.id)));
        assert!(prompt.contains("CONTRADICTS:"));
    }
}
