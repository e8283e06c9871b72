//! Human-readable decision summary

use super::entities::Decision;
use crate::core::string::{format_amount, truncate};
use crate::evaluation::Evaluation;

const SUMMARY_RATIONALE_LIMIT: usize = 300;
const KEY_POINTS_PER_PERSONA: usize = 2;
const KEY_POINTS_LIMIT: usize = 5;

/// First few items of each evaluation's list, de-duplicated in order
pub fn key_points<F>(evaluations: &[Evaluation], select: F) -> Vec<String>
where
    F: Fn(&Evaluation) -> &[String],
{
    let mut points: Vec<String> = Vec::new();
    for evaluation in evaluations.iter().filter(|e| !e.is_fallback()) {
        for point in select(evaluation).iter().take(KEY_POINTS_PER_PERSONA) {
            if !points.iter().any(|p| p.eq_ignore_ascii_case(point)) {
                points.push(point.clone());
            }
        }
    }
    points.truncate(KEY_POINTS_LIMIT);
    points
}

/// Fill in the markdown summary and key points of a decision
pub fn summarize(decision: &mut Decision, title: &str, amount: f64, evaluations: &[Evaluation]) {
    let mut out = String::new();
    out.push_str(&format!("## Council Evaluation: {}\n\n", title));
    out.push_str(&format!("**Requested Amount:** ${}\n", format_amount(amount)));
    out.push_str(&format!(
        "**Recommendation:** {}\n",
        decision.primary_recommendation.display_name()
    ));
    out.push_str(&format!(
        "**Consensus Strength:** {:.0}%{}\n",
        decision.consensus_strength * 100.0,
        if decision.unanimous { " (unanimous)" } else { "" }
    ));
    out.push_str(&format!(
        "**Routing:** {} ({})\n",
        decision.status, decision.routing_reason
    ));

    out.push_str("\n### Votes\n");
    for vote in &decision.votes {
        out.push_str(&format!(
            "- **{}**: {} ({} confidence, score {:.1}){}\n",
            vote.persona_name,
            vote.recommendation.display_name(),
            vote.confidence,
            vote.score,
            if vote.fallback { " [fallback]" } else { "" }
        ));
    }

    out.push_str("\n### Perspectives\n");
    for evaluation in evaluations.iter().filter(|e| !e.is_fallback()) {
        out.push_str(&format!(
            "**{}:** {}\n\n",
            evaluation.persona_name,
            truncate(&evaluation.rationale, SUMMARY_RATIONALE_LIMIT)
        ));
    }

    decision.summary = out;
    decision.key_concerns = key_points(evaluations, |e| &e.concerns);
    decision.key_strengths = key_points(evaluations, |e| &e.strengths);
}
