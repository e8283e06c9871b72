//! Console output formatter for council results

use colored::Colorize;
use council_application::{LearningBatch, ProposalView, RecordDecisionOutput, RunCouncilOutput};
use council_domain::{
    Decision, DecisionStatus, DeliberationRecord, EntityProfile, Evaluation, LearningEvent,
    LearningReceipt, Observation, PersonaConfig, Proposal,
};
use serde::Serialize;
use serde_json::json;

/// Formats council results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    // ==================== Pipeline ====================

    /// Format a completed pipeline run
    pub fn format_run(result: &RunCouncilOutput) -> String {
        let mut output = String::new();
        output.push_str(&Self::header("Grants Council Results"));
        output.push('\n');
        output.push_str(&Self::proposal_block(&result.proposal));
        output.push_str(&Self::evaluations_block(&result.evaluations));
        output.push_str(&Self::deliberation_block(&result.deliberation));
        output.push_str(&Self::decision_block(&result.decision));
        output.push_str(&Self::footer());
        output
    }

    pub fn format_run_json(result: &RunCouncilOutput) -> String {
        Self::to_json(&json!({
            "proposal": result.proposal,
            "evaluations": result.evaluations,
            "deliberation": result.deliberation,
            "decision": result.decision,
        }))
    }

    /// Format everything stored about one proposal
    pub fn format_proposal(view: &ProposalView) -> String {
        let mut output = String::new();
        output.push_str(&Self::header(view.proposal.title()));
        output.push('\n');
        output.push_str(&Self::proposal_block(&view.proposal));
        if let Some(set) = &view.evaluations {
            output.push_str(&Self::evaluations_block(&set.evaluations));
        }
        if let Some(record) = &view.deliberation {
            output.push_str(&Self::deliberation_block(record));
        }
        match &view.decision {
            Some(decision) => output.push_str(&Self::decision_block(decision)),
            None => output.push_str(&format!("\n{}\n", "No decision yet.".dimmed())),
        }
        output.push_str(&Self::footer());
        output
    }

    pub fn format_proposal_json(view: &ProposalView) -> String {
        Self::to_json(&json!({
            "proposal": view.proposal,
            "evaluations": view.evaluations,
            "deliberation": view.deliberation,
            "decision": view.decision,
        }))
    }

    fn proposal_block(proposal: &Proposal) -> String {
        let mut output = String::new();
        output.push_str(&format!("{} {}\n", "Proposal:".cyan().bold(), proposal.id));
        output.push_str(&format!("{} {}\n", "Title:".cyan().bold(), proposal.title()));
        output.push_str(&format!("{} {}\n", "Status:".cyan().bold(), proposal.status));
        if let Some(details) = &proposal.details {
            output.push_str(&format!(
                "{} {}\n",
                "Team:".cyan().bold(),
                details.requesting_entity
            ));
            output.push_str(&format!(
                "{} {}\n",
                "Requested:".cyan().bold(),
                Self::amount(details.requested_amount)
            ));
        }
        if let Some(team_match) = &proposal.team_match {
            let mut line = format!("{} ({})", team_match.tier, team_match.matched_on);
            if team_match.requires_confirmation && !team_match.confirmed {
                line = format!(
                    "{} - needs confirmation, candidates: {}",
                    line,
                    team_match.candidates.join(", ")
                )
                .yellow()
                .to_string();
            }
            output.push_str(&format!("{} {}\n", "Team match:".cyan().bold(), line));
        }
        if !proposal.tags.is_empty() {
            output.push_str(&format!(
                "{} {}\n",
                "Tags:".cyan().bold(),
                proposal.tags.join(", ")
            ));
        }
        for warning in &proposal.warnings {
            output.push_str(&format!("{} {}\n", "warning:".yellow(), warning));
        }
        output
    }

    fn evaluations_block(evaluations: &[Evaluation]) -> String {
        let mut output = Self::section_header("Stage 2: Evaluations");
        for evaluation in evaluations {
            let title = format!(
                "── {} ({}) ──",
                evaluation.persona_name, evaluation.model
            );
            if let Some(reason) = &evaluation.failure_reason {
                output.push_str(&format!(
                    "\n{}\nFailed: {}\n",
                    title.red().bold(),
                    reason
                ));
                continue;
            }
            output.push_str(&format!(
                "\n{}\n{} {:.1}/10  {} {}  {} {}\n",
                title.yellow().bold(),
                "Score:".bold(),
                evaluation.score,
                "Recommendation:".bold(),
                evaluation.recommendation,
                "Confidence:".bold(),
                evaluation.confidence,
            ));
            if evaluation.position_changed.is_changed() {
                output.push_str(&format!(
                    "{} {} -> {}\n",
                    "Revised:".magenta(),
                    evaluation.original.recommendation,
                    evaluation.recommendation
                ));
            }
            output.push_str(&Self::indent(&evaluation.rationale, "  "));
            output.push('\n');
            if evaluation.degraded && !evaluation.missing_fields.is_empty() {
                output.push_str(&format!(
                    "{} missing {}\n",
                    "degraded:".yellow(),
                    evaluation.missing_fields.join(", ")
                ));
            }
        }
        output
    }

    fn deliberation_block(record: &DeliberationRecord) -> String {
        let mut output = Self::section_header("Stage 3: Deliberation");
        match &record.skipped {
            Some(reason) => output.push_str(&format!("{} {}\n", "Skipped:".dimmed(), reason)),
            None => {
                output.push_str(&format!(
                    "{} round(s), {} position change(s)\n",
                    record.rounds.len(),
                    record.position_changes
                ));
                if !record.changed_personas.is_empty() {
                    output.push_str(&format!(
                        "{} {}\n",
                        "Changed:".magenta(),
                        record.changed_personas.join(", ")
                    ));
                }
            }
        }
        output
    }

    fn decision_block(decision: &Decision) -> String {
        let mut output = Self::section_header("Stage 4: Decision");
        output.push_str(&format!(
            "{} {}\n{} {} ({:.0}% consensus{})\n{} {}\n",
            "Status:".bold(),
            Self::status(decision.status),
            "Recommendation:".bold(),
            decision.primary_recommendation,
            decision.consensus_strength * 100.0,
            if decision.unanimous { ", unanimous" } else { "" },
            "Routing:".bold(),
            decision.routing_reason,
        ));

        if !decision.key_strengths.is_empty() {
            output.push_str(&format!("\n{}\n", "Key Strengths:".green().bold()));
            for point in &decision.key_strengths {
                output.push_str(&format!("  * {}\n", point));
            }
        }
        if !decision.key_concerns.is_empty() {
            output.push_str(&format!("\n{}\n", "Key Concerns:".yellow().bold()));
            for point in &decision.key_concerns {
                output.push_str(&format!("  * {}\n", point));
            }
        }
        if let Some(human) = &decision.human {
            output.push_str(&format!(
                "\n{} {} (was {}) {}\n",
                "Human decision:".cyan().bold(),
                human.verdict,
                human.previous_status,
                human.notes
            ));
        }
        output
    }

    /// Format the result of a human decision
    pub fn format_decision(result: &RecordDecisionOutput) -> String {
        let mut output = format!(
            "{} {} is now {}\n",
            "v".green(),
            result.decision.proposal_id,
            Self::status(result.decision.status)
        );
        if let Some(event) = &result.learning_event {
            output.push_str(&format!(
                "{} override recorded as learning event {}\n",
                "->".cyan(),
                event.id
            ));
        }
        output
    }

    pub fn format_decision_json(result: &RecordDecisionOutput) -> String {
        Self::to_json(&json!({
            "decision": result.decision,
            "learning_event": result.learning_event,
        }))
    }

    // ==================== Learning ====================

    pub fn format_learning_event(event: &LearningEvent) -> String {
        format!(
            "{} {} event {} recorded for {}\n",
            "v".green(),
            event.kind(),
            event.id,
            event.proposal_id
        )
    }

    pub fn format_receipt(receipt: &LearningReceipt) -> String {
        let mut output = format!(
            "{} event {} ({} reflection(s)): {} created, {} reinforced, {} contradicted\n",
            "->".cyan(),
            receipt.event_id,
            receipt.reflections,
            receipt.created.len(),
            receipt.reinforced.len(),
            receipt.contradicted.len(),
        );
        for failure in &receipt.failures {
            output.push_str(&format!("  {} {}\n", "x".red(), failure));
        }
        output
    }

    pub fn format_learning_batch(batch: &LearningBatch) -> String {
        if batch.receipts.is_empty() && batch.failures.is_empty() {
            return format!("{}\n", "No pending learning events.".dimmed());
        }
        let mut output = String::new();
        for receipt in &batch.receipts {
            output.push_str(&Self::format_receipt(receipt));
        }
        for (event_id, reason) in &batch.failures {
            output.push_str(&format!("{} event {}: {}\n", "x".red(), event_id, reason));
        }
        output.push_str(&format!(
            "\n{} event(s) processed, {} observation(s) touched, {} failed\n",
            batch.receipts.len(),
            batch.observations_touched(),
            batch.failures.len()
        ));
        output
    }

    pub fn format_learning_batch_json(batch: &LearningBatch) -> String {
        let failures: Vec<_> = batch
            .failures
            .iter()
            .map(|(event_id, reason)| json!({ "event_id": event_id, "reason": reason }))
            .collect();
        Self::to_json(&json!({ "receipts": batch.receipts, "failures": failures }))
    }

    pub fn format_observations(observations: &[Observation]) -> String {
        if observations.is_empty() {
            return format!("{}\n", "No observations.".dimmed());
        }
        let mut output = String::new();
        for observation in observations {
            output.push_str(&Self::format_observation(observation));
        }
        output
    }

    pub fn format_observation(observation: &Observation) -> String {
        let status = match observation.status {
            council_domain::ObservationStatus::Active => observation.status.as_str().green(),
            council_domain::ObservationStatus::Deprecated => observation.status.as_str().red(),
            _ => observation.status.as_str().yellow(),
        };
        format!(
            "{} [{}] {} ({})\n  {}\n  evidence {} (+{} / -{}), confidence {:.2}, tags: {}\n",
            observation.id.bold(),
            status,
            observation.persona_id,
            observation.confidence_level(),
            observation.pattern,
            observation.evidence_count,
            observation.validations,
            observation.invalidations,
            observation.confidence,
            observation.tags.join(", "),
        )
    }

    // ==================== Teams & Personas ====================

    pub fn format_teams(teams: &[EntityProfile]) -> String {
        if teams.is_empty() {
            return format!("{}\n", "No teams yet.".dimmed());
        }
        let mut output = String::new();
        for team in teams {
            output.push_str(&format!("{} {}\n", team.canonical_name.bold(), team.id.dimmed()));
            output.push_str(&Self::indent(team.history_summary().trim_end(), "  "));
            output.push('\n');
        }
        output
    }

    /// Format the proposal after a team confirmation
    pub fn format_team_confirmation(proposal: &Proposal) -> String {
        match &proposal.team_match {
            Some(team_match) if team_match.created_profile => format!(
                "{} {} linked to new team {}\n",
                "v".green(),
                proposal.id,
                team_match.profile_id.as_deref().unwrap_or("-")
            ),
            Some(team_match) => format!(
                "{} {} linked to team {}\n",
                "v".green(),
                proposal.id,
                team_match.profile_id.as_deref().unwrap_or("-")
            ),
            None => format!("{} {} has no team match\n", "x".red(), proposal.id),
        }
    }

    pub fn format_personas(personas: &[PersonaConfig]) -> String {
        let mut output = String::new();
        for persona in personas {
            output.push_str(&format!(
                "{} {} ({})\n  {}\n",
                persona.id.bold(),
                persona.name,
                persona.model.dimmed(),
                persona.description
            ));
            if !persona.focus_areas.is_empty() {
                output.push_str(&format!("  focus: {}\n", persona.focus_areas.join(", ")));
            }
        }
        output
    }

    // ==================== Helpers ====================

    /// Pretty-print any serializable value
    pub fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }

    fn status(status: DecisionStatus) -> String {
        match status {
            DecisionStatus::AutoApproved | DecisionStatus::HumanApproved => {
                status.as_str().green().bold().to_string()
            }
            DecisionStatus::AutoRejected | DecisionStatus::HumanRejected => {
                status.as_str().red().bold().to_string()
            }
            DecisionStatus::Pending | DecisionStatus::NeedsReview => {
                status.as_str().yellow().bold().to_string()
            }
        }
    }

    fn amount(amount: f64) -> String {
        let whole = format!("{:.0}", amount.abs());
        let mut grouped = String::new();
        for (i, c) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        if amount < 0.0 {
            format!("-{}", grouped)
        } else {
            grouped
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_domain::{CandidatePattern, LearningTrigger, Outcome, OutcomeResult};

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_amount_grouping() {
        assert_eq!(ConsoleFormatter::amount(75000.0), "75,000");
        assert_eq!(ConsoleFormatter::amount(999.0), "999");
        assert_eq!(ConsoleFormatter::amount(1234567.4), "1,234,567");
        assert_eq!(ConsoleFormatter::amount(-1500.0), "-1,500");
    }

    #[test]
    fn test_indent() {
        assert_eq!(ConsoleFormatter::indent("a\nb", "  "), "  a\n  b");
    }

    #[test]
    fn test_observation_line() {
        plain();
        let candidate = CandidatePattern {
            pattern: "Large asks need milestone payouts".to_string(),
            context: "requests above 50k".to_string(),
            tags: vec!["large_grant".to_string()],
        };
        let observation = Observation::new_draft("budget", &candidate, "p-1", "e-1");
        let text = ConsoleFormatter::format_observation(&observation);
        assert!(text.contains("[draft] budget"));
        assert!(text.contains("Large asks need milestone payouts"));
        assert!(text.contains("evidence 1 (+1 / -0)"));
        assert!(text.contains("tags: large_grant"));
    }

    #[test]
    fn test_empty_listings() {
        plain();
        assert_eq!(ConsoleFormatter::format_teams(&[]), "No teams yet.\n");
        assert_eq!(ConsoleFormatter::format_observations(&[]), "No observations.\n");
        assert_eq!(
            ConsoleFormatter::format_learning_batch(&LearningBatch::default()),
            "No pending learning events.\n"
        );
    }

    #[test]
    fn test_learning_batch_reports_failures() {
        plain();
        let event = LearningEvent::new(
            "p-1",
            LearningTrigger::Outcome {
                outcome: Outcome::new(OutcomeResult::Failure),
            },
        );
        let mut receipt = LearningReceipt::new(&event);
        receipt.reflections = 3;
        receipt.created = vec!["o-1".to_string()];
        receipt.failures = vec!["technical: timeout".to_string()];
        let batch = LearningBatch {
            receipts: vec![receipt],
            failures: vec![("e-2".to_string(), "store unavailable".to_string())],
        };

        let text = ConsoleFormatter::format_learning_batch(&batch);
        assert!(text.contains("(3 reflection(s)): 1 created, 0 reinforced, 0 contradicted"));
        assert!(text.contains("x technical: timeout"));
        assert!(text.contains("x event e-2: store unavailable"));
        assert!(text.contains("1 event(s) processed, 1 observation(s) touched, 1 failed"));

        let json: serde_json::Value =
            serde_json::from_str(&ConsoleFormatter::format_learning_batch_json(&batch)).unwrap();
        assert_eq!(json["failures"][0]["event_id"], "e-2");
        assert_eq!(json["receipts"][0]["reflections"], 3);
    }

    #[test]
    fn test_personas_listing() {
        plain();
        let text = ConsoleFormatter::format_personas(&PersonaConfig::default_panel());
        assert!(!text.is_empty());
        for persona in PersonaConfig::default_panel() {
            assert!(text.contains(&persona.id));
        }
    }
}
