//! Reviewer personas
//!
//! A persona is data, not code: every reviewer runs through the same
//! evaluation routine and differs only in its [`PersonaConfig`] (name,
//! prompts, focus areas and text-generation target). The default panel has
//! four personas; deployments can override any field or replace the list.

use serde::{Deserialize, Serialize};

/// Configuration of one reviewer persona (Value Object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Stable identifier (e.g., "technical")
    pub id: String,
    /// Display name (e.g., "Technical Reviewer")
    pub name: String,
    /// Text-generation target (e.g., "anthropic/claude-sonnet-4.5")
    pub model: String,
    /// One-line description of the persona's perspective
    #[serde(default)]
    pub description: String,
    /// Standing instructions that define the persona's character
    #[serde(default)]
    pub system_prompt: String,
    /// What to assess in each proposal
    #[serde(default)]
    pub evaluation_instructions: String,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    /// Per-call timeout override in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl PersonaConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            model: model.into(),
            description: String::new(),
            system_prompt: String::new(),
            evaluation_instructions: String::new(),
            focus_areas: Vec::new(),
            timeout_secs: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.evaluation_instructions = instructions.into();
        self
    }

    pub fn with_focus_areas(mut self, areas: &[&str]) -> Self {
        self.focus_areas = areas.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// The four default reviewers
    pub fn default_panel() -> Vec<PersonaConfig> {
        vec![
            Self::technical(),
            Self::ecosystem(),
            Self::budget(),
            Self::impact(),
        ]
    }

    /// Target used for Stage-1 structured extraction
    pub fn default_parser() -> PersonaConfig {
        PersonaConfig::new("parser", "Application Parser", "openai/gpt-4o-mini")
            .with_description("Extracts structured fields from free-text applications")
            .with_system_prompt(
                "You convert grant applications into structured JSON. \
                 Copy facts exactly as stated, never invent values, and use null \
                 for anything the application does not say.",
            )
    }

    pub fn technical() -> PersonaConfig {
        PersonaConfig::new("technical", "Technical Reviewer", "anthropic/claude-sonnet-4.5")
            .with_description("Skeptical engineer judging feasibility and execution risk")
            .with_focus_areas(&[
                "Technical feasibility",
                "Team capability",
                "Timeline realism",
                "Technical specificity",
                "Prior work",
            ])
            .with_system_prompt(
                "You review grant proposals as a seasoned engineer. Experience has taught \
                 you that ambitious proposals often under-deliver, so you reward concrete \
                 technical detail, working prototypes and incremental milestones, and you \
                 treat vague architecture or buzzwords as warning signs. Your core question: \
                 can this team build what it describes, on the stated schedule, with the \
                 requested resources?",
            )
            .with_instructions(
                "Judge the proposal on technical grounds: whether the approach is achievable, \
                 whether the team has shown it can deliver similar work, whether the \
                 milestones fit the scope, and whether the description is specific enough \
                 to be credible.",
            )
    }

    pub fn ecosystem() -> PersonaConfig {
        PersonaConfig::new("ecosystem", "Ecosystem Strategist", "openai/gpt-4o")
            .with_description("Strategist judging program fit and ecosystem need")
            .with_focus_areas(&[
                "Program fit",
                "Ecosystem need",
                "Duplication risk",
                "Synergy potential",
                "Adoption path",
            ])
            .with_system_prompt(
                "You review grant proposals for strategic fit. You keep track of what the \
                 ecosystem lacks, what has already been funded and where projects could \
                 reinforce each other. Copycat projects and solutions in search of a problem \
                 do not impress you. Your core question: does funding this make strategic \
                 sense right now?",
            )
            .with_instructions(
                "Judge how well the proposal matches current program priorities, whether it \
                 fills a real gap without duplicating funded work, how it could complement \
                 other initiatives, and whether it has a believable path to adoption.",
            )
    }

    pub fn budget() -> PersonaConfig {
        PersonaConfig::new("budget", "Budget Analyst", "google/gemini-2.0-flash")
            .with_description("Analyst judging budget reasonableness and funding structure")
            .with_focus_areas(&[
                "Amount reasonableness",
                "Budget breakdown",
                "Market rates",
                "Milestone funding structure",
                "Value for money",
            ])
            .with_system_prompt(
                "You review grant budgets. Having read many of them, you can tell padded \
                 budgets from unsustainably lean ones, and you look for line items that are \
                 justified, rates close to market, and payments tied to verifiable \
                 milestones. Front-loaded funding and budgets that do not match the scope \
                 concern you. Your core question: is this a fair price for the work, \
                 structured so incentives stay aligned?",
            )
            .with_instructions(
                "Judge whether the requested amount fits the scope, whether each budget \
                 line is justified, how costs compare to market rates, and whether funding \
                 is released against verifiable milestones.",
            )
    }

    pub fn impact() -> PersonaConfig {
        PersonaConfig::new("impact", "Impact Assessor", "x-ai/grok-3-mini-beta")
            .with_description("Evaluator judging reach and lasting value")
            .with_focus_areas(&[
                "Potential reach",
                "Lasting value",
                "Counterfactual impact",
                "Measurability",
                "Scalability",
            ])
            .with_system_prompt(
                "You review grant proposals for their outcomes. You ask who benefits, for \
                 how long, and whether the work would happen without this grant. Impact \
                 claims you cannot measure, and benefits that end when the money does, earn \
                 little credit. Your core question: if this succeeds, how much durable \
                 value does it create?",
            )
            .with_instructions(
                "Judge the reach of the expected benefit, whether the value outlasts the \
                 grant, what would happen without funding, how success could be measured, \
                 and whether the impact can grow beyond the initial scope.",
            )
    }
}
