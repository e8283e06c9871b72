//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into the application's
//! [`CouncilConfig`] once at start-up.

mod deliberation;
mod personas;
mod runtime;
mod thresholds;

pub use deliberation::FileDeliberationConfig;
pub use personas::FilePersonaConfig;
pub use council_domain::OutputFormat as FileOutputFormat;
pub use runtime::{FileBackendConfig, FileLoggingConfig, FileOutputConfig, FileStorageConfig};
pub use thresholds::{FileLearningConfig, FileMatchingConfig, FileRoutingConfig};

use council_application::CouncilConfig;
use council_domain::ConfigIssue;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Auto-execution thresholds
    pub routing: FileRoutingConfig,
    /// Stage-3 trigger and round count
    pub deliberation: FileDeliberationConfig,
    /// Team matching thresholds
    pub matching: FileMatchingConfig,
    /// Observation lifecycle and prompt context sizes
    pub learning: FileLearningConfig,
    /// Text-generation backend
    pub backend: FileBackendConfig,
    /// Record store location
    pub storage: FileStorageConfig,
    /// Optional log and transcript files
    pub logging: FileLoggingConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// Persona overrides, matched to the default panel by id
    pub personas: Vec<FilePersonaConfig>,
    /// Override of the Stage-1 parser target
    pub parser: Option<FilePersonaConfig>,
}

impl FileConfig {
    /// Build the council configuration, collecting conversion issues.
    ///
    /// Conversion never fails: unreadable values fall back to their
    /// defaults and are reported as issues.
    pub fn to_council_config(&self) -> (CouncilConfig, Vec<ConfigIssue>) {
        let mut issues = Vec::new();

        let (deliberation, deliberation_issues) = self.deliberation.to_policy();
        issues.extend(deliberation_issues);

        let (personas, persona_issues) = personas::apply_overrides(&self.personas);
        issues.extend(persona_issues);

        let mut config = CouncilConfig::default()
            .with_personas(personas)
            .with_routing(self.routing.to_thresholds())
            .with_deliberation(deliberation)
            .with_request_timeout(Duration::from_secs(self.backend.request_timeout_secs));
        config.matching = self.matching.to_thresholds();
        config.learning = self.learning.to_policy();
        config.similar_proposal_limit = self.learning.similar_proposals;
        if let Some(parser) = &self.parser {
            config.parser = parser.apply_to(config.parser.clone());
        }

        (config, issues)
    }

    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Covers conversion issues (unknown enum spellings, unknown persona
    /// ids) plus everything [`CouncilConfig::validate`] checks.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let (config, mut issues) = self.to_council_config();
        issues.extend(config.validate());
        issues
    }
}
