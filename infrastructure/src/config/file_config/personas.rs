//! Persona overrides from TOML (`[[personas]]` and `[parser]`)
//!
//! Each `[[personas]]` entry is matched to the default panel by `id` and
//! overrides only the fields it sets. An entry with an unknown id joins
//! the panel when it names a `model`; otherwise it is reported and
//! ignored. `enabled = false` removes a persona from the panel.

use council_domain::{ConfigIssue, ConfigIssueCode, PersonaConfig};
use serde::{Deserialize, Serialize};

/// Raw persona override
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePersonaConfig {
    pub id: String,
    pub name: Option<String>,
    pub model: Option<String>,
    pub description: Option<String>,
    pub system_prompt: Option<String>,
    pub evaluation_instructions: Option<String>,
    pub focus_areas: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
    pub enabled: Option<bool>,
}

impl FilePersonaConfig {
    /// Overlay the fields this entry sets onto `persona`
    pub fn apply_to(&self, mut persona: PersonaConfig) -> PersonaConfig {
        if let Some(name) = &self.name {
            persona.name = name.clone();
        }
        if let Some(model) = &self.model {
            persona.model = model.clone();
        }
        if let Some(description) = &self.description {
            persona.description = description.clone();
        }
        if let Some(prompt) = &self.system_prompt {
            persona.system_prompt = prompt.clone();
        }
        if let Some(instructions) = &self.evaluation_instructions {
            persona.evaluation_instructions = instructions.clone();
        }
        if let Some(areas) = &self.focus_areas {
            persona.focus_areas = areas.clone();
        }
        if self.timeout_secs.is_some() {
            persona.timeout_secs = self.timeout_secs;
        }
        persona
    }

    fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// The default panel with `overrides` applied, in panel order followed by
/// added personas in file order
pub(super) fn apply_overrides(overrides: &[FilePersonaConfig]) -> (Vec<PersonaConfig>, Vec<ConfigIssue>) {
    let mut issues = Vec::new();
    let mut panel = PersonaConfig::default_panel();

    for entry in overrides {
        let id = entry.id.trim();
        if id.is_empty() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::UnknownPersona,
                "personas: entry without an id ignored",
            ));
            continue;
        }

        match panel.iter().position(|p| p.id == id) {
            Some(index) if !entry.is_enabled() => {
                panel.remove(index);
            }
            Some(index) => {
                panel[index] = entry.apply_to(panel[index].clone());
            }
            None if !entry.is_enabled() => {}
            None => match &entry.model {
                Some(model) => {
                    let name = entry.name.clone().unwrap_or_else(|| id.to_string());
                    panel.push(entry.apply_to(PersonaConfig::new(id, name, model.clone())));
                }
                None => issues.push(ConfigIssue::warning(
                    ConfigIssueCode::UnknownPersona,
                    format!(
                        "personas: '{}' is not a default persona and has no model; ignored",
                        id
                    ),
                )),
            },
        }
    }

    (panel, issues)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> FilePersonaConfig {
        FilePersonaConfig {
            id: id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_override_keeps_unset_fields() {
        let (panel, issues) = apply_overrides(&[FilePersonaConfig {
            model: Some("openai/gpt-4o".to_string()),
            ..entry("technical")
        }]);
        assert!(issues.is_empty());
        assert_eq!(panel.len(), 4);
        assert_eq!(panel[0].model, "openai/gpt-4o");
        assert_eq!(panel[0].system_prompt, PersonaConfig::technical().system_prompt);
    }

    #[test]
    fn test_disable_and_add() {
        let (panel, issues) = apply_overrides(&[
            FilePersonaConfig {
                enabled: Some(false),
                ..entry("impact")
            },
            FilePersonaConfig {
                model: Some("openai/gpt-4o".to_string()),
                name: Some("Legal Reviewer".to_string()),
                ..entry("legal")
            },
        ]);
        assert!(issues.is_empty());
        let ids: Vec<&str> = panel.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["technical", "ecosystem", "budget", "legal"]);
        assert_eq!(panel[3].name, "Legal Reviewer");
    }

    #[test]
    fn test_unknown_without_model_is_reported() {
        let (panel, issues) = apply_overrides(&[entry("legal"), entry("  ")]);
        assert_eq!(panel.len(), 4);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.code == ConfigIssueCode::UnknownPersona));
    }
}
