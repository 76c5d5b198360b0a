use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Events published by the skill registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum SkillEvent {
    /// A registry snapshot was built and installed
    #[serde(rename = "skills:discovered")]
    SkillsDiscovered {
        skill_count: usize,
        skill_names: Vec<String>,
        sources: Vec<PathBuf>,
        at: DateTime<Utc>,
    },

    /// Full skill content was handed to a caller
    #[serde(rename = "skill:loaded")]
    SkillLoaded {
        skill_name: String,
        source: PathBuf,
        content_length: usize,
        version: String,
        at: DateTime<Utc>,
    },
}

impl SkillEvent {
    /// Name under which discovery events are published
    pub const DISCOVERED: &'static str = "skills:discovered";

    /// Name under which load events are published
    pub const LOADED: &'static str = "skill:loaded";

    /// Every event name this crate can emit
    pub const NAMES: [&'static str; 2] = [Self::DISCOVERED, Self::LOADED];

    /// Event name of this instance
    pub fn name(&self) -> &'static str {
        match self {
            SkillEvent::SkillsDiscovered { .. } => Self::DISCOVERED,
            SkillEvent::SkillLoaded { .. } => Self::LOADED,
        }
    }

    pub fn discovered(skill_names: Vec<String>, sources: Vec<PathBuf>) -> Self {
        SkillEvent::SkillsDiscovered {
            skill_count: skill_names.len(),
            skill_names,
            sources,
            at: Utc::now(),
        }
    }

    pub fn loaded(
        skill_name: impl Into<String>,
        source: impl Into<PathBuf>,
        content_length: usize,
        version: impl Into<String>,
    ) -> Self {
        SkillEvent::SkillLoaded {
            skill_name: skill_name.into(),
            source: source.into(),
            content_length,
            version: version.into(),
            at: Utc::now(),
        }
    }
}
