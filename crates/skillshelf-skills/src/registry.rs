//! Skills registry snapshot
//!
//! A [`SkillRegistry`] is an immutable picture of every discovered skill at
//! one point in time. Rebuilds produce a fresh snapshot; nothing mutates an
//! existing one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::resolver::SkillRoot;
use crate::skill::{normalize_name, SkillMetadata};

/// Non-fatal notes collected while indexing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexDiagnostic {
    /// A configured root does not exist or is not a directory
    RootMissing {
        /// Root as configured
        root: PathBuf,
    },
    /// A candidate directory was not a valid skill
    Skipped {
        /// Candidate or root that was skipped
        path: PathBuf,
        /// Why it was skipped
        reason: String,
    },
    /// A lower-precedence skill lost a name collision
    Shadowed {
        /// Contested name
        name: String,
        /// Directory of the skill that won
        kept: PathBuf,
        /// Directory of the skill that was dropped
        shadowed: PathBuf,
    },
}

/// Immutable skill index: name to metadata
#[derive(Debug, Clone)]
pub struct SkillRegistry {
    skills: BTreeMap<String, SkillMetadata>,
    roots: Vec<SkillRoot>,
    diagnostics: Vec<IndexDiagnostic>,
    generation: u64,
    built_at: DateTime<Utc>,
}

impl SkillRegistry {
    /// Snapshot with no roots and no skills
    pub fn empty() -> Self {
        Self::new(BTreeMap::new(), Vec::new(), Vec::new(), 0)
    }

    pub(crate) fn new(
        skills: BTreeMap<String, SkillMetadata>,
        roots: Vec<SkillRoot>,
        diagnostics: Vec<IndexDiagnostic>,
        generation: u64,
    ) -> Self {
        Self {
            skills,
            roots,
            diagnostics,
            generation,
            built_at: Utc::now(),
        }
    }

    /// Get a skill by name; the name is normalized first
    pub fn get(&self, name: &str) -> Option<&SkillMetadata> {
        self.skills
            .get(name)
            .or_else(|| self.skills.get(&normalize_name(name)))
    }

    /// Whether a skill with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All skills in ascending name order
    pub fn iter(&self) -> impl Iterator<Item = &SkillMetadata> {
        self.skills.values()
    }

    /// All skill names in ascending order
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.skills.keys()
    }

    /// Get number of skills
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Roots this snapshot was built from, highest precedence first
    pub fn roots(&self) -> &[SkillRoot] {
        &self.roots
    }

    /// Root paths, highest precedence first
    pub fn sources(&self) -> Vec<PathBuf> {
        self.roots.iter().map(|r| r.path.clone()).collect()
    }

    /// Diagnostics recorded during the build
    pub fn diagnostics(&self) -> &[IndexDiagnostic] {
        &self.diagnostics
    }

    /// Shadow events only
    pub fn shadowed(&self) -> impl Iterator<Item = &IndexDiagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, IndexDiagnostic::Shadowed { .. }))
    }

    /// Build counter; later builds have larger values
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the snapshot was built
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Generate skills list for an LLM system prompt
    /// Format:
    /// Available skills (call load_skill to read one):
    /// - skill-name: Description of what this skill does and when to use it
    pub fn generate_system_prompt(&self) -> String {
        if self.skills.is_empty() {
            return String::new();
        }

        let mut prompt =
            String::from("\n\nAvailable skills (call load_skill with load=\"<name>\" to read one):\n");

        for skill in self.skills.values() {
            prompt.push_str(&skill.to_summary());
            prompt.push('\n');
        }

        prompt
    }
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::RootOrigin;

    fn meta(name: &str) -> SkillMetadata {
        SkillMetadata {
            name: name.to_string(),
            description: format!("{name} description"),
            version: "unspecified".to_string(),
            license: None,
            extra: BTreeMap::new(),
            directory: PathBuf::from(format!("/skills/{name}")),
            source: PathBuf::from("/skills"),
            origin: RootOrigin::Explicit,
        }
    }

    #[test]
    fn test_registry_empty() {
        let registry = SkillRegistry::empty();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.generation(), 0);
        assert!(registry.generate_system_prompt().is_empty());
    }

    #[test]
    fn test_lookup_normalizes_name() {
        let mut skills = BTreeMap::new();
        skills.insert("design-patterns".to_string(), meta("design-patterns"));
        let registry = SkillRegistry::new(skills, Vec::new(), Vec::new(), 1);

        assert!(registry.contains("design-patterns"));
        assert!(registry.contains("Design Patterns"));
        assert!(!registry.contains("design"));
    }

    #[test]
    fn test_system_prompt_sorted_by_name() {
        let mut skills = BTreeMap::new();
        skills.insert("zeta".to_string(), meta("zeta"));
        skills.insert("alpha".to_string(), meta("alpha"));
        let registry = SkillRegistry::new(skills, Vec::new(), Vec::new(), 1);

        let prompt = registry.generate_system_prompt();
        let alpha = prompt.find("- alpha:").unwrap();
        let zeta = prompt.find("- zeta:").unwrap();
        assert!(alpha < zeta);
    }
}
