//! list / search / info / load over a registry snapshot

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{Result, SkillError};
use crate::loader::ContentLoader;
use crate::registry::SkillRegistry;
use crate::skill::{normalize_name, SkillMetadata};

/// Maximum names offered in a not-found message
const MAX_SUGGESTIONS: usize = 3;
/// Registries this small list every name when nothing is close
const LIST_ALL_BELOW: usize = 10;

// ============================================================================
// Requests
// ============================================================================

/// One registry query; exactly one operation per request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum SkillRequest {
    /// Every skill, name and description only
    List,
    /// Skills matching a term
    Search {
        /// Case-insensitive search term
        term: String,
    },
    /// Metadata of one skill
    Info {
        /// Skill name
        name: String,
    },
    /// Full content of one skill
    Load {
        /// Skill name
        name: String,
    },
}

impl SkillRequest {
    /// Operation name
    pub fn operation(&self) -> &'static str {
        match self {
            SkillRequest::List => "list",
            SkillRequest::Search { .. } => "search",
            SkillRequest::Info { .. } => "info",
            SkillRequest::Load { .. } => "load",
        }
    }
}

/// Raw selector fields as a host tool call supplies them
///
/// Converting into [`SkillRequest`] enforces that exactly one selector is
/// present; supplying several is rejected as ambiguous. `skill_name` counts
/// as a selector of its own, so it cannot be combined with `load`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SkillSelectors {
    /// `true` selects list
    #[serde(default)]
    pub list: bool,
    /// Search term
    #[serde(default)]
    pub search: Option<String>,
    /// Skill to describe
    #[serde(default)]
    pub info: Option<String>,
    /// Skill to load
    #[serde(default)]
    pub load: Option<String>,
    /// Older spelling of `load`
    #[serde(default)]
    pub skill_name: Option<String>,
}

impl TryFrom<SkillSelectors> for SkillRequest {
    type Error = SkillError;

    fn try_from(selectors: SkillSelectors) -> Result<Self> {
        let mut supplied = Vec::new();
        if selectors.list {
            supplied.push("list");
        }
        if selectors.search.is_some() {
            supplied.push("search");
        }
        if selectors.info.is_some() {
            supplied.push("info");
        }
        if selectors.load.is_some() {
            supplied.push("load");
        }
        if selectors.skill_name.is_some() {
            supplied.push("skill_name");
        }

        if supplied.len() > 1 {
            return Err(SkillError::AmbiguousRequest { selectors: supplied });
        }

        match selectors {
            SkillSelectors { list: true, .. } => Ok(SkillRequest::List),
            SkillSelectors {
                search: Some(term), ..
            } => Ok(SkillRequest::Search { term }),
            SkillSelectors {
                info: Some(name), ..
            } => Ok(SkillRequest::Info { name }),
            SkillSelectors {
                load: Some(name), ..
            }
            | SkillSelectors {
                skill_name: Some(name),
                ..
            } => Ok(SkillRequest::Load { name }),
            _ => Err(SkillError::EmptyRequest),
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Name and description only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSummary {
    /// Skill name
    pub name: String,
    /// Skill description
    pub description: String,
}

impl From<&SkillMetadata> for SkillSummary {
    fn from(skill: &SkillMetadata) -> Self {
        Self {
            name: skill.name.clone(),
            description: skill.description.clone(),
        }
    }
}

/// Full content of a skill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedSkill {
    /// Skill name
    pub name: String,
    /// Skill description
    pub description: String,
    /// Declared version or "unspecified"
    pub version: String,
    /// Declared license
    pub license: Option<String>,
    /// Skill directory; reference files are relative to it
    pub directory: PathBuf,
    /// Root the skill was discovered in
    pub source: PathBuf,
    /// SKILL.md body after the header, unmodified
    pub content: String,
    /// Companion files, relative and sorted
    pub reference_files: Vec<PathBuf>,
}

/// Answer to a [`SkillRequest`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum SkillResponse {
    /// Answer to [`SkillRequest::List`]
    List {
        /// Every skill, ascending by name
        skills: Vec<SkillSummary>,
    },
    /// Answer to [`SkillRequest::Search`]
    Search {
        /// Term as requested
        term: String,
        /// Matches, most relevant first
        matches: Vec<SkillSummary>,
    },
    /// Answer to [`SkillRequest::Info`]
    Info(SkillMetadata),
    /// Answer to [`SkillRequest::Load`]
    Load(LoadedSkill),
}

// ============================================================================
// Matching
// ============================================================================

/// How a skill matched a search term; earlier variants rank higher
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    /// Term is the skill name
    ExactName,
    /// Term appears in the name
    Name,
    /// Term appears in the description
    Description,
    /// Term appears in an extra header value
    Metadata,
    /// Every word of the term appears somewhere
    Keywords,
}

fn metadata_text(skill: &SkillMetadata) -> String {
    skill
        .extra
        .values()
        .map(|v| match v {
            serde_json::Value::String(s) => s.to_lowercase(),
            other => other.to_string().to_lowercase(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Match one skill against a lowercased term
fn match_skill(skill: &SkillMetadata, term: &str, keywords: &[&str]) -> Option<MatchKind> {
    let name = skill.name.to_lowercase();
    let description = skill.description.to_lowercase();

    if name == term || name == normalize_name(term) {
        return Some(MatchKind::ExactName);
    }
    if name.contains(term) {
        return Some(MatchKind::Name);
    }
    if description.contains(term) {
        return Some(MatchKind::Description);
    }

    let metadata = metadata_text(skill);
    if metadata.contains(term) {
        return Some(MatchKind::Metadata);
    }

    if keywords.len() > 1 {
        let all_present = keywords.iter().all(|k| {
            name.contains(k) || description.contains(k) || metadata.contains(k)
        });
        if all_present {
            return Some(MatchKind::Keywords);
        }
    }

    None
}

/// Levenshtein distance over chars
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut current = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        previous = current;
    }

    previous[b.len()]
}

// ============================================================================
// Engine
// ============================================================================

/// Answers requests against a snapshot
#[derive(Debug, Clone)]
pub struct QueryEngine {
    loader: ContentLoader,
}

impl QueryEngine {
    /// Create an engine that loads content through `loader`
    pub fn new(loader: ContentLoader) -> Self {
        Self { loader }
    }

    /// Dispatch one request
    pub fn execute(&self, registry: &SkillRegistry, request: &SkillRequest) -> Result<SkillResponse> {
        match request {
            SkillRequest::List => Ok(SkillResponse::List {
                skills: self.list(registry),
            }),
            SkillRequest::Search { term } => Ok(SkillResponse::Search {
                term: term.clone(),
                matches: self.search(registry, term),
            }),
            SkillRequest::Info { name } => self.info(registry, name).map(SkillResponse::Info),
            SkillRequest::Load { name } => self.load(registry, name).map(SkillResponse::Load),
        }
    }

    /// Every skill, ascending by name
    pub fn list(&self, registry: &SkillRegistry) -> Vec<SkillSummary> {
        registry.iter().map(SkillSummary::from).collect()
    }

    /// Case-insensitive match on name, description and extra metadata
    ///
    /// Name matches rank above description matches; ties go by name.
    pub fn search(&self, registry: &SkillRegistry, term: &str) -> Vec<SkillSummary> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }
        let keywords: Vec<&str> = term.split_whitespace().collect();

        let mut matches: Vec<(MatchKind, &SkillMetadata)> = registry
            .iter()
            .filter_map(|skill| match_skill(skill, &term, &keywords).map(|kind| (kind, skill)))
            .collect();
        matches.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.name.cmp(&b.1.name)));

        debug!("Skill search '{}' found {} results", term, matches.len());

        matches
            .into_iter()
            .map(|(_, skill)| SkillSummary::from(skill))
            .collect()
    }

    /// Metadata for one skill, without touching its files
    pub fn info(&self, registry: &SkillRegistry, name: &str) -> Result<SkillMetadata> {
        registry
            .get(name)
            .cloned()
            .ok_or_else(|| self.not_found(registry, name))
    }

    /// Body and reference listing for one skill
    pub fn load(&self, registry: &SkillRegistry, name: &str) -> Result<LoadedSkill> {
        let skill = registry
            .get(name)
            .ok_or_else(|| self.not_found(registry, name))?;

        let content = self.loader.load(skill)?;
        info!("Loaded skill: {} ({} bytes)", skill.name, content.body.len());

        Ok(LoadedSkill {
            name: skill.name.clone(),
            description: skill.description.clone(),
            version: skill.version.clone(),
            license: skill.license.clone(),
            directory: skill.directory.clone(),
            source: skill.source.clone(),
            content: content.body,
            reference_files: content.reference_files,
        })
    }

    /// Closest registered names to `name`, best first
    pub fn suggest(&self, registry: &SkillRegistry, name: &str) -> Vec<String> {
        fn push(candidate: &str, out: &mut Vec<String>) {
            if out.len() < MAX_SUGGESTIONS && !out.iter().any(|s| s == candidate) {
                out.push(candidate.to_string());
            }
        }

        let wanted = normalize_name(name);
        let mut suggestions: Vec<String> = Vec::new();

        let mut close: Vec<(usize, &String)> = registry
            .names()
            .map(|n| (edit_distance(&wanted, n), n))
            .filter(|(d, _)| *d <= 2)
            .collect();
        close.sort();
        for (_, n) in close {
            push(n, &mut suggestions);
        }

        for hit in self.search(registry, name) {
            push(&hit.name, &mut suggestions);
        }

        for token in wanted.split('-').filter(|t| t.len() >= 3) {
            for n in registry.names().filter(|n| n.contains(token)) {
                push(n, &mut suggestions);
            }
        }

        if suggestions.is_empty() && registry.len() <= LIST_ALL_BELOW {
            suggestions = registry.names().cloned().collect();
        }

        suggestions
    }

    fn not_found(&self, registry: &SkillRegistry, name: &str) -> SkillError {
        SkillError::NotFound {
            name: name.to_string(),
            suggestions: self.suggest(registry, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use crate::indexer::SkillIndexer;
    use crate::resolver::{RootOrigin, SkillRoot};
    use std::sync::Arc;

    fn fixture() -> (Arc<MemoryFs>, SkillRegistry, QueryEngine) {
        let fs = Arc::new(MemoryFs::new());
        fs.add_file(
            "/skills/python-standards/SKILL.md",
            "---\nname: python-standards\ndescription: Coding guidelines for Python\nversion: 1.0.0\nlicense: MIT\n---\n# Python\n",
        )
        .add_file(
            "/skills/design-patterns/SKILL.md",
            "---\nname: design-patterns\ndescription: Architectural patterns incl. python examples\ncategory: architecture\n---\n# Patterns\n",
        )
        .add_file(
            "/skills/sample-skill/SKILL.md",
            "---\nname: \"sample-skill\"\ndescription: \"does X\"\n---\n# Sample\nBody.",
        );

        let roots = vec![SkillRoot {
            path: PathBuf::from("/skills"),
            rank: 0,
            origin: RootOrigin::Explicit,
        }];
        let registry = SkillIndexer::new(fs.clone()).build(roots, 1);
        let engine = QueryEngine::new(ContentLoader::new(fs.clone()));
        (fs, registry, engine)
    }

    #[test]
    fn test_list_is_sorted() {
        let (_, registry, engine) = fixture();
        let names: Vec<_> = engine.list(&registry).into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["design-patterns", "python-standards", "sample-skill"]);
    }

    #[test]
    fn test_search_ranks_name_above_description() {
        let (_, registry, engine) = fixture();
        let names: Vec<_> = engine
            .search(&registry, "PYTHON")
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["python-standards", "design-patterns"]);
    }

    #[test]
    fn test_search_metadata_and_keywords() {
        let (_, registry, engine) = fixture();
        assert_eq!(engine.search(&registry, "architecture")[0].name, "design-patterns");

        let keyword_hits = engine.search(&registry, "guidelines python");
        assert_eq!(keyword_hits.len(), 1);
        assert_eq!(keyword_hits[0].name, "python-standards");
    }

    #[test]
    fn test_search_empty_or_unmatched() {
        let (_, registry, engine) = fixture();
        assert!(engine.search(&registry, "").is_empty());
        assert!(engine.search(&registry, "   ").is_empty());
        assert!(engine.search(&registry, "kubernetes").is_empty());
    }

    #[test]
    fn test_search_is_subset_of_list() {
        let (_, registry, engine) = fixture();
        let listed = engine.list(&registry);
        for term in ["python", "s", "x", "patterns"] {
            for hit in engine.search(&registry, term) {
                assert!(listed.contains(&hit));
            }
        }
    }

    #[test]
    fn test_info_defaults_and_lookup() {
        let (_, registry, engine) = fixture();
        let info = engine.info(&registry, "sample-skill").unwrap();
        assert_eq!(info.version, "unspecified");
        assert_eq!(info.directory, PathBuf::from("/skills/sample-skill"));

        let python = engine.info(&registry, "python-standards").unwrap();
        assert_eq!(python.version, "1.0.0");
        assert_eq!(python.license.as_deref(), Some("MIT"));

        for listed in engine.list(&registry) {
            assert!(engine.info(&registry, &listed.name).is_ok());
        }
    }

    #[test]
    fn test_not_found_suggests_close_names() {
        let (_, registry, engine) = fixture();
        match engine.info(&registry, "pyton-standards") {
            Err(SkillError::NotFound { suggestions, .. }) => {
                assert_eq!(suggestions[0], "python-standards");
            }
            other => panic!("expected not found, got {other:?}"),
        }
        assert!(matches!(
            engine.load(&registry, "nothing-like-it"),
            Err(SkillError::NotFound { .. })
        ));
    }

    #[test]
    fn test_load_round_trip() {
        let (_, registry, engine) = fixture();
        let loaded = engine.load(&registry, "sample-skill").unwrap();
        assert_eq!(loaded.content, "# Sample\nBody.");
        assert!(loaded.reference_files.is_empty());
        assert_eq!(loaded.version, "unspecified");
        assert_eq!(loaded, engine.load(&registry, "sample-skill").unwrap());
    }

    #[test]
    fn test_load_vanished_is_unavailable_not_not_found() {
        let (fs, registry, engine) = fixture();
        fs.remove("/skills/sample-skill");

        assert!(matches!(
            engine.load(&registry, "sample-skill"),
            Err(SkillError::Unavailable { .. })
        ));
        assert!(engine.info(&registry, "sample-skill").is_ok());
    }

    #[test]
    fn test_selectors_exclusivity() {
        let ambiguous = SkillSelectors {
            search: Some("x".into()),
            info: Some("y".into()),
            ..Default::default()
        };
        assert!(matches!(
            SkillRequest::try_from(ambiguous),
            Err(SkillError::AmbiguousRequest { selectors }) if selectors == vec!["search", "info"]
        ));

        assert!(matches!(
            SkillRequest::try_from(SkillSelectors::default()),
            Err(SkillError::EmptyRequest)
        ));

        let list = SkillSelectors {
            list: true,
            ..Default::default()
        };
        assert_eq!(SkillRequest::try_from(list).unwrap(), SkillRequest::List);

        let load: SkillSelectors =
            serde_json::from_value(serde_json::json!({"skill_name": "sample-skill"})).unwrap();
        assert_eq!(
            SkillRequest::try_from(load).unwrap(),
            SkillRequest::Load {
                name: "sample-skill".into()
            }
        );

        let both: SkillSelectors =
            serde_json::from_value(serde_json::json!({"load": "a", "skill_name": "b"})).unwrap();
        assert!(matches!(
            SkillRequest::try_from(both),
            Err(SkillError::AmbiguousRequest { selectors }) if selectors == vec!["load", "skill_name"]
        ));
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
    }
}
