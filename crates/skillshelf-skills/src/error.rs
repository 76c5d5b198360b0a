//! Error types for skill queries

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to callers of the registry
///
/// Discovery problems never show up here; they are recorded as
/// [`crate::IndexDiagnostic`]s on the snapshot instead.
#[derive(Debug, Error)]
pub enum SkillError {
    /// No skill with this name is registered
    #[error("Skill '{name}' not found.{}", render_suggestions(.suggestions))]
    NotFound {
        /// Requested name
        name: String,
        /// Closest registered names, best first
        suggestions: Vec<String>,
    },

    /// Skill is registered but its files disappeared after indexing
    #[error("Skill '{name}' is unavailable: {reason} ({}). Refresh the registry and retry.", .directory.display())]
    Unavailable {
        /// Skill name
        name: String,
        /// Directory recorded at indexing time
        directory: PathBuf,
        /// What went wrong while reading it
        reason: String,
    },

    /// More than one of list/search/info/load was supplied
    #[error("Ambiguous request: supply exactly one of list, search, info or load (got {})", .selectors.join(", "))]
    AmbiguousRequest {
        /// Selectors present in the request
        selectors: Vec<&'static str>,
    },

    /// None of list/search/info/load was supplied
    #[error("Must provide one of list=true, search='term', info='name' or load='name'")]
    EmptyRequest,

    /// The indexing task failed to complete
    #[error("Registry rebuild failed: {0}")]
    Rebuild(String),

    /// The blocking task reading a skill's files failed to complete
    #[error("Loading skill '{name}' failed: {reason}")]
    LoadTask {
        /// Requested name
        name: String,
        /// Panic or cancellation reported by the runtime
        reason: String,
    },
}

fn render_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" Did you mean: {}?", suggestions.join(", "))
    }
}

/// Errors raised while parsing a skill document
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The file does not open with a `---` delimited header
    #[error("No valid YAML frontmatter found")]
    MissingFrontMatter,

    /// The header is not valid YAML or not a mapping
    #[error("Failed to parse YAML frontmatter: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A required key is missing, empty, or not a string
    #[error("Frontmatter field '{0}' is required and must be a non-empty string")]
    MissingField(&'static str),

    /// The frontmatter pattern failed to compile
    #[error("Failed to compile regex: {0}")]
    Regex(#[from] regex::Error),
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, SkillError>;
