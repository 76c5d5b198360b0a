//! Skill definition and parsing
//!
//! Each skill is a folder containing SKILL.md with YAML frontmatter

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::error::DocumentError;
use crate::resolver::{RootOrigin, SkillRoot};

/// File name of the primary document inside a skill directory (case-sensitive)
pub const SKILL_FILE: &str = "SKILL.md";
/// Version reported when the header carries none
pub const UNSPECIFIED_VERSION: &str = "unspecified";
/// Maximum recommended name length
const MAX_NAME_LENGTH: usize = 64;
/// Maximum recommended description length
const MAX_DESCRIPTION_LENGTH: usize = 1024;

/// Header fields parsed from a SKILL.md frontmatter block
#[derive(Debug, Clone, PartialEq)]
pub struct SkillHeader {
    /// Normalized skill name
    pub name: String,
    /// Free text description
    pub description: String,
    /// Declared version or [`UNSPECIFIED_VERSION`]
    pub version: String,
    /// Declared license, if any
    pub license: Option<String>,
    /// Every other header key
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A parsed SKILL.md: header plus the untouched body text
#[derive(Debug, Clone, PartialEq)]
pub struct SkillDocument {
    /// Parsed frontmatter
    pub header: SkillHeader,
    /// Everything after the closing delimiter
    pub body: String,
}

impl SkillDocument {
    /// Parse a whole SKILL.md file
    pub fn parse(content: &str) -> Result<Self, DocumentError> {
        let (yaml, body) = split_front_matter(content)?;
        let header = parse_header(yaml)?;
        validate_header(&header);

        Ok(Self {
            header,
            body: body.to_string(),
        })
    }
}

/// Registry record for one discovered skill
///
/// Only metadata lives here; the body is re-read on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMetadata {
    /// Normalized skill name, unique within a registry
    pub name: String,
    /// Free text description
    pub description: String,
    /// Declared version or [`UNSPECIFIED_VERSION`]
    pub version: String,
    /// Declared license, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Every other header key
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
    /// Absolute path of the skill directory
    pub directory: PathBuf,
    /// Root directory the skill was discovered in
    pub source: PathBuf,
    /// Which configuration layer contributed the root
    pub origin: RootOrigin,
}

impl SkillMetadata {
    /// Attach location information to a parsed header
    pub fn new(header: SkillHeader, directory: PathBuf, root: &SkillRoot) -> Self {
        Self {
            name: header.name,
            description: header.description,
            version: header.version,
            license: header.license,
            extra: header.extra,
            directory,
            source: root.path.clone(),
            origin: root.origin,
        }
    }

    /// Path of the primary document
    pub fn document_path(&self) -> PathBuf {
        self.directory.join(SKILL_FILE)
    }

    /// Generate a concise summary line
    /// Format: "- {name}: {description}"
    pub fn to_summary(&self) -> String {
        format!("- {}: {}", self.name, self.description)
    }
}

/// Normalize a skill name to lowercase-with-hyphens
///
/// Runs of whitespace and underscores collapse to a single hyphen.
pub fn normalize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for ch in raw.trim().chars() {
        if ch.is_whitespace() || ch == '_' {
            pending_separator = true;
            continue;
        }
        if pending_separator && !out.is_empty() {
            out.push('-');
        }
        pending_separator = false;
        out.extend(ch.to_lowercase());
    }

    out
}

/// Split a document into its YAML header and body
///
/// The body is returned byte-for-byte as it follows the closing delimiter line.
pub fn split_front_matter(content: &str) -> Result<(&str, &str), DocumentError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let frontmatter_re = Regex::new(r"^---[ \t]*\r?\n([\s\S]*?)\r?\n---[ \t]*(?:\r?\n|$)")?;

    let captures = frontmatter_re
        .captures(content)
        .ok_or(DocumentError::MissingFrontMatter)?;

    let yaml = captures
        .get(1)
        .ok_or(DocumentError::MissingFrontMatter)?
        .as_str();
    let end = captures
        .get(0)
        .ok_or(DocumentError::MissingFrontMatter)?
        .end();

    Ok((yaml, &content[end..]))
}

fn take_required(mapping: &mut Mapping, key: &'static str) -> Result<String, DocumentError> {
    match mapping.remove(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(DocumentError::MissingField(key)),
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Source text of a top-level plain scalar, so `1.10` is not read back as `1.1`
fn raw_scalar(yaml: &str, key: &str) -> Option<String> {
    let pattern = format!(
        r"(?m)^{}[ \t]*:[ \t]*([^\s#][^#\r\n]*?)[ \t]*(?:#.*)?\r?$",
        regex::escape(key)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(yaml)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn parse_header(yaml: &str) -> Result<SkillHeader, DocumentError> {
    let mut mapping: Mapping = serde_yaml::from_str(yaml)?;

    let name = normalize_name(&take_required(&mut mapping, "name")?);
    if name.is_empty() {
        return Err(DocumentError::MissingField("name"));
    }
    let description = take_required(&mut mapping, "description")?;

    let declared = match mapping.remove("version") {
        Some(Value::Number(n)) => {
            Some(raw_scalar(yaml, "version").unwrap_or_else(|| n.to_string()))
        }
        other => other.and_then(scalar_to_string),
    };
    let version = declared
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| UNSPECIFIED_VERSION.to_string());

    let license = mapping
        .remove("license")
        .and_then(scalar_to_string)
        .filter(|l| !l.trim().is_empty());

    let mut extra = BTreeMap::new();
    for (key, value) in mapping {
        let key = match key {
            Value::String(s) => s,
            other => match scalar_to_string(other) {
                Some(s) => s,
                None => continue,
            },
        };
        match serde_json::to_value(&value) {
            Ok(json) => {
                extra.insert(key, json);
            }
            Err(e) => debug!("Dropping frontmatter key '{}': {}", key, e),
        }
    }

    Ok(SkillHeader {
        name,
        description,
        version,
        license,
        extra,
    })
}

/// Check naming conventions; violations are logged, not rejected
fn validate_header(header: &SkillHeader) {
    if header.name.len() > MAX_NAME_LENGTH {
        warn!(
            "Skill name '{}' exceeds {} characters (was {})",
            header.name,
            MAX_NAME_LENGTH,
            header.name.len()
        );
    }

    let conventional = Regex::new(r"^[a-z0-9-]+$")
        .map(|re| re.is_match(&header.name))
        .unwrap_or(true);
    if !conventional {
        warn!(
            "Skill name '{}' should contain only lowercase letters, numbers, and hyphens",
            header.name
        );
    }

    if header.description.len() > MAX_DESCRIPTION_LENGTH {
        warn!(
            "Skill '{}' description exceeds {} characters (was {})",
            header.name,
            MAX_DESCRIPTION_LENGTH,
            header.description.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skill_content() {
        let content = r#"---
name: code-reviewer
description: Reviews code for best practices and security. Use when reviewing or analyzing code.
---

# Code Reviewer

This skill helps review code.
"#;

        let doc = SkillDocument::parse(content).unwrap();
        assert_eq!(doc.header.name, "code-reviewer");
        assert_eq!(
            doc.header.description,
            "Reviews code for best practices and security. Use when reviewing or analyzing code."
        );
        assert_eq!(doc.header.version, UNSPECIFIED_VERSION);
        assert!(doc.header.license.is_none());
        assert_eq!(doc.body, "\n# Code Reviewer\n\nThis skill helps review code.\n");
    }

    #[test]
    fn test_body_is_preserved_verbatim() {
        let content = "---\nname: \"sample-skill\"\ndescription: \"does X\"\n---\n# Sample\nBody.";
        let doc = SkillDocument::parse(content).unwrap();
        assert_eq!(doc.body, "# Sample\nBody.");
    }

    #[test]
    fn test_optional_and_extra_fields() {
        let content = "---\nname: test-skill\ndescription: Test skill\nversion: 2.1\nlicense: MIT\nauthor: jane\ntags: [a, b]\n---\n# Test";
        let doc = SkillDocument::parse(content).unwrap();

        assert_eq!(doc.header.version, "2.1");
        assert_eq!(doc.header.license.as_deref(), Some("MIT"));
        assert_eq!(doc.header.extra["author"], serde_json::json!("jane"));
        assert_eq!(doc.header.extra["tags"], serde_json::json!(["a", "b"]));
        assert!(!doc.header.extra.contains_key("name"));
    }

    #[test]
    fn test_numeric_version_keeps_source_text() {
        let parse = |version: &str| {
            let content = format!("---\nname: v\ndescription: Versioned\nversion: {version}\n---\n");
            SkillDocument::parse(&content).unwrap().header.version
        };

        assert_eq!(parse("1.10"), "1.10");
        assert_eq!(parse("2.0 # stable"), "2.0");
        assert_eq!(parse("3"), "3");
        assert_eq!(parse("\"1.10\""), "1.10");

        let crlf = "---\r\nname: v\r\ndescription: Versioned\r\nversion: 1.20\r\n---\r\n";
        assert_eq!(SkillDocument::parse(crlf).unwrap().header.version, "1.20");
    }

    #[test]
    fn test_crlf_and_header_at_end_of_file() {
        let crlf = "---\r\nname: win\r\ndescription: Windows file\r\n---\r\nBody\r\n";
        assert_eq!(SkillDocument::parse(crlf).unwrap().body, "Body\r\n");

        let no_body = "---\nname: bare\ndescription: Header only\n---";
        assert_eq!(SkillDocument::parse(no_body).unwrap().body, "");
    }

    #[test]
    fn test_missing_required_fields() {
        let no_description = "---\nname: half\n---\nBody";
        assert!(matches!(
            SkillDocument::parse(no_description),
            Err(DocumentError::MissingField("description"))
        ));

        let empty_name = "---\nname: \"  \"\ndescription: x\n---\n";
        assert!(matches!(
            SkillDocument::parse(empty_name),
            Err(DocumentError::MissingField("name"))
        ));

        let numeric_name = "---\nname: 42\ndescription: x\n---\n";
        assert!(SkillDocument::parse(numeric_name).is_err());
    }

    #[test]
    fn test_malformed_header() {
        assert!(matches!(
            SkillDocument::parse("# Just markdown\n"),
            Err(DocumentError::MissingFrontMatter)
        ));
        assert!(matches!(
            SkillDocument::parse("---\nname: [unclosed\n---\n"),
            Err(DocumentError::Yaml(_))
        ));
        assert!(SkillDocument::parse("---\n- a list\n---\n").is_err());
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Python Standards"), "python-standards");
        assert_eq!(normalize_name("  design__patterns "), "design-patterns");
        assert_eq!(normalize_name("already-fine"), "already-fine");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn test_header_name_is_normalized() {
        let doc = SkillDocument::parse("---\nname: My_Skill\ndescription: d\n---\n").unwrap();
        assert_eq!(doc.header.name, "my-skill");
    }
}
