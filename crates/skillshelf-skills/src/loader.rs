//! On-demand skill content
//!
//! The registry keeps metadata only. Full bodies and the list of companion
//! files are read here, every time they are asked for.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Result, SkillError};
use crate::fs::{EntryKind, SkillFs};
use crate::skill::{split_front_matter, SkillMetadata, SKILL_FILE};

/// Deepest directory level listed below a skill directory
pub const MAX_REFERENCE_DEPTH: usize = 8;

/// Body and companion file listing for one skill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillContent {
    /// SKILL.md text after the frontmatter, unmodified
    pub body: String,
    /// Files under the skill directory other than SKILL.md, relative and sorted
    pub reference_files: Vec<PathBuf>,
}

/// Stateless reader for skill bodies and reference listings
#[derive(Debug, Clone)]
pub struct ContentLoader {
    fs: Arc<dyn SkillFs>,
}

impl ContentLoader {
    /// Create a loader reading through `fs`
    pub fn new(fs: Arc<dyn SkillFs>) -> Self {
        Self { fs }
    }

    /// Read the body and list reference files
    pub fn load(&self, skill: &SkillMetadata) -> Result<SkillContent> {
        let body = self.read_body(skill)?;
        let reference_files = self.reference_files(skill)?;
        Ok(SkillContent {
            body,
            reference_files,
        })
    }

    /// Re-read SKILL.md and return the text after its header
    pub fn read_body(&self, skill: &SkillMetadata) -> Result<String> {
        if !self.fs.is_dir(&skill.directory) {
            return Err(unavailable(skill, "skill directory no longer exists"));
        }

        let skill_file = skill.document_path();
        if !self.fs.is_file(&skill_file) {
            return Err(unavailable(skill, format!("{SKILL_FILE} no longer exists")));
        }

        let content = self
            .fs
            .read_to_string(&skill_file)
            .map_err(|e| unavailable(skill, format!("failed to read {SKILL_FILE}: {e}")))?;

        let (_, body) = split_front_matter(&content).map_err(|e| {
            unavailable(skill, format!("{SKILL_FILE} no longer has a valid header: {e}"))
        })?;

        Ok(body.to_string())
    }

    /// List every file below the skill directory except the top-level SKILL.md
    ///
    /// Contents are never read. Hidden entries and symlinked directories are
    /// not descended into; listing stops at [`MAX_REFERENCE_DEPTH`].
    pub fn reference_files(&self, skill: &SkillMetadata) -> Result<Vec<PathBuf>> {
        let top = self.fs.read_dir(&skill.directory).map_err(|e| {
            unavailable(skill, format!("failed to list skill directory: {e}"))
        })?;

        let mut files = Vec::new();
        let mut pending = vec![(PathBuf::new(), top, 1usize)];

        while let Some((relative_dir, entries, depth)) = pending.pop() {
            for entry in entries {
                if entry.is_hidden() {
                    continue;
                }
                let relative = relative_dir.join(&entry.name);
                if relative.as_path() == Path::new(SKILL_FILE) {
                    continue;
                }

                match entry.kind {
                    EntryKind::File => files.push(relative),
                    EntryKind::Symlink => {
                        if self.fs.is_file(&entry.path) {
                            files.push(relative);
                        } else {
                            debug!("Not following symlink {:?}", entry.path);
                        }
                    }
                    EntryKind::Dir => {
                        if depth >= MAX_REFERENCE_DEPTH {
                            warn!(
                                "Skill '{}': not listing below {:?} (depth limit {})",
                                skill.name, relative, MAX_REFERENCE_DEPTH
                            );
                            continue;
                        }
                        match self.fs.read_dir(&entry.path) {
                            Ok(children) => pending.push((relative, children, depth + 1)),
                            Err(e) => warn!("Skill '{}': cannot list {:?}: {}", skill.name, entry.path, e),
                        }
                    }
                    EntryKind::Other => {}
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

fn unavailable(skill: &SkillMetadata, reason: impl Into<String>) -> SkillError {
    SkillError::Unavailable {
        name: skill.name.clone(),
        directory: skill.directory.clone(),
        reason: reason.into(),
    }
}
