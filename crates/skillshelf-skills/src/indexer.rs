//! Skill discovery
//!
//! Walks every root one level deep, parses each candidate's SKILL.md and
//! merges the results. Roots arrive highest precedence first, so the first
//! skill registered under a name is the one that wins.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::fs::{EntryKind, FsEntry, SkillFs};
use crate::registry::{IndexDiagnostic, SkillRegistry};
use crate::resolver::SkillRoot;
use crate::skill::{SkillDocument, SkillMetadata, SKILL_FILE};

/// Builds [`SkillRegistry`] snapshots from a root list
#[derive(Debug, Clone)]
pub struct SkillIndexer {
    fs: Arc<dyn SkillFs>,
}

impl SkillIndexer {
    /// Create an indexer reading through `fs`
    pub fn new(fs: Arc<dyn SkillFs>) -> Self {
        Self { fs }
    }

    /// Scan all roots and produce a complete snapshot
    ///
    /// Never fails: unreadable roots and invalid candidates become
    /// diagnostics on the returned snapshot.
    pub fn build(&self, roots: Vec<SkillRoot>, generation: u64) -> SkillRegistry {
        info!("Starting skills discovery in {} directories", roots.len());

        let mut skills: BTreeMap<String, SkillMetadata> = BTreeMap::new();
        let mut diagnostics = Vec::new();

        for root in &roots {
            self.scan_root(root, &mut skills, &mut diagnostics);
        }

        info!(
            "Discovered {} skills ({} diagnostics)",
            skills.len(),
            diagnostics.len()
        );

        SkillRegistry::new(skills, roots, diagnostics, generation)
    }

    /// Scan a single root directory for skills
    fn scan_root(
        &self,
        root: &SkillRoot,
        skills: &mut BTreeMap<String, SkillMetadata>,
        diagnostics: &mut Vec<IndexDiagnostic>,
    ) {
        if !self.fs.is_dir(&root.path) {
            debug!("Skills directory does not exist: {:?}", root.path);
            diagnostics.push(IndexDiagnostic::RootMissing {
                root: root.path.clone(),
            });
            return;
        }

        let mut entries = match self.fs.read_dir(&root.path) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Failed to read skills directory {:?}: {}", root.path, e);
                diagnostics.push(IndexDiagnostic::Skipped {
                    path: root.path.clone(),
                    reason: format!("failed to read directory: {e}"),
                });
                return;
            }
        };
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        for entry in entries.iter().filter(|e| self.is_candidate(e)) {
            match self.load_candidate(&entry.path, root) {
                Ok(skill) => match skills.entry(skill.name.clone()) {
                    Entry::Vacant(slot) => {
                        debug!("Discovered skill: {} at {:?}", skill.name, skill.directory);
                        slot.insert(skill);
                    }
                    Entry::Occupied(existing) => {
                        debug!(
                            "Skill '{}' at {:?} shadowed by {:?}",
                            skill.name,
                            skill.directory,
                            existing.get().directory
                        );
                        diagnostics.push(IndexDiagnostic::Shadowed {
                            name: skill.name,
                            kept: existing.get().directory.clone(),
                            shadowed: skill.directory,
                        });
                    }
                },
                Err(reason) => {
                    debug!("Skipping {:?}: {}", entry.path, reason);
                    diagnostics.push(IndexDiagnostic::Skipped {
                        path: entry.path.clone(),
                        reason,
                    });
                }
            }
        }
    }

    /// Immediate, visible subdirectories (or links to directories)
    fn is_candidate(&self, entry: &FsEntry) -> bool {
        if entry.is_hidden() {
            return false;
        }
        match entry.kind {
            EntryKind::Dir => true,
            EntryKind::Symlink => self.fs.is_dir(&entry.path),
            EntryKind::File | EntryKind::Other => false,
        }
    }

    /// Read and parse one candidate's metadata
    fn load_candidate(&self, dir: &Path, root: &SkillRoot) -> Result<SkillMetadata, String> {
        let skill_file = dir.join(SKILL_FILE);

        if !self.fs.is_file(&skill_file) {
            return Err(format!("{SKILL_FILE} not found"));
        }

        let content = self
            .fs
            .read_to_string(&skill_file)
            .map_err(|e| format!("failed to read {SKILL_FILE}: {e}"))?;

        let document = SkillDocument::parse(&content).map_err(|e| e.to_string())?;

        Ok(SkillMetadata::new(
            document.header,
            self.fs.canonicalize(dir),
            root,
        ))
    }
}
