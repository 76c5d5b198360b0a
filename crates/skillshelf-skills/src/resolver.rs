//! Skill root precedence
//!
//! Turns the layered directory configuration into one ordered,
//! deduplicated list of roots. Highest precedence comes first.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::fs::SkillFs;

/// Environment variable naming an extra, lowest-precedence skills directory
pub const SKILLS_DIR_ENV: &str = "SKILLSHELF_SKILLS_DIR";
/// Skills directory relative to a workspace or home directory
pub const DEFAULT_SKILLS_SUBDIR: &str = ".skillshelf/skills";

/// Which configuration layer contributed a root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootOrigin {
    /// Per-invocation override
    Explicit,
    /// Settings file layer
    Settings {
        /// Layer index, 0 being the most specific
        layer: usize,
    },
    /// `<workspace>/.skillshelf/skills`
    Workspace,
    /// `~/.skillshelf/skills`
    User,
    /// `$SKILLSHELF_SKILLS_DIR`
    Environment,
}

/// A directory scanned for skills, with its precedence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRoot {
    /// Directory as configured
    pub path: PathBuf,
    /// Position in the resolved list; lower wins on name collisions
    pub rank: usize,
    /// Layer that contributed the directory
    pub origin: RootOrigin,
}

/// Built-in fallback directories
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultLocations {
    /// `<workspace>/.skillshelf/skills`
    pub workspace: Option<PathBuf>,
    /// `~/.skillshelf/skills`
    pub user: Option<PathBuf>,
    /// Directory named by [`SKILLS_DIR_ENV`]
    pub environment: Option<PathBuf>,
}

impl DefaultLocations {
    /// Detect defaults for a workspace rooted at `cwd`
    pub fn detect(cwd: &Path) -> Self {
        let user = dirs::home_dir().map(|home| home.join(DEFAULT_SKILLS_SUBDIR));
        if user.is_none() {
            warn!("Could not find home directory for personal skills");
        }

        let environment = std::env::var(SKILLS_DIR_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| expand_tilde(v.trim(), dirs::home_dir().as_deref()));

        Self {
            workspace: Some(cwd.join(DEFAULT_SKILLS_SUBDIR)),
            user,
            environment,
        }
    }

    /// Defaults in precedence order
    fn ordered(&self) -> impl Iterator<Item = (PathBuf, RootOrigin)> + '_ {
        [
            (self.workspace.as_ref(), RootOrigin::Workspace),
            (self.user.as_ref(), RootOrigin::User),
            (self.environment.as_ref(), RootOrigin::Environment),
        ]
        .into_iter()
        .filter_map(|(path, origin)| path.map(|p| (p.clone(), origin)))
    }
}

/// All directory configuration feeding one registry build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillSources {
    /// Per-invocation override; when non-empty nothing else is consulted
    pub explicit: Vec<PathBuf>,
    /// Settings layers, most specific first
    pub settings_layers: Vec<Vec<PathBuf>>,
    /// Built-in fallbacks, consulted after every settings layer
    pub defaults: DefaultLocations,
}

impl SkillSources {
    /// Create empty sources
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an explicit override directory
    pub fn add_explicit(mut self, dir: impl Into<PathBuf>) -> Self {
        self.explicit.push(dir.into());
        self
    }

    /// Append a settings layer less specific than the ones already added
    pub fn add_settings_layer(mut self, dirs: Vec<PathBuf>) -> Self {
        self.settings_layers.push(dirs);
        self
    }

    /// Set the built-in defaults
    pub fn with_defaults(mut self, defaults: DefaultLocations) -> Self {
        self.defaults = defaults;
        self
    }

    /// Resolve into ordered, deduplicated roots
    pub fn resolve(&self, fs: &dyn SkillFs) -> Vec<SkillRoot> {
        resolve_roots(self, fs)
    }
}

/// Compute the ordered root list
///
/// A non-empty explicit list replaces settings and defaults entirely.
/// Duplicates are detected on canonical paths; the first occurrence wins.
/// Missing directories are kept.
pub fn resolve_roots(sources: &SkillSources, fs: &dyn SkillFs) -> Vec<SkillRoot> {
    let candidates: Vec<(PathBuf, RootOrigin)> = if !sources.explicit.is_empty() {
        sources
            .explicit
            .iter()
            .map(|p| (p.clone(), RootOrigin::Explicit))
            .collect()
    } else {
        sources
            .settings_layers
            .iter()
            .enumerate()
            .flat_map(|(layer, dirs)| {
                dirs.iter()
                    .map(move |p| (p.clone(), RootOrigin::Settings { layer }))
            })
            .chain(sources.defaults.ordered())
            .collect()
    };

    let mut seen = HashSet::new();
    let mut roots = Vec::with_capacity(candidates.len());

    for (path, origin) in candidates {
        let key = fs.canonicalize(&path);
        if !seen.insert(key) {
            debug!("Dropping duplicate skills directory {:?} ({:?})", path, origin);
            continue;
        }
        roots.push(SkillRoot {
            rank: roots.len(),
            path,
            origin,
        });
    }

    roots
}

/// Expand a leading `~` against `home`
pub fn expand_tilde(raw: &str, home: Option<&Path>) -> PathBuf {
    match (raw, home) {
        ("~", Some(home)) => home.to_path_buf(),
        (_, Some(home)) if raw.starts_with("~/") => home.join(&raw[2..]),
        _ => PathBuf::from(raw),
    }
}
