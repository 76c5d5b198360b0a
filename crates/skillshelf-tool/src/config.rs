//! Tool module configuration

use serde::Deserialize;
use skillshelf_skills::resolver::expand_tilde;
use skillshelf_skills::{DefaultLocations, SkillSources};
use std::path::PathBuf;

/// One directory or a list of them
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DirList {
    /// A single directory
    One(String),
    /// Directories in precedence order
    Many(Vec<String>),
}

impl DirList {
    fn into_vec(self) -> Vec<String> {
        match self {
            DirList::One(dir) => vec![dir],
            DirList::Many(dirs) => dirs,
        }
    }
}

/// Configuration handed to the tool when it is mounted
///
/// `skills_dirs` (string or list) takes priority over `skills_dir`. Either
/// one becomes the explicit override, which replaces settings and defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ToolConfig {
    /// Override directories, string or list
    #[serde(default)]
    pub skills_dirs: Option<DirList>,
    /// Single override directory, used when `skills_dirs` is absent
    #[serde(default)]
    pub skills_dir: Option<String>,
}

impl ToolConfig {
    /// Explicit override directories, `~` expanded
    pub fn explicit_dirs(&self) -> Vec<PathBuf> {
        let raw = match (&self.skills_dirs, &self.skills_dir) {
            (Some(dirs), _) => dirs.clone().into_vec(),
            (None, Some(dir)) => vec![dir.clone()],
            (None, None) => Vec::new(),
        };

        let home = dirs::home_dir();
        raw.iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .map(|d| expand_tilde(d, home.as_deref()))
            .collect()
    }

    /// Sources for the registry: this override over the given layers and defaults
    pub fn sources(
        &self,
        settings_layers: Vec<Vec<PathBuf>>,
        defaults: DefaultLocations,
    ) -> SkillSources {
        let sources = self
            .explicit_dirs()
            .into_iter()
            .fold(SkillSources::new(), SkillSources::add_explicit);

        settings_layers
            .into_iter()
            .fold(sources, SkillSources::add_settings_layer)
            .with_defaults(defaults)
    }
}
