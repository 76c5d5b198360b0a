use anyhow::{Context, Result};
use serde::Deserialize;
use skillshelf_logging::LogFormat;
use skillshelf_skills::resolver::expand_tilde;
use skillshelf_tool::config::DirList;
use std::path::{Path, PathBuf};

/// Directory holding settings files, under the home directory or the workspace
const SETTINGS_DIR: &str = ".skillshelf";

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct SkillsSection {
    #[serde(default)]
    dirs: Option<DirList>,
}

/// Shape of a single settings file, as far as skills are concerned
#[derive(Debug, Deserialize, Default)]
struct SettingsLayer {
    #[serde(default)]
    skills: SkillsSection,
}

/// Merged view of every settings source
#[derive(Debug, Deserialize, Default)]
struct MergedSettings {
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub logging: LoggingConfig,
    /// `skills.dirs` of each settings file that sets it, most specific first
    pub skill_layers: Vec<Vec<PathBuf>>,
}

impl Settings {
    /// Settings files in merge order, least specific first:
    /// 1. Global: ~/.skillshelf/settings.toml
    /// 2. Project: ./.skillshelf/settings.toml
    /// 3. Local: ./.skillshelf/settings.local.toml
    fn files(cwd: &Path, home: Option<&Path>) -> Vec<PathBuf> {
        let mut files = Vec::with_capacity(3);
        if let Some(home) = home {
            files.push(home.join(SETTINGS_DIR).join("settings.toml"));
        }
        files.push(cwd.join(SETTINGS_DIR).join("settings.toml"));
        files.push(cwd.join(SETTINGS_DIR).join("settings.local.toml"));
        files
    }

    /// Load settings for a workspace rooted at `cwd`
    pub fn load(cwd: &Path) -> Result<Self> {
        // Load .env file from current directory
        dotenvy::dotenv().ok();
        Self::load_from(cwd, dirs::home_dir().as_deref())
    }

    pub fn load_from(cwd: &Path, home: Option<&Path>) -> Result<Self> {
        let files = Self::files(cwd, home);

        let mut skill_layers = Vec::new();
        for path in files.iter().rev().filter(|p| p.is_file()) {
            let dirs = read_skill_dirs(path, cwd, home)?;
            if !dirs.is_empty() {
                skill_layers.push(dirs);
            }
        }

        // Later sources override earlier ones
        let builder = files.iter().fold(config::Config::builder(), |builder, path| {
            builder.add_source(config::File::from(path.clone()).required(false))
        });
        let merged: MergedSettings = builder
            .add_source(config::Environment::with_prefix("SKILLSHELF").separator("__"))
            .build()
            .context("Failed to load settings")?
            .try_deserialize()
            .context("Invalid settings")?;

        Ok(Self {
            logging: merged.logging,
            skill_layers,
        })
    }
}

/// `skills.dirs` from one file; relative entries resolve against `cwd`
fn read_skill_dirs(path: &Path, cwd: &Path, home: Option<&Path>) -> Result<Vec<PathBuf>> {
    let layer: SettingsLayer = config::Config::builder()
        .add_source(config::File::from(path.to_path_buf()))
        .build()
        .and_then(|c| c.try_deserialize())
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;

    let dirs = match layer.skills.dirs {
        Some(DirList::One(dir)) => vec![dir],
        Some(DirList::Many(dirs)) => dirs,
        None => Vec::new(),
    };

    Ok(dirs
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .map(|d| cwd.join(expand_tilde(d, home)))
        .collect())
}
