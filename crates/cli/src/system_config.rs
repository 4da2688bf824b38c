//! User-level configuration file
//!
//! Lives at `$ANYBAKUP_CONFIG_DIR/config.toml`, falling back to the platform
//! config directory (`~/.config/anybakup/config.toml` on Linux). A missing
//! file means defaults.

use ab_core::config::{DEFAULT_AUTHOR_EMAIL, DEFAULT_AUTHOR_NAME};
use ab_core::{Author, StoreConfig, StoreRoot};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Overrides the directory holding `config.toml`
pub const CONFIG_DIR_ENV: &str = "ANYBAKUP_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Profile used when none is named on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default)]
    pub author: AuthorConfig,

    #[serde(default)]
    pub profile: BTreeMap<String, Profile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorConfig {
    #[serde(default = "default_author_name")]
    pub name: String,
    #[serde(default = "default_author_email")]
    pub email: String,
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            name: default_author_name(),
            email: default_author_email(),
        }
    }
}

fn default_author_name() -> String {
    DEFAULT_AUTHOR_NAME.to_string()
}

fn default_author_email() -> String {
    DEFAULT_AUTHOR_EMAIL.to_string()
}

/// A named store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub repodir: PathBuf,
}

impl SystemConfig {
    pub fn validate(&self) -> Result<()> {
        if self.author.name.trim().is_empty() {
            bail!("author.name must not be empty");
        }
        for (name, profile) in &self.profile {
            if !profile.repodir.is_absolute() {
                bail!(
                    "profile.{}.repodir must be an absolute path (got {})",
                    name,
                    profile.repodir.display()
                );
            }
        }
        if let Some(default) = &self.default {
            if !self.profile.is_empty() && !self.profile.contains_key(default) {
                bail!("default profile '{}' is not defined", default);
            }
        }
        Ok(())
    }

    /// Register (or move) a profile and make it the default
    pub fn set_profile(&mut self, name: &str, repodir: impl Into<PathBuf>) {
        self.profile.insert(
            name.to_string(),
            Profile {
                repodir: repodir.into(),
            },
        );
        self.default = Some(name.to_string());
    }

    /// Name of the profile a command should use
    pub fn profile_name<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .or(self.default.as_deref())
            .unwrap_or(DEFAULT_PROFILE)
    }

    pub fn author(&self) -> Author {
        Author::new(&self.author.name, &self.author.email)
    }

    /// Store configuration for `profile` (or the default profile)
    pub fn store_config(&self, profile: Option<&str>) -> Result<StoreConfig> {
        let name = self.profile_name(profile);
        let Some(entry) = self.profile.get(name) else {
            if self.profile.is_empty() {
                bail!("No backup store configured. Run 'abk init <dir>' first.");
            }
            bail!(
                "Unknown profile '{}'. Known profiles: {}",
                name,
                self.profile.keys().cloned().collect::<Vec<_>>().join(", ")
            );
        };
        let root = StoreRoot::new(&entry.repodir)
            .with_context(|| format!("Invalid repodir for profile '{}'", name))?;
        Ok(StoreConfig::new(root, self.author()))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: SystemConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }
}

/// Directory holding the config file
pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|dir| dir.join("anybakup"))
        .context("Could not determine the user config directory")
}

pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

pub fn load() -> Result<SystemConfig> {
    SystemConfig::load_from(&config_file_path()?)
}

pub fn save(config: &SystemConfig) -> Result<()> {
    config.save_to(&config_file_path()?)
}

/// Write the defaults if no config file exists yet; `true` if one was created
pub fn init_if_missing() -> Result<bool> {
    let path = config_file_path()?;
    if path.exists() {
        return Ok(false);
    }
    SystemConfig::default().save_to(&path)?;
    Ok(true)
}

pub fn example_config() -> &'static str {
    r#"# anybakup configuration
# Location: $ANYBAKUP_CONFIG_DIR/config.toml or ~/.config/anybakup/config.toml

# Profile used when --profile is not given
default = "default"

# Identity recorded on every backup commit
[author]
name = "anybakup"
email = "anybakup@localhost"

# One section per backup store
[profile.default]
repodir = "/srv/backup"

[profile.photos]
repodir = "/mnt/external/photo-backup"
"#
}
