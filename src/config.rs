//! Tool configuration: home directory resolution plus the alias map and
//! default-target settings that completion side effects write into.
//!
//! Layout under the tool directory:
//!
//! ```text
//! <config dir>/sandctl/
//! ├── config.json           # aliases + default target
//! └── sandbox-process.json  # resume cache (see crate::cache)
//! ```

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment override for the tool directory, used by tests and CI.
pub const CONFIG_DIR_ENV: &str = "SANDCTL_CONFIG_DIR";

/// Directory name under the platform config dir.
pub const TOOL_DIR: &str = "sandctl";

const CONFIG_FILE: &str = "config.json";

/// Resolve the tool directory: env override first, then the platform
/// config dir.
pub fn tool_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|d| d.join(TOOL_DIR))
        .ok_or_else(|| anyhow!("Could not determine a config directory; set {CONFIG_DIR_ENV}"))
}

/// Persistent tool settings. Aliases map short names to org usernames;
/// the default target is the username commands fall back to when no
/// `--target-org` is given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default)]
    aliases: HashMap<String, String>,
    #[serde(default)]
    default_target: Option<String>,
}

impl ToolConfig {
    /// Load from the tool directory; a missing file yields the defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to read config file: {}", path.display()))
            }
        }
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        let path = dir.join(CONFIG_FILE);
        let text = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, text)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    pub fn set_alias(&mut self, alias: &str, username: &str) {
        self.aliases.insert(alias.to_string(), username.to_string());
    }

    pub fn alias_for(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    pub fn set_default_target(&mut self, username: &str) {
        self.default_target = Some(username.to_string());
    }

    pub fn default_target(&self) -> Option<&str> {
        self.default_target.as_deref()
    }
}

/// Completion side effects applied after a confirmed terminal success.
///
/// Both are best-effort and non-transactional: the orchestrator reports a
/// failed step as a warning and still applies the remaining steps.
pub trait CompletionEffects {
    fn set_alias(&mut self, alias: &str, username: &str) -> Result<()>;
    fn set_default_target(&mut self, username: &str) -> Result<()>;
}

/// The config-file-backed implementation used by the binary.
pub struct ConfigEffects {
    dir: PathBuf,
}

impl ConfigEffects {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl CompletionEffects for ConfigEffects {
    fn set_alias(&mut self, alias: &str, username: &str) -> Result<()> {
        let mut config = ToolConfig::load(&self.dir)?;
        config.set_alias(alias, username);
        config.save(&self.dir)
    }

    fn set_default_target(&mut self, username: &str) -> Result<()> {
        let mut config = ToolConfig::load(&self.dir)?;
        config.set_default_target(username);
        config.save(&self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_missing_config_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = ToolConfig::load(dir.path()).unwrap();
        assert_eq!(config, ToolConfig::default());
    }

    #[test]
    fn save_and_load_round_trips() {
        let dir = tempdir().unwrap();
        let mut config = ToolConfig::default();
        config.set_alias("dev", "admin@example.com.dev1");
        config.set_default_target("admin@example.com.dev1");
        config.save(dir.path()).unwrap();

        let loaded = ToolConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.alias_for("dev"), Some("admin@example.com.dev1"));
        assert_eq!(loaded.default_target(), Some("admin@example.com.dev1"));
    }

    #[test]
    fn load_fails_on_corrupt_config() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "not json").unwrap();
        let err = ToolConfig::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn config_effects_write_through_to_disk() {
        let dir = tempdir().unwrap();
        let mut effects = ConfigEffects::new(dir.path().to_path_buf());
        effects.set_alias("qa", "admin@example.com.qa").unwrap();
        effects
            .set_default_target("admin@example.com.qa")
            .unwrap();

        let loaded = ToolConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.alias_for("qa"), Some("admin@example.com.qa"));
        assert_eq!(loaded.default_target(), Some("admin@example.com.qa"));
    }
}
