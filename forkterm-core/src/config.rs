//! Optional user configuration, `<root>/config.yaml`.
//!
//! Every key is optional. A missing file yields [`ForkConfig::default`]; a
//! file that does not parse is a [`ConfigError::Parse`] carrying the path and
//! serde_yaml's line context.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths;

/// Model ids for the built-in Claude tiers.
pub const DEFAULT_TIERS: [(&str, &str); 3] = [
    ("haiku", "claude-3-5-haiku-20241022"),
    ("sonnet", "claude-sonnet-4-20250514"),
    ("opus", "claude-opus-4-20250514"),
];

pub const DEFAULT_TIER: &str = "sonnet";
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForkConfig {
    /// Tier label → model id passed to `claude --model`.
    pub tiers: BTreeMap<String, String>,
    pub default_tier: String,
    /// Strategy name (e.g. `"konsole"`) tried before the OS default order.
    pub preferred_terminal: Option<String>,
    /// Overrides `<root>/logs/forks`.
    pub log_dir: Option<PathBuf>,
    /// Leave the shell interactive after the forked command exits.
    pub keep_open: bool,
    pub lock_timeout_ms: u64,
}

impl Default for ForkConfig {
    fn default() -> Self {
        Self {
            tiers: DEFAULT_TIERS
                .iter()
                .map(|(tier, model)| (tier.to_string(), model.to_string()))
                .collect(),
            default_tier: DEFAULT_TIER.to_string(),
            preferred_terminal: None,
            log_dir: None,
            keep_open: true,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }
}

impl ForkConfig {
    /// Model id for `tier`, if the tier is mapped.
    pub fn model_for(&self, tier: &str) -> Option<&str> {
        self.tiers.get(tier).map(String::as_str)
    }

    pub fn logs_dir(&self, root: &Path) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| paths::logs_dir(root))
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// Load `<root>/config.yaml`, or defaults when it does not exist.
pub fn load_at(root: &Path) -> Result<ForkConfig, ConfigError> {
    let path = paths::config_path(root);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(ForkConfig::default());
        }
        Err(source) => return Err(ConfigError::Io { path, source }),
    };
    if contents.trim().is_empty() {
        return Ok(ForkConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<ForkConfig, ConfigError> {
    load_at(&paths::default_root().ok_or(ConfigError::HomeNotFound)?)
}
