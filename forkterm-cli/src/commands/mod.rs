pub mod detect;
pub mod launch;
pub mod registry;

use std::path::PathBuf;

use anyhow::{Context, Result};

use forkterm_core::{config, paths, ForkConfig, TaskRegistry};

/// Resolved root directory and configuration shared by every command.
#[derive(Debug, Clone)]
pub struct Env {
    pub root: PathBuf,
    pub config: ForkConfig,
}

impl Env {
    pub fn load() -> Result<Self> {
        let root = paths::default_root()
            .context("could not determine home directory; set $HOME or $FORKTERM_HOME")?;
        let config = config::load_at(&root)
            .with_context(|| format!("failed to load {}", paths::config_path(&root).display()))?;
        tracing::debug!(root = %root.display(), "forkterm root");
        Ok(Self { root, config })
    }

    pub fn registry(&self) -> TaskRegistry {
        TaskRegistry::at(&self.root).with_lock_timeout(self.config.lock_timeout())
    }
}
