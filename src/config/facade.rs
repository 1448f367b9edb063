//! Single entry point for loading layered configuration.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::ForgeConfig;
use config::{ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, global file, workspace files, environment.
    pub fn load(workspace_root: &Path) -> Result<ForgeConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);
        let config: ForgeConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load an explicit file on top of defaults, then environment overrides.
    pub fn load_from_file(path: &Path) -> Result<ForgeConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true));
        let builder = environment::add_to_builder(builder);
        builder.build()?.try_deserialize()
    }

    /// Defaults only, ignoring every file and the environment.
    pub fn default() -> ForgeConfig {
        merge_policy::builder_with_defaults()
            .and_then(|b| b.build())
            .and_then(|c| c.try_deserialize())
            .unwrap_or_default()
    }

    pub fn xdg_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
