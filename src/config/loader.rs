//! ConfigLoader: layers config sources and deserializes to SyncConfig.

use super::{SyncConfig, WORKSPACE_CONFIG_FILE};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use std::path::{Path, PathBuf};

/// Configuration loader.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Global config file (`<config dir>/treesync/config.toml`), if the platform has one.
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "treesync", "treesync")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration for the project rooted at `workspace_root`.
    ///
    /// Precedence: global file (lowest) -> workspace file -> environment (highest).
    pub fn load(workspace_root: &Path) -> Result<SyncConfig, ConfigError> {
        let mut builder = Config::builder();
        if let Some(global) = Self::global_config_path() {
            builder = builder.add_source(File::from(global).format(FileFormat::Toml).required(false));
        }
        let builder = builder.add_source(
            File::from(workspace_root.join(WORKSPACE_CONFIG_FILE))
                .format(FileFormat::Toml)
                .required(false),
        );
        Self::finish(builder)
    }

    /// Load configuration from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<SyncConfig, ConfigError> {
        let builder = Config::builder()
            .add_source(File::from(path.to_path_buf()).format(FileFormat::Toml));
        Self::finish(builder)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<SyncConfig, ConfigError> {
        let builder = builder.add_source(
            Environment::with_prefix("TREESYNC")
                .separator("__")
                .try_parsing(true),
        );
        builder.build()?.try_deserialize()
    }
}
