//! JSON file config store for Linux hosts.
//!
//! Implements [`ConfigPort`] over a single `config.json`. Partial files merge
//! over the defaults (every field is `#[serde(default)]`). A missing file
//! loads as defaults and is written back so operators have something to
//! edit. Saves replace the file atomically: write `<name>.tmp`, fsync,
//! rename.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::ConfigPort;
use crate::config::ControllerConfig;
use crate::error::ConfigError;

/// Default path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_ENV: &str = "WATERSHED_CONFIG";

pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `$WATERSHED_CONFIG`, or `config.json` when unset.
    pub fn from_env() -> Self {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_atomic(&self, bytes: &[u8]) -> std::io::Result<()> {
        let tmp = self.tmp_path();
        {
            let mut file = File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
    }
}

impl ConfigPort for FileConfigStore {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let cfg: ControllerConfig = serde_json::from_slice(&bytes).map_err(|e| {
                    warn!("config {}: parse error: {}", self.path.display(), e);
                    ConfigError::Corrupted
                })?;
                info!("config: loaded {}", self.path.display());
                Ok(cfg)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("config: {} not found, writing defaults", self.path.display());
                let cfg = ControllerConfig::default();
                if let Err(e) = self.save(&cfg) {
                    warn!("config: could not write defaults: {}", e);
                }
                Ok(cfg)
            }
            Err(e) => {
                warn!("config {}: read error: {}", self.path.display(), e);
                Err(ConfigError::IoError)
            }
        }
    }

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let mut bytes = serde_json::to_vec_pretty(config).map_err(|_| ConfigError::IoError)?;
        bytes.push(b'\n');
        self.write_atomic(&bytes).map_err(|e| {
            warn!("config {}: write error: {}", self.path.display(), e);
            ConfigError::IoError
        })?;
        info!("config: saved {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_path_sits_next_to_target() {
        let store = FileConfigStore::new("/etc/watershed/config.json");
        assert_eq!(store.tmp_path(), PathBuf::from("/etc/watershed/config.json.tmp"));
    }
}
