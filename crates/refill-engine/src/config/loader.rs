use super::schema::RefillConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const CONFIG_ENV: &str = "REFILL_CONFIG";
pub const DATA_DIR_ENV: &str = "REFILL_DATA_DIR";
const LOCAL_CONFIG: &str = "refill.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Where a configuration came from, for the startup log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

/// Builds a `RefillConfig` from, in order of precedence: command-line
/// overrides, environment variables, a config file, built-in defaults.
///
/// File lookup: the explicit path (which must exist), then `$REFILL_CONFIG`,
/// then `./refill.yaml`, then `~/.refill/config.yaml`. A data directory given
/// on the command line wins over `$REFILL_DATA_DIR`, which wins over the file.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, path: Option<PathBuf>) -> Self {
        self.path = path;
        self
    }

    pub fn with_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.data_dir = dir;
        self
    }

    pub async fn load(self) -> Result<(RefillConfig, ConfigSource), ConfigError> {
        self.load_with_env(|key| std::env::var(key).ok()).await
    }

    /// `load` with the environment supplied by the caller.
    pub async fn load_with_env(
        self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(RefillConfig, ConfigSource), ConfigError> {
        let file = match self.path {
            Some(path) => Some(path),
            None => env(CONFIG_ENV)
                .map(PathBuf::from)
                .or_else(|| discover(&candidates())),
        };

        let (mut config, source) = match file {
            Some(path) => (read(&path).await?, ConfigSource::File(path)),
            None => (RefillConfig::default(), ConfigSource::Defaults),
        };

        if let Some(dir) = self.data_dir.or_else(|| env(DATA_DIR_ENV).map(PathBuf::from)) {
            debug!(dir = %dir.display(), "Data directory overridden");
            config.storage.data_dir = dir;
        }
        info!(source = ?source, data_dir = %config.storage.data_dir.display(), "Config loaded");
        Ok((config, source))
    }
}

fn candidates() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".refill").join("config.yaml"));
    }
    paths
}

fn discover(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.is_file()).cloned()
}

async fn read(path: &Path) -> Result<RefillConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
