use refill_page::CaptureConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefillConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    /// File backing the durable store.
    pub fn durable_path(&self) -> PathBuf {
        self.data_dir.join("durable.json")
    }
}

fn default_data_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".refill").join("data"),
        None => PathBuf::from("./.refill/data"),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Load the agent with every page. When off, pages start without one and
    /// the first coordinator message injects it.
    #[serde(default = "default_inject_on_load")]
    pub inject_on_load: bool,
    #[serde(default = "default_show_indicator")]
    pub show_indicator: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            inject_on_load: default_inject_on_load(),
            show_indicator: default_show_indicator(),
        }
    }
}

fn default_inject_on_load() -> bool {
    true
}

fn default_show_indicator() -> bool {
    true
}
