pub mod loader;
pub mod schema;

pub use loader::{CONFIG_ENV, ConfigError, ConfigLoader, ConfigSource, DATA_DIR_ENV};
pub use schema::{AgentConfig, RefillConfig, StorageConfig};
