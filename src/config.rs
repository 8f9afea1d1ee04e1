use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// In-process lock settings (only used by `InMemoryLock`)
    #[serde(default)]
    pub lock: LockConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LockConfig {
    /// Lease after which a held key may be taken over by another caller
    pub lease_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self { lease_ms: 30_000 }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        Self::load_from(format!("config/{}.yaml", env))
    }

    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config yaml: {}", path.display()))
    }
}
