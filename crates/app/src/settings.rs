//! Application settings, read from `settings.toml` next to the binary.
//!
//! The storage backend is picked here once, at startup.

use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Memory,
    Sqlite,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
    pub kind: StorageKind,
    /// Snapshot file for the memory backend, database file for sqlite.
    /// The memory backend runs without persistence when unset.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub storage: Storage,
}

impl Settings {
    pub fn new(name: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .set_default("storage.kind", "memory")?
            .add_source(File::with_name(name).required(false))
            .build()?;

        settings.try_deserialize()
    }
}
