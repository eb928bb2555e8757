// ⚙️ Runtime configuration
//
// Read from the environment (optionally seeded by a .env file in main).

use std::env;
use std::path::PathBuf;

pub const DATABASE_ENV: &str = "FINANCEBOOK_DB";
pub const WAL_ENV: &str = "FINANCEBOOK_WAL";
pub const DEFAULT_DATABASE_PATH: &str = "./financebook.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    /// Enable WAL journaling for on-disk databases
    pub wal: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            wal: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(path) = lookup(DATABASE_ENV).filter(|p| !p.trim().is_empty()) {
            config.database_path = PathBuf::from(path.trim());
        }

        if let Some(flag) = lookup(WAL_ENV) {
            match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.wal = true,
                "0" | "false" | "no" | "off" => config.wal = false,
                other => log::warn!("ignoring {}={:?}, expected a boolean", WAL_ENV, other),
            }
        }

        config
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }
}
