use std::{path::Path, time::Duration};

use metalocker_ledger::LedgerConfig;
use serde::Deserialize;

/// On-disk config shape. Every field is optional so a config file only
/// needs to mention what it overrides; unset fields fall back to
/// [`LedgerConfig::default`] the way the teacher's own `confy`-style configs
/// layer file values over struct defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub db_file: Option<String>,
    pub block_check_interval_ms: Option<u64>,
    pub max_records_per_block: Option<usize>,
    pub channel_capacity: Option<usize>,
}

impl FileConfig {
    /// Reads `path` if it exists; a missing file yields the all-`None`
    /// default rather than an error.
    pub fn load(path: Option<&Path>) -> eyre::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Layers this file's overrides (and, in turn, a CLI `--db-file`) over
    /// [`LedgerConfig::default`].
    pub fn resolve(self, db_file_override: Option<String>) -> LedgerConfig {
        let defaults = LedgerConfig::default();
        LedgerConfig {
            db_file: db_file_override
                .or(self.db_file)
                .map(Into::into)
                .unwrap_or(defaults.db_file),
            block_check_interval: self
                .block_check_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.block_check_interval),
            max_records_per_block: self.max_records_per_block.unwrap_or(defaults.max_records_per_block),
            channel_capacity: self.channel_capacity.unwrap_or(defaults.channel_capacity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = FileConfig::load(None).unwrap().resolve(None);
        assert_eq!(config.max_records_per_block, LedgerConfig::default().max_records_per_block);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metalocker.toml");
        std::fs::write(&path, "max_records_per_block = 7\nblock_check_interval_ms = 500\n").unwrap();

        let config = FileConfig::load(Some(&path)).unwrap().resolve(None);
        assert_eq!(config.max_records_per_block, 7);
        assert_eq!(config.block_check_interval, Duration::from_millis(500));
    }

    #[test]
    fn cli_db_file_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metalocker.toml");
        std::fs::write(&path, "db_file = \"from-file.db\"\n").unwrap();

        let config = FileConfig::load(Some(&path)).unwrap().resolve(Some("from-cli.db".into()));
        assert_eq!(config.db_file, std::path::PathBuf::from("from-cli.db"));
    }
}
