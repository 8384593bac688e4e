use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use bloomcycle::reminders::DEFAULT_LEAD_DAYS;
use bloomcycle::storage;

/// Top-level bloomcycle configuration.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BloomConfig {
    /// Vault file. Defaults to the platform data directory.
    #[serde(default)]
    pub data_path: Option<PathBuf>,

    /// Months past the last period shown by `calendar` without a range.
    #[serde(default = "default_horizon_months")]
    pub horizon_months: u32,

    /// Days before the next period for the menstrual reminder.
    #[serde(default = "default_reminder_lead_days")]
    pub reminder_lead_days: u32,
}

fn default_horizon_months() -> u32 {
    6
}
fn default_reminder_lead_days() -> u32 {
    DEFAULT_LEAD_DAYS
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            horizon_months: default_horizon_months(),
            reminder_lead_days: default_reminder_lead_days(),
        }
    }
}

impl BloomConfig {
    /// Load from `path`, or from the platform config directory when no path
    /// is given. Only a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                _ => {
                    debug!("no config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };
        let toml_str = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&toml_str)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    pub fn vault_path(&self) -> Result<PathBuf> {
        match &self.data_path {
            Some(p) => Ok(p.clone()),
            None => storage::default_vault_path().context("cannot locate a vault path"),
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bloomcycle").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: BloomConfig = toml::from_str("").unwrap();
        assert_eq!(config, BloomConfig::default());
        assert_eq!(config.horizon_months, 6);
        assert_eq!(config.reminder_lead_days, 2);
    }

    #[test]
    fn parses_all_keys() {
        let config: BloomConfig = toml::from_str(
            r#"
            data_path = "/tmp/vault.bloom"
            horizon_months = 12
            reminder_lead_days = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.data_path, Some(PathBuf::from("/tmp/vault.bloom")));
        assert_eq!(config.vault_path().unwrap(), PathBuf::from("/tmp/vault.bloom"));
        assert_eq!(config.horizon_months, 12);
        assert_eq!(config.reminder_lead_days, 3);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<BloomConfig>("cycle_days = 28").is_err());
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bloomcycle.toml");
        std::fs::write(&path, "horizon_months = 3\n").unwrap();
        let config = BloomConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.horizon_months, 3);
    }

    #[test]
    fn load_fails_for_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(BloomConfig::load(Some(path.as_path())).is_err());
    }
}
