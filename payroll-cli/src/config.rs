//! `payroll.toml` application settings.
//!
//! ```toml
//! [database]
//! backend = "sqlite"
//! connection = "payroll.db"
//!
//! [logging]
//! level = "info"
//! file = "payroll.log"
//!
//! [rates]
//! path = "rates.toml"
//! ```
//!
//! Every section and key is optional. Command-line flags win over the file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use payroll_core::DbConfig;
use serde::Deserialize;

use crate::cli::Cli;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub rates: RatesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub backend: String,
    /// File path, `:memory:`, or a full `sqlite:` URL.
    pub connection: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection: "payroll.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// Log records are appended here as well as written to stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RatesConfig {
    /// Rate schedule file. The built-in schedule is used when unset.
    pub path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).context("Invalid configuration")
    }

    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents)
                .with_context(|| format!("Failed to load config: {}", path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read config: {}", path.display()))
            }
        }
    }

    /// Loads the file named by `--config` and applies the other global flags.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let mut config = Self::load(&cli.config)?;
        config.apply_overrides(cli);
        Ok(config)
    }

    pub fn apply_overrides(
        &mut self,
        cli: &Cli,
    ) {
        if let Some(backend) = &cli.backend {
            self.database.backend = backend.clone();
        }
        if let Some(db) = &cli.db {
            self.database.connection = db.clone();
        }
        if let Some(rates) = &cli.rates {
            self.rates.path = Some(rates.clone());
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            backend: self.database.backend.clone(),
            connection_string: self.database.connection.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(AppConfig::from_toml_str("").unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
[database]
connection = "/var/lib/payroll/ledger.db"

[logging]
file = "payroll.log"
"#,
        )
        .unwrap();

        assert_eq!(config.database.backend, "sqlite");
        assert_eq!(config.database.connection, "/var/lib/payroll/ledger.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, Some(PathBuf::from("payroll.log")));
        assert_eq!(config.rates.path, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = AppConfig::from_toml_str("[database]\nurl = \"x\"");

        assert!(result.is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("payroll-cli-config-does-not-exist.toml");

        assert_eq!(AppConfig::load(&path).unwrap(), AppConfig::default());
    }

    #[test]
    fn malformed_file_names_the_path() {
        let path =
            std::env::temp_dir().join(format!("payroll-cli-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[database\n").unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(format!("{err}").contains(&path.display().to_string()));
    }

    #[test]
    fn flags_override_file_values() {
        let cli = Cli::try_parse_from([
            "payroll",
            "--db",
            ":memory:",
            "--backend",
            "memory",
            "--rates",
            "rates-2025.toml",
            "--log-level",
            "debug",
            "recalc",
            "2024",
        ])
        .unwrap();
        let mut config = AppConfig::default();

        config.apply_overrides(&cli);

        assert_eq!(
            config.db_config(),
            DbConfig {
                backend: "memory".to_string(),
                connection_string: ":memory:".to_string(),
            }
        );
        assert_eq!(config.rates.path, Some(PathBuf::from("rates-2025.toml")));
        assert_eq!(config.logging.level, "debug");
    }
}
