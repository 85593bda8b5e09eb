//! CLI configuration

use crate::error::{CliError, CliResult};
use resolver_conformance::ConformanceConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Suites run when neither the command line nor the config file names any.
pub const KERNEL_SUITES: &[&str] = &[
    "R-001-allowlist",
    "R-002-io-contract",
    "R-003-failure-modes",
    "R-004-invalid-syntax",
    "R-005-resolver-metadata-contract",
];

pub const DEFAULT_REPORT_PATH: &str = "conformance-report.json";

pub const DEFAULT_BADGE_DIR: &str = "badges";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CliConfig {
    /// Resolver program, when not given on the command line
    pub resolver: Option<String>,

    /// Directory holding one subdirectory per suite
    pub suites_dir: Option<String>,

    /// Suites to run, in order
    pub suites: Vec<String>,

    /// Per-invocation timeout for the resolver process, in seconds
    pub invocation_timeout_secs: Option<u64>,

    /// Where `--json` writes the report
    pub report_path: Option<String>,

    /// Where `--badge` writes `certified.svg`
    pub badge_dir: Option<String>,

    /// Engine settings
    pub conformance: ConformanceConfig,
}

impl CliConfig {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> CliResult<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: CliConfig =
                toml::from_str(&contents).map_err(|e| CliError::Config(e.to_string()))?;
            Ok(config)
        } else {
            Ok(CliConfig::default())
        }
    }

    /// Get the default configuration file path
    fn default_config_path() -> CliResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::Config("Cannot find config directory".into()))?;
        Ok(config_dir.join("olang").join("conformance.toml"))
    }

    /// Configured suites, or the kernel list.
    pub fn suites_or_default(&self) -> Vec<String> {
        if self.suites.is_empty() {
            KERNEL_SUITES.iter().map(|s| s.to_string()).collect()
        } else {
            self.suites.clone()
        }
    }

    pub fn report_path(&self) -> PathBuf {
        PathBuf::from(self.report_path.as_deref().unwrap_or(DEFAULT_REPORT_PATH))
    }

    pub fn badge_dir(&self) -> PathBuf {
        PathBuf::from(self.badge_dir.as_deref().unwrap_or(DEFAULT_BADGE_DIR))
    }
}
