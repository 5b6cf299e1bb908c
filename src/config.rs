//! TOML configuration for support package preparation.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::package::{naming, FailurePolicy, DEFAULT_COMPONENT, DEFAULT_COMPRESSION};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SUPPORTPACK_CONFIG";

/// Config file looked up in the working directory when [`CONFIG_ENV`] is unset.
pub const LOCAL_CONFIG: &str = "supportpack.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupportConfig {
    #[serde(default)]
    pub package: PackageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SupportConfig {
    /// Load and validate configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded support package configuration");
        Ok(config)
    }

    /// Try, in order: the file named by `SUPPORTPACK_CONFIG`, `./supportpack.toml`,
    /// then compiled-in defaults. Unloadable files are skipped with a warning.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "SUPPORTPACK_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %local.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.package.validate()
    }
}

// ---------------------------------------------------------------------------
// Package
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Name attached to every log record.
    pub component: String,
    /// Extension of structured files, without the dot.
    pub structured_extension: String,
    /// Gzip level (0-9).
    pub compression_level: u32,
    pub failure_policy: FailurePolicy,
    /// Prefix of timestamped staging directories.
    pub staging_prefix: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            component: DEFAULT_COMPONENT.to_string(),
            structured_extension: naming::STRUCTURED_EXTENSION.to_string(),
            compression_level: DEFAULT_COMPRESSION,
            failure_policy: FailurePolicy::default(),
            staging_prefix: "support".to_string(),
        }
    }
}

impl PackageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.compression_level > 9 {
            bail!(
                "compression_level must be between 0 and 9, got {}",
                self.compression_level
            );
        }
        if self.structured_extension.trim_start_matches('.').is_empty() {
            bail!("structured_extension must not be empty");
        }
        if self.staging_prefix.is_empty() {
            bail!("staging_prefix must not be empty");
        }
        Ok(())
    }

    /// Timestamped staging directory under `root`, e.g. `root/support-2025-01-02T03-04-05Z`.
    pub fn staging_dir_in(&self, root: &Path, at: DateTime<Utc>) -> PathBuf {
        root.join(naming::staging_dir_name(&self.staging_prefix, at))
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`) or a
    /// full `EnvFilter` directive.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = SupportConfig::default();
        assert_eq!(cfg.package.component, "PackagingUtility");
        assert_eq!(cfg.package.structured_extension, "yaml");
        assert_eq!(cfg.package.compression_level, 6);
        assert_eq!(cfg.package.failure_policy, FailurePolicy::Propagate);
        assert_eq!(cfg.package.staging_prefix, "support");
        assert_eq!(cfg.logging.level, "info");
        assert!(!cfg.logging.json);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_parse_example_toml() {
        let toml_str = r#"
[package]
component = "GitOpsCollector"
structured_extension = "yml"
compression_level = 9
failure_policy = "log_and_continue"
staging_prefix = "cf-support"

[logging]
level = "debug"
json = true
"#;
        let cfg: SupportConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.package.component, "GitOpsCollector");
        assert_eq!(cfg.package.structured_extension, "yml");
        assert_eq!(cfg.package.compression_level, 9);
        assert_eq!(cfg.package.failure_policy, FailurePolicy::LogAndContinue);
        assert_eq!(cfg.package.staging_prefix, "cf-support");
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.logging.json);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let cfg: SupportConfig = toml::from_str("[logging]\nlevel = \"warn\"\n").unwrap();
        assert_eq!(cfg.logging.level, "warn");
        assert_eq!(cfg.package.compression_level, 6);
        assert_eq!(cfg.package.failure_policy, FailurePolicy::Propagate);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let res: Result<SupportConfig, _> =
            toml::from_str("[package]\nfailure_policy = \"ignore\"\n");
        assert!(res.is_err());
    }

    #[test]
    fn test_load_rejects_invalid_compression() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("supportpack.toml");
        std::fs::write(&path, "[package]\ncompression_level = 12\n").unwrap();

        let err = SupportConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("compression_level"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("supportpack.toml");
        std::fs::write(&path, "[package]\nstaging_prefix = \"case\"\n").unwrap();

        let cfg = SupportConfig::load(&path).unwrap();
        assert_eq!(cfg.package.staging_prefix, "case");
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(SupportConfig::load(Path::new("/nonexistent/supportpack.toml")).is_err());
    }

    #[test]
    fn test_empty_extension_is_invalid() {
        let cfg = PackageConfig {
            structured_extension: ".".to_string(),
            ..PackageConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_staging_dir_in() {
        let cfg = PackageConfig::default();
        let at = Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 1).unwrap();
        assert_eq!(
            cfg.staging_dir_in(Path::new("/var/tmp"), at),
            PathBuf::from("/var/tmp/support-2024-06-30T23-59-01Z")
        );
    }
}
