//! Optional TOML policy file.
//!
//! ```toml
//! [metadata]
//! version = 1
//!
//! [policy]
//! follow_symlinks = false
//! recursive = true
//! ignore_hidden = true
//! case_sensitive = true
//! check_extra = true
//! include = []
//! exclude = [".tmp", "cache/"]
//! ```
//!
//! Every `[policy]` key is optional; absent keys keep the built-in default.

use crate::context::ScanPolicy;
use crate::exit_status::ExitStatus;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Unsupported config file version: {0}")]
    UnsupportedVersion(u32),
}

impl ConfigError {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            ConfigError::Io { .. } | ConfigError::PermissionDenied(_) => ExitStatus::FileIoError,
            ConfigError::TomlParse(_) | ConfigError::UnsupportedVersion(_) => {
                ExitStatus::InvalidArguments
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct Metadata {
    version: u32,
}

/// Reads only `[metadata]` so an unsupported version is reported as such
/// rather than as an unknown-field error.
#[derive(Debug, Deserialize)]
struct MetadataOnly {
    metadata: Metadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicySection {
    pub follow_symlinks: Option<bool>,
    pub recursive: Option<bool>,
    pub ignore_hidden: Option<bool>,
    pub case_sensitive: Option<bool>,
    pub check_extra: Option<bool>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyFile {
    metadata: Metadata,
    #[serde(default)]
    pub policy: PolicySection,
}

impl PolicyFile {
    const SUPPORTED_VERSION: u32 = 1;

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let metadata_only: MetadataOnly = toml::from_str(content)?;
        if metadata_only.metadata.version != Self::SUPPORTED_VERSION {
            return Err(ConfigError::UnsupportedVersion(
                metadata_only.metadata.version,
            ));
        }

        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == ErrorKind::PermissionDenied {
                ConfigError::PermissionDenied(path.to_path_buf())
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        Self::from_toml(&content)
    }

    /// Builds a policy from the defaults overlaid with this file's values.
    pub fn to_policy(&self) -> ScanPolicy {
        let defaults = ScanPolicy::default();
        let p = &self.policy;
        ScanPolicy {
            follow_symlinks: p.follow_symlinks.unwrap_or(defaults.follow_symlinks),
            recursive: p.recursive.unwrap_or(defaults.recursive),
            ignore_hidden: p.ignore_hidden.unwrap_or(defaults.ignore_hidden),
            case_sensitive: p.case_sensitive.unwrap_or(defaults.case_sensitive),
            check_extra: p.check_extra.unwrap_or(defaults.check_extra),
            include: p.include.clone(),
            exclude: p.exclude.clone(),
            dry_run: defaults.dry_run,
        }
    }
}
