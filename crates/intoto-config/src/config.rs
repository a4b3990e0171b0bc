// crates/intoto-config/src/config.rs
// ============================================================================
// Module: in-toto Verify Configuration
// Description: Configuration loading and validation for intoto-verify.
// Purpose: Turn an optional TOML file into validated runtime settings.
// Dependencies: intoto-core, intoto-providers, serde, toml
// ============================================================================

//! ## Overview
//! `intoto-verify.toml` is read with a size cap and path length checks, then
//! parsed and validated as a whole. Every section is optional and defaults to
//! the fail-closed behavior of the runtime structs it converts into. Invalid
//! configuration is rejected before any verification work starts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use intoto_core::HashAlgorithm;
use intoto_core::OwnerSignaturePolicy;
use intoto_core::VerifierConfig;
use intoto_providers::ArtifactHasherConfig;
use intoto_providers::CommandRunnerConfig;
use intoto_providers::MetadataLimits;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_NAME: &str = "intoto-verify.toml";
/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "INTOTO_VERIFY_CONFIG";
/// Largest accepted config file, in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Longest accepted path component, in bytes.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Longest accepted path, in bytes.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of artifact exclude patterns.
const MAX_EXCLUDE_PATTERNS: usize = 256;
/// Upper bound for a single metadata file, in bytes.
const MAX_METADATA_FILE_BYTES: usize = 256 * 1024 * 1024;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Top-level configuration for `intoto-verify`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntotoConfig {
    /// Verification policy configuration.
    #[serde(default)]
    pub verification: VerificationConfig,
    /// Artifact hashing configuration for inspections.
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    /// Inspection command configuration.
    #[serde(default)]
    pub inspections: InspectionsConfig,
    /// Audit sink configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Metadata loading limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl IntotoConfig {
    /// Loads the file named by `path`, by [`CONFIG_ENV_VAR`], or the default
    /// file, in that order.
    ///
    /// A named file must exist. An absent default file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, required) = resolve_path(path);
        check_path("config path", &resolved)?;
        let bytes = match fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(err) if !required && err.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => return Err(ConfigError::Io(format!("{}: {err}", resolved.display()))),
        };
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "{} is larger than {MAX_CONFIG_FILE_SIZE} bytes",
                resolved.display()
            )));
        }
        let text = String::from_utf8(bytes).map_err(|_| {
            ConfigError::Invalid(format!("{} is not valid utf-8", resolved.display()))
        })?;
        Self::parse(&text)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.artifacts.validate()?;
        self.inspections.validate()?;
        self.audit.validate()?;
        self.limits.validate()?;
        Ok(())
    }

    /// Returns the verifier configuration.
    #[must_use]
    pub const fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            owner_policy: self.verification.owner_policy,
            enforce_inspection_exit_code: self.verification.enforce_inspection_exit_code,
        }
    }

    /// Returns the artifact hasher configuration.
    #[must_use]
    pub fn hasher_config(&self) -> ArtifactHasherConfig {
        ArtifactHasherConfig {
            base_path: self.artifacts.base_path.clone(),
            exclude_patterns: self.artifacts.exclude_patterns.clone(),
            algorithms: self.artifacts.algorithms.clone(),
            max_artifacts: self.artifacts.max_artifacts,
            max_artifact_bytes: self.artifacts.max_artifact_bytes,
        }
    }

    /// Returns the inspection command runner configuration.
    #[must_use]
    pub fn runner_config(&self) -> CommandRunnerConfig {
        CommandRunnerConfig {
            working_dir: self.inspections.working_dir.clone(),
            max_output_bytes: self.inspections.max_output_bytes,
        }
    }

    /// Returns the metadata loading limits.
    #[must_use]
    pub const fn metadata_limits(&self) -> MetadataLimits {
        MetadataLimits {
            max_file_bytes: self.limits.max_file_bytes,
            max_link_files: self.limits.max_link_files,
        }
    }
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Verification policy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct VerificationConfig {
    /// How many owner keys must have signed the layout.
    #[serde(default)]
    pub owner_policy: OwnerSignaturePolicy,
    /// Whether a non-zero inspection exit code fails verification.
    #[serde(default = "default_enforce_exit_code")]
    pub enforce_inspection_exit_code: bool,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            owner_policy: OwnerSignaturePolicy::default(),
            enforce_inspection_exit_code: default_enforce_exit_code(),
        }
    }
}

// ============================================================================
// SECTION: Artifacts
// ============================================================================

/// Artifact hashing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory artifact names are relative to.
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,
    /// Artifact patterns left out of snapshots.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// Algorithms recorded per artifact.
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<HashAlgorithm>,
    /// Maximum number of artifacts in one snapshot.
    #[serde(default = "default_max_artifacts")]
    pub max_artifacts: usize,
    /// Maximum size of a single artifact, in bytes.
    #[serde(default = "default_max_artifact_bytes")]
    pub max_artifact_bytes: usize,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            exclude_patterns: Vec::new(),
            algorithms: default_algorithms(),
            max_artifacts: default_max_artifacts(),
            max_artifact_bytes: default_max_artifact_bytes(),
        }
    }
}

impl ArtifactsConfig {
    /// Validates artifact hashing configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        check_path("artifacts.base_path", &self.base_path)?;
        if self.algorithms.is_empty() {
            return Err(ConfigError::Invalid("artifacts.algorithms must be non-empty".to_string()));
        }
        for (index, algorithm) in self.algorithms.iter().enumerate() {
            if self.algorithms[.. index].contains(algorithm) {
                return Err(ConfigError::Invalid(format!(
                    "artifacts.algorithms lists '{algorithm}' more than once"
                )));
            }
        }
        if self.exclude_patterns.len() > MAX_EXCLUDE_PATTERNS {
            return Err(ConfigError::Invalid(format!(
                "artifacts.exclude_patterns exceeds {MAX_EXCLUDE_PATTERNS} entries"
            )));
        }
        if self.exclude_patterns.iter().any(|pattern| pattern.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "artifacts.exclude_patterns entries must be non-empty".to_string(),
            ));
        }
        if self.max_artifacts == 0 {
            return Err(ConfigError::Invalid("artifacts.max_artifacts must be > 0".to_string()));
        }
        if self.max_artifact_bytes == 0 {
            return Err(ConfigError::Invalid(
                "artifacts.max_artifact_bytes must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Inspections
// ============================================================================

/// Inspection command configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InspectionsConfig {
    /// Working directory for inspection commands.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Maximum captured bytes per output stream.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

impl Default for InspectionsConfig {
    fn default() -> Self {
        Self {
            working_dir: None,
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

impl InspectionsConfig {
    /// Validates inspection configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.working_dir {
            check_path("inspections.working_dir", dir)?;
        }
        if self.max_output_bytes == 0 {
            return Err(ConfigError::Invalid(
                "inspections.max_output_bytes must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Audit events are discarded.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File,
}

/// Audit sink configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuditConfig {
    /// Selected sink.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Audit log path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (AuditSinkKind::File, Some(path)) => check_path("audit.path", path),
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid for the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Metadata loading limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LimitsConfig {
    /// Maximum size of one layout, key, or link file, in bytes.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
    /// Maximum number of link files in the link directory.
    #[serde(default = "default_max_link_files")]
    pub max_link_files: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            max_link_files: default_max_link_files(),
        }
    }
}

impl LimitsConfig {
    /// Validates metadata limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_file_bytes == 0 || self.max_file_bytes > MAX_METADATA_FILE_BYTES {
            return Err(ConfigError::Invalid(format!(
                "limits.max_file_bytes must be between 1 and {MAX_METADATA_FILE_BYTES}"
            )));
        }
        if self.max_link_files == 0 {
            return Err(ConfigError::Invalid("limits.max_link_files must be > 0".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default inspection exit-code enforcement.
const fn default_enforce_exit_code() -> bool {
    true
}

/// Default artifact base path.
fn default_base_path() -> PathBuf {
    ArtifactHasherConfig::default().base_path
}

/// Default artifact hash algorithms.
fn default_algorithms() -> Vec<HashAlgorithm> {
    ArtifactHasherConfig::default().algorithms
}

/// Default maximum artifact count.
fn default_max_artifacts() -> usize {
    ArtifactHasherConfig::default().max_artifacts
}

/// Default maximum artifact size.
fn default_max_artifact_bytes() -> usize {
    ArtifactHasherConfig::default().max_artifact_bytes
}

/// Default captured output limit.
fn default_max_output_bytes() -> usize {
    CommandRunnerConfig::default().max_output_bytes
}

/// Default metadata file size limit.
fn default_max_file_bytes() -> usize {
    MetadataLimits::default().max_file_bytes
}

/// Default link file count limit.
fn default_max_link_files() -> usize {
    MetadataLimits::default().max_link_files
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config {0}")]
    Io(String),
    /// The file is not valid TOML for this schema.
    #[error("malformed config: {0}")]
    Parse(String),
    /// A value is out of range or inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Picks the config file and whether it must exist.
fn resolve_path(path: Option<&Path>) -> (PathBuf, bool) {
    if let Some(path) = path {
        return (path.to_path_buf(), true);
    }
    match env::var_os(CONFIG_ENV_VAR) {
        Some(value) => (PathBuf::from(value), true),
        None => (PathBuf::from(DEFAULT_CONFIG_NAME), false),
    }
}

/// Rejects empty paths and paths over the length limits.
fn check_path(field: &str, path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "{field} is longer than {MAX_TOTAL_PATH_LENGTH} bytes"
        )));
    }
    if path.components().any(|part| part.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH) {
        return Err(ConfigError::Invalid(format!(
            "{field} has a component longer than {MAX_PATH_COMPONENT_LENGTH} bytes"
        )));
    }
    Ok(())
}
