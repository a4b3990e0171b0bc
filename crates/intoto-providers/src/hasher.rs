// crates/intoto-providers/src/hasher.rs
// ============================================================================
// Module: Filesystem Artifact Hasher
// Description: Digest sets for files under a base directory.
// Purpose: Record inspection materials and products from the working tree.
// Dependencies: globset, intoto-core
// ============================================================================

//! ## Overview
//! [`FileArtifactHasher`] walks a base directory and hashes every regular file
//! with the configured algorithms. Artifact names are paths relative to the
//! base, joined with `/`. Exclude patterns use the same glob dialect as
//! artifact rules and are matched against both the relative path and the
//! entry's own name. Symlinked directories are not followed, so a tree with a
//! link cycle still terminates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use globset::GlobBuilder;
use globset::GlobSet;
use globset::GlobSetBuilder;
use intoto_core::ArtifactDigest;
use intoto_core::ArtifactHasher;
use intoto_core::ArtifactSet;
use intoto_core::HashAlgorithm;
use intoto_core::HasherError;
use serde::Deserialize;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the filesystem artifact hasher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArtifactHasherConfig {
    /// Directory artifact names are relative to.
    pub base_path: PathBuf,
    /// Artifact patterns left out of snapshots.
    pub exclude_patterns: Vec<String>,
    /// Algorithms recorded per artifact.
    pub algorithms: Vec<HashAlgorithm>,
    /// Maximum number of artifacts in one snapshot.
    pub max_artifacts: usize,
    /// Maximum size of a single artifact, in bytes.
    pub max_artifact_bytes: usize,
}

impl Default for ArtifactHasherConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            exclude_patterns: Vec::new(),
            algorithms: vec![HashAlgorithm::Sha256],
            max_artifacts: 100_000,
            max_artifact_bytes: 1024 * 1024 * 1024,
        }
    }
}

// ============================================================================
// SECTION: Hasher
// ============================================================================

/// Artifact hasher backed by the local filesystem.
pub struct FileArtifactHasher {
    /// Hasher configuration.
    config: ArtifactHasherConfig,
    /// Compiled exclude patterns.
    excludes: GlobSet,
}

impl FileArtifactHasher {
    /// Creates a hasher, compiling the exclude patterns.
    ///
    /// # Errors
    ///
    /// Returns [`HasherError::Config`] when a pattern is invalid or no
    /// algorithm is configured.
    pub fn new(config: ArtifactHasherConfig) -> Result<Self, HasherError> {
        if config.algorithms.is_empty() {
            return Err(HasherError::Config("at least one hash algorithm is required".to_string()));
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.exclude_patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(false)
                .build()
                .map_err(|err| HasherError::Config(format!("exclude '{pattern}': {err}")))?;
            builder.add(glob);
        }
        let excludes = builder.build().map_err(|err| HasherError::Config(err.to_string()))?;
        Ok(Self {
            config,
            excludes,
        })
    }

    /// Returns the hasher configuration.
    #[must_use]
    pub const fn config(&self) -> &ArtifactHasherConfig {
        &self.config
    }

    /// Hashes one file.
    fn digest_file(&self, path: &Path, name: &str) -> Result<ArtifactDigest, HasherError> {
        let io_error = |reason: String| HasherError::Io {
            artifact: name.to_string(),
            reason,
        };
        let file = File::open(path).map_err(|err| io_error(err.to_string()))?;
        let limit = u64::try_from(self.config.max_artifact_bytes.saturating_add(1))
            .map_err(|_| io_error("size limit exceeds u64".to_string()))?;
        let mut bytes = Vec::new();
        file.take(limit).read_to_end(&mut bytes).map_err(|err| io_error(err.to_string()))?;
        if bytes.len() > self.config.max_artifact_bytes {
            return Err(io_error("artifact exceeds size limit".to_string()));
        }
        Ok(ArtifactDigest::from_bytes(&self.config.algorithms, &bytes))
    }

    /// Recursively hashes `dir` into `out`.
    fn walk(&self, dir: &Path, prefix: &str, out: &mut ArtifactSet) -> Result<(), HasherError> {
        let io_error = |reason: String| HasherError::Io {
            artifact: if prefix.is_empty() { ".".to_string() } else { prefix.to_string() },
            reason,
        };
        let mut entries = fs::read_dir(dir)
            .map_err(|err| io_error(err.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| io_error(err.to_string()))?;
        entries.sort_by_key(fs::DirEntry::file_name);
        for entry in entries {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                return Err(io_error("artifact path is not valid UTF-8".to_string()));
            };
            let name = if prefix.is_empty() {
                file_name.to_string()
            } else {
                format!("{prefix}/{file_name}")
            };
            if self.excludes.is_match(&name) || self.excludes.is_match(file_name) {
                continue;
            }
            let path = entry.path();
            let file_type = entry.file_type().map_err(|err| io_error(err.to_string()))?;
            if file_type.is_dir() {
                self.walk(&path, &name, out)?;
                continue;
            }
            if file_type.is_symlink() && path.is_dir() {
                continue;
            }
            if !path.is_file() {
                continue;
            }
            if out.len() >= self.config.max_artifacts {
                return Err(HasherError::TooManyArtifacts {
                    limit: self.config.max_artifacts,
                });
            }
            let digest = self.digest_file(&path, &name)?;
            out.insert(name, digest);
        }
        Ok(())
    }
}

impl ArtifactHasher for FileArtifactHasher {
    fn hash(&self, artifact: &str) -> Result<ArtifactDigest, HasherError> {
        if artifact.split('/').any(|segment| segment == "..") {
            return Err(HasherError::Io {
                artifact: artifact.to_string(),
                reason: "artifact path escapes the base directory".to_string(),
            });
        }
        let path = artifact
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.config.base_path.clone(), |path, segment| path.join(segment));
        self.digest_file(&path, artifact)
    }

    fn snapshot(&self) -> Result<ArtifactSet, HasherError> {
        let mut out = ArtifactSet::new();
        self.walk(&self.config.base_path, "", &mut out)?;
        Ok(out)
    }
}
