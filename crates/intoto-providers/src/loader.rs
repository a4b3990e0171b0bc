// crates/intoto-providers/src/loader.rs
// ============================================================================
// Module: Metadata Loader
// Description: Bounded loading of layout, key, and link files.
// Purpose: Turn on-disk metadata into validated core records.
// Dependencies: intoto-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Metadata files are untrusted input, so every read is capped by
//! [`MetadataLimits`]. Links are discovered by the conventional
//! `<name>.<short keyid>.link` filename; a link whose recorded name differs
//! from its filename is rejected rather than silently regrouped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use intoto_core::Layout;
use intoto_core::LayoutError;
use intoto_core::Link;
use intoto_core::LinkSet;
use intoto_core::PublicKey;
use intoto_core::link::LINK_FILE_EXTENSION;
use intoto_core::link::parse_link_file_name;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Hex length of a raw ed25519 public key.
const ED25519_PUBLIC_HEX_LEN: usize = 64;

/// Size and count limits for metadata loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataLimits {
    /// Maximum size of one metadata file, in bytes.
    pub max_file_bytes: usize,
    /// Maximum number of link files in a directory.
    pub max_link_files: usize,
}

impl Default for MetadataLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 16 * 1024 * 1024,
            max_link_files: 4096,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Metadata loading failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// File could not be read.
    #[error("unable to read {path}: {reason}")]
    Io {
        /// File path.
        path: String,
        /// Underlying message.
        reason: String,
    },
    /// File exceeds the size limit.
    #[error("{path} exceeds size limit of {limit} bytes")]
    TooLarge {
        /// File path.
        path: String,
        /// Configured limit.
        limit: usize,
    },
    /// Layout file is invalid.
    #[error("invalid layout {path}: {source}")]
    Layout {
        /// File path.
        path: String,
        /// Layout error.
        source: LayoutError,
    },
    /// Link file is invalid.
    #[error("invalid link {path}: {reason}")]
    Link {
        /// File path.
        path: String,
        /// Validation message.
        reason: String,
    },
    /// Key file is invalid.
    #[error("invalid public key {path}: {reason}")]
    Key {
        /// File path.
        path: String,
        /// Validation message.
        reason: String,
    },
    /// Link directory holds too many link files.
    #[error("link directory exceeds limit of {limit} files")]
    TooManyLinks {
        /// Configured limit.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Loaders
// ============================================================================

/// Loads and validates a layout file.
///
/// # Errors
///
/// Returns [`LoadError`] when the file cannot be read or the layout is invalid.
pub fn load_layout(path: &Path, limits: MetadataLimits) -> Result<Layout, LoadError> {
    let bytes = read_file_limited(path, limits.max_file_bytes)?;
    Layout::from_json(&bytes).map_err(|source| LoadError::Layout {
        path: path.display().to_string(),
        source,
    })
}

/// Loads a public key file.
///
/// Accepts either a JSON key record or the bare hex of an ed25519 public key.
///
/// # Errors
///
/// Returns [`LoadError`] when the file cannot be read or holds no valid key.
pub fn load_public_key(path: &Path, limits: MetadataLimits) -> Result<PublicKey, LoadError> {
    let bytes = read_file_limited(path, limits.max_file_bytes)?;
    let key_error = |reason: String| LoadError::Key {
        path: path.display().to_string(),
        reason,
    };
    let text = std::str::from_utf8(&bytes)
        .map_err(|_| key_error("key file must be utf-8".to_string()))?
        .trim();
    if text.len() == ED25519_PUBLIC_HEX_LEN && text.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(PublicKey::ed25519(text.to_ascii_lowercase()));
    }
    serde_json::from_str(text).map_err(|err| key_error(err.to_string()))
}

/// Loads every conventionally named link file in `dir`.
///
/// Files without the `.link` extension are ignored.
///
/// # Errors
///
/// Returns [`LoadError`] when the directory cannot be listed, a link file is
/// invalid, or the file count exceeds the limit.
pub fn load_links(dir: &Path, limits: MetadataLimits) -> Result<LinkSet, LoadError> {
    let io_error = |reason: String| LoadError::Io {
        path: dir.display().to_string(),
        reason,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|err| io_error(err.to_string()))? {
        let path = entry.map_err(|err| io_error(err.to_string()))?.path();
        let is_link = path.extension().is_some_and(|ext| ext == LINK_FILE_EXTENSION);
        if is_link && path.is_file() {
            paths.push(path);
        }
    }
    if paths.len() > limits.max_link_files {
        return Err(LoadError::TooManyLinks {
            limit: limits.max_link_files,
        });
    }
    paths.sort();

    let mut links = LinkSet::new();
    for path in paths {
        links.insert(load_link(&path, limits)?);
    }
    Ok(links)
}

/// Loads one link file and checks it against its filename.
fn load_link(path: &Path, limits: MetadataLimits) -> Result<Link, LoadError> {
    let link_error = |reason: String| LoadError::Link {
        path: path.display().to_string(),
        reason,
    };
    let file_name = path.file_name().and_then(|name| name.to_str()).unwrap_or_default();
    let Some((expected_name, _)) = parse_link_file_name(file_name) else {
        return Err(link_error("filename is not <name>.<keyid>.link".to_string()));
    };
    let bytes = read_file_limited(path, limits.max_file_bytes)?;
    let link = Link::from_json(&bytes).map_err(|err| link_error(err.to_string()))?;
    if link.name != expected_name {
        return Err(link_error(format!(
            "records name '{}' but filename names '{expected_name}'",
            link.name
        )));
    }
    Ok(link)
}

/// Reads a file while enforcing a maximum byte limit.
fn read_file_limited(path: &Path, max_bytes: usize) -> Result<Vec<u8>, LoadError> {
    let io_error = |reason: String| LoadError::Io {
        path: path.display().to_string(),
        reason,
    };
    let file = File::open(path).map_err(|err| io_error(err.to_string()))?;
    let limit = u64::try_from(max_bytes.saturating_add(1))
        .map_err(|_| io_error("size limit exceeds u64".to_string()))?;
    let mut buf = Vec::new();
    file.take(limit).read_to_end(&mut buf).map_err(|err| io_error(err.to_string()))?;
    if buf.len() > max_bytes {
        return Err(LoadError::TooLarge {
            path: path.display().to_string(),
            limit: max_bytes,
        });
    }
    Ok(buf)
}
