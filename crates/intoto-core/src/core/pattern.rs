// crates/intoto-core/src/core/pattern.rs
// ============================================================================
// Module: in-toto Artifact Patterns
// Description: Glob matching over artifact identifiers.
// Purpose: Give matchrules one compiled, case-sensitive wildcard matcher.
// Dependencies: globset
// ============================================================================

//! ## Overview
//! Artifact patterns use shell-style globs. `*` matches any run of characters
//! including `/`, so `*.py` matches `src/app.py`. Matching is case-sensitive.
//! Patterns are compiled once when a rule is parsed so malformed globs are
//! rejected before any evaluation starts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use globset::GlobBuilder;
use globset::GlobMatcher;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Characters with glob meaning in a pattern.
const GLOB_METACHARS: [char; 4] = ['*', '?', '[', '{'];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Pattern compilation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid artifact pattern '{pattern}': {reason}")]
pub struct PatternError {
    /// Offending pattern.
    pub pattern: String,
    /// Compiler message.
    pub reason: String,
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Compiled artifact pattern.
#[derive(Debug, Clone)]
pub struct ArtifactPattern {
    /// Source text.
    raw: String,
    /// Compiled matcher.
    matcher: GlobMatcher,
}

impl ArtifactPattern {
    /// Compiles a glob pattern.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] when the glob syntax is invalid.
    pub fn new(raw: &str) -> Result<Self, PatternError> {
        let glob = GlobBuilder::new(raw).literal_separator(false).build().map_err(|err| {
            PatternError {
                pattern: raw.to_string(),
                reason: err.kind().to_string(),
            }
        })?;
        Ok(Self {
            raw: raw.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    /// Returns true when the identifier matches.
    #[must_use]
    pub fn is_match(&self, artifact: &str) -> bool {
        self.matcher.is_match(artifact)
    }

    /// Returns the pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the number of glob metacharacters in `text`.
#[must_use]
pub fn metachar_count(text: &str) -> usize {
    text.chars().filter(|ch| GLOB_METACHARS.contains(ch)).count()
}

/// Returns true when `text` is a single-`*` pattern with no other metacharacters.
#[must_use]
pub fn is_single_star(text: &str) -> bool {
    metachar_count(text) == 1 && text.matches('*').count() == 1
}

/// Returns the text matched by the `*` of a single-star pattern.
#[must_use]
pub fn capture_star<'a>(pattern: &str, artifact: &'a str) -> Option<&'a str> {
    let (head, tail) = pattern.split_once('*')?;
    if artifact.len() < head.len() + tail.len() {
        return None;
    }
    artifact.strip_prefix(head)?.strip_suffix(tail)
}
