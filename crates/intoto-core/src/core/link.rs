// crates/intoto-core/src/core/link.rs
// ============================================================================
// Module: in-toto Link Metadata
// Description: Signed evidence that a step or inspection executed.
// Purpose: Model link records and the per-run collection of links by name.
// Dependencies: serde, serde_json, crate::core::{hashing, keys}
// ============================================================================

//! ## Overview
//! A [`Link`] records the artifacts a step consumed (materials) and produced
//! (products), the command actually run, and its byproducts. The link `name`
//! is the join key to the layout item it evidences. [`LinkSet`] groups every
//! link known to one verification run by that name; a step signed by several
//! functionaries contributes several links under one name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::hashing::ArtifactDigest;
use crate::core::hashing::HashError;
use crate::core::identifiers::KeyId;
use crate::core::identifiers::StepName;
use crate::core::keys::Signature;
use crate::core::keys::signing_payload;
use crate::core::matchrule::ArtifactKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File extension of persisted links.
pub const LINK_FILE_EXTENSION: &str = "link";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Artifact identifier to digest mapping.
pub type ArtifactSet = BTreeMap<String, ArtifactDigest>;

/// Metadata record discriminator serialized as `_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataType {
    /// Layout record.
    Layout,
    /// Link record.
    Link,
}

impl MetadataType {
    /// Returns the serialized label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Layout => "layout",
            Self::Link => "link",
        }
    }
}

/// Captured process output of a step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Byproducts {
    /// Captured standard output.
    #[serde(default)]
    pub stdout: String,
    /// Captured standard error.
    #[serde(default)]
    pub stderr: String,
    /// Process exit code, when known.
    #[serde(rename = "return-value", default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<i32>,
}

/// Signed evidence of one executed step or inspection.
///
/// # Invariants
/// - `name` matches a step or inspection of the layout being verified.
/// - Signatures cover [`Link::signed_payload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Record discriminator; always [`MetadataType::Link`].
    #[serde(rename = "_type")]
    pub metadata_type: MetadataType,
    /// Name of the evidenced step or inspection.
    pub name: StepName,
    /// Artifacts before execution.
    #[serde(default)]
    pub materials: ArtifactSet,
    /// Artifacts after execution.
    #[serde(default)]
    pub products: ArtifactSet,
    /// Captured process output.
    #[serde(default)]
    pub byproducts: Byproducts,
    /// Command that was run.
    #[serde(default)]
    pub command: Vec<String>,
    /// Signatures over the canonical payload.
    #[serde(default)]
    pub signatures: Vec<Signature>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Link record errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// Input is not valid link JSON.
    #[error("invalid link json: {0}")]
    Parse(String),
    /// `_type` is not `link`.
    #[error("expected _type \"link\", found '{0}'")]
    WrongType(&'static str),
    /// Name is empty.
    #[error("link name is empty")]
    EmptyName,
}

// ============================================================================
// SECTION: Link Operations
// ============================================================================

impl Link {
    /// Creates an unsigned link with no artifacts.
    #[must_use]
    pub fn new(name: impl Into<StepName>) -> Self {
        Self {
            metadata_type: MetadataType::Link,
            name: name.into(),
            materials: ArtifactSet::new(),
            products: ArtifactSet::new(),
            byproducts: Byproducts::default(),
            command: Vec::new(),
            signatures: Vec::new(),
        }
    }

    /// Parses and validates a link from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError`] when the JSON is malformed or the record is invalid.
    pub fn from_json(bytes: &[u8]) -> Result<Self, LinkError> {
        let link: Self =
            serde_json::from_slice(bytes).map_err(|err| LinkError::Parse(err.to_string()))?;
        link.validate()?;
        Ok(link)
    }

    /// Checks structural invariants of the record.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError`] when `_type` or `name` is invalid.
    pub fn validate(&self) -> Result<(), LinkError> {
        if self.metadata_type != MetadataType::Link {
            return Err(LinkError::WrongType(self.metadata_type.as_str()));
        }
        if self.name.as_str().is_empty() {
            return Err(LinkError::EmptyName);
        }
        Ok(())
    }

    /// Returns the canonical bytes covered by the link signatures.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the record cannot be canonicalized.
    pub fn signed_payload(&self) -> Result<Vec<u8>, HashError> {
        signing_payload(self)
    }

    /// Returns the requested artifact set.
    #[must_use]
    pub const fn artifacts(&self, kind: ArtifactKind) -> &ArtifactSet {
        match kind {
            ArtifactKind::Materials => &self.materials,
            ArtifactKind::Products => &self.products,
        }
    }

    /// Returns the conventional filename for a link signed by `key_id`.
    #[must_use]
    pub fn file_name(&self, key_id: &KeyId) -> String {
        format!("{}.{}.{LINK_FILE_EXTENSION}", self.name, key_id.short())
    }
}

/// Splits a conventional link filename into its step name and short key id.
#[must_use]
pub fn parse_link_file_name(file_name: &str) -> Option<(StepName, &str)> {
    let stem = file_name.strip_suffix(LINK_FILE_EXTENSION)?.strip_suffix('.')?;
    let (name, short_id) = stem.rsplit_once('.')?;
    if name.is_empty() || short_id.is_empty() {
        return None;
    }
    Some((StepName::new(name), short_id))
}

// ============================================================================
// SECTION: Link Set
// ============================================================================

/// Links available to one verification run, grouped by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSet(BTreeMap<StepName, Vec<Link>>);

impl LinkSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds a link under its own name.
    pub fn insert(&mut self, link: Link) {
        self.0.entry(link.name.clone()).or_default().push(link);
    }

    /// Replaces every link recorded under `link.name` with `link`.
    pub fn replace(&mut self, link: Link) {
        self.0.insert(link.name.clone(), vec![link]);
    }

    /// Returns the links recorded for a name.
    #[must_use]
    pub fn get(&self, name: &StepName) -> &[Link] {
        self.0.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the first link recorded for a name.
    #[must_use]
    pub fn first(&self, name: &StepName) -> Option<&Link> {
        self.get(name).first()
    }

    /// Returns the number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no link is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates names with their links in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&StepName, &[Link])> {
        self.0.iter().map(|(name, links)| (name, links.as_slice()))
    }
}

impl FromIterator<Link> for LinkSet {
    fn from_iter<I: IntoIterator<Item = Link>>(iter: I) -> Self {
        let mut set = Self::new();
        for link in iter {
            set.insert(link);
        }
        set
    }
}
