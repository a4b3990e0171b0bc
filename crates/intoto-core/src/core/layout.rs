// crates/intoto-core/src/core/layout.rs
// ============================================================================
// Module: in-toto Layout Model
// Description: Signed supply chain policy: steps, inspections, keys, expiry.
// Purpose: Define the canonical layout record and its construction-time checks.
// Dependencies: serde, serde_json, time, crate::core
// ============================================================================

//! ## Overview
//! A [`Layout`] is authored and signed by the project owner before any work
//! starts. It names the steps of the supply chain with the keys allowed to
//! sign their links, the inspections the verifier runs locally, and the rules
//! every artifact set must satisfy. [`Layout::validate`] rejects structurally
//! inconsistent layouts before any verification work begins.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::core::hashing::HashError;
use crate::core::identifiers::KeyId;
use crate::core::identifiers::StepName;
use crate::core::keys::PublicKey;
use crate::core::keys::Signature;
use crate::core::keys::signing_payload;
use crate::core::link::MetadataType;
use crate::core::matchrule::Matchrule;
use crate::core::time::parse_expiry;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Default signature threshold of a step.
const fn default_threshold() -> u32 {
    1
}

/// Planned unit of supply chain work.
///
/// # Invariants
/// - `1 <= threshold <= pubkeys.len()` once the layout is validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Unique item name; joins the step to its links.
    pub name: StepName,
    /// Rules over the link materials.
    #[serde(default)]
    pub expected_materials: Vec<Matchrule>,
    /// Rules over the link products.
    #[serde(default)]
    pub expected_products: Vec<Matchrule>,
    /// Keys authorized to sign links for this step.
    #[serde(default)]
    pub pubkeys: Vec<KeyId>,
    /// Minimum number of distinct authorized signing keys.
    #[serde(default = "default_threshold")]
    pub threshold: u32,
    /// Command the functionary is expected to run.
    #[serde(default)]
    pub expected_command: Vec<String>,
}

/// Verification-time check run locally by the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inspection {
    /// Unique item name.
    pub name: StepName,
    /// Rules over the snapshot taken before `run`.
    #[serde(default)]
    pub expected_materials: Vec<Matchrule>,
    /// Rules over the snapshot taken after `run`.
    #[serde(default)]
    pub expected_products: Vec<Matchrule>,
    /// Command executed during verification.
    pub run: Vec<String>,
}

/// Signed supply chain policy.
///
/// # Invariants
/// - Step and inspection names are unique across both lists.
/// - Every `keys` entry is stored under its computed key id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Record discriminator; always [`MetadataType::Layout`].
    #[serde(rename = "_type")]
    pub metadata_type: MetadataType,
    /// Steps in declaration order.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Inspections in declaration order.
    #[serde(default)]
    pub inspect: Vec<Inspection>,
    /// Functionary keys by key id.
    #[serde(default)]
    pub keys: BTreeMap<KeyId, PublicKey>,
    /// RFC 3339 expiry instant.
    pub expires: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub readme: String,
    /// Owner signatures over the canonical payload.
    #[serde(default)]
    pub signatures: Vec<Signature>,
}

/// Borrowed view of either item kind of a layout.
#[derive(Debug, Clone, Copy)]
pub enum LayoutItem<'a> {
    /// A step.
    Step(&'a Step),
    /// An inspection.
    Inspection(&'a Inspection),
}

impl<'a> LayoutItem<'a> {
    /// Returns the item name.
    #[must_use]
    pub const fn name(self) -> &'a StepName {
        match self {
            Self::Step(step) => &step.name,
            Self::Inspection(inspection) => &inspection.name,
        }
    }

    /// Returns the material rules.
    #[must_use]
    pub fn material_rules(self) -> &'a [Matchrule] {
        match self {
            Self::Step(step) => &step.expected_materials,
            Self::Inspection(inspection) => &inspection.expected_materials,
        }
    }

    /// Returns the product rules.
    #[must_use]
    pub fn product_rules(self) -> &'a [Matchrule] {
        match self {
            Self::Step(step) => &step.expected_products,
            Self::Inspection(inspection) => &inspection.expected_products,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Layout construction errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// Input is not valid layout JSON (including malformed rules).
    #[error("invalid layout json: {0}")]
    Parse(String),
    /// `_type` is not `layout`.
    #[error("expected _type \"layout\", found '{0}'")]
    WrongType(&'static str),
    /// A step or inspection name is empty.
    #[error("layout contains an item with an empty name")]
    EmptyName,
    /// Two items share a name.
    #[error("duplicate step or inspection name {0}")]
    DuplicateName(StepName),
    /// Threshold is zero or exceeds the authorized keys.
    #[error("step {step} has threshold {threshold} with {pubkeys} authorized keys")]
    InvalidThreshold {
        /// Step name.
        step: StepName,
        /// Declared threshold.
        threshold: u32,
        /// Number of authorized keys.
        pubkeys: usize,
    },
    /// A step authorizes a key the layout does not carry.
    #[error("step {step} authorizes unknown key {key}")]
    UnknownStepKey {
        /// Step name.
        step: StepName,
        /// Unknown key id.
        key: KeyId,
    },
    /// A key is stored under an id that does not match its content.
    #[error("key declared as {declared} has key id {computed}")]
    KeyIdMismatch {
        /// Map key.
        declared: KeyId,
        /// Computed key id.
        computed: KeyId,
    },
    /// `expires` is not RFC 3339.
    #[error("malformed expires: {0}")]
    MalformedExpiry(String),
    /// A MATCH rule references no item of the layout.
    #[error("{item} has a MATCH rule referencing unknown item {target}")]
    UnknownMatchTarget {
        /// Item holding the rule.
        item: StepName,
        /// Referenced name.
        target: StepName,
    },
    /// An inspection has no command.
    #[error("inspection {0} has an empty run command")]
    EmptyInspectionCommand(StepName),
    /// Canonical serialization failed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

// ============================================================================
// SECTION: Layout Operations
// ============================================================================

impl Layout {
    /// Parses and validates a layout from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] when the JSON is malformed or the layout is invalid.
    pub fn from_json(bytes: &[u8]) -> Result<Self, LayoutError> {
        let layout: Self =
            serde_json::from_slice(bytes).map_err(|err| LayoutError::Parse(err.to_string()))?;
        layout.validate()?;
        Ok(layout)
    }

    /// Checks all construction-time invariants.
    ///
    /// # Errors
    ///
    /// Returns the first [`LayoutError`] found.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.metadata_type != MetadataType::Layout {
            return Err(LayoutError::WrongType(self.metadata_type.as_str()));
        }
        self.expiry()?;
        for (declared, key) in &self.keys {
            let computed = key.key_id()?;
            if &computed != declared {
                return Err(LayoutError::KeyIdMismatch {
                    declared: declared.clone(),
                    computed,
                });
            }
        }
        let mut names = BTreeSet::new();
        for item in self.items() {
            let name = item.name();
            if name.as_str().is_empty() {
                return Err(LayoutError::EmptyName);
            }
            if !names.insert(name) {
                return Err(LayoutError::DuplicateName(name.clone()));
            }
        }
        for step in &self.steps {
            self.validate_step(step)?;
        }
        for inspection in &self.inspect {
            if inspection.run.is_empty() {
                return Err(LayoutError::EmptyInspectionCommand(inspection.name.clone()));
            }
        }
        for item in self.items() {
            let rules = item.material_rules().iter().chain(item.product_rules());
            for rule in rules {
                if let Some(rule) = rule.as_match()
                    && !names.contains(&rule.dest_name)
                {
                    return Err(LayoutError::UnknownMatchTarget {
                        item: item.name().clone(),
                        target: rule.dest_name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Checks step threshold and key authorization.
    fn validate_step(&self, step: &Step) -> Result<(), LayoutError> {
        let threshold_ok = usize::try_from(step.threshold)
            .is_ok_and(|threshold| (1..=step.pubkeys.len()).contains(&threshold));
        if !threshold_ok {
            return Err(LayoutError::InvalidThreshold {
                step: step.name.clone(),
                threshold: step.threshold,
                pubkeys: step.pubkeys.len(),
            });
        }
        if let Some(key) = step.pubkeys.iter().find(|key| !self.keys.contains_key(*key)) {
            return Err(LayoutError::UnknownStepKey {
                step: step.name.clone(),
                key: key.clone(),
            });
        }
        Ok(())
    }

    /// Parses the expiry instant.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::MalformedExpiry`] when `expires` is not RFC 3339.
    pub fn expiry(&self) -> Result<OffsetDateTime, LayoutError> {
        parse_expiry(&self.expires).map_err(|err| LayoutError::MalformedExpiry(err.to_string()))
    }

    /// Returns the canonical bytes covered by the owner signatures.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the record cannot be canonicalized.
    pub fn signed_payload(&self) -> Result<Vec<u8>, HashError> {
        signing_payload(self)
    }

    /// Iterates steps then inspections in declaration order.
    pub fn items(&self) -> impl Iterator<Item = LayoutItem<'_>> {
        self.steps
            .iter()
            .map(LayoutItem::Step)
            .chain(self.inspect.iter().map(LayoutItem::Inspection))
    }
}
