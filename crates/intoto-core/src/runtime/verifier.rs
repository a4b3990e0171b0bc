// crates/intoto-core/src/runtime/verifier.rs
// ============================================================================
// Module: in-toto Layout Verifier
// Description: Verification state machine over a layout and its link evidence.
// Purpose: Turn trust, inspection, and rule checks into one pass/fail report.
// Dependencies: serde, thiserror, time, crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! [`LayoutVerifier`] owns a validated layout, the owner keys that must have
//! signed it, and the collaborators it needs. Each call to
//! [`LayoutVerifier::verify`] is an independent run over an immutable link
//! set and an explicit verification instant:
//!
//! `Start -> LayoutLoaded -> TrustVerified -> InspectionsRun -> RulesVerified -> Pass`
//!
//! The first fatal failure ends the run in `Fail`; nothing is retried or
//! partially accepted. Inspection links exist only for the run that made them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;
use serde::Serializer;
use thiserror::Error;
use time::OffsetDateTime;

use crate::core::ArtifactKind;
use crate::core::CommandMismatch;
use crate::core::Inspection;
use crate::core::KeyId;
use crate::core::Layout;
use crate::core::LayoutError;
use crate::core::Link;
use crate::core::LinkSet;
use crate::core::PublicKey;
use crate::core::StepName;
use crate::core::VerificationAuditEvent;
use crate::core::VerificationState;
use crate::core::VerificationStatus;
use crate::interfaces::ArtifactHasher;
use crate::interfaces::CommandRunner;
use crate::interfaces::NoopAuditSink;
use crate::interfaces::SignatureVerifier;
use crate::interfaces::VerificationAuditSink;
use crate::runtime::rules::ResolvedLinks;
use crate::runtime::rules::RuleContext;
use crate::runtime::rules::RuleFailure;
use crate::runtime::rules::RuleVerificationError;
use crate::runtime::rules::verify_rules;
use crate::runtime::trust::OwnerSignaturePolicy;
use crate::runtime::trust::TrustError;
use crate::runtime::trust::check_expiry;
use crate::runtime::trust::command_alignment;
use crate::runtime::trust::verify_layout_signatures;
use crate::runtime::trust::verify_step_links;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Name of the summary link returned by a passing run.
pub const SUMMARY_LINK_NAME: &str = "summary";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Runtime configuration for the layout verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierConfig {
    /// How many owner keys must have signed the layout.
    pub owner_policy: OwnerSignaturePolicy,
    /// Whether a non-zero inspection exit code fails verification.
    pub enforce_inspection_exit_code: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            owner_policy: OwnerSignaturePolicy::AnyOwner,
            enforce_inspection_exit_code: true,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal verification failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Command mismatches are findings, never errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// A rule could not be interpreted.
    #[error("malformed rule: {0}")]
    MalformedRule(String),
    /// A rule's condition did not hold.
    #[error("rule verification failed: {0}")]
    RuleVerificationFailed(RuleVerificationError),
    /// Layout or link signatures did not verify or met no threshold.
    #[error("signature verification failed: {0}")]
    SignatureVerification(TrustError),
    /// Layout expired before the verification instant.
    #[error("layout expired at {expires}")]
    LayoutExpired {
        /// Layout `expires` value.
        expires: String,
    },
    /// A step has no link evidence.
    #[error("no link found for step {0}")]
    MissingLink(StepName),
    /// Layout failed construction-time validation.
    #[error("invalid layout: {0}")]
    InvalidLayout(LayoutError),
    /// A link record is structurally invalid.
    #[error("invalid link for {name}: {reason}")]
    InvalidLink {
        /// Link name.
        name: StepName,
        /// Validation message.
        reason: String,
    },
    /// Links contributing to a step threshold disagree on artifacts.
    #[error("threshold constraint failed: {0}")]
    ThresholdConstraint(TrustError),
    /// An inspection command exited unsuccessfully.
    #[error(
        "inspection {name} failed with return value {}",
        return_value_text(.return_value.as_ref())
    )]
    InspectionFailed {
        /// Inspection name.
        name: StepName,
        /// Exit code, when the process reported one.
        return_value: Option<i32>,
    },
    /// A hashing or command collaborator failed.
    #[error("{item}: {reason}")]
    Collaborator {
        /// Item being processed.
        item: StepName,
        /// Collaborator message.
        reason: String,
    },
}

impl VerificationError {
    /// Returns a stable snake case label for the failure kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRule(_) => "malformed_rule",
            Self::RuleVerificationFailed(_) => "rule_verification_failed",
            Self::SignatureVerification(_) => "signature_verification",
            Self::LayoutExpired {
                ..
            } => "layout_expired",
            Self::MissingLink(_) => "missing_link",
            Self::InvalidLayout(_) => "invalid_layout",
            Self::InvalidLink {
                ..
            } => "invalid_link",
            Self::ThresholdConstraint(_) => "threshold_constraint",
            Self::InspectionFailed {
                ..
            } => "inspection_failed",
            Self::Collaborator {
                ..
            } => "collaborator",
        }
    }
}

impl From<TrustError> for VerificationError {
    fn from(err: TrustError) -> Self {
        match err {
            TrustError::LayoutExpired {
                expires,
            } => Self::LayoutExpired {
                expires,
            },
            TrustError::MalformedExpiry(reason) => {
                Self::InvalidLayout(LayoutError::MalformedExpiry(reason))
            }
            TrustError::ThresholdConstraint {
                ..
            } => Self::ThresholdConstraint(err),
            TrustError::NoOwnerKeys
            | TrustError::LayoutSignature(_)
            | TrustError::Threshold {
                ..
            }
            | TrustError::Payload(_) => Self::SignatureVerification(err),
        }
    }
}

impl From<RuleVerificationError> for VerificationError {
    fn from(err: RuleVerificationError) -> Self {
        if matches!(err.reason, RuleFailure::InvalidPattern(_)) {
            Self::MalformedRule(err.to_string())
        } else {
            Self::RuleVerificationFailed(err)
        }
    }
}

/// Renders an optional exit code.
fn return_value_text(return_value: Option<&i32>) -> String {
    return_value.map_or_else(|| "none".to_string(), ToString::to_string)
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Keys that satisfied a step threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepSigners {
    /// Step name.
    pub step: StepName,
    /// Distinct authorized keys with a valid signature.
    pub signers: Vec<KeyId>,
}

/// Outcome of one verification run.
///
/// # Invariants
/// - `status` is `Pass` exactly when `failure` is `None`.
/// - `reached_state` is `Pass` on success, otherwise the last state completed
///   before the failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// Final status.
    pub status: VerificationStatus,
    /// Last state the run completed.
    pub reached_state: VerificationState,
    /// First fatal failure.
    #[serde(serialize_with = "serialize_failure")]
    pub failure: Option<VerificationError>,
    /// Advisory command mismatches.
    pub command_mismatches: Vec<CommandMismatch>,
    /// Steps whose thresholds were met.
    pub verified_steps: Vec<StepSigners>,
    /// Summary link of a passing run.
    pub summary: Option<Link>,
}

impl VerificationReport {
    /// Returns true when the run passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == VerificationStatus::Pass
    }
}

/// Serialized form of a failure.
#[derive(Serialize)]
struct FailureRecord {
    /// Failure kind label.
    kind: &'static str,
    /// Display message.
    message: String,
}

/// Serializes a failure as `{kind, message}`.
#[allow(clippy::ref_option, reason = "Signature is fixed by serde serialize_with.")]
fn serialize_failure<S: Serializer>(
    failure: &Option<VerificationError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    failure
        .as_ref()
        .map(|err| FailureRecord {
            kind: err.kind(),
            message: err.to_string(),
        })
        .serialize(serializer)
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Mutable bookkeeping of one run.
struct RunProgress {
    /// Verification instant.
    at: OffsetDateTime,
    /// Last completed state.
    reached: VerificationState,
    /// Collected command mismatches.
    command_mismatches: Vec<CommandMismatch>,
    /// Steps whose thresholds were met.
    verified_steps: Vec<StepSigners>,
}

/// Layout verification engine.
pub struct LayoutVerifier<V, H, R> {
    /// Validated layout.
    layout: Layout,
    /// Keys of the layout owners.
    owner_keys: Vec<PublicKey>,
    /// Signature verification capability.
    signatures: V,
    /// Artifact hashing capability for inspections.
    hasher: H,
    /// Command execution capability for inspections.
    runner: R,
    /// Audit sink.
    audit: Arc<dyn VerificationAuditSink>,
    /// Runtime configuration.
    config: VerifierConfig,
}

impl<V, H, R> LayoutVerifier<V, H, R>
where
    V: SignatureVerifier,
    H: ArtifactHasher,
    R: CommandRunner,
{
    /// Creates a verifier after validating the layout.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::InvalidLayout`] when the layout is invalid.
    pub fn new(
        layout: Layout,
        owner_keys: Vec<PublicKey>,
        signatures: V,
        hasher: H,
        runner: R,
        config: VerifierConfig,
    ) -> Result<Self, VerificationError> {
        layout.validate().map_err(VerificationError::InvalidLayout)?;
        Ok(Self {
            layout,
            owner_keys,
            signatures,
            hasher,
            runner,
            audit: Arc::new(NoopAuditSink),
            config,
        })
    }

    /// Routes audit events to `sink`.
    #[must_use]
    pub fn with_audit_sink(mut self, sink: Arc<dyn VerificationAuditSink>) -> Self {
        self.audit = sink;
        self
    }

    /// Returns the layout under verification.
    #[must_use]
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Verifies `links` against the layout at instant `at`.
    #[must_use]
    pub fn verify(&self, links: &LinkSet, at: OffsetDateTime) -> VerificationReport {
        let mut progress = RunProgress {
            at,
            reached: VerificationState::Start,
            command_mismatches: Vec::new(),
            verified_steps: Vec::new(),
        };
        self.audit.record(&VerificationAuditEvent::transition(at, VerificationState::Start));
        let outcome = self.run(links, &mut progress);
        let (status, failure, summary) = match outcome {
            Ok(summary) => (VerificationStatus::Pass, None, Some(summary)),
            Err(err) => (VerificationStatus::Fail, Some(err), None),
        };
        self.audit.record(&VerificationAuditEvent::outcome(
            at,
            progress.reached,
            status,
            failure.as_ref().map(ToString::to_string),
        ));
        VerificationReport {
            status,
            reached_state: match status {
                VerificationStatus::Pass => VerificationState::Pass,
                VerificationStatus::Fail => progress.reached,
            },
            failure,
            command_mismatches: progress.command_mismatches,
            verified_steps: progress.verified_steps,
            summary,
        }
    }

    /// Executes the state machine, returning the summary link.
    fn run(&self, links: &LinkSet, progress: &mut RunProgress) -> Result<Link, VerificationError> {
        self.load_links(links)?;
        self.advance(progress, VerificationState::LayoutLoaded);

        let mut resolved = self.verify_trust(links, progress)?;
        self.advance(progress, VerificationState::TrustVerified);

        for inspection in &self.layout.inspect {
            let link = self.run_inspection(inspection, progress.at)?;
            resolved.insert(link.name.clone(), link);
        }
        self.advance(progress, VerificationState::InspectionsRun);

        self.verify_item_rules(&resolved)?;
        self.advance(progress, VerificationState::RulesVerified);

        Ok(self.summary_link(&resolved))
    }

    /// Records a completed state.
    fn advance(&self, progress: &mut RunProgress, state: VerificationState) {
        progress.reached = state;
        self.audit.record(&VerificationAuditEvent::transition(progress.at, state));
    }

    /// Checks that every step has structurally valid link evidence.
    fn load_links(&self, links: &LinkSet) -> Result<(), VerificationError> {
        for step in &self.layout.steps {
            let step_links = links.get(&step.name);
            if step_links.is_empty() {
                return Err(VerificationError::MissingLink(step.name.clone()));
            }
            for link in step_links {
                link.validate().map_err(|err| VerificationError::InvalidLink {
                    name: step.name.clone(),
                    reason: err.to_string(),
                })?;
            }
        }
        Ok(())
    }

    /// Verifies expiry, owner signatures, and step thresholds.
    fn verify_trust(
        &self,
        links: &LinkSet,
        progress: &mut RunProgress,
    ) -> Result<ResolvedLinks, VerificationError> {
        check_expiry(&self.layout, progress.at)?;
        verify_layout_signatures(
            &self.layout,
            &self.owner_keys,
            self.config.owner_policy,
            &self.signatures,
        )?;
        let mut resolved = ResolvedLinks::new();
        for step in &self.layout.steps {
            let verified =
                verify_step_links(step, links.get(&step.name), &self.layout, &self.signatures)?;
            if let Some(mismatch) = command_alignment(step, &verified.link) {
                let event = VerificationAuditEvent::command_mismatch(progress.at, &mismatch);
                self.audit.record(&event);
                progress.command_mismatches.push(mismatch);
            }
            progress.verified_steps.push(StepSigners {
                step: step.name.clone(),
                signers: verified.signers,
            });
            resolved.insert(step.name.clone(), verified.link);
        }
        Ok(resolved)
    }

    /// Runs one inspection and records its ephemeral link.
    fn run_inspection(
        &self,
        inspection: &Inspection,
        at: OffsetDateTime,
    ) -> Result<Link, VerificationError> {
        let collaborator = |reason: String| VerificationError::Collaborator {
            item: inspection.name.clone(),
            reason,
        };
        let materials = self.hasher.snapshot().map_err(|err| collaborator(err.to_string()))?;
        let byproducts =
            self.runner.run(&inspection.run).map_err(|err| collaborator(err.to_string()))?;
        let products = self.hasher.snapshot().map_err(|err| collaborator(err.to_string()))?;
        let return_value = byproducts.return_value;
        self.audit.record(&VerificationAuditEvent::inspection_run(
            at,
            &inspection.name,
            return_value,
        ));
        if self.config.enforce_inspection_exit_code && return_value != Some(0) {
            return Err(VerificationError::InspectionFailed {
                name: inspection.name.clone(),
                return_value,
            });
        }
        Ok(Link {
            materials,
            products,
            byproducts,
            command: inspection.run.clone(),
            ..Link::new(inspection.name.clone())
        })
    }

    /// Verifies material and product rules of every item in declaration order.
    fn verify_item_rules(&self, resolved: &ResolvedLinks) -> Result<(), VerificationError> {
        for item in self.layout.items() {
            let Some(link) = resolved.get(item.name()) else {
                return Err(VerificationError::MissingLink(item.name().clone()));
            };
            let materials = RuleContext::for_link(link, ArtifactKind::Materials, resolved);
            verify_rules(item.material_rules(), &materials)?;
            let products = RuleContext::for_link(link, ArtifactKind::Products, resolved);
            verify_rules(item.product_rules(), &products)?;
        }
        Ok(())
    }

    /// Builds the summary link from the first and last steps.
    fn summary_link(&self, resolved: &ResolvedLinks) -> Link {
        let mut summary = Link::new(SUMMARY_LINK_NAME);
        let first = self.layout.steps.first().and_then(|step| resolved.get(&step.name));
        let last = self.layout.steps.last().and_then(|step| resolved.get(&step.name));
        if let Some(first) = first {
            summary.materials = first.materials.clone();
        }
        if let Some(last) = last {
            summary.products = last.products.clone();
            summary.byproducts = last.byproducts.clone();
            summary.command = last.command.clone();
        }
        summary
    }
}
