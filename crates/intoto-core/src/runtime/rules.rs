// crates/intoto-core/src/runtime/rules.rs
// ============================================================================
// Module: in-toto Rule Verification
// Description: Queue-consumption evaluation of matchrules over artifact sets.
// Purpose: Decide whether a rule list fully accounts for one artifact set.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Rule verification starts from a queue holding every artifact identifier of
//! the checked set (the materials or the products of one link) and applies
//! rules in declared order. Each rule either consumes the identifiers it
//! accounts for or fails. Identifiers left in the queue after the last rule
//! are a failure: an artifact nobody declared is never accepted.
//!
//! A MATCH rule must find at least one queued artifact under its pattern and
//! at least one destination artifact under its target.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::core::ArtifactKind;
use crate::core::ArtifactSet;
use crate::core::Link;
use crate::core::MatchRule;
use crate::core::Matchrule;
use crate::core::ParsedRule;
use crate::core::StepName;
use crate::core::pattern::ArtifactPattern;
use crate::core::pattern::capture_star;
use crate::core::pattern::metachar_count;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One link per step or inspection, as selected for rule verification.
pub type ResolvedLinks = BTreeMap<StepName, Link>;

/// Inputs for verifying one artifact set.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// Step or inspection owning the rules.
    pub item: &'a StepName,
    /// Artifact set the queue is built from.
    pub kind: ArtifactKind,
    /// Materials of the item's link.
    pub materials: &'a ArtifactSet,
    /// Products of the item's link.
    pub products: &'a ArtifactSet,
    /// Links available to MATCH rules.
    pub links: &'a ResolvedLinks,
}

impl<'a> RuleContext<'a> {
    /// Builds a context for one artifact set of `link`.
    #[must_use]
    pub const fn for_link(link: &'a Link, kind: ArtifactKind, links: &'a ResolvedLinks) -> Self {
        Self {
            item: &link.name,
            kind,
            materials: &link.materials,
            products: &link.products,
            links,
        }
    }

    /// Returns the artifact set the queue is built from.
    const fn checked_set(&self) -> &'a ArtifactSet {
        match self.kind {
            ArtifactKind::Materials => self.materials,
            ArtifactKind::Products => self.products,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Why a rule did not hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleFailure {
    /// CREATE pattern matched nothing.
    NothingCreated,
    /// CREATE matched artifacts present in materials or absent from products.
    NotCreated,
    /// DELETE matched artifacts absent from materials or present in products.
    NotDeleted,
    /// MODIFY matched artifacts missing on one side or with equal digests.
    NotModified,
    /// DISALLOW matched artifacts.
    Disallowed,
    /// MATCH references a name with no link.
    MissingLink(StepName),
    /// MATCH pattern resolves to nothing in the queue.
    NoSourceArtifacts,
    /// MATCH target pattern resolves to nothing in the destination set.
    NoTargetArtifacts,
    /// MATCH destination artifact does not exist.
    MissingTarget(String),
    /// MATCH destination artifact has a different digest.
    DigestMismatch(String),
    /// Artifacts were not accounted for by any rule.
    Unconsumed,
    /// Pattern could not be compiled.
    InvalidPattern(String),
}

impl fmt::Display for RuleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingCreated => f.write_str("pattern matched no created artifact"),
            Self::NotCreated => {
                f.write_str("artifacts must be absent from materials and present in products")
            }
            Self::NotDeleted => {
                f.write_str("artifacts must be present in materials and absent from products")
            }
            Self::NotModified => {
                f.write_str("artifacts must be in materials and products with different digests")
            }
            Self::Disallowed => f.write_str("artifacts are disallowed"),
            Self::MissingLink(name) => write!(f, "no link recorded for {name}"),
            Self::NoSourceArtifacts => f.write_str("no queued artifact matches the pattern"),
            Self::NoTargetArtifacts => f.write_str("no destination artifact matches the target"),
            Self::MissingTarget(target) => write!(f, "destination artifact {target} not found"),
            Self::DigestMismatch(target) => {
                write!(f, "digest differs from destination artifact {target}")
            }
            Self::Unconsumed => f.write_str("artifacts not accounted for by any rule"),
            Self::InvalidPattern(reason) => write!(f, "invalid pattern: {reason}"),
        }
    }
}

/// A matchrule's semantic condition was not satisfied.
///
/// # Invariants
/// - `rule` is `None` only for [`RuleFailure::Unconsumed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{item} {kind} failed{}: {reason} [{}]",
    .rule.as_ref().map(|text| format!(" rule '{text}'")).unwrap_or_default(),
    .artifacts.join(", ")
)]
pub struct RuleVerificationError {
    /// Step or inspection owning the rule.
    pub item: StepName,
    /// Artifact set under verification.
    pub kind: ArtifactKind,
    /// Offending rule in canonical token form.
    pub rule: Option<String>,
    /// Offending artifact identifiers.
    pub artifacts: Vec<String>,
    /// Failure reason.
    pub reason: RuleFailure,
}

/// Rule-local failure before item context is attached.
struct Violation {
    /// Failure reason.
    reason: RuleFailure,
    /// Offending artifacts.
    artifacts: Vec<String>,
}

impl Violation {
    /// Builds a violation.
    const fn new(reason: RuleFailure, artifacts: Vec<String>) -> Self {
        Self {
            reason,
            artifacts,
        }
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Verifies an ordered rule list against one artifact set.
///
/// # Errors
///
/// Returns [`RuleVerificationError`] for the first failing rule, or when
/// artifacts remain unconsumed after the last rule.
pub fn verify_rules(
    rules: &[Matchrule],
    ctx: &RuleContext<'_>,
) -> Result<(), RuleVerificationError> {
    let mut queue: BTreeSet<String> = ctx.checked_set().keys().cloned().collect();
    for rule in rules {
        let consumed = evaluate_rule(rule, &queue, ctx).map_err(|violation| {
            RuleVerificationError {
                item: ctx.item.clone(),
                kind: ctx.kind,
                rule: Some(rule.to_string()),
                artifacts: violation.artifacts,
                reason: violation.reason,
            }
        })?;
        queue.retain(|artifact| !consumed.contains(artifact));
    }
    if queue.is_empty() {
        return Ok(());
    }
    Err(RuleVerificationError {
        item: ctx.item.clone(),
        kind: ctx.kind,
        rule: None,
        artifacts: queue.into_iter().collect(),
        reason: RuleFailure::Unconsumed,
    })
}

/// Evaluates one rule and returns the identifiers it consumes.
fn evaluate_rule(
    rule: &Matchrule,
    queue: &BTreeSet<String>,
    ctx: &RuleContext<'_>,
) -> Result<BTreeSet<String>, Violation> {
    match rule.parsed() {
        ParsedRule::Match(rule) => evaluate_match(rule, queue, ctx),
        ParsedRule::Create {
            pattern,
        } => {
            let matches = matching(pattern, queue)?;
            if matches.is_empty() && pattern != "*" {
                return Err(Violation::new(RuleFailure::NothingCreated, Vec::new()));
            }
            require_each(matches, RuleFailure::NotCreated, |artifact| {
                !ctx.materials.contains_key(artifact) && ctx.products.contains_key(artifact)
            })
        }
        ParsedRule::Delete {
            pattern,
        } => require_each(matching(pattern, queue)?, RuleFailure::NotDeleted, |artifact| {
            ctx.materials.contains_key(artifact) && !ctx.products.contains_key(artifact)
        }),
        ParsedRule::Modify {
            pattern,
        } => require_each(matching(pattern, queue)?, RuleFailure::NotModified, |artifact| {
            match (ctx.materials.get(artifact), ctx.products.get(artifact)) {
                (Some(before), Some(after)) => before != after,
                _ => false,
            }
        }),
        ParsedRule::Allow {
            pattern,
        } => matching(pattern, queue),
        ParsedRule::Disallow {
            pattern,
        } => require_each(matching(pattern, queue)?, RuleFailure::Disallowed, |_| false),
    }
}

/// Evaluates a MATCH rule against the referenced link.
fn evaluate_match(
    rule: &MatchRule,
    queue: &BTreeSet<String>,
    ctx: &RuleContext<'_>,
) -> Result<BTreeSet<String>, Violation> {
    let Some(link) = ctx.links.get(&rule.dest_name) else {
        return Err(Violation::new(RuleFailure::MissingLink(rule.dest_name.clone()), Vec::new()));
    };
    let targets = link.artifacts(rule.dest_type);
    let source_prefix = directory_prefix(&rule.source_prefix);
    let dest_prefix = directory_prefix(&rule.dest_prefix);

    let target_pattern = compile(rule.target_pattern())?;
    let has_target = targets.keys().any(|name| {
        name.strip_prefix(dest_prefix.as_str()).is_some_and(|rest| target_pattern.is_match(rest))
    });
    if !has_target {
        return Err(Violation::new(RuleFailure::NoTargetArtifacts, Vec::new()));
    }

    let pattern = compile(&rule.pattern)?;
    let mut consumed = BTreeSet::new();
    for artifact in queue {
        let Some(relative) = artifact.strip_prefix(source_prefix.as_str()) else {
            continue;
        };
        if !pattern.is_match(relative) {
            continue;
        }
        let target = format!("{dest_prefix}{}", target_name(rule, relative));
        let Some(expected) = targets.get(&target) else {
            return Err(Violation::new(RuleFailure::MissingTarget(target), vec![artifact.clone()]));
        };
        if ctx.checked_set().get(artifact) != Some(expected) {
            return Err(Violation::new(RuleFailure::DigestMismatch(target), vec![artifact.clone()]));
        }
        consumed.insert(artifact.clone());
    }
    if consumed.is_empty() {
        return Err(Violation::new(RuleFailure::NoSourceArtifacts, Vec::new()));
    }
    Ok(consumed)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Compiles a rule pattern.
fn compile(pattern: &str) -> Result<ArtifactPattern, Violation> {
    ArtifactPattern::new(pattern)
        .map_err(|err| Violation::new(RuleFailure::InvalidPattern(err.reason), Vec::new()))
}

/// Returns the queued identifiers matching `pattern`.
fn matching(pattern: &str, queue: &BTreeSet<String>) -> Result<BTreeSet<String>, Violation> {
    let pattern = compile(pattern)?;
    Ok(queue.iter().filter(|artifact| pattern.is_match(artifact)).cloned().collect())
}

/// Consumes `matches` when `accept` holds for each, else fails with `reason`.
fn require_each(
    matches: BTreeSet<String>,
    reason: RuleFailure,
    accept: impl Fn(&str) -> bool,
) -> Result<BTreeSet<String>, Violation> {
    let rejected: Vec<String> =
        matches.iter().filter(|artifact| !accept(artifact)).cloned().collect();
    if rejected.is_empty() {
        return Ok(matches);
    }
    Err(Violation::new(reason, rejected))
}

/// Normalizes a MATCH prefix to end with `/` when non-empty.
fn directory_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}

/// Computes the destination name of a matched source path (without prefix).
fn target_name(rule: &MatchRule, relative: &str) -> String {
    match &rule.rename {
        None => relative.to_string(),
        Some(target) if metachar_count(target) == 0 => target.clone(),
        Some(target) => capture_star(&rule.pattern, relative)
            .map_or_else(|| target.clone(), |captured| target.replacen('*', captured, 1)),
    }
}
