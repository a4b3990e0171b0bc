// crates/intoto-core/src/core/matchrule.rs
// ============================================================================
// Module: in-toto Matchrules
// Description: Typed artifact rules and their token grammar.
// Purpose: Parse rule token sequences into validated rules, failing fast.
// Dependencies: serde, crate::core::pattern
// ============================================================================

//! ## Overview
//! A matchrule constrains one artifact set (the materials or the products of a
//! step). Rules travel as JSON arrays of string tokens and are parsed into a
//! [`ParsedRule`] as soon as they are deserialized, so malformed rules never
//! reach evaluation. A [`Matchrule`] keeps the tokens exactly as authored and
//! serializes them back unchanged, so a signed layout keeps its payload.
//!
//! ### Grammar
//! - Generic rules: `CREATE|DELETE|MODIFY|ALLOW|DISALLOW <pattern>`
//! - Cross-step rules:
//!   `MATCH <pattern> [IN <src>] WITH (MATERIALS|PRODUCTS) [IN <dst>] FROM <name> [AS <target>]`
//! - Shorthand: `MATCH (MATERIAL|PRODUCT) <pattern> FROM <name>`, normalized to
//!   the full form.
//!
//! Keywords and the destination type are case-insensitive. Patterns, prefixes,
//! and names are kept verbatim.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Error as _;
use thiserror::Error;

use crate::core::identifiers::StepName;
use crate::core::pattern::ArtifactPattern;
use crate::core::pattern::is_single_star;
use crate::core::pattern::metachar_count;

// ============================================================================
// SECTION: Rule Kinds
// ============================================================================

/// Discriminant of a matchrule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleKind {
    /// Cross-reference another link's artifacts.
    Match,
    /// Artifact is new in this step.
    Create,
    /// Artifact is removed by this step.
    Delete,
    /// Artifact changes in this step.
    Modify,
    /// Artifact may be present without further checks.
    Allow,
    /// Artifact must not be present.
    Disallow,
}

impl RuleKind {
    /// Returns the canonical keyword.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Match => "MATCH",
            Self::Create => "CREATE",
            Self::Delete => "DELETE",
            Self::Modify => "MODIFY",
            Self::Allow => "ALLOW",
            Self::Disallow => "DISALLOW",
        }
    }

    /// Resolves a keyword case-insensitively.
    #[must_use]
    pub fn from_keyword(token: &str) -> Option<Self> {
        [Self::Match, Self::Create, Self::Delete, Self::Modify, Self::Allow, Self::Disallow]
            .into_iter()
            .find(|kind| kind.keyword().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Which artifact set of a link a rule refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// State before the step ran.
    Materials,
    /// State after the step ran.
    Products,
}

impl ArtifactKind {
    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Materials => "materials",
            Self::Products => "products",
        }
    }

    /// Case-folds a destination type token.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("materials") {
            Some(Self::Materials)
        } else if token.eq_ignore_ascii_case("products") {
            Some(Self::Products)
        } else {
            None
        }
    }

    /// Case-folds a shorthand singular token (`MATERIAL` or `PRODUCT`).
    fn from_singular(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("material") {
            Some(Self::Materials)
        } else if token.eq_ignore_ascii_case("product") {
            Some(Self::Products)
        } else {
            None
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Rule Types
// ============================================================================

/// Parameters of a `MATCH` rule.
///
/// # Invariants
/// - `pattern` compiles as a glob and `dest_name` is non-empty.
/// - `rename`, when present, is a literal or a single-`*` target paired with a
///   single-`*` pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRule {
    /// Pattern applied to queued artifacts after the source prefix is removed.
    pub pattern: String,
    /// Prefix stripped from queued artifacts (empty when absent).
    pub source_prefix: String,
    /// Artifact set of the referenced link.
    pub dest_type: ArtifactKind,
    /// Prefix prepended to form the destination name (empty when absent).
    pub dest_prefix: String,
    /// Referenced step or inspection.
    pub dest_name: StepName,
    /// Optional `AS` target.
    pub rename: Option<String>,
}

impl MatchRule {
    /// Returns the target pattern, which defaults to the source pattern.
    #[must_use]
    pub fn target_pattern(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.pattern)
    }
}

/// Parsed form of an artifact rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRule {
    /// `MATCH` rule.
    Match(MatchRule),
    /// `CREATE <pattern>`.
    Create {
        /// Artifact pattern.
        pattern: String,
    },
    /// `DELETE <pattern>`.
    Delete {
        /// Artifact pattern.
        pattern: String,
    },
    /// `MODIFY <pattern>`.
    Modify {
        /// Artifact pattern.
        pattern: String,
    },
    /// `ALLOW <pattern>`.
    Allow {
        /// Artifact pattern.
        pattern: String,
    },
    /// `DISALLOW <pattern>`.
    Disallow {
        /// Artifact pattern.
        pattern: String,
    },
}

/// An artifact rule as authored in a layout.
///
/// # Invariants
/// - `authored` parses to `parsed`.
/// - Serialization emits `authored` unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matchrule {
    /// Tokens as written, keyword case and shorthand included.
    authored: Vec<String>,
    /// Rule the tokens parse to.
    parsed: ParsedRule,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Rule syntax errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRule {
    /// No tokens were supplied.
    #[error("matchrule is empty")]
    Empty,
    /// First token is not a rule keyword.
    #[error("unknown matchrule kind '{found}'")]
    UnknownKind {
        /// Token seen in keyword position.
        found: String,
    },
    /// Generic rule does not have exactly two tokens.
    #[error("{kind} rule expects 2 tokens, found {found}")]
    GenericArity {
        /// Rule kind.
        kind: RuleKind,
        /// Token count seen.
        found: usize,
    },
    /// MATCH tokens fit none of the recognized layouts.
    #[error("MATCH rule does not fit a recognized layout: {rule}")]
    MatchLayout {
        /// Tokens joined by spaces.
        rule: String,
    },
    /// Destination type is not materials or products.
    #[error("invalid MATCH destination type '{found}', expected MATERIALS or PRODUCTS")]
    DestinationType {
        /// Token seen in destination type position.
        found: String,
    },
    /// A required field is empty.
    #[error("{kind} rule has an empty {field}")]
    EmptyField {
        /// Rule kind.
        kind: RuleKind,
        /// Field name.
        field: &'static str,
    },
    /// Pattern is not a valid glob.
    #[error("{kind} rule has an invalid pattern: {reason}")]
    InvalidPattern {
        /// Rule kind.
        kind: RuleKind,
        /// Compiler message.
        reason: String,
    },
    /// `AS` target cannot be derived from the source pattern.
    #[error("invalid AS target '{target}': {reason}")]
    InvalidRename {
        /// Target text.
        target: String,
        /// Why the target was rejected.
        reason: &'static str,
    },
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Returns true when `token` equals `keyword` ignoring ASCII case.
fn is_keyword(token: &str, keyword: &str) -> bool {
    token.eq_ignore_ascii_case(keyword)
}

/// Positions of the optional clauses of a MATCH layout.
struct MatchLayout {
    /// Index of the source prefix token, if any.
    source_prefix: Option<usize>,
    /// Index of the destination type token.
    dest_type: usize,
    /// Index of the destination prefix token, if any.
    dest_prefix: Option<usize>,
    /// Index of the destination name token.
    dest_name: usize,
}

/// Recognized MATCH layouts without the trailing `AS` clause.
///
/// Each entry lists `(keyword index, keyword)` pairs and the field positions.
const MATCH_LAYOUTS: [(&[(usize, &str)], MatchLayout); 4] = [
    (
        &[(2, "WITH"), (4, "FROM")],
        MatchLayout {
            source_prefix: None,
            dest_type: 3,
            dest_prefix: None,
            dest_name: 5,
        },
    ),
    (
        &[(2, "IN"), (4, "WITH"), (6, "FROM")],
        MatchLayout {
            source_prefix: Some(3),
            dest_type: 5,
            dest_prefix: None,
            dest_name: 7,
        },
    ),
    (
        &[(2, "WITH"), (4, "IN"), (6, "FROM")],
        MatchLayout {
            source_prefix: None,
            dest_type: 3,
            dest_prefix: Some(5),
            dest_name: 7,
        },
    ),
    (
        &[(2, "IN"), (4, "WITH"), (6, "IN"), (8, "FROM")],
        MatchLayout {
            source_prefix: Some(3),
            dest_type: 5,
            dest_prefix: Some(7),
            dest_name: 9,
        },
    ),
];

impl Matchrule {
    /// Parses a token sequence, keeping the tokens as authored.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedRule`] when the tokens do not follow the grammar.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self, MalformedRule> {
        let authored: Vec<String> =
            tokens.iter().map(|token| token.as_ref().to_string()).collect();
        let parsed = ParsedRule::parse(&authored)?;
        Ok(Self {
            authored,
            parsed,
        })
    }

    /// Returns the parsed rule.
    #[must_use]
    pub const fn parsed(&self) -> &ParsedRule {
        &self.parsed
    }

    /// Returns the tokens as authored.
    #[must_use]
    pub fn authored(&self) -> &[String] {
        &self.authored
    }

    /// Returns the MATCH parameters, if this is a MATCH rule.
    #[must_use]
    pub const fn as_match(&self) -> Option<&MatchRule> {
        match &self.parsed {
            ParsedRule::Match(rule) => Some(rule),
            _ => None,
        }
    }

    /// Returns the rule kind.
    #[must_use]
    pub const fn kind(&self) -> RuleKind {
        self.parsed.kind()
    }

    /// Returns the artifact pattern of the rule.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.parsed.pattern()
    }

    /// Returns the canonical token form.
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        self.parsed.tokens()
    }
}

impl ParsedRule {
    /// Parses a token sequence into a rule.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedRule`] when the tokens do not follow the grammar.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self, MalformedRule> {
        let tokens: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();
        let Some(first) = tokens.first() else {
            return Err(MalformedRule::Empty);
        };
        let kind = RuleKind::from_keyword(first).ok_or_else(|| MalformedRule::UnknownKind {
            found: (*first).to_string(),
        })?;
        let build: fn(String) -> Self = match kind {
            RuleKind::Match => return parse_match(&tokens).map(Self::Match),
            RuleKind::Create => |pattern| Self::Create {
                pattern,
            },
            RuleKind::Delete => |pattern| Self::Delete {
                pattern,
            },
            RuleKind::Modify => |pattern| Self::Modify {
                pattern,
            },
            RuleKind::Allow => |pattern| Self::Allow {
                pattern,
            },
            RuleKind::Disallow => |pattern| Self::Disallow {
                pattern,
            },
        };
        if tokens.len() != 2 {
            return Err(MalformedRule::GenericArity {
                kind,
                found: tokens.len(),
            });
        }
        checked_pattern(kind, tokens[1]).map(build)
    }

    /// Returns the rule kind.
    #[must_use]
    pub const fn kind(&self) -> RuleKind {
        match self {
            Self::Match(_) => RuleKind::Match,
            Self::Create {
                ..
            } => RuleKind::Create,
            Self::Delete {
                ..
            } => RuleKind::Delete,
            Self::Modify {
                ..
            } => RuleKind::Modify,
            Self::Allow {
                ..
            } => RuleKind::Allow,
            Self::Disallow {
                ..
            } => RuleKind::Disallow,
        }
    }

    /// Returns the artifact pattern of the rule.
    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            Self::Match(rule) => &rule.pattern,
            Self::Create {
                pattern,
            }
            | Self::Delete {
                pattern,
            }
            | Self::Modify {
                pattern,
            }
            | Self::Allow {
                pattern,
            }
            | Self::Disallow {
                pattern,
            } => pattern,
        }
    }

    /// Returns the canonical token form.
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        let mut out = vec![self.kind().keyword().to_string(), self.pattern().to_string()];
        if let Self::Match(rule) = self {
            if !rule.source_prefix.is_empty() {
                out.push("IN".to_string());
                out.push(rule.source_prefix.clone());
            }
            out.push("WITH".to_string());
            out.push(rule.dest_type.as_str().to_ascii_uppercase());
            if !rule.dest_prefix.is_empty() {
                out.push("IN".to_string());
                out.push(rule.dest_prefix.clone());
            }
            out.push("FROM".to_string());
            out.push(rule.dest_name.to_string());
            if let Some(target) = &rule.rename {
                out.push("AS".to_string());
                out.push(target.clone());
            }
        }
        out
    }
}

/// Validates a pattern token and returns it verbatim.
fn checked_pattern(kind: RuleKind, token: &str) -> Result<String, MalformedRule> {
    if token.is_empty() {
        return Err(MalformedRule::EmptyField {
            kind,
            field: "pattern",
        });
    }
    ArtifactPattern::new(token).map_err(|err| MalformedRule::InvalidPattern {
        kind,
        reason: err.reason,
    })?;
    Ok(token.to_string())
}

/// Parses a MATCH rule in any accepted layout.
fn parse_match(tokens: &[&str]) -> Result<MatchRule, MalformedRule> {
    if tokens.len() == 5 {
        return parse_match_shorthand(tokens);
    }
    let (core, rename) = match tokens.len().checked_sub(2).map(|idx| (idx, tokens[idx])) {
        Some((idx, keyword)) if is_keyword(keyword, "AS") => {
            (&tokens[.. idx], Some(tokens[idx + 1]))
        }
        _ => (tokens, None),
    };
    let layout = MATCH_LAYOUTS
        .iter()
        .find(|(keywords, layout)| {
            layout.dest_name + 1 == core.len()
                && keywords.iter().all(|(idx, keyword)| is_keyword(core[*idx], keyword))
        })
        .map(|(_, layout)| layout)
        .ok_or_else(|| MalformedRule::MatchLayout {
            rule: tokens.join(" "),
        })?;
    let dest_type = ArtifactKind::from_token(core[layout.dest_type]).ok_or_else(|| {
        MalformedRule::DestinationType {
            found: core[layout.dest_type].to_string(),
        }
    })?;
    let rule = MatchRule {
        pattern: checked_pattern(RuleKind::Match, core[1])?,
        source_prefix: layout.source_prefix.map(|idx| core[idx].to_string()).unwrap_or_default(),
        dest_type,
        dest_prefix: layout.dest_prefix.map(|idx| core[idx].to_string()).unwrap_or_default(),
        dest_name: checked_name(core[layout.dest_name])?,
        rename: rename.map(str::to_string),
    };
    if let Some(target) = &rule.rename {
        check_rename(&rule.pattern, target)?;
    }
    Ok(rule)
}

/// Parses `MATCH (MATERIAL|PRODUCT) <pattern> FROM <name>`.
fn parse_match_shorthand(tokens: &[&str]) -> Result<MatchRule, MalformedRule> {
    if !is_keyword(tokens[3], "FROM") {
        return Err(MalformedRule::MatchLayout {
            rule: tokens.join(" "),
        });
    }
    let dest_type = ArtifactKind::from_singular(tokens[1]).ok_or_else(|| {
        MalformedRule::DestinationType {
            found: tokens[1].to_string(),
        }
    })?;
    Ok(MatchRule {
        pattern: checked_pattern(RuleKind::Match, tokens[2])?,
        source_prefix: String::new(),
        dest_type,
        dest_prefix: String::new(),
        dest_name: checked_name(tokens[4])?,
        rename: None,
    })
}

/// Validates the `FROM` name.
fn checked_name(token: &str) -> Result<StepName, MalformedRule> {
    if token.is_empty() {
        return Err(MalformedRule::EmptyField {
            kind: RuleKind::Match,
            field: "destination name",
        });
    }
    Ok(StepName::new(token))
}

/// Validates an `AS` target against the source pattern.
fn check_rename(pattern: &str, target: &str) -> Result<(), MalformedRule> {
    let invalid = |reason| MalformedRule::InvalidRename {
        target: target.to_string(),
        reason,
    };
    if target.is_empty() {
        return Err(invalid("target is empty"));
    }
    match metachar_count(target) {
        0 => Ok(()),
        _ if !is_single_star(target) => Err(invalid("target may contain at most one `*`")),
        _ if !is_single_star(pattern) => {
            Err(invalid("a `*` target requires a pattern with exactly one `*`"))
        }
        _ => Ok(()),
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

impl fmt::Display for ParsedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens().join(" "))
    }
}

impl fmt::Display for Matchrule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.parsed.fmt(f)
    }
}

impl FromStr for Matchrule {
    type Err = MalformedRule;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        Self::parse(&tokens)
    }
}

impl Serialize for Matchrule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.authored.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Matchrule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tokens = Vec::<String>::deserialize(deserializer)?;
        Self::parse(&tokens).map_err(D::Error::custom)
    }
}
