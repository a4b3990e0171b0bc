// crates/intoto-cli/src/i18n.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: Localized message table and the `t!` formatting macro.
// Purpose: Keep every user-facing CLI line in one translatable table.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! Each catalog row carries a stable key plus its English and Catalan
//! templates, so a key can never exist in one locale and not the other.
//! Templates use `{name}` placeholders filled by [`t!`](crate::t).
//!
//! ## Invariants
//! - The active locale is chosen once per process.
//! - Unknown keys render as the key itself.
//! - Unknown placeholders are left in the output untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Locales
// ============================================================================

/// Output languages of the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Locale {
    /// English (default).
    En,
    /// Catalan.
    Ca,
}

impl Locale {
    /// Returns the language tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ca => "ca",
        }
    }

    /// Parses a language tag such as `ca`, `CA`, or `ca_ES.UTF-8`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let primary = value.trim().split(['-', '_', '.']).next()?;
        SUPPORTED_LOCALES
            .iter()
            .copied()
            .find(|locale| primary.eq_ignore_ascii_case(locale.as_str()))
    }
}

/// Every supported locale, English first.
pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::En, Locale::Ca];

/// Process-wide locale, set once at startup.
static ACTIVE_LOCALE: OnceLock<Locale> = OnceLock::new();

/// Selects the output locale; later calls are ignored.
pub fn set_locale(locale: Locale) {
    let _ = ACTIVE_LOCALE.set(locale);
}

/// Returns the selected locale, English when none was set.
#[must_use]
pub fn current_locale() -> Locale {
    ACTIVE_LOCALE.get().copied().unwrap_or(Locale::En)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// One translatable message.
#[derive(Debug, Clone, Copy)]
pub struct Message {
    /// Stable lookup key.
    pub key: &'static str,
    /// English template.
    pub en: &'static str,
    /// Catalan template.
    pub ca: &'static str,
}

impl Message {
    /// Returns the template for `locale`.
    #[must_use]
    pub const fn template(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::En => self.en,
            Locale::Ca => self.ca,
        }
    }
}

/// Shorthand for a catalog row.
const fn msg(key: &'static str, en: &'static str, ca: &'static str) -> Message {
    Message {
        key,
        en,
        ca,
    }
}

/// The message catalog.
pub const MESSAGES: &[Message] = &[
    msg("main.version", "intoto-verify {version}", "intoto-verify {version}"),
    msg("stream.stdout", "stdout", "stdout"),
    msg("stream.stderr", "stderr", "stderr"),
    msg(
        "stream.write_failed",
        "Could not write to {stream}: {error}",
        "No s'ha pogut escriure a {stream}: {error}",
    ),
    msg(
        "config.load_failed",
        "Failed to load configuration: {error}",
        "No s'ha pogut carregar la configuració: {error}",
    ),
    msg(
        "verify.time.invalid",
        "Invalid --at timestamp {value}: {error}",
        "Marca de temps --at no vàlida {value}: {error}",
    ),
    msg(
        "verify.layout.load_failed",
        "Failed to load layout: {error}",
        "No s'ha pogut carregar el layout: {error}",
    ),
    msg("verify.layout.rejected", "Layout rejected: {error}", "Layout rebutjat: {error}"),
    msg(
        "verify.key.load_failed",
        "Failed to load layout key: {error}",
        "No s'ha pogut carregar la clau del layout: {error}",
    ),
    msg(
        "verify.links.load_failed",
        "Failed to load links from {path}: {error}",
        "No s'han pogut carregar els links de {path}: {error}",
    ),
    msg(
        "verify.hasher.init_failed",
        "Failed to initialize the artifact hasher: {error}",
        "No s'ha pogut inicialitzar el càlcul de hash: {error}",
    ),
    msg(
        "verify.audit.open_failed",
        "Failed to open audit log {path}: {error}",
        "No s'ha pogut obrir el registre d'auditoria {path}: {error}",
    ),
    msg(
        "verify.audit.path_missing",
        "The file audit sink requires audit.path.",
        "L'auditoria en fitxer requereix audit.path.",
    ),
    msg(
        "verify.render_failed",
        "Failed to render the verification report: {error}",
        "No s'ha pogut generar l'informe de verificació: {error}",
    ),
    msg(
        "verify.failed",
        "Verification failed ({kind}): {error}",
        "La verificació ha fallat ({kind}): {error}",
    ),
    msg("verify.status.pass", "pass", "aprovat"),
    msg("verify.status.fail", "fail", "fallat"),
    msg("verify.md.header", "# in-toto Verification Report", "# Informe de verificació in-toto"),
    msg("verify.md.status", "- Status: {status}", "- Estat: {status}"),
    msg("verify.md.reached", "- Reached state: {state}", "- Estat assolit: {state}"),
    msg("verify.md.failure", "- Failure ({kind}): {message}", "- Error ({kind}): {message}"),
    msg("verify.md.no_failure", "- Failure: none", "- Error: cap"),
    msg("verify.md.steps_header", "## Verified Steps", "## Passos verificats"),
    msg("verify.md.step_line", "- {step}: signed by {signers}", "- {step}: signat per {signers}"),
    msg("verify.md.mismatches_header", "## Command Mismatches", "## Ordres discrepants"),
    msg(
        "verify.md.mismatch_line",
        "- {step}: expected `{expected}`, ran `{actual}`",
        "- {step}: s'esperava `{expected}`, s'ha executat `{actual}`",
    ),
    msg("verify.md.none", "- none", "- cap"),
    msg(
        "key_id.load_failed",
        "Failed to load key: {error}",
        "No s'ha pogut carregar la clau: {error}",
    ),
    msg(
        "key_id.compute_failed",
        "Failed to compute key id: {error}",
        "No s'ha pogut calcular l'identificador de clau: {error}",
    ),
    msg(
        "locale.invalid_env",
        "Unsupported language in {env}: {value} (use 'en' or 'ca').",
        "Idioma no admès a {env}: {value} (useu 'en' o 'ca').",
    ),
    msg(
        "locale.machine_translated",
        "Note: non-English output is machine-translated and may be inaccurate.",
        "Nota: la sortida que no és en anglès està traduïda automàticament i pot ser inexacta.",
    ),
];

/// Returns the catalog indexed by key.
pub(crate) fn catalog() -> &'static HashMap<&'static str, Message> {
    static INDEX: OnceLock<HashMap<&'static str, Message>> = OnceLock::new();
    INDEX.get_or_init(|| MESSAGES.iter().map(|message| (message.key, *message)).collect())
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Named value substituted into a `{key}` placeholder.
#[derive(Debug, Clone)]
pub struct MessageArg {
    /// Placeholder name without braces.
    pub key: &'static str,
    /// Rendered value.
    pub value: String,
}

impl MessageArg {
    /// Creates a placeholder binding.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Renders `key` in the active locale with `args` substituted.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).map_or(key, |message| message.template(current_locale()));
    render(template, &args)
}

/// Fills `{name}` placeholders in one left-to-right pass.
fn render(template: &str, args: &[MessageArg]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        output.push_str(&rest[.. open]);
        let tail = &rest[open ..];
        let bound = tail.find('}').and_then(|close| {
            let name = &tail[1 .. close];
            args.iter().find(|arg| arg.key == name).map(|arg| (arg, close))
        });
        match bound {
            Some((arg, close)) => {
                output.push_str(&arg.value);
                rest = &tail[close + 1 ..];
            }
            None => {
                output.push('{');
                rest = &tail[1 ..];
            }
        }
    }
    output.push_str(rest);
    output
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Renders a catalog message, binding each `name = value` to `{name}`.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {
        $crate::i18n::translate(
            $key,
            ::std::vec![$($crate::i18n::MessageArg::new(stringify!($name), $value.to_string())),*],
        )
    };
}
