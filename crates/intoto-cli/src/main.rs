// crates/intoto-cli/src/main.rs
// ============================================================================
// Module: intoto-verify CLI Entry Point
// Description: Command dispatcher for layout verification and key utilities.
// Purpose: Provide a safe, localized CLI over the in-toto verifier.
// Dependencies: clap, intoto-config, intoto-core, intoto-providers, time.
// ============================================================================

//! ## Overview
//! `intoto-verify` loads a signed layout, the layout owner keys, and a
//! directory of link files, then runs the verifier with the built-in ed25519,
//! filesystem, and process collaborators. The report goes to stdout; the exit
//! code is 0 on pass and 1 on failure, with the reason on stderr. All
//! user-facing strings are routed through the i18n catalog.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use intoto_cli::i18n::Locale;
use intoto_cli::i18n::set_locale;
use intoto_cli::t;
use intoto_config::AuditConfig;
use intoto_config::AuditSinkKind;
use intoto_config::IntotoConfig;
use intoto_core::KeyId;
use intoto_core::LayoutVerifier;
use intoto_core::VerificationAuditSink;
use intoto_core::VerificationReport;
use intoto_core::VerificationStatus;
use intoto_core::time::parse_expiry;
use intoto_providers::Ed25519SignatureVerifier;
use intoto_providers::FileArtifactHasher;
use intoto_providers::FileAuditSink;
use intoto_providers::MetadataLimits;
use intoto_providers::ProcessCommandRunner;
use intoto_providers::StderrAuditSink;
use intoto_providers::load_layout;
use intoto_providers::load_links;
use intoto_providers::load_public_key;
use thiserror::Error;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding a language tag.
const LANG_ENV: &str = "INTOTO_VERIFY_LANG";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// `intoto-verify` arguments.
#[derive(Parser, Debug)]
#[command(name = "intoto-verify", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print the version and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Output language; takes precedence over `INTOTO_VERIFY_LANG`.
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Subcommand; help is printed when absent.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify link metadata against a signed layout.
    Verify(VerifyCommand),
    /// Print the key id of a public key.
    KeyId(KeyIdCommand),
}

/// Arguments for `verify`.
#[derive(Args, Debug)]
struct VerifyCommand {
    /// Signed layout file.
    #[arg(long, value_name = "PATH")]
    layout: PathBuf,
    /// Layout owner public key (repeatable).
    #[arg(long = "layout-key", value_name = "PATH", required = true)]
    layout_keys: Vec<PathBuf>,
    /// Directory holding `<step>.<keyid>.link` files.
    #[arg(long = "link-dir", value_name = "DIR", default_value = ".")]
    link_dir: PathBuf,
    /// Config file; falls back to `INTOTO_VERIFY_CONFIG`, then intoto-verify.toml.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Report output format.
    #[arg(long, value_enum, default_value_t = VerifyFormat::Json)]
    format: VerifyFormat,
    /// Verification instant as RFC 3339 (defaults to now).
    #[arg(long, value_name = "RFC3339")]
    at: Option<String>,
}

/// Arguments for `key-id`.
#[derive(Args, Debug)]
struct KeyIdCommand {
    /// Public key file (bare hex or JSON key record).
    #[arg(long, value_name = "PATH")]
    key: PathBuf,
}

/// Report encodings.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum VerifyFormat {
    /// RFC 8785 canonical JSON.
    Json,
    /// Human-readable summary.
    Markdown,
}

/// Values accepted by `--lang`.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LangArg {
    /// English.
    En,
    /// Catalan.
    Ca,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// A failure already rendered in the active locale.
#[derive(Debug, Error)]
#[error("{0}")]
struct CliError(String);

impl CliError {
    /// Wraps a rendered message.
    const fn new(message: String) -> Self {
        Self(message)
    }
}

/// Result type of command handlers.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Runs the CLI and maps errors to a failing exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            let _ = emit(OutputStream::Stderr, &err.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Parses arguments, selects the locale, and dispatches the subcommand.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let locale = resolve_locale(cli.lang, std::env::var(LANG_ENV).ok().as_deref())?;
    set_locale(locale);
    if locale != Locale::En {
        emit(OutputStream::Stderr, &t!("locale.machine_translated"))?;
    }

    if cli.show_version {
        emit(OutputStream::Stdout, &t!("main.version", version = env!("CARGO_PKG_VERSION")))?;
        return Ok(ExitCode::SUCCESS);
    }
    match cli.command {
        Some(Commands::Verify(command)) => command_verify(&command),
        Some(Commands::KeyId(command)) => command_key_id(&command),
        None => {
            emit(OutputStream::Stdout, &Cli::command().render_help().to_string())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: Verify Command
// ============================================================================

/// Executes the `verify` command.
fn command_verify(command: &VerifyCommand) -> CliResult<ExitCode> {
    let config = IntotoConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let at = resolve_verification_time(command.at.as_deref())?;
    let limits = config.metadata_limits();

    let layout = load_layout(&command.layout, limits)
        .map_err(|err| CliError::new(t!("verify.layout.load_failed", error = err)))?;
    let owner_keys = command
        .layout_keys
        .iter()
        .map(|path| {
            load_public_key(path, limits)
                .map_err(|err| CliError::new(t!("verify.key.load_failed", error = err)))
        })
        .collect::<CliResult<Vec<_>>>()?;
    let links = load_links(&command.link_dir, limits).map_err(|err| {
        CliError::new(t!(
            "verify.links.load_failed",
            path = command.link_dir.display(),
            error = err
        ))
    })?;

    let hasher = FileArtifactHasher::new(config.hasher_config())
        .map_err(|err| CliError::new(t!("verify.hasher.init_failed", error = err)))?;
    let runner = ProcessCommandRunner::new(config.runner_config());
    let mut verifier = LayoutVerifier::new(
        layout,
        owner_keys,
        Ed25519SignatureVerifier,
        hasher,
        runner,
        config.verifier_config(),
    )
    .map_err(|err| CliError::new(t!("verify.layout.rejected", error = err)))?;
    if let Some(sink) = build_audit_sink(&config.audit)? {
        verifier = verifier.with_audit_sink(sink);
    }

    let report = verifier.verify(&links, at);
    emit(OutputStream::Stdout, &render_verification_report(command.format, &report)?)?;
    match &report.failure {
        None => Ok(ExitCode::SUCCESS),
        Some(failure) => {
            emit(
                OutputStream::Stderr,
                &t!("verify.failed", kind = failure.kind(), error = failure),
            )?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Resolves the verification instant from `--at` or the system clock.
fn resolve_verification_time(at: Option<&str>) -> CliResult<OffsetDateTime> {
    match at {
        Some(value) => parse_expiry(value).map_err(|err| {
            CliError::new(t!("verify.time.invalid", value = value, error = err))
        }),
        None => Ok(OffsetDateTime::now_utc()),
    }
}

/// Builds the configured audit sink, if any.
fn build_audit_sink(
    config: &AuditConfig,
) -> CliResult<Option<Arc<dyn VerificationAuditSink>>> {
    match config.sink {
        AuditSinkKind::None => Ok(None),
        AuditSinkKind::Stderr => Ok(Some(Arc::new(StderrAuditSink))),
        AuditSinkKind::File => {
            let Some(path) = &config.path else {
                return Err(CliError::new(t!("verify.audit.path_missing")));
            };
            let sink = FileAuditSink::open(path).map_err(|err| {
                CliError::new(t!("verify.audit.open_failed", path = path.display(), error = err))
            })?;
            Ok(Some(Arc::new(sink)))
        }
    }
}

/// Renders a verification report in the requested format.
fn render_verification_report(
    format: VerifyFormat,
    report: &VerificationReport,
) -> CliResult<String> {
    match format {
        VerifyFormat::Json => {
            let bytes = serde_jcs::to_vec(report)
                .map_err(|err| CliError::new(t!("verify.render_failed", error = err)))?;
            String::from_utf8(bytes)
                .map_err(|err| CliError::new(t!("verify.render_failed", error = err)))
        }
        VerifyFormat::Markdown => Ok(render_verification_markdown(report)),
    }
}

/// Markdown rendering used by `--format markdown`.
fn render_verification_markdown(report: &VerificationReport) -> String {
    let mut lines = vec![
        t!("verify.md.header"),
        String::new(),
        t!("verify.md.status", status = format_verification_status(report.status)),
        t!("verify.md.reached", state = report.reached_state.as_str()),
    ];
    lines.push(match &report.failure {
        Some(failure) => t!("verify.md.failure", kind = failure.kind(), message = failure),
        None => t!("verify.md.no_failure"),
    });

    lines.push(String::new());
    lines.push(t!("verify.md.steps_header"));
    if report.verified_steps.is_empty() {
        lines.push(t!("verify.md.none"));
    }
    for step in &report.verified_steps {
        let signers: Vec<&str> = step.signers.iter().map(KeyId::short).collect();
        lines.push(t!("verify.md.step_line", step = step.step, signers = signers.join(", ")));
    }

    lines.push(String::new());
    lines.push(t!("verify.md.mismatches_header"));
    if report.command_mismatches.is_empty() {
        lines.push(t!("verify.md.none"));
    }
    for mismatch in &report.command_mismatches {
        lines.push(t!(
            "verify.md.mismatch_line",
            step = mismatch.step,
            expected = mismatch.expected.join(" "),
            actual = mismatch.actual.join(" ")
        ));
    }
    lines.join("\n")
}

/// Localized status word.
fn format_verification_status(status: VerificationStatus) -> String {
    match status {
        VerificationStatus::Pass => t!("verify.status.pass"),
        VerificationStatus::Fail => t!("verify.status.fail"),
    }
}

// ============================================================================
// SECTION: Key Id Command
// ============================================================================

/// Executes the `key-id` command.
fn command_key_id(command: &KeyIdCommand) -> CliResult<ExitCode> {
    let key = load_public_key(&command.key, MetadataLimits::default())
        .map_err(|err| CliError::new(t!("key_id.load_failed", error = err)))?;
    let key_id =
        key.key_id().map_err(|err| CliError::new(t!("key_id.compute_failed", error = err)))?;
    emit(OutputStream::Stdout, key_id.as_str())?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Locale Helpers
// ============================================================================

/// Picks the locale: `--lang`, then the environment tag, then English.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    match (lang, env_lang) {
        (Some(lang), _) => Ok(lang.into()),
        (None, Some(tag)) => Locale::parse(tag)
            .ok_or_else(|| CliError::new(t!("locale.invalid_env", env = LANG_ENV, value = tag))),
        (None, None) => Ok(Locale::En),
    }
}

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Ca => Self::Ca,
        }
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Process output streams.
#[derive(Debug, Clone, Copy)]
enum OutputStream {
    /// Standard output: reports and command results.
    Stdout,
    /// Standard error: failures and notices.
    Stderr,
}

impl OutputStream {
    /// Returns the localized stream name.
    fn label(self) -> String {
        match self {
            Self::Stdout => t!("stream.stdout"),
            Self::Stderr => t!("stream.stderr"),
        }
    }
}

/// Writes `message` and a newline to `stream`.
fn emit(stream: OutputStream, message: &str) -> CliResult<()> {
    let written = match stream {
        OutputStream::Stdout => writeln!(std::io::stdout().lock(), "{message}"),
        OutputStream::Stderr => writeln!(std::io::stderr().lock(), "{message}"),
    };
    written.map_err(|err| {
        CliError::new(t!("stream.write_failed", stream = stream.label(), error = err))
    })
}
