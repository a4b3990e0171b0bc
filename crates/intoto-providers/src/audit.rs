// crates/intoto-providers/src/audit.rs
// ============================================================================
// Module: Verification Audit Sinks
// Description: JSON line sinks for verification audit events.
// Purpose: Route verifier events to stderr or an append-only file.
// Dependencies: intoto-core, serde_json
// ============================================================================

//! ## Overview
//! Each event is written as one JSON object per line. Write failures are
//! dropped so auditing never changes a verification outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use intoto_core::VerificationAuditEvent;
use intoto_core::VerificationAuditSink;

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Serializes `event` as one newline-terminated JSON line.
fn json_line(event: &VerificationAuditEvent) -> Option<Vec<u8>> {
    let mut line = serde_json::to_vec(event).ok()?;
    line.push(b'\n');
    Some(line)
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Writes each event to standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrAuditSink;

impl VerificationAuditSink for StderrAuditSink {
    fn record(&self, event: &VerificationAuditEvent) {
        if let Some(line) = json_line(event) {
            let _ = io::stderr().lock().write_all(&line);
        }
    }
}

/// Appends each event to a log file, flushing after every line.
pub struct FileAuditSink {
    /// Shared append handle.
    log: Mutex<File>,
}

impl FileAuditSink {
    /// Opens `path` for appending, creating it when absent.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from opening `path`.
    pub fn open(path: &Path) -> io::Result<Self> {
        let log = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            log: Mutex::new(log),
        })
    }
}

impl VerificationAuditSink for FileAuditSink {
    fn record(&self, event: &VerificationAuditEvent) {
        let Some(line) = json_line(event) else {
            return;
        };
        if let Ok(mut log) = self.log.lock() {
            if log.write_all(&line).is_ok() {
                let _ = log.flush();
            }
        }
    }
}
