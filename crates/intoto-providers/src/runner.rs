// crates/intoto-providers/src/runner.rs
// ============================================================================
// Module: Process Command Runner
// Description: Executes inspection commands as child processes.
// Purpose: Back the core command interface with std::process.
// Dependencies: intoto-core
// ============================================================================

//! ## Overview
//! Commands run without a shell: the first element is the program and the
//! rest are its arguments. Each output stream is read up to the configured
//! limit and the remainder is discarded unread, so a chatty inspection cannot
//! grow memory. Captured bytes are decoded lossily as UTF-8. A process killed
//! by a signal reports no return value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Read;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;
use std::thread;

use intoto_core::Byproducts;
use intoto_core::CommandRunner;
use intoto_core::RunnerError;
use serde::Deserialize;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the process runner.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CommandRunnerConfig {
    /// Working directory for commands; the current directory when unset.
    pub working_dir: Option<PathBuf>,
    /// Maximum captured bytes per output stream.
    pub max_output_bytes: usize,
}

impl Default for CommandRunnerConfig {
    fn default() -> Self {
        Self {
            working_dir: None,
            max_output_bytes: 1024 * 1024,
        }
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Command runner that spawns local processes.
pub struct ProcessCommandRunner {
    /// Runner configuration.
    config: CommandRunnerConfig,
}

impl ProcessCommandRunner {
    /// Creates a runner with the given configuration.
    #[must_use]
    pub const fn new(config: CommandRunnerConfig) -> Self {
        Self {
            config,
        }
    }
}

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, command: &[String]) -> Result<Byproducts, RunnerError> {
        let Some((program, args)) = command.split_first() else {
            return Err(RunnerError::EmptyCommand);
        };
        let mut process = Command::new(program);
        process.args(args).stdin(Stdio::null());
        if let Some(dir) = &self.config.working_dir {
            process.current_dir(dir);
        }
        let mut child = process
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| spawn_error(program, &err))?;
        let limit = self.config.max_output_bytes;
        let (stdout, stderr) = (child.stdout.take(), child.stderr.take());
        let (stdout, stderr) = thread::scope(|scope| {
            let stderr = scope.spawn(move || read_bounded(stderr, limit));
            (read_bounded(stdout, limit), stderr.join().unwrap_or_default())
        });
        let status = child.wait().map_err(|err| spawn_error(program, &err))?;
        Ok(Byproducts {
            stdout,
            stderr,
            return_value: status.code(),
        })
    }
}

/// Maps a process I/O failure to [`RunnerError::Spawn`].
fn spawn_error(program: &str, err: &io::Error) -> RunnerError {
    RunnerError::Spawn {
        program: program.to_string(),
        reason: err.to_string(),
    }
}

/// Keeps at most `limit` bytes of `pipe` and drains the rest.
fn read_bounded<R: Read>(pipe: Option<R>, limit: usize) -> String {
    let Some(mut pipe) = pipe else {
        return String::new();
    };
    let mut kept = Vec::new();
    let _ = pipe.by_ref().take(u64::try_from(limit).unwrap_or(u64::MAX)).read_to_end(&mut kept);
    let _ = io::copy(&mut pipe, &mut io::sink());
    String::from_utf8_lossy(&kept).into_owned()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
