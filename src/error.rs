//! Error kinds for image and ISO assembly.
//!
//! Fatal kinds (`MissingInputFile`, `InputReadFailure`, `OutputWriteFailure`,
//! `StagingFailure`) end a build immediately. `ToolUnavailable` and
//! `ToolExecutionFailure` are recovered by the packaging chain, which only
//! surfaces them through `AllStrategiesExhausted`.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Which of the two input binaries an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRole {
    Kernel,
    Bootloader,
}

impl fmt::Display for InputRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputRole::Kernel => write!(f, "kernel"),
            InputRole::Bootloader => write!(f, "bootloader"),
        }
    }
}

/// Why a single packaging backend did not produce the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDiagnostic {
    /// Backend identifier (e.g. `grub-rescue`).
    pub backend: String,
    /// True when the backend was skipped because its tool is not installed.
    pub unavailable: bool,
    pub message: String,
}

impl fmt::Display for BackendDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.unavailable { "skipped" } else { "failed" };
        write!(f, "{} {}: {}", self.backend, kind, self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("{role} file not found: {}", .path.display())]
    MissingInputFile { role: InputRole, path: PathBuf },

    #[error("failed to read {role} file '{}': {source}", .path.display())]
    InputReadFailure {
        role: InputRole,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write output '{}': {source}", .path.display())]
    OutputWriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to prepare ISO staging tree at '{}': {source}", .path.display())]
    StagingFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("tool not installed: {}", .tools.join(", "))]
    ToolUnavailable { tools: Vec<String> },

    #[error("{tool} failed: {reason}")]
    ToolExecutionFailure { tool: String, reason: String },

    #[error("every packaging backend failed:\n{}", render_diagnostics(.diagnostics))]
    AllStrategiesExhausted { diagnostics: Vec<BackendDiagnostic> },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BuildError {
    /// True for failures the packaging chain recovers from by moving on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BuildError::ToolUnavailable { .. } | BuildError::ToolExecutionFailure { .. }
        )
    }
}

fn render_diagnostics(diagnostics: &[BackendDiagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type for library operations.
pub type ImageResult<T> = std::result::Result<T, BuildError>;
