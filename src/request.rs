//! Build inputs and the result handed back to the CLI layer.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::blob::require_input;
use crate::error::{ImageResult, InputRole};

/// Target architecture of the kernel/bootloader pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    #[value(name = "arm64")]
    Arm64,
    #[value(name = "x86_64")]
    X86_64,
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::Arm64 => write!(f, "arm64"),
            Architecture::X86_64 => write!(f, "x86_64"),
        }
    }
}

/// One build, fixed at construction.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    architecture: Architecture,
    kernel: PathBuf,
    bootloader: PathBuf,
    output: PathBuf,
    verbose: bool,
}

impl BuildRequest {
    pub fn new(
        architecture: Architecture,
        kernel: impl Into<PathBuf>,
        bootloader: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        verbose: bool,
    ) -> Self {
        Self {
            architecture,
            kernel: kernel.into(),
            bootloader: bootloader.into(),
            output: output.into(),
            verbose,
        }
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn kernel(&self) -> &Path {
        &self.kernel
    }

    pub fn bootloader(&self) -> &Path {
        &self.bootloader
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Both inputs must exist before any I/O starts.
    pub fn validate_inputs(&self) -> ImageResult<()> {
        require_input(InputRole::Kernel, &self.kernel)?;
        require_input(InputRole::Bootloader, &self.bootloader)?;
        Ok(())
    }
}

/// Terminal outcome of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildResult {
    pub success: bool,
    pub output_path: PathBuf,
    pub size_bytes: u64,
    /// Packaging backend that produced an ISO-path artifact.
    pub backend: Option<String>,
    pub sha512: Option<String>,
    /// Human-readable notes: skipped or failed backends, warnings.
    pub diagnostic: String,
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "succeeded" } else { "failed" };
        writeln!(f, "Build {}: {}", status, self.output_path.display())?;
        write!(
            f,
            "Size: {} bytes ({} MB)",
            self.size_bytes,
            self.size_bytes / (1024 * 1024)
        )?;
        if let Some(backend) = &self.backend {
            write!(f, "\nBackend: {}", backend)?;
        }
        if let Some(hash) = &self.sha512 {
            write!(f, "\nSHA512: {}", hash)?;
        }
        if !self.diagnostic.is_empty() {
            write!(f, "\n{}", self.diagnostic)?;
        }
        Ok(())
    }
}
