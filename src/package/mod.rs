//! ISO packaging backends and the fallback chain that drives them.
//!
//! A build moves through `NotStarted -> Trying[i] -> (Succeeded | Trying[i+1])`
//! until one backend produces the output file or every backend has been
//! exhausted. Backends whose tool is missing are skipped without being run.
//! Backend failures stay local to the chain; they only surface, all together,
//! through [`BuildError::AllStrategiesExhausted`].
//!
//! Default order:
//!
//! 1. [`GrubRescue`] - `grub-mkrescue`
//! 2. [`IsoMaster`] - `mkisofs` / `genisoimage` with an El Torito boot entry
//! 3. [`RawFallback`] - plain bootloader + kernel concatenation, no tools

pub mod grub;
pub mod iso_master;
pub mod raw;

pub use grub::GrubRescue;
pub use iso_master::IsoMaster;
pub use raw::RawFallback;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::checksum::sidecar_path;
use crate::config::BuilderConfig;
use crate::error::{BackendDiagnostic, BuildError, ImageResult};
use crate::process::{ProcessError, ToolHost};
use crate::staging::StagingTree;

/// Identifier of a built-in backend, as used in `packaging.order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    GrubRescue,
    IsoMaster,
    RawFallback,
}

impl BackendKind {
    pub const DEFAULT_ORDER: [BackendKind; 3] = [
        BackendKind::GrubRescue,
        BackendKind::IsoMaster,
        BackendKind::RawFallback,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            BackendKind::GrubRescue => "grub-rescue",
            BackendKind::IsoMaster => "iso-master",
            BackendKind::RawFallback => "raw-fallback",
        }
    }

    /// Instantiate the backend with the given per-tool timeout.
    pub fn backend(&self, timeout: Duration) -> Box<dyn PackagingBackend> {
        match self {
            BackendKind::GrubRescue => Box::new(GrubRescue::new(timeout)),
            BackendKind::IsoMaster => Box::new(IsoMaster::new(timeout)),
            BackendKind::RawFallback => Box::new(RawFallback),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Result of a capability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Ready to attempt. `tool` is the resolved executable, if the backend
    /// needs one.
    Ready { tool: Option<PathBuf> },
    /// None of the listed tools is installed.
    Unavailable { tools: Vec<String> },
}

/// Everything a backend needs for one attempt.
pub struct Attempt<'a> {
    pub host: &'a dyn ToolHost,
    pub staging: &'a StagingTree,
    pub output: &'a Path,
    /// Executable returned by the probe.
    pub tool: Option<&'a Path>,
}

/// One way of turning a staging tree into an output file.
///
/// Implementations hold no mutable state; every attempt sees the same
/// read-only staging tree.
pub trait PackagingBackend {
    /// Identifier used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Check whether the backend can run on this host. Never runs the tool.
    fn probe(&self, host: &dyn ToolHost) -> Availability;

    /// Produce `attempt.output`. Any error moves the chain to the next
    /// backend.
    fn attempt(&self, attempt: &Attempt<'_>) -> ImageResult<()>;
}

/// Successful chain outcome.
#[derive(Debug, Clone)]
pub struct Packaged {
    /// Backend that produced the output.
    pub backend: String,
    pub size_bytes: u64,
    /// Backends skipped or failed before the winner.
    pub diagnostics: Vec<BackendDiagnostic>,
}

/// Ordered list of backends; the first success wins.
pub struct PackagingChain {
    backends: Vec<Box<dyn PackagingBackend>>,
}

impl PackagingChain {
    pub fn new(backends: Vec<Box<dyn PackagingBackend>>) -> Self {
        Self { backends }
    }

    /// Chain in `config.packaging.order`.
    pub fn from_config(config: &BuilderConfig) -> Self {
        let timeout = config.tool_timeout();
        Self::new(
            config
                .packaging
                .order
                .iter()
                .map(|kind| kind.backend(timeout))
                .collect(),
        )
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Try each backend in order until one writes `output`.
    ///
    /// When every backend fails, no file is left at `output`.
    pub fn package(
        &self,
        host: &dyn ToolHost,
        staging: &StagingTree,
        output: &Path,
    ) -> ImageResult<Packaged> {
        let mut diagnostics = Vec::new();

        discard_output(output);

        for (index, backend) in self.backends.iter().enumerate() {
            let name = backend.name();

            let tool = match backend.probe(host) {
                Availability::Ready { tool } => tool,
                Availability::Unavailable { tools } => {
                    let err = BuildError::ToolUnavailable { tools };
                    tracing::info!(backend = name, "skipping: {err}");
                    diagnostics.push(BackendDiagnostic {
                        backend: name.to_string(),
                        unavailable: true,
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            tracing::info!(backend = name, step = index + 1, "trying packaging backend");
            let attempt = Attempt {
                host,
                staging,
                output,
                tool: tool.as_deref(),
            };

            match backend.attempt(&attempt).and_then(|()| produced_size(output)) {
                Ok(size_bytes) => {
                    tracing::info!(backend = name, size_bytes, "packaging succeeded");
                    return Ok(Packaged {
                        backend: name.to_string(),
                        size_bytes,
                        diagnostics,
                    });
                }
                Err(err) => {
                    tracing::warn!(backend = name, "packaging failed: {err}");
                    discard_output(output);
                    diagnostics.push(BackendDiagnostic {
                        backend: name.to_string(),
                        unavailable: false,
                        message: err.to_string(),
                    });
                }
            }
        }

        Err(BuildError::AllStrategiesExhausted { diagnostics })
    }
}

/// Size of the file a backend claims to have written.
fn produced_size(output: &Path) -> ImageResult<u64> {
    match fs::metadata(output) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(meta.len()),
        _ => Err(BuildError::OutputWriteFailure {
            path: output.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "backend reported success but produced no output",
            ),
        }),
    }
}

/// Remove a stale or partial artifact together with its checksum sidecar.
fn discard_output(output: &Path) {
    for path in [output.to_path_buf(), sidecar_path(output)] {
        if !path.is_file() {
            continue;
        }
        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), "could not remove stale output: {e}");
        }
    }
}

/// Convert a failed tool run into the chain's error kind.
pub(crate) fn tool_failure(tool: &str, err: ProcessError) -> BuildError {
    BuildError::ToolExecutionFailure {
        tool: tool.to_string(),
        reason: err.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{ScriptedHost, ToolBehavior};
    use super::*;
    use crate::menu::MenuConfig;
    use tempfile::TempDir;

    fn staged(temp: &TempDir) -> StagingTree {
        let kernel = temp.path().join("kernel.elf");
        let bootloader = temp.path().join("boot.bin");
        fs::write(&kernel, vec![0x7f; 4096]).unwrap();
        fs::write(&bootloader, vec![0xeb; 600]).unwrap();
        StagingTree::stage(&kernel, &bootloader, &MenuConfig::default()).unwrap()
    }

    fn default_chain() -> PackagingChain {
        PackagingChain::from_config(&BuilderConfig::default())
    }

    /// Backend that always fails without touching the filesystem.
    struct AlwaysFails;

    impl PackagingBackend for AlwaysFails {
        fn name(&self) -> &str {
            "always-fails"
        }

        fn probe(&self, _host: &dyn ToolHost) -> Availability {
            Availability::Ready { tool: None }
        }

        fn attempt(&self, _attempt: &Attempt<'_>) -> ImageResult<()> {
            Err(BuildError::ToolExecutionFailure {
                tool: "always-fails".to_string(),
                reason: "scripted".to_string(),
            })
        }
    }

    /// Backend that exits "successfully" without writing anything.
    struct SilentSuccess;

    impl PackagingBackend for SilentSuccess {
        fn name(&self) -> &str {
            "silent"
        }

        fn probe(&self, _host: &dyn ToolHost) -> Availability {
            Availability::Ready { tool: None }
        }

        fn attempt(&self, _attempt: &Attempt<'_>) -> ImageResult<()> {
            Ok(())
        }
    }

    #[test]
    fn default_order_matches_priority() {
        assert_eq!(
            default_chain().backend_names(),
            vec!["grub-rescue", "iso-master", "raw-fallback"]
        );
    }

    #[test]
    fn grub_wins_when_installed() {
        let temp = TempDir::new().unwrap();
        let tree = staged(&temp);
        let output = temp.path().join("out.iso");
        let host = ScriptedHost::new(vec![
            ("grub-mkrescue", ToolBehavior::WriteOutput),
            ("mkisofs", ToolBehavior::WriteOutput),
        ]);

        let packaged = default_chain().package(&host, &tree, &output).unwrap();

        assert_eq!(packaged.backend, "grub-rescue");
        assert!(packaged.diagnostics.is_empty());
        assert_eq!(host.programs_run(), vec!["/usr/bin/grub-mkrescue"]);
    }

    #[test]
    fn no_tools_falls_through_to_raw() {
        let temp = TempDir::new().unwrap();
        let tree = staged(&temp);
        let output = temp.path().join("out.iso");
        let host = ScriptedHost::bare();

        let packaged = default_chain().package(&host, &tree, &output).unwrap();

        assert_eq!(packaged.backend, "raw-fallback");
        assert_eq!(packaged.size_bytes, 2 * 1024 * 1024);
        assert_eq!(packaged.diagnostics.len(), 2);
        assert!(packaged.diagnostics.iter().all(|d| d.unavailable));
        assert!(host.programs_run().is_empty());
    }

    #[test]
    fn failing_tool_yields_to_next_and_cleans_partial() {
        let temp = TempDir::new().unwrap();
        let tree = staged(&temp);
        let output = temp.path().join("out.iso");
        let host = ScriptedHost::new(vec![
            ("grub-mkrescue", ToolBehavior::FailAfterPartialWrite),
            ("genisoimage", ToolBehavior::WriteOutput),
        ]);

        let packaged = default_chain().package(&host, &tree, &output).unwrap();

        assert_eq!(packaged.backend, "iso-master");
        assert_eq!(fs::read(&output).unwrap(), b"CD001 scripted iso");
        assert_eq!(packaged.diagnostics.len(), 1);
        assert!(packaged.diagnostics[0]
            .message
            .contains("no space left on device"));
    }

    #[test]
    fn timeout_is_treated_as_failure() {
        let temp = TempDir::new().unwrap();
        let tree = staged(&temp);
        let output = temp.path().join("out.iso");
        let host = ScriptedHost::new(vec![("grub-mkrescue", ToolBehavior::Hang)]);

        let packaged = default_chain().package(&host, &tree, &output).unwrap();

        assert_eq!(packaged.backend, "raw-fallback");
        assert!(packaged.diagnostics[0].message.contains("timed out"));
    }

    #[test]
    fn exhaustion_leaves_no_output() {
        let temp = TempDir::new().unwrap();
        let tree = staged(&temp);
        // Raw fallback cannot create a file under a missing directory.
        let output = temp.path().join("missing/out.iso");
        let host = ScriptedHost::new(vec![
            ("grub-mkrescue", ToolBehavior::FailAfterPartialWrite),
            ("mkisofs", ToolBehavior::Hang),
        ]);

        let err = default_chain().package(&host, &tree, &output).unwrap_err();

        match err {
            BuildError::AllStrategiesExhausted { diagnostics } => {
                let names: Vec<_> = diagnostics.iter().map(|d| d.backend.as_str()).collect();
                assert_eq!(names, vec!["grub-rescue", "iso-master", "raw-fallback"]);
                assert!(diagnostics.iter().all(|d| !d.unavailable));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!output.exists());
    }

    #[test]
    fn exhaustion_removes_partial_from_last_backend() {
        let temp = TempDir::new().unwrap();
        let tree = staged(&temp);
        let output = temp.path().join("out.iso");
        let host = ScriptedHost::new(vec![("grub-mkrescue", ToolBehavior::FailAfterPartialWrite)]);
        let chain =
            PackagingChain::new(vec![BackendKind::GrubRescue.backend(Duration::from_secs(5))]);

        let err = chain.package(&host, &tree, &output).unwrap_err();

        assert!(matches!(err, BuildError::AllStrategiesExhausted { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn stale_output_is_removed_before_trying() {
        let temp = TempDir::new().unwrap();
        let tree = staged(&temp);
        let output = temp.path().join("out.iso");
        let sidecar = temp.path().join("out.sha512");
        fs::write(&output, b"old artifact").unwrap();
        fs::write(&sidecar, b"0123  out.iso\n").unwrap();
        let backends: Vec<Box<dyn PackagingBackend>> = vec![Box::new(AlwaysFails)];
        let chain = PackagingChain::new(backends);

        let err = chain.package(&ScriptedHost::bare(), &tree, &output).unwrap_err();

        assert!(err.to_string().contains("always-fails failed"));
        assert!(!output.exists());
        assert!(!sidecar.exists());
    }

    #[test]
    fn success_without_output_is_a_failure() {
        let temp = TempDir::new().unwrap();
        let tree = staged(&temp);
        let output = temp.path().join("out.iso");
        let backends: Vec<Box<dyn PackagingBackend>> =
            vec![Box::new(SilentSuccess), Box::new(RawFallback)];
        let chain = PackagingChain::new(backends);

        let packaged = chain.package(&ScriptedHost::bare(), &tree, &output).unwrap();

        assert_eq!(packaged.backend, "raw-fallback");
        assert!(packaged.diagnostics[0].message.contains("produced no output"));
    }
}
