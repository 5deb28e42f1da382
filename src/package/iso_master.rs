//! Generic ISO-9660 mastering backend (`mkisofs` or `genisoimage`).
//!
//! Both tools take the same flags, so whichever is found first is used. The
//! disc gets an El Torito boot catalog pointing at the staged bootloader:
//! no emulation, 4 sectors loaded, boot info table patched in.

use std::time::Duration;

use super::{tool_failure, Attempt, Availability, PackagingBackend};
use crate::error::ImageResult;
use crate::process::{Cmd, ToolHost};
use crate::staging::STAGED_BOOTLOADER;

/// Equivalent mastering tools, in lookup order.
pub const ISO_MASTER_TOOLS: &[&str] = &["mkisofs", "genisoimage"];

/// Sectors the firmware loads from the boot image.
pub const BOOT_LOAD_SECTORS: u32 = 4;

#[derive(Debug, Clone, Copy)]
pub struct IsoMaster {
    timeout: Duration,
}

impl IsoMaster {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// El Torito flags shared by both tools.
    pub fn el_torito_args() -> Vec<String> {
        vec![
            "-b".to_string(),
            STAGED_BOOTLOADER.to_string(),
            "-no-emul-boot".to_string(),
            "-boot-load-size".to_string(),
            BOOT_LOAD_SECTORS.to_string(),
            "-boot-info-table".to_string(),
        ]
    }
}

impl PackagingBackend for IsoMaster {
    fn name(&self) -> &str {
        "iso-master"
    }

    fn probe(&self, host: &dyn ToolHost) -> Availability {
        for tool in ISO_MASTER_TOOLS {
            if let Some(path) = host.locate(tool) {
                tracing::debug!(tool, path = %path.display(), "found ISO mastering tool");
                return Availability::Ready { tool: Some(path) };
            }
        }
        Availability::Unavailable {
            tools: ISO_MASTER_TOOLS.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn attempt(&self, attempt: &Attempt<'_>) -> ImageResult<()> {
        let program = attempt
            .tool
            .map(|p| p.as_os_str().to_os_string())
            .unwrap_or_else(|| ISO_MASTER_TOOLS[0].into());
        let tool_name = attempt
            .tool
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ISO_MASTER_TOOLS[0].to_string());

        let cmd = Cmd::new(program)
            .args(Self::el_torito_args())
            .arg("-o")
            .arg_path(attempt.output)
            .arg_path(attempt.staging.root())
            .timeout(self.timeout)
            .error_msg(format!("{tool_name} failed to master the ISO"));

        tracing::info!("Running: {}", cmd.display());
        attempt
            .host
            .run(&cmd)
            .map_err(|e| tool_failure(&tool_name, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::MenuConfig;
    use crate::package::testing::{ScriptedHost, ToolBehavior};
    use crate::staging::StagingTree;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn probe_prefers_mkisofs() {
        let host = ScriptedHost::new(vec![
            ("genisoimage", ToolBehavior::WriteOutput),
            ("mkisofs", ToolBehavior::WriteOutput),
        ]);
        assert_eq!(
            IsoMaster::new(Duration::from_secs(1)).probe(&host),
            Availability::Ready {
                tool: Some(PathBuf::from("/usr/bin/mkisofs"))
            }
        );
    }

    #[test]
    fn probe_accepts_genisoimage_alone() {
        let host = ScriptedHost::new(vec![("genisoimage", ToolBehavior::WriteOutput)]);
        assert_eq!(
            IsoMaster::new(Duration::from_secs(1)).probe(&host),
            Availability::Ready {
                tool: Some(PathBuf::from("/usr/bin/genisoimage"))
            }
        );
    }

    #[test]
    fn probe_lists_both_tools_when_missing() {
        let availability = IsoMaster::new(Duration::from_secs(1)).probe(&ScriptedHost::bare());
        assert_eq!(
            availability,
            Availability::Unavailable {
                tools: vec!["mkisofs".to_string(), "genisoimage".to_string()]
            }
        );
    }

    #[test]
    fn invocation_is_el_torito_no_emulation() {
        let temp = TempDir::new().unwrap();
        let kernel = temp.path().join("k");
        let bootloader = temp.path().join("b");
        fs::write(&kernel, b"k").unwrap();
        fs::write(&bootloader, b"b").unwrap();
        let tree = StagingTree::stage(&kernel, &bootloader, &MenuConfig::default()).unwrap();
        let output = temp.path().join("minios.iso");

        let host = ScriptedHost::new(vec![("genisoimage", ToolBehavior::WriteOutput)]);
        let tool = PathBuf::from("/usr/bin/genisoimage");
        IsoMaster::new(Duration::from_secs(1))
            .attempt(&Attempt {
                host: &host,
                staging: &tree,
                output: &output,
                tool: Some(&tool),
            })
            .unwrap();

        let calls = host.calls.borrow();
        let args: Vec<_> = calls[0]
            .get_args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            &args[..6],
            &[
                "-b",
                "boot/bootloader.bin",
                "-no-emul-boot",
                "-boot-load-size",
                "4",
                "-boot-info-table"
            ]
        );
        assert_eq!(args[6], "-o");
        assert_eq!(args[7], output.display().to_string());
        assert_eq!(args[8], tree.root().display().to_string());
        assert!(output.is_file());
    }

    #[test]
    fn failure_names_the_tool() {
        let temp = TempDir::new().unwrap();
        let kernel = temp.path().join("k");
        let bootloader = temp.path().join("b");
        fs::write(&kernel, b"k").unwrap();
        fs::write(&bootloader, b"b").unwrap();
        let tree = StagingTree::stage(&kernel, &bootloader, &MenuConfig::default()).unwrap();
        let output = temp.path().join("minios.iso");

        let host = ScriptedHost::new(vec![("mkisofs", ToolBehavior::FailAfterPartialWrite)]);
        let tool = PathBuf::from("/usr/bin/mkisofs");
        let err = IsoMaster::new(Duration::from_secs(1))
            .attempt(&Attempt {
                host: &host,
                staging: &tree,
                output: &output,
                tool: Some(&tool),
            })
            .unwrap_err();

        assert!(err.to_string().starts_with("mkisofs failed"));
    }
}
