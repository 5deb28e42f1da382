//! ISO staging tree.
//!
//! Layout inside a uniquely named temporary directory:
//!
//! ```text
//! <tmp>/boot/kernel.elf
//! <tmp>/boot/bootloader.bin
//! <tmp>/boot/grub/grub.cfg
//! ```
//!
//! The directory is removed when the [`StagingTree`] is dropped, on every
//! exit path.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::blob::require_input;
use crate::error::{BuildError, ImageResult, InputRole};
use crate::menu::MenuConfig;

pub const BOOT_DIR: &str = "boot";
pub const GRUB_DIR: &str = "boot/grub";
pub const STAGED_KERNEL: &str = "boot/kernel.elf";
pub const STAGED_BOOTLOADER: &str = "boot/bootloader.bin";
pub const GRUB_CFG: &str = "boot/grub/grub.cfg";

const STAGING_PREFIX: &str = "iso-staging-";

/// A populated staging directory, read-only for packaging backends.
#[derive(Debug)]
pub struct StagingTree {
    dir: TempDir,
}

impl StagingTree {
    /// Copy both inputs into a fresh temporary tree and write the boot menu.
    ///
    /// The originals are copied, never moved.
    pub fn stage(kernel: &Path, bootloader: &Path, menu: &MenuConfig) -> ImageResult<Self> {
        require_input(InputRole::Kernel, kernel)?;
        require_input(InputRole::Bootloader, bootloader)?;

        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir()
            .map_err(|source| BuildError::StagingFailure {
                path: std::env::temp_dir(),
                source,
            })?;
        let tree = Self { dir };

        tree.populate(kernel, bootloader, menu)?;
        tracing::debug!(root = %tree.root().display(), "staged ISO tree");
        Ok(tree)
    }

    fn populate(&self, kernel: &Path, bootloader: &Path, menu: &MenuConfig) -> ImageResult<()> {
        let grub_dir = self.root().join(GRUB_DIR);
        fs::create_dir_all(&grub_dir).map_err(|source| BuildError::StagingFailure {
            path: grub_dir.clone(),
            source,
        })?;

        self.copy_input(InputRole::Kernel, kernel, &self.kernel_path())?;
        self.copy_input(InputRole::Bootloader, bootloader, &self.bootloader_path())?;

        let cfg_path = self.grub_cfg_path();
        fs::write(&cfg_path, menu.render()).map_err(|source| BuildError::StagingFailure {
            path: cfg_path.clone(),
            source,
        })?;

        Ok(())
    }

    fn copy_input(&self, role: InputRole, src: &Path, dst: &Path) -> ImageResult<()> {
        fs::copy(src, dst).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound if !src.exists() => BuildError::MissingInputFile {
                role,
                path: src.to_path_buf(),
            },
            _ => BuildError::StagingFailure {
                path: dst.to_path_buf(),
                source,
            },
        })?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn kernel_path(&self) -> PathBuf {
        self.root().join(STAGED_KERNEL)
    }

    pub fn bootloader_path(&self) -> PathBuf {
        self.root().join(STAGED_BOOTLOADER)
    }

    pub fn grub_cfg_path(&self) -> PathBuf {
        self.root().join(GRUB_CFG)
    }

    /// Remove the tree now, reporting any error instead of ignoring it.
    pub fn close(self) -> ImageResult<()> {
        let path = self.root().to_path_buf();
        self.dir
            .close()
            .map_err(|source| BuildError::StagingFailure { path, source })
    }
}
