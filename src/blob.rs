//! Input binaries loaded from disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{BuildError, ImageResult, InputRole};

/// Raw bytes of a kernel or bootloader. Never mutated after load.
#[derive(Debug, Clone)]
pub struct BinaryBlob {
    role: InputRole,
    path: PathBuf,
    bytes: Vec<u8>,
}

impl BinaryBlob {
    /// Read the whole file at `path`.
    pub fn load(role: InputRole, path: &Path) -> ImageResult<Self> {
        let bytes = fs::read(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => BuildError::MissingInputFile {
                role,
                path: path.to_path_buf(),
            },
            _ => BuildError::InputReadFailure {
                role,
                path: path.to_path_buf(),
                source,
            },
        })?;

        tracing::debug!(%role, path = %path.display(), size = bytes.len(), "loaded input");
        Ok(Self {
            role,
            path: path.to_path_buf(),
            bytes,
        })
    }

    pub fn role(&self) -> InputRole {
        self.role
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Fail with `MissingInputFile` unless `path` is an existing regular file.
pub fn require_input(role: InputRole, path: &Path) -> ImageResult<()> {
    if path.is_file() {
        return Ok(());
    }
    Err(BuildError::MissingInputFile {
        role,
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_reads_exact_bytes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("boot.bin");
        fs::write(&path, [0xEB, 0x3C, 0x90]).unwrap();

        let blob = BinaryBlob::load(InputRole::Bootloader, &path).unwrap();
        assert_eq!(blob.bytes(), &[0xEB, 0x3C, 0x90]);
        assert_eq!(blob.len(), 3);
        assert_eq!(blob.role(), InputRole::Bootloader);
    }

    #[test]
    fn load_missing_file_is_missing_input() {
        let temp = TempDir::new().unwrap();
        let err = BinaryBlob::load(InputRole::Kernel, &temp.path().join("kernel.elf"))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::MissingInputFile {
                role: InputRole::Kernel,
                ..
            }
        ));
    }

    #[test]
    fn require_input_rejects_directories() {
        let temp = TempDir::new().unwrap();
        assert!(require_input(InputRole::Kernel, temp.path()).is_err());
    }
}
