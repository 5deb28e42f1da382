//! SHA-512 checksum sidecar for finished artifacts.
//!
//! Written in `sha512sum` format with just the file name, so users can verify
//! with `cd output && sha512sum -c minios.sha512`.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha512};

use crate::error::{BuildError, ImageResult};

pub const CHECKSUM_EXTENSION: &str = "sha512";

/// Two spaces between hash and file name, as `sha512sum` prints it.
const SEPARATOR: &str = "  ";

/// Hex SHA-512 of the file at `path`.
pub fn sha512_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha512::new();
    let mut buf = [0u8; 1024 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// `<artifact>` with its extension replaced by `.sha512`.
pub fn sidecar_path(artifact: &Path) -> PathBuf {
    artifact.with_extension(CHECKSUM_EXTENSION)
}

/// Hash `artifact` and write `<artifact>.sha512` (extension replaced).
///
/// Returns the sidecar path and the hex digest.
pub fn write_checksum(artifact: &Path) -> ImageResult<(PathBuf, String)> {
    let hash = sha512_file(artifact).map_err(|source| BuildError::OutputWriteFailure {
        path: artifact.to_path_buf(),
        source,
    })?;

    let filename = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let checksum_path = sidecar_path(artifact);

    fs::write(&checksum_path, format!("{hash}{SEPARATOR}{filename}\n")).map_err(|source| {
        BuildError::OutputWriteFailure {
            path: checksum_path.clone(),
            source,
        }
    })?;

    tracing::info!(
        "SHA512: {}...{}",
        &hash[..8],
        &hash[hash.len() - 8..]
    );
    tracing::debug!(path = %checksum_path.display(), "wrote checksum");

    Ok((checksum_path, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn known_digest_of_abc() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("abc.img");
        fs::write(&path, b"abc").unwrap();

        let hash = sha512_file(&path).unwrap();
        assert!(hash.starts_with("ddaf35a193617aba"));
        assert_eq!(hash.len(), 128);
    }

    #[test]
    fn sidecar_uses_bare_filename() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("minios.iso");
        fs::write(&path, b"iso bytes").unwrap();

        let (sidecar, hash) = write_checksum(&path).unwrap();

        assert_eq!(sidecar, temp.path().join("minios.sha512"));
        assert_eq!(
            fs::read_to_string(&sidecar).unwrap(),
            format!("{hash}  minios.iso\n")
        );
    }
}
