//! End-to-end builds behind the two CLI entry points.
//!
//! - [`build_raw_image`]: validate -> load -> layout -> assemble -> checksum
//! - [`build_iso`]: validate -> stage -> packaging chain -> checksum
//!
//! Missing inputs are reported before anything is created or written.

use std::fs;
use std::path::Path;

use crate::assemble::write_image_file;
use crate::blob::BinaryBlob;
use crate::checksum::write_checksum;
use crate::config::BuilderConfig;
use crate::error::{BuildError, ImageResult, InputRole};
use crate::layout::compute_raw_layout;
use crate::package::{BackendKind, PackagingChain};
use crate::process::ToolHost;
use crate::request::{Architecture, BuildRequest, BuildResult};
use crate::staging::StagingTree;

/// Assemble a raw disk image for `request.architecture()`.
pub fn build_raw_image(
    request: &BuildRequest,
    config: &BuilderConfig,
) -> ImageResult<BuildResult> {
    request.validate_inputs()?;

    tracing::info!("Creating {} image: {}", request.architecture(), request.output().display());
    if request.architecture() == Architecture::X86_64 {
        tracing::info!("  Note: use create-iso for a bootable x86_64 ISO");
    }

    let kernel = BinaryBlob::load(InputRole::Kernel, request.kernel())?;
    let bootloader = BinaryBlob::load(InputRole::Bootloader, request.bootloader())?;
    for blob in [&kernel, &bootloader] {
        tracing::info!("  {}: {} ({} bytes)", blob.role(), blob.path().display(), blob.len());
    }

    ensure_output_dir(request.output())?;

    let plan = compute_raw_layout(bootloader.len(), kernel.len());
    tracing::info!("  Kernel offset: 0x{:08x}", plan.kernel_offset);

    let size_bytes = write_image_file(request.output(), bootloader.bytes(), kernel.bytes(), &plan)?;
    tracing::info!(
        "  Final image size: {} bytes ({} MB)",
        size_bytes,
        size_bytes / (1024 * 1024)
    );

    let sha512 = checksum_if_enabled(request.output(), config)?;

    Ok(BuildResult {
        success: true,
        output_path: request.output().to_path_buf(),
        size_bytes,
        backend: None,
        sha512,
        diagnostic: String::new(),
    })
}

/// Stage the inputs and run the packaging chain from `config`.
///
/// The staging tree is removed before this returns, whatever the outcome.
pub fn build_iso(
    request: &BuildRequest,
    config: &BuilderConfig,
    host: &dyn ToolHost,
) -> ImageResult<BuildResult> {
    request.validate_inputs()?;
    ensure_output_dir(request.output())?;

    let chain = PackagingChain::from_config(config);
    tracing::debug!(order = ?chain.backend_names(), "packaging chain");

    let staging = StagingTree::stage(request.kernel(), request.bootloader(), &config.menu)?;
    tracing::info!("Created ISO structure in: {}", staging.root().display());

    let packaged = chain.package(host, &staging, request.output());
    if let Err(e) = staging.close() {
        tracing::warn!("failed to remove staging tree: {e}");
    }
    let packaged = packaged?;

    let mut notes: Vec<String> = packaged.diagnostics.iter().map(|d| d.to_string()).collect();
    if packaged.backend == BackendKind::RawFallback.id() {
        notes.push("output is a raw disk image, not a standards-compliant ISO".to_string());
    }

    let sha512 = checksum_if_enabled(request.output(), config)?;

    Ok(BuildResult {
        success: true,
        output_path: request.output().to_path_buf(),
        size_bytes: packaged.size_bytes,
        backend: Some(packaged.backend),
        sha512,
        diagnostic: notes.join("\n"),
    })
}

/// Create the parent directory of `output` if it is missing.
pub fn ensure_output_dir(output: &Path) -> ImageResult<()> {
    let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|source| BuildError::OutputWriteFailure {
        path: dir.to_path_buf(),
        source,
    })
}

fn checksum_if_enabled(output: &Path, config: &BuilderConfig) -> ImageResult<Option<String>> {
    if !config.write_checksum {
        return Ok(None);
    }
    let (_, hash) = write_checksum(output)?;
    Ok(Some(hash))
}
