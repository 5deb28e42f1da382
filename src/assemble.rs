//! Raw image assembly: bootloader, zero pad, kernel, zero pad.
//!
//! The same writer backs the primary raw-image path and the ISO raw fallback;
//! only the [`LayoutPolicy`](crate::layout::LayoutPolicy) differs.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{BuildError, ImageResult};
use crate::layout::LayoutPlan;

/// Stream the image described by `plan` into `out`.
///
/// Returns the number of bytes written, which always equals
/// `plan.total_size`.
pub fn write_image<W: Write>(
    out: &mut W,
    bootloader: &[u8],
    kernel: &[u8],
    plan: &LayoutPlan,
) -> io::Result<u64> {
    if bootloader.len() as u64 != plan.bootloader_size || kernel.len() as u64 != plan.kernel_size
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "input sizes do not match the layout plan",
        ));
    }

    out.write_all(bootloader)?;
    write_zeros(out, plan.bootloader_padding())?;
    out.write_all(kernel)?;
    write_zeros(out, plan.trailing_padding())?;
    out.flush()?;

    Ok(plan.total_size)
}

/// Build the image in memory.
pub fn assemble(bootloader: &[u8], kernel: &[u8], plan: &LayoutPlan) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(plan.total_size as usize);
    write_image(&mut buffer, bootloader, kernel, plan)?;
    Ok(buffer)
}

/// Create (or truncate) `path` and write the image into it.
///
/// If writing fails after the file was opened, the partial file is removed;
/// it is never a valid artifact.
pub fn write_image_file(
    path: &Path,
    bootloader: &[u8],
    kernel: &[u8],
    plan: &LayoutPlan,
) -> ImageResult<u64> {
    tracing::debug!(
        path = %path.display(),
        kernel_offset = plan.kernel_offset,
        total_size = plan.total_size,
        "writing raw image"
    );

    let output_failure = |source: io::Error| BuildError::OutputWriteFailure {
        path: path.to_path_buf(),
        source,
    };

    // Nothing was truncated if create fails, so an existing file stays put.
    let file = File::create(path).map_err(output_failure)?;

    let mut writer = BufWriter::new(file);
    let result = write_image(&mut writer, bootloader, kernel, plan).and_then(|written| {
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        Ok(written)
    });

    result.map_err(|source| {
        let _ = fs::remove_file(path);
        output_failure(source)
    })
}

fn write_zeros<W: Write>(out: &mut W, count: u64) -> io::Result<()> {
    let copied = io::copy(&mut io::repeat(0).take(count), out)?;
    if copied != count {
        return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            "short write while padding image",
        ));
    }
    Ok(())
}
