//! Tool-free last resort: bootloader and kernel concatenated into a raw
//! image. Not a standards-validated optical disc, but the pipeline never
//! fails just because no packaging tool is installed.

use super::{Attempt, Availability, PackagingBackend};
use crate::assemble::write_image_file;
use crate::blob::BinaryBlob;
use crate::error::{ImageResult, InputRole};
use crate::layout::LayoutPolicy;
use crate::process::ToolHost;

#[derive(Debug, Clone, Copy, Default)]
pub struct RawFallback;

impl PackagingBackend for RawFallback {
    fn name(&self) -> &str {
        "raw-fallback"
    }

    fn probe(&self, _host: &dyn ToolHost) -> Availability {
        Availability::Ready { tool: None }
    }

    fn attempt(&self, attempt: &Attempt<'_>) -> ImageResult<()> {
        tracing::warn!("Creating simple disk image (not a bootable ISO)");
        tracing::warn!("Install grub-mkrescue or mkisofs for proper ISO creation");

        let bootloader =
            BinaryBlob::load(InputRole::Bootloader, &attempt.staging.bootloader_path())?;
        let kernel = BinaryBlob::load(InputRole::Kernel, &attempt.staging.kernel_path())?;
        let plan = LayoutPolicy::ISO_FALLBACK.compute(bootloader.len(), kernel.len());

        write_image_file(attempt.output, bootloader.bytes(), kernel.bytes(), &plan)?;
        Ok(())
    }
}
