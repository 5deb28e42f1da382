//! Byte layout of a raw boot image.
//!
//! The bootloader always sits at offset 0 so firmware reading sector 0 finds
//! it. The kernel follows at the next multiple of the policy's alignment
//! unit, and the whole image is padded up to an aligned size that never drops
//! below the policy's minimum.
//!
//! ```text
//! 0                bootloader_size   kernel_offset       kernel_end    total_size
//! |-- bootloader --|--- zero pad ----|------ kernel ------|-- zero pad --|
//! ```

/// One mebibyte.
pub const MIB: u64 = 1024 * 1024;

/// Disk sector size used by the ISO fallback path.
pub const SECTOR_SIZE: u64 = 512;

/// Alignment and size floor for one kind of raw image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutPolicy {
    /// Kernel offset and total size are rounded up to multiples of this.
    pub alignment: u64,
    /// The image is never smaller than this.
    pub minimum_image_size: u64,
}

impl LayoutPolicy {
    /// Primary raw disk image: kernel at a 1 MiB boundary, 16 MiB floor.
    pub const RAW_IMAGE: LayoutPolicy = LayoutPolicy {
        alignment: MIB,
        minimum_image_size: 16 * MIB,
    };

    /// Last-resort ISO packaging: sector-aligned kernel, 2 MiB floor.
    pub const ISO_FALLBACK: LayoutPolicy = LayoutPolicy {
        alignment: SECTOR_SIZE,
        minimum_image_size: 2 * MIB,
    };

    /// Compute where each blob goes. Total for every input size.
    pub fn compute(&self, bootloader_size: u64, kernel_size: u64) -> LayoutPlan {
        let kernel_offset = round_up(bootloader_size, self.alignment);
        let kernel_end = kernel_offset + kernel_size;
        let total_size = round_up(kernel_end, self.alignment).max(self.minimum_image_size);

        LayoutPlan {
            bootloader_size,
            kernel_offset,
            kernel_size,
            total_size,
        }
    }
}

/// Layout for the primary raw-image path.
pub fn compute_raw_layout(bootloader_size: u64, kernel_size: u64) -> LayoutPlan {
    LayoutPolicy::RAW_IMAGE.compute(bootloader_size, kernel_size)
}

/// Absolute offsets for one assembled image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutPlan {
    pub bootloader_size: u64,
    pub kernel_offset: u64,
    pub kernel_size: u64,
    pub total_size: u64,
}

impl LayoutPlan {
    /// Zero bytes between the end of the bootloader and the kernel.
    pub fn bootloader_padding(&self) -> u64 {
        self.kernel_offset - self.bootloader_size
    }

    /// First byte after the kernel.
    pub fn kernel_end(&self) -> u64 {
        self.kernel_offset + self.kernel_size
    }

    /// Zero bytes between the end of the kernel and the end of the image.
    pub fn trailing_padding(&self) -> u64 {
        self.total_size - self.kernel_end()
    }
}

/// Smallest multiple of `unit` that is `>= value`.
fn round_up(value: u64, unit: u64) -> u64 {
    value.div_ceil(unit) * unit
}
