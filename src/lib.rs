//! Boot media assembly for a kernel + bootloader pair.
//!
//! Two outputs are supported:
//!
//! - **Raw disk image** - bootloader at offset 0, kernel at the next 1 MiB
//!   boundary, zero-padded to at least 16 MiB
//! - **Bootable ISO** - a staging tree (kernel, bootloader, GRUB menu) handed
//!   to the first packaging backend that works on this host
//!
//! # Architecture
//!
//! ```text
//! create-image ──> build::build_raw_image
//!                     │
//!                     ├── blob       load inputs
//!                     ├── layout     offsets and total size
//!                     └── assemble   byte-exact write
//!
//! create-iso ────> build::build_iso
//!                     │
//!                     ├── staging    temp tree + menu::render()
//!                     └── package    PackagingChain
//!                                      ├── GrubRescue   (grub-mkrescue)
//!                                      ├── IsoMaster    (mkisofs / genisoimage)
//!                                      └── RawFallback  (layout + assemble)
//! ```
//!
//! External tools are reached through [`process::ToolHost`], so the chain can
//! be driven without any of them installed.
//!
//! # Example
//!
//! ```rust,no_run
//! use boot_media_builder::{build_raw_image, Architecture, BuildRequest, BuilderConfig};
//!
//! let request = BuildRequest::new(
//!     Architecture::Arm64,
//!     "build/kernel.elf",
//!     "build/boot.bin",
//!     "output/minios.img",
//!     false,
//! );
//! let result = build_raw_image(&request, &BuilderConfig::default())?;
//! println!("{}", result);
//! # Ok::<(), boot_media_builder::BuildError>(())
//! ```

pub mod assemble;
pub mod blob;
pub mod build;
pub mod checksum;
pub mod config;
pub mod error;
pub mod layout;
pub mod menu;
pub mod package;
pub mod preflight;
pub mod process;
pub mod request;
pub mod staging;
pub mod telemetry;

pub use build::{build_iso, build_raw_image};
pub use config::BuilderConfig;
pub use error::{BuildError, ImageResult};
pub use layout::{compute_raw_layout, LayoutPlan};
pub use package::{BackendKind, PackagingChain};
pub use request::{Architecture, BuildRequest, BuildResult};
