//! Raw disk image builder.
//!
//! # Usage
//!
//! ```bash
//! create-image --arch arm64 \
//!     --kernel build/kernel.elf \
//!     --bootloader build/boot.bin \
//!     --output output/minios.img
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use boot_media_builder::telemetry::init_tracing;
use boot_media_builder::{build_raw_image, Architecture, BuildRequest, BuilderConfig};

#[derive(Parser)]
#[command(name = "create-image")]
#[command(version, about = "Create a bootable raw disk image", long_about = None)]
struct Cli {
    /// Target architecture
    #[arg(long, value_enum)]
    arch: Architecture,

    /// Kernel ELF file
    #[arg(long)]
    kernel: PathBuf,

    /// Bootloader binary
    #[arg(long)]
    bootloader: PathBuf,

    /// Output image file
    #[arg(long)]
    output: PathBuf,

    /// Optional builder configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the build result as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = BuilderConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let request = BuildRequest::new(cli.arch, cli.kernel, cli.bootloader, cli.output, cli.verbose);

    let result = build_raw_image(&request, &config)
        .with_context(|| format!("creating image '{}'", request.output().display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result);
    }
    Ok(())
}
