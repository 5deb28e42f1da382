//! Bootable ISO builder for x86_64.
//!
//! Tries `grub-mkrescue`, then `mkisofs`/`genisoimage`, then falls back to a
//! plain raw image (see `packaging.order` in the config file).
//!
//! # Usage
//!
//! ```bash
//! create-iso --kernel build/kernel.elf \
//!     --bootloader build/boot.bin \
//!     --output output/minios.iso
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use boot_media_builder::preflight::packaging_tool_report;
use boot_media_builder::process::SystemHost;
use boot_media_builder::telemetry::init_tracing;
use boot_media_builder::{build_iso, Architecture, BuildRequest, BuilderConfig};

#[derive(Parser)]
#[command(name = "create-iso")]
#[command(version, about = "Create a bootable ISO image", long_about = None)]
struct Cli {
    /// Kernel ELF file
    #[arg(long)]
    kernel: PathBuf,

    /// Bootloader binary
    #[arg(long)]
    bootloader: PathBuf,

    /// Output ISO file
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
    let request = BuildRequest::new(
        Architecture::X86_64,
        cli.kernel,
        cli.bootloader,
        cli.output,
        cli.verbose,
    );

    let host = SystemHost;
    if request.verbose() {
        eprintln!("Packaging tools:");
        for check in packaging_tool_report(&host) {
            eprintln!("{}", check);
        }
    }

    let result = build_iso(&request, &config, &host)
        .with_context(|| format!("creating ISO '{}'", request.output().display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result);
    }
    Ok(())
}
