//! `grub-mkrescue` backend.
//!
//! GRUB builds a complete rescue disc around the staging tree, picking up
//! `boot/grub/grub.cfg` on its own. Its exit status is the success signal.

use std::time::Duration;

use super::{tool_failure, Attempt, Availability, PackagingBackend};
use crate::error::ImageResult;
use crate::process::{Cmd, ToolHost};

pub const GRUB_MKRESCUE: &str = "grub-mkrescue";

#[derive(Debug, Clone, Copy)]
pub struct GrubRescue {
    timeout: Duration,
}

impl GrubRescue {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn command(&self, attempt: &Attempt<'_>) -> Cmd {
        let program = attempt
            .tool
            .map(|p| p.as_os_str().to_os_string())
            .unwrap_or_else(|| GRUB_MKRESCUE.into());

        Cmd::new(program)
            .arg("-o")
            .arg_path(attempt.output)
            .arg_path(attempt.staging.root())
            .timeout(self.timeout)
            .error_msg("grub-mkrescue failed to build the rescue image")
    }
}

impl PackagingBackend for GrubRescue {
    fn name(&self) -> &str {
        "grub-rescue"
    }

    fn probe(&self, host: &dyn ToolHost) -> Availability {
        match host.locate(GRUB_MKRESCUE) {
            Some(path) => Availability::Ready { tool: Some(path) },
            None => Availability::Unavailable {
                tools: vec![GRUB_MKRESCUE.to_string()],
            },
        }
    }

    fn attempt(&self, attempt: &Attempt<'_>) -> ImageResult<()> {
        let cmd = self.command(attempt);
        tracing::info!("Running: {}", cmd.display());
        attempt
            .host
            .run(&cmd)
            .map_err(|e| tool_failure(GRUB_MKRESCUE, e))?;
        Ok(())
    }
}
