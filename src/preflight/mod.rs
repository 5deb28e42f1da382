//! Host tool discovery for ISO packaging.
//!
//! None of the packaging tools is required (the raw fallback needs nothing),
//! so this reports what is installed instead of failing the build.
//!
//! # Example
//!
//! ```rust
//! use boot_media_builder::preflight::{command_exists, packaging_tool_report};
//! use boot_media_builder::process::SystemHost;
//!
//! if !command_exists("grub-mkrescue") {
//!     println!("grub-mkrescue not installed");
//! }
//!
//! for check in packaging_tool_report(&SystemHost) {
//!     println!("{}", check);
//! }
//! ```

use std::fmt;
use std::path::PathBuf;

use crate::process::{SystemHost, ToolHost};

/// Check if a command exists on the host system.
pub fn command_exists(cmd: &str) -> bool {
    SystemHost.locate(cmd).is_some()
}

/// Optional packaging tools, as (command, package providing it).
pub const PACKAGING_TOOLS: &[(&str, &str)] = &[
    ("grub-mkrescue", "grub2-tools / grub-common (plus xorriso)"),
    ("mkisofs", "cdrtools"),
    ("genisoimage", "genisoimage"),
];

/// Lookup result for one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCheck {
    pub tool: &'static str,
    pub package: &'static str,
    pub path: Option<PathBuf>,
}

impl fmt::Display for ToolCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "  {:<14} found at {}", self.tool, path.display()),
            None => write!(f, "  {:<14} missing (install: {})", self.tool, self.package),
        }
    }
}

/// Resolve every packaging tool on `host`.
pub fn packaging_tool_report(host: &dyn ToolHost) -> Vec<ToolCheck> {
    PACKAGING_TOOLS
        .iter()
        .map(|(tool, package)| ToolCheck {
            tool,
            package,
            path: host.locate(tool),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::testing::{ScriptedHost, ToolBehavior};

    #[test]
    fn test_command_exists() {
        // 'sh' should exist on any Unix system
        assert!(command_exists("sh"));
        assert!(!command_exists("definitely_not_a_real_command_12345"));
    }

    #[test]
    fn report_covers_every_tool() {
        let host = ScriptedHost::new(vec![("mkisofs", ToolBehavior::WriteOutput)]);
        let report = packaging_tool_report(&host);

        assert_eq!(report.len(), PACKAGING_TOOLS.len());
        let found: Vec<_> = report
            .iter()
            .filter(|c| c.path.is_some())
            .map(|c| c.tool)
            .collect();
        assert_eq!(found, vec!["mkisofs"]);
    }

    #[test]
    fn missing_tool_shows_package() {
        let check = ToolCheck {
            tool: "genisoimage",
            package: "genisoimage",
            path: None,
        };
        assert!(check.to_string().contains("missing (install: genisoimage)"));
    }
}
