//! Builder configuration loaded from an optional TOML file.
//!
//! ```toml
//! tool_timeout_secs = 120
//! write_checksum = true
//!
//! [menu]
//! os_name = "MiniOS"
//! cmdline = "console=ttyS0"
//!
//! [packaging]
//! order = ["iso-master", "raw-fallback"]
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{BuildError, ImageResult};
use crate::menu::MenuConfig;
use crate::package::BackendKind;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuilderConfig {
    /// Upper bound for each external packaging tool run.
    pub tool_timeout_secs: u64,
    /// Write a `.sha512` file next to every successful artifact.
    pub write_checksum: bool,
    pub menu: MenuConfig,
    pub packaging: PackagingConfig,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 300,
            write_checksum: true,
            menu: MenuConfig::default(),
            packaging: PackagingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackagingConfig {
    /// Backends in the order they are tried.
    pub order: Vec<BackendKind>,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            order: BackendKind::DEFAULT_ORDER.to_vec(),
        }
    }
}

impl BuilderConfig {
    /// Load from `path`, or return defaults when no path is given.
    pub fn load(path: Option<&Path>) -> ImageResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = fs::read_to_string(path).map_err(|e| {
            BuildError::InvalidConfig(format!("reading '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&text).map_err(|e| match e {
            BuildError::InvalidConfig(msg) => {
                BuildError::InvalidConfig(format!("'{}': {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_toml_str(text: &str) -> ImageResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| BuildError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    fn validate(&self) -> ImageResult<()> {
        if self.tool_timeout_secs == 0 {
            return Err(BuildError::InvalidConfig(
                "tool_timeout_secs must be greater than zero".to_string(),
            ));
        }

        let order = &self.packaging.order;
        if order.is_empty() {
            return Err(BuildError::InvalidConfig(
                "packaging.order must name at least one backend".to_string(),
            ));
        }
        for (i, kind) in order.iter().enumerate() {
            if order[..i].contains(kind) {
                return Err(BuildError::InvalidConfig(format!(
                    "packaging.order lists '{}' more than once",
                    kind
                )));
            }
        }

        if self.menu.os_name.trim().is_empty() {
            return Err(BuildError::InvalidConfig(
                "menu.os_name must not be empty".to_string(),
            ));
        }
        if self.menu.debug_cmdline.trim().is_empty() {
            return Err(BuildError::InvalidConfig(
                "menu.debug_cmdline must not be empty".to_string(),
            ));
        }
        for (key, value) in [
            ("menu.os_name", &self.menu.os_name),
            ("menu.cmdline", &self.menu.cmdline),
            ("menu.debug_cmdline", &self.menu.debug_cmdline),
        ] {
            if value.chars().any(char::is_control) {
                return Err(BuildError::InvalidConfig(format!(
                    "{key} must not contain control characters"
                )));
            }
        }
        if self.menu.default_entry > 1 {
            return Err(BuildError::InvalidConfig(format!(
                "menu.default_entry {} is out of range (menu has 2 entries)",
                self.menu.default_entry
            )));
        }

        Ok(())
    }
}
