//! GRUB boot menu for the ISO staging tree.
//!
//! Every entry loads the staged kernel through the multiboot2 protocol.

use std::fmt::Write as _;

use serde::Deserialize;

/// Path of the staged kernel as GRUB sees it on the medium.
pub const GRUB_KERNEL_PATH: &str = "/boot/kernel.elf";

/// Menu settings, loadable from the `[menu]` table of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MenuConfig {
    /// Title of the normal boot entry; the debug entry appends " (Debug)".
    pub os_name: String,
    /// Seconds GRUB waits before booting the default entry.
    pub timeout_secs: u32,
    /// Index of the entry booted after the timeout.
    pub default_entry: u32,
    /// Extra kernel arguments for every entry.
    pub cmdline: String,
    /// Arguments that mark the debug entry.
    pub debug_cmdline: String,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            os_name: "MiniOS".to_string(),
            timeout_secs: 5,
            default_entry: 0,
            cmdline: String::new(),
            debug_cmdline: "debug".to_string(),
        }
    }
}

/// A single `menuentry` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub title: String,
    pub args: String,
}

impl MenuConfig {
    /// The normal entry followed by the debug entry.
    pub fn entries(&self) -> Vec<MenuEntry> {
        let debug_args = join_args(&self.cmdline, &self.debug_cmdline);
        vec![
            MenuEntry {
                title: self.os_name.clone(),
                args: self.cmdline.trim().to_string(),
            },
            MenuEntry {
                title: format!("{} (Debug)", self.os_name),
                args: debug_args,
            },
        ]
    }

    /// Render `grub.cfg`.
    pub fn render(&self) -> String {
        let mut cfg = String::new();
        let _ = writeln!(cfg, "set timeout={}", self.timeout_secs);
        let _ = writeln!(cfg, "set default={}", self.default_entry);

        for entry in self.entries() {
            let kernel_line = if entry.args.is_empty() {
                format!("multiboot2 {}", GRUB_KERNEL_PATH)
            } else {
                format!("multiboot2 {} {}", GRUB_KERNEL_PATH, entry.args)
            };
            let _ = writeln!(cfg);
            let _ = writeln!(cfg, "menuentry \"{}\" {{", escape_title(&entry.title));
            let _ = writeln!(cfg, "    {}", kernel_line);
            let _ = writeln!(cfg, "    boot");
            let _ = writeln!(cfg, "}}");
        }

        cfg
    }
}

fn join_args(base: &str, extra: &str) -> String {
    [base.trim(), extra.trim()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_title(title: &str) -> String {
    title.replace('\\', "\\\\").replace('"', "\\\"")
}
