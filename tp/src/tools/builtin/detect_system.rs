//! detect_system tool - operating system and distribution detection

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolResult};

/// Release marker files under `/etc`, checked in order
const RELEASE_MARKERS: &[(&str, &str)] = &[
    ("etc/arch-release", "Arch Linux"),
    ("etc/debian_version", "Debian/Ubuntu"),
    ("etc/redhat-release", "Red Hat/CentOS"),
    ("etc/fedora-release", "Fedora"),
    ("etc/opensuse-release", "openSUSE"),
];

/// Package manager to distribution family, checked in order
const DISTRO_FAMILIES: &[(&str, &str)] = &[
    ("pacman", "Arch-based"),
    ("apt", "Debian-based"),
    ("yum", "Red Hat-based"),
    ("dnf", "Fedora-based"),
    ("zypper", "openSUSE-based"),
];

/// Package managers reported by `get_system_info`
pub const PACKAGE_MANAGERS: &[&str] = &["pacman", "apt", "yum", "dnf", "zypper", "brew"];

const UNAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Detect the operating system and distribution
pub struct DetectSystemTool;

#[async_trait]
impl Tool for DetectSystemTool {
    fn name(&self) -> &'static str {
        "detect_system"
    }

    fn description(&self) -> &'static str {
        "Detect the operating system and distribution."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _input: Value, _ctx: &mut ToolContext) -> ToolResult {
        debug!("DetectSystemTool::execute: called");
        ToolResult::success(detect_system().await)
    }
}

/// Detect the host system: release markers, then package managers, then `uname -s`
pub async fn detect_system() -> String {
    detect_from(Path::new("/"), |pm| which::which(pm).is_ok()).await
}

async fn detect_from(root: &Path, available: impl Fn(&str) -> bool) -> String {
    debug!(?root, "detect_from: called");
    for (marker, name) in RELEASE_MARKERS {
        if root.join(marker).exists() {
            debug!(%marker, "detect_from: release marker found");
            return name.to_string();
        }
    }

    for (pm, family) in DISTRO_FAMILIES {
        if available(pm) {
            debug!(%pm, "detect_from: package manager found");
            return family.to_string();
        }
    }

    match uname("-s").await {
        Some(system) => system,
        None => "Unknown system".to_string(),
    }
}

/// Run `uname <flag>` and return its trimmed output on success
pub async fn uname(flag: &str) -> Option<String> {
    debug!(%flag, "uname: called");
    let output = tokio::time::timeout(UNAME_TIMEOUT, tokio::process::Command::new("uname").arg(flag).output())
        .await
        .ok()?
        .ok()?;
    if !output.status.success() {
        debug!(status = ?output.status, "uname: failed");
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() { None } else { Some(text) }
}
