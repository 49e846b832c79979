//! Installed engine version and the incompatible-version gate.

use std::fmt;

/// Dotted version string as reported by package metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo(String);

impl VersionInfo {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading digits of the first dotted component (`"4.0.2"` -> 4,
    /// `"10rc1"` -> 10). `None` when there are no leading digits.
    pub fn major(&self) -> Option<u64> {
        let first = self.0.split('.').next()?;
        let digits: String = first.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().ok()
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract `Version:` from `pip show`-style metadata.
pub fn version_from_metadata(metadata: &str) -> Option<VersionInfo> {
    metadata
        .lines()
        .find_map(|line| line.trim_start().strip_prefix("Version:"))
        .map(VersionInfo::new)
        .filter(|v| !v.as_str().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Major version is not the known-incompatible one.
    Continue,
    /// Known-incompatible; the caller must ask before going on.
    NeedsConfirmation,
    /// Known-incompatible, but the caller pre-approved continuing.
    AutoConfirmed,
}

pub fn gate(version: &VersionInfo, incompatible_major: u64, auto_confirm: bool) -> GateDecision {
    if version.major() != Some(incompatible_major) {
        GateDecision::Continue
    } else if auto_confirm {
        GateDecision::AutoConfirmed
    } else {
        GateDecision::NeedsConfirmation
    }
}

/// `yes` or `y`, ignoring case and surrounding whitespace. Anything else,
/// including an empty answer, declines.
pub fn is_affirmative(response: &str) -> bool {
    let response = response.trim();
    response.eq_ignore_ascii_case("yes") || response.eq_ignore_ascii_case("y")
}
