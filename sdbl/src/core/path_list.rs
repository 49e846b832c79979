//! Parsing, filtering and rebuilding PATH-like variables.

use std::fmt;

/// Platform separator between PATH segments.
pub const SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

/// Ordered PATH segments. Order is search precedence.
///
/// Never holds an empty segment: `parse` drops them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathList {
    segments: Vec<String>,
}

impl PathList {
    pub fn parse(value: &str, separator: char) -> Self {
        value
            .split(separator)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn join(&self, separator: char) -> String {
        let mut sep = [0u8; 4];
        self.segments.join(separator.encode_utf8(&mut sep))
    }

    /// Segments that do not match `deny`, in their original order.
    pub fn without_denied(&self, deny: &DenyList) -> PathList {
        self.segments
            .iter()
            .filter(|segment| !deny.matches(segment))
            .cloned()
            .collect()
    }
}

impl FromIterator<String> for PathList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().filter(|s| !s.is_empty()).collect(),
        }
    }
}

impl fmt::Display for PathList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join(SEPARATOR))
    }
}

/// Case-insensitive substring markers identifying stale runtime segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DenyList {
    markers: Vec<String>,
}

impl DenyList {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|m| m.as_ref().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    pub fn matches(&self, segment: &str) -> bool {
        let segment = segment.to_lowercase();
        self.markers
            .iter()
            .any(|marker| segment.contains(marker.as_str()))
    }
}

/// Result of [`normalize_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathNormalization {
    /// Runtime directory first, then the kept segments.
    pub path: PathList,
    pub kept: Vec<String>,
    /// Denied segments. Dropped from the result, not archived anywhere.
    pub removed: Vec<String>,
    /// Copies of the runtime directory dropped from `kept` (only with dedupe).
    pub deduplicated: usize,
}

/// Remove denied segments and put `runtime_dir` in front.
///
/// With `dedupe = false` the runtime directory is prepended unconditionally,
/// so it can appear twice when it was already on PATH. With `dedupe = true`
/// later copies are dropped.
pub fn normalize_path(
    current: &PathList,
    runtime_dir: &str,
    deny: &DenyList,
    dedupe: bool,
) -> PathNormalization {
    let (removed, mut kept): (Vec<String>, Vec<String>) = current
        .segments()
        .iter()
        .cloned()
        .partition(|segment| deny.matches(segment));

    let mut deduplicated = 0;
    if dedupe {
        let before = kept.len();
        kept.retain(|segment| !same_dir(segment, runtime_dir));
        deduplicated = before - kept.len();
    }

    let path = std::iter::once(runtime_dir.to_string())
        .chain(kept.iter().cloned())
        .collect();

    PathNormalization {
        path,
        kept,
        removed,
        deduplicated,
    }
}

fn same_dir(a: &str, b: &str) -> bool {
    let a = a.trim_end_matches(['/', '\\']);
    let b = b.trim_end_matches(['/', '\\']);
    if cfg!(windows) {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}
