//! Locating the interpreter the engine's driver and workers should use.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::core::path_list::PathList;

/// Resolve the runtime executable.
///
/// An explicit path wins and must exist. Otherwise the first segment of
/// `search` (in precedence order) containing one of `candidates` is used.
/// Callers pass PATH with denied segments already removed so a stale runtime
/// is never picked.
pub fn locate_runtime(
    explicit: Option<&Path>,
    candidates: &[String],
    search: &PathList,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let path = absolute(path)?;
        if !path.is_file() {
            bail!("runtime executable not found: {}", path.display());
        }
        debug!(runtime = %path.display(), "using explicit runtime");
        return Ok(path);
    }

    for segment in search.segments() {
        for name in candidates.iter().filter(|c| !c.trim().is_empty()) {
            let candidate = Path::new(segment).join(format!("{name}{}", std::env::consts::EXE_SUFFIX));
            if candidate.is_file() {
                debug!(runtime = %candidate.display(), "runtime found on PATH");
                return absolute(&candidate);
            }
        }
    }

    bail!(
        "no runtime named {} found on PATH ({} segments searched)",
        candidates.join(" or "),
        search.len()
    )
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("resolve {}", path.display()))
}
