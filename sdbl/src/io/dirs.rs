//! Idempotent provisioning of the engine's working directories.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub path: PathBuf,
    /// False when the directory already existed.
    pub created: bool,
}

/// Create each directory (and missing parents) if absent.
///
/// Existing directories are left alone; running twice is a no-op.
pub fn provision_dirs<'a, I>(dirs: I) -> Result<Vec<Provisioned>>
where
    I: IntoIterator<Item = &'a Path>,
{
    dirs.into_iter()
        .map(|dir| -> Result<Provisioned> {
            let existed = dir.is_dir();
            fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
            debug!(dir = %dir.display(), created = !existed, "directory provisioned");
            Ok(Provisioned {
                path: dir.to_path_buf(),
                created: !existed,
            })
        })
        .collect()
}
