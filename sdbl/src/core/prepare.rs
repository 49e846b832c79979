//! Composes PATH normalization and the companion variables into one step.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use super::environment::ProcessEnvironment;
use super::path_list::{DenyList, PathList, PathNormalization, normalize_path};

/// Variables written by [`prepare_environment`].
pub mod vars {
    pub const PYSPARK_PYTHON: &str = "PYSPARK_PYTHON";
    pub const PYSPARK_DRIVER_PYTHON: &str = "PYSPARK_DRIVER_PYTHON";
    pub const SPARK_LOG_DIR: &str = "SPARK_LOG_DIR";
    pub const SPARK_LOCAL_DIRS: &str = "SPARK_LOCAL_DIRS";
    pub const SPARK_WAREHOUSE_DIR: &str = "SPARK_WAREHOUSE_DIR";

    pub const ALL: [&str; 5] = [
        PYSPARK_PYTHON,
        PYSPARK_DRIVER_PYTHON,
        SPARK_LOG_DIR,
        SPARK_LOCAL_DIRS,
        SPARK_WAREHOUSE_DIR,
    ];
}

/// Working directories the engine expects to exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkDirs {
    pub log_dir: PathBuf,
    pub local_dir: PathBuf,
    pub warehouse_dir: PathBuf,
}

impl Default for WorkDirs {
    fn default() -> Self {
        let tmp = std::env::temp_dir();
        Self {
            log_dir: tmp.join("spark-logs"),
            local_dir: tmp.join("spark-local"),
            warehouse_dir: tmp.join("spark-warehouse"),
        }
    }
}

impl WorkDirs {
    pub fn all(&self) -> [&Path; 3] {
        [&self.log_dir, &self.local_dir, &self.warehouse_dir]
    }

    /// Anchor relative entries at `base`.
    pub fn resolved(&self, base: &Path) -> WorkDirs {
        let anchor = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };
        WorkDirs {
            log_dir: anchor(&self.log_dir),
            local_dir: anchor(&self.local_dir),
            warehouse_dir: anchor(&self.warehouse_dir),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrepareOptions<'a> {
    pub runtime_executable: &'a Path,
    pub dirs: &'a WorkDirs,
    pub deny: &'a DenyList,
    pub dedupe_runtime_dir: bool,
    pub separator: char,
}

#[derive(Debug, Clone)]
pub struct PreparedEnvironment {
    pub env: ProcessEnvironment,
    pub path: PathNormalization,
    pub runtime_dir: String,
}

/// Return a copy of `env` with PATH rewritten (runtime directory first,
/// denied segments gone) and the runtime and directory variables pinned.
///
/// `env` itself is left untouched.
pub fn prepare_environment(
    env: &ProcessEnvironment,
    opts: &PrepareOptions<'_>,
) -> Result<PreparedEnvironment> {
    let runtime_dir = opts
        .runtime_executable
        .parent()
        .map(|p| p.display().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            anyhow!(
                "runtime executable has no parent directory: {}",
                opts.runtime_executable.display()
            )
        })?;

    let path_key = env.path_key();
    let current = PathList::parse(env.path_value(), opts.separator);
    let path = normalize_path(&current, &runtime_dir, opts.deny, opts.dedupe_runtime_dir);

    let runtime = opts.runtime_executable.display().to_string();
    let mut out = env.clone();
    out.set(path_key, path.path.join(opts.separator));
    out.set(vars::PYSPARK_PYTHON, runtime.as_str());
    out.set(vars::PYSPARK_DRIVER_PYTHON, runtime);
    out.set(vars::SPARK_LOG_DIR, opts.dirs.log_dir.display().to_string());
    out.set(vars::SPARK_LOCAL_DIRS, opts.dirs.local_dir.display().to_string());
    out.set(
        vars::SPARK_WAREHOUSE_DIR,
        opts.dirs.warehouse_dir.display().to_string(),
    );

    Ok(PreparedEnvironment {
        env: out,
        path,
        runtime_dir,
    })
}
