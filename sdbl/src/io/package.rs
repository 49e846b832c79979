//! Installed-package metadata for the selected runtime.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, bail};
use tracing::debug;

use crate::core::environment::ProcessEnvironment;
use crate::core::version::{VersionInfo, version_from_metadata};

use super::process::run_helper;

const OUTPUT_LIMIT_BYTES: usize = 64 * 1024;

/// Reports the installed version of a package, `None` when not installed.
pub trait PackageQuery {
    fn installed_version(
        &self,
        runtime: &Path,
        env: &ProcessEnvironment,
        package: &str,
    ) -> Result<Option<VersionInfo>>;
}

/// Runs `<runtime> -m pip show <package>` in the prepared environment.
#[derive(Debug, Clone)]
pub struct PipShow {
    timeout: Duration,
}

impl PipShow {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl PackageQuery for PipShow {
    fn installed_version(
        &self,
        runtime: &Path,
        env: &ProcessEnvironment,
        package: &str,
    ) -> Result<Option<VersionInfo>> {
        let mut cmd = Command::new(runtime);
        cmd.args(["-m", "pip", "show", package])
            .env_clear()
            .envs(env.iter());
        let out = run_helper(cmd, self.timeout, OUTPUT_LIMIT_BYTES)?;
        if out.timed_out {
            bail!(
                "pip show {package} timed out after {}s",
                self.timeout.as_secs()
            );
        }
        // pip exits non-zero for unknown packages; absence of `Version:` is the signal.
        let version = version_from_metadata(&out.stdout_lossy());
        debug!(package, version = ?version, exit_code = ?out.status.code(), "package queried");
        if version.is_none() && !out.status.success() {
            let stderr = out.stderr_lossy();
            if !stderr.contains("not found") {
                bail!("pip show {package} failed: {}", stderr.trim());
            }
        }
        Ok(version)
    }
}
