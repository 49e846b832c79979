//! Preparation settings stored in `sdbl.toml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::environment::ProcessEnvironment;
use crate::core::execution_mode::ExecutionMode;
use crate::core::path_list::DenyList;
use crate::core::prepare::WorkDirs;

pub const DEFAULT_CONFIG_FILE: &str = "sdbl.toml";
/// Overrides the config location for the `sdbl` binary, which takes no flags.
pub const CONFIG_ENV_VAR: &str = "SDBL_CONFIG";

/// Preparation config (TOML).
///
/// Every field has a default, so an absent file or a partial one is fine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PrepConfig {
    /// Application name for the self-test session.
    pub app_name: String,

    /// Execution mode for the self-test session.
    pub execution_mode: String,

    /// Engine log level (`spark.log.level`).
    pub log_level: String,

    pub dirs: WorkDirs,
    pub path: PathConfig,
    pub runtime: RuntimeConfig,
    pub version_gate: VersionGateConfig,

    /// Run-environment profiles keyed by uppercase tag.
    pub envs: BTreeMap<String, EnvProfile>,

    /// Troubleshooting hints printed when the self-test fails.
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathConfig {
    /// Case-insensitive substrings marking stale runtime directories.
    pub deny_markers: Vec<String>,
    /// Drop later copies of the runtime directory after prepending it.
    pub dedupe_runtime_dir: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Explicit interpreter; when unset, `candidates` are searched on PATH.
    pub executable: Option<PathBuf>,
    pub candidates: Vec<String>,
    /// Wall-clock limit for the package metadata query.
    pub query_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VersionGateConfig {
    pub package: String,
    pub incompatible_major: u64,
    pub recommended_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct EnvProfile {
    pub app_name: String,
    pub master: String,
    /// Extra engine options for this environment.
    pub conf: BTreeMap<String, String>,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            deny_markers: ["3.11", "python311", "py311"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            dedupe_runtime_dir: false,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            executable: None,
            candidates: vec!["python3".to_string(), "python".to_string()],
            query_timeout_secs: 60,
        }
    }
}

impl Default for VersionGateConfig {
    fn default() -> Self {
        Self {
            package: "pyspark".to_string(),
            incompatible_major: 4,
            recommended_version: "3.5.1".to_string(),
        }
    }
}

impl Default for PrepConfig {
    fn default() -> Self {
        let envs = ["LOCAL", "QA", "PROD"]
            .into_iter()
            .map(|tag| {
                (
                    tag.to_string(),
                    EnvProfile {
                        app_name: format!("sdbl-{}", tag.to_lowercase()),
                        master: "local[2]".to_string(),
                        conf: BTreeMap::new(),
                    },
                )
            })
            .collect();
        Self {
            app_name: "SparkWindowsFix".to_string(),
            execution_mode: "local[1]".to_string(),
            log_level: "ERROR".to_string(),
            dirs: WorkDirs::default(),
            path: PathConfig::default(),
            runtime: RuntimeConfig::default(),
            version_gate: VersionGateConfig::default(),
            envs,
            remediation: vec![
                "Uninstall the engine package: pip uninstall pyspark".to_string(),
                "Install the stable version: pip install pyspark==3.5.1".to_string(),
                "Rename or remove any standalone Spark 4.x distribution on SPARK_HOME".to_string(),
                "Run doctor again".to_string(),
            ],
        }
    }
}

impl PrepConfig {
    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            return Err(anyhow!("app_name must be non-empty"));
        }
        self.execution_mode
            .parse::<ExecutionMode>()
            .context("execution_mode")?;
        if self.log_level.trim().is_empty() {
            return Err(anyhow!("log_level must be non-empty"));
        }
        if self.runtime.query_timeout_secs == 0 {
            return Err(anyhow!("runtime.query_timeout_secs must be > 0"));
        }
        if self.runtime.executable.is_none()
            && self.runtime.candidates.iter().all(|c| c.trim().is_empty())
        {
            return Err(anyhow!(
                "runtime.candidates must name at least one interpreter when runtime.executable is unset"
            ));
        }
        if self.version_gate.package.trim().is_empty() {
            return Err(anyhow!("version_gate.package must be non-empty"));
        }
        for (tag, profile) in &self.envs {
            if tag.is_empty() || *tag != tag.to_uppercase() {
                return Err(anyhow!("envs.{tag}: environment tags must be uppercase"));
            }
            profile
                .master
                .parse::<ExecutionMode>()
                .with_context(|| format!("envs.{tag}.master"))?;
            if profile.app_name.trim().is_empty() {
                return Err(anyhow!("envs.{tag}.app_name must be non-empty"));
            }
        }
        Ok(())
    }

    pub fn deny_list(&self) -> DenyList {
        DenyList::new(&self.path.deny_markers)
    }

    /// Configured tags, comma separated, for error messages.
    pub fn known_envs(&self) -> String {
        self.envs.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// `$SDBL_CONFIG` if set and non-empty, else `sdbl.toml` in the working directory.
pub fn config_path(env: &ProcessEnvironment) -> PathBuf {
    env.get(CONFIG_ENV_VAR)
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PrepConfig::default()`.
pub fn load_config(path: &Path) -> Result<PrepConfig> {
    if !path.exists() {
        let cfg = PrepConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PrepConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
