//! Option map handed to the session factory.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;

/// Recognized option names.
pub mod keys {
    pub const PYTHON: &str = "spark.pyspark.python";
    pub const DRIVER_PYTHON: &str = "spark.pyspark.driver.python";
    pub const WAREHOUSE_DIR: &str = "spark.sql.warehouse.dir";
    pub const LOCAL_DIR: &str = "spark.local.dir";
    pub const ADAPTIVE_ENABLED: &str = "spark.sql.adaptive.enabled";
    pub const NATIVE_LIB_AVAILABLE: &str = "spark.hadoop.io.native.lib.available";
    pub const UI_ENABLED: &str = "spark.ui.enabled";
    pub const LOG_LEVEL: &str = "spark.log.level";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConfValue {
    Bool(bool),
    Str(String),
}

impl ConfValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfValue::Bool(b) => Some(*b),
            ConfValue::Str(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for ConfValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfValue::Bool(b) => write!(f, "{b}"),
            ConfValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for ConfValue {
    fn from(value: bool) -> Self {
        ConfValue::Bool(value)
    }
}

impl From<&str> for ConfValue {
    fn from(value: &str) -> Self {
        ConfValue::Str(value.to_string())
    }
}

impl From<String> for ConfValue {
    fn from(value: String) -> Self {
        ConfValue::Str(value)
    }
}

/// Built once per invocation and passed to the factory by reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RunConfiguration {
    options: BTreeMap<String, ConfValue>,
}

impl RunConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ConfValue>) -> &mut Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&ConfValue> {
        self.options.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfValue)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialize run configuration")
    }
}

impl<K, V> FromIterator<(K, V)> for RunConfiguration
where
    K: Into<String>,
    V: Into<ConfValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut conf = Self::new();
        for (k, v) in iter {
            conf.set(k, v);
        }
        conf
    }
}

/// Inputs for [`diagnostic_configuration`].
#[derive(Debug, Clone)]
pub struct RunSettings<'a> {
    pub runtime_executable: &'a Path,
    pub warehouse_dir: &'a Path,
    pub local_dir: &'a Path,
    pub log_level: &'a str,
}

/// Full option set for the self-test session: explicit runtime for driver and
/// workers, file-URI warehouse, and the UI, adaptive execution and native
/// library lookups switched off.
pub fn diagnostic_configuration(settings: &RunSettings<'_>) -> Result<RunConfiguration> {
    let runtime = settings.runtime_executable.display().to_string();
    let mut conf = RunConfiguration::new();
    conf.set(keys::PYTHON, runtime.as_str())
        .set(keys::DRIVER_PYTHON, runtime)
        .set(keys::WAREHOUSE_DIR, warehouse_uri(settings.warehouse_dir)?)
        .set(keys::LOCAL_DIR, forward_slashes(settings.local_dir))
        .set(keys::ADAPTIVE_ENABLED, false)
        .set(keys::NATIVE_LIB_AVAILABLE, false)
        .set(keys::UI_ENABLED, false)
        .set(keys::LOG_LEVEL, settings.log_level);
    Ok(conf)
}

/// `file:` URI for an absolute directory, without a trailing slash.
pub fn warehouse_uri(dir: &Path) -> Result<String> {
    let url = url::Url::from_file_path(dir)
        .map_err(|_| anyhow!("warehouse dir must be absolute: {}", dir.display()))?;
    Ok(url.to_string())
}

fn forward_slashes(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn abs(unix: &str, windows: &str) -> PathBuf {
        PathBuf::from(if cfg!(windows) { windows } else { unix })
    }

    #[test]
    fn diagnostic_configuration_sets_every_recognized_option() {
        let python = abs("/opt/py/bin/python3", r"C:\Py\python.exe");
        let warehouse = abs("/tmp/spark-warehouse", r"C:\tmp\spark-warehouse");
        let local = abs("/tmp/spark-local", r"C:\tmp\spark-local");
        let conf = diagnostic_configuration(&RunSettings {
            runtime_executable: &python,
            warehouse_dir: &warehouse,
            local_dir: &local,
            log_level: "ERROR",
        })
        .expect("conf");

        assert_eq!(conf.len(), 8);
        assert_eq!(conf.get(keys::UI_ENABLED), Some(&ConfValue::Bool(false)));
        assert_eq!(conf.get(keys::ADAPTIVE_ENABLED).and_then(ConfValue::as_bool), Some(false));
        assert_eq!(
            conf.get(keys::NATIVE_LIB_AVAILABLE).map(ToString::to_string),
            Some("false".to_string())
        );
        assert_eq!(
            conf.get(keys::PYTHON),
            conf.get(keys::DRIVER_PYTHON),
            "driver and workers share one runtime"
        );
        let uri = conf.get(keys::WAREHOUSE_DIR).map(ToString::to_string).expect("uri");
        assert!(uri.starts_with("file:///"), "{uri}");
        assert!(uri.ends_with("/tmp/spark-warehouse"), "{uri}");
    }

    #[test]
    fn relative_warehouse_is_rejected() {
        assert!(warehouse_uri(Path::new("spark-warehouse")).is_err());
    }

    #[cfg(windows)]
    #[test]
    fn windows_warehouse_uri_matches_file_scheme() {
        assert_eq!(
            warehouse_uri(Path::new(r"C:\tmp\spark-warehouse")).expect("uri"),
            "file:///C:/tmp/spark-warehouse"
        );
    }

    #[test]
    fn json_view_is_flat() {
        let conf: RunConfiguration = [("a", ConfValue::from(true)), ("b", ConfValue::from("x"))]
            .into_iter()
            .collect();
        let json = conf.to_json_pretty().expect("json");
        assert_eq!(json, "{\n  \"a\": true,\n  \"b\": \"x\"\n}");
    }
}
