//! An explicit, owned copy of the process environment.

use std::collections::BTreeMap;

/// Name of the search-path variable when none exists yet.
pub const PATH_VAR: &str = "PATH";

/// Variable name to value, captured once and passed around by value.
///
/// The preparation steps never write to the real process environment; the
/// resulting value is handed to child processes and to the session factory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessEnvironment {
    vars: BTreeMap<String, String>,
}

impl ProcessEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment.
    ///
    /// Non-UTF-8 names or values are converted lossily.
    pub fn capture() -> Self {
        std::env::vars_os()
            .map(|(key, value)| {
                (
                    key.to_string_lossy().into_owned(),
                    value.to_string_lossy().into_owned(),
                )
            })
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.vars.remove(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The key holding the search path.
    ///
    /// Windows treats variable names case-insensitively and usually spells it
    /// `Path`; reuse whatever spelling is present so the rewrite replaces it.
    pub fn path_key(&self) -> String {
        if cfg!(windows) {
            if let Some(key) = self
                .vars
                .keys()
                .find(|key| key.eq_ignore_ascii_case(PATH_VAR))
            {
                return key.clone();
            }
        }
        PATH_VAR.to_string()
    }

    pub fn path_value(&self) -> &str {
        self.get(&self.path_key()).unwrap_or_default()
    }
}

impl<K, V> FromIterator<(K, V)> for ProcessEnvironment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
