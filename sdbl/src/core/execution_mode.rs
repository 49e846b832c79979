//! Local execution-mode strings (`local`, `local[N]`, `local[*]`).

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workers {
    Fixed(NonZeroU32),
    AllCores,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionMode {
    pub workers: Workers,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid execution mode `{0}` (expected local, local[N] or local[*])")]
pub struct ExecutionModeError(pub String);

impl ExecutionMode {
    pub const SINGLE: ExecutionMode = ExecutionMode {
        workers: Workers::Fixed(NonZeroU32::MIN),
    };

    /// Worker threads to use, resolving `*` against `available`.
    pub fn worker_count(&self, available: usize) -> usize {
        match self.workers {
            Workers::Fixed(n) => n.get() as usize,
            Workers::AllCores => available.max(1),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = ExecutionModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ExecutionModeError(s.to_string());
        let trimmed = s.trim();
        if trimmed == "local" {
            return Ok(Self::SINGLE);
        }
        let inner = trimmed
            .strip_prefix("local[")
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(invalid)?;
        if inner == "*" {
            return Ok(Self {
                workers: Workers::AllCores,
            });
        }
        let n: NonZeroU32 = inner.parse().map_err(|_| invalid())?;
        Ok(Self {
            workers: Workers::Fixed(n),
        })
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.workers {
            Workers::Fixed(n) => write!(f, "local[{n}]"),
            Workers::AllCores => f.write_str("local[*]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_local_forms() {
        assert_eq!("local".parse::<ExecutionMode>(), Ok(ExecutionMode::SINGLE));
        assert_eq!(
            "local[1]".parse::<ExecutionMode>().map(|m| m.to_string()),
            Ok("local[1]".to_string())
        );
        let all: ExecutionMode = "local[*]".parse().expect("parse");
        assert_eq!(all.worker_count(8), 8);
        assert_eq!(all.worker_count(0), 1);
    }

    #[test]
    fn rejects_cluster_and_zero() {
        assert!("yarn".parse::<ExecutionMode>().is_err());
        assert!("local[0]".parse::<ExecutionMode>().is_err());
        assert!("local[two]".parse::<ExecutionMode>().is_err());
        assert!("local[2".parse::<ExecutionMode>().is_err());
    }
}
