//! Typed failures that map to specific exit codes.
//!
//! Everything else travels as `anyhow::Error` with context.

use thiserror::Error;

use crate::exit_codes;

pub const USAGE_MESSAGE: &str = "Usage: sdbl {local, qa, prod} {load_date} : arguments are missing";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrepError {
    /// Fewer than two positional arguments.
    #[error("{}", USAGE_MESSAGE)]
    Usage,

    /// The run-environment tag has no `[envs.<TAG>]` profile.
    #[error("unrecognized run environment `{tag}` (configured: {known})")]
    EnvironmentConfig { tag: String, known: String },

    /// The engine package is not installed for the selected runtime.
    #[error("{package} is not installed for the selected runtime")]
    ComponentMissing { package: String },
}

impl PrepError {
    pub fn exit_code(&self) -> i32 {
        match self {
            PrepError::Usage => exit_codes::USAGE,
            PrepError::EnvironmentConfig { .. } => exit_codes::FAILURE,
            PrepError::ComponentMissing { .. } => exit_codes::COMPONENT_MISSING,
        }
    }
}

/// Exit code for an arbitrary error: typed failures keep their code,
/// everything else is a generic failure.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<PrepError>()
        .map(PrepError::exit_code)
        .unwrap_or(exit_codes::FAILURE)
}
