//! The session contract both tools hand their configuration to.
//!
//! A [`SessionFactory`] turns a [`SessionRequest`] into a live [`Session`].
//! [`local::LocalEngine`] is the in-process implementation used by the
//! binaries; tests substitute their own factories.

pub mod guard;
pub mod local;
pub mod logger;
pub mod table;

use thiserror::Error;

use crate::core::environment::ProcessEnvironment;
use crate::core::execution_mode::ExecutionMode;
use crate::core::run_config::RunConfiguration;

use table::{Row, Schema, Table};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("session startup failed: {0}")]
    Startup(String),
    #[error("session `{0}` is already stopped")]
    Stopped(String),
    #[error("unknown column `{0}`")]
    UnknownColumn(String),
    #[error("column `{0}` is not numeric")]
    NotNumeric(String),
    #[error("row {row} has {actual} values but the schema has {expected} columns")]
    RowArity {
        row: usize,
        actual: usize,
        expected: usize,
    },
    #[error("row {row}: value for `{column}` does not match type {expected}")]
    TypeMismatch {
        row: usize,
        column: String,
        expected: String,
    },
}

/// Everything a factory needs to start a session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub app_name: String,
    pub mode: ExecutionMode,
    pub conf: RunConfiguration,
    /// Environment for any worker processes the engine launches.
    pub env: ProcessEnvironment,
    /// Uppercase run-environment tag, when started by the bootstrapper.
    pub run_env: Option<String>,
}

pub trait Session {
    fn app_name(&self) -> &str;
    fn execution_mode(&self) -> ExecutionMode;
    fn run_env(&self) -> Option<&str>;
    fn set_log_level(&mut self, level: &str) -> Result<(), EngineError>;
    fn create_table(&self, schema: Schema, rows: Vec<Row>) -> Result<Table, EngineError>;
    fn stop(&mut self) -> Result<(), EngineError>;
}

pub trait SessionFactory {
    fn create(&self, request: &SessionRequest) -> Result<Box<dyn Session>, EngineError>;
}
