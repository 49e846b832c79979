//! In-process engine that runs on the calling thread.

use std::path::Path;

use tracing::{debug, info};

use super::table::{Row, Schema, Table};
use super::{EngineError, Session, SessionFactory, SessionRequest};
use crate::core::execution_mode::ExecutionMode;
use crate::core::run_config::keys;

/// Starts [`LocalSession`]s after checking that the paths the request points
/// at actually exist.
#[derive(Debug, Default, Clone)]
pub struct LocalEngine;

impl LocalEngine {
    pub fn new() -> Self {
        Self
    }
}

impl SessionFactory for LocalEngine {
    fn create(&self, request: &SessionRequest) -> Result<Box<dyn Session>, EngineError> {
        for key in [keys::PYTHON, keys::DRIVER_PYTHON] {
            if let Some(python) = request.conf.get(key) {
                let python = python.to_string();
                if !Path::new(&python).is_file() {
                    return Err(EngineError::Startup(format!(
                        "{key} points at a missing executable: {python}"
                    )));
                }
            }
        }
        if let Some(local_dir) = request.conf.get(keys::LOCAL_DIR) {
            let local_dir = local_dir.to_string();
            if !Path::new(&local_dir).is_dir() {
                return Err(EngineError::Startup(format!(
                    "{} does not exist: {local_dir}",
                    keys::LOCAL_DIR
                )));
            }
        }

        let log_level = request
            .conf
            .get(keys::LOG_LEVEL)
            .map(ToString::to_string)
            .unwrap_or_else(|| "INFO".to_string());
        info!(
            app = %request.app_name,
            mode = %request.mode,
            options = request.conf.len(),
            "local session started"
        );
        Ok(Box::new(LocalSession {
            app_name: request.app_name.clone(),
            mode: request.mode,
            run_env: request.run_env.clone(),
            log_level,
            stopped: false,
        }))
    }
}

#[derive(Debug)]
pub struct LocalSession {
    app_name: String,
    mode: ExecutionMode,
    run_env: Option<String>,
    log_level: String,
    stopped: bool,
}

impl LocalSession {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.stopped {
            return Err(EngineError::Stopped(self.app_name.clone()));
        }
        Ok(())
    }
}

impl Session for LocalSession {
    fn app_name(&self) -> &str {
        &self.app_name
    }

    fn execution_mode(&self) -> ExecutionMode {
        self.mode
    }

    fn run_env(&self) -> Option<&str> {
        self.run_env.as_deref()
    }

    fn set_log_level(&mut self, level: &str) -> Result<(), EngineError> {
        self.ensure_running()?;
        self.log_level = level.to_uppercase();
        debug!(app = %self.app_name, level = %self.log_level, "log level set");
        Ok(())
    }

    fn create_table(&self, schema: Schema, rows: Vec<Row>) -> Result<Table, EngineError> {
        self.ensure_running()?;
        Table::new(schema, rows)
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        self.ensure_running()?;
        self.stopped = true;
        info!(app = %self.app_name, "local session stopped");
        Ok(())
    }
}
