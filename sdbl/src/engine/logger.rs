//! Application logger bound to a session.

use tracing::{debug, error, info, warn};

use super::Session;

/// Logs through `tracing`, tagging each event with the session's application
/// name and run environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLogger {
    app_name: String,
    run_env: String,
}

impl SessionLogger {
    pub fn for_session(session: &dyn Session) -> Self {
        Self {
            app_name: session.app_name().to_string(),
            run_env: session.run_env().unwrap_or("-").to_string(),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn info(&self, message: &str) {
        info!(target: "sdbl::app", app = %self.app_name, env = %self.run_env, "{message}");
    }

    pub fn warn(&self, message: &str) {
        warn!(target: "sdbl::app", app = %self.app_name, env = %self.run_env, "{message}");
    }

    pub fn error(&self, message: &str) {
        error!(target: "sdbl::app", app = %self.app_name, env = %self.run_env, "{message}");
    }

    pub fn debug(&self, message: &str) {
        debug!(target: "sdbl::app", app = %self.app_name, env = %self.run_env, "{message}");
    }
}
