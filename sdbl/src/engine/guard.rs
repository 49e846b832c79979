//! Scoped ownership of a session with guaranteed release.

use tracing::{debug, warn};

use super::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Nothing was held (creation failed or already released).
    NoSession,
    Stopped,
    /// `stop` failed; the failure went to the warning log.
    Failed,
}

/// Holds at most one session and stops it on [`release`](Self::release) or
/// drop, whichever comes first.
///
/// A failing `stop` is logged at warn level and otherwise ignored, so it
/// never replaces an error already being reported.
#[derive(Default)]
pub struct SessionGuard {
    session: Option<Box<dyn Session>>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn Session>) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Take ownership of `session`, releasing any previously held one, and
    /// hand back a borrow of it.
    pub fn hold(&mut self, session: Box<dyn Session>) -> &mut (dyn Session + 'static) {
        self.release();
        &mut **self.session.insert(session)
    }

    pub fn session(&self) -> Option<&dyn Session> {
        self.session.as_deref()
    }

    pub fn session_mut(&mut self) -> Option<&mut (dyn Session + 'static)> {
        self.session.as_deref_mut()
    }

    pub fn release(&mut self) -> Release {
        let Some(mut session) = self.session.take() else {
            debug!("no session to release");
            return Release::NoSession;
        };
        match session.stop() {
            Ok(()) => {
                debug!(app = %session.app_name(), "session released");
                Release::Stopped
            }
            Err(err) => {
                warn!(app = %session.app_name(), err = %err, "session release failed");
                Release::Failed
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.release();
    }
}
