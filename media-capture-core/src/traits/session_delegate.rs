use crate::models::error::CaptureError;
use crate::models::state::SessionState;

/// Event delegate for capture session notifications.
///
/// Called from whichever thread drives the session, never from a lane's
/// delivery thread.
pub trait SessionDelegate: Send + Sync {
    /// Called after every state transition.
    fn on_state_changed(&self, state: SessionState);

    /// Called for errors the orchestrator logged and recovered from.
    fn on_error(&self, error: &CaptureError);
}
