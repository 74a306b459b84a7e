use thiserror::Error;

use super::state::SessionState;

/// Errors that can occur while configuring or running a capture session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("capacity exceeded: {0}")]
    Capacity(String),

    #[error("configuration failed: {0}")]
    Configuration(String),

    #[error("{operation} is not valid while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("no inputs configured")]
    NoInput,

    #[error("lane closed: {0}")]
    LaneClosed(String),

    #[error("device error: {0}")]
    Device(String),

    #[error("processor failed: {0}")]
    Processor(String),
}

impl CaptureError {
    /// Whether the orchestration layer may log this error and carry on
    /// with a reduced configuration.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Capacity(_) | Self::Device(_) | Self::NoInput
        )
    }

    pub(crate) fn invalid_state(operation: &'static str, state: SessionState) -> Self {
        Self::InvalidState { operation, state }
    }
}
