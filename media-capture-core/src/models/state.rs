use std::fmt;

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle ──begin──▶ configuring ──commit──▶ idle
///   │                                      │
///   └─────────────── start ────────────────┴──▶ running ──stop──▶ stopped
///
/// running / stopped ──begin──▶ configuring ──commit──▶ (previous state)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Configuring,
    Running,
    Stopped,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_configuring(&self) -> bool {
        matches!(self, Self::Configuring)
    }

    /// Whether `begin_configuration` may be called from this state.
    pub fn accepts_configuration(&self) -> bool {
        matches!(self, Self::Idle | Self::Running | Self::Stopped)
    }

    /// Whether `start_running` may be called from this state.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Idle | Self::Stopped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Configuring => "configuring",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
