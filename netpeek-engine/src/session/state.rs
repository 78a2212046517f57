use std::fmt;

use netpeek_capture::DeviceFilter;

/// Lifecycle of a capture session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No driver stream open, no device filter.
    #[default]
    Idle,
    /// A stream scoped to `device` is open and feeding the broadcaster.
    Running { device: DeviceFilter },
    /// Stream closed; the device filter and subscribers are kept for `resume`.
    Paused { device: DeviceFilter },
}

impl SessionState {
    pub fn device(&self) -> Option<&DeviceFilter> {
        match self {
            SessionState::Idle => None,
            SessionState::Running { device } | SessionState::Paused { device } => Some(device),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running { .. })
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Running { device } => write!(f, "running on {}", device),
            SessionState::Paused { device } => write!(f, "paused on {}", device),
        }
    }
}
