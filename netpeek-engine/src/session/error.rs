use thiserror::Error;

use netpeek_capture::DriverError;
use netpeek_core::EventError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// The operation is not valid in the current state; the state is unchanged.
    #[error("Cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: String,
    },

    #[error("Broadcaster setup failed: {0}")]
    Events(#[from] EventError),

    /// The producer or open task died without reporting a result.
    #[error("Capture task failed: {0}")]
    Producer(String),
}

impl From<tokio::task::JoinError> for SessionError {
    fn from(err: tokio::task::JoinError) -> Self {
        SessionError::Producer(err.to_string())
    }
}
