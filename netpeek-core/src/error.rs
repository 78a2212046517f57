use thiserror::Error;

/// Event fan-out error conditions.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("Invalid subscriber queue capacity (must be at least 1)")]
    InvalidCapacity,
}
