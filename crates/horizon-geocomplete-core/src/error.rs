//! Error types for the core systems.

use std::fmt;

/// Returned by [`TimerManager::stop`](crate::TimerManager::stop).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// The timer already fired, was stopped, or never existed.
    InvalidTimerId,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimerId => write!(f, "no active timer with this id"),
        }
    }
}

impl std::error::Error for TimerError {}

/// Returned by [`Signal::try_disconnect`](crate::Signal::try_disconnect).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalError {
    /// The slot was already disconnected, or belongs to another signal.
    InvalidConnection,
}

impl fmt::Display for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConnection => write!(f, "no slot connected under this id"),
        }
    }
}

impl std::error::Error for SignalError {}
