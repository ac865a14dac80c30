//! Error handling for patricia_core
//!
//! Lookups, removals and walks never fail; errors only come from
//! configuration, the optional entry limit, and telemetry setup.

use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// `Config::max_entries` was `Some(0)`.
    ZeroCapacity,
    /// A new key did not fit: the entry limit was reached, or the arena ran
    /// out of node ids.
    CapacityExceeded { limit: usize },
    /// Another `metrics` recorder is already installed in this process.
    RecorderInstalled,
}

impl Error {
    pub fn as_str(self) -> &'static str {
        match self {
            Error::ZeroCapacity => "Zero capacity",
            Error::CapacityExceeded { .. } => "Capacity exceeded",
            Error::RecorderInstalled => "Metrics recorder already installed",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CapacityExceeded { limit } => {
                write!(f, "{} (limit {} entries)", self.as_str(), limit)
            }
            _ => f.write_str(self.as_str()),
        }
    }
}

impl std::error::Error for Error {}
