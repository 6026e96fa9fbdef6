//! Error kinds surfaced at the boundaries of the engine.
//!
//! None of these are fatal to the process; every one is recoverable by a
//! later user action (starting again, stopping again, re-subscribing).

use std::time::Duration;

use thiserror::Error;

use crate::sensor::SensorKind;

/// Failures while acquiring a sensor handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("permission to use the {0} sensor was denied")]
    PermissionDenied(SensorKind),

    #[error("{kind} sensor is unavailable: {reason}")]
    DeviceUnavailable { kind: SensorKind, reason: String },

    #[error("timed out after {after:?} waiting for the {kind} sensor")]
    Timeout { kind: SensorKind, after: Duration },
}

/// Failures reported by the persistence boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("failed to write history entry: {0}")]
    Write(String),

    #[error("history subscription failed: {0}")]
    Subscription(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error("owner id must not be empty")]
    MissingOwner,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}
