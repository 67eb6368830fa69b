//! Error types for the sensor-network runtime.
//!
//! Validation errors are surfaced synchronously to the caller and reject
//! the operation with no partial state change. Sensor errors are transient
//! and handled inside the polling task that observed them.

use thiserror::Error;

/// A registration or construction request was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The referenced sensor id is not registered with the network.
    #[error("unknown sensor id: {0}")]
    UnknownSensor(String),

    /// The operator string is not one of `gt`, `lt`, `eq`, `neq`, `between`.
    #[error("unknown compare operator: {0}")]
    InvalidOperator(String),

    /// The threshold shape does not match the operator.
    #[error("invalid threshold for operator {operator}: {reason}")]
    InvalidThreshold { operator: String, reason: String },

    /// A reading value fell outside its physically valid range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The hysteresis buffer must be non-negative.
    #[error("hysteresis buffer must be >= 0, got {0}")]
    NegativeHysteresis(f64),
}

/// A sensor capability call failed.
///
/// These are recoverable from the network's point of view: the polling
/// task logs the failure and either skips the cycle or, after repeated
/// read failures, ends in a failed state without affecting other sensors.
#[derive(Debug, Clone, Error)]
pub enum SensorError {
    /// The connection to the underlying source could not be established.
    #[error("sensor initialization failed: {0}")]
    Init(String),

    /// A single read attempt failed.
    #[error("sensor read failed: {0}")]
    Read(String),
}
