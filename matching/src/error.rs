//! Error types for matcher configuration.
//!
//! Matching itself never fails at request time: misses, empty score sets,
//! and margins that are too small are expected control flow. Only invalid
//! configuration is an error, and it is raised at initialization so a
//! matcher can never start serving with a bad setup.

use thiserror::Error;

/// Result type alias for matcher operations.
pub type Result<T> = std::result::Result<T, MatchError>;

/// Errors raised while building matchers from configuration.
#[derive(Error, Debug)]
pub enum MatchError {
    /// A similarity threshold fell outside its documented scale.
    #[error("threshold {value} out of range {min}..={max}")]
    ThresholdOutOfRange { value: f32, min: f32, max: f32 },

    /// Top-K selection configured with a zero limit.
    #[error("top-k limit must be positive")]
    ZeroLimit,

    /// A guard was configured without any rules.
    #[error("no guard rules configured")]
    EmptyRuleSet,

    /// A router was configured without any routes.
    #[error("no routes configured")]
    EmptyRouteTable,

    /// A route was configured without reference vectors.
    #[error("route {label:?} has no reference vectors")]
    EmptyRoute { label: String },
}
