//! Error types for metric manipulation.

use thiserror::Error;

/// Errors raised when combining component metrics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// The two sides describe different components.
    #[error("cannot merge metrics of component '{left}' with component '{right}'")]
    ComponentMismatch { left: String, right: String },
}
