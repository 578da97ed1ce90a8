//! Errors

use thiserror::Error;

/// Result type alias for driver operations
pub type Result<T> = core::result::Result<T, Error>;

/// Driver errors.
///
/// Validation errors are always reported before any register access.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Bad device/channel index, register address or parameter value
    #[error("invalid argument")]
    InvalidArgument,

    /// Device slot not attached, or device not (successfully) initialized
    #[error("device not initialized")]
    NotInitialized,

    /// Operation doesn't fit the current device mode
    #[error("operation not allowed in the current device state")]
    InvalidState,

    /// Underlying register read/write failed
    #[error("register transport failure")]
    TransportFailure,

    /// Unexpected product id or phase alignment not reached
    #[error("device protocol failure")]
    ProtocolFailure,

    /// Device lock couldn't be acquired in time (or is poisoned)
    #[error("device lock failure")]
    LockFailure,
}
