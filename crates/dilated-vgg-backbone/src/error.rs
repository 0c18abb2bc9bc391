use dilated_conv::DilatedConvError;
use thiserror::Error;

/// The error type for backbone construction and forward passes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackboneError {
    /// The configuration parameters are logically inconsistent.
    #[error("Invalid backbone configuration: {reason}")]
    InvalidConfiguration {
        /// The reason why the configuration is invalid.
        reason: String,
    },

    /// The input tensor does not match the configured network.
    #[error("Invalid input tensor shape: expected {expected}, got {actual}")]
    InvalidTensorShape {
        /// The expected tensor shape.
        expected: String,
        /// The actual tensor shape.
        actual: String,
    },

    /// The name does not refer to any end point.
    #[error("Unknown end point: {name}")]
    UnknownEndPoint {
        /// The rejected name.
        name: String,
    },

    /// A dilated convolution layer failed.
    #[error(transparent)]
    DilatedConv(#[from] DilatedConvError),
}

/// A specialized `Result` type for backbone operations.
pub type BackboneResult<T> = Result<T, BackboneError>;
