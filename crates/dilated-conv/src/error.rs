use thiserror::Error;

/// Errors raised while configuring or applying dilated convolutions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DilatedConvError {
    /// The name does not match any dilated convolution type.
    #[error("Unknown dilated convolution type: {name} (expected one of {expected})")]
    UnknownConvType {
        /// The rejected name.
        name: String,
        /// Comma separated list of accepted names.
        expected: String,
    },

    /// Kernel sizes must be odd so that `SAME` padding stays symmetric.
    #[error("Invalid kernel size {kernel_size}: must be odd and at least 1")]
    InvalidKernelSize {
        /// The rejected kernel size.
        kernel_size: usize,
    },

    /// Dilation factors start at 1 (an ordinary convolution).
    #[error("Invalid dilation factor {dilation}: must be at least 1")]
    InvalidDilation {
        /// The rejected dilation factor.
        dilation: usize,
    },

    /// Channel counts must be non-zero.
    #[error("Invalid channels [{in_channels}, {out_channels}]: both must be at least 1")]
    InvalidChannels {
        /// Number of input channels.
        in_channels: usize,
        /// Number of output channels.
        out_channels: usize,
    },

    /// A batch produced by `space_to_batch` must hold `block * block` sub-grids.
    #[error("Batch of size {batch} cannot be split into {block}x{block} sub-grids")]
    InvalidBatch {
        /// Batch size of the rejected tensor.
        batch: usize,
        /// Block size used for the split.
        block: usize,
    },
}

/// A specialized `Result` type for dilated convolution operations.
pub type DilatedConvResult<T> = Result<T, DilatedConvError>;
