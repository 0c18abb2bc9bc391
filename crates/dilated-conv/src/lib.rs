//! Dilated convolutions for the Burn deep learning framework
//!
//! This crate provides the dilated convolution operators used by dense
//! prediction backbones: the regular atrous convolution, its decomposed
//! space-to-batch form, and the two smoothed variants (group interaction and
//! shared separable convolution) that reduce gridding artefacts. It also
//! provides TensorFlow-style `SAME` max pooling.

mod conv;
mod error;
mod kind;
mod pool;
mod space;

// Convenient re-exports
#[doc(inline)]
pub use conv::{DilatedConv2d, DilatedConv2dConfig};
#[doc(inline)]
pub use error::{DilatedConvError, DilatedConvResult};
#[doc(inline)]
pub use kind::DilatedConvType;
#[doc(inline)]
pub use pool::{same_padding, SameMaxPool2d, SameMaxPool2dConfig};
#[doc(inline)]
pub use space::{batch_to_space, space_to_batch};
