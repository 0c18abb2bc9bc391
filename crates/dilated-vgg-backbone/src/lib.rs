//! Dilated VGG-16 backbone for semantic segmentation
//!
//! This crate builds the VGG-16 feature extractor used by dense prediction
//! heads: five convolution blocks, a dilated `fc6` and a 1x1 `fc7`, with
//! every intermediate activation exposed as a named [`EndPoint`]. The block
//! convolutions can be swapped for regular, decomposed or smoothed dilated
//! convolutions from [`dilated_conv`].

mod basenet;
mod config;
mod end_points;
mod error;

pub use basenet::{Basenet, BlockLayer, DilatedConvLayer, VggBlock, VggConvLayer};
pub use config::{BasenetConfig, BlockConvConfig, NUM_BLOCKS};
#[doc(inline)]
pub use dilated_conv::DilatedConvType;
pub use end_points::{EndPoint, EndPoints};
pub use error::{BackboneError, BackboneResult};

use burn::prelude::*;

/// Backbone interface for segmentation heads.
pub trait Backbone<B: Backend> {
    /// Forward pass through the backbone
    ///
    /// # Arguments
    /// * `input` - Input tensor of shape `[batch_size, channels, height, width]`
    ///
    /// # Returns
    /// The final feature map and the named intermediate activations.
    ///
    /// # Errors
    /// Returns an error when the input does not match the backbone.
    fn forward(&self, input: Tensor<B, 4>) -> BackboneResult<(Tensor<B, 4>, EndPoints<B>)>;

    /// Get output channels of the final feature map
    fn output_channels(&self) -> usize;
}

impl<B: Backend> Backbone<B> for Basenet<B> {
    fn forward(&self, input: Tensor<B, 4>) -> BackboneResult<(Tensor<B, 4>, EndPoints<B>)> {
        self.forward(input)
    }

    fn output_channels(&self) -> usize {
        self.output_channels()
    }
}
