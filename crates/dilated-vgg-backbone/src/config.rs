//! Backbone configuration and shape inference.

use burn::prelude::*;
use dilated_conv::{DilatedConvType, SameMaxPool2dConfig};

use crate::{
    end_points::EndPoint,
    error::{BackboneError, BackboneResult},
};

/// Number of convolution blocks before `fc6`.
pub const NUM_BLOCKS: usize = 5;

/// Convolutions per block in the plain VGG-16 layout.
const VGG16_LAYERS: [usize; NUM_BLOCKS] = [2, 2, 3, 3, 3];

/// Convolutions per block when the blocks use dilated convolutions.
const DILATED_LAYERS: [usize; NUM_BLOCKS] = [2, 2, 2, 2, 2];

/// Width multiplier of each block relative to `fatness`.
const BLOCK_WIDTHS: [usize; NUM_BLOCKS] = [1, 2, 4, 8, 8];

/// Width multiplier of `fc6` and `fc7`.
const FC_WIDTH: usize = 16;

/// Dilated convolution used for the block layers instead of plain 3x3 convolutions.
#[derive(Config, Debug)]
pub struct BlockConvConfig {
    /// The dilation variant.
    pub kind: DilatedConvType,
    /// The dilation factor.
    #[config(default = "3")]
    pub rate: usize,
    /// Add a learnable bias to every block convolution.
    #[config(default = "false")]
    pub bias: bool,
}

/// Configuration of the dilated VGG-16 backbone.
#[derive(Config, Debug)]
pub struct BasenetConfig {
    /// Channels of the input image.
    #[config(default = "3")]
    pub in_channels: usize,
    /// Width of the first block; later blocks are multiples of it.
    #[config(default = "64")]
    pub fatness: usize,
    /// Dilate `fc6` by [`Self::fc6_rate`].
    #[config(default = "true")]
    pub dilation: bool,
    /// Dilation rate of `fc6` when [`Self::dilation`] is set.
    #[config(default = "6")]
    pub fc6_rate: usize,
    /// Replace the block convolutions with dilated ones.
    #[config(default = "None")]
    pub block_conv: Option<BlockConvConfig>,
}

impl BasenetConfig {
    /// Standard VGG-16 with a dilated `fc6`.
    pub fn vgg16() -> Self {
        Self::new()
    }

    /// VGG-16 whose blocks use shared separable smoothed dilated convolutions.
    pub fn smoothed_ssc() -> Self {
        Self::new().with_block_conv(Some(BlockConvConfig::new(
            DilatedConvType::SmoothedSsc,
        )))
    }

    /// Checks that every width and rate is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`BackboneError::InvalidConfiguration`] naming the first bad field.
    pub fn validate(&self) -> BackboneResult<()> {
        let invalid = |reason: &str| {
            Err(BackboneError::InvalidConfiguration {
                reason: reason.to_owned(),
            })
        };

        if self.in_channels == 0 {
            return invalid("in_channels must be at least 1");
        }
        if self.fatness == 0 {
            return invalid("fatness must be at least 1");
        }
        if self.fc6_rate == 0 {
            return invalid("fc6_rate must be at least 1");
        }
        if let Some(block_conv) = &self.block_conv {
            if block_conv.rate == 0 {
                return invalid("block_conv.rate must be at least 1");
            }
        }
        Ok(())
    }

    /// Effective dilation rate of `fc6`.
    pub const fn fc6_dilation(&self) -> usize {
        if self.dilation {
            self.fc6_rate
        } else {
            1
        }
    }

    /// Convolutions in each of the five blocks.
    pub const fn layers_per_block(&self) -> [usize; NUM_BLOCKS] {
        if self.block_conv.is_some() {
            DILATED_LAYERS
        } else {
            VGG16_LAYERS
        }
    }

    /// Output channels of each of the five blocks.
    pub fn block_channels(&self) -> [usize; NUM_BLOCKS] {
        BLOCK_WIDTHS.map(|width| width * self.fatness)
    }

    /// Channels of the tensor recorded at `end_point`.
    pub fn channels(&self, end_point: EndPoint) -> usize {
        match end_point.block() {
            Some(block) => self.block_channels()[block],
            None => FC_WIDTH * self.fatness,
        }
    }

    /// Channels of the final output (`fc7`).
    pub fn output_channels(&self) -> usize {
        self.channels(EndPoint::Fc7)
    }

    /// The pooling layer closing `block`: 2x2/2 for blocks 1-4, 3x3/1 for block 5.
    pub(crate) fn block_pool(block: usize) -> SameMaxPool2dConfig {
        if block + 1 < NUM_BLOCKS {
            SameMaxPool2dConfig::new([2, 2])
        } else {
            SameMaxPool2dConfig::new([3, 3]).with_strides([1, 1])
        }
    }

    /// Infers the shape of every end point for an input of `[batch, channels, height, width]`.
    ///
    /// # Errors
    ///
    /// Returns [`BackboneError::InvalidTensorShape`] when the channel count does
    /// not match [`Self::in_channels`] or a spatial dimension is zero, and
    /// [`BackboneError::InvalidConfiguration`] when the configuration is invalid.
    pub fn end_point_shapes(
        &self,
        input: [usize; 4],
    ) -> BackboneResult<Vec<(EndPoint, [usize; 4])>> {
        self.validate()?;
        self.check_input(input)?;

        let [batch, _, mut height, mut width] = input;
        let mut shapes = Vec::with_capacity(EndPoint::ALL.len());
        for block in 0..NUM_BLOCKS {
            let channels = self.block_channels()[block];
            shapes.push((EndPoint::block_conv(block), [batch, channels, height, width]));

            let [strides_h, strides_w] = Self::block_pool(block).strides;
            height = height.div_ceil(strides_h);
            width = width.div_ceil(strides_w);
            shapes.push((EndPoint::block_pool(block), [batch, channels, height, width]));
        }

        let fc_channels = self.output_channels();
        shapes.push((EndPoint::Fc6, [batch, fc_channels, height, width]));
        shapes.push((EndPoint::Fc7, [batch, fc_channels, height, width]));

        Ok(shapes)
    }

    /// Checks an input shape against the configuration.
    pub(crate) fn check_input(
        &self,
        [batch, channels, height, width]: [usize; 4],
    ) -> BackboneResult<()> {
        if channels != self.in_channels || batch == 0 || height == 0 || width == 0 {
            return Err(BackboneError::InvalidTensorShape {
                expected: format!("[batch >= 1, {}, height >= 1, width >= 1]", self.in_channels),
                actual: format!("{:?}", [batch, channels, height, width]),
            });
        }
        Ok(())
    }
}
