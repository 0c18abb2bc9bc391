//! VGG-16 backbone with a dilated `fc6`.
//!
//! The network keeps the five VGG-16 convolution blocks, replaces the fully
//! connected classifier by `fc6` (3x3, optionally dilated) and `fc7` (1x1)
//! convolutions, and records every block output as a named end point.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        Initializer, PaddingConfig2d, Relu,
    },
    prelude::*,
};
use dilated_conv::{DilatedConv2d, DilatedConv2dConfig, SameMaxPool2d};

use crate::{
    config::{BasenetConfig, BlockConvConfig, NUM_BLOCKS},
    end_points::{EndPoint, EndPoints},
    error::BackboneResult,
};

/// Plain `SAME` convolution followed by ReLU.
#[derive(Module, Debug)]
pub struct VggConvLayer<B: Backend> {
    conv: Conv2d<B>,
    relu: Relu,
}

impl<B: Backend> VggConvLayer<B> {
    /// Creates a stride 1 convolution with `SAME` padding for an odd `kernel_size`.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        dilation: usize,
        device: &Device<B>,
    ) -> Self {
        let padding = dilation * (kernel_size - 1) / 2;
        let mut conv = Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
            .with_stride([1, 1])
            .with_dilation([dilation, dilation])
            .with_padding(PaddingConfig2d::Explicit(padding, padding))
            .with_bias(true)
            .with_initializer(Initializer::XavierUniform { gain: 1.0 })
            .init(device);
        // Conv2dConfig draws the bias from the weight initializer.
        conv.bias = Some(Initializer::Zeros.init([out_channels], device));

        Self {
            conv,
            relu: Relu::new(),
        }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.relu.forward(self.conv.forward(input))
    }
}

/// Dilated convolution followed by ReLU.
#[derive(Module, Debug)]
pub struct DilatedConvLayer<B: Backend> {
    conv: DilatedConv2d<B>,
    relu: Relu,
}

impl<B: Backend> DilatedConvLayer<B> {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        config: &BlockConvConfig,
        device: &Device<B>,
    ) -> BackboneResult<Self> {
        let conv = DilatedConv2dConfig::new([in_channels, out_channels])
            .with_kernel_size(3)
            .with_dilation(config.rate)
            .with_kind(config.kind.clone())
            .with_bias(config.bias)
            .init(device)?;

        Ok(Self {
            conv,
            relu: Relu::new(),
        })
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> BackboneResult<Tensor<B, 4>> {
        Ok(self.relu.forward(self.conv.forward(input)?))
    }
}

/// A single convolution inside a VGG block.
#[derive(Module, Debug)]
pub enum BlockLayer<B: Backend> {
    /// Plain 3x3 convolution.
    Plain(VggConvLayer<B>),
    /// Dilated 3x3 convolution.
    Dilated(DilatedConvLayer<B>),
}

impl<B: Backend> BlockLayer<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> BackboneResult<Tensor<B, 4>> {
        match self {
            Self::Plain(layer) => Ok(layer.forward(input)),
            Self::Dilated(layer) => layer.forward(input),
        }
    }
}

/// Convolutions of one VGG block and the pooling layer closing it.
#[derive(Module, Debug)]
pub struct VggBlock<B: Backend> {
    layers: Vec<BlockLayer<B>>,
    pool: SameMaxPool2d,
}

impl<B: Backend> VggBlock<B> {
    /// Returns `(conv_output, pooled_output)`.
    pub fn forward(&self, mut input: Tensor<B, 4>) -> BackboneResult<(Tensor<B, 4>, Tensor<B, 4>)> {
        for layer in &self.layers {
            input = layer.forward(input)?;
        }
        let pooled = self.pool.forward(input.clone());
        Ok((input, pooled))
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}

/// The dilated VGG-16 backbone.
///
/// # Shapes
///   - input: `[batch, in_channels, height, width]`
///   - output: `[batch, 16 * fatness, ceil(height / 16), ceil(width / 16)]`
#[derive(Module, Debug)]
pub struct Basenet<B: Backend> {
    blocks: Vec<VggBlock<B>>,
    fc6: VggConvLayer<B>,
    fc7: VggConvLayer<B>,
    in_channels: usize,
    fatness: usize,
}

impl BasenetConfig {
    /// Initializes a new [`Basenet`].
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration does not pass
    /// [`BasenetConfig::validate`].
    pub fn init<B: Backend>(&self, device: &B::Device) -> BackboneResult<Basenet<B>> {
        self.validate()?;

        let block_channels = self.block_channels();
        let layers_per_block = self.layers_per_block();
        let mut current_channels = self.in_channels;
        let mut blocks = Vec::with_capacity(NUM_BLOCKS);

        for block in 0..NUM_BLOCKS {
            let out_channels = block_channels[block];
            let mut layers = Vec::with_capacity(layers_per_block[block]);
            for _ in 0..layers_per_block[block] {
                let layer = match &self.block_conv {
                    Some(block_conv) => BlockLayer::Dilated(DilatedConvLayer::new(
                        current_channels,
                        out_channels,
                        block_conv,
                        device,
                    )?),
                    None => BlockLayer::Plain(VggConvLayer::new(
                        current_channels,
                        out_channels,
                        3,
                        1,
                        device,
                    )),
                };
                layers.push(layer);
                current_channels = out_channels;
            }
            blocks.push(VggBlock {
                layers,
                pool: Self::block_pool(block).init(),
            });
        }

        let fc_channels = self.output_channels();
        let fc6 = VggConvLayer::new(
            current_channels,
            fc_channels,
            3,
            self.fc6_dilation(),
            device,
        );
        let fc7 = VggConvLayer::new(fc_channels, fc_channels, 1, 1, device);

        tracing::debug!(
            fatness = self.fatness,
            fc6_rate = self.fc6_dilation(),
            block_conv = self
                .block_conv
                .as_ref()
                .map_or("plain", |block_conv| block_conv.kind.as_str()),
            "initialized basenet"
        );

        Ok(Basenet {
            blocks,
            fc6,
            fc7,
            in_channels: self.in_channels,
            fatness: self.fatness,
        })
    }
}

impl<B: Backend> Basenet<B> {
    /// Runs the backbone and collects every end point.
    ///
    /// Returns the `fc7` activation together with all twelve end points in
    /// forward order.
    ///
    /// # Errors
    ///
    /// Returns [`BackboneError::InvalidTensorShape`](crate::BackboneError::InvalidTensorShape)
    /// when the input channel count does not match the configuration.
    pub fn forward(&self, input: Tensor<B, 4>) -> BackboneResult<(Tensor<B, 4>, EndPoints<B>)> {
        self.config().check_input(input.dims())?;

        let mut end_points = EndPoints::new();
        let mut net = input;
        for (block, layer) in self.blocks.iter().enumerate() {
            let (conv, pooled) = layer.forward(net)?;
            end_points.insert(EndPoint::block_conv(block), conv);
            end_points.insert(EndPoint::block_pool(block), pooled.clone());
            net = pooled;
        }

        let net = self.fc6.forward(net);
        end_points.insert(EndPoint::Fc6, net.clone());

        let net = self.fc7.forward(net);
        end_points.insert(EndPoint::Fc7, net.clone());

        Ok((net, end_points))
    }

    /// Channels of the final output.
    pub fn output_channels(&self) -> usize {
        self.config().output_channels()
    }

    /// Channels of the tensor recorded at `end_point`.
    pub fn channels(&self, end_point: EndPoint) -> usize {
        self.config().channels(end_point)
    }

    /// Convolutions in each block.
    pub fn layers_per_block(&self) -> Vec<usize> {
        self.blocks.iter().map(VggBlock::num_layers).collect()
    }

    /// Width-only view of the configuration, enough for channel and shape bookkeeping.
    fn config(&self) -> BasenetConfig {
        BasenetConfig::new()
            .with_in_channels(self.in_channels)
            .with_fatness(self.fatness)
    }
}
