//! Dilated 2D convolution with regular, decomposed and smoothed variants.
//!
//! All variants share one kernel parameter of shape `[out, in, k, k]`, so a
//! trained regular atrous layer can be switched to a decomposed or smoothed
//! one without touching its weights.

use burn::{
    module::{Ignored, Param},
    nn::Initializer,
    prelude::*,
    tensor::{module::conv2d, ops::ConvOptions},
};

use crate::{
    error::{DilatedConvError, DilatedConvResult},
    kind::DilatedConvType,
    space::{batch_to_space, space_to_batch},
};

/// Configuration to create a [`DilatedConv2d`] layer.
#[derive(Config, Debug)]
pub struct DilatedConv2dConfig {
    /// The number of input and output channels.
    pub channels: [usize; 2],
    /// Side of the square kernel. Must be odd.
    #[config(default = "3")]
    pub kernel_size: usize,
    /// The dilation factor `d`.
    #[config(default = "2")]
    pub dilation: usize,
    /// How the dilation is computed.
    #[config(default = "DilatedConvType::Regular")]
    pub kind: DilatedConvType,
    /// Add a learnable bias after the convolution.
    #[config(default = "false")]
    pub bias: bool,
    /// The kernel initializer.
    #[config(default = "Initializer::XavierUniform{gain:1.0}")]
    pub initializer: Initializer,
}

impl DilatedConv2dConfig {
    /// Checks the kernel size, dilation and channel counts.
    ///
    /// # Errors
    ///
    /// Returns the first [`DilatedConvError`] found.
    pub fn validate(&self) -> DilatedConvResult<()> {
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(DilatedConvError::InvalidKernelSize {
                kernel_size: self.kernel_size,
            });
        }
        if self.dilation == 0 {
            return Err(DilatedConvError::InvalidDilation {
                dilation: self.dilation,
            });
        }
        let [in_channels, out_channels] = self.channels;
        if in_channels == 0 || out_channels == 0 {
            return Err(DilatedConvError::InvalidChannels {
                in_channels,
                out_channels,
            });
        }
        Ok(())
    }

    /// Initializes a new [`DilatedConv2d`] module.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration does not pass [`Self::validate`].
    pub fn init<B: Backend>(&self, device: &B::Device) -> DilatedConvResult<DilatedConv2d<B>> {
        self.validate()?;

        let [in_channels, out_channels] = self.channels;
        let k = self.kernel_size;
        let d = self.dilation;
        let fan_in = in_channels * k * k;
        let fan_out = out_channels * k * k;

        let weight = self.initializer.init_with(
            [out_channels, in_channels, k, k],
            Some(fan_in),
            Some(fan_out),
            device,
        );
        let bias = self
            .bias
            .then(|| Initializer::Zeros.init([out_channels], device));

        let smoothing = match self.kind {
            DilatedConvType::Regular | DilatedConvType::Decomposed => None,
            // Starts as the identity mixing of the d*d sub-grids.
            DilatedConvType::SmoothedGi => Some(Param::from_tensor(Tensor::eye(d * d, device))),
            // Learned residual on top of a fixed centre impulse.
            DilatedConvType::SmoothedSsc => {
                let size = 2 * d - 1;
                Some(Initializer::Zeros.init([size, size], device))
            }
        };

        tracing::debug!(
            kind = self.kind.as_str(),
            in_channels,
            out_channels,
            kernel_size = k,
            dilation = d,
            "initialized dilated convolution"
        );

        Ok(DilatedConv2d {
            weight,
            bias,
            smoothing,
            kind: Ignored(self.kind.clone()),
            kernel_size: k,
            dilation: d,
        })
    }
}

/// Dilated 2D convolution with stride 1 and `SAME` padding.
///
/// Should be created with [`DilatedConv2dConfig`].
///
/// # Shapes
///   - input: `[batch, in_channels, height, width]`
///   - output: `[batch, out_channels, height, width]`
#[derive(Module, Debug)]
pub struct DilatedConv2d<B: Backend> {
    /// Kernel of shape `[out_channels, in_channels, k, k]`.
    pub weight: Param<Tensor<B, 4>>,
    /// Optional bias of shape `[out_channels]`.
    pub bias: Option<Param<Tensor<B, 1>>>,
    /// `[d*d, d*d]` group interaction matrix for [`DilatedConvType::SmoothedGi`],
    /// `[2d-1, 2d-1]` shared smoothing kernel for [`DilatedConvType::SmoothedSsc`].
    pub smoothing: Option<Param<Tensor<B, 2>>>,
    kind: Ignored<DilatedConvType>,
    kernel_size: usize,
    dilation: usize,
}

impl<B: Backend> DilatedConv2d<B> {
    /// Applies the forward pass on the input tensor.
    ///
    /// # Errors
    ///
    /// Only fails if the internal sub-grid batch cannot be reassembled, which
    /// indicates a shape bug rather than bad input.
    pub fn forward(&self, input: Tensor<B, 4>) -> DilatedConvResult<Tensor<B, 4>> {
        let output = match &self.kind.0 {
            DilatedConvType::Regular => self.atrous(input),
            DilatedConvType::Decomposed => {
                let (batched, crops) = space_to_batch(input, self.dilation);
                let batched = self.dense(batched);
                batch_to_space(batched, self.dilation, crops)?
            }
            DilatedConvType::SmoothedGi => {
                let (batched, crops) = space_to_batch(input, self.dilation);
                let batched = self.group_interaction(self.dense(batched));
                batch_to_space(batched, self.dilation, crops)?
            }
            DilatedConvType::SmoothedSsc => self.atrous(self.shared_smoothing(input)),
        };

        Ok(self.add_bias(output))
    }

    /// The dilation variant.
    pub fn kind(&self) -> &DilatedConvType {
        &self.kind.0
    }

    /// The dilation factor.
    pub const fn dilation(&self) -> usize {
        self.dilation
    }

    /// Side of the square kernel.
    pub const fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    /// `[in_channels, out_channels]`.
    pub fn channels(&self) -> [usize; 2] {
        let [out_channels, in_channels, _, _] = self.weight.dims();
        [in_channels, out_channels]
    }

    fn atrous(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let pad = self.dilation * (self.kernel_size - 1) / 2;
        conv2d(
            input,
            self.weight.val(),
            None,
            ConvOptions::new([1, 1], [pad, pad], [self.dilation, self.dilation], 1),
        )
    }

    fn dense(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let pad = (self.kernel_size - 1) / 2;
        conv2d(
            input,
            self.weight.val(),
            None,
            ConvOptions::new([1, 1], [pad, pad], [1, 1], 1),
        )
    }

    /// Replaces sub-grid `i` with `sum_j w[j, i] * grid_j`.
    fn group_interaction(&self, batched: Tensor<B, 4>) -> Tensor<B, 4> {
        let Some(mixing) = &self.smoothing else {
            return batched;
        };
        let groups = self.dilation * self.dilation;
        let [batch, c, h, w] = batched.dims();
        let n = batch / groups;

        let grids = batched.reshape([groups, n * c * h * w]);
        mixing
            .val()
            .transpose()
            .matmul(grids)
            .reshape([batch, c, h, w])
    }

    /// Depthwise `SAME` convolution of every channel with the one shared kernel.
    fn shared_smoothing(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let Some(residual) = &self.smoothing else {
            return input;
        };
        let d = self.dilation;
        let size = 2 * d - 1;
        let [n, c, h, w] = input.dims();

        let device = input.device();
        let impulse = Tensor::<B, 2>::zeros([size, size], &device)
            .slice_assign([d - 1..d, d - 1..d], Tensor::ones([1, 1], &device));
        let kernel = (residual.val() + impulse).reshape([1, 1, size, size]);

        conv2d(
            input.reshape([n * c, 1, h, w]),
            kernel,
            None,
            ConvOptions::new([1, 1], [d - 1, d - 1], [1, 1], 1),
        )
        .reshape([n, c, h, w])
    }

    fn add_bias(&self, output: Tensor<B, 4>) -> Tensor<B, 4> {
        match &self.bias {
            Some(bias) => {
                let [out_channels] = bias.dims();
                output + bias.val().reshape([1, out_channels, 1, 1])
            }
            None => output,
        }
    }
}
