//! Max pooling with TensorFlow `SAME` padding.
//!
//! Burn's [`MaxPool2d`] only pads symmetrically, so a 2x2/2 pool over an odd
//! sized map would drop the last row and column. `SAME` pooling keeps
//! `ceil(size / stride)` outputs and puts the extra padding at the end.

use burn::{
    nn::pool::{MaxPool2d, MaxPool2dConfig},
    prelude::*,
};

/// Padding `(start, end)` needed along one axis for `SAME` output size.
///
/// The output size is `ceil(size_in / stride)`; any odd amount of padding goes
/// to the end of the axis.
pub const fn same_padding(size_in: usize, kernel: usize, stride: usize) -> (usize, usize) {
    let size_out = size_in.div_ceil(stride);
    let total = if size_out > 0 {
        ((size_out - 1) * stride + kernel).saturating_sub(size_in)
    } else {
        0
    };
    let start = total / 2;
    (start, total - start)
}

/// Configuration to create a [`SameMaxPool2d`] layer.
#[derive(Config, Debug)]
pub struct SameMaxPool2dConfig {
    /// The size of the pooling window.
    pub kernel_size: [usize; 2],
    /// The strides. Defaults to the kernel size.
    #[config(default = "kernel_size")]
    pub strides: [usize; 2],
}

impl SameMaxPool2dConfig {
    /// Initializes a new [`SameMaxPool2d`].
    pub fn init(&self) -> SameMaxPool2d {
        SameMaxPool2d {
            pool: MaxPool2dConfig::new(self.kernel_size)
                .with_strides(self.strides)
                .init(),
            kernel_size: self.kernel_size,
            strides: self.strides,
        }
    }
}

/// 2D max pooling with `SAME` padding.
///
/// # Shapes
///   - input: `[batch, channels, height, width]`
///   - output: `[batch, channels, ceil(height / stride), ceil(width / stride)]`
#[derive(Module, Clone, Debug)]
pub struct SameMaxPool2d {
    pool: MaxPool2d,
    kernel_size: [usize; 2],
    strides: [usize; 2],
}

impl SameMaxPool2d {
    /// Applies the forward pass on the input tensor.
    pub fn forward<B: Backend>(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, _, height, width] = input.dims();
        let (top, bottom) = same_padding(height, self.kernel_size[0], self.strides[0]);
        let (left, right) = same_padding(width, self.kernel_size[1], self.strides[1]);

        // Padded cells must never win the max.
        let padded = input.pad(
            (left, right, top, bottom),
            B::FloatElem::from_elem(f32::NEG_INFINITY),
        );
        self.pool.forward(padded)
    }

    /// Output spatial size for an input of `[height, width]`.
    pub const fn output_size(&self, [height, width]: [usize; 2]) -> [usize; 2] {
        [
            height.div_ceil(self.strides[0]),
            width.div_ceil(self.strides[1]),
        ]
    }

    /// The pooling window.
    pub const fn kernel_size(&self) -> [usize; 2] {
        self.kernel_size
    }

    /// The strides.
    pub const fn strides(&self) -> [usize; 2] {
        self.strides
    }
}

#[cfg(test)]
mod tests {
    use burn::tensor::{TensorData, Tolerance};

    use super::*;
    use crate::tests::TestBackend;

    #[test]
    fn same_padding_matches_tensorflow() {
        assert_eq!(same_padding(224, 2, 2), (0, 0));
        assert_eq!(same_padding(225, 2, 2), (0, 1));
        assert_eq!(same_padding(14, 3, 1), (1, 1));
        assert_eq!(same_padding(7, 3, 2), (1, 1));
        assert_eq!(same_padding(6, 3, 2), (0, 1));
        assert_eq!(same_padding(0, 2, 2), (0, 0));
    }

    #[test]
    fn strides_default_to_kernel_size() {
        let pool = SameMaxPool2dConfig::new([2, 2]).init();
        assert_eq!(pool.strides(), [2, 2]);
        assert_eq!(pool.kernel_size(), [2, 2]);
    }

    #[test]
    fn odd_input_keeps_last_row_and_column() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::from_data(
            TensorData::from([[[
                [1.0, 2.0, 3.0],
                [4.0, 5.0, 6.0],
                [7.0, 8.0, 9.0],
            ]]]),
            &device,
        );
        let pool = SameMaxPool2dConfig::new([2, 2]).init();
        let output = pool.forward(input);

        assert_eq!(output.dims(), [1, 1, 2, 2]);
        output.into_data().assert_approx_eq::<f32>(
            &TensorData::from([[[[5.0, 6.0], [8.0, 9.0]]]]),
            Tolerance::default(),
        );
    }

    #[test]
    fn padding_never_wins_over_negative_values() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::from_data(
            TensorData::from([[[[-3.0, -2.0], [-4.0, -1.0]]]]),
            &device,
        );
        let pool = SameMaxPool2dConfig::new([3, 3]).with_strides([1, 1]).init();
        let output = pool.forward(input);

        assert_eq!(output.dims(), [1, 1, 2, 2]);
        output.into_data().assert_approx_eq::<f32>(
            &TensorData::from([[[[-1.0, -1.0], [-1.0, -1.0]]]]),
            Tolerance::default(),
        );
    }

    #[test]
    fn output_size_uses_ceiling_division() {
        let pool = SameMaxPool2dConfig::new([2, 2]).init();
        assert_eq!(pool.output_size([225, 224]), [113, 112]);

        let pool5 = SameMaxPool2dConfig::new([3, 3]).with_strides([1, 1]).init();
        assert_eq!(pool5.output_size([14, 15]), [14, 15]);
    }
}
