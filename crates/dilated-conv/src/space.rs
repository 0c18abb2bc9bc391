//! Rearranging spatial blocks into the batch dimension and back.
//!
//! A dilated convolution with rate `d` only ever combines pixels that share
//! the same offset modulo `d`. Moving each of the `d * d` interleaved
//! sub-grids into its own batch entry turns the dilated convolution into an
//! ordinary one.

use burn::prelude::*;

use crate::error::{DilatedConvError, DilatedConvResult};

/// Splits `input` into `block * block` interleaved sub-grids stacked along the
/// batch dimension.
///
/// The height and width are zero-padded at the bottom and right up to a
/// multiple of `block`. The returned `[pad_bottom, pad_right]` must be handed
/// back to [`batch_to_space`] to crop it again.
///
/// The sub-grid starting at row offset `i` and column offset `j` lands at
/// batch index `(i * block + j) * batch + n`.
///
/// # Shapes
///   - input: `[batch, channels, height, width]`
///   - output: `[block * block * batch, channels, ceil(height / block), ceil(width / block)]`
pub fn space_to_batch<B: Backend>(
    input: Tensor<B, 4>,
    block: usize,
) -> (Tensor<B, 4>, [usize; 2]) {
    if block <= 1 {
        return (input, [0, 0]);
    }

    let [_, _, height, width] = input.dims();
    let crops = [remainder_pad(height, block), remainder_pad(width, block)];
    let padded = input.pad((0, crops[1], 0, crops[0]), B::FloatElem::from_elem(0.0));

    let [n, c, h, w] = padded.dims();
    let (h_blocks, w_blocks) = (h / block, w / block);
    let output = padded
        .reshape([n, c, h_blocks, block, w_blocks, block])
        .permute([3, 5, 0, 1, 2, 4])
        .reshape([block * block * n, c, h_blocks, w_blocks]);

    (output, crops)
}

/// Inverse of [`space_to_batch`]: interleaves the sub-grids back into full
/// resolution maps and crops `[bottom, right]` from the result.
///
/// # Errors
///
/// Returns [`DilatedConvError::InvalidBatch`] when the batch dimension is not
/// a multiple of `block * block`.
pub fn batch_to_space<B: Backend>(
    input: Tensor<B, 4>,
    block: usize,
    crops: [usize; 2],
) -> DilatedConvResult<Tensor<B, 4>> {
    if block <= 1 {
        return Ok(input);
    }

    let [batch, c, h_blocks, w_blocks] = input.dims();
    let groups = block * block;
    if batch % groups != 0 {
        return Err(DilatedConvError::InvalidBatch { batch, block });
    }
    let n = batch / groups;
    let (h, w) = (h_blocks * block, w_blocks * block);

    let output = input
        .reshape([block, block, n, c, h_blocks, w_blocks])
        .permute([2, 3, 4, 0, 5, 1])
        .reshape([n, c, h, w]);

    let [crop_bottom, crop_right] = crops;
    if crop_bottom == 0 && crop_right == 0 {
        return Ok(output);
    }
    Ok(output.slice([
        0..n,
        0..c,
        0..h.saturating_sub(crop_bottom),
        0..w.saturating_sub(crop_right),
    ]))
}

/// Padding needed to round `size` up to a multiple of `block`.
const fn remainder_pad(size: usize, block: usize) -> usize {
    match size % block {
        0 => 0,
        rem => block - rem,
    }
}

#[cfg(test)]
mod tests {
    use burn::tensor::{Distribution, TensorData, Tolerance};

    use super::*;
    use crate::tests::TestBackend;

    fn arange_grid(h: usize, w: usize) -> Tensor<TestBackend, 4> {
        let device = Default::default();
        Tensor::<TestBackend, 1, Int>::arange(0..(h * w) as i64, &device)
            .float()
            .reshape([1, 1, h, w])
    }

    #[test]
    fn space_to_batch_orders_sub_grids_row_major() {
        let input = arange_grid(4, 4);
        let (output, crops) = space_to_batch(input, 2);

        assert_eq!(crops, [0, 0]);
        assert_eq!(output.dims(), [4, 1, 2, 2]);
        output.into_data().assert_approx_eq::<f32>(
            &TensorData::from([
                [[[0.0, 2.0], [8.0, 10.0]]],
                [[[1.0, 3.0], [9.0, 11.0]]],
                [[[4.0, 6.0], [12.0, 14.0]]],
                [[[5.0, 7.0], [13.0, 15.0]]],
            ]),
            Tolerance::default(),
        );
    }

    #[test]
    fn space_to_batch_pads_bottom_right_with_zeros() {
        let input = arange_grid(3, 3) + 1.0;
        let (output, crops) = space_to_batch(input, 2);

        assert_eq!(crops, [1, 1]);
        assert_eq!(output.dims(), [4, 1, 2, 2]);
        // Offset (1, 1) only sees one real pixel, the rest is padding.
        output
            .slice([3..4, 0..1, 0..2, 0..2])
            .into_data()
            .assert_approx_eq::<f32>(
                &TensorData::from([[[[5.0, 0.0], [0.0, 0.0]]]]),
                Tolerance::default(),
            );
    }

    #[test]
    fn space_to_batch_pads_only_the_short_axis() {
        let input = arange_grid(3, 2) + 1.0;
        let (output, crops) = space_to_batch(input, 2);

        assert_eq!(crops, [1, 0]);
        assert_eq!(output.dims(), [4, 1, 2, 1]);
        output
            .slice([2..3, 0..1, 0..2, 0..1])
            .into_data()
            .assert_approx_eq::<f32>(&TensorData::from([[[[3.0], [0.0]]]]), Tolerance::default());
    }

    #[test]
    fn batch_to_space_inverts_space_to_batch() {
        let device = Default::default();
        for (h, w, block) in [(6, 6, 3), (7, 5, 2), (5, 9, 4), (4, 4, 1)] {
            let input = Tensor::<TestBackend, 4>::random(
                [2, 3, h, w],
                Distribution::Normal(0.0, 1.0),
                &device,
            );
            let (batched, crops) = space_to_batch(input.clone(), block);
            let restored = batch_to_space(batched, block, crops).unwrap();

            assert_eq!(restored.dims(), [2, 3, h, w]);
            restored
                .into_data()
                .assert_approx_eq::<f32>(&input.into_data(), Tolerance::default());
        }
    }

    #[test]
    fn batch_to_space_rejects_incomplete_batches() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::zeros([3, 1, 2, 2], &device);

        match batch_to_space(input, 2, [0, 0]) {
            Err(DilatedConvError::InvalidBatch { batch, block }) => {
                assert_eq!(batch, 3);
                assert_eq!(block, 2);
            }
            Err(err) => panic!("Expected InvalidBatch error, got {err}"),
            Ok(_) => panic!("Expected InvalidBatch error"),
        }
    }

    #[test]
    fn remainder_pad_rounds_up_to_block() {
        assert_eq!(remainder_pad(8, 4), 0);
        assert_eq!(remainder_pad(9, 4), 3);
        assert_eq!(remainder_pad(1, 3), 2);
    }
}
