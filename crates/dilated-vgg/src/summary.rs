//! End-point summaries of a backbone configuration.

use std::fmt::Write as _;

use anyhow::{bail, Result};
use burn::prelude::*;
use dilated_vgg_backbone::{BasenetConfig, EndPoint};
use serde::Serialize;

/// Shape and width of one end point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndPointSummary {
    pub name: &'static str,
    pub shape: [usize; 4],
    pub channels: usize,
}

/// Description of a backbone for a given input shape.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    /// Name of the block convolution (`plain` for ordinary VGG layers).
    pub block_conv: String,
    pub block_rate: Option<usize>,
    pub layers_per_block: Vec<usize>,
    pub fc6_rate: usize,
    pub input: [usize; 4],
    pub end_points: Vec<EndPointSummary>,
    /// Number of parameters; only known once the model has been built.
    pub num_params: Option<usize>,
}

/// Summarizes `config` through shape inference only, without building the model.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or does not accept `input`.
pub fn summarize(config: &BasenetConfig, input: [usize; 4]) -> Result<ModelSummary> {
    let end_points = config
        .end_point_shapes(input)?
        .into_iter()
        .map(|(end_point, shape)| EndPointSummary {
            name: end_point.name(),
            shape,
            channels: config.channels(end_point),
        })
        .collect();

    Ok(ModelSummary {
        block_conv: config
            .block_conv
            .as_ref()
            .map_or_else(|| "plain".to_owned(), |b| b.kind.as_str().to_owned()),
        block_rate: config.block_conv.as_ref().map(|b| b.rate),
        layers_per_block: config.layers_per_block().to_vec(),
        fc6_rate: config.fc6_dilation(),
        input,
        end_points,
        num_params: None,
    })
}

/// Builds the model, runs a forward pass on zeros and checks every end point
/// against shape inference.
///
/// # Errors
///
/// Returns an error if the model cannot be built, the forward pass fails, or a
/// measured shape differs from the inferred one.
pub fn verify<B: Backend>(
    config: &BasenetConfig,
    input: [usize; 4],
    device: &B::Device,
) -> Result<ModelSummary> {
    let mut summary = summarize(config, input)?;

    let model = config.init::<B>(device)?;
    tracing::info!(num_params = model.num_params(), "model built");

    let (_, end_points) = model.forward(Tensor::zeros(input, device))?;
    for expected in &summary.end_points {
        let end_point: EndPoint = expected.name.parse()?;
        let Some(tensor) = end_points.get(end_point) else {
            bail!("end point {end_point} missing from forward pass");
        };
        let actual = tensor.dims();
        if actual != expected.shape {
            bail!(
                "end point {end_point} has shape {actual:?}, expected {:?}",
                expected.shape
            );
        }
    }

    summary.num_params = Some(model.num_params());
    Ok(summary)
}

/// Renders a summary as a plain-text table.
pub fn render_table(summary: &ModelSummary) -> String {
    let mut out = String::new();
    let block_conv = match summary.block_rate {
        Some(rate) => format!("{} (rate {rate})", summary.block_conv),
        None => summary.block_conv.clone(),
    };
    let _ = writeln!(out, "input        {:?}", summary.input);
    let _ = writeln!(out, "block conv   {block_conv}");
    let _ = writeln!(out, "layers       {:?}", summary.layers_per_block);
    let _ = writeln!(out, "fc6 rate     {}", summary.fc6_rate);
    if let Some(num_params) = summary.num_params {
        let _ = writeln!(out, "parameters   {num_params}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{:<10} {:>8}  shape", "end point", "channels");
    for end_point in &summary.end_points {
        let _ = writeln!(
            out,
            "{:<10} {:>8}  {:?}",
            end_point.name, end_point.channels, end_point.shape
        );
    }
    out
}
