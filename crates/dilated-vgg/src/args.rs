//! Command-line arguments shared by the subcommands.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use burn::config::Config;
use clap::{Args, ValueEnum};
use dilated_vgg_backbone::{BasenetConfig, BlockConvConfig, DilatedConvType};

/// Options describing which backbone to build.
///
/// Flags override the values read from `--config`.
#[derive(Debug, Clone, Default, Args)]
pub struct ModelArgs {
    /// Backbone configuration file (JSON) to start from
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Width of the first block
    #[arg(long)]
    pub fatness: Option<usize>,

    /// Use an undilated fc6
    #[arg(long)]
    pub no_dilation: bool,

    /// Dilation rate of fc6
    #[arg(long)]
    pub fc6_rate: Option<usize>,

    /// Dilated convolution for the block layers (regular, decompose, smooth_GI, smooth_SSC)
    #[arg(long)]
    pub block_conv: Option<DilatedConvType>,

    /// Dilation rate of the block convolutions
    #[arg(long)]
    pub block_rate: Option<usize>,
}

impl ModelArgs {
    /// Resolves the options into a validated backbone configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded, if
    /// `--block-rate` is given without any block convolution, or if the result
    /// fails validation.
    pub fn to_config(&self) -> Result<BasenetConfig> {
        let mut config = match &self.config {
            Some(path) => BasenetConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => BasenetConfig::vgg16(),
        };

        if let Some(fatness) = self.fatness {
            config.fatness = fatness;
        }
        if self.no_dilation {
            config.dilation = false;
        }
        if let Some(rate) = self.fc6_rate {
            config.fc6_rate = rate;
        }
        if self.block_conv.is_some() || self.block_rate.is_some() {
            let mut block_conv = match (&self.block_conv, config.block_conv.take()) {
                (Some(kind), Some(mut loaded)) => {
                    loaded.kind = kind.clone();
                    loaded
                }
                (Some(kind), None) => BlockConvConfig::new(kind.clone()),
                (None, Some(loaded)) => loaded,
                (None, None) => {
                    bail!("--block-rate needs a block convolution from --block-conv or --config")
                }
            };
            if let Some(rate) = self.block_rate {
                block_conv.rate = rate;
            }
            config.block_conv = Some(block_conv);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Input tensor dimensions.
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Batch size
    #[arg(long, default_value_t = 1)]
    pub batch: usize,

    /// Input height
    #[arg(long, default_value_t = 224)]
    pub height: usize,

    /// Input width
    #[arg(long, default_value_t = 224)]
    pub width: usize,
}

impl InputArgs {
    /// `[batch, channels, height, width]` for a network expecting `in_channels`.
    pub const fn shape(&self, in_channels: usize) -> [usize; 4] {
        [self.batch, in_channels, self.height, self.width]
    }
}

/// Built-in configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// VGG-16 with a dilated fc6
    Vgg16,
    /// VGG-16 with smoothed shared separable dilated block convolutions
    SmoothedSsc,
}

impl Preset {
    pub fn config(self) -> BasenetConfig {
        match self {
            Self::Vgg16 => BasenetConfig::vgg16(),
            Self::SmoothedSsc => BasenetConfig::smoothed_ssc(),
        }
    }
}
