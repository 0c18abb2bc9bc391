use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::config::Config;
use clap::{Parser, Subcommand};
use dilated_vgg::{
    args::{InputArgs, ModelArgs, Preset},
    bench::run_bench,
    create_device, BackendInfo,
    summary::{render_table, summarize, verify},
    SelectedBackend,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dilated-vgg")]
#[command(about = "Inspect and time the dilated VGG-16 segmentation backbone")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the end points of a backbone configuration
    Summary {
        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        input: InputArgs,

        /// Build the model and run a forward pass to confirm the shapes
        #[arg(long)]
        run: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Time forward passes of a backbone
    Bench {
        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        input: InputArgs,

        /// Number of forward passes
        #[arg(short = 'n', long, default_value_t = 10)]
        iterations: usize,

        /// Print the timings as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a backbone configuration file
    InitConfig {
        /// Output path of the JSON configuration
        #[arg(short, long)]
        output: PathBuf,

        /// Configuration to start from
        #[arg(long, value_enum, default_value_t = Preset::Vgg16)]
        preset: Preset,
    },

    /// Show backend information
    Info,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Summary {
            model,
            input,
            run,
            json,
        } => {
            let config = model.to_config()?;
            let shape = input.shape(config.in_channels);

            let summary = if run {
                let device = create_device();
                let backend = BackendInfo::new(&device);
                tracing::info!(%backend, ?shape, "running forward pass");
                verify::<SelectedBackend>(&config, shape, &device)?
            } else {
                summarize(&config, shape)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", render_table(&summary));
            }
            Ok(())
        }

        Commands::Bench {
            model,
            input,
            iterations,
            json,
        } => {
            let config = model.to_config()?;
            let shape = input.shape(config.in_channels);
            let device = create_device();
            let backend = BackendInfo::new(&device);
            tracing::info!(%backend, "benchmarking");

            let report = run_bench::<SelectedBackend>(&config, shape, iterations, &device)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report.summary())?);
            } else {
                println!(
                    "Total time: {:?}, Mean: {:?}, Speed: {:.3} it/s",
                    report.total,
                    report.mean(),
                    report.throughput()
                );
                println!("{:?}", report.per_iteration);
            }
            Ok(())
        }

        Commands::InitConfig { output, preset } => {
            let config = preset.config();
            config
                .save(&output)
                .with_context(|| format!("failed to write config {}", output.display()))?;
            tracing::info!(path = %output.display(), ?preset, "configuration written");
            Ok(())
        }

        Commands::Info => {
            let backend = BackendInfo::new(&create_device());
            println!("Dilated VGG-16 backbone");
            println!("  Backend: {}", backend.name);
            println!("  Device: {}", backend.device);
            println!("  Kernel fusion: {}", if backend.fusion { "on" } else { "off" });
            Ok(())
        }
    }
}
