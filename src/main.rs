use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{anyhow, ensure, Result};
use burn::{
    config::Config,
    tensor::{backend::Backend, Distribution, Tensor},
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use patchgan_depth::{
    model::{ModelConfig, Network, IN_CHANNELS},
    shape,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "wgpu")]
type MyBackend = burn::backend::Wgpu<f32>;
#[cfg(not(feature = "wgpu"))]
type MyBackend = burn::backend::NdArray<f32>;

#[derive(Parser)]
#[command(name = "patchgan-depth")]
#[command(about = "Inspect the generator, discriminator and stereo depth networks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log filter used when RUST_LOG is unset
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print parameter counts and planned shapes for every network
    Summary {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Push a random input through one network
    Forward {
        #[arg(short, long, value_enum)]
        network: NetworkArg,

        #[command(flatten)]
        input: InputArgs,

        /// Seed for the backend RNG
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },

    /// Write the default configuration as JSON
    WriteConfig {
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct InputArgs {
    #[arg(short, long, default_value = "1")]
    batch: usize,

    #[arg(long, default_value = "64")]
    height: usize,

    #[arg(long, default_value = "64")]
    width: usize,

    /// JSON model configuration (see `write-config`)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl InputArgs {
    fn dims(&self) -> [usize; 4] {
        [self.batch, IN_CHANNELS, self.height, self.width]
    }

    fn model_config(&self) -> Result<ModelConfig> {
        match &self.config {
            Some(path) => load_config(path),
            None => Ok(ModelConfig::new()),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum NetworkArg {
    Generator,
    Discriminator,
    Depth,
}

impl From<NetworkArg> for Network {
    fn from(network: NetworkArg) -> Self {
        match network {
            NetworkArg::Generator => Network::Generator,
            NetworkArg::Discriminator => Network::Discriminator,
            NetworkArg::Depth => Network::Depth,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let device = Default::default();

    match cli.command {
        Commands::Summary { input } => summary(&input, &device),
        Commands::Forward {
            network,
            input,
            seed,
        } => forward(network.into(), &input, seed, &device),
        Commands::WriteConfig { output } => {
            ModelConfig::new().save(&output)?;
            info!(path = %output.display(), "wrote default config");
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<ModelConfig> {
    let config = ModelConfig::load(path)
        .map_err(|err| anyhow!("unable to load config {}: {err:?}", path.display()))?;
    info!(path = %path.display(), "loaded config");
    Ok(config)
}

fn summary(input: &InputArgs, device: &<MyBackend as Backend>::Device) -> Result<()> {
    let config = input.model_config()?;
    let model = config.init::<MyBackend>(device);
    let dims = input.dims();

    for network in Network::ALL {
        println!("{network}: {} parameters", model.num_params_of(network));

        let stages = config.stages(network);
        match shape::trace(&stages, dims) {
            Ok(shapes) => {
                println!("  {:<28} {:?}", "input", shapes[0]);
                for (stage, dims) in stages.iter().zip(&shapes[1..]) {
                    println!("  {:<28} {:?}", stage.to_string(), dims);
                }
            }
            Err(err) => warn!(%network, ?dims, "cannot plan shapes: {err}"),
        }
    }

    Ok(())
}

fn forward(
    network: Network,
    input: &InputArgs,
    seed: u64,
    device: &<MyBackend as Backend>::Device,
) -> Result<()> {
    let config = input.model_config()?;
    let dims = input.dims();
    let planned = config.output_shape(network, dims)?;

    MyBackend::seed(seed);
    let model = config.init::<MyBackend>(device);
    let images = Tensor::<MyBackend, 4>::random(dims, Distribution::Normal(0.0, 1.0), device);

    let start = Instant::now();
    let output = model.forward(network, images);
    let output_dims = output.dims();
    let values = output
        .into_data()
        .to_vec::<f32>()
        .map_err(|err| anyhow!("unable to read output: {err:?}"))?;
    let elapsed = start.elapsed();

    ensure!(
        output_dims == planned,
        "{network} produced {output_dims:?}, planned {planned:?}"
    );

    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &v| {
            (min.min(v), max.max(v))
        });
    info!(
        %network,
        input = ?dims,
        output = ?output_dims,
        elapsed_ms = elapsed.as_millis() as u64,
        min,
        max,
        "forward pass done"
    );

    Ok(())
}
