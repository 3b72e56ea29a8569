pub mod depth;
pub mod discriminator;
pub mod generator;
pub mod layers;

use std::fmt;

use burn::{module::Module, prelude::*};

use crate::{
    error,
    model::{
        depth::{StereoDepthPrediction, StereoDepthPredictionConfig},
        discriminator::{Discriminator, DiscriminatorConfig},
        generator::{Generator, GeneratorConfig},
    },
    shape::{self, Stage},
};

#[cfg(test)]
pub(crate) type TestBackend = burn::backend::NdArray<f32>;

/// The three networks side by side. They share no parameters and are never
/// chained into one another.
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    pub generator: Generator<B>,
    pub discriminator: Discriminator<B>,
    pub depth: StereoDepthPrediction<B>,
}
impl<B: Backend> Model<B> {
    pub fn forward(&self, network: Network, input: Tensor<B, 4>) -> Tensor<B, 4> {
        match network {
            Network::Generator => self.generator.forward(input),
            Network::Discriminator => self.discriminator.forward(input),
            Network::Depth => self.depth.forward(input),
        }
    }

    pub fn num_params_of(&self, network: Network) -> usize {
        match network {
            Network::Generator => self.generator.num_params(),
            Network::Discriminator => self.discriminator.num_params(),
            Network::Depth => self.depth.num_params(),
        }
    }
}

#[derive(Config, Debug)]
pub struct ModelConfig {
    #[config(default = "GeneratorConfig::new()")]
    pub generator_config: GeneratorConfig,
    #[config(default = "DiscriminatorConfig::new()")]
    pub discriminator_config: DiscriminatorConfig,
    #[config(default = "StereoDepthPredictionConfig::new()")]
    pub depth_config: StereoDepthPredictionConfig,
}
impl ModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        let generator = self.generator_config.init(device);
        let discriminator = self.discriminator_config.init(device);
        let depth = self.depth_config.init(device);

        Model {
            generator,
            discriminator,
            depth,
        }
    }

    pub fn stages(&self, network: Network) -> Vec<Stage> {
        match network {
            Network::Generator => self.generator_config.stages(),
            Network::Discriminator => self.discriminator_config.stages(),
            Network::Depth => self.depth_config.stages(),
        }
    }

    /// Planned output shape of `network` for an input of shape `dims`.
    pub fn output_shape(&self, network: Network, dims: [usize; 4]) -> error::Result<[usize; 4]> {
        shape::output_shape(&self.stages(network), dims)
    }
}

/// Every network reads RGB images.
pub const IN_CHANNELS: usize = 3;

/// Selects one of the networks held by [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Generator,
    Discriminator,
    Depth,
}

impl Network {
    pub const ALL: [Network; 3] = [Network::Generator, Network::Discriminator, Network::Depth];
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Generator => "generator",
            Network::Discriminator => "discriminator",
            Network::Depth => "stereo-depth",
        };
        f.write_str(name)
    }
}
