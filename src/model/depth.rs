use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
};
use tracing::debug;

use crate::shape::Stage;

/// Single-channel depth map at a quarter of the input resolution.
///
/// Three convolutions with two 2x2 max pools in between and no activations,
/// so the output values are raw.
#[derive(Module, Debug)]
pub struct StereoDepthPrediction<B: Backend> {
    conv_1: Conv2d<B>,
    conv_2: Conv2d<B>,
    conv_3: Conv2d<B>,
    pool: MaxPool2d,
}
impl<B: Backend> StereoDepthPrediction<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let output = self.conv_1.forward(input);
        let output = self.pool.forward(output);
        let output = self.conv_2.forward(output);
        let output = self.pool.forward(output);

        self.conv_3.forward(output)
    }
}

#[derive(Config, Debug)]
pub struct StereoDepthPredictionConfig;
impl StereoDepthPredictionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> StereoDepthPrediction<B> {
        let conv_1 = Conv2dConfig::new([3, 64], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let conv_2 = Conv2dConfig::new([64, 128], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let conv_3 = Conv2dConfig::new([128, 1], [1, 1]).init(device);
        let pool = MaxPool2dConfig::new([2, 2])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Valid)
            .init();

        let depth = StereoDepthPrediction {
            conv_1,
            conv_2,
            conv_3,
            pool,
        };
        debug!(params = depth.num_params(), "initialised depth network");

        depth
    }

    pub fn stages(&self) -> Vec<Stage> {
        let pool = Stage::MaxPool {
            kernel: 2,
            stride: 2,
        };
        vec![
            Stage::Conv {
                channels: [3, 64],
                kernel: 3,
                stride: 1,
                padding: 1,
            },
            pool,
            Stage::Conv {
                channels: [64, 128],
                kernel: 3,
                stride: 1,
                padding: 1,
            },
            pool,
            Stage::Conv {
                channels: [128, 1],
                kernel: 1,
                stride: 1,
                padding: 0,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::TestBackend, shape};
    use burn::tensor::Distribution;

    #[test]
    fn output_shape_64() {
        let device = Default::default();
        let depth = StereoDepthPredictionConfig::new().init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::random(
            [1, 3, 64, 64],
            Distribution::Uniform(0.0, 1.0),
            &device,
        );

        assert_eq!(depth.forward(input).dims(), [1, 1, 16, 16]);
    }

    #[test]
    fn odd_sizes_floor() {
        let device = Default::default();
        let config = StereoDepthPredictionConfig::new();
        let depth = config.init::<TestBackend>(&device);

        for dims in [[2, 3, 15, 10], [1, 3, 4, 4]] {
            let input = Tensor::<TestBackend, 4>::zeros(dims, &device);
            let planned = shape::output_shape(&config.stages(), dims).unwrap();

            assert_eq!(depth.forward(input).dims(), planned);
        }
        assert_eq!(
            shape::output_shape(&config.stages(), [2, 3, 15, 10]).unwrap(),
            [2, 1, 3, 2]
        );
    }

    #[test]
    fn planner_rejects_tiny_input() {
        let stages = StereoDepthPredictionConfig::new().stages();

        assert!(shape::output_shape(&stages, [1, 3, 3, 8]).is_err());
    }

    #[test]
    fn param_count() {
        let device = Default::default();
        let depth = StereoDepthPredictionConfig::new().init::<TestBackend>(&device);

        assert_eq!(depth.num_params(), 75_777);
    }
}
