use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
};
use tracing::debug;

use crate::{
    model::layers::{down_stage, DownBlock},
    shape::Stage,
};

/// Patch discriminator: three down blocks and a 4x4 valid convolution down to
/// a single channel. Each output cell is a raw real/fake logit for one patch
/// of the input; no sigmoid is applied.
#[derive(Module, Debug)]
pub struct Discriminator<B: Backend> {
    down_layer_1: DownBlock<B>,
    down_layer_2: DownBlock<B>,
    down_layer_3: DownBlock<B>,
    out_layer: Conv2d<B>,
}
impl<B: Backend> Discriminator<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let output = self.down_layer_1.forward(input);
        let output = self.down_layer_2.forward(output);
        let output = self.down_layer_3.forward(output);

        self.out_layer.forward(output)
    }
}

const DOWN_CHANNELS: [[usize; 2]; 3] = [[3, 64], [64, 128], [128, 256]];
const OUT_CHANNELS: [usize; 2] = [256, 1];
const OUT_KERNEL: usize = 4;

#[derive(Config, Debug)]
pub struct DiscriminatorConfig {
    #[config(default = 0.01)]
    pub negative_slope: f64,
}
impl DiscriminatorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Discriminator<B> {
        let [down_1, down_2, down_3] = DOWN_CHANNELS;

        let out_layer = Conv2dConfig::new(OUT_CHANNELS, [OUT_KERNEL, OUT_KERNEL])
            .with_padding(PaddingConfig2d::Valid)
            .init(device);

        let discriminator = Discriminator {
            down_layer_1: DownBlock::new(down_1, self.negative_slope, device),
            down_layer_2: DownBlock::new(down_2, self.negative_slope, device),
            down_layer_3: DownBlock::new(down_3, self.negative_slope, device),
            out_layer,
        };
        debug!(
            params = discriminator.num_params(),
            "initialised discriminator"
        );

        discriminator
    }

    pub fn stages(&self) -> Vec<Stage> {
        let mut stages: Vec<Stage> = DOWN_CHANNELS.into_iter().map(down_stage).collect();
        stages.push(Stage::Conv {
            channels: OUT_CHANNELS,
            kernel: OUT_KERNEL,
            stride: 1,
            padding: 0,
        });
        stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ShapeError, model::TestBackend, shape};
    use burn::tensor::Distribution;

    #[test]
    fn output_shape_70() {
        let device = Default::default();
        let discriminator = DiscriminatorConfig::new().init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::random(
            [1, 3, 70, 70],
            Distribution::Normal(0.0, 1.0),
            &device,
        );
        let output = discriminator.forward(input);

        // 70 -> 35 -> 18 -> 9, then 9 - 4 + 1
        assert_eq!(output.dims(), [1, 1, 6, 6]);
    }

    #[test]
    fn one_logit_per_patch() {
        let device = Default::default();
        let discriminator = DiscriminatorConfig::new().init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::random(
            [2, 3, 40, 40],
            Distribution::Normal(0.0, 50.0),
            &device,
        );
        let values = discriminator
            .forward(input)
            .to_data()
            .to_vec::<f32>()
            .unwrap();

        // 40 -> 20 -> 10 -> 5 -> 2
        assert_eq!(values.len(), 2 * 2 * 2);
        assert!(values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn planned_shape_matches_forward() {
        let device = Default::default();
        let config = DiscriminatorConfig::new();
        let discriminator = config.init::<TestBackend>(&device);

        for dims in [[3, 3, 25, 25], [1, 3, 40, 57]] {
            let input = Tensor::<TestBackend, 4>::zeros(dims, &device);
            let planned = shape::output_shape(&config.stages(), dims).unwrap();

            assert_eq!(discriminator.forward(input).dims(), planned);
        }
    }

    #[test]
    fn planner_rejects_small_input() {
        let stages = DiscriminatorConfig::new().stages();

        assert_eq!(
            shape::output_shape(&stages, [1, 3, 25, 25]).unwrap(),
            [1, 1, 1, 1]
        );
        assert!(matches!(
            shape::output_shape(&stages, [1, 3, 24, 25]),
            Err(ShapeError::TooSmall { size: 3, .. })
        ));
    }

    #[test]
    fn param_count() {
        let device = Default::default();
        let discriminator = DiscriminatorConfig::new().init::<TestBackend>(&device);

        assert_eq!(discriminator.num_params(), 374_913);
    }
}
