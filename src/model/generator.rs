use burn::{module::Module, prelude::*};
use tracing::debug;

use crate::{
    model::layers::{down_stage, up_stage, DownBlock, UpBlock},
    shape::Stage,
};

/// Encoder/decoder of three down blocks and two up blocks.
///
/// There are no skip connections and the decoder is one stage short of the
/// encoder, so a `[n, 3, h, w]` input comes out as 64 channels at roughly
/// half the input resolution (`64x64 -> 29x29`).
#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    down_layer_1: DownBlock<B>,
    down_layer_2: DownBlock<B>,
    down_layer_3: DownBlock<B>,
    up_layer_1: UpBlock<B>,
    up_layer_2: UpBlock<B>,
}
impl<B: Backend> Generator<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let output = self.down_layer_1.forward(input);
        let output = self.down_layer_2.forward(output);
        let output = self.down_layer_3.forward(output);

        let output = self.up_layer_1.forward(output);
        self.up_layer_2.forward(output)
    }
}

const DOWN_CHANNELS: [[usize; 2]; 3] = [[3, 64], [64, 128], [128, 256]];
const UP_CHANNELS: [[usize; 2]; 2] = [[256, 128], [128, 64]];

#[derive(Config, Debug)]
pub struct GeneratorConfig {
    #[config(default = 0.01)]
    pub negative_slope: f64,
}
impl GeneratorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Generator<B> {
        let [down_1, down_2, down_3] = DOWN_CHANNELS;
        let [up_1, up_2] = UP_CHANNELS;

        let generator = Generator {
            down_layer_1: DownBlock::new(down_1, self.negative_slope, device),
            down_layer_2: DownBlock::new(down_2, self.negative_slope, device),
            down_layer_3: DownBlock::new(down_3, self.negative_slope, device),
            up_layer_1: UpBlock::new(up_1, self.negative_slope, device),
            up_layer_2: UpBlock::new(up_2, self.negative_slope, device),
        };
        debug!(params = generator.num_params(), "initialised generator");

        generator
    }

    pub fn stages(&self) -> Vec<Stage> {
        DOWN_CHANNELS
            .into_iter()
            .map(down_stage)
            .chain(UP_CHANNELS.into_iter().map(up_stage))
            .collect()
    }
}
