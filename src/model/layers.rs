use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        LeakyRelu, LeakyReluConfig, PaddingConfig2d,
    },
    prelude::*,
};

use crate::shape::Stage;

const KERNEL: usize = 3;
const STRIDE: usize = 2;
const PADDING: usize = 1;

/// Shape stage of a [`DownBlock`].
pub fn down_stage(channels: [usize; 2]) -> Stage {
    Stage::Conv {
        channels,
        kernel: KERNEL,
        stride: STRIDE,
        padding: PADDING,
    }
}

/// Shape stage of an [`UpBlock`].
pub fn up_stage(channels: [usize; 2]) -> Stage {
    Stage::ConvTranspose {
        channels,
        kernel: KERNEL,
        stride: STRIDE,
        padding: PADDING,
    }
}

/// Strided 3x3 convolution followed by a leaky ReLU. Roughly halves the
/// spatial size: `floor((h - 1) / 2) + 1`.
#[derive(Module, Debug)]
pub struct DownBlock<B: Backend> {
    conv: Conv2d<B>,
    lrelu: LeakyRelu,
}
impl<B: Backend> DownBlock<B> {
    pub fn new(channels: [usize; 2], negative_slope: f64, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new(channels, [KERNEL, KERNEL])
            .with_stride([STRIDE, STRIDE])
            .with_padding(PaddingConfig2d::Explicit(PADDING, PADDING))
            .init(device);
        let lrelu = LeakyReluConfig::new()
            .with_negative_slope(negative_slope)
            .init();

        Self { conv, lrelu }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let output = self.conv.forward(input);
        self.lrelu.forward(output)
    }
}

/// Strided 3x3 transposed convolution followed by a leaky ReLU.
///
/// The output is `2h - 1` rows tall, one short of a clean doubling. Callers
/// that need exact doubling must pad the output themselves.
#[derive(Module, Debug)]
pub struct UpBlock<B: Backend> {
    conv: ConvTranspose2d<B>,
    lrelu: LeakyRelu,
}
impl<B: Backend> UpBlock<B> {
    pub fn new(channels: [usize; 2], negative_slope: f64, device: &B::Device) -> Self {
        let conv = ConvTranspose2dConfig::new(channels, [KERNEL, KERNEL])
            .with_stride([STRIDE, STRIDE])
            .with_padding([PADDING, PADDING])
            .init(device);
        let lrelu = LeakyReluConfig::new()
            .with_negative_slope(negative_slope)
            .init();

        Self { conv, lrelu }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let output = self.conv.forward(input);
        self.lrelu.forward(output)
    }
}
