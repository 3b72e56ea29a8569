pub mod error;
pub mod model;
pub mod shape;

use crate::{
    error::ShapeError,
    model::{Model, ModelConfig, Network as NetworkKind, IN_CHANNELS},
};
use burn::{
    backend::NdArray,
    tensor::{Device, Tensor, TensorData},
};
use tracing::debug;
use wasm_bindgen::prelude::*;

type MyBackend = NdArray<f32>;

/// Network selector exposed to JavaScript.
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Generator,
    Discriminator,
    Depth,
}

impl From<Network> for NetworkKind {
    fn from(network: Network) -> Self {
        match network {
            Network::Generator => NetworkKind::Generator,
            Network::Discriminator => NetworkKind::Discriminator,
            Network::Depth => NetworkKind::Depth,
        }
    }
}

#[wasm_bindgen]
pub struct Networks {
    config: ModelConfig,
    model: Model<MyBackend>,
    device: Device<MyBackend>,
}

#[wasm_bindgen]
impl Networks {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        let device = Default::default();
        let config = ModelConfig::new();
        let model = config.init(&device);

        Self {
            config,
            model,
            device,
        }
    }

    /// Runs `values`, laid out as `[batch, 3, height, width]`, through the
    /// selected network and returns the flattened output.
    #[wasm_bindgen]
    pub fn forward(
        &self,
        network: Network,
        values: Vec<f32>,
        batch: usize,
        height: usize,
        width: usize,
    ) -> Result<Vec<f32>, JsValue> {
        self.run(network.into(), values, [batch, IN_CHANNELS, height, width])
            .map_err(to_js)
    }

    /// Output shape the selected network produces for a `[batch, 3, height,
    /// width]` input.
    #[wasm_bindgen(js_name = outputShape)]
    pub fn output_shape(
        &self,
        network: Network,
        batch: usize,
        height: usize,
        width: usize,
    ) -> Result<Vec<u32>, JsValue> {
        let dims = self
            .config
            .output_shape(network.into(), [batch, IN_CHANNELS, height, width])
            .map_err(to_js)?;

        dims_to_u32(dims).map_err(to_js)
    }

    #[wasm_bindgen(js_name = numParams)]
    pub fn num_params(&self, network: Network) -> usize {
        self.model.num_params_of(network.into())
    }
}

impl Default for Networks {
    fn default() -> Self {
        Self::new()
    }
}

impl Networks {
    fn run(
        &self,
        network: NetworkKind,
        values: Vec<f32>,
        dims: [usize; 4],
    ) -> Result<Vec<f32>, ShapeError> {
        shape::check_buffer(values.len(), dims)?;
        let output_dims = self.config.output_shape(network, dims)?;
        debug!(%network, ?dims, ?output_dims, "running forward pass");

        let input = Tensor::<MyBackend, 4>::from_data(TensorData::new(values, dims), &self.device);
        let output = self.model.forward(network, input);

        output
            .into_data()
            .to_vec::<f32>()
            .map_err(|err| ShapeError::Data(format!("{err:?}")))
    }
}

fn dims_to_u32(dims: [usize; 4]) -> Result<Vec<u32>, ShapeError> {
    dims.iter()
        .map(|&dim| u32::try_from(dim).map_err(|_| ShapeError::Overflow { dims }))
        .collect()
}

fn to_js(err: ShapeError) -> JsValue {
    JsValue::from_str(&err.to_string())
}
