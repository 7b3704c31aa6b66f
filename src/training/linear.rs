//! Linear regression as a Burn module.

use burn::{
    module::Module,
    nn::{Linear, LinearConfig},
    tensor::{Tensor, backend::Backend},
};

use crate::errors::{GraphError, Result};
use crate::export::LinearModelParams;

/// A single-output linear layer: `y = x · w + b`.
#[derive(Module, Debug)]
pub struct LinearRegression<B: Backend> {
    linear: Linear<B>,
    /// Number of input features (constant metadata).
    width: usize,
}

impl<B: Backend> LinearRegression<B> {
    /// Creates a freshly initialized model reading `width` features.
    pub fn new(width: usize, device: &B::Device) -> Self {
        Self {
            linear: LinearConfig::new(width, 1).init(device),
            width,
        }
    }

    /// Performs the forward pass: `[rows, width] -> [rows, 1]`.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        self.linear.forward(input)
    }

    /// Returns the number of input features.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Extracts the fitted coefficients and intercept.
    ///
    /// Burn stores the weight as `[width, 1]`, so its flat data is already
    /// the coefficient vector.
    pub fn params(&self) -> Result<LinearModelParams> {
        let coefficients: Vec<f32> = self
            .linear
            .weight
            .val()
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|err| GraphError::training(format!("cannot read weights: {:?}", err)))?;

        let intercept = match &self.linear.bias {
            Some(bias) => {
                let values: Vec<f32> = bias
                    .val()
                    .into_data()
                    .convert::<f32>()
                    .to_vec()
                    .map_err(|err| {
                        GraphError::training(format!("cannot read bias: {:?}", err))
                    })?;
                values.first().copied().unwrap_or(0.0)
            }
            None => 0.0,
        };

        Ok(LinearModelParams::new(coefficients, intercept))
    }
}
