//! Loss functions for training.

use burn::tensor::{Tensor, backend::Backend};
use serde::{Deserialize, Serialize};

/// Supported loss functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loss {
    /// Mean Squared Error loss.
    #[default]
    Mse,
    /// Mean Absolute Error loss.
    Mae,
}

impl Loss {
    /// Computes the loss between predictions and targets.
    pub fn compute<B: Backend>(
        &self,
        predictions: Tensor<B, 2>,
        targets: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        let diff = predictions - targets;
        match self {
            Loss::Mse => (diff.clone() * diff).mean(),
            Loss::Mae => diff.abs().mean(),
        }
    }
}
