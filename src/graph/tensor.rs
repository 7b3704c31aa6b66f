//! Dense tensor payloads for constants and executor inputs/outputs.

use serde::{Deserialize, Serialize};

use crate::errors::{GraphError, Result};

/// Row-major float32 values with a static shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorData {
    shape: Vec<usize>,
    values: Vec<f32>,
}

impl TensorData {
    /// Creates a tensor, checking that the value count matches the shape.
    pub fn new(shape: Vec<usize>, values: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(GraphError::validation(format!(
                "tensor of shape {:?} needs {} values, got {}",
                shape,
                expected,
                values.len()
            )));
        }
        Ok(Self { shape, values })
    }

    /// Creates a rank-1 tensor from a vector.
    pub fn vector(values: Vec<f32>) -> Self {
        Self {
            shape: vec![values.len()],
            values,
        }
    }

    /// Creates a single-element tensor of shape `[1]`.
    pub fn scalar(value: f32) -> Self {
        Self::vector(vec![value])
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    pub fn numel(&self) -> usize {
        self.values.len()
    }

    /// Checks that the stored values still agree with the shape.
    ///
    /// Tensors decoded from bytes bypass [`TensorData::new`].
    pub(crate) fn check(&self) -> Result<()> {
        let expected: usize = self.shape.iter().product();
        if expected != self.values.len() {
            return Err(GraphError::validation(format!(
                "tensor of shape {:?} holds {} values",
                self.shape,
                self.values.len()
            )));
        }
        Ok(())
    }
}
