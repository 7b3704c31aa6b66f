//! Exporting trained linear-model parameters as a graph.

use serde::{Deserialize, Serialize};

use crate::errors::{GraphError, Result};
use crate::graph::{DEFAULT_OPSET, Graph, GraphBuilder, Node, ValueSlot};

/// Parameters of a fitted linear regression: `y = coefficients · x + intercept`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModelParams {
    pub coefficients: Vec<f32>,
    pub intercept: f32,
}

impl LinearModelParams {
    pub fn new(coefficients: Vec<f32>, intercept: f32) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }

    /// Number of input features the model reads.
    pub fn width(&self) -> usize {
        self.coefficients.len()
    }

    /// Evaluates the model on one feature row.
    pub fn predict(&self, features: &[f32]) -> f32 {
        self.coefficients
            .iter()
            .zip(features)
            .map(|(c, x)| c * x)
            .sum::<f32>()
            + self.intercept
    }
}

/// Naming and signature of an exported model graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub graph_name: String,
    pub input_name: String,
    pub output_name: String,
    /// Declared input shape; defaults to `[K]` for `K` coefficients.
    pub input_shape: Option<Vec<usize>>,
    pub opset_version: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            graph_name: "linear_model".to_string(),
            input_name: "features".to_string(),
            output_name: "prediction".to_string(),
            input_shape: None,
            opset_version: DEFAULT_OPSET,
        }
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the graph name.
    pub fn graph_name(mut self, name: impl Into<String>) -> Self {
        self.graph_name = name.into();
        self
    }

    /// Sets the name of the feature input.
    pub fn input_name(mut self, name: impl Into<String>) -> Self {
        self.input_name = name.into();
        self
    }

    /// Sets the name of the prediction output.
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    /// Declares the input shape; its last dimension is the feature width.
    pub fn input_shape(mut self, shape: Vec<usize>) -> Self {
        self.input_shape = Some(shape);
        self
    }

    /// Sets the operator-set version.
    pub fn opset_version(mut self, version: u32) -> Self {
        self.opset_version = version;
        self
    }
}

/// Builds a graph computing `dot(coefficients, input) + intercept`.
///
/// Fails with a validation error when the number of coefficients differs
/// from the width of the declared input.
pub fn export_linear_model(params: &LinearModelParams, options: &ExportOptions) -> Result<Graph> {
    if params.coefficients.is_empty() {
        return Err(GraphError::validation("linear model has no coefficients"));
    }

    let input_shape = options
        .input_shape
        .clone()
        .unwrap_or_else(|| vec![params.width()]);
    let Some((&width, batch)) = input_shape.split_last() else {
        return Err(GraphError::validation("model input must have rank >= 1"));
    };
    if width != params.width() {
        return Err(GraphError::validation(format!(
            "{} coefficients do not match input '{}' of width {}",
            params.width(),
            options.input_name,
            width
        )));
    }

    let mut output_shape = batch.to_vec();
    output_shape.push(1);

    GraphBuilder::new(&options.graph_name)
        .opset(options.opset_version)
        .input(ValueSlot::float(&options.input_name, input_shape.clone()))
        .node(Node::linear_regressor(
            "linear_regressor",
            params.coefficients.clone(),
            vec![params.intercept],
            &options.input_name,
            &options.output_name,
        ))
        .output(ValueSlot::float(&options.output_name, output_shape))
        .build()
}
