//! Operators and nodes of the computation graph.
//!
//! Uses a closed enum instead of trait objects: the vocabulary is fixed.

use serde::{Deserialize, Serialize};

use crate::errors::{GraphError, Result};

use super::slot::{ElemType, ValueSlot};
use super::tensor::TensorData;

/// The operator vocabulary understood by the builder, normalizer and executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operator {
    /// Literal tensor; no inputs, one output.
    Constant { value: TensorData },
    /// Element-wise addition of two inputs.
    Add,
    /// Concatenation of one or more inputs along `axis`.
    Concat { axis: i64 },
    /// Affine transform `y = x · Wᵀ + b` over the last dimension of `x`.
    ///
    /// `coefficients` holds `targets × width` values, one row per target.
    LinearRegressor {
        coefficients: Vec<f32>,
        intercepts: Vec<f32>,
    },
}

impl Operator {
    /// Returns the operator's type name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Constant { .. } => "Constant",
            Self::Add => "Add",
            Self::Concat { .. } => "Concat",
            Self::LinearRegressor { .. } => "LinearRegressor",
        }
    }

    /// Infers the output slots of a node from its input slots.
    ///
    /// `outputs` are the names the node binds its results to.
    pub fn infer_outputs(
        &self,
        node: &str,
        inputs: &[&ValueSlot],
        outputs: &[String],
    ) -> Result<Vec<ValueSlot>> {
        let arity_err = |expected: &str| {
            GraphError::validation(format!(
                "node '{}' ({}) expects {}, got {} input(s) and {} output(s)",
                node,
                self.name(),
                expected,
                inputs.len(),
                outputs.len()
            ))
        };

        if outputs.len() != 1 {
            return Err(arity_err("exactly one output"));
        }
        let output = &outputs[0];

        match self {
            Self::Constant { value } => {
                if !inputs.is_empty() {
                    return Err(arity_err("no inputs"));
                }
                value.check()?;
                Ok(vec![ValueSlot::float(output, value.shape().to_vec())])
            }
            Self::Add => {
                let [lhs, rhs] = inputs else {
                    return Err(arity_err("two inputs"));
                };
                if lhs.elem_type() != rhs.elem_type() {
                    return Err(GraphError::validation(format!(
                        "node '{}' (Add) mixes {} and {}",
                        node,
                        lhs.elem_type(),
                        rhs.elem_type()
                    )));
                }
                let shape = broadcast_shape(lhs.shape(), rhs.shape()).ok_or_else(|| {
                    GraphError::validation(format!(
                        "node '{}' (Add) cannot broadcast {:?} with {:?}",
                        node,
                        lhs.shape(),
                        rhs.shape()
                    ))
                })?;
                Ok(vec![ValueSlot::new(output, lhs.elem_type(), shape)])
            }
            Self::Concat { axis } => {
                let Some(first) = inputs.first() else {
                    return Err(arity_err("at least one input"));
                };
                let rank = first.shape().len();
                let axis = normalize_axis(*axis, rank).ok_or_else(|| {
                    GraphError::validation(format!(
                        "node '{}' (Concat) axis {} is out of range for rank {}",
                        node, axis, rank
                    ))
                })?;

                let mut shape = first.shape().to_vec();
                for input in &inputs[1..] {
                    if input.elem_type() != first.elem_type() {
                        return Err(GraphError::validation(format!(
                            "node '{}' (Concat) mixes {} and {}",
                            node,
                            first.elem_type(),
                            input.elem_type()
                        )));
                    }
                    let compatible = input.shape().len() == rank
                        && input
                            .shape()
                            .iter()
                            .zip(first.shape())
                            .enumerate()
                            .all(|(dim, (a, b))| dim == axis || a == b);
                    if !compatible {
                        return Err(GraphError::validation(format!(
                            "node '{}' (Concat) cannot join {:?} with {:?} along axis {}",
                            node,
                            first.shape(),
                            input.shape(),
                            axis
                        )));
                    }
                    shape[axis] += input.shape()[axis];
                }
                Ok(vec![ValueSlot::new(output, first.elem_type(), shape)])
            }
            Self::LinearRegressor {
                coefficients,
                intercepts,
            } => {
                let [input] = inputs else {
                    return Err(arity_err("one input"));
                };
                let targets = intercepts.len();
                if targets == 0 || coefficients.len() % targets != 0 {
                    return Err(GraphError::validation(format!(
                        "node '{}' (LinearRegressor) has {} coefficients for {} target(s)",
                        node,
                        coefficients.len(),
                        targets
                    )));
                }
                let width = coefficients.len() / targets;
                let Some((&last, batch)) = input.shape().split_last() else {
                    return Err(GraphError::validation(format!(
                        "node '{}' (LinearRegressor) needs an input of rank >= 1",
                        node
                    )));
                };
                if last != width {
                    return Err(GraphError::validation(format!(
                        "node '{}' (LinearRegressor) expects width {}, input '{}' has {}",
                        node,
                        width,
                        input.name(),
                        last
                    )));
                }
                let mut shape = batch.to_vec();
                shape.push(targets);
                Ok(vec![ValueSlot::new(output, ElemType::Float32, shape)])
            }
        }
    }
}

/// Resolves a possibly negative axis against a rank.
pub(crate) fn normalize_axis(axis: i64, rank: usize) -> Option<usize> {
    let rank = rank as i64;
    let resolved = if axis < 0 { axis + rank } else { axis };
    (0..rank).contains(&resolved).then_some(resolved as usize)
}

/// Broadcast rule for `Add`: equal shapes, a single-element operand, or one
/// shape being a trailing suffix of the other.
pub(crate) fn broadcast_shape(lhs: &[usize], rhs: &[usize]) -> Option<Vec<usize>> {
    let numel = |s: &[usize]| s.iter().product::<usize>();
    if lhs == rhs {
        Some(lhs.to_vec())
    } else if numel(rhs) == 1 && rhs.len() <= lhs.len() {
        Some(lhs.to_vec())
    } else if numel(lhs) == 1 && lhs.len() <= rhs.len() {
        Some(rhs.to_vec())
    } else if lhs.ends_with(rhs) {
        Some(lhs.to_vec())
    } else if rhs.ends_with(lhs) {
        Some(rhs.to_vec())
    } else {
        None
    }
}

/// One operation instance within a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    name: String,
    op: Operator,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl Node {
    /// Creates a node from its parts.
    pub fn new(
        name: impl Into<String>,
        op: Operator,
        inputs: Vec<String>,
        outputs: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            op,
            inputs,
            outputs,
        }
    }

    /// Creates a Constant node binding `value` to `output`.
    pub fn constant(name: impl Into<String>, value: TensorData, output: impl Into<String>) -> Self {
        Self::new(name, Operator::Constant { value }, vec![], vec![output.into()])
    }

    /// Creates an Add node.
    pub fn add(
        name: impl Into<String>,
        lhs: impl Into<String>,
        rhs: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            Operator::Add,
            vec![lhs.into(), rhs.into()],
            vec![output.into()],
        )
    }

    /// Creates a Concat node joining `inputs` along `axis`.
    pub fn concat<S: Into<String>>(
        name: impl Into<String>,
        inputs: impl IntoIterator<Item = S>,
        axis: i64,
        output: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            Operator::Concat { axis },
            inputs.into_iter().map(Into::into).collect(),
            vec![output.into()],
        )
    }

    /// Creates a LinearRegressor node.
    pub fn linear_regressor(
        name: impl Into<String>,
        coefficients: Vec<f32>,
        intercepts: Vec<f32>,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            Operator::LinearRegressor {
                coefficients,
                intercepts,
            },
            vec![input.into()],
            vec![output.into()],
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn op(&self) -> &Operator {
        &self.op
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Returns a copy with every slot name and the node name passed through
    /// `rename`.
    pub(crate) fn map_names(&self, node_name: String, rename: impl Fn(&str) -> String) -> Self {
        Self {
            name: node_name,
            op: self.op.clone(),
            inputs: self.inputs.iter().map(|s| rename(s)).collect(),
            outputs: self.outputs.iter().map(|s| rename(s)).collect(),
        }
    }
}
