//! Graph evaluation on Burn tensors.

use std::collections::HashMap;
use std::path::Path;

use burn::tensor::{Tensor, backend::Backend};

use crate::errors::{GraphError, Result};
use crate::graph::{ElemType, Graph, Node, Operator, Persistable, TensorData};
use crate::graph::{broadcast_shape, normalize_axis};

/// Something that can evaluate a graph on concrete inputs.
pub trait Executor {
    /// Evaluates `graph`, returning one tensor per declared output.
    ///
    /// `inputs` must hold exactly the graph's declared inputs, with matching
    /// shapes. Either every output is returned or an error is.
    fn run(
        &self,
        graph: &Graph,
        inputs: &HashMap<String, TensorData>,
    ) -> Result<HashMap<String, TensorData>>;

    /// Loads a persisted graph from `path` and evaluates it.
    fn run_persisted(
        &self,
        path: impl AsRef<Path>,
        inputs: &HashMap<String, TensorData>,
    ) -> Result<HashMap<String, TensorData>>
    where
        Self: Sized,
    {
        let graph = Graph::load(path)?;
        self.run(&graph, inputs)
    }
}

/// A slot value during evaluation.
///
/// Tensors are kept as a flat `[1, numel]` matrix and reshaped by each
/// operator into the 2-D view it needs.
#[derive(Debug, Clone)]
struct Value<B: Backend> {
    tensor: Tensor<B, 2>,
    shape: Vec<usize>,
}

impl<B: Backend> Value<B> {
    fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Views the value as `[prod(shape[..split]), prod(shape[split..])]`.
    fn matrix(&self, split: usize) -> Tensor<B, 2> {
        let rows: usize = self.shape[..split].iter().product();
        let cols: usize = self.shape[split..].iter().product();
        self.tensor.clone().reshape([rows, cols])
    }

    fn from_matrix(tensor: Tensor<B, 2>, shape: Vec<usize>) -> Self {
        let numel: usize = shape.iter().product();
        Self {
            tensor: tensor.reshape([1, numel]),
            shape,
        }
    }
}

/// Evaluates graphs with Burn tensors on the backend `B`.
#[derive(Debug, Clone)]
pub struct BurnExecutor<B: Backend> {
    device: B::Device,
}

impl<B: Backend> BurnExecutor<B> {
    /// Creates an executor placing tensors on `device`.
    pub fn new(device: &B::Device) -> Self {
        Self {
            device: device.clone(),
        }
    }

    fn tensor(&self, data: &TensorData) -> Value<B> {
        let tensor =
            Tensor::<B, 1>::from_floats(data.values(), &self.device).reshape([1, data.numel()]);
        Value {
            tensor,
            shape: data.shape().to_vec(),
        }
    }

    fn vector(&self, values: &[f32], rows: usize, cols: usize) -> Tensor<B, 2> {
        Tensor::<B, 1>::from_floats(values, &self.device).reshape([rows, cols])
    }

    fn bind_inputs(
        &self,
        graph: &Graph,
        inputs: &HashMap<String, TensorData>,
    ) -> Result<HashMap<String, Value<B>>> {
        if let Some(unknown) = inputs.keys().find(|name| graph.input(name).is_none()) {
            return Err(GraphError::execution(format!(
                "'{}' is not a declared input of '{}'",
                unknown,
                graph.name()
            )));
        }

        let mut values = HashMap::new();
        for slot in graph.inputs() {
            let Some(data) = inputs.get(slot.name()) else {
                return Err(GraphError::execution(format!(
                    "missing value for input '{}'",
                    slot.name()
                )));
            };
            if slot.elem_type() != ElemType::Float32 {
                return Err(GraphError::execution(format!(
                    "input '{}' has element type {}; only float32 can be executed",
                    slot.name(),
                    slot.elem_type()
                )));
            }
            if data.shape() != slot.shape() {
                return Err(GraphError::execution(format!(
                    "input '{}' expects shape {:?}, got {:?}",
                    slot.name(),
                    slot.shape(),
                    data.shape()
                )));
            }
            values.insert(slot.name().to_string(), self.tensor(data));
        }
        Ok(values)
    }

    fn eval_node(&self, node: &Node, args: Vec<&Value<B>>) -> Result<Value<B>> {
        match node.op() {
            Operator::Constant { value } => Ok(self.tensor(value)),
            Operator::Add => {
                let (lhs, rhs) = (args[0], args[1]);
                let shape = broadcast_shape(&lhs.shape, &rhs.shape).ok_or_else(|| {
                    GraphError::execution(format!("node '{}' cannot broadcast", node.name()))
                })?;
                if lhs.shape == rhs.shape {
                    return Ok(Value {
                        tensor: lhs.tensor.clone().add(rhs.tensor.clone()),
                        shape,
                    });
                }
                // The smaller operand repeats over the rows of the larger one.
                let (big, small) = if lhs.shape == shape { (lhs, rhs) } else { (rhs, lhs) };
                let inner = small.numel();
                if inner == 0 || big.numel() % inner != 0 {
                    return Err(GraphError::execution(format!(
                        "node '{}' cannot broadcast {:?} over {:?}",
                        node.name(),
                        small.shape,
                        big.shape
                    )));
                }
                let rows = big.numel() / inner;
                let result = big
                    .tensor
                    .clone()
                    .reshape([rows, inner])
                    .add(small.tensor.clone().reshape([1, inner]));
                Ok(Value::from_matrix(result, shape))
            }
            Operator::Concat { axis } => {
                let rank = args[0].shape.len();
                let axis = normalize_axis(*axis, rank).ok_or_else(|| {
                    GraphError::execution(format!("node '{}' has an invalid axis", node.name()))
                })?;
                let mut shape = args[0].shape.clone();
                shape[axis] = args.iter().map(|v| v.shape[axis]).sum();
                let parts: Vec<Tensor<B, 2>> = args.iter().map(|v| v.matrix(axis)).collect();
                Ok(Value::from_matrix(Tensor::cat(parts, 1), shape))
            }
            Operator::LinearRegressor {
                coefficients,
                intercepts,
            } => {
                let input = args[0];
                let targets = intercepts.len();
                let width = coefficients.len() / targets;
                let weights = self.vector(coefficients, targets, width).transpose();
                let bias = self.vector(intercepts, 1, targets);
                let result = input
                    .matrix(input.shape.len() - 1)
                    .matmul(weights)
                    .add(bias);

                let mut shape = input.shape[..input.shape.len() - 1].to_vec();
                shape.push(targets);
                Ok(Value::from_matrix(result, shape))
            }
        }
    }
}

impl<B: Backend> Executor for BurnExecutor<B> {
    fn run(
        &self,
        graph: &Graph,
        inputs: &HashMap<String, TensorData>,
    ) -> Result<HashMap<String, TensorData>> {
        let mut slots = graph.inputs().iter().chain(graph.value_info());
        if let Some(slot) = slots.find(|slot| slot.numel() == 0) {
            return Err(GraphError::execution(format!(
                "slot '{}' has no elements",
                slot.name()
            )));
        }
        let mut values = self.bind_inputs(graph, inputs)?;

        for node in graph.nodes() {
            let args = node
                .inputs()
                .iter()
                .map(|name| {
                    values.get(name).ok_or_else(|| {
                        GraphError::execution(format!(
                            "node '{}' reads unbound slot '{}'",
                            node.name(),
                            name
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let result = self.eval_node(node, args)?;
            log::trace!("evaluated node '{}' -> {:?}", node.name(), result.shape);
            values.insert(node.outputs()[0].clone(), result);
        }

        let mut outputs = HashMap::new();
        for slot in graph.outputs() {
            let value = values.remove(slot.name()).ok_or_else(|| {
                GraphError::execution(format!("output '{}' was not computed", slot.name()))
            })?;
            let flat: Vec<f32> = value.tensor.into_data().to_vec().map_err(|err| {
                GraphError::execution(format!(
                    "cannot read output '{}': {:?}",
                    slot.name(),
                    err
                ))
            })?;
            outputs.insert(slot.name().to_string(), TensorData::new(value.shape, flat)?);
        }
        Ok(outputs)
    }
}
