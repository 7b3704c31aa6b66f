//! GraphBuilder - declarative construction and validation of graphs.

use std::collections::{HashMap, HashSet};

use crate::errors::{GraphError, Result};

use super::core::Graph;
use super::operation::Node;
use super::slot::ValueSlot;
use super::version::{DEFAULT_OPSET, LATEST_OPSET, check_node};

/// Collects node specifications and declared inputs/outputs, then validates
/// them into a [`Graph`].
///
/// # Example
///
/// ```
/// use pipegraph::graph::{GraphBuilder, Node, TensorData, ValueSlot};
///
/// let graph = GraphBuilder::new("shift")
///     .input(ValueSlot::float("x", vec![2]))
///     .node(Node::constant("offsets", TensorData::vector(vec![1.0, 2.0]), "k"))
///     .node(Node::add("add", "x", "k", "y"))
///     .output(ValueSlot::float("y", vec![2]))
///     .build()
///     .unwrap();
/// assert_eq!(graph.nodes().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    name: String,
    opset_version: u32,
    inputs: Vec<ValueSlot>,
    nodes: Vec<Node>,
    outputs: Vec<ValueSlot>,
}

impl GraphBuilder {
    /// Starts a graph with the given name at [`DEFAULT_OPSET`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            opset_version: DEFAULT_OPSET,
            inputs: Vec::new(),
            nodes: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Sets the operator-set version.
    pub fn opset(mut self, version: u32) -> Self {
        self.opset_version = version;
        self
    }

    /// Declares a graph input.
    pub fn input(mut self, slot: ValueSlot) -> Self {
        self.inputs.push(slot);
        self
    }

    /// Appends a node; nodes are evaluated in the order they are added.
    pub fn node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Appends several nodes.
    pub fn nodes(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    /// Declares a graph output.
    pub fn output(mut self, slot: ValueSlot) -> Self {
        self.outputs.push(slot);
        self
    }

    /// Validates the collected specification and produces the graph.
    ///
    /// Nodes are processed in declaration order against a growing set of
    /// defined slots, seeded with the declared inputs. Each node's inputs
    /// must already be defined and its outputs must be fresh names.
    pub fn build(self) -> Result<Graph> {
        if !(1..=LATEST_OPSET).contains(&self.opset_version) {
            return Err(GraphError::validation(format!(
                "opset {} is outside the known versions 1..={}",
                self.opset_version, LATEST_OPSET
            )));
        }

        let mut defined: HashMap<String, ValueSlot> = HashMap::new();
        for input in &self.inputs {
            reject_empty(input)?;
            if defined
                .insert(input.name().to_string(), input.clone())
                .is_some()
            {
                return Err(GraphError::validation(format!(
                    "input '{}' is declared more than once",
                    input.name()
                )));
            }
        }

        let mut node_names = HashSet::new();
        let mut value_info: Vec<ValueSlot> = Vec::with_capacity(self.nodes.len());

        for node in &self.nodes {
            if !node.name().is_empty() && !node_names.insert(node.name()) {
                return Err(GraphError::validation(format!(
                    "node name '{}' is used more than once",
                    node.name()
                )));
            }

            let inputs = node
                .inputs()
                .iter()
                .map(|name| {
                    defined.get(name).ok_or_else(|| {
                        GraphError::validation(format!(
                            "node '{}' references slot '{}' before it is defined",
                            node.name(),
                            name
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let produced = node
                .op()
                .infer_outputs(node.name(), &inputs, node.outputs())?;
            check_node(node, self.opset_version, |name| {
                defined.get(name).map(|s| s.shape())
            })?;

            for slot in produced {
                reject_empty(&slot)?;
                if defined.contains_key(slot.name()) {
                    return Err(GraphError::validation(format!(
                        "node '{}' redefines slot '{}'",
                        node.name(),
                        slot.name()
                    )));
                }
                defined.insert(slot.name().to_string(), slot.clone());
                value_info.push(slot);
            }
        }

        let mut declared = HashSet::new();
        for output in &self.outputs {
            if !declared.insert(output.name()) {
                return Err(GraphError::validation(format!(
                    "output '{}' is declared more than once",
                    output.name()
                )));
            }
            let Some(produced) = value_info.iter().find(|s| s.name() == output.name()) else {
                return Err(GraphError::validation(format!(
                    "output '{}' is never produced by any node",
                    output.name()
                )));
            };
            if !produced.same_signature(output) {
                return Err(GraphError::validation(format!(
                    "output '{}' is declared as {} but produced as {}",
                    output.name(),
                    output,
                    produced
                )));
            }
        }

        log::debug!(
            "built graph '{}' (opset {}): {} node(s), {} input(s), {} output(s)",
            self.name,
            self.opset_version,
            self.nodes.len(),
            self.inputs.len(),
            self.outputs.len()
        );

        Ok(Graph::from_validated(
            self.name,
            self.opset_version,
            self.nodes,
            self.inputs,
            self.outputs,
            value_info,
        ))
    }
}

/// Zero-extent dimensions have no executable form.
fn reject_empty(slot: &ValueSlot) -> Result<()> {
    if slot.numel() == 0 {
        return Err(GraphError::validation(format!(
            "slot {} has an empty dimension",
            slot
        )));
    }
    Ok(())
}
