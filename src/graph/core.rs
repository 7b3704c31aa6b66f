//! Graph - an immutable, validated computation.
//!
//! A `Graph` can only be obtained through [`GraphBuilder`](super::GraphBuilder)
//! (directly, or via the exporter, normalizer, composer and decoder, which all
//! funnel through it), so every value of this type satisfies the slot
//! invariants.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::operation::Node;
use super::slot::ValueSlot;

/// A named directed computation tagged with an operator-set version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    name: String,
    opset_version: u32,
    nodes: Vec<Node>,
    inputs: Vec<ValueSlot>,
    outputs: Vec<ValueSlot>,
    /// Inferred slot of every node output, in production order.
    value_info: Vec<ValueSlot>,
}

impl Graph {
    pub(crate) fn from_validated(
        name: String,
        opset_version: u32,
        nodes: Vec<Node>,
        inputs: Vec<ValueSlot>,
        outputs: Vec<ValueSlot>,
        value_info: Vec<ValueSlot>,
    ) -> Self {
        Self {
            name,
            opset_version,
            nodes,
            inputs,
            outputs,
            value_info,
        }
    }

    /// Returns the graph name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the operator-set version the graph is tagged with.
    pub fn opset_version(&self) -> u32 {
        self.opset_version
    }

    /// Returns the nodes in evaluation order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the declared inputs.
    pub fn inputs(&self) -> &[ValueSlot] {
        &self.inputs
    }

    /// Returns the declared outputs.
    pub fn outputs(&self) -> &[ValueSlot] {
        &self.outputs
    }

    /// Returns the inferred slots of all node outputs.
    pub fn value_info(&self) -> &[ValueSlot] {
        &self.value_info
    }

    /// Looks up a declared input by name.
    pub fn input(&self, name: &str) -> Option<&ValueSlot> {
        self.inputs.iter().find(|s| s.name() == name)
    }

    /// Looks up a declared output by name.
    pub fn output(&self, name: &str) -> Option<&ValueSlot> {
        self.outputs.iter().find(|s| s.name() == name)
    }

    /// Looks up any slot (declared input or node output) by name.
    pub fn slot(&self, name: &str) -> Option<&ValueSlot> {
        self.input(name)
            .or_else(|| self.value_info.iter().find(|s| s.name() == name))
    }

    /// Returns every slot name bound in this graph.
    pub fn slot_names(&self) -> BTreeSet<&str> {
        self.inputs
            .iter()
            .chain(&self.value_info)
            .map(ValueSlot::name)
            .collect()
    }

    /// Returns the same graph tagged with another operator-set version.
    pub(crate) fn retagged(&self, opset_version: u32) -> Self {
        Self {
            opset_version,
            ..self.clone()
        }
    }
}
