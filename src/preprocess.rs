//! The scalar-to-features expander placed in front of the model.

use serde::{Deserialize, Serialize};

use crate::errors::{GraphError, Result};
use crate::graph::{Graph, GraphBuilder, Node, TensorData, ValueSlot};

/// Shape and naming of an arithmetic-progression expander.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionOptions {
    /// Number of generated features.
    pub width: usize,
    /// Difference between consecutive features.
    pub step: f32,
    pub graph_name: String,
    pub input_name: String,
    pub output_name: String,
    pub opset_version: u32,
}

impl Default for ProgressionOptions {
    fn default() -> Self {
        Self {
            width: 4,
            step: 1.0,
            graph_name: "preprocessor".to_string(),
            input_name: "x".to_string(),
            output_name: "features".to_string(),
            opset_version: 9,
        }
    }
}

impl ProgressionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of generated features.
    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Sets the difference between consecutive features.
    pub fn step(mut self, step: f32) -> Self {
        self.step = step;
        self
    }

    pub fn graph_name(mut self, name: impl Into<String>) -> Self {
        self.graph_name = name.into();
        self
    }

    pub fn input_name(mut self, name: impl Into<String>) -> Self {
        self.input_name = name.into();
        self
    }

    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    pub fn opset_version(mut self, version: u32) -> Self {
        self.opset_version = version;
        self
    }
}

/// Builds a graph mapping a scalar `v` (shape `[1]`) to
/// `[v, v + step, …, v + (width - 1)·step]`.
///
/// The scalar is repeated with `Concat` and a constant offset vector is
/// added to it.
///
/// # Example
///
/// ```
/// use pipegraph::preprocess::{arithmetic_progression, ProgressionOptions};
///
/// let graph = arithmetic_progression(&ProgressionOptions::default()).unwrap();
/// assert_eq!(graph.outputs()[0].shape(), &[4]);
/// ```
pub fn arithmetic_progression(options: &ProgressionOptions) -> Result<Graph> {
    if options.width == 0 {
        return Err(GraphError::validation(
            "an arithmetic progression needs at least one element",
        ));
    }

    let repeated = format!("{}_repeated", options.input_name);
    let offsets_name = format!("{}_offsets", options.output_name);
    let offsets: Vec<f32> = (0..options.width)
        .map(|i| i as f32 * options.step)
        .collect();

    GraphBuilder::new(&options.graph_name)
        .opset(options.opset_version)
        .input(ValueSlot::float(&options.input_name, vec![1]))
        .node(Node::concat(
            "repeat",
            vec![options.input_name.as_str(); options.width],
            0,
            &repeated,
        ))
        .node(Node::constant(
            "offsets",
            TensorData::vector(offsets),
            &offsets_name,
        ))
        .node(Node::add(
            "add_offsets",
            &repeated,
            &offsets_name,
            &options.output_name,
        ))
        .output(ValueSlot::float(&options.output_name, vec![options.width]))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Operator;

    #[test]
    fn test_default_progression_graph() {
        let graph = arithmetic_progression(&ProgressionOptions::default()).unwrap();

        assert_eq!(graph.name(), "preprocessor");
        assert_eq!(graph.opset_version(), 9);
        assert_eq!(graph.inputs()[0].name(), "x");
        assert_eq!(graph.outputs()[0].name(), "features");

        let ops: Vec<&str> = graph.nodes().iter().map(|n| n.op().name()).collect();
        assert_eq!(ops, vec!["Concat", "Constant", "Add"]);
        assert_eq!(graph.nodes()[0].inputs().len(), 4);

        let Operator::Constant { value } = graph.nodes()[1].op() else {
            panic!("expected offsets constant");
        };
        assert_eq!(value.values(), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_custom_step_and_width() {
        let options = ProgressionOptions::new().width(3).step(0.5);
        let graph = arithmetic_progression(&options).unwrap();
        assert_eq!(graph.outputs()[0].shape(), &[3]);

        let Operator::Constant { value } = graph.nodes()[1].op() else {
            panic!("expected offsets constant");
        };
        assert_eq!(value.values(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_zero_width_fails() {
        let err = arithmetic_progression(&ProgressionOptions::new().width(0)).unwrap_err();
        assert!(matches!(err, GraphError::Validation { .. }));
    }
}
