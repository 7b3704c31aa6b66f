//! Graph composition: wiring one graph's outputs into another's inputs.

use std::collections::{BTreeSet, HashMap};

use crate::errors::{GraphError, Result};

use super::builder::GraphBuilder;
use super::core::Graph;
use super::slot::ValueSlot;

/// Ordered (producer output, consumer input) pairs used during composition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IoMap {
    pairs: Vec<(String, String)>,
}

impl IoMap {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pair: `producer` (an upstream output) feeds `consumer` (a
    /// downstream input).
    pub fn pair(mut self, producer: impl Into<String>, consumer: impl Into<String>) -> Self {
        self.pairs.push((producer.into(), consumer.into()));
        self
    }

    /// Returns the pairs in insertion order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<P: Into<String>, C: Into<String>> FromIterator<(P, C)> for IoMap {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(p, c)| (p.into(), c.into()))
                .collect(),
        }
    }
}

/// The result of merging two graphs.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedGraph {
    graph: Graph,
    io_map: IoMap,
}

impl ComposedGraph {
    /// Returns the merged graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Returns the mapping the graphs were joined with.
    pub fn io_map(&self) -> &IoMap {
        &self.io_map
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }
}

/// Graphs that can be chained in front of another graph.
pub trait Composable {
    /// Feeds this graph's outputs into `downstream` according to `io_map`.
    fn compose_with(&self, downstream: &Graph, io_map: &IoMap) -> Result<ComposedGraph>;
}

impl Composable for Graph {
    fn compose_with(&self, downstream: &Graph, io_map: &IoMap) -> Result<ComposedGraph> {
        compose(self, downstream, io_map)
    }
}

impl Composable for ComposedGraph {
    fn compose_with(&self, downstream: &Graph, io_map: &IoMap) -> Result<ComposedGraph> {
        compose(&self.graph, downstream, io_map)
    }
}

/// Picks a name not in `taken`, starting from `prefix/name`.
fn fresh_name(taken: &BTreeSet<String>, prefix: &str, name: &str) -> String {
    let base = format!("{}/{}", prefix, name);
    let mut candidate = base.clone();
    let mut counter = 1;
    while taken.contains(&candidate) {
        candidate = format!("{}_{}", base, counter);
        counter += 1;
    }
    candidate
}

fn check_mapping<'a>(
    upstream: &'a Graph,
    downstream: &'a Graph,
    io_map: &IoMap,
) -> Result<HashMap<&'a str, &'a ValueSlot>> {
    if io_map.is_empty() {
        return Err(GraphError::composition("the output-to-input mapping is empty"));
    }

    let mut consumers: HashMap<&str, &ValueSlot> = HashMap::new();
    for (producer, consumer) in io_map.pairs() {
        let Some(out) = upstream.output(producer) else {
            return Err(GraphError::composition(format!(
                "'{}' is not a declared output of '{}'",
                producer,
                upstream.name()
            )));
        };
        let Some(inp) = downstream.input(consumer) else {
            return Err(GraphError::composition(format!(
                "'{}' is not a declared input of '{}'",
                consumer,
                downstream.name()
            )));
        };
        if !out.same_signature(inp) {
            return Err(GraphError::composition(format!(
                "'{}' produces {}{:?} but '{}' expects {}{:?}",
                producer,
                out.elem_type(),
                out.shape(),
                consumer,
                inp.elem_type(),
                inp.shape()
            )));
        }
        if consumers.insert(inp.name(), out).is_some() {
            return Err(GraphError::composition(format!(
                "input '{}' is mapped more than once",
                consumer
            )));
        }
    }

    if upstream.opset_version() != downstream.opset_version() {
        return Err(GraphError::composition(format!(
            "'{}' uses opset {} but '{}' uses opset {}; normalize the versions first",
            upstream.name(),
            upstream.opset_version(),
            downstream.name(),
            downstream.opset_version()
        )));
    }

    Ok(consumers)
}

/// Merges `upstream` and `downstream` into one graph.
///
/// Every downstream node input naming a mapped consumer is rewired to the
/// corresponding upstream producer. Downstream slot and node names that
/// collide with upstream ones are prefixed with the downstream graph name.
/// Upstream nodes come first, so producers precede consumers; the merged
/// graph is validated again before it is returned.
///
/// Inputs are upstream's inputs followed by any unmapped downstream inputs;
/// outputs are downstream's outputs.
pub fn compose(upstream: &Graph, downstream: &Graph, io_map: &IoMap) -> Result<ComposedGraph> {
    let consumers = check_mapping(upstream, downstream, io_map)?;

    let prefix = if downstream.name().is_empty() {
        "downstream"
    } else {
        downstream.name()
    };

    let mut taken: BTreeSet<String> = upstream
        .slot_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut renames: HashMap<String, String> = HashMap::new();
    for (producer, consumer) in io_map.pairs() {
        renames.insert(consumer.clone(), producer.clone());
    }
    for name in downstream.slot_names() {
        if consumers.contains_key(name) {
            continue;
        }
        let resolved = if taken.contains(name) {
            let fresh = fresh_name(&taken, prefix, name);
            log::debug!("renaming slot '{}' of '{}' to '{}'", name, prefix, fresh);
            fresh
        } else {
            name.to_string()
        };
        taken.insert(resolved.clone());
        renames.insert(name.to_string(), resolved);
    }
    let rename = |name: &str| {
        renames
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    };

    let mut node_names: BTreeSet<String> = upstream
        .nodes()
        .iter()
        .map(|n| n.name().to_string())
        .collect();
    let mut nodes = upstream.nodes().to_vec();
    for node in downstream.nodes() {
        let name = if !node.name().is_empty() && node_names.contains(node.name()) {
            fresh_name(&node_names, prefix, node.name())
        } else {
            node.name().to_string()
        };
        node_names.insert(name.clone());
        nodes.push(node.map_names(name, &rename));
    }

    let extra_inputs: Vec<ValueSlot> = downstream
        .inputs()
        .iter()
        .filter(|slot| !consumers.contains_key(slot.name()))
        .map(|slot| slot.renamed(rename(slot.name())))
        .collect();

    let mut builder = GraphBuilder::new(format!("{}+{}", upstream.name(), downstream.name()))
        .opset(upstream.opset_version())
        .nodes(nodes);
    for slot in upstream.inputs().iter().cloned().chain(extra_inputs) {
        builder = builder.input(slot);
    }
    for slot in downstream.outputs() {
        builder = builder.output(slot.renamed(rename(slot.name())));
    }

    let graph = builder.build().map_err(|err| {
        GraphError::composition(format!("merged graph failed validation: {}", err))
    })?;

    log::debug!(
        "composed '{}' with {} mapped slot(s) into {} node(s)",
        graph.name(),
        io_map.pairs().len(),
        graph.nodes().len()
    );

    Ok(ComposedGraph {
        graph,
        io_map: io_map.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ElemType, Node, TensorData};

    fn doubler(name: &str, input: &str, output: &str) -> Graph {
        GraphBuilder::new(name)
            .input(ValueSlot::float(input, vec![1]))
            .node(Node::concat("concat", [input, input], 0, output))
            .output(ValueSlot::float(output, vec![2]))
            .build()
            .unwrap()
    }

    fn summer(name: &str, input: &str, output: &str) -> Graph {
        GraphBuilder::new(name)
            .input(ValueSlot::float(input, vec![2]))
            .node(Node::linear_regressor("sum", vec![1.0, 1.0], vec![0.0], input, output))
            .output(ValueSlot::float(output, vec![1]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_compose_rewires_consumer() {
        let up = doubler("up", "x", "pair");
        let down = summer("down", "features", "y");
        let composed = up
            .compose_with(&down, &IoMap::new().pair("pair", "features"))
            .unwrap();

        let graph = composed.graph();
        assert_eq!(graph.inputs(), up.inputs());
        assert_eq!(graph.outputs(), down.outputs());
        assert_eq!(graph.nodes().len(), 2);
        assert_eq!(graph.nodes()[1].inputs(), &["pair".to_string()]);
        assert!(graph.slot("features").is_none());
        assert_eq!(composed.io_map().pairs().len(), 1);
    }

    #[test]
    fn test_upstream_nodes_precede_downstream() {
        let up = doubler("up", "x", "pair");
        let down = summer("down", "features", "y");
        let graph = compose(&up, &down, &IoMap::new().pair("pair", "features"))
            .unwrap()
            .into_graph();
        assert_eq!(graph.nodes()[0].op().name(), "Concat");
        assert_eq!(graph.nodes()[1].op().name(), "LinearRegressor");
    }

    #[test]
    fn test_colliding_names_are_prefixed() {
        let up = doubler("up", "x", "y");
        let down = GraphBuilder::new("down")
            .input(ValueSlot::float("z", vec![2]))
            .node(Node::constant("concat", TensorData::vector(vec![1.0, 1.0]), "x"))
            .node(Node::add("add", "z", "x", "y"))
            .output(ValueSlot::float("y", vec![2]))
            .build()
            .unwrap();

        let graph = compose(&up, &down, &IoMap::new().pair("y", "z"))
            .unwrap()
            .into_graph();

        let names: Vec<&str> = graph.nodes().iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["concat", "down/concat", "add"]);
        assert_eq!(graph.outputs()[0].name(), "down/y");
        assert_eq!(
            graph.nodes()[2].inputs(),
            &["y".to_string(), "down/x".to_string()]
        );
    }

    #[test]
    fn test_unknown_producer_fails() {
        let up = doubler("up", "x", "pair");
        let down = summer("down", "features", "y");
        let err = compose(&up, &down, &IoMap::new().pair("nope", "features")).unwrap_err();
        assert!(matches!(err, GraphError::Composition { .. }));
    }

    #[test]
    fn test_unknown_consumer_fails() {
        let up = doubler("up", "x", "pair");
        let down = summer("down", "features", "y");
        let err = compose(&up, &down, &IoMap::new().pair("pair", "nope")).unwrap_err();
        assert!(matches!(err, GraphError::Composition { .. }));
    }

    #[test]
    fn test_width_mismatch_fails() {
        let up = doubler("up", "x", "pair");
        let down = GraphBuilder::new("down")
            .input(ValueSlot::float("features", vec![3]))
            .node(Node::linear_regressor(
                "sum",
                vec![1.0, 1.0, 1.0],
                vec![0.0],
                "features",
                "y",
            ))
            .output(ValueSlot::float("y", vec![1]))
            .build()
            .unwrap();
        let err = compose(&up, &down, &IoMap::new().pair("pair", "features")).unwrap_err();
        assert!(matches!(err, GraphError::Composition { .. }));
    }

    #[test]
    fn test_element_type_mismatch_fails() {
        let up = doubler("up", "x", "pair");
        let down = GraphBuilder::new("down")
            .input(ValueSlot::new("features", ElemType::Float64, vec![2]))
            .node(Node::linear_regressor("sum", vec![1.0, 1.0], vec![0.0], "features", "y"))
            .output(ValueSlot::float("y", vec![1]))
            .build()
            .unwrap();
        let err = compose(&up, &down, &IoMap::new().pair("pair", "features")).unwrap_err();
        assert!(err.to_string().contains("float64"));
    }

    #[test]
    fn test_version_mismatch_fails() {
        let up = doubler("up", "x", "pair");
        let down = GraphBuilder::new("down")
            .opset(9)
            .input(ValueSlot::float("features", vec![2]))
            .node(Node::linear_regressor("sum", vec![1.0, 1.0], vec![0.0], "features", "y"))
            .output(ValueSlot::float("y", vec![1]))
            .build()
            .unwrap();
        let err = compose(&up, &down, &IoMap::new().pair("pair", "features")).unwrap_err();
        assert!(err.to_string().contains("normalize"));
    }

    #[test]
    fn test_empty_and_duplicate_mappings_fail() {
        let up = doubler("up", "x", "pair");
        let down = summer("down", "features", "y");
        assert!(compose(&up, &down, &IoMap::new()).is_err());

        let twice: IoMap = [("pair", "features"), ("pair", "features")]
            .into_iter()
            .collect();
        assert!(matches!(
            compose(&up, &down, &twice),
            Err(GraphError::Composition { .. })
        ));
    }

    #[test]
    fn test_unmapped_downstream_inputs_are_kept() {
        let up = doubler("up", "x", "pair");
        let down = GraphBuilder::new("down")
            .input(ValueSlot::float("features", vec![2]))
            .input(ValueSlot::float("bias", vec![2]))
            .node(Node::add("add", "features", "bias", "y"))
            .output(ValueSlot::float("y", vec![2]))
            .build()
            .unwrap();
        let graph = compose(&up, &down, &IoMap::new().pair("pair", "features"))
            .unwrap()
            .into_graph();
        let inputs: Vec<&str> = graph.inputs().iter().map(|s| s.name()).collect();
        assert_eq!(inputs, vec!["x", "bias"]);
    }
}
