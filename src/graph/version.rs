//! Operator-set versions and the version normalizer.

use crate::errors::{GraphError, Result};

use super::core::Graph;
use super::operation::{Node, Operator};

/// Newest operator-set version this crate knows how to represent.
pub const LATEST_OPSET: u32 = 21;

/// Version assigned to graphs that do not ask for one.
pub const DEFAULT_OPSET: u32 = 15;

/// Checks that `node` keeps its semantics when expressed at `version`.
///
/// `shape_of` resolves the shapes of the node's input slots. Returns the
/// reason it cannot be represented otherwise.
fn representable<'a>(
    node: &Node,
    version: u32,
    shape_of: impl Fn(&str) -> Option<&'a [usize]>,
) -> std::result::Result<(), String> {
    if version == 0 || version > LATEST_OPSET {
        return Err(format!("known versions are 1..={}", LATEST_OPSET));
    }

    match node.op() {
        Operator::Constant { .. } | Operator::LinearRegressor { .. } => Ok(()),
        Operator::Add => {
            let shapes: Vec<Option<&[usize]>> =
                node.inputs().iter().map(|name| shape_of(name.as_str())).collect();
            let broadcasts = shapes.windows(2).any(|pair| pair[0] != pair[1]);
            if broadcasts && version < 7 {
                Err("broadcasting Add requires opset 7".to_string())
            } else {
                Ok(())
            }
        }
        Operator::Concat { axis } => {
            if *axis < 0 && version < 11 {
                Err(format!("negative axis {} requires opset 11", axis))
            } else if *axis != 1 && version < 4 {
                Err(format!("axis {} requires opset 4", axis))
            } else {
                Ok(())
            }
        }
    }
}

/// Fails with [`GraphError::UnsupportedVersion`] when `node` has no valid
/// form at `version`.
pub(crate) fn check_node<'a>(
    node: &Node,
    version: u32,
    shape_of: impl Fn(&str) -> Option<&'a [usize]>,
) -> Result<()> {
    representable(node, version, shape_of).map_err(|reason| GraphError::UnsupportedVersion {
        node: node.name().to_string(),
        operator: node.op().name().to_string(),
        version,
        reason,
    })
}

/// Produces an equivalent graph tagged with `target`.
///
/// Every node is checked for a valid form at the target version first; no
/// node actually changes between the supported versions, so only the tag is
/// rewritten. A graph already at `target` is returned unchanged.
pub fn normalize_version(graph: &Graph, target: u32) -> Result<Graph> {
    for node in graph.nodes() {
        check_node(node, target, |name| graph.slot(name).map(|s| s.shape()))?;
    }

    if graph.opset_version() == target {
        return Ok(graph.clone());
    }

    log::debug!(
        "retagging graph '{}' from opset {} to {}",
        graph.name(),
        graph.opset_version(),
        target
    );
    Ok(graph.retagged(target))
}
