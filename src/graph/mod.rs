//! Graph construction, versioning, composition and persistence.
//!
//! # Example
//!
//! ```
//! use pipegraph::graph::{normalize_version, GraphBuilder, IoMap, Node, Composable, TensorData, ValueSlot};
//!
//! // Expand a scalar into [x, x + 1]
//! let expand = GraphBuilder::new("expand")
//!     .opset(9)
//!     .input(ValueSlot::float("x", vec![1]))
//!     .node(Node::concat("concat", ["x", "x"], 0, "xx"))
//!     .node(Node::constant("offsets", TensorData::vector(vec![0.0, 1.0]), "k"))
//!     .node(Node::add("add", "xx", "k", "features"))
//!     .output(ValueSlot::float("features", vec![2]))
//!     .build()
//!     .unwrap();
//!
//! // A model reading two features
//! let model = GraphBuilder::new("model")
//!     .opset(15)
//!     .input(ValueSlot::float("input", vec![2]))
//!     .node(Node::linear_regressor("lr", vec![0.5, 0.5], vec![1.0], "input", "y"))
//!     .output(ValueSlot::float("y", vec![1]))
//!     .build()
//!     .unwrap();
//!
//! let expand = normalize_version(&expand, model.opset_version()).unwrap();
//! let merged = expand
//!     .compose_with(&model, &IoMap::new().pair("features", "input"))
//!     .unwrap();
//! assert_eq!(merged.graph().nodes().len(), 4);
//! ```

mod builder;
mod compose;
mod core;
mod operation;
mod persist;
mod slot;
mod tensor;
mod version;

pub use builder::GraphBuilder;
pub use compose::{Composable, ComposedGraph, IoMap, compose};
pub use core::Graph;
pub use operation::{Node, Operator};
pub use persist::{FORMAT_VERSION, MAGIC, Persistable};
pub use slot::{ElemType, ValueSlot};
pub use tensor::TensorData;
pub use version::{DEFAULT_OPSET, LATEST_OPSET, normalize_version};

pub(crate) use operation::{broadcast_shape, normalize_axis};
