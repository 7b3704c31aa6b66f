//! Running graphs on concrete values.
//!
//! The [`Executor`] trait is the seam between graph construction and
//! evaluation; [`BurnExecutor`] evaluates graphs with Burn tensors on any
//! Burn backend.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//!
//! use burn::backend::NdArray;
//! use burn::tensor::backend::Backend;
//! use pipegraph::graph::{GraphBuilder, Node, TensorData, ValueSlot};
//! use pipegraph::runtime::{BurnExecutor, Executor};
//!
//! let graph = GraphBuilder::new("pair")
//!     .input(ValueSlot::float("x", vec![1]))
//!     .node(Node::concat("concat", ["x", "x"], 0, "y"))
//!     .output(ValueSlot::float("y", vec![2]))
//!     .build()
//!     .unwrap();
//!
//! let device = <NdArray as Backend>::Device::default();
//! let executor = BurnExecutor::<NdArray>::new(&device);
//! let inputs = HashMap::from([("x".to_string(), TensorData::scalar(3.0))]);
//! let outputs = executor.run(&graph, &inputs).unwrap();
//! assert_eq!(outputs["y"].values(), &[3.0, 3.0]);
//! ```

mod executor;

pub use executor::{BurnExecutor, Executor};
