//! # pipegraph
//!
//! A Rust library for building small computational graphs, exporting a
//! trained linear model into the same graph format, and chaining graphs into
//! a single inference artifact.
//!
//! ## Features
//!
//! - **Validated graphs**: nodes, typed value slots and declared
//!   inputs/outputs are checked eagerly by [`graph::GraphBuilder`].
//! - **Versioning**: [`graph::normalize_version`] aligns operator-set versions
//!   before composition.
//! - **Composition**: [`graph::compose`] wires one graph's outputs into
//!   another's inputs.
//! - **Persistence**: a versioned binary encoding that round-trips byte for
//!   byte.
//! - **Burn Backend**: training and execution run on Burn tensors.
//!
//! ## Example
//!
//! ```
//! use std::collections::HashMap;
//!
//! use burn::backend::NdArray;
//! use pipegraph::prelude::*;
//!
//! let device = <NdArray as burn::tensor::backend::Backend>::Device::default();
//!
//! let params = LinearModelParams::new(vec![1.0, 2.0, 3.0, 4.0], 0.5);
//! let artifacts = build_pipeline(&params, &PipelineConfig::default()).unwrap();
//!
//! let executor = BurnExecutor::<NdArray>::new(&device);
//! let inputs = HashMap::from([("x".to_string(), TensorData::scalar(2.0))]);
//! let outputs = executor.run(artifacts.composed.graph(), &inputs).unwrap();
//!
//! // 1*2 + 2*3 + 3*4 + 4*5 + 0.5
//! assert_eq!(outputs["prediction"].values(), &[40.5]);
//! ```

pub mod errors;
pub mod export;
pub mod graph;
pub mod pipeline;
pub mod preprocess;
pub mod runtime;
pub mod training;

// Re-exports for convenience
pub use errors::{GraphError, Result};
pub use graph::{ComposedGraph, Graph, GraphBuilder};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::errors::{GraphError, Result};
    pub use crate::export::{ExportOptions, LinearModelParams, export_linear_model};
    pub use crate::graph::{
        Composable, ComposedGraph, ElemType, Graph, GraphBuilder, IoMap, Node, Operator,
        Persistable, TensorData, ValueSlot, compose, normalize_version,
    };
    pub use crate::pipeline::{
        PipelineArtifacts, PipelineConfig, build_pipeline, evaluate_scalar, run_pipeline,
        verify_pipeline,
    };
    pub use crate::preprocess::{ProgressionOptions, arithmetic_progression};
    pub use crate::runtime::{BurnExecutor, Executor};
    pub use crate::training::{Loss, TrainingConfig, fit_linear_regression};
}
