//! The end-to-end flow: train, export, expand, normalize, compose, persist
//! and verify.
//!
//! Every stage is an explicit function over immutable values, so stages can
//! also be run one at a time.

use std::collections::HashMap;
use std::path::PathBuf;

use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::errors::{GraphError, Result};
use crate::export::{ExportOptions, LinearModelParams, export_linear_model};
use crate::graph::{ComposedGraph, Graph, IoMap, Persistable, TensorData, compose, normalize_version};
use crate::preprocess::{ProgressionOptions, arithmetic_progression};
use crate::runtime::{BurnExecutor, Executor};
use crate::training::{TrainingConfig, fit_linear_regression};

/// Configuration of a full pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub training: TrainingConfig,
    pub progression: ProgressionOptions,
    pub export: ExportOptions,
    /// Where to persist the merged graph, if anywhere.
    pub artifact_path: Option<PathBuf>,
    /// Scalars the merged graph is checked on after it is built.
    pub probe_values: Vec<f32>,
    /// Largest accepted difference between the graph and the fitted model.
    pub tolerance: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            training: TrainingConfig::default(),
            progression: ProgressionOptions::default(),
            export: ExportOptions::default(),
            artifact_path: None,
            probe_values: vec![2.0],
            tolerance: 1e-4,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn training(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    pub fn progression(mut self, progression: ProgressionOptions) -> Self {
        self.progression = progression;
        self
    }

    pub fn export(mut self, export: ExportOptions) -> Self {
        self.export = export;
        self
    }

    /// Persists the merged graph to `path`.
    pub fn artifact_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_path = Some(path.into());
        self
    }

    pub fn probe_values(mut self, values: Vec<f32>) -> Self {
        self.probe_values = values;
        self
    }

    pub fn tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Everything a pipeline run produces.
#[derive(Debug, Clone)]
pub struct PipelineArtifacts {
    pub params: LinearModelParams,
    /// The exported model graph.
    pub model: Graph,
    /// The expander graph, already at the model's opset version.
    pub preprocessor: Graph,
    pub composed: ComposedGraph,
}

/// Builds the model, expander and merged graphs from fitted parameters.
pub fn build_pipeline(
    params: &LinearModelParams,
    config: &PipelineConfig,
) -> Result<PipelineArtifacts> {
    let model = export_linear_model(params, &config.export)?;
    let preprocessor = arithmetic_progression(&config.progression)?;
    let preprocessor = normalize_version(&preprocessor, model.opset_version())?;

    let io_map = IoMap::new().pair(
        config.progression.output_name.as_str(),
        config.export.input_name.as_str(),
    );
    let composed = compose(&preprocessor, &model, &io_map)?;

    log::info!(
        "merged '{}' into '{}' ({} nodes, opset {})",
        preprocessor.name(),
        model.name(),
        composed.graph().nodes().len(),
        composed.graph().opset_version()
    );

    Ok(PipelineArtifacts {
        params: params.clone(),
        model,
        preprocessor,
        composed,
    })
}

/// Evaluates a graph with one `[1]`-shaped input on a single scalar and
/// returns the values of its only output.
pub fn evaluate_scalar(executor: &impl Executor, graph: &Graph, value: f32) -> Result<Vec<f32>> {
    let ([input], [output]) = (graph.inputs(), graph.outputs()) else {
        return Err(GraphError::execution(format!(
            "'{}' must have exactly one input and one output",
            graph.name()
        )));
    };
    let inputs = HashMap::from([(input.name().to_string(), TensorData::scalar(value))]);
    let mut outputs = executor.run(graph, &inputs)?;
    outputs
        .remove(output.name())
        .map(TensorData::into_values)
        .ok_or_else(|| GraphError::execution(format!("output '{}' missing", output.name())))
}

/// Checks that the merged graph agrees with the fitted model applied to the
/// expanded features, for every probe value.
pub fn verify_pipeline(
    executor: &impl Executor,
    artifacts: &PipelineArtifacts,
    config: &PipelineConfig,
) -> Result<()> {
    let step = config.progression.step;
    for &value in &config.probe_values {
        let features: Vec<f32> = (0..config.progression.width)
            .map(|i| value + i as f32 * step)
            .collect();
        let expected = artifacts.params.predict(&features);
        let actual = evaluate_scalar(executor, artifacts.composed.graph(), value)?;

        let close = matches!(actual.as_slice(), [got] if (got - expected).abs() <= config.tolerance);
        if !close {
            return Err(GraphError::execution(format!(
                "merged graph returned {:?} for {}, expected {}",
                actual, value, expected
            )));
        }
        log::debug!("probe {} -> {}", value, expected);
    }
    Ok(())
}

/// Runs the whole flow on training data.
///
/// When an artifact path is configured, the merged graph is saved and loaded
/// back, and the reload must encode to the same bytes as what was saved.
pub fn run_pipeline<B: AutodiffBackend>(
    config: &PipelineConfig,
    features: &[Vec<f32>],
    targets: &[f32],
    device: &B::Device,
) -> Result<PipelineArtifacts> {
    log::info!("fitting linear model on {} rows", features.len());
    let trained = fit_linear_regression::<B>(features, targets, &config.training, device)?;
    log::info!(
        "fitted coefficients {:?}, intercept {}",
        trained.params.coefficients,
        trained.params.intercept
    );

    let artifacts = build_pipeline(&trained.params, config)?;

    if let Some(path) = &config.artifact_path {
        let graph = artifacts.composed.graph();
        graph.save(path)?;
        let reloaded = Graph::load(path)?;
        if reloaded.to_bytes()? != graph.to_bytes()? {
            return Err(GraphError::validation(format!(
                "graph reloaded from {} differs from the one saved",
                path.display()
            )));
        }
        log::info!("saved merged graph to {}", path.display());
    }

    let executor = BurnExecutor::<B::InnerBackend>::new(device);
    verify_pipeline(&executor, &artifacts, config)?;

    Ok(artifacts)
}
