//! Integration tests covering the full flow: graphs built, exported,
//! normalized, merged, persisted and executed through the public API.

use std::collections::HashMap;

use burn::backend::{Autodiff, NdArray};
use burn::tensor::backend::Backend;
use pipegraph::export::{ExportOptions, LinearModelParams, export_linear_model};
use pipegraph::graph::{
    Composable, Graph, GraphBuilder, IoMap, Node, Persistable, TensorData, ValueSlot, compose,
    normalize_version,
};
use pipegraph::pipeline::{PipelineConfig, build_pipeline, evaluate_scalar, run_pipeline};
use pipegraph::preprocess::{ProgressionOptions, arithmetic_progression};
use pipegraph::runtime::{BurnExecutor, Executor};
use pipegraph::training::TrainingConfig;
use pipegraph::GraphError;

type TestBackend = NdArray;
type TrainingBackend = Autodiff<NdArray>;

const TOLERANCE: f32 = 1e-4;

fn floats_close(a: f32, b: f32, tolerance: f32) -> bool {
    (a - b).abs() < tolerance
}

fn executor() -> BurnExecutor<TestBackend> {
    let device = <TestBackend as Backend>::Device::default();
    BurnExecutor::new(&device)
}

fn expander() -> Graph {
    arithmetic_progression(&ProgressionOptions::default()).expect("expander should build")
}

fn model(coefficients: Vec<f32>, intercept: f32) -> Graph {
    export_linear_model(
        &LinearModelParams::new(coefficients, intercept),
        &ExportOptions::default(),
    )
    .expect("export should succeed")
}

fn merged(coefficients: Vec<f32>, intercept: f32) -> Graph {
    let model = model(coefficients, intercept);
    let expander = normalize_version(&expander(), model.opset_version()).unwrap();
    expander
        .compose_with(&model, &IoMap::new().pair("features", "features"))
        .expect("composition should succeed")
        .into_graph()
}

#[test]
fn test_progression_expands_scalar() {
    let outputs = evaluate_scalar(&executor(), &expander(), 2.0).unwrap();
    assert_eq!(outputs, vec![2.0, 3.0, 4.0, 5.0]);

    let outputs = evaluate_scalar(&executor(), &expander(), -0.5).unwrap();
    assert_eq!(outputs, vec![-0.5, 0.5, 1.5, 2.5]);
}

#[test]
fn test_merged_graph_matches_closed_form() {
    let (c, b) = ([0.5f32, -1.0, 2.0, 0.25], 3.0f32);
    let graph = merged(c.to_vec(), b);

    for v in [-3.0f32, 0.0, 1.0, 2.0, 7.5] {
        let expected = c[0] * v + c[1] * (v + 1.0) + c[2] * (v + 2.0) + c[3] * (v + 3.0) + b;
        let actual = evaluate_scalar(&executor(), &graph, v).unwrap();
        assert_eq!(actual.len(), 1);
        assert!(
            floats_close(actual[0], expected, TOLERANCE),
            "Mismatch for {}: graph={}, expected={}",
            v,
            actual[0],
            expected
        );
    }
}

#[test]
fn test_composition_equals_function_composition() {
    let model = model(vec![1.5, 0.0, -2.0, 1.0], -0.75);
    let expander = normalize_version(&expander(), model.opset_version()).unwrap();
    let graph = compose(&expander, &model, &IoMap::new().pair("features", "features"))
        .unwrap()
        .into_graph();
    let exec = executor();

    for v in [-1.0f32, 0.25, 4.0] {
        let features = exec
            .run(
                &expander,
                &HashMap::from([("x".to_string(), TensorData::scalar(v))]),
            )
            .unwrap()
            .remove("features")
            .unwrap();
        let staged = exec
            .run(&model, &HashMap::from([("features".to_string(), features)]))
            .unwrap()
            .remove("prediction")
            .unwrap();
        let direct = evaluate_scalar(&exec, &graph, v).unwrap();

        assert!(floats_close(staged.values()[0], direct[0], TOLERANCE));
    }
}

#[test]
fn test_width_mismatch_is_composition_error() {
    let model = model(vec![1.0, 2.0, 3.0], 0.0);
    let expander = normalize_version(&expander(), model.opset_version()).unwrap();
    let err = compose(&expander, &model, &IoMap::new().pair("features", "features")).unwrap_err();
    assert!(matches!(err, GraphError::Composition { .. }));
}

#[test]
fn test_composition_requires_normalized_versions() {
    let model = model(vec![1.0, 2.0, 3.0, 4.0], 0.0);
    let err = compose(&expander(), &model, &IoMap::new().pair("features", "features")).unwrap_err();
    assert!(matches!(err, GraphError::Composition { .. }));
}

#[test]
fn test_normalizer_is_idempotent() {
    let once = normalize_version(&expander(), 15).unwrap();
    let twice = normalize_version(&once, 15).unwrap();
    assert_eq!(once, twice);
    assert_eq!(twice.opset_version(), 15);
}

#[test]
fn test_expander_needs_opset_4() {
    // Concat on axis 0 has no valid form before opset 4.
    let err = normalize_version(&expander(), 3).unwrap_err();
    assert!(matches!(err, GraphError::UnsupportedVersion { .. }));
}

#[test]
fn test_builder_rejects_unproduced_output() {
    let err = GraphBuilder::new("broken")
        .input(ValueSlot::float("x", vec![1]))
        .node(Node::concat("concat", ["x", "x"], 0, "pair"))
        .output(ValueSlot::float("missing", vec![2]))
        .build()
        .unwrap_err();
    assert!(matches!(err, GraphError::Validation { .. }));
}

#[test]
fn test_persisted_graph_roundtrip_and_execution() {
    let graph = merged(vec![1.0, 2.0, 3.0, 4.0], 0.5);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("merged.pgrf");

    graph.save(&path).unwrap();
    let loaded = Graph::load(&path).unwrap();

    assert_eq!(loaded.nodes(), graph.nodes());
    assert_eq!(loaded.inputs(), graph.inputs());
    assert_eq!(loaded.outputs(), graph.outputs());
    assert_eq!(loaded.opset_version(), graph.opset_version());
    assert_eq!(loaded.to_bytes().unwrap(), graph.to_bytes().unwrap());

    let outputs = executor()
        .run_persisted(
            &path,
            &HashMap::from([("x".to_string(), TensorData::scalar(2.0))]),
        )
        .unwrap();
    assert_eq!(outputs["prediction"].values(), &[40.5]);
}

#[test]
fn test_build_pipeline_with_custom_names() {
    let config = PipelineConfig::new()
        .progression(
            ProgressionOptions::new()
                .width(3)
                .step(2.0)
                .input_name("value")
                .output_name("expanded"),
        )
        .export(ExportOptions::new().input_name("expanded").output_name("y"));
    let params = LinearModelParams::new(vec![1.0, 1.0, 1.0], 1.0);
    let artifacts = build_pipeline(&params, &config).unwrap();

    // 3 + 5 + 7 + 1
    let out = evaluate_scalar(&executor(), artifacts.composed.graph(), 3.0).unwrap();
    assert_eq!(out, vec![16.0]);
    assert_eq!(artifacts.composed.graph().outputs()[0].name(), "y");
}

#[test]
fn test_trained_pipeline_end_to_end() {
    let device = <TrainingBackend as Backend>::Device::default();

    // Rows are progressions [v, v+1, v+2, v+3]; targets follow a fixed line.
    let truth = LinearModelParams::new(vec![0.5, 1.0, -0.5, 2.0], 1.0);
    let features: Vec<Vec<f32>> = (0..32)
        .map(|i| {
            let v = i as f32 / 8.0 - 2.0;
            vec![v, v + 1.0, v + 2.0, v + 3.0]
        })
        .collect();
    let targets: Vec<f32> = features.iter().map(|row| truth.predict(row)).collect();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.pgrf");
    let config = PipelineConfig::new()
        .training(
            TrainingConfig::new()
                .epochs(40)
                .learning_rate(0.05)
                .batch_size(8)
                .verbose(false),
        )
        .artifact_path(&path)
        .probe_values(vec![-1.0, 0.0, 2.0]);

    let artifacts = run_pipeline::<TrainingBackend>(&config, &features, &targets, &device)
        .expect("pipeline should run");

    assert!(path.exists());
    let reloaded = Graph::load(&path).unwrap();
    assert_eq!(&reloaded, artifacts.composed.graph());

    let v = 2.0f32;
    let expected = artifacts.params.predict(&[v, v + 1.0, v + 2.0, v + 3.0]);
    let actual = evaluate_scalar(&executor(), &reloaded, v).unwrap();
    assert!(floats_close(actual[0], expected, TOLERANCE));
}
