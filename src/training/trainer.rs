//! Training loop implementation.

use burn::{
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{ElementConversion, Tensor, backend::AutodiffBackend},
};

use super::{LinearRegression, TrainingConfig};
use crate::errors::{GraphError, Result};
use crate::export::LinearModelParams;

/// Outcome of a training run.
#[derive(Debug, Clone)]
pub struct TrainingResult {
    /// Fitted coefficients and intercept.
    pub params: LinearModelParams,
    /// Mean loss per epoch.
    pub loss_history: Vec<f32>,
}

/// Fits `targets ≈ features · w + b` with the Adam optimizer.
///
/// Every row of `features` must have the same, non-zero width and there
/// must be one target per row.
pub fn fit_linear_regression<B: AutodiffBackend>(
    features: &[Vec<f32>],
    targets: &[f32],
    config: &TrainingConfig,
    device: &B::Device,
) -> Result<TrainingResult> {
    let num_samples = features.len();
    let width = features.first().map(|row| row.len()).unwrap_or(0);
    if num_samples == 0 || width == 0 {
        return Err(GraphError::training("no training data"));
    }
    if let Some(i) = features.iter().position(|row| row.len() != width) {
        return Err(GraphError::training(format!(
            "row {} has {} features, expected {}",
            i,
            features[i].len(),
            width
        )));
    }
    if targets.len() != num_samples {
        return Err(GraphError::training(format!(
            "{} targets for {} rows",
            targets.len(),
            num_samples
        )));
    }
    if config.batch_size == 0 {
        return Err(GraphError::training("batch size must be positive"));
    }

    let input_data: Vec<f32> = features.iter().flatten().copied().collect();
    let input_tensor = Tensor::<B, 1>::from_floats(input_data.as_slice(), device)
        .reshape([num_samples, width]);
    let target_tensor =
        Tensor::<B, 1>::from_floats(targets, device).reshape([num_samples, 1]);

    let mut optimizer = AdamConfig::new().init();
    let mut model = LinearRegression::<B>::new(width, device);
    let mut loss_history = Vec::with_capacity(config.epochs);

    for epoch in 0..config.epochs {
        let mut epoch_loss = 0.0f32;
        let mut batches = 0usize;

        for start in (0..num_samples).step_by(config.batch_size) {
            let end = (start + config.batch_size).min(num_samples);
            let inputs = input_tensor.clone().slice([start..end, 0..width]);
            let expected = target_tensor.clone().slice([start..end, 0..1]);

            let predictions = model.forward(inputs);
            let loss = config.loss.compute(predictions, expected);
            let loss_value: f32 = loss.clone().into_scalar().elem();
            epoch_loss += loss_value;
            batches += 1;

            let grads = loss.backward();
            let grads_params = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(config.learning_rate, model, grads_params);
        }

        let mean_loss = epoch_loss / batches as f32;
        loss_history.push(mean_loss);

        if config.verbose && (epoch % 10 == 0 || epoch == config.epochs - 1) {
            log::info!(
                "Epoch {}/{}: loss = {:.6}",
                epoch + 1,
                config.epochs,
                mean_loss
            );
        }
    }

    Ok(TrainingResult {
        params: model.params()?,
        loss_history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::Loss;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    fn line_data() -> (Vec<Vec<f32>>, Vec<f32>) {
        // y = 2x + 1
        let features: Vec<Vec<f32>> = (0..20).map(|i| vec![i as f32 / 10.0]).collect();
        let targets = features.iter().map(|row| 2.0 * row[0] + 1.0).collect();
        (features, targets)
    }

    #[test]
    fn test_training_reduces_loss() {
        let device = <TestBackend as burn::tensor::backend::Backend>::Device::default();
        let (features, targets) = line_data();

        let config = TrainingConfig::new()
            .epochs(100)
            .learning_rate(0.05)
            .batch_size(5)
            .verbose(false);

        let result =
            fit_linear_regression::<TestBackend>(&features, &targets, &config, &device).unwrap();

        let initial_loss = result.loss_history.first().copied().unwrap_or(f32::MAX);
        let final_loss = result.loss_history.last().copied().unwrap_or(f32::MAX);

        assert_eq!(result.loss_history.len(), 100);
        assert_eq!(result.params.width(), 1);
        assert!(
            final_loss < initial_loss,
            "Loss should decrease: initial={}, final={}",
            initial_loss,
            final_loss
        );
    }

    #[test]
    fn test_training_with_mae() {
        let device = <TestBackend as burn::tensor::backend::Backend>::Device::default();
        let (features, targets) = line_data();

        let config = TrainingConfig::new()
            .epochs(60)
            .learning_rate(0.05)
            .loss(Loss::Mae)
            .verbose(false);

        let result =
            fit_linear_regression::<TestBackend>(&features, &targets, &config, &device).unwrap();
        let initial_loss = result.loss_history[0];
        let final_loss = *result.loss_history.last().unwrap();
        assert!(final_loss < initial_loss);
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let device = <TestBackend as burn::tensor::backend::Backend>::Device::default();
        let features = vec![vec![1.0, 2.0], vec![1.0]];
        let err = fit_linear_regression::<TestBackend>(
            &features,
            &[1.0, 2.0],
            &TrainingConfig::default(),
            &device,
        )
        .unwrap_err();
        assert!(matches!(err, GraphError::Training { .. }));
    }

    #[test]
    fn test_rejects_target_count_mismatch() {
        let device = <TestBackend as burn::tensor::backend::Backend>::Device::default();
        let features = vec![vec![1.0], vec![2.0]];
        assert!(
            fit_linear_regression::<TestBackend>(
                &features,
                &[1.0],
                &TrainingConfig::default(),
                &device
            )
            .is_err()
        );
    }

    #[test]
    fn test_rejects_empty_data() {
        let device = <TestBackend as burn::tensor::backend::Backend>::Device::default();
        assert!(
            fit_linear_regression::<TestBackend>(&[], &[], &TrainingConfig::default(), &device)
                .is_err()
        );
    }
}
