//! Fitting the linear model that the exporter turns into a graph.
//!
//! This module provides:
//! - Loss functions (MSE, MAE)
//! - Training configuration
//! - A Burn linear-regression module
//! - A mini-batch training loop with the Adam optimizer

mod config;
mod linear;
mod loss;
mod trainer;

pub use config::TrainingConfig;
pub use linear::LinearRegression;
pub use loss::Loss;
pub use trainer::{TrainingResult, fit_linear_regression};
