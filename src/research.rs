//! This directory provides the evaluation harness for bag classifiers.
//! - Accuracy, error and cost statistics
//! - Stratified cross-validation
//! - Confusion matrix and per-class rates

/// Defines the misclassification cost matrix.
pub mod cost_matrix;

/// Defines the fold generator for cross-validation.
pub mod cross_validation;

/// Defines the statistics accumulator.
pub mod evaluation;


pub use cost_matrix::CostMatrix;
pub use cross_validation::CrossValidation;
pub use evaluation::MIEvaluation;
