//! Core traits and types for fitted models
//!
//! This module defines the per-term coefficient record, the model-level
//! statistics, and the trait the summary extractors read fitted models
//! through.

use ndarray::Array1;

// Re-export core types
pub use coefficient::Coefficient;
pub use statistics::{ModelStatistics, ResidualStatistics};

pub use crate::error::ModelError;

pub mod coefficient;
pub mod statistics;

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Read access to a fitted model's estimates
pub trait ModelResultTrait: Send + Sync {
    /// Per-term estimates, in design column order
    fn coefficients(&self) -> &[Coefficient];

    /// Fitted values of the rows used
    fn fitted_values(&self) -> &Array1<f64>;

    /// Raw residuals of the rows used
    fn residuals(&self) -> &Array1<f64>;

    /// Model-level statistics
    fn statistics(&self) -> &ModelStatistics;

    /// Number of observations used in the fit
    fn nobs(&self) -> usize {
        self.residuals().len()
    }

    /// Get R-squared value
    fn r_squared(&self) -> Option<f64> {
        self.statistics().r_squared
    }

    /// Get residual standard error
    fn residual_std_error(&self) -> Option<f64> {
        self.statistics().residual_std_error
    }

    /// Get degrees of freedom for residuals
    fn df_residual(&self) -> usize {
        self.statistics().df_residual
    }
}
