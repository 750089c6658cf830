//! Statistical structures for model results

use serde::{Deserialize, Serialize};

/// Model-level fit statistics
///
/// Statistics that are undefined for a model (an F test without slope terms,
/// R-squared of a constant response) are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelStatistics {
    /// R-squared
    pub r_squared: Option<f64>,
    /// Adjusted R-squared
    pub adj_r_squared: Option<f64>,
    /// Residual standard error
    pub residual_std_error: Option<f64>,
    /// F-statistic against the intercept-only model
    pub f_statistic: Option<f64>,
    /// F-statistic p-value
    pub f_p_value: Option<f64>,
    /// Gaussian log-likelihood
    pub log_likelihood: f64,
    /// AIC
    pub aic: f64,
    /// BIC
    pub bic: f64,
    /// Residual sum of squares
    pub deviance: f64,
    /// Residual degrees of freedom
    pub df_residual: usize,
    /// Number of estimated coefficients, intercept included
    pub df_model: usize,
    /// Number of observations used
    pub nobs: usize,
}

/// Five-number summary of the residuals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualStatistics {
    /// Minimum residual
    pub min: f64,
    /// First quartile
    pub q1: f64,
    /// Median
    pub median: f64,
    /// Third quartile
    pub q3: f64,
    /// Maximum residual
    pub max: f64,
}

impl ResidualStatistics {
    /// Summarise a set of residuals; `None` when empty
    pub fn from_residuals(residuals: &[f64]) -> Option<Self> {
        if residuals.is_empty() {
            return None;
        }

        let mut sorted = residuals.to_vec();
        sorted.sort_by(f64::total_cmp);

        let quantile = |q: f64| {
            let idx = (sorted.len() as f64 - 1.0) * q;
            let lower = idx.floor() as usize;
            let upper = idx.ceil() as usize;
            let weight = idx - lower as f64;
            sorted[lower] * (1.0 - weight) + sorted[upper] * weight
        };

        Some(Self {
            min: sorted[0],
            q1: quantile(0.25),
            median: quantile(0.5),
            q3: quantile(0.75),
            max: sorted[sorted.len() - 1],
        })
    }
}
