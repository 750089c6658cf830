//! Linear regression models
//!
//! This module provides ordinary least squares fitting of R-style formulas
//! against a [`DataFrame`], with coefficient inference, influence measures
//! and an explicit policy for rows with missing values.

pub mod ols;
pub mod result;

#[cfg(test)]
mod tests;

// Re-exports
pub use ols::LinearRegression;
pub use result::FittedModel;

use crate::base::{ModelError, Result};
use detrend_core::data::DataFrame;
use serde::{Deserialize, Serialize};

/// Linear model configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearConfig {
    /// Confidence level for coefficient intervals
    pub confidence_level: f64,
    /// How rows excluded for missing values appear in observation output
    pub missing: MissingPolicy,
    /// Which standardised residual to report
    pub std_resid: StdResidKind,
}

/// Treatment of rows with a missing response or predictor
///
/// Such rows never enter the fit. The policy decides whether
/// observation-level output drops them or keeps a placeholder row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Exclude from the fit and drop from observation output
    #[default]
    Omit,
    /// Exclude from the fit and keep a row of missing markers
    Exclude,
}

/// Standardised residual definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdResidKind {
    /// `r / (sigma * sqrt(1 - h))`, adjusted for leverage
    #[default]
    Standardized,
    /// `r / sigma`
    Scaled,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
            missing: MissingPolicy::default(),
            std_resid: StdResidKind::default(),
        }
    }
}

impl LinearConfig {
    /// Check that the configuration values are usable
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ModelError::InvalidConfig {
                message: format!(
                    "confidence_level must lie in (0, 1), got {}",
                    self.confidence_level
                ),
            });
        }
        Ok(())
    }
}

/// Convenience function for OLS regression with the default configuration
pub fn lm(formula: &str, data: &DataFrame) -> Result<FittedModel> {
    LinearRegression::new(formula)?.fit(data)
}
