//! Fitted linear model
//!
//! A [`FittedModel`] carries everything the summary views need: estimates
//! and their inference, per-observation diagnostics, model statistics, and
//! the indices of the input rows used, so that summaries never have to
//! re-read the original table.

use std::fmt;

use detrend_core::data::DataFrame;
use detrend_core::formula::{Codings, Formula};
use ndarray::Array1;

use crate::base::{Coefficient, ModelResultTrait, ModelStatistics, ResidualStatistics, Result};
use crate::lm::ols::{Matrix, Vector};
use crate::lm::{LinearConfig, StdResidKind};

/// OLS linear regression result
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    pub(crate) formula: Formula,
    pub(crate) config: LinearConfig,
    /// Per-term estimates with inference
    pub(crate) coefficients: Vec<Coefficient>,
    /// Coefficient vector (β)
    pub(crate) beta: Vector,
    /// Unscaled covariance (X'X)^-1
    pub(crate) xtx_inv: Matrix,
    /// Fitted values (ŷ)
    pub(crate) fitted_values: Vector,
    /// Residuals (y - ŷ)
    pub(crate) residuals: Vector,
    /// Response vector (y)
    pub(crate) response: Vector,
    /// Hat matrix diagonal (leverage)
    pub(crate) hat_diagonal: Vector,
    /// Cook's distances
    pub(crate) cooks_distance: Vector,
    pub(crate) statistics: ModelStatistics,
    pub(crate) rank: usize,
    pub(crate) term_names: Vec<String>,
    pub(crate) response_name: String,
    /// Indices into the input frame of the rows used
    pub(crate) rows: Vec<usize>,
    /// Indices of input rows left out for missing values
    pub(crate) excluded: Vec<usize>,
    pub(crate) n_input: usize,
    pub(crate) codings: Codings,
}

impl FittedModel {
    /// Formula the model was fitted with
    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    /// Configuration the model was fitted with
    pub fn config(&self) -> &LinearConfig {
        &self.config
    }

    /// Coefficient for a design column, by name
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }

    /// Coefficient vector in design column order
    pub fn beta(&self) -> &Vector {
        &self.beta
    }

    /// Covariance matrix of the coefficients, σ²(X'X)^-1
    pub fn vcov(&self) -> Matrix {
        let sigma2 = self.sigma().map_or(f64::NAN, |s| s * s);
        &self.xtx_inv * sigma2
    }

    /// Response values of the rows used
    pub fn response(&self) -> &Vector {
        &self.response
    }

    /// Label of the response term
    pub fn response_name(&self) -> &str {
        &self.response_name
    }

    /// Names of the design columns
    pub fn term_names(&self) -> &[String] {
        &self.term_names
    }

    /// Leverage of each row used
    pub fn hat_values(&self) -> &Vector {
        &self.hat_diagonal
    }

    /// Cook's distance of each row used; `NaN` where leverage is one
    pub fn cooks_distance(&self) -> &Vector {
        &self.cooks_distance
    }

    /// Residual standard error
    pub fn sigma(&self) -> Option<f64> {
        self.statistics.residual_std_error
    }

    /// Numerical rank of the design matrix
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Level sets used to code categorical predictors
    pub fn codings(&self) -> &Codings {
        &self.codings
    }

    /// Indices into the input frame of the rows used
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Number of rows in the input frame
    pub fn n_input(&self) -> usize {
        self.n_input
    }

    /// Indices of input rows left out of the fit for missing values
    pub fn excluded(&self) -> &[usize] {
        &self.excluded
    }

    /// Residuals over leverage-adjusted sigma, `r / (σ √(1 - h))`
    ///
    /// Undefined (`NaN`) for rows with leverage one.
    pub fn standardized_residuals(&self) -> Vector {
        let sigma = self.sigma().unwrap_or(f64::NAN);
        self.residuals
            .iter()
            .zip(self.hat_diagonal.iter())
            .map(|(&r, &h)| {
                if h < 1.0 {
                    r / (sigma * (1.0 - h).sqrt())
                } else {
                    f64::NAN
                }
            })
            .collect()
    }

    /// Residuals over sigma, `r / σ`
    pub fn scaled_residuals(&self) -> Vector {
        let sigma = self.sigma().unwrap_or(f64::NAN);
        self.residuals.mapv(|r| r / sigma)
    }

    /// Standardised residuals of the kind selected in the configuration
    pub fn std_residuals(&self) -> Vector {
        match self.config.std_resid {
            StdResidKind::Standardized => self.standardized_residuals(),
            StdResidKind::Scaled => self.scaled_residuals(),
        }
    }

    /// Residuals aligned with the input rows, `None` where a row was excluded
    pub fn residuals_aligned(&self) -> Vec<Option<f64>> {
        self.align(&self.residuals)
    }

    /// Fitted values aligned with the input rows, `None` where a row was excluded
    pub fn fitted_aligned(&self) -> Vec<Option<f64>> {
        self.align(&self.fitted_values)
    }

    /// Scatter per-observation values back to input positions
    pub fn align(&self, values: &Array1<f64>) -> Vec<Option<f64>> {
        let mut aligned = vec![None; self.n_input];
        for (&row, &value) in self.rows.iter().zip(values.iter()) {
            aligned[row] = Some(value);
        }
        aligned
    }

    /// Five-number summary of the residuals
    pub fn residual_summary(&self) -> Option<ResidualStatistics> {
        ResidualStatistics::from_residuals(self.residuals.as_slice().unwrap_or(&[]))
    }

    /// Predict the response for new data
    ///
    /// Categorical predictors are coded with the levels seen during fitting.
    /// Rows with a missing predictor get `None`.
    pub fn predict(&self, data: &DataFrame) -> Result<Vec<Option<f64>>> {
        let (design, _, rows) = self.formula.design_for(data, &self.codings)?;
        let predictions = design.dot(&self.beta);

        let mut aligned = vec![None; data.nrows()];
        for (&row, &value) in rows.iter().zip(predictions.iter()) {
            aligned[row] = Some(value);
        }
        Ok(aligned)
    }

    /// Map row indices through `map`, the row positions of a subset within
    /// a larger frame of `n_input` rows
    pub(crate) fn remap_rows(&mut self, map: &[usize], n_input: usize) {
        for row in self.rows.iter_mut().chain(self.excluded.iter_mut()) {
            *row = map[*row];
        }
        self.n_input = n_input;
    }
}

impl ModelResultTrait for FittedModel {
    fn coefficients(&self) -> &[Coefficient] {
        &self.coefficients
    }

    fn fitted_values(&self) -> &Vector {
        &self.fitted_values
    }

    fn residuals(&self) -> &Vector {
        &self.residuals
    }

    fn statistics(&self) -> &ModelStatistics {
        &self.statistics
    }
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "NA".to_string(), |v| format!("{:.*}", precision, v))
}

fn fmt_p(value: Option<f64>) -> String {
    match value {
        Some(p) if p < 2.2e-16 => "<2e-16".to_string(),
        Some(p) => format!("{:.4}", p),
        None => "NA".to_string(),
    }
}

impl fmt::Display for FittedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Call:")?;
        writeln!(f, "lm(formula = {})", self.formula)?;
        writeln!(f)?;

        if let Some(stats) = self.residual_summary() {
            writeln!(f, "Residuals:")?;
            writeln!(
                f,
                "{:>10} {:>10} {:>10} {:>10} {:>10}",
                "Min", "1Q", "Median", "3Q", "Max"
            )?;
            writeln!(
                f,
                "{:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
                stats.min, stats.q1, stats.median, stats.q3, stats.max
            )?;
            writeln!(f)?;
        }

        writeln!(f, "Coefficients:")?;
        let width = self
            .coefficients
            .iter()
            .map(|c| c.name.len())
            .max()
            .unwrap_or(0)
            .max(11);
        writeln!(
            f,
            "{:<width$} {:>12} {:>12} {:>10} {:>10}",
            "", "Estimate", "Std. Error", "t value", "Pr(>|t|)"
        )?;
        for coeff in &self.coefficients {
            writeln!(
                f,
                "{:<width$} {:>12.6} {:>12} {:>10} {:>10}",
                coeff.name,
                coeff.estimate,
                fmt_opt(coeff.std_error, 6),
                fmt_opt(coeff.t_stat, 3),
                fmt_p(coeff.p_value),
            )?;
        }
        writeln!(f)?;

        let stats = &self.statistics;
        writeln!(
            f,
            "Residual standard error: {} on {} degrees of freedom",
            fmt_opt(stats.residual_std_error, 4),
            stats.df_residual
        )?;
        if !self.excluded.is_empty() {
            writeln!(
                f,
                "  ({} observations deleted due to missingness)",
                self.excluded.len()
            )?;
        }
        writeln!(
            f,
            "Multiple R-squared: {},\tAdjusted R-squared: {}",
            fmt_opt(stats.r_squared, 4),
            fmt_opt(stats.adj_r_squared, 4)
        )?;
        if let Some(f_stat) = stats.f_statistic {
            let intercept = usize::from(self.formula.has_intercept);
            writeln!(
                f,
                "F-statistic: {:.2} on {} and {} DF,  p-value: {}",
                f_stat,
                stats.df_model - intercept,
                stats.df_residual,
                fmt_p(stats.f_p_value)
            )?;
        }

        Ok(())
    }
}
