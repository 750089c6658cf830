//! Ordinary Least Squares (OLS) linear regression
//!
//! This module implements the standard linear regression model using the
//! ordinary least squares estimator, solved through the singular value
//! decomposition of the design matrix.

use nalgebra::{DMatrix, DVector, SVD};
use ndarray::{Array1, Array2};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use tracing::debug;

use crate::base::coefficient::finite;
use crate::base::{Coefficient, ModelError, ModelStatistics, Result};
use crate::lm::{FittedModel, LinearConfig};
use detrend_core::data::DataFrame;
use detrend_core::formula::{Formula, ModelFrame, INTERCEPT};

/// Leverages within this distance of 1 are treated as exactly 1
const LEVERAGE_TOLERANCE: f64 = 10.0 * f64::EPSILON;

/// Matrix type alias for 2D arrays
pub type Matrix = Array2<f64>;

/// Vector type alias for 1D arrays
pub type Vector = Array1<f64>;

/// OLS linear regression model
///
/// Holds a parsed formula and a configuration; [`LinearRegression::fit`] can
/// be called on any number of frames.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegression {
    /// Model formula
    formula: Formula,
    /// Configuration
    config: LinearConfig,
}

/// Least-squares solution of a full-rank design
struct Solution {
    coefficients: Vector,
    /// (X'X)^-1
    xtx_inv: Matrix,
    /// Diagonal of the hat matrix
    hat_diagonal: Vector,
    rank: usize,
}

impl LinearRegression {
    /// Create a new linear regression model
    pub fn new(formula: &str) -> Result<Self> {
        let formula = Formula::parse(formula)?;
        Ok(Self::from_formula(formula))
    }

    /// Create a model from an already parsed formula
    pub fn from_formula(formula: Formula) -> Self {
        Self {
            formula,
            config: LinearConfig::default(),
        }
    }

    /// Set configuration
    pub fn config(mut self, config: LinearConfig) -> Self {
        self.config = config;
        self
    }

    /// Model formula
    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    /// Fit the OLS model to `data`
    ///
    /// Rows with a missing or non-finite value in any variable of the formula
    /// are excluded from the fit; the fitted model records which input rows
    /// were used.
    pub fn fit(&self, data: &DataFrame) -> Result<FittedModel> {
        self.config.validate()?;
        let frame = self.formula.model_frame(data)?;
        self.fit_frame(frame)
    }

    /// Fit the OLS model to a prepared model frame
    pub fn fit_frame(&self, frame: ModelFrame) -> Result<FittedModel> {
        check_estimable(&frame, &self.formula)?;

        let n = frame.nobs();
        let p = frame.ncols();
        let solution = svd_solve(&frame.design, &frame.response)?;

        // Calculate fitted values and residuals
        let fitted_values = frame.design.dot(&solution.coefficients);
        let residuals = &frame.response - &fitted_values;

        let rss = residuals.dot(&residuals);
        let df_residual = n - p;
        let sigma2 = rss / df_residual as f64;
        let sigma = sigma2.sqrt();

        let coefficients = self.inference(&frame.column_names, &solution, sigma2, df_residual)?;
        let statistics = model_statistics(&frame, rss, df_residual)?;

        let cooks_distance: Vector = residuals
            .iter()
            .zip(solution.hat_diagonal.iter())
            .map(|(&r, &h)| {
                if h < 1.0 {
                    (r * r * h) / (p as f64 * sigma2 * (1.0 - h).powi(2))
                } else {
                    f64::NAN
                }
            })
            .collect();

        debug!(
            "Fitted {} on {} rows ({} excluded): {} terms, sigma {:.4}",
            self.formula,
            n,
            frame.excluded.len(),
            p,
            sigma
        );

        Ok(FittedModel {
            formula: self.formula.clone(),
            config: self.config,
            coefficients,
            beta: solution.coefficients,
            xtx_inv: solution.xtx_inv,
            fitted_values,
            residuals,
            response: frame.response,
            hat_diagonal: solution.hat_diagonal,
            cooks_distance,
            statistics,
            rank: solution.rank,
            term_names: frame.column_names,
            response_name: frame.response_name,
            rows: frame.rows,
            excluded: frame.excluded,
            n_input: frame.n_input,
            codings: frame.codings,
        })
    }

    /// Calculate inference statistics for every coefficient
    fn inference(
        &self,
        names: &[String],
        solution: &Solution,
        sigma2: f64,
        df_residual: usize,
    ) -> Result<Vec<Coefficient>> {
        let t_dist = StudentsT::new(0.0, 1.0, df_residual as f64).map_err(|e| {
            ModelError::NumericalError {
                message: format!("Failed to create t-distribution: {}", e),
                operation: "inference".to_string(),
            }
        })?;

        let alpha = 1.0 - self.config.confidence_level;
        let t_critical = t_dist.inverse_cdf(1.0 - alpha / 2.0);

        Ok(names
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let se = (sigma2 * solution.xtx_inv[[j, j]]).sqrt();
                Coefficient::inferred(
                    name.clone(),
                    solution.coefficients[j],
                    se,
                    &t_dist,
                    t_critical,
                )
            })
            .collect())
    }
}

/// Reject frames whose coefficients cannot all be estimated
///
/// Too few rows for the declared levels is reported before a degenerate
/// factor.
fn check_estimable(frame: &ModelFrame, formula: &Formula) -> Result<()> {
    let n = frame.nobs();

    if n <= frame.nominal_columns {
        return Err(ModelError::InsufficientData {
            n_samples: n,
            n_terms: frame.nominal_columns,
        });
    }

    if let Some(factor) = frame.degenerate.first() {
        return Err(ModelError::InvalidSpecification {
            column: factor.clone(),
            reason: "fewer than two levels present in the rows used".to_string(),
        });
    }

    let p = frame.ncols();
    if p == 0 {
        return Err(ModelError::InvalidSpecification {
            column: formula.to_string(),
            reason: "model has no terms".to_string(),
        });
    }
    if n <= p {
        return Err(ModelError::InsufficientData {
            n_samples: n,
            n_terms: p,
        });
    }

    if frame.has_intercept {
        for (j, name) in frame.column_names.iter().enumerate() {
            if name == INTERCEPT {
                continue;
            }
            let column = frame.design.column(j);
            if column.iter().all(|&v| v == column[0]) {
                return Err(ModelError::InvalidSpecification {
                    column: name.clone(),
                    reason: "predictor has zero variance".to_string(),
                });
            }
        }
    }

    Ok(())
}

/// Solve using SVD-based least squares
fn svd_solve(x: &Matrix, y: &Vector) -> Result<Solution> {
    let (n, p) = x.dim();
    let design = DMatrix::from_fn(n, p, |i, j| x[[i, j]]);
    let response = DVector::from_iterator(n, y.iter().copied());

    let svd = SVD::new(design, true, true);

    // ~= machine_epsilon * max(size) * max_singular
    let sigma_max = svd.singular_values.max();
    let epsilon = f64::EPSILON * n.max(p) as f64 * sigma_max;

    let rank = svd.rank(epsilon);
    if rank < p {
        return Err(ModelError::RankDeficient { rank, n_terms: p });
    }

    let beta = svd
        .solve(&response, epsilon)
        .map_err(|e| ModelError::NumericalError {
            message: format!("SVD least squares failed: {}", e),
            operation: "svd_solve".to_string(),
        })?;
    let pinv = svd
        .pseudo_inverse(epsilon)
        .map_err(|e| ModelError::NumericalError {
            message: format!("Pseudo-inverse failed: {}", e),
            operation: "svd_solve".to_string(),
        })?;

    // (X'X)^-1 = X+ X+'
    let xtx_inv_na = &pinv * pinv.transpose();
    let xtx_inv = Matrix::from_shape_fn((p, p), |(i, j)| xtx_inv_na[(i, j)]);

    // h_ii = x_i' X+_i, snapped to 1 when rounding pushes it past
    let hat_diagonal = (0..n)
        .map(|i| {
            let h = (0..p).map(|j| x[[i, j]] * pinv[(j, i)]).sum::<f64>();
            if h >= 1.0 - LEVERAGE_TOLERANCE {
                1.0
            } else {
                h
            }
        })
        .collect();

    Ok(Solution {
        coefficients: beta.iter().copied().collect(),
        xtx_inv,
        hat_diagonal,
        rank,
    })
}

/// Model-level statistics from the residual sum of squares
fn model_statistics(frame: &ModelFrame, rss: f64, df_residual: usize) -> Result<ModelStatistics> {
    let n = frame.nobs();
    let p = frame.ncols();
    let y = &frame.response;
    let intercept = usize::from(frame.has_intercept);

    // without an intercept the null model is y = 0
    let tss = if frame.has_intercept {
        let mean = y.mean().unwrap_or(0.0);
        y.iter().map(|&v| (v - mean).powi(2)).sum::<f64>()
    } else {
        y.dot(y)
    };

    let sigma2 = rss / df_residual as f64;
    let r_squared = finite(1.0 - rss / tss);
    let adj_r_squared = r_squared
        .map(|r2| 1.0 - (1.0 - r2) * ((n - intercept) as f64 / df_residual as f64))
        .and_then(finite);

    let df_slopes = p - intercept;
    let (f_statistic, f_p_value) = if df_slopes > 0 {
        let f_dist = FisherSnedecor::new(df_slopes as f64, df_residual as f64).map_err(|e| {
            ModelError::NumericalError {
                message: format!("Failed to create F-distribution: {}", e),
                operation: "f_statistic".to_string(),
            }
        })?;
        let f = finite(((tss - rss) / df_slopes as f64) / sigma2);
        (f, f.map(|f| f_dist.sf(f)))
    } else {
        (None, None)
    };

    // Gaussian log-likelihood at the ML variance estimate
    let nf = n as f64;
    let log_likelihood =
        -0.5 * nf * ((2.0 * std::f64::consts::PI).ln() + (rss / nf).ln() + 1.0);
    // the residual variance counts as an estimated parameter
    let n_params = (p + 1) as f64;

    Ok(ModelStatistics {
        r_squared,
        adj_r_squared,
        residual_std_error: finite(sigma2.sqrt()),
        f_statistic,
        f_p_value,
        log_likelihood,
        aic: -2.0 * log_likelihood + 2.0 * n_params,
        bic: -2.0 * log_likelihood + nf.ln() * n_params,
        deviance: rss,
        df_residual,
        df_model: p,
        nobs: n,
    })
}
