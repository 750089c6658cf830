//! Tidy summaries of fitted models
//!
//! Three views of a fit, one row per unit:
//!
//! - [`glance`]: one [`ModelRow`] of fit-quality statistics per model
//! - [`tidy`]: one [`CoefficientRow`] per model term
//! - [`augment`]: one [`ObservationRow`] per observation
//!
//! Each view is a pure function of the fitted model; the input table is never
//! read again. The `*_frame` functions lay the same rows out as a
//! [`DataFrame`], with missing cells where a statistic is undefined.

use serde::Serialize;

use crate::base::{ModelResultTrait, Result};
use crate::lm::{FittedModel, MissingPolicy};
use detrend_core::data::{DataFrame, Series};


/// Model-level summary row
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelRow {
    pub r_squared: Option<f64>,
    pub adj_r_squared: Option<f64>,
    /// Residual standard error
    pub sigma: Option<f64>,
    /// F statistic
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
    /// Number of model terms, intercept included
    pub df: usize,
    pub log_lik: f64,
    pub aic: f64,
    pub bic: f64,
    pub deviance: f64,
    pub df_residual: usize,
    pub nobs: usize,
}

/// Coefficient-level summary row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientRow {
    pub term: String,
    pub estimate: f64,
    pub std_error: Option<f64>,
    /// t statistic
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
    pub conf_low: Option<f64>,
    pub conf_high: Option<f64>,
}

/// Observation-level summary row
///
/// `row` is the position of the observation in the table the model was
/// fitted on. Rows kept as placeholders for excluded observations carry
/// `None` in every other field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObservationRow {
    pub row: usize,
    pub response: Option<f64>,
    pub fitted: Option<f64>,
    pub resid: Option<f64>,
    pub std_resid: Option<f64>,
    /// Leverage
    pub hat: Option<f64>,
    /// Cook's distance
    pub cooksd: Option<f64>,
}

impl ObservationRow {
    fn excluded(row: usize) -> Self {
        Self {
            row,
            response: None,
            fitted: None,
            resid: None,
            std_resid: None,
            hat: None,
            cooksd: None,
        }
    }
}

/// Model-level statistics of a fit
pub fn glance<M: ModelResultTrait + ?Sized>(model: &M) -> ModelRow {
    let stats = model.statistics();
    ModelRow {
        r_squared: stats.r_squared,
        adj_r_squared: stats.adj_r_squared,
        sigma: stats.residual_std_error,
        statistic: stats.f_statistic,
        p_value: stats.f_p_value,
        df: stats.df_model,
        log_lik: stats.log_likelihood,
        aic: stats.aic,
        bic: stats.bic,
        deviance: stats.deviance,
        df_residual: stats.df_residual,
        nobs: stats.nobs,
    }
}

/// Per-term estimates of a fit, in design column order
pub fn tidy<M: ModelResultTrait + ?Sized>(model: &M) -> Vec<CoefficientRow> {
    model
        .coefficients()
        .iter()
        .map(|c| CoefficientRow {
            term: c.name.clone(),
            estimate: c.estimate,
            std_error: c.std_error,
            statistic: c.t_stat,
            p_value: c.p_value,
            conf_low: c.ci_lower,
            conf_high: c.ci_upper,
        })
        .collect()
}

/// Per-observation fitted values, residuals and influence measures
///
/// Under [`MissingPolicy::Omit`] there is one row per observation used in the
/// fit. Under [`MissingPolicy::Exclude`] rows excluded for missing values
/// are kept as well, marked by `None`, and all rows are in input order.
pub fn augment(model: &FittedModel) -> Vec<ObservationRow> {
    let std_resid = model.std_residuals();
    let fitted = model.fitted_values();
    let resid = model.residuals();
    let response = model.response();
    let hat = model.hat_values();
    let cooks = model.cooks_distance();

    let used = model.rows().iter().enumerate().map(|(i, &row)| ObservationRow {
        row,
        response: Some(response[i]),
        fitted: Some(fitted[i]),
        resid: Some(resid[i]),
        std_resid: Some(std_resid[i]).filter(|v| v.is_finite()),
        hat: Some(hat[i]),
        cooksd: Some(cooks[i]).filter(|v| v.is_finite()),
    });

    match model.config().missing {
        MissingPolicy::Omit => used.collect(),
        MissingPolicy::Exclude => {
            let placeholders = model.excluded().iter().map(|&row| ObservationRow::excluded(row));
            let mut rows: Vec<ObservationRow> = used.chain(placeholders).collect();
            rows.sort_by_key(|obs| obs.row);
            rows
        }
    }
}

/// Model rows as a frame
pub fn glance_frame(rows: &[ModelRow]) -> Result<DataFrame> {
    Ok(DataFrame::from_columns(vec![
        ("r_squared", opt_column(rows, |r| r.r_squared)),
        ("adj_r_squared", opt_column(rows, |r| r.adj_r_squared)),
        ("sigma", opt_column(rows, |r| r.sigma)),
        ("statistic", opt_column(rows, |r| r.statistic)),
        ("p_value", opt_column(rows, |r| r.p_value)),
        ("df", count_column(rows, |r| r.df)),
        ("log_lik", float_column(rows, |r| r.log_lik)),
        ("aic", float_column(rows, |r| r.aic)),
        ("bic", float_column(rows, |r| r.bic)),
        ("deviance", float_column(rows, |r| r.deviance)),
        ("df_residual", count_column(rows, |r| r.df_residual)),
        ("nobs", count_column(rows, |r| r.nobs)),
    ])?)
}

/// Coefficient rows as a frame
pub fn tidy_frame(rows: &[CoefficientRow]) -> Result<DataFrame> {
    let terms: Vec<String> = rows.iter().map(|r| r.term.clone()).collect();

    Ok(DataFrame::from_columns(vec![
        ("term", Series::string(terms)),
        ("estimate", float_column(rows, |r| r.estimate)),
        ("std_error", opt_column(rows, |r| r.std_error)),
        ("statistic", opt_column(rows, |r| r.statistic)),
        ("p_value", opt_column(rows, |r| r.p_value)),
        ("conf_low", opt_column(rows, |r| r.conf_low)),
        ("conf_high", opt_column(rows, |r| r.conf_high)),
    ])?)
}

/// Observation rows as a frame
pub fn augment_frame(rows: &[ObservationRow]) -> Result<DataFrame> {
    Ok(DataFrame::from_columns(vec![
        ("row", count_column(rows, |r| r.row)),
        ("response", opt_column(rows, |r| r.response)),
        ("fitted", opt_column(rows, |r| r.fitted)),
        ("resid", opt_column(rows, |r| r.resid)),
        ("std_resid", opt_column(rows, |r| r.std_resid)),
        ("hat", opt_column(rows, |r| r.hat)),
        ("cooksd", opt_column(rows, |r| r.cooksd)),
    ])?)
}

fn opt_column<T>(rows: &[T], f: impl Fn(&T) -> Option<f64>) -> Series {
    let values: Vec<Option<f64>> = rows.iter().map(f).collect();
    Series::float_opt(&values)
}

fn float_column<T>(rows: &[T], f: impl Fn(&T) -> f64) -> Series {
    Series::float(rows.iter().map(f).collect::<Vec<_>>())
}

fn count_column<T>(rows: &[T], f: impl Fn(&T) -> usize) -> Series {
    Series::int(rows.iter().map(|r| f(r) as i64).collect::<Vec<_>>())
}
