//! Trend removal through linear-model residuals
//!
//! The residual of a regression is the response with the linear effect of
//! the predictors subtracted out. When the response is a logarithm the
//! residual is a log-ratio of actual to predicted, and [`LogBase`] turns it
//! back into that ratio.
//!
//! Every function here returns residuals aligned row for row with its input.
//! Rows that could not enter a fit hold a missing value.

use serde::{Deserialize, Serialize};

use crate::base::Result;
use crate::grouped::{fit_groups, GroupFailure, GroupFitConfig};
use crate::lm::{LinearConfig, LinearRegression};
use detrend_core::data::{DataFrame, Series};


/// Residuals of `formula` fitted on `df`, one per row of `df`
pub fn remove_trend(df: &DataFrame, formula: &str, config: &LinearConfig) -> Result<Series> {
    let fit = LinearRegression::new(formula)?.config(*config).fit(df)?;
    Ok(Series::float_opt(&fit.residuals_aligned()))
}

/// Add the residuals of `formula` to `df` as `column`
///
/// An existing column of that name is replaced.
pub fn with_residuals(
    df: DataFrame,
    formula: &str,
    column: &str,
    config: &LinearConfig,
) -> Result<DataFrame> {
    let resid = remove_trend(&df, formula, config)?;
    Ok(df.derive(column, |_| Ok(resid))?)
}

/// Add the residuals of per-group fits of `formula` to `df` as `column`
///
/// Rows of groups that could not be fitted are missing; those groups are
/// returned alongside the frame.
pub fn remove_trend_by<S: AsRef<str>>(
    df: DataFrame,
    keys: &[S],
    formula: &str,
    column: &str,
    config: &GroupFitConfig,
) -> Result<(DataFrame, Vec<GroupFailure>)> {
    let grouped = fit_groups(&df, keys, formula, config)?;
    let resid = grouped.residual_column();
    let failures = grouped.failures().to_vec();
    Ok((df.derive(column, |_| Ok(resid))?, failures))
}

/// Base of the logarithm applied to a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogBase {
    #[default]
    Two,
    E,
    Ten,
}

impl LogBase {
    /// Logarithm of `x` in this base
    pub fn log(self, x: f64) -> f64 {
        match self {
            LogBase::Two => x.log2(),
            LogBase::E => x.ln(),
            LogBase::Ten => x.log10(),
        }
    }

    /// Ratio of actual to predicted for a residual on the log scale
    pub fn back_transform(self, residual: f64) -> f64 {
        match self {
            LogBase::Two => residual.exp2(),
            LogBase::E => residual.exp(),
            LogBase::Ten => 10f64.powf(residual),
        }
    }

    /// Name of the matching formula function, e.g. `log2`
    pub fn function_name(self) -> &'static str {
        match self {
            LogBase::Two => "log2",
            LogBase::E => "log",
            LogBase::Ten => "log10",
        }
    }
}

/// Back-transform a column of log-scale residuals into ratios
pub fn ratio_column(residuals: &Series, base: LogBase) -> Result<Series> {
    Ok(residuals.map_float(|r| base.back_transform(r))?)
}
