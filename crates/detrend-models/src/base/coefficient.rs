//! Per-term estimates and their inference

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use detrend_core::formula::INTERCEPT;

/// Estimate of one design column with its t inference
///
/// Inference fields are `None` when they are not finite, as happens for a
/// model that fits its data exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    /// Design column name, e.g. `cutGood`
    pub name: String,
    pub estimate: f64,
    pub std_error: Option<f64>,
    pub t_stat: Option<f64>,
    /// Two-sided p-value
    pub p_value: Option<f64>,
    pub ci_lower: Option<f64>,
    pub ci_upper: Option<f64>,
    pub is_intercept: bool,
}

impl Coefficient {
    /// Point estimate without inference
    pub fn new(name: impl Into<String>, estimate: f64) -> Self {
        let name = name.into();
        Self {
            is_intercept: name == INTERCEPT,
            name,
            estimate,
            std_error: None,
            t_stat: None,
            p_value: None,
            ci_lower: None,
            ci_upper: None,
        }
    }

    /// Estimate with standard error `std_error`, tested against `t_dist`
    ///
    /// The interval is `estimate ± t_critical · std_error`.
    pub(crate) fn inferred(
        name: impl Into<String>,
        estimate: f64,
        std_error: f64,
        t_dist: &StudentsT,
        t_critical: f64,
    ) -> Self {
        let t = estimate / std_error;
        let half_width = t_critical * std_error;
        Self {
            std_error: finite(std_error),
            t_stat: finite(t),
            p_value: finite(t).map(|t| (2.0 * t_dist.sf(t.abs())).min(1.0)),
            ci_lower: finite(estimate - half_width),
            ci_upper: finite(estimate + half_width),
            ..Self::new(name, estimate)
        }
    }
}

pub(crate) fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
