//! Aggregation and reporting over summary tables
//!
//! Thin helpers over the frame operations for the questions usually asked
//! of tidy model output: which observations stand out, how many per group,
//! and in what order to show them. None of them resorts rows unless asked.

use std::fmt;

use crate::base::Result;
use crate::grouped::{GroupFailure, GroupedModels};
use detrend_core::data::{Aggregation, Arrange, DataFrame, Filter, GroupBy, SeriesValue};


/// Rows of `df` where `|column| > threshold`
///
/// Missing values are never selected. Row order is preserved.
pub fn threshold(df: &DataFrame, column: &str, threshold: f64) -> Result<DataFrame> {
    Ok(Filter::new(df).abs_greater(column, threshold)?.execute()?)
}

/// Number of rows per distinct value of `keys`, as column `n`
pub fn count_by<S: AsRef<str>>(df: &DataFrame, keys: &[S]) -> Result<DataFrame> {
    Ok(GroupBy::new(df, keys)?.count()?)
}

/// `agg` of `column` per distinct value of `keys`
pub fn summarise_by<S: AsRef<str>>(
    df: &DataFrame,
    keys: &[S],
    column: &str,
    agg: Aggregation,
) -> Result<DataFrame> {
    Ok(GroupBy::new(df, keys)?.summarise(column, agg)?)
}

/// Stable sort of `df` by `column`; missing values last
pub fn order_by(df: &DataFrame, column: &str, descending: bool) -> Result<DataFrame> {
    Ok(Arrange::new(df).by(column, !descending).execute()?)
}

/// The three summary tables of a grouped fit with its failed groups
#[derive(Debug, Clone)]
pub struct Report {
    pub models: DataFrame,
    pub coefficients: DataFrame,
    pub observations: DataFrame,
    pub failures: Vec<GroupFailure>,
}

impl Report {
    /// Collect the summary tables of `grouped`
    pub fn new(grouped: &GroupedModels) -> Result<Self> {
        Ok(Self {
            models: grouped.glance()?,
            coefficients: grouped.tidy()?,
            observations: grouped.augment()?,
            failures: grouped.failures().to_vec(),
        })
    }

    /// Observations whose standardised residual exceeds `limit` in magnitude
    pub fn outliers(&self, limit: f64) -> Result<DataFrame> {
        threshold(&self.observations, "std_resid", limit)
    }

    /// Coefficient rows of one term across groups
    pub fn term(&self, term: &str) -> Result<DataFrame> {
        Ok(Filter::new(&self.coefficients)
            .by_column("term", |v| matches!(v, SeriesValue::String(t) if t == term))?
            .execute()?)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} models, {} coefficients, {} observations",
            self.models.nrows(),
            self.coefficients.nrows(),
            self.observations.nrows()
        )?;
        if !self.failures.is_empty() {
            writeln!(f, "{} groups failed:", self.failures.len())?;
            for failure in &self.failures {
                writeln!(f, "  {}", failure)?;
            }
        }
        Ok(())
    }
}
