//! Independent per-group model fitting
//!
//! The rows of a table are partitioned once by the key columns; every group
//! is then fitted on its own rows only, with the same formula and
//! configuration. A group that cannot be fitted is recorded as a
//! [`GroupFailure`] and the remaining groups are unaffected.
//!
//! Fitted models keep the indices of the rows they used in the original
//! table, so observation summaries and residual columns line up with it.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::base::{ModelError, Result};
use crate::lm::{FittedModel, LinearConfig, LinearRegression};
use crate::tidy::{augment, augment_frame, glance, glance_frame, tidy, tidy_frame};
use detrend_core::data::{key_columns, DataFrame, GroupBy, GroupKey, Series};
use detrend_core::formula::Formula;


/// Configuration for a grouped fit
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupFitConfig {
    /// Configuration applied to every group's model
    pub linear: LinearConfig,
    /// Fit groups on the rayon thread pool; ignored without the `parallel`
    /// feature
    pub parallel: bool,
}

/// A group whose model could not be fitted
#[derive(Debug, Clone, PartialEq)]
pub struct GroupFailure {
    pub key: GroupKey,
    pub error: ModelError,
}

impl fmt::Display for GroupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group [{}]: {}", self.key, self.error)
    }
}

/// Models fitted independently per group
#[derive(Debug, Clone)]
pub struct GroupedModels {
    keys: Vec<String>,
    /// Zero-row frame of the key columns
    key_template: DataFrame,
    fits: IndexMap<GroupKey, FittedModel>,
    failures: Vec<GroupFailure>,
    n_input: usize,
}

/// Fit `formula` separately within each group of `df`
///
/// Groups are visited in first-encounter order and every output keeps that
/// order. Errors in the formula or the key columns fail the whole call;
/// errors fitting a group are collected in [`GroupedModels::failures`].
pub fn fit_groups<S: AsRef<str>>(
    df: &DataFrame,
    keys: &[S],
    formula: &str,
    config: &GroupFitConfig,
) -> Result<GroupedModels> {
    config.linear.validate()?;
    let model = LinearRegression::from_formula(Formula::parse(formula)?).config(config.linear);
    let groups = GroupBy::new(df, keys)?;

    info!(
        "Fitting {} on {} rows in {} groups",
        model.formula(),
        df.nrows(),
        groups.len()
    );

    let fit_one = |rows: &[usize]| -> Result<FittedModel> {
        let subset = df.take(rows)?;
        let mut fit = model.fit(&subset)?;
        fit.remap_rows(rows, df.nrows());
        Ok(fit)
    };

    let partition: Vec<(&GroupKey, &Vec<usize>)> = groups.groups().iter().collect();
    let outcomes = fit_partition(&partition, config.parallel, fit_one);

    let mut fits = IndexMap::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for ((key, rows), outcome) in partition.into_iter().zip(outcomes) {
        match outcome {
            Ok(fit) => {
                debug!(
                    "Group [{}]: {} of {} rows used, R-squared {:?}",
                    key,
                    fit.rows().len(),
                    rows.len(),
                    fit.statistics.r_squared
                );
                fits.insert(key.clone(), fit);
            }
            Err(error) => {
                warn!("Group [{}] ({} rows) not fitted: {}", key, rows.len(), error);
                failures.push(GroupFailure {
                    key: key.clone(),
                    error,
                });
            }
        }
    }

    info!(
        "Grouped fit complete: {} fitted, {} failed",
        fits.len(),
        failures.len()
    );

    Ok(GroupedModels {
        keys: groups.keys().to_vec(),
        key_template: groups.key_template()?,
        fits,
        failures,
        n_input: df.nrows(),
    })
}

#[cfg(not(feature = "parallel"))]
fn fit_partition<F>(
    partition: &[(&GroupKey, &Vec<usize>)],
    _parallel: bool,
    fit_one: F,
) -> Vec<Result<FittedModel>>
where
    F: Fn(&[usize]) -> Result<FittedModel> + Sync,
{
    partition.iter().map(|(_, rows)| fit_one(rows.as_slice())).collect()
}

#[cfg(feature = "parallel")]
fn fit_partition<F>(
    partition: &[(&GroupKey, &Vec<usize>)],
    parallel: bool,
    fit_one: F,
) -> Vec<Result<FittedModel>>
where
    F: Fn(&[usize]) -> Result<FittedModel> + Sync,
{
    use rayon::prelude::*;

    if parallel {
        // collect keeps the input order
        partition.par_iter().map(|(_, rows)| fit_one(rows.as_slice())).collect()
    } else {
        partition.iter().map(|(_, rows)| fit_one(rows.as_slice())).collect()
    }
}

impl GroupedModels {
    /// Names of the key columns
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Fitted models by group, in first-encounter order
    pub fn fits(&self) -> &IndexMap<GroupKey, FittedModel> {
        &self.fits
    }

    /// Groups that could not be fitted, in first-encounter order
    pub fn failures(&self) -> &[GroupFailure] {
        &self.failures
    }

    /// Model of one group
    pub fn get(&self, key: &GroupKey) -> Option<&FittedModel> {
        self.fits.get(key)
    }

    /// Number of groups fitted or failed
    pub fn n_groups(&self) -> usize {
        self.fits.len() + self.failures.len()
    }

    /// One model-level row per fitted group, key columns first
    pub fn glance(&self) -> Result<DataFrame> {
        let rows: Vec<_> = self.fits.values().map(glance).collect();
        self.with_keys(self.fits.keys().collect(), glance_frame(&rows)?)
    }

    /// One row per term of each fitted group, key columns first
    pub fn tidy(&self) -> Result<DataFrame> {
        let mut keys = Vec::new();
        let mut rows = Vec::new();
        for (key, fit) in &self.fits {
            let terms = tidy(fit);
            keys.extend(std::iter::repeat(key).take(terms.len()));
            rows.extend(terms);
        }
        self.with_keys(keys, tidy_frame(&rows)?)
    }

    /// One row per observation of each fitted group, key columns first
    ///
    /// The `row` column indexes the table the groups were fitted on.
    pub fn augment(&self) -> Result<DataFrame> {
        let mut keys = Vec::new();
        let mut rows = Vec::new();
        for (key, fit) in &self.fits {
            let observations = augment(fit);
            keys.extend(std::iter::repeat(key).take(observations.len()));
            rows.extend(observations);
        }
        self.with_keys(keys, augment_frame(&rows)?)
    }

    /// Residuals aligned with the fitted table
    ///
    /// Rows excluded from their group's fit and rows of failed groups are
    /// missing.
    pub fn residual_column(&self) -> Series {
        let mut values = vec![None; self.n_input];
        for fit in self.fits.values() {
            for (&row, &resid) in fit.rows().iter().zip(fit.residuals.iter()) {
                values[row] = Some(resid);
            }
        }
        Series::float_opt(&values)
    }

    fn with_keys(&self, keys: Vec<&GroupKey>, frame: DataFrame) -> Result<DataFrame> {
        let mut columns = key_columns(&self.key_template, keys)?;
        for (name, series) in frame.iter_columns() {
            columns.push((name.to_string(), series.clone()));
        }
        Ok(DataFrame::from_columns(columns)?)
    }
}
