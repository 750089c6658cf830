//! Linear models for trend removal
//!
//! This crate fits ordinary least squares models to the tables of
//! [`detrend_core`], independently per group, and extracts tidy model-level,
//! coefficient-level and observation-level summaries from the fits.
//!
//! ```
//! use detrend_core::data::{DataFrame, Series};
//! use detrend_models::detrend::remove_trend;
//! use detrend_models::lm::LinearConfig;
//!
//! let df = DataFrame::from_columns(vec![
//!     ("carat", Series::float(vec![0.3, 0.5, 1.0, 1.5, 2.0])),
//!     ("price", Series::float_opt(&[Some(500.0), Some(1400.0), None, Some(8000.0), Some(15000.0)])),
//! ])
//! .unwrap();
//!
//! let resid = remove_trend(&df, "log2(price) ~ log2(carat)", &LinearConfig::default()).unwrap();
//! assert_eq!(resid.len(), 5);
//! assert!(resid.is_missing(2));
//! ```

pub mod base;
pub mod detrend;
pub mod error;
pub mod grouped;
pub mod lm;
pub mod report;
pub mod tidy;

pub use base::{Coefficient, ModelResultTrait, ModelStatistics};
pub use error::ModelError;
pub use grouped::{fit_groups, GroupFailure, GroupFitConfig, GroupedModels};
pub use lm::{lm, FittedModel, LinearConfig, LinearRegression, MissingPolicy, StdResidKind};
pub use tidy::{augment, glance, tidy, CoefficientRow, ModelRow, ObservationRow};
