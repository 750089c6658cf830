//! Model-related error types

use thiserror::Error;

use detrend_core::data::DataError;
use detrend_core::formula::error::FormulaError;

/// Model-related errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// Formula parsing or evaluation error
    #[error("Formula error: {0}")]
    Formula(#[from] FormulaError),

    /// Data-related error
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Numerical computation error
    #[error("Numerical error: {message} (operation: {operation})")]
    NumericalError {
        /// Error message
        message: String,
        /// Operation that failed
        operation: String,
    },

    /// Fewer usable rows than model terms
    #[error("Not enough data: {n_samples} usable rows for {n_terms} model terms")]
    InsufficientData {
        /// Number of usable rows
        n_samples: usize,
        /// Number of design columns, intercept included
        n_terms: usize,
    },

    /// A predictor that cannot be estimated, such as a constant column
    #[error("Invalid model specification for '{column}': {reason}")]
    InvalidSpecification {
        /// Offending column or term
        column: String,
        /// What is wrong with it
        reason: String,
    },

    /// The design matrix does not have full column rank
    #[error("Design matrix is rank deficient: rank {rank} for {n_terms} columns")]
    RankDeficient {
        /// Numerical rank of the design matrix
        rank: usize,
        /// Number of design columns
        n_terms: usize,
    },

    /// Invalid model configuration
    #[error("Invalid model configuration: {message}")]
    InvalidConfig {
        /// Configuration error message
        message: String,
    },
}
