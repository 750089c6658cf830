//! Core data structures for detrend
//!
//! This module provides the tabular data layer: typed series with explicit
//! missing values, data frames, row-wise derived columns, filtering, sorting
//! and grouping.

mod builder;
mod dataframe;
pub mod group;
mod ops;
mod series;


// Re-exports
pub use builder::DataFrameBuilder;
pub use dataframe::{DataFrame, Row, RowIter};
pub use group::{key_columns, Aggregation, GroupBy, GroupKey, KeyPart};
pub use ops::{Arrange, Filter, Select};
pub use series::{Series, SeriesData, SeriesStats, SeriesValue};

// Type aliases for common use cases
pub type FloatArray = ndarray::Array1<f64>;
pub type IntArray = ndarray::Array1<i64>;
pub type BoolArray = ndarray::Array1<bool>;
pub type StringArray = Vec<String>;
pub type Matrix = ndarray::Array2<f64>;

/// Error types specific to data operations
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("Index out of bounds: index {index}, length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Invalid column type for '{column}': expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Operation requires numeric data, got {0}")]
    NonNumericData(&'static str),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for data operations
pub type Result<T> = std::result::Result<T, DataError>;
