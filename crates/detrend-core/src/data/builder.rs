//! Incremental frame construction

use indexmap::IndexMap;

use super::*;

/// Collects named columns and validates them once, at [`build`](Self::build)
///
/// The first invalid column (duplicate name or wrong length) is remembered
/// and reported by `build`, so columns can be chained without intermediate
/// error handling.
#[derive(Debug, Default)]
pub struct DataFrameBuilder {
    columns: IndexMap<String, Series>,
    nrows: Option<usize>,
    error: Option<DataError>,
}

impl DataFrameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column
    pub fn with_column<S: Into<String>>(mut self, name: S, series: Series) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.push(name.into(), series) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Append a float column without missing values
    pub fn with_float<S: Into<String>>(self, name: S, values: Vec<f64>) -> Self {
        self.with_column(name, Series::float(values))
    }

    /// Append a categorical column with lexically sorted levels
    pub fn with_categorical<S: Into<String>>(self, name: S, values: &[&str]) -> Self {
        self.with_column(name, Series::categorical(values))
    }

    fn push(&mut self, name: String, series: Series) -> Result<()> {
        if self.columns.contains_key(&name) {
            return Err(DataError::DuplicateColumn(name));
        }
        match self.nrows {
            Some(n) if series.len() != n => {
                return Err(DataError::DimensionMismatch {
                    expected: format!("{} rows in column '{}'", n, name),
                    actual: format!("{} rows", series.len()),
                });
            }
            None => self.nrows = Some(series.len()),
            _ => {}
        }
        self.columns.insert(name, series);
        Ok(())
    }

    /// Finish the frame, or return the first column error
    pub fn build(self) -> Result<DataFrame> {
        if let Some(e) = self.error {
            return Err(e);
        }
        Ok(DataFrame {
            columns: self.columns,
            nrows: self.nrows.unwrap_or(0),
        })
    }
}
