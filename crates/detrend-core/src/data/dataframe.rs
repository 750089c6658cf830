//! DataFrame implementation for tabular data
//!
//! A DataFrame is a 2-dimensional labeled data structure with columns of
//! potentially different types. Column types are fixed once inserted; derived
//! columns are recomputed from their inputs, never edited in place.

use super::*;

use indexmap::IndexMap;

/// Main DataFrame structure
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataFrame {
    pub(crate) columns: IndexMap<String, Series>,
    pub(crate) nrows: usize,
}

impl DataFrame {
    /// Create an empty DataFrame
    pub fn new() -> Self {
        Self::default()
    }

    /// Create DataFrame from columns
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Series)>,
        S: Into<String>,
    {
        let mut builder = DataFrameBuilder::new();

        for (name, series) in columns.into_iter() {
            builder = builder.with_column(name, series);
        }

        builder.build()
    }

    /// Get the shape of the DataFrame (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.columns.len())
    }

    /// Get the number of rows
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Get the number of columns
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(|k| k.as_str()).collect()
    }

    /// Get a reference to a column
    pub fn get_column(&self, name: &str) -> Option<&Series> {
        self.columns.get(name)
    }

    /// Get a column or fail with [`DataError::ColumnNotFound`]
    pub fn column(&self, name: &str) -> Result<&Series> {
        self.columns
            .get(name)
            .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))
    }

    /// Check if column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Iterate over `(name, series)` pairs in column order
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &Series)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Select specific columns
    pub fn select<I, S>(&self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = DataFrameBuilder::new();

        for name in names.into_iter() {
            let name = name.as_ref();
            builder = builder.with_column(name, self.column(name)?.clone());
        }

        let mut selected = builder.build()?;
        // keep the row count even when no columns were picked
        selected.nrows = self.nrows;
        Ok(selected)
    }

    /// Filter rows with a boolean mask
    pub fn filter(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.nrows {
            return Err(DataError::DimensionMismatch {
                expected: format!("mask length {}", self.nrows),
                actual: format!("mask length {}", mask.len()),
            });
        }

        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter(|(_, keep)| **keep)
            .map(|(i, _)| i)
            .collect();

        self.take(&indices)
    }

    /// Filter rows with a predicate
    pub fn filter_with<F>(&self, predicate: F) -> Result<Self>
    where
        F: Fn(&Row) -> bool,
    {
        let mask: Vec<bool> = self.rows().map(|row| predicate(&row)).collect();
        self.filter(&mask)
    }

    /// Gather rows by position, in the given order
    pub fn take(&self, indices: &[usize]) -> Result<Self> {
        let mut columns = IndexMap::with_capacity(self.columns.len());
        for (name, series) in &self.columns {
            columns.insert(name.clone(), series.take(indices)?);
        }

        if let Some(&bad) = indices.iter().find(|&&idx| idx >= self.nrows) {
            return Err(DataError::IndexOutOfBounds {
                index: bad,
                len: self.nrows,
            });
        }

        Ok(Self {
            columns,
            nrows: indices.len(),
        })
    }

    /// Add a new column
    pub fn with_column<S: Into<String>>(mut self, name: S, series: Series) -> Result<Self> {
        let name = name.into();

        if self.columns.contains_key(&name) {
            return Err(DataError::DuplicateColumn(name));
        }

        if !self.columns.is_empty() && series.len() != self.nrows {
            return Err(DataError::DimensionMismatch {
                expected: format!("{} rows", self.nrows),
                actual: format!("{} rows", series.len()),
            });
        }

        if self.columns.is_empty() {
            self.nrows = series.len();
        }

        self.columns.insert(name, series);
        Ok(self)
    }

    /// Add or replace a derived column computed from the current frame
    ///
    /// ```
    /// use detrend_core::data::{DataFrame, Series};
    ///
    /// let df = DataFrame::from_columns(vec![("price", Series::float(vec![1.0, 8.0]))])
    ///     .unwrap()
    ///     .derive("lprice", |df| df.column("price")?.map_float(f64::log2))
    ///     .unwrap();
    /// assert_eq!(df.column("lprice").unwrap().get_f64(1), Some(3.0));
    /// ```
    pub fn derive<S, F>(mut self, name: S, derive: F) -> Result<Self>
    where
        S: Into<String>,
        F: FnOnce(&DataFrame) -> Result<Series>,
    {
        let name = name.into();
        let series = derive(&self)?;

        if !self.columns.is_empty() && series.len() != self.nrows {
            return Err(DataError::DimensionMismatch {
                expected: format!("{} rows", self.nrows),
                actual: format!("{} rows", series.len()),
            });
        }
        if self.columns.is_empty() {
            self.nrows = series.len();
        }

        self.columns.insert(name, series);
        Ok(self)
    }

    /// Drop columns
    pub fn drop<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self> {
        for name in names {
            let name = name.as_ref();
            if self.columns.shift_remove(name).is_none() {
                return Err(DataError::ColumnNotFound(name.to_string()));
            }
        }

        Ok(self)
    }

    /// Rows where every listed column holds a value
    pub fn complete_cases<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<bool>> {
        let mut mask = vec![true; self.nrows];
        for name in names {
            let series = self.column(name.as_ref())?;
            for (keep, present) in mask.iter_mut().zip(series.validity()) {
                *keep &= present;
            }
        }
        Ok(mask)
    }

    /// Get a row as a Row view
    pub fn get_row(&self, idx: usize) -> Result<Row<'_>> {
        if idx >= self.nrows {
            return Err(DataError::IndexOutOfBounds {
                index: idx,
                len: self.nrows,
            });
        }

        Ok(Row {
            df: self,
            row_idx: idx,
        })
    }

    /// Iterate over rows
    pub fn rows(&self) -> RowIter<'_> {
        RowIter {
            df: self,
            current: 0,
        }
    }

    /// Descriptive statistics for every numeric column, one row per column
    pub fn describe(&self) -> Result<DataFrame> {
        let mut names = Vec::new();
        let mut count = Vec::new();
        let mut missing = Vec::new();
        let mut mean = Vec::new();
        let mut std = Vec::new();
        let mut min = Vec::new();
        let mut max = Vec::new();

        for (name, series) in self.columns.iter().filter(|(_, s)| s.is_numeric()) {
            let stats = series.describe()?;
            names.push(name.clone());
            count.push(stats.count as i64);
            missing.push(stats.missing as i64);
            mean.push(stats.mean);
            std.push(stats.std);
            min.push(stats.min);
            max.push(stats.max);
        }

        DataFrame::from_columns(vec![
            ("column", Series::string(names)),
            ("count", Series::int(count)),
            ("missing", Series::int(missing)),
            ("mean", Series::float(mean)),
            ("std", Series::float(std)),
            ("min", Series::float(min)),
            ("max", Series::float(max)),
        ])
    }
}

/// Row view into a DataFrame
pub struct Row<'a> {
    df: &'a DataFrame,
    row_idx: usize,
}

impl<'a> Row<'a> {
    /// Position of this row in its frame
    pub fn index(&self) -> usize {
        self.row_idx
    }

    /// Get a value from the row
    pub fn get(&self, col: &str) -> Result<SeriesValue> {
        let series = self.df.column(col)?;
        Ok(series.get(self.row_idx).unwrap_or(SeriesValue::Null))
    }

    /// Get value as float, `None` when missing or non-numeric
    pub fn get_float(&self, col: &str) -> Result<Option<f64>> {
        Ok(self.get(col)?.as_f64())
    }

    /// Get value as string, `None` when missing or not a string/categorical
    pub fn get_string(&self, col: &str) -> Result<Option<String>> {
        match self.get(col)? {
            SeriesValue::String(v) => Ok(Some(v)),
            _ => Ok(None),
        }
    }

    /// Whether the value in `col` is missing
    pub fn is_missing(&self, col: &str) -> Result<bool> {
        Ok(self.df.column(col)?.is_missing(self.row_idx))
    }
}

/// Iterator over rows
pub struct RowIter<'a> {
    df: &'a DataFrame,
    current: usize,
}

impl<'a> Iterator for RowIter<'a> {
    type Item = Row<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current < self.df.nrows {
            let row = Row {
                df: self.df,
                row_idx: self.current,
            };
            self.current += 1;
            Some(row)
        } else {
            None
        }
    }
}

impl std::fmt::Display for DataFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "DataFrame({} rows × {} cols)", self.nrows, self.ncols())?;
        writeln!(f, "{}", self.column_names().join("\t"))?;
        for row in self.rows() {
            let cells: Vec<String> = self
                .columns
                .values()
                .map(|s| {
                    s.get(row.index())
                        .map(|v| v.to_string())
                        .unwrap_or_default()
                })
                .collect();
            writeln!(f, "{}", cells.join("\t"))?;
        }
        Ok(())
    }
}
