//! Data operations for DataFrames

use super::*;

use std::cmp::Ordering;

/// Filter operation
#[derive(Debug)]
pub struct Filter<'a> {
    df: &'a DataFrame,
    mask: Vec<bool>,
}

impl<'a> Filter<'a> {
    /// Create a new filter operation
    pub fn new(df: &'a DataFrame) -> Self {
        Self {
            df,
            mask: vec![true; df.nrows()],
        }
    }

    /// Filter by column value
    ///
    /// The predicate sees [`SeriesValue::Null`] for missing cells.
    pub fn by_column<F>(mut self, col: &str, predicate: F) -> Result<Self>
    where
        F: Fn(&SeriesValue) -> bool,
    {
        let series = self.df.column(col)?;
        for (i, keep) in self.mask.iter_mut().enumerate() {
            let value = series.get(i).unwrap_or(SeriesValue::Null);
            if !predicate(&value) {
                *keep = false;
            }
        }
        Ok(self)
    }

    /// Keep rows where `|value| > threshold`; missing values never pass
    pub fn abs_greater(self, col: &str, threshold: f64) -> Result<Self> {
        let series = self.df.column(col)?;
        if !series.is_numeric() {
            return Err(DataError::TypeMismatch {
                column: col.to_string(),
                expected: "numeric",
                actual: series.dtype(),
            });
        }
        self.by_column(col, |v| v.as_f64().is_some_and(|x| x.abs() > threshold))
    }

    /// Drop rows with a missing value in any of `cols`
    pub fn complete<S: AsRef<str>>(mut self, cols: &[S]) -> Result<Self> {
        let complete = self.df.complete_cases(cols)?;
        for (keep, present) in self.mask.iter_mut().zip(complete) {
            *keep &= present;
        }
        Ok(self)
    }

    /// Filter by predicate on row
    pub fn by_row<F>(mut self, predicate: F) -> Result<Self>
    where
        F: Fn(&Row) -> bool,
    {
        for (i, row) in self.df.rows().enumerate() {
            if !predicate(&row) {
                self.mask[i] = false;
            }
        }
        Ok(self)
    }

    /// Execute the filter
    pub fn execute(self) -> Result<DataFrame> {
        self.df.filter(&self.mask)
    }
}

/// Select operation
#[derive(Debug)]
pub struct Select<'a> {
    df: &'a DataFrame,
    columns: Vec<String>,
}

impl<'a> Select<'a> {
    /// Create a new select operation
    pub fn new(df: &'a DataFrame) -> Self {
        Self {
            df,
            columns: Vec::new(),
        }
    }

    /// Add columns to select
    pub fn columns<S: AsRef<str>>(mut self, cols: &[S]) -> Self {
        self.columns
            .extend(cols.iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Add a column to select
    pub fn column<S: AsRef<str>>(mut self, col: S) -> Self {
        self.columns.push(col.as_ref().to_string());
        self
    }

    /// Execute the select
    pub fn execute(self) -> Result<DataFrame> {
        self.df.select(self.columns)
    }
}

/// Arrange (sort) operation
///
/// The sort is stable. Missing values are placed last whatever the direction.
#[derive(Debug)]
pub struct Arrange<'a> {
    df: &'a DataFrame,
    columns: Vec<(String, bool)>, // (column_name, ascending)
}

impl<'a> Arrange<'a> {
    /// Create a new arrange operation
    pub fn new(df: &'a DataFrame) -> Self {
        Self {
            df,
            columns: Vec::new(),
        }
    }

    /// Add a column to sort by
    pub fn by<S: Into<String>>(mut self, col: S, ascending: bool) -> Self {
        self.columns.push((col.into(), ascending));
        self
    }

    /// Execute the arrange
    pub fn execute(self) -> Result<DataFrame> {
        if self.columns.is_empty() {
            return Ok(self.df.clone());
        }

        let keys: Vec<(&Series, bool)> = self
            .columns
            .iter()
            .map(|(col, ascending)| Ok((self.df.column(col)?, *ascending)))
            .collect::<Result<_>>()?;

        let mut indices: Vec<usize> = (0..self.df.nrows()).collect();

        indices.sort_by(|&a, &b| {
            for (series, ascending) in &keys {
                let val_a = series.get(a).unwrap_or(SeriesValue::Null);
                let val_b = series.get(b).unwrap_or(SeriesValue::Null);

                let cmp = match (val_a.is_null(), val_b.is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => {
                        let cmp = match series.data() {
                            // factor order, not lexical order
                            SeriesData::Categorical(codes, _) => codes[a].cmp(&codes[b]),
                            _ => compare_values(&val_a, &val_b),
                        };
                        if *ascending {
                            cmp
                        } else {
                            cmp.reverse()
                        }
                    }
                };

                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            Ordering::Equal
        });

        self.df.take(&indices)
    }
}

fn compare_values(v1: &SeriesValue, v2: &SeriesValue) -> Ordering {
    match (v1, v2) {
        (SeriesValue::Float(f1), SeriesValue::Float(f2)) => f1.total_cmp(f2),
        (SeriesValue::Int(i1), SeriesValue::Int(i2)) => i1.cmp(i2),
        (SeriesValue::Bool(b1), SeriesValue::Bool(b2)) => b1.cmp(b2),
        (SeriesValue::String(s1), SeriesValue::String(s2)) => s1.cmp(s2),
        _ => Ordering::Equal, // Different types are considered equal
    }
}
