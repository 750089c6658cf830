//! Grouping and per-group summaries
//!
//! A [`GroupBy`] partitions the rows of a frame by the values of one or more
//! key columns. The partition is computed once; groups appear in the order
//! their first row is encountered, every row belongs to exactly one group,
//! and rows with a missing key value form their own `NA` group.

use super::*;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One component of a group key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyPart {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl KeyPart {
    fn from_value(value: SeriesValue) -> Option<Self> {
        match value {
            SeriesValue::Null => Some(KeyPart::Null),
            SeriesValue::Bool(b) => Some(KeyPart::Bool(b)),
            SeriesValue::Int(i) => Some(KeyPart::Int(i)),
            SeriesValue::String(s) => Some(KeyPart::Str(s)),
            SeriesValue::Float(_) => None,
        }
    }

    fn to_value(&self) -> SeriesValue {
        match self {
            KeyPart::Null => SeriesValue::Null,
            KeyPart::Bool(b) => SeriesValue::Bool(*b),
            KeyPart::Int(i) => SeriesValue::Int(*i),
            KeyPart::Str(s) => SeriesValue::String(s.clone()),
        }
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Null => write!(f, "NA"),
            KeyPart::Bool(b) => write!(f, "{}", b),
            KeyPart::Int(i) => write!(f, "{}", i),
            KeyPart::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Values of the key columns identifying one group
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey(Vec<KeyPart>);

impl GroupKey {
    pub fn new(parts: Vec<KeyPart>) -> Self {
        Self(parts)
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }
}

impl From<&str> for GroupKey {
    fn from(value: &str) -> Self {
        GroupKey(vec![KeyPart::Str(value.to_string())])
    }
}

impl From<i64> for GroupKey {
    fn from(value: i64) -> Self {
        GroupKey(vec![KeyPart::Int(value)])
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Summary function applied to the present values of each group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    Count,
    Sum,
    Mean,
    Median,
    Min,
    Max,
    Std,
}

impl Aggregation {
    /// Output column name used by [`GroupBy::summarise`]
    pub fn name(&self) -> &'static str {
        match self {
            Aggregation::Count => "count",
            Aggregation::Sum => "sum",
            Aggregation::Mean => "mean",
            Aggregation::Median => "median",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Std => "std",
        }
    }

    fn apply(&self, series: &Series) -> Result<Option<f64>> {
        let present = series.present_floats()?;
        if present.is_empty() {
            return Ok(match self {
                Aggregation::Count | Aggregation::Sum => Some(0.0),
                _ => None,
            });
        }

        let value = match self {
            Aggregation::Count => present.len() as f64,
            Aggregation::Sum => series.sum()?,
            Aggregation::Mean => series.mean()?,
            Aggregation::Median => series.median()?,
            Aggregation::Min => present.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Max => present.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Std => series.std(1)?,
        };

        Ok(Some(value).filter(|v| v.is_finite()))
    }
}

/// Partition of a frame's rows by key columns
#[derive(Debug, Clone)]
pub struct GroupBy<'a> {
    df: &'a DataFrame,
    keys: Vec<String>,
    groups: IndexMap<GroupKey, Vec<usize>>,
}

impl<'a> GroupBy<'a> {
    /// Partition `df` by the listed key columns
    pub fn new<S: AsRef<str>>(df: &'a DataFrame, keys: &[S]) -> Result<Self> {
        if keys.is_empty() {
            return Err(DataError::InvalidParameter(
                "at least one group key column is required".to_string(),
            ));
        }

        let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
        let key_series: Vec<&Series> = keys
            .iter()
            .map(|k| {
                let series = df.column(k)?;
                if let SeriesData::Float(_) = series.data() {
                    return Err(DataError::TypeMismatch {
                        column: k.clone(),
                        expected: "categorical, string, int or bool",
                        actual: series.dtype(),
                    });
                }
                Ok(series)
            })
            .collect::<Result<_>>()?;

        let mut groups: IndexMap<GroupKey, Vec<usize>> = IndexMap::new();
        for row in 0..df.nrows() {
            let parts = key_series
                .iter()
                .map(|s| {
                    s.get(row)
                        .and_then(KeyPart::from_value)
                        .unwrap_or(KeyPart::Null)
                })
                .collect();
            groups.entry(GroupKey(parts)).or_default().push(row);
        }

        Ok(Self { df, keys, groups })
    }

    /// Names of the key columns
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Row indices of each group, in first-encounter order
    pub fn groups(&self) -> &IndexMap<GroupKey, Vec<usize>> {
        &self.groups
    }

    /// Row indices of one group
    pub fn indices(&self, key: &GroupKey) -> Option<&[usize]> {
        self.groups.get(key).map(|rows| rows.as_slice())
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Zero-row frame holding the key columns with their types and levels
    pub fn key_template(&self) -> Result<DataFrame> {
        self.df.select(&self.keys)?.take(&[])
    }

    /// One key column per key, each with one row per listed group
    pub fn key_columns<'k, I>(&self, keys: I) -> Result<Vec<(String, Series)>>
    where
        I: IntoIterator<Item = &'k GroupKey>,
    {
        key_columns(&self.key_template()?, keys)
    }

    /// Number of rows in each group, as column `n`
    pub fn count(&self) -> Result<DataFrame> {
        let counts: Vec<i64> = self.groups.values().map(|rows| rows.len() as i64).collect();
        self.frame_with(Series::int(counts), "n")
    }

    /// Apply `agg` to `column` within each group
    ///
    /// The result holds the key columns followed by a column named after the
    /// aggregation. Groups without any present value yield a missing value.
    pub fn summarise(&self, column: &str, agg: Aggregation) -> Result<DataFrame> {
        let series = self.df.column(column)?;
        if !series.is_numeric() {
            return Err(DataError::TypeMismatch {
                column: column.to_string(),
                expected: "numeric",
                actual: series.dtype(),
            });
        }

        let values: Vec<Option<f64>> = self
            .groups
            .values()
            .map(|rows| agg.apply(&series.take(rows)?))
            .collect::<Result<_>>()?;

        self.frame_with(Series::float_opt(&values), agg.name())
    }

    fn frame_with(&self, values: Series, name: &str) -> Result<DataFrame> {
        let mut columns = self.key_columns(self.groups.keys())?;
        columns.push((name.to_string(), values));
        DataFrame::from_columns(columns)
    }
}

/// Rebuild key columns for `keys` from a template of the key columns
///
/// Output columns keep the template's types; categorical keys keep their
/// level order.
pub fn key_columns<'k, I>(template: &DataFrame, keys: I) -> Result<Vec<(String, Series)>>
where
    I: IntoIterator<Item = &'k GroupKey>,
{
    let keys: Vec<&GroupKey> = keys.into_iter().collect();

    template
        .iter_columns()
        .enumerate()
        .map(|(pos, (name, source))| {
            let values: Vec<SeriesValue> = keys
                .iter()
                .map(|key| {
                    key.parts()
                        .get(pos)
                        .map(KeyPart::to_value)
                        .unwrap_or(SeriesValue::Null)
                })
                .collect();
            Ok((name.to_string(), rebuild_key_series(source, &values)?))
        })
        .collect()
}

fn rebuild_key_series(source: &Series, values: &[SeriesValue]) -> Result<Series> {
    match source.data() {
        SeriesData::Categorical(_, levels) => {
            let labels: Vec<Option<String>> = values
                .iter()
                .map(|v| match v {
                    SeriesValue::String(s) => Some(s.clone()),
                    _ => None,
                })
                .collect();
            Series::factor_opt(&labels, levels)
        }
        SeriesData::String(_) => {
            let labels: Vec<Option<&str>> = values
                .iter()
                .map(|v| match v {
                    SeriesValue::String(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect();
            Ok(Series::string_opt(&labels))
        }
        SeriesData::Int(_) => {
            let ints: Vec<Option<i64>> = values
                .iter()
                .map(|v| match v {
                    SeriesValue::Int(i) => Some(*i),
                    _ => None,
                })
                .collect();
            Ok(Series::int_opt(&ints))
        }
        SeriesData::Bool(_) => {
            let bools: Vec<Option<bool>> = values
                .iter()
                .map(|v| match v {
                    SeriesValue::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            Ok(Series::bool_opt(&bools))
        }
        SeriesData::Float(_) => Err(DataError::NonNumericData("float64 group key")),
    }
}
