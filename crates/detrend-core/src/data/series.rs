//! Series data structure for holding homogeneous data
//!
//! A Series is a one-dimensional typed array with an optional validity mask.
//! Missing slots are tracked in the mask, never encoded as sentinel values,
//! so a missing float is always distinguishable from `0.0`.

use super::*;

use ndarray::Array1;
use std::collections::{BTreeSet, HashMap};

/// Typed storage behind a [`Series`]
#[derive(Clone, Debug, PartialEq)]
pub enum SeriesData {
    /// Floating point numbers (f64)
    Float(FloatArray),
    /// Integer numbers (i64)
    Int(IntArray),
    /// Boolean values
    Bool(BoolArray),
    /// String values
    String(StringArray),
    /// Categorical data (codes into an ordered level list)
    Categorical(Array1<u32>, Vec<String>),
}

/// A typed, one-dimensional column of data with explicit missing values
#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    data: SeriesData,
    // `None` when every slot is present
    valid: Option<BoolArray>,
}

fn normalize_mask(valid: BoolArray) -> Option<BoolArray> {
    if valid.iter().all(|&v| v) {
        None
    } else {
        Some(valid)
    }
}

fn split_options<T: Default + Clone>(data: &[Option<T>]) -> (Vec<T>, BoolArray) {
    let values = data.iter().map(|v| v.clone().unwrap_or_default()).collect();
    let valid = data.iter().map(Option::is_some).collect();
    (values, valid)
}

impl Series {
    fn from_parts(data: SeriesData, valid: Option<BoolArray>) -> Self {
        Self {
            data,
            valid: valid.and_then(normalize_mask),
        }
    }

    /// Create a new Float series with every value present
    pub fn float(data: impl Into<FloatArray>) -> Self {
        Self::from_parts(SeriesData::Float(data.into()), None)
    }

    /// Create a Float series where `None` marks a missing value
    pub fn float_opt(data: &[Option<f64>]) -> Self {
        let (values, valid) = split_options(data);
        Self::from_parts(SeriesData::Float(Array1::from(values)), Some(valid))
    }

    /// Create a new Int series
    pub fn int(data: impl Into<IntArray>) -> Self {
        Self::from_parts(SeriesData::Int(data.into()), None)
    }

    /// Create an Int series where `None` marks a missing value
    pub fn int_opt(data: &[Option<i64>]) -> Self {
        let (values, valid) = split_options(data);
        Self::from_parts(SeriesData::Int(Array1::from(values)), Some(valid))
    }

    /// Create a new Bool series
    pub fn bool(data: impl Into<BoolArray>) -> Self {
        Self::from_parts(SeriesData::Bool(data.into()), None)
    }

    /// Create a Bool series where `None` marks a missing value
    pub fn bool_opt(data: &[Option<bool>]) -> Self {
        let (values, valid) = split_options(data);
        Self::from_parts(SeriesData::Bool(Array1::from(values)), Some(valid))
    }

    /// Create a new String series
    pub fn string(data: impl Into<StringArray>) -> Self {
        Self::from_parts(SeriesData::String(data.into()), None)
    }

    /// Create a String series where `None` marks a missing value
    pub fn string_opt<T: AsRef<str>>(data: &[Option<T>]) -> Self {
        let owned: Vec<Option<String>> = data
            .iter()
            .map(|v| v.as_ref().map(|s| s.as_ref().to_string()))
            .collect();
        let (values, valid) = split_options(&owned);
        Self::from_parts(SeriesData::String(values), Some(valid))
    }

    /// Create a new Categorical series with levels sorted lexically
    pub fn categorical<T: AsRef<str>>(data: &[T]) -> Self {
        let wrapped: Vec<Option<&str>> = data.iter().map(|s| Some(s.as_ref())).collect();
        Self::categorical_opt(&wrapped)
    }

    /// Create a Categorical series where `None` marks a missing value
    pub fn categorical_opt<T: AsRef<str>>(data: &[Option<T>]) -> Self {
        let levels: Vec<String> = data
            .iter()
            .flatten()
            .map(|s| s.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        // every observed value is a level, so encoding cannot fail
        match Self::factor_opt(data, &levels) {
            Ok(series) => series,
            Err(_) => unreachable!("levels are derived from the data"),
        }
    }

    /// Create a Categorical series with an explicit level order
    ///
    /// The first level is the reference level when the series is expanded
    /// into indicator columns.
    pub fn factor<T: AsRef<str>, L: AsRef<str>>(data: &[T], levels: &[L]) -> Result<Self> {
        let wrapped: Vec<Option<&str>> = data.iter().map(|s| Some(s.as_ref())).collect();
        Self::factor_opt(&wrapped, levels)
    }

    /// Create a Categorical series with an explicit level order and missing values
    pub fn factor_opt<T: AsRef<str>, L: AsRef<str>>(
        data: &[Option<T>],
        levels: &[L],
    ) -> Result<Self> {
        let levels: Vec<String> = levels.iter().map(|l| l.as_ref().to_string()).collect();
        let lookup: HashMap<&str, u32> = levels
            .iter()
            .enumerate()
            .map(|(i, level)| (level.as_str(), i as u32))
            .collect();

        if lookup.len() != levels.len() {
            return Err(DataError::InvalidParameter(
                "factor levels must be unique".to_string(),
            ));
        }

        let mut codes = Vec::with_capacity(data.len());
        let mut valid = Vec::with_capacity(data.len());
        for value in data {
            match value {
                Some(v) => {
                    let code = lookup.get(v.as_ref()).ok_or_else(|| {
                        DataError::InvalidParameter(format!(
                            "value '{}' is not a declared level",
                            v.as_ref()
                        ))
                    })?;
                    codes.push(*code);
                    valid.push(true);
                }
                None => {
                    codes.push(0);
                    valid.push(false);
                }
            }
        }

        Ok(Self::from_parts(
            SeriesData::Categorical(Array1::from(codes), levels),
            Some(Array1::from(valid)),
        ))
    }

    /// Get the typed storage
    pub fn data(&self) -> &SeriesData {
        &self.data
    }

    /// Get the length of the series
    pub fn len(&self) -> usize {
        match &self.data {
            SeriesData::Float(arr) => arr.len(),
            SeriesData::Int(arr) => arr.len(),
            SeriesData::Bool(arr) => arr.len(),
            SeriesData::String(arr) => arr.len(),
            SeriesData::Categorical(arr, _) => arr.len(),
        }
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the type name of the series
    pub fn dtype(&self) -> &'static str {
        match &self.data {
            SeriesData::Float(_) => "float64",
            SeriesData::Int(_) => "int64",
            SeriesData::Bool(_) => "bool",
            SeriesData::String(_) => "string",
            SeriesData::Categorical(_, _) => "categorical",
        }
    }

    /// Whether values of this series can enter a design matrix as numbers
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.data,
            SeriesData::Float(_) | SeriesData::Int(_) | SeriesData::Bool(_)
        )
    }

    /// Categorical levels, in reference-first order
    pub fn levels(&self) -> Option<&[String]> {
        match &self.data {
            SeriesData::Categorical(_, levels) => Some(levels),
            _ => None,
        }
    }

    /// Check whether the value at `idx` is missing
    ///
    /// Out-of-bounds indices report `false`.
    pub fn is_missing(&self, idx: usize) -> bool {
        match &self.valid {
            Some(valid) => valid.get(idx).map(|v| !v).unwrap_or(false),
            None => false,
        }
    }

    /// Number of missing values
    pub fn null_count(&self) -> usize {
        self.valid
            .as_ref()
            .map(|valid| valid.iter().filter(|v| !**v).count())
            .unwrap_or(0)
    }

    /// Per-row presence mask
    pub fn validity(&self) -> Vec<bool> {
        match &self.valid {
            Some(valid) => valid.to_vec(),
            None => vec![true; self.len()],
        }
    }

    /// Get a value at index
    ///
    /// Returns `None` when out of bounds and `Some(SeriesValue::Null)` for a missing slot.
    pub fn get(&self, idx: usize) -> Option<SeriesValue> {
        if idx >= self.len() {
            return None;
        }
        if self.is_missing(idx) {
            return Some(SeriesValue::Null);
        }

        match &self.data {
            SeriesData::Float(arr) => arr.get(idx).map(|&v| SeriesValue::Float(v)),
            SeriesData::Int(arr) => arr.get(idx).map(|&v| SeriesValue::Int(v)),
            SeriesData::Bool(arr) => arr.get(idx).map(|&v| SeriesValue::Bool(v)),
            SeriesData::String(arr) => arr.get(idx).map(|v| SeriesValue::String(v.clone())),
            SeriesData::Categorical(arr, cats) => arr
                .get(idx)
                .and_then(|&code| cats.get(code as usize))
                .map(|cat| SeriesValue::String(cat.clone())),
        }
    }

    /// Numeric value at index, `None` when missing, out of bounds or non-numeric
    pub fn get_f64(&self, idx: usize) -> Option<f64> {
        self.get(idx).and_then(|v| v.as_f64())
    }

    /// Numeric values with missing slots as `None`
    pub fn float_values(&self) -> Result<Vec<Option<f64>>> {
        if !self.is_numeric() {
            return Err(DataError::NonNumericData(self.dtype()));
        }
        Ok((0..self.len()).map(|i| self.get_f64(i)).collect())
    }

    /// Present numeric values only
    pub fn present_floats(&self) -> Result<Vec<f64>> {
        Ok(self.float_values()?.into_iter().flatten().collect())
    }

    /// Filter the series with a boolean mask
    pub fn filter(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.len() {
            return Err(DataError::DimensionMismatch {
                expected: format!("mask length {}", self.len()),
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

    /// Gather rows by position, in the given order
    pub fn take(&self, indices: &[usize]) -> Result<Self> {
        let len = self.len();
        if let Some(&bad) = indices.iter().find(|&&idx| idx >= len) {
            return Err(DataError::IndexOutOfBounds { index: bad, len });
        }

        let data = match &self.data {
            SeriesData::Float(arr) => SeriesData::Float(indices.iter().map(|&i| arr[i]).collect()),
            SeriesData::Int(arr) => SeriesData::Int(indices.iter().map(|&i| arr[i]).collect()),
            SeriesData::Bool(arr) => SeriesData::Bool(indices.iter().map(|&i| arr[i]).collect()),
            SeriesData::String(vec) => {
                SeriesData::String(indices.iter().map(|&i| vec[i].clone()).collect())
            }
            SeriesData::Categorical(arr, cats) => SeriesData::Categorical(
                indices.iter().map(|&i| arr[i]).collect(),
                cats.clone(),
            ),
        };

        let valid = self
            .valid
            .as_ref()
            .map(|valid| indices.iter().map(|&i| valid[i]).collect::<BoolArray>());

        Ok(Self::from_parts(data, valid))
    }

    /// Derive a Float series by applying `f` to every present value
    ///
    /// Missing inputs stay missing. Non-finite results (for example `log2(0.0)`)
    /// are stored as missing so they never reach a model fit.
    pub fn map_float<F>(&self, f: F) -> Result<Series>
    where
        F: Fn(f64) -> f64,
    {
        let values: Vec<Option<f64>> = self
            .float_values()?
            .into_iter()
            .map(|v| v.map(&f).filter(|r| r.is_finite()))
            .collect();
        Ok(Series::float_opt(&values))
    }

    /// Derive a Float series row-wise from two numeric series
    pub fn zip_float<F>(&self, other: &Series, f: F) -> Result<Series>
    where
        F: Fn(f64, f64) -> f64,
    {
        if other.len() != self.len() {
            return Err(DataError::DimensionMismatch {
                expected: format!("{} rows", self.len()),
                actual: format!("{} rows", other.len()),
            });
        }

        let values: Vec<Option<f64>> = self
            .float_values()?
            .into_iter()
            .zip(other.float_values()?)
            .map(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => Some(f(a, b)).filter(|r| r.is_finite()),
                _ => None,
            })
            .collect();
        Ok(Series::float_opt(&values))
    }

    /// Convert to a categorical series
    ///
    /// Integer levels are ordered numerically, string levels lexically,
    /// boolean levels as `false`, `true`.
    pub fn to_categorical(&self) -> Result<Series> {
        match &self.data {
            SeriesData::Categorical(_, _) => Ok(self.clone()),
            SeriesData::Int(arr) => {
                let levels: Vec<String> = arr
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !self.is_missing(*i))
                    .map(|(_, v)| *v)
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .map(|v| v.to_string())
                    .collect();
                let data: Vec<Option<String>> = arr
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (!self.is_missing(i)).then(|| v.to_string()))
                    .collect();
                Series::factor_opt(&data, &levels)
            }
            SeriesData::Bool(arr) => {
                let data: Vec<Option<String>> = arr
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (!self.is_missing(i)).then(|| v.to_string()))
                    .collect();
                Series::factor_opt(&data, &["false", "true"])
            }
            SeriesData::String(vec) => {
                let data: Vec<Option<&str>> = vec
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (!self.is_missing(i)).then_some(v.as_str()))
                    .collect();
                Ok(Series::categorical_opt(&data))
            }
            SeriesData::Float(_) => Err(DataError::InvalidParameter(
                "cannot convert a float64 series to categorical".to_string(),
            )),
        }
    }

    /// Compute basic statistics over present values of a numeric series
    pub fn describe(&self) -> Result<SeriesStats> {
        if let SeriesData::String(_) | SeriesData::Categorical(_, _) = &self.data {
            let unique_count = (0..self.len())
                .filter_map(|i| match self.get(i) {
                    Some(SeriesValue::String(s)) => Some(s),
                    _ => None,
                })
                .collect::<BTreeSet<_>>()
                .len();
            return Ok(SeriesStats {
                count: self.len() - self.null_count(),
                missing: self.null_count(),
                unique_count: Some(unique_count),
                ..SeriesStats::empty()
            });
        }

        let values = FloatArray::from(self.present_floats()?);
        if values.is_empty() {
            return Ok(SeriesStats {
                missing: self.null_count(),
                ..SeriesStats::empty()
            });
        }

        Ok(SeriesStats {
            count: values.len(),
            missing: self.null_count(),
            mean: values.mean().unwrap_or(f64::NAN),
            std: if values.len() > 1 { values.std(1.0) } else { f64::NAN },
            min: values.iter().fold(f64::INFINITY, |a, &b| a.min(b)),
            q25: quantile(&values, 0.25).unwrap_or(f64::NAN),
            q50: quantile(&values, 0.5).unwrap_or(f64::NAN),
            q75: quantile(&values, 0.75).unwrap_or(f64::NAN),
            max: values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
            unique_count: None,
        })
    }

    /// Mean of present values; `NaN` when nothing is present
    pub fn mean(&self) -> Result<f64> {
        let values = self.present_floats()?;
        if values.is_empty() {
            return Ok(f64::NAN);
        }
        Ok(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Standard deviation of present values
    pub fn std(&self, ddof: usize) -> Result<f64> {
        let values = FloatArray::from(self.present_floats()?);
        if values.len() <= ddof {
            return Ok(f64::NAN);
        }
        Ok(values.std(ddof as f64))
    }

    /// Sum of present values
    pub fn sum(&self) -> Result<f64> {
        Ok(self.present_floats()?.iter().sum())
    }

    /// Median of present values; `NaN` when nothing is present
    pub fn median(&self) -> Result<f64> {
        Ok(quantile(&FloatArray::from(self.present_floats()?), 0.5).unwrap_or(f64::NAN))
    }
}

/// Linear-interpolation quantile of `arr`
pub(crate) fn quantile(arr: &FloatArray, q: f64) -> Option<f64> {
    if arr.is_empty() {
        return None;
    }

    let mut sorted: Vec<f64> = arr.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let index = (n as f64 - 1.0) * q;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        Some(sorted[lower])
    } else {
        let weight = index - lower as f64;
        Some(sorted[lower] * (1.0 - weight) + sorted[upper] * weight)
    }
}

/// Statistical summary of a series
#[derive(Debug, Clone)]
pub struct SeriesStats {
    pub count: usize,
    pub missing: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
    pub unique_count: Option<usize>,
}

impl SeriesStats {
    pub(crate) fn empty() -> Self {
        Self {
            count: 0,
            missing: 0,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            q25: f64::NAN,
            q50: f64::NAN,
            q75: f64::NAN,
            max: f64::NAN,
            unique_count: None,
        }
    }
}

/// Enum for type-safe value access
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    String(String),
    Null,
}

impl SeriesValue {
    /// Numeric view of the value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SeriesValue::Float(v) => Some(*v),
            SeriesValue::Int(v) => Some(*v as f64),
            SeriesValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            SeriesValue::String(_) | SeriesValue::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SeriesValue::Null)
    }
}

impl std::fmt::Display for SeriesValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesValue::Float(v) => write!(f, "{}", v),
            SeriesValue::Int(v) => write!(f, "{}", v),
            SeriesValue::Bool(v) => write!(f, "{}", v),
            SeriesValue::String(v) => write!(f, "{}", v),
            SeriesValue::Null => write!(f, "NA"),
        }
    }
}
