//! R-style formula parsing and design matrix construction
//!
//! This module provides formula parsing similar to R's formula syntax,
//! used for specifying statistical models, and turns a formula plus a
//! [`DataFrame`] into a [`ModelFrame`]: the response vector and design
//! matrix over the rows that can enter the model.
//!
//! Categorical terms use treatment contrasts. The first level present in the
//! rows used is the reference and receives no indicator column; levels that
//! never occur in those rows are dropped. Without an intercept the first
//! categorical main effect is coded with one indicator per level.

use crate::data::{DataFrame, Matrix};
pub use crate::formula::error::{FormulaError, FormulaResult};

use indexmap::IndexMap;
use ndarray::Array1;
use std::fmt;
use std::str::FromStr;

pub mod error;
mod parser;
mod term;

#[cfg(test)]
mod tests;

use term::Evaluated;
pub use term::{Term, TermKind};

pub use parser::FormulaParser;

/// Name of the intercept column in a design matrix
pub const INTERCEPT: &str = "(Intercept)";

/// Present levels of each categorical factor, keyed by the factor label
///
/// The first level of each entry is the reference level.
pub type Codings = IndexMap<String, Vec<String>>;

/// A parsed formula specifying a statistical model
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    /// Response term (left-hand side)
    pub response: Option<Term>,

    /// Terms on the right-hand side
    pub terms: Vec<Term>,

    /// Whether to include an intercept
    pub has_intercept: bool,

    /// Original formula string
    pub original: String,
}

/// Response and design matrix built from a formula and a frame
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFrame {
    /// Response values of the rows used
    pub response: Array1<f64>,
    /// Label of the response term, e.g. `log2(price)`
    pub response_name: String,
    /// Design matrix, one row per row used
    pub design: Matrix,
    /// Names of the design matrix columns
    pub column_names: Vec<String>,
    /// Indices into the input frame of the rows used
    pub rows: Vec<usize>,
    /// Indices of input rows left out for missing or non-finite values
    pub excluded: Vec<usize>,
    /// Number of rows in the input frame
    pub n_input: usize,
    pub has_intercept: bool,
    /// Level sets used to code categorical factors
    pub codings: Codings,
    /// Number of design columns the declared factor levels would produce
    pub nominal_columns: usize,
    /// Categorical factors with fewer than two levels present
    pub degenerate: Vec<String>,
}

impl ModelFrame {
    /// Number of observations used
    pub fn nobs(&self) -> usize {
        self.rows.len()
    }

    /// Number of design columns
    pub fn ncols(&self) -> usize {
        self.design.ncols()
    }
}

impl Formula {
    /// Parse a formula from a string
    pub fn parse(formula: &str) -> FormulaResult<Self> {
        FormulaParser::parse(formula)
    }

    /// Create a formula with a response
    pub fn with_response(response: Term, terms: Vec<Term>) -> Self {
        let mut formula = Self {
            response: Some(response),
            terms,
            has_intercept: true,
            original: String::new(),
        };
        formula.original = formula.to_string();
        formula
    }

    /// Remove the intercept from the formula
    pub fn without_intercept(mut self) -> Self {
        self.has_intercept = false;
        self
    }

    /// Check if formula has a response
    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    /// Data columns the formula reads, response first
    pub fn variables(&self) -> Vec<&str> {
        let mut vars = Vec::new();
        if let Some(response) = &self.response {
            response.collect_variables(&mut vars);
        }
        for term in &self.terms {
            term.collect_variables(&mut vars);
        }
        vars
    }

    /// Build the response vector and design matrix from `df`
    ///
    /// Rows with a missing or non-finite value in any variable the formula
    /// reads are listed in [`ModelFrame::excluded`] and left out.
    pub fn model_frame(&self, df: &DataFrame) -> FormulaResult<ModelFrame> {
        let response_term = self.response.as_ref().ok_or(FormulaError::MissingResponse)?;
        let response_name = response_term.to_string();
        let response = match response_term.evaluate(df)? {
            Evaluated::Numeric(values) => values,
            Evaluated::Categorical { .. } => {
                return Err(FormulaError::TypeMismatch {
                    variable: response_name,
                    expected: "numeric",
                    actual: "categorical",
                });
            }
        };

        let factors = self.evaluate_factors(df)?;
        let n_input = df.nrows();
        let (rows, excluded): (Vec<usize>, Vec<usize>) = (0..n_input).partition(|&row| {
            response[row].is_some_and(f64::is_finite)
                && factors.values().all(|ev| ev.is_present(row))
        });

        let full = self.full_coding_term(&factors);
        let mut codings = Codings::new();
        let mut degenerate = Vec::new();
        for (label, ev) in &factors {
            if let Evaluated::Categorical { codes, levels } = ev {
                let mut used = vec![false; levels.len()];
                for code in rows.iter().filter_map(|&row| codes[row]) {
                    if let Some(flag) = used.get_mut(code as usize) {
                        *flag = true;
                    }
                }
                let present: Vec<String> = levels
                    .iter()
                    .zip(&used)
                    .filter(|(_, used)| **used)
                    .map(|(level, _)| level.clone())
                    .collect();

                let full_coded = full.is_some_and(|t| self.terms[t].to_string() == *label);
                if present.len() < 2 && !(full_coded && !present.is_empty()) {
                    degenerate.push(label.clone());
                }
                codings.insert(label.clone(), present);
            }
        }

        let nominal_columns = self.nominal_columns(&factors, &codings, full);
        let (design, column_names) = self.build_design(&factors, &rows, &codings, full)?;
        let response = rows.iter().map(|&row| response[row].unwrap_or(f64::NAN)).collect();

        Ok(ModelFrame {
            response,
            response_name,
            design,
            column_names,
            rows,
            excluded,
            n_input,
            has_intercept: self.has_intercept,
            codings,
            nominal_columns,
            degenerate,
        })
    }

    /// Build a design matrix for new data with previously computed codings
    ///
    /// Returns the matrix, its column names and the indices of the rows with
    /// complete predictors. A categorical value outside the stored coding is
    /// an [`FormulaError::UnknownLevel`] error.
    pub fn design_for(
        &self,
        df: &DataFrame,
        codings: &Codings,
    ) -> FormulaResult<(Matrix, Vec<String>, Vec<usize>)> {
        let factors = self.evaluate_factors(df)?;
        let rows: Vec<usize> = (0..df.nrows())
            .filter(|&row| factors.values().all(|ev| ev.is_present(row)))
            .collect();
        let full = self.full_coding_term(&factors);
        let (design, names) = self.build_design(&factors, &rows, codings, full)?;
        Ok((design, names, rows))
    }

    /// Evaluate every distinct factor of the right-hand side once
    fn evaluate_factors(&self, df: &DataFrame) -> FormulaResult<IndexMap<String, Evaluated>> {
        let mut factors = IndexMap::new();
        for term in &self.terms {
            for factor in term.factors() {
                let label = factor.to_string();
                if !factors.contains_key(&label) {
                    let evaluated = factor.evaluate(df)?;
                    factors.insert(label, evaluated);
                }
            }
        }
        Ok(factors)
    }

    /// Index of the term coded with a full set of indicators, if any
    fn full_coding_term(&self, factors: &IndexMap<String, Evaluated>) -> Option<usize> {
        if self.has_intercept {
            return None;
        }
        self.terms.iter().position(|term| {
            !term.is_interaction()
                && matches!(
                    factors.get(&term.to_string()),
                    Some(Evaluated::Categorical { .. })
                )
        })
    }

    /// Design columns the terms need given the levels present in the rows
    /// used; a factor with fewer than two present levels still counts as one
    fn nominal_columns(
        &self,
        factors: &IndexMap<String, Evaluated>,
        codings: &Codings,
        full: Option<usize>,
    ) -> usize {
        let term_columns: usize = self
            .terms
            .iter()
            .enumerate()
            .map(|(i, term)| {
                term.factors()
                    .iter()
                    .map(|factor| {
                        let label = factor.to_string();
                        match factors.get(&label) {
                            Some(Evaluated::Categorical { .. }) => {
                                let present = codings.get(&label).map_or(0, Vec::len);
                                let coded = if full == Some(i) {
                                    present
                                } else {
                                    present.saturating_sub(1)
                                };
                                coded.max(1)
                            }
                            _ => 1,
                        }
                    })
                    .product::<usize>()
            })
            .sum();
        usize::from(self.has_intercept) + term_columns
    }

    fn build_design(
        &self,
        factors: &IndexMap<String, Evaluated>,
        rows: &[usize],
        codings: &Codings,
        full: Option<usize>,
    ) -> FormulaResult<(Matrix, Vec<String>)> {
        let n = rows.len();
        let mut columns: Vec<(String, Vec<f64>)> = Vec::new();

        if self.has_intercept {
            columns.push((INTERCEPT.to_string(), vec![1.0; n]));
        }

        for (i, term) in self.terms.iter().enumerate() {
            let mut block: Vec<(String, Vec<f64>)> = vec![(String::new(), vec![1.0; n])];
            for factor in term.factors() {
                let label = factor.to_string();
                let evaluated = factors.get(&label).ok_or_else(|| FormulaError::Evaluation {
                    term: term.to_string(),
                    message: format!("factor '{}' was not evaluated", label),
                })?;
                let coded = code_factor(&label, evaluated, rows, codings, full == Some(i))?;
                block = interact(&block, &coded);
            }
            columns.extend(block);
        }

        let design = Matrix::from_shape_fn((n, columns.len()), |(r, c)| columns[c].1[r]);
        let names = columns.into_iter().map(|(name, _)| name).collect();
        Ok((design, names))
    }
}

/// Coded columns of one factor over `rows`
fn code_factor(
    label: &str,
    evaluated: &Evaluated,
    rows: &[usize],
    codings: &Codings,
    full: bool,
) -> FormulaResult<Vec<(String, Vec<f64>)>> {
    match evaluated {
        Evaluated::Numeric(values) => Ok(vec![(
            label.to_string(),
            rows.iter()
                .map(|&row| values[row].unwrap_or(f64::NAN))
                .collect(),
        )]),
        Evaluated::Categorical { .. } => {
            let coding = codings.get(label).map(Vec::as_slice).unwrap_or_default();
            let positions = rows
                .iter()
                .map(|&row| {
                    let level = evaluated.label(row).unwrap_or_default();
                    coding
                        .iter()
                        .position(|known| known == level)
                        .ok_or_else(|| FormulaError::UnknownLevel {
                            variable: label.to_string(),
                            level: level.to_string(),
                        })
                })
                .collect::<FormulaResult<Vec<usize>>>()?;

            let skip = usize::from(!full);
            Ok(coding
                .iter()
                .enumerate()
                .skip(skip)
                .map(|(k, level)| {
                    let indicator = positions
                        .iter()
                        .map(|&p| if p == k { 1.0 } else { 0.0 })
                        .collect();
                    (format!("{}{}", label, level), indicator)
                })
                .collect())
        }
    }
}

/// Elementwise products of two column blocks; the left block varies fastest
fn interact(left: &[(String, Vec<f64>)], right: &[(String, Vec<f64>)]) -> Vec<(String, Vec<f64>)> {
    let mut out = Vec::with_capacity(left.len() * right.len());
    for (right_name, right_values) in right {
        for (left_name, left_values) in left {
            let name = if left_name.is_empty() {
                right_name.clone()
            } else {
                format!("{}:{}", left_name, right_name)
            };
            let values = left_values
                .iter()
                .zip(right_values)
                .map(|(a, b)| a * b)
                .collect();
            out.push((name, values));
        }
    }
    out
}

impl FromStr for Formula {
    type Err = FormulaError;

    fn from_str(s: &str) -> FormulaResult<Self> {
        Formula::parse(s)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(response) = &self.response {
            write!(f, "{} ~ ", response)?;
        } else {
            write!(f, "~ ")?;
        }

        if self.terms.is_empty() {
            return write!(f, "{}", if self.has_intercept { "1" } else { "0" });
        }

        if !self.has_intercept {
            write!(f, "0 + ")?;
        }
        let parts: Vec<String> = self.terms.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", parts.join(" + "))
    }
}
