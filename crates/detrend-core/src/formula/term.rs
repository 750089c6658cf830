//! Term types for formula specification
//!
//! This module defines the types representing terms in a formula, such as
//! variables, interactions, and function applications, and evaluates a term
//! against a DataFrame into numeric or categorical values.

use crate::data::{DataFrame, SeriesData};
use crate::formula::error::{FormulaError, FormulaResult};
use std::fmt;

/// Kind of term
#[derive(Debug, Clone, PartialEq)]
pub enum TermKind {
    /// Simple variable
    Variable(String),
    /// Interaction between terms (`a:b`)
    Interaction(Vec<Term>),
    /// Function application
    Function { name: String, args: Vec<Term> },
}

/// A term in a formula
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    /// The kind of term
    pub kind: TermKind,
}

/// Values a term evaluates to, one slot per row, `None` for missing
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Evaluated {
    Numeric(Vec<Option<f64>>),
    Categorical {
        codes: Vec<Option<u32>>,
        levels: Vec<String>,
    },
}

impl Evaluated {
    /// Whether the row holds a usable (present and finite) value
    pub(crate) fn is_present(&self, row: usize) -> bool {
        match self {
            Evaluated::Numeric(values) => values[row].is_some_and(f64::is_finite),
            Evaluated::Categorical { codes, .. } => codes[row].is_some(),
        }
    }

    pub(crate) fn label(&self, row: usize) -> Option<&str> {
        match self {
            Evaluated::Categorical { codes, levels } => codes[row]
                .and_then(|c| levels.get(c as usize))
                .map(|s| s.as_str()),
            Evaluated::Numeric(_) => None,
        }
    }
}

const UNARY_FUNCTIONS: [&str; 7] = ["log", "log2", "log10", "sqrt", "exp", "abs", "I"];

impl Term {
    /// Create a new variable term
    pub fn variable(name: &str) -> Self {
        Self {
            kind: TermKind::Variable(name.to_string()),
        }
    }

    /// Create a new interaction term
    pub fn interaction(factors: Vec<Term>) -> Self {
        Self {
            kind: TermKind::Interaction(factors),
        }
    }

    /// Create a new function term
    pub fn function(name: &str, args: Vec<Term>) -> Self {
        Self {
            kind: TermKind::Function {
                name: name.to_string(),
                args,
            },
        }
    }

    /// Check if the term is an interaction
    pub fn is_interaction(&self) -> bool {
        matches!(self.kind, TermKind::Interaction(_))
    }

    /// Get variable name if this is a variable term
    pub fn as_variable(&self) -> Option<&str> {
        if let TermKind::Variable(name) = &self.kind {
            Some(name)
        } else {
            None
        }
    }

    /// Factors of the term: the components of an interaction, or the term itself
    pub fn factors(&self) -> Vec<&Term> {
        match &self.kind {
            TermKind::Interaction(factors) => factors.iter().collect(),
            _ => vec![self],
        }
    }

    /// Collect the data columns this term reads
    pub fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match &self.kind {
            TermKind::Variable(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            TermKind::Interaction(factors) => {
                for factor in factors {
                    factor.collect_variables(out);
                }
            }
            TermKind::Function { args, .. } => {
                for arg in args {
                    arg.collect_variables(out);
                }
            }
        }
    }

    /// Evaluate a non-interaction term against the frame
    pub(crate) fn evaluate(&self, df: &DataFrame) -> FormulaResult<Evaluated> {
        match &self.kind {
            TermKind::Variable(name) => evaluate_variable(name, df),
            TermKind::Function { name, args } => self.evaluate_function(name, args, df),
            TermKind::Interaction(_) => Err(FormulaError::Evaluation {
                term: self.to_string(),
                message: "an interaction is not a single factor".to_string(),
            }),
        }
    }

    fn evaluate_function(
        &self,
        name: &str,
        args: &[Term],
        df: &DataFrame,
    ) -> FormulaResult<Evaluated> {
        if args.len() != 1 {
            return Err(FormulaError::function(
                name,
                format!("Expected 1 argument, got {}", args.len()),
            ));
        }
        let arg = &args[0];
        let evaluated = arg.evaluate(df)?;

        if name == "factor" {
            return Ok(to_factor(evaluated));
        }

        if !UNARY_FUNCTIONS.contains(&name) {
            return Err(FormulaError::function(
                name,
                format!("Function '{}' not supported", name),
            ));
        }

        let values = match evaluated {
            Evaluated::Numeric(values) => values,
            Evaluated::Categorical { .. } => {
                return Err(FormulaError::function_with_arg(
                    name,
                    &arg.to_string(),
                    "argument must be numeric",
                ));
            }
        };

        let in_domain = |x: f64| match name {
            "log" | "log2" | "log10" => x > 0.0,
            "sqrt" => x >= 0.0,
            _ => true,
        };
        let apply = |x: f64| match name {
            "log" => x.ln(),
            "log2" => x.log2(),
            "log10" => x.log10(),
            "sqrt" => x.sqrt(),
            "exp" => x.exp(),
            "abs" => x.abs(),
            _ => x,
        };

        if let Some(bad) = values.iter().flatten().find(|&&x| !in_domain(x)) {
            return Err(FormulaError::OutOfDomain {
                function: name.to_string(),
                argument: arg.to_string(),
                message: format!("undefined for {}", bad),
            });
        }

        Ok(Evaluated::Numeric(
            values.into_iter().map(|v| v.map(apply)).collect(),
        ))
    }
}

fn evaluate_variable(name: &str, df: &DataFrame) -> FormulaResult<Evaluated> {
    let series = df
        .get_column(name)
        .ok_or_else(|| FormulaError::variable_not_found(name, &df.column_names()))?;

    match series.data() {
        SeriesData::Float(_) | SeriesData::Int(_) | SeriesData::Bool(_) => {
            Ok(Evaluated::Numeric(series.float_values()?))
        }
        SeriesData::Categorical(codes, levels) => Ok(Evaluated::Categorical {
            codes: codes
                .iter()
                .enumerate()
                .map(|(i, &c)| (!series.is_missing(i)).then_some(c))
                .collect(),
            levels: levels.clone(),
        }),
        SeriesData::String(_) => {
            // character columns enter models as factors
            let categorical = series.to_categorical()?;
            match categorical.data() {
                SeriesData::Categorical(codes, levels) => Ok(Evaluated::Categorical {
                    codes: codes
                        .iter()
                        .enumerate()
                        .map(|(i, &c)| (!categorical.is_missing(i)).then_some(c))
                        .collect(),
                    levels: levels.clone(),
                }),
                _ => unreachable!("to_categorical returns a categorical series"),
            }
        }
    }
}

/// Turn numeric values into a factor with numerically ordered levels
fn to_factor(evaluated: Evaluated) -> Evaluated {
    match evaluated {
        Evaluated::Categorical { .. } => evaluated,
        Evaluated::Numeric(values) => {
            let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
            sorted.sort_by(f64::total_cmp);
            sorted.dedup_by(|a, b| a.to_bits() == b.to_bits());

            let codes = values
                .iter()
                .map(|v| {
                    v.and_then(|x| {
                        sorted
                            .iter()
                            .position(|s| s.to_bits() == x.to_bits())
                            .map(|p| p as u32)
                    })
                })
                .collect();
            let levels = sorted.iter().map(|v| v.to_string()).collect();

            Evaluated::Categorical { codes, levels }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TermKind::Variable(name) => write!(f, "{}", name),
            TermKind::Interaction(factors) => {
                let parts: Vec<String> = factors.iter().map(|t| t.to_string()).collect();
                write!(f, "{}", parts.join(":"))
            }
            TermKind::Function { name, args } => {
                let parts: Vec<String> = args.iter().map(|t| t.to_string()).collect();
                write!(f, "{}({})", name, parts.join(", "))
            }
        }
    }
}
