//! Errors raised while parsing a formula or evaluating it against a frame

use crate::data::DataError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// The formula text does not parse
    #[error("Syntax error at position {position}: {message}{}", near(.context))]
    Syntax {
        position: usize,
        message: String,
        context: Option<String>,
    },

    /// Parses, but is not a model we can build
    #[error("Invalid formula: {message}{}", hint(.suggestion))]
    InvalidStructure {
        message: String,
        suggestion: Option<String>,
    },

    #[error("Formula has no response; write it as 'response ~ terms'")]
    MissingResponse,

    #[error("Variable '{variable}' not found (columns: {})", .available.join(", "))]
    VariableNotFound {
        variable: String,
        available: Vec<String>,
    },

    #[error("Variable '{variable}' is {actual}, expected {expected}")]
    TypeMismatch {
        variable: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Unknown function, or a known one applied to the wrong kind of argument
    #[error("{function}(): {message}")]
    Function {
        function: String,
        argument: Option<String>,
        message: String,
    },

    /// A transform evaluated outside its domain, e.g. `log2` of zero
    #[error("{function}({argument}): {message}")]
    OutOfDomain {
        function: String,
        argument: String,
        message: String,
    },

    /// A categorical value that the stored coding does not know
    #[error("Factor '{variable}' has new level '{level}'")]
    UnknownLevel { variable: String, level: String },

    #[error("Cannot evaluate term '{term}': {message}")]
    Evaluation { term: String, message: String },

    #[error(transparent)]
    Data(#[from] DataError),
}

pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

fn near(context: &Option<String>) -> String {
    context
        .as_ref()
        .map(|c| format!(" near '{}'", c))
        .unwrap_or_default()
}

fn hint(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" ({})", s))
        .unwrap_or_default()
}

impl FormulaError {
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        FormulaError::Syntax {
            position,
            message: message.into(),
            context: None,
        }
    }

    pub fn syntax_with_context(
        position: usize,
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        FormulaError::Syntax {
            position,
            message: message.into(),
            context: Some(context.into()),
        }
    }

    pub fn variable_not_found(variable: &str, available: &[&str]) -> Self {
        FormulaError::VariableNotFound {
            variable: variable.to_string(),
            available: available.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn function(function: &str, message: impl Into<String>) -> Self {
        FormulaError::Function {
            function: function.to_string(),
            argument: None,
            message: message.into(),
        }
    }

    pub fn function_with_arg(function: &str, argument: &str, message: impl Into<String>) -> Self {
        FormulaError::Function {
            function: function.to_string(),
            argument: Some(argument.to_string()),
            message: message.into(),
        }
    }
}
