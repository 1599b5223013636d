//! Errors raised by the minimizer layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FitError {
    #[error("unknown minimizer backend '{name}'")]
    UnknownBackend { name: String },

    #[error("unknown algorithm '{name}' for backend '{backend}'")]
    UnknownAlgorithm { backend: String, name: String },

    #[error("invalid {what}: {value}")]
    InvalidSetting { what: &'static str, value: f64 },

    #[error("no objective function set")]
    NoFunction,

    #[error("variable index {index} is out of range for a {dim}-dimensional function")]
    VariableIndex { index: usize, dim: usize },

    #[error("variable {index} was never registered")]
    MissingVariable { index: usize },

    #[error("no free variables to minimize")]
    NoFreeVariables,

    #[error("minimize() has not been run")]
    NotMinimized,

    #[error("function call limit of {limit} reached")]
    CallLimit { limit: u64 },

    #[error("solver failed: {message}")]
    Solver { message: String },
}

impl FitError {
    pub(crate) fn from_solver(err: argmin::core::Error) -> Self {
        match err.downcast::<FitError>() {
            Ok(fit_err) => fit_err,
            Err(other) => FitError::Solver {
                message: other.to_string(),
            },
        }
    }
}
