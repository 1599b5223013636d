use crate::fit::FitError;

/// Exit code used when the minimizer backend cannot be instantiated.
pub const EXIT_NO_MINIMIZER: u8 = 1;
/// Exit code for invalid user configuration or input data.
pub const EXIT_INVALID_INPUT: u8 = 2;
/// Exit code for unexpected failures during the run.
pub const EXIT_RUNTIME: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let exit_code = match &err {
            FitError::UnknownBackend { .. } | FitError::UnknownAlgorithm { .. } => {
                EXIT_NO_MINIMIZER
            }
            FitError::InvalidSetting { .. }
            | FitError::NoFunction
            | FitError::VariableIndex { .. }
            | FitError::MissingVariable { .. } => EXIT_INVALID_INPUT,
            _ => EXIT_RUNTIME,
        };
        let message = match &err {
            FitError::UnknownBackend { .. } | FitError::UnknownAlgorithm { .. } => {
                format!("Error: cannot create minimizer: {err}")
            }
            _ => format!("Error: {err}"),
        };
        AppError::new(exit_code, message)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::new(EXIT_RUNTIME, format!("Error: failed to render JSON: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_backend_maps_to_exit_one() {
        let err: AppError = FitError::UnknownBackend {
            name: "Minuit3".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), EXIT_NO_MINIMIZER);
        assert!(err.to_string().contains("cannot create minimizer"));
    }

    #[test]
    fn invalid_setting_maps_to_exit_two() {
        let err: AppError = FitError::InvalidSetting {
            what: "tolerance",
            value: -1.0,
        }
        .into();
        assert_eq!(err.exit_code(), EXIT_INVALID_INPUT);
    }
}
