use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("API rejected request ({status}): {message}")]
    ApiRejected { status: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Configuration,
    Validation,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl FormError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FormError::ApiError(_) => ErrorCategory::Network,
            FormError::IoError(_) | FormError::SerializationError(_) => ErrorCategory::Data,
            FormError::ConfigError { .. }
            | FormError::MissingConfigError { .. }
            | FormError::InvalidConfigValueError { .. }
            | FormError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            FormError::ValidationError { .. } => ErrorCategory::Validation,
            FormError::ApiRejected { .. } => ErrorCategory::Remote,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Remote => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// 給終端使用者看的訊息，不含內部細節
    pub fn user_friendly_message(&self) -> String {
        match self {
            FormError::ApiError(_) => "Could not reach the student API".to_string(),
            FormError::IoError(e) => format!("File access failed: {}", e),
            FormError::SerializationError(_) => "The server sent an unreadable response".to_string(),
            FormError::ConfigError { message } => format!("Configuration problem: {}", message),
            FormError::MissingConfigError { field } => {
                format!("Required setting '{}' is not set", field)
            }
            FormError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            FormError::ConfigValidationError { field, message } => {
                format!("Setting '{}' is invalid: {}", field, message)
            }
            FormError::ValidationError { message } => message.clone(),
            FormError::ApiRejected { message, .. } => message.clone(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check the network connection and the API endpoint, then try again",
            ErrorCategory::Data => "Verify the API endpoint points at the student service",
            ErrorCategory::Configuration => {
                "Fix the configuration file or set STUDENT_FORM_API_URL / STUDENT_FORM_API_KEY"
            }
            ErrorCategory::Validation => "Fill in every required field",
            ErrorCategory::Remote => "Review the server message and correct the submitted data",
        }
    }
}

pub type Result<T> = std::result::Result<T, FormError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_category() {
        let missing = FormError::MissingConfigError {
            field: "api.api_key".to_string(),
        };
        assert_eq!(missing.category(), ErrorCategory::Configuration);
        assert_eq!(missing.severity(), ErrorSeverity::Critical);

        let invalid = FormError::ValidationError {
            message: "nama is required".to_string(),
        };
        assert_eq!(invalid.severity(), ErrorSeverity::Low);
        assert_eq!(invalid.user_friendly_message(), "nama is required");
    }

    #[test]
    fn test_rejected_message_is_surfaced_verbatim() {
        let err = FormError::ApiRejected {
            status: "error".to_string(),
            message: "Student not found".to_string(),
        };
        assert_eq!(err.user_friendly_message(), "Student not found");
        assert_eq!(err.to_string(), "API rejected request (error): Student not found");
    }
}
