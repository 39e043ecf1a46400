use thiserror::Error;

#[derive(Error, Debug)]
pub enum WxError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Upstream returned HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Storage,
    Configuration,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit code for a run that ended with an error of this severity.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,      // 警告，但成功
            ErrorSeverity::Medium => 2,   // 可重試
            ErrorSeverity::High => 1,     // 處理錯誤
            ErrorSeverity::Critical => 3, // 系統錯誤
        }
    }
}

impl WxError {
    pub fn processing(message: impl Into<String>) -> Self {
        WxError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        WxError::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            WxError::ApiError(_) | WxError::UpstreamStatus { .. } => ErrorCategory::Network,
            WxError::IoError(_) | WxError::CsvError(_) => ErrorCategory::Storage,
            WxError::ConfigError { .. }
            | WxError::ConfigValidationError { .. }
            | WxError::InvalidConfigValueError { .. }
            | WxError::MissingConfigError { .. } => ErrorCategory::Configuration,
            WxError::SerializationError(_)
            | WxError::ProcessingError { .. }
            | WxError::ValidationError { .. } => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // api.weather.gov goes down from time to time; the next poll usually works
            WxError::ApiError(_) | WxError::UpstreamStatus { .. } => ErrorSeverity::Medium,
            WxError::ValidationError { .. } => ErrorSeverity::Low,
            WxError::SerializationError(_)
            | WxError::ProcessingError { .. }
            | WxError::CsvError(_) => ErrorSeverity::High,
            WxError::IoError(_)
            | WxError::ConfigError { .. }
            | WxError::ConfigValidationError { .. }
            | WxError::InvalidConfigValueError { .. }
            | WxError::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "Check network connectivity and the upstream endpoint; the next scheduled run will retry"
            }
            ErrorCategory::Storage => {
                "Check that the data directories exist, are writable and the CSV files are not corrupted"
            }
            ErrorCategory::Configuration => {
                "Check the TOML configuration file and any ${VAR} environment variables it references"
            }
            ErrorCategory::Data => "Inspect the offending payload or CSV row and fix or remove it",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            WxError::ApiError(e) if e.is_timeout() => {
                "The upstream service did not answer in time".to_string()
            }
            WxError::ApiError(_) => "Could not reach the upstream service".to_string(),
            WxError::UpstreamStatus { status, .. } => {
                format!("The upstream service answered with HTTP {}", status)
            }
            WxError::MissingConfigError { field } => {
                format!("Configuration is missing '{}'", field)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_errors_are_retryable() {
        let err = WxError::UpstreamStatus {
            status: 503,
            body: "down for maintenance".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(
            err.user_friendly_message(),
            "The upstream service answered with HTTP 503"
        );
    }

    #[test]
    fn test_config_errors_are_critical() {
        let err = WxError::MissingConfigError {
            field: "location.latitude".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().contains("location.latitude"));
    }

    #[test]
    fn test_exit_codes_follow_severity() {
        assert_eq!(WxError::validation("bad humidity").severity().exit_code(), 0);
        assert_eq!(WxError::processing("bad row").severity().exit_code(), 1);
        assert_eq!(ErrorSeverity::Medium.exit_code(), 2);
        assert_eq!(ErrorSeverity::Critical.exit_code(), 3);
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: WxError = io.into();
        assert_eq!(err.category(), ErrorCategory::Storage);
        assert!(err.to_string().starts_with("IO error"));
    }
}
