use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Validation error at recipient {index}: {message}")]
    RecipientValidationError { index: usize, message: String },

    #[error("Job not found: {job_id}")]
    NotFoundError { job_id: String },

    #[error("Invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransitionError {
        job_id: String,
        from: String,
        to: String,
    },

    #[error("Worker pool saturated: {pending} pending sends (capacity {capacity})")]
    PoolSaturated { pending: usize, capacity: usize },

    #[error("Worker pool is shut down")]
    PoolClosed,

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{url} responded with HTTP {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Capacity,
    Configuration,
    Network,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DispatchError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn at_recipient(index: usize, message: impl Into<String>) -> Self {
        Self::RecipientValidationError {
            index,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationError { .. } | Self::RecipientValidationError { .. } => {
                ErrorCategory::Validation
            }
            Self::NotFoundError { .. } => ErrorCategory::NotFound,
            Self::PoolSaturated { .. } | Self::PoolClosed => ErrorCategory::Capacity,
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::TomlError(_) => ErrorCategory::Configuration,
            Self::HttpError(_) | Self::UnexpectedStatus { .. } => ErrorCategory::Network,
            Self::InvalidTransitionError { .. } | Self::IoError(_) => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation | ErrorCategory::NotFound => ErrorSeverity::Low,
            ErrorCategory::Capacity | ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Internal => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::RecipientValidationError { index, message } => {
                format!("Recipient #{} is invalid: {}", index, message)
            }
            Self::NotFoundError { job_id } => format!("No SMS job with id '{}'", job_id),
            Self::PoolSaturated { .. } => "Too many SMS are waiting to be sent".to_string(),
            Self::PoolClosed => "The service is shutting down".to_string(),
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration field '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Validation => "Check the 'to' and 'message' fields of the request",
            ErrorCategory::NotFound => "Job ids are only kept while the process is running",
            ErrorCategory::Capacity => "Retry later or submit a synchronous request",
            ErrorCategory::Configuration => "Fix the configuration file or command line flags",
            ErrorCategory::Network => "Make sure the service is running and reachable",
            ErrorCategory::Internal => "Check the service logs for details",
        }
    }
}

/// 發送失敗，只會被記錄在 SendOutcome 中，不會往外拋出
#[derive(Error, Debug)]
pub enum SendFailure {
    #[error("Failed to start send command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Send command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("Timeout after {seconds:.1}s while sending SMS")]
    Timeout { seconds: f64 },

    #[error("{0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_and_severity() {
        let err = DispatchError::at_recipient(2, "destination cannot be empty");
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert!(err.to_string().contains("recipient 2"));

        let err = DispatchError::PoolSaturated {
            pending: 30,
            capacity: 30,
        };
        assert_eq!(err.category(), ErrorCategory::Capacity);

        let err = DispatchError::InvalidTransitionError {
            job_id: "x".into(),
            from: "completed".into(),
            to: "queued".into(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);

        let err = DispatchError::UnexpectedStatus {
            url: "http://127.0.0.1:5000/health".into(),
            status: 503,
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }

    #[test]
    fn test_timeout_detail_mentions_timeout() {
        let failure = SendFailure::Timeout { seconds: 30.0 };
        assert!(failure.to_string().contains("Timeout"));
    }
}
