use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required config key: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported source type: {source_type}")]
    UnsupportedSourceType { source_type: String },

    #[error("Invalid data source config: {message}")]
    InvalidDataSourceConfig { message: String },

    #[error("{kind} not found: {path}")]
    NotFound { kind: String, path: String },

    #[error("Unsupported file type: {path}")]
    UnsupportedFileType { path: String },

    #[error("GraphQL query returned errors: {errors}")]
    GraphQlError { errors: String },

    #[error("Cache error: {message}")]
    CacheError { message: String },

    #[error("Queue unavailable: {message}")]
    QueueUnavailable { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    NotFound,
    Transport,
    Validation,
    Processing,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn config(message: impl Into<String>) -> Self {
        EtlError::ConfigError {
            message: message.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        EtlError::MissingConfigError {
            field: field.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        EtlError::ValidationError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        EtlError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::UnsupportedSourceType { .. }
            | EtlError::InvalidDataSourceConfig { .. }
            | EtlError::UnsupportedFileType { .. } => ErrorCategory::Configuration,
            EtlError::NotFound { .. } => ErrorCategory::NotFound,
            EtlError::ApiError(_)
            | EtlError::GraphQlError { .. }
            | EtlError::QueueUnavailable { .. } => ErrorCategory::Transport,
            EtlError::ValidationError { .. } => ErrorCategory::Validation,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. } => ErrorCategory::Processing,
            EtlError::DatabaseError(_) | EtlError::IoError(_) | EtlError::CacheError { .. } => {
                ErrorCategory::Storage
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Transport => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::NotFound => ErrorSeverity::High,
            ErrorCategory::Validation | ErrorCategory::Processing => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    /// 配置類錯誤重試也不會成功，直接回報
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transport | ErrorCategory::Storage | ErrorCategory::Processing
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::MissingConfigError { .. } => "Add the missing key to the extract config",
            EtlError::UnsupportedSourceType { .. } => {
                "Use one of: api, database, csv, google_sheets"
            }
            EtlError::NotFound { .. } => "Check that the file path exists and is readable",
            EtlError::UnsupportedFileType { .. } => "Convert the file to .csv or .json",
            EtlError::ApiError(_) => "Check network connectivity and the endpoint URL",
            EtlError::GraphQlError { .. } => "Check the GraphQL query and variables",
            EtlError::DatabaseError(_) => "Check the connection string and the SQL query",
            EtlError::QueueUnavailable { .. } => "Start the job worker or run the sync locally",
            EtlError::ValidationError { .. } => "Inspect the source data for invalid numbers",
            _ => match self.category() {
                ErrorCategory::Configuration => "Review the pipeline configuration",
                ErrorCategory::Storage => "Check warehouse and cache availability",
                _ => "Inspect the logs for details and retry",
            },
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::NotFound => format!("Missing input: {}", self),
            ErrorCategory::Transport => format!("Could not reach the data source: {}", self),
            ErrorCategory::Validation => format!("Invalid data: {}", self),
            ErrorCategory::Processing => format!("Failed to process data: {}", self),
            ErrorCategory::Storage => format!("Storage failure: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
