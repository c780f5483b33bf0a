use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Zip archive operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP {status} returned by {url}")]
    HttpStatusError { status: u16, url: String },

    #[error("Browser error: {message}")]
    BrowserError { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),

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

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid ZIP input file {path}: {message}")]
    InputFormatError { path: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Browser,
    Configuration,
    Input,
    Storage,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HarvestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HarvestError::HttpError(_) | HarvestError::HttpStatusError { .. } => {
                ErrorCategory::Network
            }
            HarvestError::BrowserError { .. } => ErrorCategory::Browser,
            HarvestError::ConfigError { .. }
            | HarvestError::ConfigValidationError { .. }
            | HarvestError::InvalidConfigValueError { .. }
            | HarvestError::MissingConfigError { .. } => ErrorCategory::Configuration,
            HarvestError::InputFormatError { .. } | HarvestError::SerializationError(_) => {
                ErrorCategory::Input
            }
            HarvestError::IoError(_) | HarvestError::ZipError(_) | HarvestError::CsvError(_) => {
                ErrorCategory::Storage
            }
            HarvestError::TaskError(_) | HarvestError::ProcessingError { .. } => {
                ErrorCategory::Processing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 單一頁面抓取失敗會被重試，不致命
            ErrorCategory::Network | ErrorCategory::Browser => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Processing => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network connectivity and the base URL, then re-run; finished ZIP codes are skipped",
            ErrorCategory::Browser => "Install Chrome or Chromium, or point source.chrome_path at the browser binary",
            ErrorCategory::Configuration => "Review the command line flags and the TOML config file",
            ErrorCategory::Input => "Each ZIP file must be JSON shaped like {\"AZ\": [\"85001\", ...]}",
            ErrorCategory::Storage => "Check that the output directory exists and is writable",
            ErrorCategory::Processing => "Re-run with --verbose and inspect the log output",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            HarvestError::InputFormatError { path, message } => {
                format!("Could not use ZIP file '{}': {}", path, message)
            }
            HarvestError::MissingConfigError { field } => {
                format!("Missing required setting '{}'", field)
            }
            HarvestError::InvalidConfigValueError {
                field,
                value,
                reason,
            } => format!("Setting '{}' = '{}' is invalid: {}", field, value, reason),
            HarvestError::BrowserError { message } => {
                format!("Browser session failed: {}", message)
            }
            other => other.to_string(),
        }
    }

    /// 依嚴重程度決定 CLI 的結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
