use crate::error::*;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

/// The two ways a post fetch can fail, as surfaced to the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    /// Unreachable host, transport error, or a non-2xx status.
    Network,
    /// The body was not a well-formed array of posts.
    Parse,
}

impl CoreError {
    /// Classifies a fetch error. Returns `None` for errors that did not come
    /// from the fetch boundary.
    pub fn fetch_failure(&self) -> Option<FetchFailure> {
        match self {
            CoreError::PostsApi(PostsApiError::InvalidResponse { .. }) => {
                Some(FetchFailure::Parse)
            }
            CoreError::PostsApi(_) | CoreError::Network(_) => Some(FetchFailure::Network),
            _ => None,
        }
    }

    pub fn is_network_error(&self) -> bool {
        self.fetch_failure() == Some(FetchFailure::Network)
    }

    pub fn is_parse_error(&self) -> bool {
        self.fetch_failure() == Some(FetchFailure::Parse)
    }
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::PostsApi(e) => {
                error!("Posts API error details: {:?}", e);
            }
            CoreError::Persistence(e) => {
                error!("Persistence error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::PostsApi(e) => e.is_retryable(),
            CoreError::Persistence(e) => e.is_retryable(),
            CoreError::Network(_) => true,
            CoreError::Cancelled { .. } => true,
            _ => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::PostsApi(e) => e.user_friendly_message(),
            CoreError::Persistence(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::InvalidInput { .. } => {
                "Invalid input provided. Please check your input and try again.".to_string()
            }
            CoreError::Cancelled { .. } => "The operation was cancelled.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::PostsApi(_) => "POSTS_API".to_string(),
            CoreError::Persistence(_) => "PERSISTENCE".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Cancelled { .. } => "CANCELLED".to_string(),
        }
    }
}

impl ErrorExt for PostsApiError {
    fn log_error(&self) -> &Self {
        error!("PostsApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("PostsApiError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            PostsApiError::Unreachable { .. } => true,
            PostsApiError::RequestTimeout => true,
            PostsApiError::HttpStatus { status_code } => {
                *status_code >= 500 || *status_code == 408 || *status_code == 429
            }
            PostsApiError::InvalidResponse { .. } => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            PostsApiError::Unreachable { .. } => {
                "Could not reach the posts server. Pull to refresh to try again.".to_string()
            }
            PostsApiError::RequestTimeout => {
                "Loading posts timed out. Pull to refresh to try again.".to_string()
            }
            PostsApiError::HttpStatus { status_code } => format!(
                "The posts server responded with status {}. Pull to refresh to try again.",
                status_code
            ),
            PostsApiError::InvalidResponse { .. } => {
                "The posts server sent data that could not be read.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            PostsApiError::Unreachable { .. } => "POSTS_UNREACHABLE".to_string(),
            PostsApiError::RequestTimeout => "POSTS_TIMEOUT".to_string(),
            PostsApiError::HttpStatus { .. } => "POSTS_HTTP_STATUS".to_string(),
            PostsApiError::InvalidResponse { .. } => "POSTS_INVALID_RESPONSE".to_string(),
        }
    }
}

impl ErrorExt for PersistenceError {
    fn log_error(&self) -> &Self {
        error!("PersistenceError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("PersistenceError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            PersistenceError::DatabaseLocked { .. } | PersistenceError::ConnectionFailed { .. }
        )
    }

    fn user_friendly_message(&self) -> String {
        match self {
            PersistenceError::ConnectionFailed { .. } | PersistenceError::NotConnected => {
                "Local storage is unavailable. Your search will not be remembered.".to_string()
            }
            PersistenceError::DatabaseLocked { .. } => {
                "Local storage is temporarily busy.".to_string()
            }
            _ => "Could not access local storage.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            PersistenceError::ConnectionFailed { .. } => "DB_CONNECTION_FAILED".to_string(),
            PersistenceError::MigrationFailed { .. } => "DB_MIGRATION_FAILED".to_string(),
            PersistenceError::ReadFailed { .. } => "DB_READ_FAILED".to_string(),
            PersistenceError::WriteFailed { .. } => "DB_WRITE_FAILED".to_string(),
            PersistenceError::NotConnected => "DB_NOT_CONNECTED".to_string(),
            PersistenceError::DatabaseLocked { .. } => "DB_LOCKED".to_string(),
            PersistenceError::Sql(_) => "DB_SQL_ERROR".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::PermissionDenied { .. } => {
                "Permission denied accessing configuration. Please check file permissions."
                    .to_string()
            }
            _ => "Configuration error occurred. Please check your settings.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::PermissionDenied { .. } => "CONFIG_PERMISSION_DENIED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

pub struct ErrorReporter {
    report_errors: bool,
    report_warnings: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            report_errors: true,
            report_warnings: true,
        }
    }

    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    pub fn with_warning_reporting(mut self, enabled: bool) -> Self {
        self.report_warnings = enabled;
        self
    }

    pub fn report_error(&self, error: &CoreError) {
        if self.report_errors {
            error.log_error();
            info!("Error code: {}", error.error_code());
            info!("User message: {}", error.user_friendly_message());
            if error.is_retryable() {
                info!("Error is retryable via manual refresh");
            }
        }
    }

    pub fn report_warning(&self, error: &CoreError) {
        if self.report_warnings {
            error.log_warn();
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
