use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Posts API error: {0}")]
    PostsApi(#[from] PostsApiError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PostsApiError {
    #[error("Posts endpoint unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Unexpected HTTP status: {status_code}")]
    HttpStatus { status_code: u16 },

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Migration failed: {migration}")]
    MigrationFailed { migration: String },

    #[error("Read failed for key: {key}")]
    ReadFailed { key: String },

    #[error("Write failed for key: {key}")]
    WriteFailed { key: String },

    #[error("Store not connected")]
    NotConnected,

    #[error("Database locked while accessing key: {key}")]
    DatabaseLocked { key: String },

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Permission denied accessing config: {path}")]
    PermissionDenied { path: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
