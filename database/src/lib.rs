use async_trait::async_trait;
use postboard_core::{CoreError, PersistenceError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

pub mod search;


pub use search::{open_search_preference, SearchPreference};

/// Key-value persistence for small user preferences.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CoreError>;

    /// Stores `value` under `key`, replacing whatever was there.
    async fn set(&self, key: &str, value: &str) -> Result<(), CoreError>;
}

pub struct Database {
    connection_string: String,
    pool: Option<SqlitePool>,
}

impl Database {
    pub fn new(connection_string: String) -> Self {
        Self {
            connection_string,
            pool: None,
        }
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    pub async fn connect(&mut self) -> Result<(), CoreError> {
        let options = SqliteConnectOptions::from_str(&self.connection_string)
            .map_err(|e| PersistenceError::ConnectionFailed {
                reason: e.to_string(),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                error!("Failed to open {}: {}", self.connection_string, e);
                PersistenceError::ConnectionFailed {
                    reason: e.to_string(),
                }
            })?;

        info!("Connected to preference store at {}", self.connection_string);
        self.pool = Some(pool);
        Ok(())
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        let pool = self.pool()?;
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|e| PersistenceError::MigrationFailed {
                migration: e.to_string(),
            })?;
        debug!("Preference store migrations applied");
        Ok(())
    }

    pub async fn save_setting(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let pool = self.pool()?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(pool)
        .await
        .map_err(|e| {
            error!("Failed to write setting {}: {}", key, e);
            sql_error(key, e)
        })?;

        debug!("Saved setting {}", key);
        Ok(())
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, CoreError> {
        let pool = self.pool()?;

        let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                error!("Failed to read setting {}: {}", key, e);
                sql_error(key, e)
            })?;

        Ok(value)
    }

    pub async fn setting_updated_at(&self, key: &str) -> Result<Option<i64>, CoreError> {
        let pool = self.pool()?;

        let updated_at =
            sqlx::query_scalar::<_, i64>("SELECT updated_at FROM settings WHERE key = ?")
                .bind(key)
                .fetch_optional(pool)
                .await
                .map_err(|e| sql_error(key, e))?;

        Ok(updated_at)
    }

    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }

    fn pool(&self) -> Result<&SqlitePool, CoreError> {
        self.pool
            .as_ref()
            .ok_or(CoreError::Persistence(PersistenceError::NotConnected))
    }
}

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// True for SQLite result codes (primary or extended) meaning the database
/// is held by another connection.
fn is_locked_code(code: &str) -> bool {
    code.parse::<i32>()
        .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false)
}

fn sql_error(key: &str, e: sqlx::Error) -> PersistenceError {
    let locked = match &e {
        sqlx::Error::Database(db_error) => db_error.code().is_some_and(|c| is_locked_code(&c)),
        _ => false,
    };

    if locked {
        PersistenceError::DatabaseLocked {
            key: key.to_string(),
        }
    } else {
        PersistenceError::Sql(e)
    }
}

#[async_trait]
impl PreferenceStore for Database {
    async fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        self.get_setting(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.save_setting(key, value).await
    }
}

/// Preference store kept in memory, for sessions without a writable disk
/// and for tests. Failures can be switched on to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: RwLock<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PersistenceError::ReadFailed {
                key: key.to_string(),
            }
            .into());
        }
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::WriteFailed {
                key: key.to_string(),
            }
            .into());
        }
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
