//! libSQL backend — async `SessionStore` and `UserStore` implementation.
//!
//! The signed-in profile is a JSON blob in the `settings` table, one row
//! per device user. Registered accounts live in `users`. Supports local file
//! and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info, warn};

use crate::error::DatabaseError;
use crate::onboarding::model::{Profile, RegisteredUser, settings_keys};
use crate::store::migrations;
use crate::store::traits::{SessionStore, UserStore};

/// libSQL store.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    /// Never read; held so the database lives as long as `conn`.
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    user_id: String,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
            user_id: settings_keys::DEFAULT_USER.to_string(),
        })
    }

    /// Scope the store to another settings user.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM settings WHERE user_id = ?1 AND key = ?2",
                params![self.user_id.as_str(), key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_setting: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<String>(0)
                .map(Some)
                .map_err(|e| DatabaseError::Query(format!("get_setting: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_setting: {e}"))),
        }
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO settings (user_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id, key) DO UPDATE SET value = ?3, updated_at = ?4",
                params![self.user_id.as_str(), key, value, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_setting: {e}")))?;
        Ok(())
    }

    async fn delete_setting(&self, key: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn
            .execute(
                "DELETE FROM settings WHERE user_id = ?1 AND key = ?2",
                params![self.user_id.as_str(), key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_setting: {e}")))?;
        Ok(count > 0)
    }
}

#[async_trait]
impl SessionStore for LibSqlStore {
    async fn load(&self) -> Result<Option<Profile>, DatabaseError> {
        let Some(raw) = self.get_setting(settings_keys::SESSION_PROFILE).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<Profile>(&raw) {
            Ok(profile) => {
                debug!(email = %profile.email, role = %profile.role, "Loaded stored session");
                Ok(Some(profile))
            }
            Err(e) => {
                warn!("Ignoring malformed stored session: {}", e);
                Ok(None)
            }
        }
    }

    async fn save(&self, profile: &Profile) -> Result<(), DatabaseError> {
        let value = serde_json::to_string(profile)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        self.set_setting(settings_keys::SESSION_PROFILE, &value).await?;
        info!(email = %profile.email, role = %profile.role, "Session saved");
        Ok(())
    }

    async fn clear(&self) -> Result<bool, DatabaseError> {
        self.delete_setting(settings_keys::SESSION_PROFILE).await
    }
}

#[async_trait]
impl UserStore for LibSqlStore {
    async fn register(&self, user: &RegisteredUser) -> Result<bool, DatabaseError> {
        let profile = serde_json::to_string(&user.profile)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let inserted = self
            .conn
            .execute(
                "INSERT INTO users (email, password_hash, role, profile) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (email) DO NOTHING",
                params![
                    user.email.as_str(),
                    user.password_hash.as_str(),
                    user.profile.role.to_string(),
                    profile
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("register: {e}")))?;

        if inserted > 0 {
            info!(email = %user.email, role = %user.profile.role, "User registered");
        }
        Ok(inserted > 0)
    }

    async fn find_user(&self, email: &str) -> Result<Option<RegisteredUser>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT email, password_hash, profile FROM users WHERE email = ?1",
                params![email],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("find_user: {e}")))?;

        let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("find_user: {e}")))?
        else {
            return Ok(None);
        };

        let email: String = row
            .get(0)
            .map_err(|e| DatabaseError::Query(format!("find_user: {e}")))?;
        let password_hash: String = row
            .get(1)
            .map_err(|e| DatabaseError::Query(format!("find_user: {e}")))?;
        let raw: String = row
            .get(2)
            .map_err(|e| DatabaseError::Query(format!("find_user: {e}")))?;
        let profile = serde_json::from_str(&raw)
            .map_err(|e| DatabaseError::Serialization(format!("profile of {email}: {e}")))?;

        Ok(Some(RegisteredUser {
            email,
            password_hash,
            profile,
        }))
    }

    async fn remove_user(&self, email: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn
            .execute("DELETE FROM users WHERE email = ?1", params![email])
            .await
            .map_err(|e| DatabaseError::Query(format!("remove_user: {e}")))?;
        Ok(count > 0)
    }
}
