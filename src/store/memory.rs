//! In-memory session and account store, for tests and ephemeral runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DatabaseError;
use crate::onboarding::model::{Profile, RegisteredUser};
use crate::store::traits::{SessionStore, UserStore};

#[derive(Default)]
pub struct InMemoryStore {
    profile: RwLock<Option<Profile>>,
    /// Keyed by lowercased email.
    users: RwLock<HashMap<String, RegisteredUser>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `profile` already signed in.
    pub fn with_profile(profile: Profile) -> Self {
        Self {
            profile: RwLock::new(Some(profile)),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn load(&self) -> Result<Option<Profile>, DatabaseError> {
        Ok(self.profile.read().await.clone())
    }

    async fn save(&self, profile: &Profile) -> Result<(), DatabaseError> {
        *self.profile.write().await = Some(profile.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<bool, DatabaseError> {
        Ok(self.profile.write().await.take().is_some())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn register(&self, user: &RegisteredUser) -> Result<bool, DatabaseError> {
        let mut users = self.users.write().await;
        let key = user.email.to_lowercase();
        if users.contains_key(&key) {
            return Ok(false);
        }
        users.insert(key, user.clone());
        Ok(true)
    }

    async fn find_user(&self, email: &str) -> Result<Option<RegisteredUser>, DatabaseError> {
        Ok(self.users.read().await.get(&email.to_lowercase()).cloned())
    }

    async fn remove_user(&self, email: &str) -> Result<bool, DatabaseError> {
        Ok(self.users.write().await.remove(&email.to_lowercase()).is_some())
    }
}
