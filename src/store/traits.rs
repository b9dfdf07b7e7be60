//! Store traits: the signed-in session that lets the next launch skip the
//! wizard, and the registered accounts that can log back in.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::onboarding::model::{Profile, RegisteredUser};

/// Backend-agnostic session store holding at most one signed-in profile.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The stored profile, or `None` if nobody is signed in or the stored
    /// record is unreadable.
    async fn load(&self) -> Result<Option<Profile>, DatabaseError>;

    /// Replace the stored profile.
    async fn save(&self, profile: &Profile) -> Result<(), DatabaseError>;

    /// Forget the stored profile (logout). Returns whether one existed.
    async fn clear(&self) -> Result<bool, DatabaseError>;
}

/// Registered accounts, keyed by email without regard to case.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Add an account. Returns `false` if the email is already registered.
    async fn register(&self, user: &RegisteredUser) -> Result<bool, DatabaseError>;

    async fn find_user(&self, email: &str) -> Result<Option<RegisteredUser>, DatabaseError>;

    /// Delete an account. Returns whether one existed.
    async fn remove_user(&self, email: &str) -> Result<bool, DatabaseError>;
}
