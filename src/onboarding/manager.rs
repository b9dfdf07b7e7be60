//! OnboardingManager — owns in-flight signup wizards, registers finished
//! signups as accounts, and keeps the signed-in session.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::SecretString;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth;
use crate::config::WizardConfig;
use crate::error::{OnboardingError, WizardError};
use crate::store::{SessionStore, UserStore};

use super::model::{Dashboard, Profile, RegisteredUser, Role};
use super::state::{ScrollReport, StepFields};
use super::wizard::{Wizard, WizardView};

/// Seconds an untouched signup is kept before it is dropped.
pub const DEFAULT_SIGNUP_TTL_SECS: i64 = 30 * 60;

/// A signed-in profile and the dashboard it lands on.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub profile: Profile,
    pub dashboard: Dashboard,
}

impl From<Profile> for Session {
    fn from(profile: Profile) -> Self {
        let dashboard = Dashboard::for_role(profile.role);
        Self { profile, dashboard }
    }
}

struct InFlight {
    wizard: Wizard,
    last_touched: DateTime<Utc>,
}

impl InFlight {
    fn new(wizard: Wizard) -> Self {
        Self {
            wizard,
            last_touched: Utc::now(),
        }
    }
}

/// Coordinates signup wizards, one per id, with the account and session stores.
pub struct OnboardingManager {
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    config: Arc<WizardConfig>,
    wizards: RwLock<HashMap<Uuid, InFlight>>,
    signup_ttl: TimeDelta,
}

impl OnboardingManager {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
        config: WizardConfig,
    ) -> Self {
        Self {
            sessions,
            users,
            config: Arc::new(config),
            wizards: RwLock::new(HashMap::new()),
            signup_ttl: TimeDelta::seconds(DEFAULT_SIGNUP_TTL_SECS),
        }
    }

    /// Drop signups left untouched for longer than `ttl`.
    pub fn with_signup_ttl(mut self, ttl: TimeDelta) -> Self {
        self.signup_ttl = ttl;
        self
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    /// The stored session, if any. Clients use this to skip the wizard.
    pub async fn current_session(&self) -> Result<Option<Session>, OnboardingError> {
        Ok(self.sessions.load().await?.map(Session::from))
    }

    /// Forget the stored session. Returns whether one existed.
    pub async fn logout(&self) -> Result<bool, OnboardingError> {
        let existed = self.sessions.clear().await?;
        info!(existed, "Logged out");
        Ok(existed)
    }

    /// Check a registered account's password and sign it in.
    ///
    /// Unknown emails and wrong passwords fail the same way.
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, OnboardingError> {
        let Some(user) = self.users.find_user(email.trim()).await? else {
            debug!("Login for unregistered email");
            return Err(OnboardingError::InvalidCredentials);
        };
        if !auth::verify_password(password, &user.password_hash).await? {
            info!(email = %user.email, "Login rejected");
            return Err(OnboardingError::InvalidCredentials);
        }

        self.sessions.save(&user.profile).await?;
        info!(email = %user.email, role = %user.profile.role, "Logged in");
        Ok(Session::from(user.profile))
    }

    /// Start a fresh wizard. Abandoned ones are swept first.
    pub async fn begin(&self) -> (Uuid, WizardView) {
        self.expire_stale().await;

        let id = Uuid::new_v4();
        let wizard = Wizard::start(Arc::clone(&self.config));
        let view = wizard.view();
        self.wizards.write().await.insert(id, InFlight::new(wizard));
        info!(wizard_id = %id, "Signup started");
        (id, view)
    }

    pub async fn view(&self, id: Uuid) -> Result<WizardView, OnboardingError> {
        let wizards = self.wizards.read().await;
        wizards
            .get(&id)
            .map(|entry| entry.wizard.view())
            .ok_or(OnboardingError::NotFound { id })
    }

    pub async fn select_role(&self, id: Uuid, role: Role) -> Result<WizardView, OnboardingError> {
        self.with_wizard(id, |w| w.select_role(role)).await?;
        debug!(wizard_id = %id, %role, "Role selected");
        self.view(id).await
    }

    pub async fn submit_step(
        &self,
        id: Uuid,
        fields: StepFields,
    ) -> Result<WizardView, OnboardingError> {
        let step = self.with_wizard(id, |w| w.submit_step(fields)).await?;
        debug!(wizard_id = %id, step, "Step submitted");
        self.view(id).await
    }

    pub async fn go_back(&self, id: Uuid) -> Result<WizardView, OnboardingError> {
        self.with_wizard(id, |w| w.go_back()).await?;
        self.view(id).await
    }

    pub async fn record_scroll(
        &self,
        id: Uuid,
        report: ScrollReport,
    ) -> Result<WizardView, OnboardingError> {
        self.with_wizard(id, |w| Ok(w.record_scroll_progress(report)))
            .await?;
        self.view(id).await
    }

    pub async fn set_agreed(&self, id: Uuid, agreed: bool) -> Result<WizardView, OnboardingError> {
        self.with_wizard(id, |w| Ok(w.set_agreed(agreed))).await?;
        self.view(id).await
    }

    /// Finish the signup: register the account, sign it in, then drop the
    /// wizard.
    ///
    /// If any of that fails the wizard is left exactly as it was and no
    /// account is kept.
    pub async fn complete(&self, id: Uuid) -> Result<Session, OnboardingError> {
        let mut wizards = self.wizards.write().await;
        let entry = wizards.get(&id).ok_or(OnboardingError::NotFound { id })?;

        let mut attempt = entry.wizard.clone();
        let credentials = attempt.state().credentials.clone();
        let profile = attempt.complete()?;

        let user = RegisteredUser {
            email: profile.email.clone(),
            password_hash: auth::hash_password(&credentials.password).await?,
            profile: profile.clone(),
        };
        if !self.users.register(&user).await? {
            info!(wizard_id = %id, "Signup rejected: email already registered");
            return Err(OnboardingError::EmailTaken {
                email: profile.email,
            });
        }

        if let Err(e) = self.sessions.save(&profile).await {
            warn!(wizard_id = %id, "Failed to save session: {}", e);
            if let Err(undo) = self.users.remove_user(&user.email).await {
                warn!(email = %user.email, "Failed to roll back registration: {}", undo);
            }
            return Err(e.into());
        }
        wizards.remove(&id);

        info!(wizard_id = %id, role = %profile.role, "Signup completed");
        Ok(Session::from(profile))
    }

    /// Abandon a wizard. Returns whether it existed.
    pub async fn cancel(&self, id: Uuid) -> bool {
        let removed = self.wizards.write().await.remove(&id).is_some();
        if removed {
            info!(wizard_id = %id, "Signup cancelled");
        }
        removed
    }

    /// Number of wizards in flight.
    pub async fn active_count(&self) -> usize {
        self.wizards.read().await.len()
    }

    /// Drop wizards untouched for longer than the signup TTL.
    /// Returns the number dropped.
    pub async fn expire_stale(&self) -> usize {
        self.expire_untouched_since(Utc::now() - self.signup_ttl).await
    }

    /// Drop wizards last touched before `cutoff`.
    pub async fn expire_untouched_since(&self, cutoff: DateTime<Utc>) -> usize {
        let mut wizards = self.wizards.write().await;
        let before = wizards.len();
        wizards.retain(|id, entry| {
            let keep = entry.last_touched >= cutoff;
            if !keep {
                debug!(wizard_id = %id, "Signup expired");
            }
            keep
        });

        let expired = before - wizards.len();
        if expired > 0 {
            info!(expired, remaining = wizards.len(), "Expired abandoned signups");
        }
        expired
    }

    async fn with_wizard<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Wizard) -> Result<T, WizardError>,
    ) -> Result<T, OnboardingError> {
        let mut wizards = self.wizards.write().await;
        let entry = wizards
            .get_mut(&id)
            .ok_or(OnboardingError::NotFound { id })?;
        entry.last_touched = Utc::now();
        Ok(f(&mut entry.wizard)?)
    }
}
