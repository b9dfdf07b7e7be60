//! Configuration types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::ConfigError;
use crate::onboarding::model::Role;
use crate::onboarding::schema::{COURIER_TRACK, CUSTOMER_TRACK, PasswordPolicy, StepKind};

/// Cities a customer can pick at the city step.
pub const DEFAULT_CITIES: [&str; 7] = [
    "Edinburgh",
    "Musselburgh",
    "Dalkeith",
    "Bonnyrigg",
    "Livingston",
    "Bathgate",
    "Linlithgow",
];

/// Constants the wizard consumes: selectable cities, the step track for
/// each role, and which roles get a password strength rule.
#[derive(Debug, Clone, Serialize)]
pub struct WizardConfig {
    pub cities: Vec<String>,
    pub tracks: BTreeMap<Role, Vec<StepKind>>,
    pub password_policies: BTreeMap<Role, PasswordPolicy>,
}

impl Default for WizardConfig {
    fn default() -> Self {
        let mut tracks = BTreeMap::new();
        tracks.insert(Role::Customer, CUSTOMER_TRACK.to_vec());
        for role in [Role::Driver, Role::Operator, Role::Staff] {
            tracks.insert(role, COURIER_TRACK.to_vec());
        }

        // Customers sign up with any non-empty password.
        let mut password_policies = BTreeMap::new();
        for role in [Role::Driver, Role::Operator, Role::Staff] {
            password_policies.insert(role, PasswordPolicy::strong());
        }

        Self {
            cities: DEFAULT_CITIES.iter().map(|c| c.to_string()).collect(),
            tracks,
            password_policies,
        }
    }
}

impl WizardConfig {
    /// Replace the city list.
    pub fn with_cities<I, S>(mut self, cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cities = cities.into_iter().map(Into::into).collect();
        self
    }

    /// Steps for `role`. Every role has a track once `validate` passes.
    pub fn track(&self, role: Role) -> &[StepKind] {
        self.tracks.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn password_policy(&self, role: Role) -> Option<&PasswordPolicy> {
        self.password_policies.get(&role)
    }

    pub fn is_known_city(&self, city: &str) -> bool {
        self.cities.iter().any(|c| c == city)
    }

    /// Check that every role has a usable track and at least one city exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cities.iter().all(|c| c.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "cities".to_string(),
                message: "at least one city is required".to_string(),
            });
        }

        for role in Role::ALL {
            let track = self.track(role);
            if track.first() != Some(&StepKind::Credentials) {
                return Err(ConfigError::InvalidValue {
                    key: format!("tracks.{role}"),
                    message: "track must start with the credentials step".to_string(),
                });
            }
            if track.last() != Some(&StepKind::Consent) {
                return Err(ConfigError::InvalidValue {
                    key: format!("tracks.{role}"),
                    message: "track must end with the consent step".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub db_path: PathBuf,
    /// Seconds an untouched signup survives before it is swept.
    pub signup_ttl_secs: u32,
    pub wizard: WizardConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            db_path: PathBuf::from("./data/swift2me.db"),
            signup_ttl_secs: 30 * 60,
            wizard: WizardConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from `SWIFT2ME_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match std::env::var("SWIFT2ME_PORT") {
            Ok(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "SWIFT2ME_PORT".to_string(),
                message: format!("{e}"),
            })?,
            Err(_) => defaults.port,
        };

        let db_path = std::env::var("SWIFT2ME_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let signup_ttl_secs = match std::env::var("SWIFT2ME_SIGNUP_TTL_SECS") {
            Ok(raw) => match raw.trim().parse::<u32>() {
                Ok(0) => {
                    return Err(ConfigError::InvalidValue {
                        key: "SWIFT2ME_SIGNUP_TTL_SECS".to_string(),
                        message: "must be greater than zero".to_string(),
                    });
                }
                Ok(secs) => secs,
                Err(e) => {
                    return Err(ConfigError::InvalidValue {
                        key: "SWIFT2ME_SIGNUP_TTL_SECS".to_string(),
                        message: format!("{e}"),
                    });
                }
            },
            Err(_) => defaults.signup_ttl_secs,
        };

        let mut wizard = defaults.wizard;
        if let Ok(raw) = std::env::var("SWIFT2ME_CITIES") {
            let cities: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            wizard = wizard.with_cities(cities);
        }
        wizard.validate()?;

        Ok(Self {
            port,
            db_path,
            signup_ttl_secs,
            wizard,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = WizardConfig::default();
        config.validate().unwrap();
        assert_eq!(config.cities.len(), 7);
        assert!(config.is_known_city("Edinburgh"));
        assert!(!config.is_known_city("edinburgh"));
    }

    #[test]
    fn server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.signup_ttl_secs, 1800);
        assert!(config.db_path.ends_with("swift2me.db"));
    }

    #[test]
    fn password_rule_only_for_couriers_by_default() {
        let config = WizardConfig::default();
        assert!(config.password_policy(Role::Customer).is_none());
        for role in [Role::Driver, Role::Operator, Role::Staff] {
            assert_eq!(config.password_policy(role), Some(&PasswordPolicy::strong()));
        }
    }

    #[test]
    fn tracks_follow_role_kind() {
        let config = WizardConfig::default();
        assert_eq!(config.track(Role::Customer), &CUSTOMER_TRACK);
        assert_eq!(config.track(Role::Staff), &COURIER_TRACK);
    }

    #[test]
    fn empty_city_list_is_rejected() {
        let config = WizardConfig::default().with_cities(Vec::<String>::new());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "cities"
        ));
    }

    #[test]
    fn track_without_consent_is_rejected() {
        let mut config = WizardConfig::default();
        config
            .tracks
            .insert(Role::Driver, vec![StepKind::Credentials, StepKind::License]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tracks.Driver"));
    }

    #[test]
    fn missing_track_is_rejected() {
        let mut config = WizardConfig::default();
        config.tracks.remove(&Role::Staff);
        assert!(config.validate().is_err());
    }
}
