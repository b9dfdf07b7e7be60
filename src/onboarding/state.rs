//! Wizard state — draft profile, navigation position, and the consent gate.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::model::{LicensePhotoRef, Role, VehicleType};

/// Pixels of slack when deciding whether a terms box is scrolled to the end.
pub const SCROLL_END_TOLERANCE: f64 = 5.0;

/// Email and password collected at the first step.
#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Clone for Credentials {
    fn clone(&self) -> Self {
        Self {
            email: self.email.clone(),
            password: SecretString::from(self.password.expose_secret().to_string()),
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: SecretString::from(String::new()),
        }
    }
}

impl Credentials {
    pub fn has_password(&self) -> bool {
        !self.password.expose_secret().is_empty()
    }
}

/// Role-conditional fields. Only those belonging to the active track are
/// ever filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<VehicleType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_photo: Option<LicensePhotoRef>,
}

/// Read-before-agree gate on the final step.
///
/// `agreed` is only ever true while `has_scrolled_to_end` is true.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Consent {
    has_scrolled_to_end: bool,
    agreed: bool,
}

impl Consent {
    pub fn has_scrolled_to_end(&self) -> bool {
        self.has_scrolled_to_end
    }

    pub fn agreed(&self) -> bool {
        self.agreed
    }

    pub fn is_satisfied(&self) -> bool {
        self.has_scrolled_to_end && self.agreed
    }

    /// Once the end has been reached the gate stays open.
    pub fn record_scroll(&mut self, reached_end: bool) {
        self.has_scrolled_to_end |= reached_end;
    }

    /// Returns the resulting agreement. Agreeing is a no-op while the gate
    /// is closed; withdrawing is always allowed.
    pub fn set_agreed(&mut self, value: bool) -> bool {
        if value && !self.has_scrolled_to_end {
            return self.agreed;
        }
        self.agreed = value;
        self.agreed
    }
}

/// Scroll event from the terms box.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScrollReport {
    /// Raw element metrics; end is reached within `SCROLL_END_TOLERANCE`.
    Metrics {
        scroll_top: f64,
        client_height: f64,
        scroll_height: f64,
    },
    /// The client already decided.
    Flag { reached_end: bool },
}

impl ScrollReport {
    pub fn reached_end(&self) -> bool {
        match *self {
            Self::Metrics {
                scroll_top,
                client_height,
                scroll_height,
            } => scroll_top + client_height >= scroll_height - SCROLL_END_TOLERANCE,
            Self::Flag { reached_end } => reached_end,
        }
    }
}

impl From<bool> for ScrollReport {
    fn from(reached_end: bool) -> Self {
        Self::Flag { reached_end }
    }
}

/// Transient presentation flags. Never part of a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UiFlags {
    pub show_confetti: bool,
}

/// Field values submitted for a step. Fields that don't belong to the
/// current step are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct StepFields {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub vehicle_type: Option<VehicleType>,
    #[serde(default)]
    pub vehicle_info: Option<String>,
    #[serde(default)]
    pub license_photo: Option<LicensePhotoRef>,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

impl StepFields {
    pub fn credentials(email: &str, password: &str) -> Self {
        Self {
            email: Some(email.to_string()),
            password: Some(SecretString::from(password.to_string())),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn city(city: &str) -> Self {
        Self {
            city: Some(city.to_string()),
            ..Default::default()
        }
    }

    pub fn address(address: &str) -> Self {
        Self {
            address: Some(address.to_string()),
            ..Default::default()
        }
    }

    pub fn license(license_number: &str) -> Self {
        Self {
            license_number: Some(license_number.to_string()),
            ..Default::default()
        }
    }

    pub fn vehicle(
        vehicle_type: VehicleType,
        vehicle_info: &str,
        license_photo: Option<LicensePhotoRef>,
    ) -> Self {
        Self {
            vehicle_type: Some(vehicle_type),
            vehicle_info: Some(vehicle_info.to_string()),
            license_photo,
            ..Default::default()
        }
    }
}

/// Everything the wizard has collected so far, plus where it is.
#[derive(Debug, Clone)]
pub struct WizardState {
    /// 1-based position within the active role's track.
    pub step: usize,
    pub role: Option<Role>,
    pub credentials: Credentials,
    pub role_data: RoleDraft,
    pub consent: Consent,
    pub ui: UiFlags,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            step: 1,
            role: None,
            credentials: Credentials::default(),
            role_data: RoleDraft::default(),
            consent: Consent::default(),
            ui: UiFlags::default(),
        }
    }
}
