//! Roles, role-specific details, and the finished signup profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The category of user signing up.
///
/// An unselected role is `Option<Role>::None` on the wizard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Role {
    Customer,
    Driver,
    Operator,
    Staff,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Customer, Role::Driver, Role::Operator, Role::Staff];

    /// Which shape of details this role produces.
    pub fn kind(&self) -> RoleKind {
        match self {
            Self::Customer => RoleKind::Customer,
            Self::Driver | Self::Operator | Self::Staff => RoleKind::Courier,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Customer => "Customer",
            Self::Driver => "Driver",
            Self::Operator => "Operator",
            Self::Staff => "Staff",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "driver" => Ok(Self::Driver),
            "operator" => Ok(Self::Operator),
            "staff" => Ok(Self::Staff),
            other => Err(format!("unknown role: {other:?}")),
        }
    }
}

// Clients send "Customer" as often as "customer".
impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Detail shape shared by a group of roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    Customer,
    /// Drivers, operators and staff: licence and vehicle details.
    Courier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VehicleType {
    Small,
    Medium,
    Big,
}

impl std::fmt::Display for VehicleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Small => "Small",
            Self::Medium => "Medium",
            Self::Big => "Big",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for VehicleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "big" => Ok(Self::Big),
            other => Err(format!("unknown vehicle type: {other:?}")),
        }
    }
}

impl<'de> Deserialize<'de> for VehicleType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Opaque handle to an uploaded driving licence photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensePhotoRef {
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl LicensePhotoRef {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Problem with the handle, if any. Only images are accepted.
    pub fn problem(&self) -> Option<&'static str> {
        if self.file_name.trim().is_empty() {
            return Some("file name is empty");
        }
        match self.content_type.as_deref() {
            Some(ct) if !ct.starts_with("image/") => Some("must be an image"),
            _ => None,
        }
    }
}

/// Role-specific part of a finished profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoleDetails {
    Customer {
        city: String,
        address: String,
    },
    Courier {
        license_number: String,
        vehicle_type: VehicleType,
        vehicle_info: String,
        license_photo: LicensePhotoRef,
    },
}

/// The finished, validated record handed to the session store.
///
/// Never mutated after the wizard emits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub email: String,
    pub role: Role,
    pub details: RoleDetails,
    pub completed_at: DateTime<Utc>,
}

impl Profile {
    pub fn city(&self) -> Option<&str> {
        match &self.details {
            RoleDetails::Customer { city, .. } => Some(city),
            RoleDetails::Courier { .. } => None,
        }
    }

    pub fn address(&self) -> Option<&str> {
        match &self.details {
            RoleDetails::Customer { address, .. } => Some(address),
            RoleDetails::Courier { .. } => None,
        }
    }

    pub fn license_number(&self) -> Option<&str> {
        match &self.details {
            RoleDetails::Courier { license_number, .. } => Some(license_number),
            RoleDetails::Customer { .. } => None,
        }
    }
}

/// A completed signup that can log in again. Emails are unique ignoring case.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredUser {
    pub email: String,
    /// bcrypt hash; the plain password is never stored.
    pub password_hash: String,
    pub profile: Profile,
}

/// Landing screen the client shows for a signed-in profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dashboard {
    CustomerHome,
    DriverDashboard,
    OperatorDashboard,
}

impl Dashboard {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Customer => Self::CustomerHome,
            Role::Driver => Self::DriverDashboard,
            Role::Operator | Role::Staff => Self::OperatorDashboard,
        }
    }
}

/// Settings keys used for session persistence.
pub mod settings_keys {
    /// Key for the signed-in Profile JSON blob in the settings table.
    pub const SESSION_PROFILE: &str = "session_profile";
    /// Default user ID (one session per device).
    pub const DEFAULT_USER: &str = "default";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn courier_profile() -> Profile {
        Profile {
            email: "d@swift2me.test".to_string(),
            role: Role::Driver,
            details: RoleDetails::Courier {
                license_number: "SC123456".to_string(),
                vehicle_type: VehicleType::Medium,
                vehicle_info: "Ford Transit, AB12 CDE".to_string(),
                license_photo: LicensePhotoRef::new("licence.jpg").with_content_type("image/jpeg"),
            },
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn role_parses_case_insensitively() {
        let r: Role = serde_json::from_str("\"Customer\"").unwrap();
        assert_eq!(r, Role::Customer);
        let r: Role = serde_json::from_str("\"OPERATOR\"").unwrap();
        assert_eq!(r, Role::Operator);
        assert!(serde_json::from_str::<Role>("\"\"").is_err());
        assert!(serde_json::from_str::<Role>("\"admin\"").is_err());
    }

    #[test]
    fn display_matches_serde() {
        for role in Role::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(format!("\"{role}\""), json);
        }
    }

    #[test]
    fn role_is_stored_capitalised() {
        assert_eq!(serde_json::to_string(&Role::Customer).unwrap(), "\"Customer\"");
        assert_eq!(serde_json::to_string(&Role::Staff).unwrap(), "\"Staff\"");
    }

    #[test]
    fn courier_roles_share_a_kind() {
        assert_eq!(Role::Customer.kind(), RoleKind::Customer);
        assert_eq!(Role::Driver.kind(), RoleKind::Courier);
        assert_eq!(Role::Operator.kind(), RoleKind::Courier);
        assert_eq!(Role::Staff.kind(), RoleKind::Courier);
    }

    #[test]
    fn vehicle_type_parses() {
        assert_eq!("medium".parse::<VehicleType>().unwrap(), VehicleType::Medium);
        assert_eq!(
            serde_json::from_str::<VehicleType>("\"Big\"").unwrap(),
            VehicleType::Big
        );
        assert!("truck".parse::<VehicleType>().is_err());
    }

    #[test]
    fn license_photo_must_be_an_image() {
        assert!(LicensePhotoRef::new("a.jpg").problem().is_none());
        assert!(LicensePhotoRef::new("a.png").with_content_type("image/png").problem().is_none());
        assert_eq!(
            LicensePhotoRef::new("a.pdf").with_content_type("application/pdf").problem(),
            Some("must be an image")
        );
        assert_eq!(LicensePhotoRef::new("  ").problem(), Some("file name is empty"));
    }

    #[test]
    fn profile_serde_roundtrip_keeps_details() {
        let profile = courier_profile();
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["role"], "Driver");
        assert_eq!(json["details"]["kind"], "courier");
        assert_eq!(json["details"]["vehicle_type"], "Medium");

        let parsed: Profile = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, profile);
        assert_eq!(parsed.license_number(), Some("SC123456"));
        assert!(parsed.city().is_none());
    }

    #[test]
    fn dashboard_follows_role() {
        assert_eq!(Dashboard::for_role(Role::Customer), Dashboard::CustomerHome);
        assert_eq!(Dashboard::for_role(Role::Driver), Dashboard::DriverDashboard);
        assert_eq!(Dashboard::for_role(Role::Operator), Dashboard::OperatorDashboard);
        assert_eq!(Dashboard::for_role(Role::Staff), Dashboard::OperatorDashboard);
    }
}
