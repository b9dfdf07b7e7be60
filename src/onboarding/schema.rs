//! Step kinds, the fields each one requires, and password rules.

use serde::{Deserialize, Serialize};

/// One screen of the signup wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Email, password and role.
    Credentials,
    City,
    Address,
    /// Driving licence number.
    License,
    /// Vehicle type, vehicle info and licence photo.
    Vehicle,
    /// Terms read-receipt and agreement.
    Consent,
}

impl StepKind {
    /// Field names this step requires before the wizard moves forward.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Credentials => &["email", "password", "role"],
            Self::City => &["city"],
            Self::Address => &["address"],
            Self::License => &["license_number"],
            Self::Vehicle => &["vehicle_type", "vehicle_info", "license_photo"],
            Self::Consent => &["has_scrolled_to_end", "agreed"],
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Credentials => "credentials",
            Self::City => "city",
            Self::Address => "address",
            Self::License => "license",
            Self::Vehicle => "vehicle",
            Self::Consent => "consent",
        };
        write!(f, "{s}")
    }
}

/// Customer track: credentials, city, address, consent.
pub const CUSTOMER_TRACK: [StepKind; 4] = [
    StepKind::Credentials,
    StepKind::City,
    StepKind::Address,
    StepKind::Consent,
];

/// Driver/operator/staff track: credentials, licence, vehicle, consent.
pub const COURIER_TRACK: [StepKind; 4] = [
    StepKind::Credentials,
    StepKind::License,
    StepKind::Vehicle,
    StepKind::Consent,
];

/// Password strength rule applied at the credentials step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_digit: bool,
}

impl PasswordPolicy {
    /// Minimum 8 characters, one uppercase letter, one digit.
    pub fn strong() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_digit: true,
        }
    }

    /// Every rule the password breaks, in a stable order.
    pub fn violations(&self, password: &str) -> Vec<String> {
        let mut problems = Vec::new();
        if password.chars().count() < self.min_length {
            problems.push(format!("must be at least {} characters", self.min_length));
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            problems.push("must contain an uppercase letter".to_string());
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            problems.push("must contain a digit".to_string());
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_start_with_credentials_and_end_with_consent() {
        for track in [CUSTOMER_TRACK, COURIER_TRACK] {
            assert_eq!(track.first(), Some(&StepKind::Credentials));
            assert_eq!(track.last(), Some(&StepKind::Consent));
        }
    }

    #[test]
    fn vehicle_step_requires_photo() {
        assert!(StepKind::Vehicle.required_fields().contains(&"license_photo"));
    }

    #[test]
    fn strong_policy_reports_each_violation() {
        let policy = PasswordPolicy::strong();
        assert!(policy.violations("Secret123").is_empty());
        assert_eq!(policy.violations("x").len(), 3);
        assert_eq!(
            policy.violations("secret123"),
            vec!["must contain an uppercase letter".to_string()]
        );
        assert_eq!(
            policy.violations("SecretPass"),
            vec!["must contain a digit".to_string()]
        );
        assert_eq!(policy.violations("Sec1").len(), 1);
    }

    #[test]
    fn display_matches_serde() {
        for kind in COURIER_TRACK.iter().chain(CUSTOMER_TRACK.iter()) {
            let json = serde_json::to_string(kind).unwrap();
            assert_eq!(format!("\"{kind}\""), json);
        }
    }
}
