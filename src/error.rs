//! Error types for Swift2Me.

use serde::Serialize;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Password hashing errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Password hashing failed: {0}")]
    Hash(String),
}

/// A single field that blocked a forward step transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field name as the client sends it, e.g. `"license_photo"`.
    pub field: &'static str,
    pub problem: FieldProblem,
}

impl FieldError {
    pub fn missing(field: &'static str) -> Self {
        Self {
            field,
            problem: FieldProblem::Missing,
        }
    }

    pub fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            problem: FieldProblem::Malformed(reason.into()),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.problem {
            FieldProblem::Missing => write!(f, "{} is required", self.field),
            FieldProblem::Malformed(reason) => write!(f, "{}: {}", self.field, reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum FieldProblem {
    Missing,
    Malformed(String),
}

/// Wizard state machine errors. All of them are recoverable: the wizard
/// stays on its current step with its entered values intact.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("Validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("Cannot {action} at step {step}")]
    InvalidTransition { step: usize, action: &'static str },

    #[error("Terms must be read to the end and accepted before finishing")]
    IncompleteConsent,

    #[error("Not at final step: at step {step} of {final_step}")]
    NotAtFinalStep { step: usize, final_step: usize },

    #[error("Already at the first step")]
    AtFirstStep,
}

impl WizardError {
    /// Field names that failed validation, empty for non-validation errors.
    pub fn failed_fields(&self) -> Vec<&'static str> {
        match self {
            Self::Validation(errors) => errors.iter().map(|e| e.field).collect(),
            _ => Vec::new(),
        }
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from the onboarding manager (wizard registry, accounts, session).
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("Signup {id} not found")]
    NotFound { id: uuid::Uuid },

    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error("Email already registered")]
    EmailTaken { email: String },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Store error: {0}")]
    Database(#[from] DatabaseError),
}
