//! Onboarding system — the multi-step signup wizard.
//!
//! A new user picks a role, then walks through the steps of that role's
//! track: credentials, role-specific details, and a terms step that can only
//! be agreed to after the terms have been scrolled to the end. The finished
//! `Profile` is registered as an account and becomes the signed-in session.
//! Its role picks the dashboard.

pub mod manager;
pub mod model;
pub mod routes;
pub mod schema;
pub mod state;
pub mod wizard;

pub use manager::{OnboardingManager, Session};
pub use model::{Dashboard, LicensePhotoRef, Profile, RegisteredUser, Role, RoleDetails, VehicleType};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use schema::{PasswordPolicy, StepKind};
pub use state::{ScrollReport, StepFields, WizardState};
pub use wizard::{Wizard, WizardView};
