//! Signup wizard — role-dependent step routing with validation guards and a
//! scroll-gated consent step.
//!
//! The wizard is synchronous and owns its state exclusively. Forward moves
//! are validated against the current step's required fields; backward moves
//! never are. `complete()` either hands back a full `Profile` and resets, or
//! changes nothing.

use std::sync::{Arc, LazyLock};

use chrono::Utc;
use regex::Regex;
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::debug;

use crate::config::WizardConfig;
use crate::error::{FieldError, WizardError};

use super::model::{Profile, Role, RoleDetails, RoleKind};
use super::schema::StepKind;
use super::state::{RoleDraft, ScrollReport, StepFields, WizardState};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("email pattern is valid"));

/// The onboarding wizard for a single signup.
#[derive(Debug, Clone)]
pub struct Wizard {
    config: Arc<WizardConfig>,
    state: WizardState,
}

impl Wizard {
    /// Fresh wizard at step 1 with no role.
    pub fn start(config: Arc<WizardConfig>) -> Self {
        Self {
            config,
            state: WizardState::default(),
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn step(&self) -> usize {
        self.state.step
    }

    pub fn role(&self) -> Option<Role> {
        self.state.role
    }

    /// Steps for the chosen role; just the credentials step before a role is picked.
    pub fn track(&self) -> &[StepKind] {
        match self.state.role {
            Some(role) => self.config.track(role),
            None => &[StepKind::Credentials],
        }
    }

    pub fn total_steps(&self) -> usize {
        self.track().len()
    }

    pub fn current_step_kind(&self) -> StepKind {
        self.track()
            .get(self.state.step - 1)
            .copied()
            .unwrap_or(StepKind::Credentials)
    }

    pub fn is_final_step(&self) -> bool {
        self.state.role.is_some() && self.state.step == self.total_steps()
    }

    /// Choose the role. Only legal on step 1.
    ///
    /// Switching to a role on a different track drops everything entered
    /// for the old track's role-specific steps and the consent gate.
    pub fn select_role(&mut self, role: Role) -> Result<(), WizardError> {
        if self.state.step != 1 {
            return Err(WizardError::InvalidTransition {
                step: self.state.step,
                action: "change role",
            });
        }

        if let Some(previous) = self.state.role {
            if self.config.track(previous) != self.config.track(role) {
                debug!(from = %previous, to = %role, "Role track changed, resetting role data");
                self.state.role_data = RoleDraft::default();
                self.state.consent = Default::default();
                self.state.ui = Default::default();
            }
        }
        self.state.role = Some(role);
        Ok(())
    }

    /// Merge `fields` for the current step, validate, and move forward.
    ///
    /// Returns the new step. On failure the step is unchanged and the merged
    /// values are kept. On the final step a satisfied consent leaves the
    /// wizard where it is, ready for `complete()`.
    pub fn submit_step(&mut self, fields: StepFields) -> Result<usize, WizardError> {
        let kind = self.current_step_kind();
        if kind == StepKind::Credentials {
            if let Some(role) = fields.role {
                self.select_role(role)?;
            }
        }

        self.merge(kind, fields);

        let errors = self.check_step(kind);
        if !errors.is_empty() {
            debug!(step = self.state.step, %kind, failed = errors.len(), "Step validation failed");
            return Err(WizardError::Validation(errors));
        }

        if self.state.step < self.total_steps() {
            self.state.step += 1;
            debug!(step = self.state.step, kind = %self.current_step_kind(), "Advanced");
        }
        Ok(self.state.step)
    }

    /// Move to the previous step without validating anything. Entered
    /// values and the consent gate are kept.
    pub fn go_back(&mut self) -> Result<usize, WizardError> {
        if self.state.step <= 1 {
            return Err(WizardError::AtFirstStep);
        }
        self.state.step -= 1;
        Ok(self.state.step)
    }

    /// Feed a scroll event from the terms box. Ignored off the consent step.
    /// Returns whether the gate is open.
    pub fn record_scroll_progress(&mut self, report: impl Into<ScrollReport>) -> bool {
        if self.current_step_kind() != StepKind::Consent {
            debug!(step = self.state.step, "Scroll report outside consent step ignored");
            return false;
        }
        self.state.consent.record_scroll(report.into().reached_end());
        self.state.consent.has_scrolled_to_end()
    }

    /// Tick or untick the agreement box. Ticking does nothing until the
    /// terms have been scrolled to the end. Returns the resulting value.
    pub fn set_agreed(&mut self, value: bool) -> bool {
        let agreed = self.state.consent.set_agreed(value);
        self.state.ui.show_confetti = self.state.consent.is_satisfied();
        agreed
    }

    /// Emit the finished profile and reset the wizard.
    pub fn complete(&mut self) -> Result<Profile, WizardError> {
        if !self.is_final_step() {
            return Err(WizardError::NotAtFinalStep {
                step: self.state.step,
                final_step: self.total_steps(),
            });
        }
        if !self.state.consent.is_satisfied() {
            return Err(WizardError::IncompleteConsent);
        }

        let profile = self.build_profile()?;
        self.reset();
        Ok(profile)
    }

    /// Back to a blank wizard (cancel/logout).
    pub fn reset(&mut self) {
        self.state = WizardState::default();
    }

    /// Serializable snapshot without the password.
    pub fn view(&self) -> WizardView {
        WizardView {
            step: self.state.step,
            total_steps: self.total_steps(),
            step_kind: self.current_step_kind(),
            required_fields: self.current_step_kind().required_fields(),
            track: self.track().to_vec(),
            role: self.state.role,
            email: self.state.credentials.email.clone(),
            role_data: self.state.role_data.clone(),
            has_scrolled_to_end: self.state.consent.has_scrolled_to_end(),
            agreed: self.state.consent.agreed(),
            can_complete: self.is_final_step() && self.state.consent.is_satisfied(),
            show_confetti: self.state.ui.show_confetti,
        }
    }

    fn merge(&mut self, kind: StepKind, fields: StepFields) {
        let draft = &mut self.state.role_data;
        match kind {
            StepKind::Credentials => {
                if let Some(email) = fields.email {
                    self.state.credentials.email = email.trim().to_string();
                }
                if let Some(password) = fields.password {
                    self.state.credentials.password = password;
                }
            }
            StepKind::City => {
                if let Some(city) = fields.city {
                    draft.city = Some(city.trim().to_string());
                }
            }
            StepKind::Address => {
                if let Some(address) = fields.address {
                    draft.address = Some(address);
                }
            }
            StepKind::License => {
                if let Some(license) = fields.license_number {
                    draft.license_number = Some(license.trim().to_string());
                }
            }
            StepKind::Vehicle => {
                if fields.vehicle_type.is_some() {
                    draft.vehicle_type = fields.vehicle_type;
                }
                if let Some(info) = fields.vehicle_info {
                    draft.vehicle_info = Some(info);
                }
                if fields.license_photo.is_some() {
                    draft.license_photo = fields.license_photo;
                }
            }
            StepKind::Consent => {}
        }
    }

    fn check_step(&self, kind: StepKind) -> Vec<FieldError> {
        let draft = &self.state.role_data;
        let mut errors = Vec::new();
        match kind {
            StepKind::Credentials => {
                let email = &self.state.credentials.email;
                if email.is_empty() {
                    errors.push(FieldError::missing("email"));
                } else if !EMAIL_RE.is_match(email) {
                    errors.push(FieldError::malformed("email", "not an email address"));
                }

                let password = self.state.credentials.password.expose_secret();
                if password.is_empty() {
                    errors.push(FieldError::missing("password"));
                } else if let Some(policy) =
                    self.state.role.and_then(|r| self.config.password_policy(r))
                {
                    let violations = policy.violations(password);
                    if !violations.is_empty() {
                        errors.push(FieldError::malformed("password", violations.join("; ")));
                    }
                }

                if self.state.role.is_none() {
                    errors.push(FieldError::missing("role"));
                }
            }
            StepKind::City => match draft.city.as_deref() {
                None | Some("") => errors.push(FieldError::missing("city")),
                Some(city) if !self.config.is_known_city(city) => {
                    errors.push(FieldError::malformed("city", format!("{city} is not served")))
                }
                Some(_) => {}
            },
            StepKind::Address => {
                if is_blank(&draft.address) {
                    errors.push(FieldError::missing("address"));
                }
            }
            StepKind::License => {
                if is_blank(&draft.license_number) {
                    errors.push(FieldError::missing("license_number"));
                }
            }
            StepKind::Vehicle => {
                if draft.vehicle_type.is_none() {
                    errors.push(FieldError::missing("vehicle_type"));
                }
                if is_blank(&draft.vehicle_info) {
                    errors.push(FieldError::missing("vehicle_info"));
                }
                match &draft.license_photo {
                    None => errors.push(FieldError::missing("license_photo")),
                    Some(photo) => {
                        if let Some(problem) = photo.problem() {
                            errors.push(FieldError::malformed("license_photo", problem));
                        }
                    }
                }
            }
            StepKind::Consent => {
                if !self.state.consent.has_scrolled_to_end() {
                    errors.push(FieldError::missing("has_scrolled_to_end"));
                }
                if !self.state.consent.agreed() {
                    errors.push(FieldError::missing("agreed"));
                }
            }
        }
        errors
    }

    fn build_profile(&self) -> Result<Profile, WizardError> {
        let role = self.state.role.ok_or(WizardError::NotAtFinalStep {
            step: self.state.step,
            final_step: self.total_steps(),
        })?;
        let draft = self.state.role_data.clone();

        let details = match role.kind() {
            RoleKind::Customer => match (draft.city, draft.address) {
                (Some(city), Some(address)) => RoleDetails::Customer { city, address },
                (city, address) => {
                    let mut errors = Vec::new();
                    if city.is_none() {
                        errors.push(FieldError::missing("city"));
                    }
                    if address.is_none() {
                        errors.push(FieldError::missing("address"));
                    }
                    return Err(WizardError::Validation(errors));
                }
            },
            RoleKind::Courier => match (
                draft.license_number,
                draft.vehicle_type,
                draft.vehicle_info,
                draft.license_photo,
            ) {
                (Some(license_number), Some(vehicle_type), Some(vehicle_info), Some(license_photo)) => {
                    RoleDetails::Courier {
                        license_number,
                        vehicle_type,
                        vehicle_info,
                        license_photo,
                    }
                }
                (license_number, vehicle_type, vehicle_info, license_photo) => {
                    let mut errors = Vec::new();
                    if license_number.is_none() {
                        errors.push(FieldError::missing("license_number"));
                    }
                    if vehicle_type.is_none() {
                        errors.push(FieldError::missing("vehicle_type"));
                    }
                    if vehicle_info.is_none() {
                        errors.push(FieldError::missing("vehicle_info"));
                    }
                    if license_photo.is_none() {
                        errors.push(FieldError::missing("license_photo"));
                    }
                    return Err(WizardError::Validation(errors));
                }
            },
        };

        Ok(Profile {
            email: self.state.credentials.email.clone(),
            role,
            details,
            completed_at: Utc::now(),
        })
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

/// What a client needs to render the current step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WizardView {
    pub step: usize,
    pub total_steps: usize,
    pub step_kind: StepKind,
    pub required_fields: &'static [&'static str],
    pub track: Vec<StepKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub email: String,
    pub role_data: RoleDraft,
    pub has_scrolled_to_end: bool,
    pub agreed: bool,
    pub can_complete: bool,
    pub show_confetti: bool,
}
