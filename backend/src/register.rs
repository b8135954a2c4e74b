//! Single-member registration.
//!
//! [`FormState`] holds what the user typed, [`RegisterForm`] drives one
//! submission at a time against the store. A failed submission keeps the
//! input so nothing has to be typed again.

use serde::Serialize;

use crate::error::{RegisterError, RegisterResult, StoreError};
use crate::logs::{log_error, log_info, log_success};
use crate::mapper::{digits_only, to_record, FlagPolicy};
use crate::models::{Field, MemberId, MemberRecord, MembershipYear, RawMember};
use crate::store::MemberStore;
use crate::validation::{validate_form, FormErrors};

/// Inline error attached to the name field when the store call fails.
pub const REGISTRATION_FAILED: &str = "Registration failed. Please try again.";

pub fn registered_message(name: &str) -> String {
    format!("{name} has been successfully registered as a member!")
}

// =============================================================================
// Form state
// =============================================================================

/// Raw form input plus per-field errors from the last validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormState {
    values: RawMember,
    errors: FormErrors,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &RawMember {
        &self.values
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    /// Edit one field. Phone fields keep digits only; the field's error is cleared.
    pub fn set(&mut self, field: Field, value: &str) {
        if field.is_phone() {
            self.values.set(field, &digits_only(value));
        } else {
            self.values.set(field, value);
        }
        self.errors.remove(&field);
    }

    /// Tick or untick a year and set its receipt.
    pub fn set_year(&mut self, year: MembershipYear, active: bool, receipt: &str) {
        self.values.set_flag(year, active);
        self.set(Field::Receipt(year), receipt);
        self.errors.remove(&Field::YearFlag(year));
    }

    /// Run the form rules, replacing any previous errors.
    pub fn validate(&mut self) -> bool {
        match validate_form(&self.values) {
            Ok(()) => {
                self.errors.clear();
                true
            }
            Err(errors) => {
                self.errors = errors;
                false
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl From<RawMember> for FormState {
    fn from(raw: RawMember) -> Self {
        let mut form = FormState::new();
        for field in Field::all() {
            match field {
                Field::YearFlag(year) => form.values.set_flag(year, raw.years.get(year).active),
                _ => form.set(field, raw.text(field)),
            }
        }
        form
    }
}

// =============================================================================
// Registration session
// =============================================================================

/// Outcome of the last registration attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RegistrationState {
    #[default]
    Idle,
    InFlight,
    Registered {
        id: MemberId,
        message: String,
    },
    Failed {
        cause: String,
    },
}

impl RegistrationState {
    /// Confirmation text after a successful registration.
    pub fn message(&self) -> Option<&str> {
        match self {
            RegistrationState::Registered { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// One registration form session.
#[derive(Debug, Default)]
pub struct RegisterForm {
    form: FormState,
    state: RegistrationState,
    flag_policy: FlagPolicy,
}

impl RegisterForm {
    pub fn new(flag_policy: FlagPolicy) -> Self {
        Self {
            flag_policy,
            ..Self::default()
        }
    }

    /// Start a session from already collected input.
    pub fn with_input(raw: RawMember, flag_policy: FlagPolicy) -> Self {
        Self {
            form: FormState::from(raw),
            flag_policy,
            ..Self::default()
        }
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    pub fn state(&self) -> &RegistrationState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == RegistrationState::InFlight
    }

    /// Validate and map the form. Marks the session in flight on success.
    pub fn begin_submission(&mut self) -> RegisterResult<MemberRecord> {
        if self.is_busy() {
            return Err(RegisterError::Busy);
        }
        if !self.form.validate() {
            return Err(RegisterError::Invalid(self.form.errors.clone()));
        }
        let record = to_record(&self.form.values, self.flag_policy);
        log_info(format!("Registering {} ({})", record.name, record.membership_number));
        self.state = RegistrationState::InFlight;
        Ok(record)
    }

    /// Settle a submission. Success clears the form, failure keeps it.
    pub fn finish_submission(&mut self, outcome: Result<MemberId, StoreError>) -> RegisterResult<MemberId> {
        match outcome {
            Ok(id) => {
                let message = registered_message(self.form.values.name.trim());
                log_success(&message);
                self.form.reset();
                self.state = RegistrationState::Registered { id: id.clone(), message };
                Ok(id)
            }
            Err(e) => {
                log_error(format!("Registration failed: {e}"));
                self.form.errors.insert(Field::Name, REGISTRATION_FAILED.to_string());
                self.state = RegistrationState::Failed { cause: e.to_string() };
                Err(RegisterError::Store(e))
            }
        }
    }

    pub async fn submit<S: MemberStore + ?Sized>(&mut self, store: &S) -> RegisterResult<MemberId> {
        let record = self.begin_submission()?;
        let outcome = store.submit_one(&record).await;
        self.finish_submission(outcome)
    }
}
