//! Patient registration flow
//!
//! The form keeps `fullName` in step with the first and last name. Submitting
//! validates locally, sends the creation request under the API's field
//! names, caches the new profile (never the password) and, after a short
//! pause so the success notice can be read, hands back the login route.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use health_validation::{validate_registration, FieldSource};
use tracing::{debug, info, instrument, warn};

use crate::api::{PortalApi, RegisterRequest};
use crate::error::{PortalError, Result};
use crate::in_flight::InFlight;
use crate::profile::PatientProfile;
use crate::role::Role;
use crate::session::SessionContext;
use crate::store::Notice;

pub const REGISTRATION_SUCCESS_MESSAGE: &str = "Registration successful! Redirecting to login...";

/// Inputs of the registration form, named as the form names them
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegistrationField {
    FirstName,
    LastName,
    FullName,
    Email,
    Nic,
    Password,
    Phone,
    Address,
    DateOfBirth,
}

impl RegistrationField {
    pub const ALL: [RegistrationField; 9] = [
        RegistrationField::FirstName,
        RegistrationField::LastName,
        RegistrationField::FullName,
        RegistrationField::Email,
        RegistrationField::Nic,
        RegistrationField::Password,
        RegistrationField::Phone,
        RegistrationField::Address,
        RegistrationField::DateOfBirth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationField::FirstName => "firstName",
            RegistrationField::LastName => "lastName",
            RegistrationField::FullName => "fullName",
            RegistrationField::Email => "email",
            RegistrationField::Nic => "nic",
            RegistrationField::Password => "password",
            RegistrationField::Phone => "phone",
            RegistrationField::Address => "address",
            RegistrationField::DateOfBirth => "dateOfBirth",
        }
    }
}

impl FromStr for RegistrationField {
    type Err = crate::profile::EditError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RegistrationField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| crate::profile::EditError::UnknownField(s.to_string()))
    }
}

/// State of the registration form
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    first_name: String,
    last_name: String,
    full_name: String,
    email: String,
    nic: String,
    password: String,
    phone: String,
    address: String,
    date_of_birth: String,
}

impl std::fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl RegistrationForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one input. Changing the first or last name recomputes `fullName`.
    pub fn set(&mut self, field: RegistrationField, value: impl Into<String>) {
        let value = value.into();
        match field {
            RegistrationField::FirstName => self.first_name = value,
            RegistrationField::LastName => self.last_name = value,
            RegistrationField::FullName => self.full_name = value,
            RegistrationField::Email => self.email = value,
            RegistrationField::Nic => self.nic = value,
            RegistrationField::Password => self.password = value,
            RegistrationField::Phone => self.phone = value,
            RegistrationField::Address => self.address = value,
            RegistrationField::DateOfBirth => self.date_of_birth = value,
        }

        if matches!(field, RegistrationField::FirstName | RegistrationField::LastName) {
            self.full_name = format!("{} {}", self.first_name, self.last_name)
                .trim()
                .to_string();
        }
    }

    /// Builder-style [`set`](Self::set)
    pub fn with(mut self, field: RegistrationField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: RegistrationField) -> &str {
        match field {
            RegistrationField::FirstName => &self.first_name,
            RegistrationField::LastName => &self.last_name,
            RegistrationField::FullName => &self.full_name,
            RegistrationField::Email => &self.email,
            RegistrationField::Nic => &self.nic,
            RegistrationField::Password => &self.password,
            RegistrationField::Phone => &self.phone,
            RegistrationField::Address => &self.address,
            RegistrationField::DateOfBirth => &self.date_of_birth,
        }
    }

    /// Creation request in the API's field names (`phone` goes out as `phoneNumber`)
    pub fn to_request(&self) -> RegisterRequest {
        RegisterRequest {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_string(),
            nic: self.nic.trim().to_string(),
            password: self.password.clone(),
            phone_number: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            date_of_birth: self.date_of_birth.trim().to_string(),
        }
    }

    /// Profile fields known at registration, for the local cache
    pub fn to_profile(&self) -> PatientProfile {
        let request = self.to_request();
        PatientProfile {
            nic: request.nic,
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            phone_number: request.phone_number,
            address: request.address,
            date_of_birth: request.date_of_birth,
            ..Default::default()
        }
    }
}

impl FieldSource for RegistrationForm {
    fn field(&self, name: &str) -> Option<&str> {
        name.parse::<RegistrationField>().ok().map(|f| self.get(f))
    }
}

/// What happened to a submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered { notice: Notice, redirect: String },
    /// A submission was already in flight; nothing was sent
    Ignored,
}

/// Submits registration forms for one registration view
pub struct RegistrationFlow {
    api: Arc<dyn PortalApi>,
    session: Arc<SessionContext>,
    redirect_delay: Duration,
    submitting: AtomicBool,
}

impl std::fmt::Debug for RegistrationFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationFlow")
            .field("redirect_delay", &self.redirect_delay)
            .field("submitting", &self.is_submitting())
            .finish_non_exhaustive()
    }
}

impl RegistrationFlow {
    pub fn new(api: Arc<dyn PortalApi>, session: Arc<SessionContext>, redirect_delay: Duration) -> Self {
        RegistrationFlow {
            api,
            session,
            redirect_delay,
            submitting: AtomicBool::new(false),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Validate and submit the form.
    ///
    /// Validation failures return before any request is made. On any
    /// failure the form is untouched, so the user can correct and retry.
    #[instrument(skip_all)]
    pub async fn submit(&self, form: &RegistrationForm) -> Result<RegistrationOutcome> {
        let Some(_in_flight) = InFlight::acquire(&self.submitting) else {
            debug!("registration already in flight, ignoring");
            return Ok(RegistrationOutcome::Ignored);
        };

        let validation = validate_registration(form);
        if !validation.is_valid() {
            debug!(fields = ?validation.fields(), "registration rejected locally");
            return Err(PortalError::Validation(validation));
        }

        if let Err(e) = self.api.register(&form.to_request()).await {
            warn!(error = %e, "registration failed");
            return Err(e);
        }
        info!("patient registered");

        if let Err(e) = self.session.cache_profile(&form.to_profile()) {
            warn!(error = %e, "could not cache registered profile");
        }

        // leave the success notice on screen before routing away
        tokio::time::sleep(self.redirect_delay).await;

        Ok(RegistrationOutcome::Registered {
            notice: Notice::success(REGISTRATION_SUCCESS_MESSAGE),
            redirect: Role::Patient.login_path(),
        })
    }
}
