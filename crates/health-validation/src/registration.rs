//! Registration payload rules
//!
//! Rules are applied in a fixed precedence:
//!
//! 1. email shape (`local-part@domain.tld`)
//! 2. national identifier (`nic`) length
//! 3. required-field completeness
//!
//! A failure of rule 1 or 2 short-circuits with that single error. Rule 3
//! reports every missing field at once.

use std::collections::{BTreeMap, HashMap};

use crate::{ValidationErrorCode, ValidationResult};

/// Minimum length of a national identifier
pub const MIN_NIC_LENGTH: usize = 10;

/// Fields a registration form must fill, in display order
pub const REQUIRED_FIELDS: [&str; 9] = [
    "firstName",
    "lastName",
    "fullName",
    "email",
    "nic",
    "password",
    "phone",
    "address",
    "dateOfBirth",
];

/// Anything that can answer "what is the value of field X".
///
/// Implemented for the map types a form layer is likely to hand over.
pub trait FieldSource {
    fn field(&self, name: &str) -> Option<&str>;
}

impl FieldSource for HashMap<String, String> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl FieldSource for BTreeMap<String, String> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl FieldSource for [(&str, &str)] {
    fn field(&self, name: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
    }
}

/// Validate an email address shape
///
/// Requires exactly one `@`, a non-empty local part, and a domain holding a
/// `.` with text on both sides. No whitespace anywhere.
pub fn validate_email(email: &str) -> ValidationResult {
    let mut result = ValidationResult::new();

    if !is_valid_email(email) {
        result.add_error(
            "email",
            "Please enter a valid email address",
            ValidationErrorCode::InvalidFormat,
        );
        result.summary = Some("Please enter a valid email address".to_string());
    }

    result
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    if local.is_empty() {
        return false;
    }

    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Validate a national identifier
///
/// NIC must be present and at least [`MIN_NIC_LENGTH`] characters.
pub fn validate_nic(nic: &str) -> ValidationResult {
    let mut result = ValidationResult::new();
    let nic = nic.trim();

    if nic.is_empty() {
        result.add_error("nic", "NIC is required", ValidationErrorCode::Required);
        result.summary = Some("NIC is required".to_string());
        return result;
    }

    if nic.chars().count() < MIN_NIC_LENGTH {
        let message = format!("NIC must be at least {} characters", MIN_NIC_LENGTH);
        result.add_error("nic", &message, ValidationErrorCode::TooShort);
        result.summary = Some(message);
    }

    result
}

/// Check that every named field is present and not blank.
///
/// All missing fields are reported, in the order of `required`.
pub fn validate_required<S: FieldSource + ?Sized>(fields: &S, required: &[&str]) -> ValidationResult {
    let mut result = ValidationResult::new();

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| fields.field(name).map_or(true, |v| v.trim().is_empty()))
        .collect();

    for name in &missing {
        result.add_error(name, &format!("{} is required", name), ValidationErrorCode::Required);
    }

    if !missing.is_empty() {
        result.summary = Some(format!(
            "Please fill in all required fields: {}",
            missing.join(", ")
        ));
    }

    result
}

/// Validate a full registration payload.
pub fn validate_registration<S: FieldSource + ?Sized>(fields: &S) -> ValidationResult {
    let email = validate_email(fields.field("email").unwrap_or_default());
    if !email.is_valid() {
        return email;
    }

    let nic = validate_nic(fields.field("nic").unwrap_or_default());
    if !nic.is_valid() {
        return nic;
    }

    validate_required(fields, &REQUIRED_FIELDS)
}
