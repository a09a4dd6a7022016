//! Health Validation
//!
//! Pure input validation and derived clinical metrics for the health portal.
//! Nothing in this crate performs I/O; every function is a predicate or a
//! calculation over plain values, so the same rules run before any network
//! call is made.
//!
//! - [`registration`] - email shape, national identifier length, required fields
//! - [`metrics`] - body-mass index from height/weight

use serde::{Deserialize, Serialize};

pub mod metrics;
pub mod registration;

pub use metrics::{compute_bmi, compute_bmi_from_input, format_bmi, BmiCategory};
pub use registration::{
    validate_email, validate_nic, validate_registration, validate_required, FieldSource,
    MIN_NIC_LENGTH, REQUIRED_FIELDS,
};

/// Validation error with detailed context
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub code: ValidationErrorCode,
}

/// Specific validation error codes for programmatic handling
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ValidationErrorCode {
    Required,
    InvalidFormat,
    TooShort,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({:?})", self.field, self.message, self.code)
    }
}

impl std::error::Error for ValidationError {}

/// Validation result that can accumulate multiple errors
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    /// Display text summarising the failure, set by the rule that failed
    pub summary: Option<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, field: &str, message: &str, code: ValidationErrorCode) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
            code,
        });
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Names of every field that failed, in the order they were reported
    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }

    /// The message a form shows to the user.
    ///
    /// Falls back to joining the individual messages when no rule set a
    /// summary.
    pub fn message(&self) -> String {
        match &self.summary {
            Some(summary) => summary.clone(),
            None => self
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        }
    }

    pub fn into_result(self) -> Result<(), ValidationResult> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        if self.summary.is_none() {
            self.summary = other.summary;
        }
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}
