//! Patient profile model
//!
//! [`PatientProfile`] is the in-memory mirror of one patient's demographic
//! and clinical-summary record. The remote API may omit any field, so JSON is
//! decoded through [`ProfileWire`], where every field is optional, and then
//! default-filled. A renderer never has to ask whether a field is missing.
//!
//! Edits are single-field and functional: [`apply_edit`] takes the previous
//! snapshot and returns a new one. Height and weight edits recompute BMI.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use health_validation::compute_bmi;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical blood groups offered by the edit surface
pub const BLOOD_TYPES: [&str; 8] = ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

/// One patient's record as held by the client
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ProfileWire")]
pub struct PatientProfile {
    /// Server-assigned identifier, read-only on the client
    pub patient_id: String,
    /// National identity card number, read-only after registration
    pub nic: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    /// Date of birth (YYYY-MM-DD)
    pub date_of_birth: String,
    /// Stored as received; see [`BLOOD_TYPES`] for the editable values
    pub blood_type: String,
    /// Height in centimetres, never negative
    pub height: f64,
    /// Weight in kilograms, never negative
    pub weight: f64,
    /// Derived from height and weight; `None` renders blank
    pub bmi: Option<f64>,
    pub guardian_name: String,
    pub guardian_relation: String,
    pub guardian_contact_number: String,
    /// Self-contained `data:` URL, empty when no picture is set
    pub profile_picture: String,
    /// Server-owned, kept in server order
    pub medication_allergies: Vec<AllergyItem>,
    /// Server-owned timestamp, kept exactly as received so a save echoes it back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl PatientProfile {
    /// `"{first} {last}"` with surrounding whitespace removed
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn has_profile_picture(&self) -> bool {
        !self.profile_picture.is_empty()
    }

    /// `lastUpdated` as a UTC instant, when it is in a recognised format.
    ///
    /// RFC 3339 is tried first, then `YYYY-MM-DD HH:MM:SS` read as UTC.
    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.last_updated.as_deref()?.trim();
        if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
            return Some(t.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|t| t.and_utc())
    }

    /// Render the value of one field the way a form input shows it.
    pub fn field_value(&self, field: ProfileField) -> String {
        match field {
            ProfileField::PatientId => self.patient_id.clone(),
            ProfileField::Nic => self.nic.clone(),
            ProfileField::FirstName => self.first_name.clone(),
            ProfileField::LastName => self.last_name.clone(),
            ProfileField::Email => self.email.clone(),
            ProfileField::PhoneNumber => self.phone_number.clone(),
            ProfileField::Address => self.address.clone(),
            ProfileField::DateOfBirth => self.date_of_birth.clone(),
            ProfileField::BloodType => self.blood_type.clone(),
            ProfileField::Height => format_measurement(self.height),
            ProfileField::Weight => format_measurement(self.weight),
            ProfileField::Bmi => health_validation::format_bmi(self.bmi),
            ProfileField::GuardianName => self.guardian_name.clone(),
            ProfileField::GuardianRelation => self.guardian_relation.clone(),
            ProfileField::GuardianContactNumber => self.guardian_contact_number.clone(),
            ProfileField::ProfilePicture => self.profile_picture.clone(),
            ProfileField::MedicationAllergies => self
                .medication_allergies
                .iter()
                .map(|a| format!("{} ({})", a.name, a.severity))
                .collect::<Vec<_>>()
                .join(", "),
            ProfileField::LastUpdated => self.last_updated.clone().unwrap_or_default(),
        }
    }
}

fn format_measurement(value: f64) -> String {
    if value > 0.0 {
        value.to_string()
    } else {
        String::new()
    }
}

/// Allergy severity as reported by the server
#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq, Eq)]
pub enum AllergySeverity {
    Severe,
    Moderate,
    #[default]
    Low,
}

impl From<&str> for AllergySeverity {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "severe" => AllergySeverity::Severe,
            "moderate" => AllergySeverity::Moderate,
            _ => AllergySeverity::Low,
        }
    }
}

/// Anything other than a recognised string (null, numbers, objects) is `Low`
impl From<Value> for AllergySeverity {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => AllergySeverity::from(s.as_str()),
            _ => AllergySeverity::Low,
        }
    }
}

impl std::fmt::Display for AllergySeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllergySeverity::Severe => write!(f, "Severe"),
            AllergySeverity::Moderate => write!(f, "Moderate"),
            AllergySeverity::Low => write!(f, "Low"),
        }
    }
}

/// A medication allergy entry
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "AllergyWire")]
pub struct AllergyItem {
    pub name: String,
    pub severity: AllergySeverity,
    /// Free-text allergy type, carried by the home and registration views
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AllergyWire {
    name: Option<Value>,
    severity: Option<Value>,
    #[serde(rename = "type")]
    kind: Option<Value>,
}

impl From<AllergyWire> for AllergyItem {
    fn from(wire: AllergyWire) -> Self {
        AllergyItem {
            name: text_from_value(wire.name),
            severity: wire.severity.map(AllergySeverity::from).unwrap_or_default(),
            kind: text_from_value(wire.kind),
        }
    }
}

/// Wire shape of a profile response: every field may be absent or mistyped.
///
/// Text fields take strings, or numbers and booleans rendered as text.
/// Numeric fields take JSON numbers or numeric strings. Anything else falls
/// back to the field's default without failing the rest of the profile.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileWire {
    pub patient_id: Option<Value>,
    pub nic: Option<Value>,
    pub first_name: Option<Value>,
    pub last_name: Option<Value>,
    pub email: Option<Value>,
    pub phone_number: Option<Value>,
    pub address: Option<Value>,
    pub date_of_birth: Option<Value>,
    pub blood_type: Option<Value>,
    pub height: Option<Value>,
    pub weight: Option<Value>,
    pub bmi: Option<Value>,
    pub guardian_name: Option<Value>,
    pub guardian_relation: Option<Value>,
    pub guardian_contact_number: Option<Value>,
    pub profile_picture: Option<Value>,
    pub medication_allergies: Option<Value>,
    pub last_updated: Option<Value>,
}

impl From<ProfileWire> for PatientProfile {
    fn from(wire: ProfileWire) -> Self {
        let height = wire.height.as_ref().and_then(number_from_value).unwrap_or(0.0).max(0.0);
        let weight = wire.weight.as_ref().and_then(number_from_value).unwrap_or(0.0).max(0.0);

        // trust the server's figure when present, otherwise derive it
        let bmi = wire
            .bmi
            .as_ref()
            .and_then(number_from_value)
            .filter(|b| *b > 0.0)
            .or_else(|| compute_bmi(height, weight));

        let last_updated = Some(text_from_value(wire.last_updated)).filter(|s| !s.is_empty());

        PatientProfile {
            patient_id: text_from_value(wire.patient_id),
            nic: text_from_value(wire.nic),
            first_name: text_from_value(wire.first_name),
            last_name: text_from_value(wire.last_name),
            email: text_from_value(wire.email),
            phone_number: text_from_value(wire.phone_number),
            address: text_from_value(wire.address),
            date_of_birth: text_from_value(wire.date_of_birth),
            blood_type: text_from_value(wire.blood_type),
            height,
            weight,
            bmi,
            guardian_name: text_from_value(wire.guardian_name),
            guardian_relation: text_from_value(wire.guardian_relation),
            guardian_contact_number: text_from_value(wire.guardian_contact_number),
            profile_picture: text_from_value(wire.profile_picture),
            medication_allergies: allergies_from_value(wire.medication_allergies),
            last_updated,
        }
    }
}

fn text_from_value(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Keep every object entry in server order; non-object entries are dropped.
fn allergies_from_value(value: Option<Value>) -> Vec<AllergyItem> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn number_from_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Parse a measurement typed into a form: non-numeric becomes 0, negatives clamp to 0.
pub fn parse_measurement(input: &str) -> f64 {
    match input.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value.max(0.0),
        _ => 0.0,
    }
}

/// Every field of a [`PatientProfile`], named as on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProfileField {
    PatientId,
    Nic,
    FirstName,
    LastName,
    Email,
    PhoneNumber,
    Address,
    DateOfBirth,
    BloodType,
    Height,
    Weight,
    Bmi,
    GuardianName,
    GuardianRelation,
    GuardianContactNumber,
    ProfilePicture,
    MedicationAllergies,
    LastUpdated,
}

impl ProfileField {
    pub const ALL: [ProfileField; 18] = [
        ProfileField::PatientId,
        ProfileField::Nic,
        ProfileField::FirstName,
        ProfileField::LastName,
        ProfileField::Email,
        ProfileField::PhoneNumber,
        ProfileField::Address,
        ProfileField::DateOfBirth,
        ProfileField::BloodType,
        ProfileField::Height,
        ProfileField::Weight,
        ProfileField::Bmi,
        ProfileField::GuardianName,
        ProfileField::GuardianRelation,
        ProfileField::GuardianContactNumber,
        ProfileField::ProfilePicture,
        ProfileField::MedicationAllergies,
        ProfileField::LastUpdated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::PatientId => "patientId",
            ProfileField::Nic => "nic",
            ProfileField::FirstName => "firstName",
            ProfileField::LastName => "lastName",
            ProfileField::Email => "email",
            ProfileField::PhoneNumber => "phoneNumber",
            ProfileField::Address => "address",
            ProfileField::DateOfBirth => "dateOfBirth",
            ProfileField::BloodType => "bloodType",
            ProfileField::Height => "height",
            ProfileField::Weight => "weight",
            ProfileField::Bmi => "bmi",
            ProfileField::GuardianName => "guardianName",
            ProfileField::GuardianRelation => "guardianRelation",
            ProfileField::GuardianContactNumber => "guardianContactNumber",
            ProfileField::ProfilePicture => "profilePicture",
            ProfileField::MedicationAllergies => "medicationAllergies",
            ProfileField::LastUpdated => "lastUpdated",
        }
    }

    /// Whether the edit surface accepts changes to this field.
    ///
    /// Identifiers are fixed at registration, BMI is derived, and the
    /// allergy list and timestamp belong to the server.
    pub fn is_editable(&self) -> bool {
        !matches!(
            self,
            ProfileField::PatientId
                | ProfileField::Nic
                | ProfileField::Bmi
                | ProfileField::MedicationAllergies
                | ProfileField::LastUpdated
        )
    }
}

impl std::fmt::Display for ProfileField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileField {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileField::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| EditError::UnknownField(s.to_string()))
    }
}

/// Why an edit was refused
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("{0} is read-only")]
    ImmutableField(ProfileField),

    #[error("unknown profile field '{0}'")]
    UnknownField(String),

    #[error("'{value}' is not a valid {field}")]
    InvalidValue { field: ProfileField, value: String },
}

/// Apply one field change to a snapshot, producing the next snapshot.
///
/// A height or weight change recomputes BMI from the just-edited value and
/// the previous value of the other measurement.
pub fn apply_edit(
    profile: &PatientProfile,
    field: ProfileField,
    value: &str,
) -> Result<PatientProfile, EditError> {
    let mut next = profile.clone();
    let text = value.to_string();

    match field {
        ProfileField::FirstName => next.first_name = text,
        ProfileField::LastName => next.last_name = text,
        ProfileField::Email => next.email = text,
        ProfileField::PhoneNumber => next.phone_number = text,
        ProfileField::Address => next.address = text,
        ProfileField::DateOfBirth => next.date_of_birth = text,
        ProfileField::BloodType => {
            let trimmed = value.trim();
            if !trimmed.is_empty() && !BLOOD_TYPES.contains(&trimmed) {
                return Err(EditError::InvalidValue {
                    field,
                    value: text,
                });
            }
            next.blood_type = trimmed.to_string();
        }
        ProfileField::Height => {
            next.height = parse_measurement(value);
            next.bmi = compute_bmi(next.height, next.weight);
        }
        ProfileField::Weight => {
            next.weight = parse_measurement(value);
            next.bmi = compute_bmi(next.height, next.weight);
        }
        ProfileField::GuardianName => next.guardian_name = text,
        ProfileField::GuardianRelation => next.guardian_relation = text,
        ProfileField::GuardianContactNumber => next.guardian_contact_number = text,
        ProfileField::ProfilePicture => next.profile_picture = text,
        ProfileField::PatientId
        | ProfileField::Nic
        | ProfileField::Bmi
        | ProfileField::MedicationAllergies
        | ProfileField::LastUpdated => return Err(EditError::ImmutableField(field)),
    }

    Ok(next)
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    fn editable_field() -> impl Strategy<Value = ProfileField> {
        proptest::sample::select(
            ProfileField::ALL
                .iter()
                .copied()
                .filter(|f| f.is_editable())
                .collect::<Vec<_>>(),
        )
    }

    proptest! {
        /// Editing height then weight lands on the same BMI as weight then height
        #[test]
        fn measurement_edits_commute(
            h0 in 0.0..250.0f64,
            w0 in 0.0..300.0f64,
            h1 in -50.0..250.0f64,
            w1 in -50.0..300.0f64
        ) {
            let start = PatientProfile { height: h0, weight: w0, ..Default::default() };
            let (h1, w1) = (h1.to_string(), w1.to_string());

            let a = apply_edit(&start, ProfileField::Height, &h1).unwrap();
            let a = apply_edit(&a, ProfileField::Weight, &w1).unwrap();

            let b = apply_edit(&start, ProfileField::Weight, &w1).unwrap();
            let b = apply_edit(&b, ProfileField::Height, &h1).unwrap();

            prop_assert_eq!(a.bmi, b.bmi);
            prop_assert_eq!(a.height, b.height);
            prop_assert_eq!(a.weight, b.weight);
            prop_assert!(a.height >= 0.0 && a.weight >= 0.0);
        }

        /// No sequence of edits ever changes the identifiers
        #[test]
        fn identifiers_survive_any_edits(
            edits in proptest::collection::vec((editable_field(), ".{0,12}"), 0..20)
        ) {
            let mut profile = PatientProfile {
                patient_id: "PAT-42".to_string(),
                nic: "199912345678".to_string(),
                ..Default::default()
            };

            for (field, value) in edits {
                if let Ok(next) = apply_edit(&profile, field, &value) {
                    profile = next;
                }
            }

            prop_assert_eq!(profile.patient_id.as_str(), "PAT-42");
            prop_assert_eq!(profile.nic.as_str(), "199912345678");
        }
    }
}
