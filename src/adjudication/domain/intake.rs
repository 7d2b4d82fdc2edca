//! Event intake: patients, ascertainment criteria and the `add` form.

use super::review::strip_markup;
use super::{PatientId, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lower-cased criteria names that must never appear as criteria values.
///
/// A value matching one of these means the name and value columns of the
/// import were swapped.
pub const CRITERIA_NAMES: &[&str] = &[
    "mi_dx",
    "mi dx",
    "diagnosis",
    "dx",
    "ckmb",
    "troponin",
    "troponin t",
    "troponin i",
    "trop_i",
    "trop_t",
    "troponin i (tni)",
    "troponin t (tnt)",
    "ckmb_q",
    "creatine kinase mb quotient",
    "ckmb_m",
    "creatine kinase mb mass",
];

/// Earliest accepted event date.
const EARLIEST_EVENT_DATE: (i32, u32, u32) = (1970, 1, 1);

/// A study participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    id: PatientId,
    site: String,
    site_patient_id: String,
}

impl Patient {
    /// Creates a patient record.
    #[must_use]
    pub fn new(id: PatientId, site: impl Into<String>, site_patient_id: impl Into<String>) -> Self {
        Self {
            id,
            site: site.into(),
            site_patient_id: site_patient_id.into(),
        }
    }

    /// Returns the patient identifier.
    #[must_use]
    pub const fn id(&self) -> PatientId {
        self.id
    }

    /// Returns the patient's site.
    #[must_use]
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Returns the site-local patient identifier.
    #[must_use]
    pub fn site_patient_id(&self) -> &str {
        &self.site_patient_id
    }
}

/// An ascertainment criterion (e.g. `troponin` = `2.3`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    /// Criterion name.
    pub name: String,
    /// Criterion value.
    pub value: String,
}

impl Criterion {
    /// Creates a criterion, stripping markup from both parts.
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: strip_markup(name).trim().to_owned(),
            value: strip_markup(value).trim().to_owned(),
        }
    }

    fn value_is_a_name(&self) -> bool {
        let lowered = self.value.to_lowercase();
        CRITERIA_NAMES.contains(&lowered.as_str())
    }
}

/// Intake form for a new event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewEventRequest {
    /// Patient's site.
    pub site: Option<String>,
    /// Site-local patient identifier.
    pub site_patient_id: Option<String>,
    /// Date of the suspected event.
    pub event_date: Option<NaiveDate>,
    /// Ascertainment criteria.
    pub criteria: Vec<Criterion>,
}

impl NewEventRequest {
    /// Validates the form.
    ///
    /// The patient lookup happens afterwards, against the directory.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingPatientData`],
    /// [`ValidationError::MissingEventDate`],
    /// [`ValidationError::EventDateTooEarly`] or
    /// [`ValidationError::CriteriaProblem`].
    pub fn validate(self) -> Result<ValidatedIntake, ValidationError> {
        let site = non_blank(self.site).ok_or(ValidationError::MissingPatientData)?;
        let site_patient_id =
            non_blank(self.site_patient_id).ok_or(ValidationError::MissingPatientData)?;
        let event_date = self.event_date.ok_or(ValidationError::MissingEventDate)?;

        let (year, month, day) = EARLIEST_EVENT_DATE;
        if NaiveDate::from_ymd_opt(year, month, day).is_some_and(|earliest| event_date < earliest) {
            return Err(ValidationError::EventDateTooEarly);
        }

        if self.criteria.iter().any(Criterion::value_is_a_name) {
            return Err(ValidationError::CriteriaProblem);
        }

        Ok(ValidatedIntake {
            site,
            site_patient_id,
            event_date,
            criteria: self.criteria,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

/// Intake data that passed form validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedIntake {
    /// Patient's site.
    pub site: String,
    /// Site-local patient identifier.
    pub site_patient_id: String,
    /// Date of the suspected event.
    pub event_date: NaiveDate,
    /// Ascertainment criteria.
    pub criteria: Vec<Criterion>,
}
