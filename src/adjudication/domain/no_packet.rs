//! No-packet reporting for events whose site cannot supply records.

use super::ValidationError;
use super::review::clean_text;
use serde::{Deserialize, Serialize};

labelled_enum! {
    /// Why no packet can be provided.
    pub enum NoPacketReason ("no_packet_reason") {
        /// Care took place at an outside hospital.
        OutsideHospital => "Outside hospital",
        /// The ascertainment diagnosis was wrong.
        AscertainmentDiagnosisError => "Ascertainment diagnosis error",
        /// The diagnosis referred to an earlier event.
        AscertainmentPriorEvent => "Ascertainment diagnosis referred to a prior event",
        /// Free-text reason.
        Other => "Other",
    }
}

/// No-packet form as submitted by an uploader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoPacketSubmission {
    /// Reason no packet is available.
    pub reason: Option<NoPacketReason>,
    /// Two attempts were made to obtain outside records.
    pub two_attempts_flag: Option<bool>,
    /// The prior event's date is known.
    pub prior_event_date_known: Option<bool>,
    /// Year of the prior event.
    pub prior_event_year: Option<u32>,
    /// Month of the prior event.
    pub prior_event_month: Option<u32>,
    /// The prior event happened on site.
    pub prior_event_onsite_flag: Option<bool>,
    /// Free-text reason.
    pub other_cause: Option<String>,
}

impl NoPacketSubmission {
    /// Validates the reason-specific fields.
    ///
    /// Only the sub-fields belonging to the chosen reason are kept.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first missing field.
    pub fn validate(self) -> Result<NoPacketDetails, ValidationError> {
        let reason = self.reason.ok_or(ValidationError::NoPacketReasonBlank)?;
        let mut details = NoPacketDetails {
            reason,
            two_attempts_flag: None,
            prior_event_date: None,
            prior_event_onsite_flag: None,
            other_cause: None,
        };

        match reason {
            NoPacketReason::OutsideHospital => {
                details.two_attempts_flag =
                    Some(self.two_attempts_flag.ok_or(ValidationError::TwoAttemptsBlank)?);
            }
            NoPacketReason::Other => {
                details.other_cause =
                    Some(clean_text(self.other_cause).ok_or(ValidationError::OtherCauseBlank)?);
            }
            NoPacketReason::AscertainmentPriorEvent => {
                let date_known = self
                    .prior_event_date_known
                    .ok_or(ValidationError::PriorEventDateKnownBlank)?;
                if date_known {
                    details.prior_event_date = Some(format_prior_event_date(
                        self.prior_event_year,
                        self.prior_event_month,
                    ));
                }
                details.prior_event_onsite_flag = Some(
                    self.prior_event_onsite_flag
                        .ok_or(ValidationError::PriorEventOnsiteBlank)?,
                );
            }
            NoPacketReason::AscertainmentDiagnosisError => {}
        }

        Ok(details)
    }
}

/// Renders a prior-event date as `MM-YYYY`.
///
/// Years outside 1000..=9999 render as `0000`; months outside 1..=12 render
/// as `00`.
#[must_use]
pub fn format_prior_event_date(year: Option<u32>, month: Option<u32>) -> String {
    let valid_year = year.filter(|value| (1000..=9999).contains(value)).unwrap_or(0);
    let valid_month = month.filter(|value| (1..=12).contains(value)).unwrap_or(0);
    format!("{valid_month:02}-{valid_year:04}")
}

/// Validated no-packet details stored on the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoPacketDetails {
    /// Reason no packet is available.
    pub reason: NoPacketReason,
    /// Two attempts were made (outside hospital only).
    pub two_attempts_flag: Option<bool>,
    /// Prior event date as `MM-YYYY` (prior event only, when known).
    pub prior_event_date: Option<String>,
    /// Prior event happened on site (prior event only).
    pub prior_event_onsite_flag: Option<bool>,
    /// Free-text reason (other only).
    pub other_cause: Option<String>,
}
