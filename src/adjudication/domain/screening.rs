//! Screening decisions on scrubbed packets.

use super::ValidationError;
use super::review::clean_text;
use serde::{Deserialize, Serialize};

/// Outcome chosen by the screener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScreenDisposition {
    /// Packet is ready for review.
    #[serde(rename = "Accept")]
    Accept,
    /// Packet cannot be reviewed.
    #[serde(rename = "Reject")]
    Reject,
    /// Packet goes back to the scrubber.
    #[serde(rename = "Needs Rescrubbing")]
    NeedsRescrubbing,
}

impl ScreenDisposition {
    /// Returns the form label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "Accept",
            Self::Reject => "Reject",
            Self::NeedsRescrubbing => "Needs Rescrubbing",
        }
    }
}

impl TryFrom<&str> for ScreenDisposition {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        [Self::Accept, Self::Reject, Self::NeedsRescrubbing]
            .into_iter()
            .find(|candidate| candidate.as_str() == value.trim())
            .ok_or(ValidationError::BadScreenDisposition)
    }
}

/// A validated screening decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningDecision {
    /// Chosen outcome.
    pub disposition: ScreenDisposition,
    /// Message for the site or scrubber, markup stripped.
    pub message: Option<String>,
}

impl ScreeningDecision {
    /// Builds a decision from form input.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::BadScreenDisposition`] when the
    /// disposition is missing or unrecognised.
    pub fn from_form(
        disposition: Option<&str>,
        message: Option<String>,
    ) -> Result<Self, ValidationError> {
        let parsed = ScreenDisposition::try_from(
            disposition.ok_or(ValidationError::BadScreenDisposition)?,
        )?;
        Ok(Self::new(parsed, message))
    }

    /// Creates a decision, stripping markup and dropping blank messages.
    #[must_use]
    pub fn new(disposition: ScreenDisposition, message: Option<String>) -> Self {
        Self {
            disposition,
            message: clean_text(message),
        }
    }
}
