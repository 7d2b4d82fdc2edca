//! Deployment settings for the adjudication workflow.

use crate::adjudication::domain::{EventId, ReviewerSlot};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_SUBJECT_TEMPLATE: &str = "{{ project_name }} event {{ display_id }} ready for review";

const DEFAULT_BODY_TEMPLATE: &str = "\
Dear {{ reviewer_name }},

A packet for {{ project_name }} event {{ display_id }} is ready for you to review \
as reviewer {{ slot }}.

Download the packet: {{ download_url }}
Submit your review: {{ review_url }}
";

/// Settings shared by the workflow services.
///
/// # Examples
///
/// ```
/// use adjudicator::adjudication::config::AdjudicationConfig;
///
/// let config = AdjudicationConfig::default();
/// assert_eq!(config.display_id_offset, 1000);
///
/// let custom = AdjudicationConfig::from_json_str(r#"{"project_name": "CVD"}"#)
///     .expect("valid config");
/// assert_eq!(custom.project_name, "CVD");
/// assert_eq!(custom.display_id_offset, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdjudicationConfig {
    /// Project label used in notifications (e.g. `MI`).
    pub project_name: String,
    /// Added to event identifiers when shown to reviewers.
    pub display_id_offset: u64,
    /// Absolute base URL of the web front end, with trailing slash.
    pub base_url: String,
    /// `minijinja` template for the notification subject.
    pub notification_subject: String,
    /// `minijinja` template for the notification body.
    pub notification_body: String,
}

impl Default for AdjudicationConfig {
    fn default() -> Self {
        Self {
            project_name: "MI".to_owned(),
            display_id_offset: 1000,
            base_url: "http://localhost/".to_owned(),
            notification_subject: DEFAULT_SUBJECT_TEMPLATE.to_owned(),
            notification_body: DEFAULT_BODY_TEMPLATE.to_owned(),
        }
    }
}

impl AdjudicationConfig {
    /// Parses settings from JSON; absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::EmptyBaseUrl`] when the base URL is blank.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let parsed: Self = serde_json::from_str(input)?;
        if parsed.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        Ok(parsed)
    }

    /// Returns the identifier shown to reviewers.
    #[must_use]
    pub const fn display_id(&self, event_id: EventId) -> u64 {
        event_id.value().saturating_add(self.display_id_offset)
    }

    /// Returns the packet download link for an event.
    #[must_use]
    pub fn download_url(&self, event_id: EventId) -> String {
        format!("{}events/download/{event_id}", self.normalized_base())
    }

    /// Returns the review form link for a slot.
    #[must_use]
    pub fn review_url(&self, event_id: EventId, slot: ReviewerSlot) -> String {
        format!(
            "{}events/review{}/{event_id}",
            self.normalized_base(),
            slot.number()
        )
    }

    fn normalized_base(&self) -> String {
        let trimmed = self.base_url.trim_end_matches('/');
        format!("{trimmed}/")
    }
}

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The input was not valid settings JSON.
    #[error("invalid adjudication config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The base URL was blank.
    #[error("base_url cannot be blank")]
    EmptyBaseUrl,
}
