//! Event workflow status.

use super::ParseEventStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow status of an adjudicated event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Event recorded at intake.
    Created,
    /// Raw packet uploaded by the site.
    Uploaded,
    /// Scrubbed packet uploaded.
    Scrubbed,
    /// Scrubbed packet accepted at screening.
    Screened,
    /// Both first-round reviewers assigned.
    Assigned,
    /// Packets sent to both first-round reviewers.
    Sent,
    /// Reviewer 1 finished; reviewer 2 still pending.
    #[serde(rename = "reviewer1_done")]
    Reviewer1Done,
    /// Reviewer 2 finished; reviewer 1 still pending.
    #[serde(rename = "reviewer2_done")]
    Reviewer2Done,
    /// First-round reviewers disagree; arbitration required.
    ThirdReviewNeeded,
    /// Arbitrating reviewer assigned.
    ThirdReviewAssigned,
    /// All reviews finished.
    Done,
    /// Packet rejected at screening.
    Rejected,
    /// Site reported that no packet can be provided.
    NoPacketAvailable,
}

impl EventStatus {
    /// Every status, in workflow order.
    pub const ALL: [Self; 13] = [
        Self::Created,
        Self::Uploaded,
        Self::Scrubbed,
        Self::Screened,
        Self::Assigned,
        Self::Sent,
        Self::Reviewer1Done,
        Self::Reviewer2Done,
        Self::ThirdReviewNeeded,
        Self::ThirdReviewAssigned,
        Self::Done,
        Self::Rejected,
        Self::NoPacketAvailable,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Uploaded => "uploaded",
            Self::Scrubbed => "scrubbed",
            Self::Screened => "screened",
            Self::Assigned => "assigned",
            Self::Sent => "sent",
            Self::Reviewer1Done => "reviewer1_done",
            Self::Reviewer2Done => "reviewer2_done",
            Self::ThirdReviewNeeded => "third_review_needed",
            Self::ThirdReviewAssigned => "third_review_assigned",
            Self::Done => "done",
            Self::Rejected => "rejected",
            Self::NoPacketAvailable => "no_packet_available",
        }
    }

    /// Returns `true` for statuses no action leads out of.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Rejected | Self::NoPacketAvailable)
    }

    /// Returns `true` while first-round reviews are outstanding.
    #[must_use]
    pub const fn is_under_review(self) -> bool {
        matches!(self, Self::Sent | Self::Reviewer1Done | Self::Reviewer2Done)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for EventStatus {
    type Error = ParseEventStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseEventStatusError(value.to_owned()))
    }
}
