//! Domain model for clinical event adjudication.
//!
//! The domain covers the event aggregate and its status table, clinical
//! reviews, and the derived (adjudicated) outcome record. Infrastructure
//! concerns such as storage, mail transport and user lookup stay outside
//! of this boundary.

/// Declares a closed set of clinical values whose stored form is a fixed
/// human-readable label.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident ($field:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant, )+
        }

        impl $name {
            /// Every value, in form display order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Returns the stored label for this value.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl TryFrom<&str> for $name {
            type Error = $crate::adjudication::domain::ValidationError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                let trimmed = value.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.as_str() == trimmed)
                    .ok_or_else(|| $crate::adjudication::domain::ValidationError::UnknownValue {
                        field: $field,
                        value: value.to_owned(),
                    })
            }
        }
    };
}

mod action;
mod derived;
mod error;
mod event;
mod ids;
mod intake;
mod no_packet;
mod notification;
mod packet;
mod review;
mod screening;
mod status;
mod user;

pub use action::{
    ActionResult, ActionRule, Authorization, EventAction, ReviewerSlot, SourceStatuses,
    StatusTable,
};
pub use derived::{
    Consensus, DerivationQuorum, EventDerivedData, NO_CONSENSUS, majority, pairwise,
};
pub use error::{
    AdjudicationDomainError, ParseEventActionError, ParseEventStatusError, ValidationError,
};
pub use event::{Event, EventField, Stage, StageStamp, StatusUpdate};
pub use ids::{DerivedDataId, EventId, PatientId, ReviewId, UserId};
pub use intake::{CRITERIA_NAMES, Criterion, NewEventRequest, Patient, ValidatedIntake};
pub use no_packet::{
    NoPacketDetails, NoPacketReason, NoPacketSubmission, format_prior_event_date,
};
pub use notification::PacketNotification;
pub use packet::{PacketFile, PacketKind, PacketUpload};
pub use review::{
    AdjudicationKey, CeCriteria, CiType, ClinicalJudgment, EcgType, EventType,
    FalsePositiveReason, Mci, Review, ReviewSubmission, SecondaryCause, strip_markup,
};
pub use screening::{ScreenDisposition, ScreeningDecision};
pub use status::EventStatus;
pub use user::{Role, User};
