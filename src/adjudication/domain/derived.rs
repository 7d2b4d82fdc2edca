//! Adjudicated outcome record and the agreement rules that produce it.

use super::{CiType, DerivedDataId, EcgType, EventId, EventType, FalsePositiveReason, Mci, SecondaryCause};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Stored form of [`Consensus::NoConsensus`].
pub const NO_CONSENSUS: &str = "NC";

/// A field value resolved across reviews.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Consensus<T> {
    /// Reviewers agreed on this value.
    Agreed(T),
    /// Reviewers did not agree; stored as `NC`.
    NoConsensus,
}

impl<T> Consensus<T> {
    /// Returns the agreed value, if any.
    #[must_use]
    pub const fn agreed(&self) -> Option<&T> {
        match self {
            Self::Agreed(value) => Some(value),
            Self::NoConsensus => None,
        }
    }

    /// Returns `true` when reviewers disagreed.
    #[must_use]
    pub const fn is_no_consensus(&self) -> bool {
        matches!(self, Self::NoConsensus)
    }
}

impl<T: Serialize> Serialize for Consensus<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Agreed(value) => value.serialize(serializer),
            Self::NoConsensus => serializer.serialize_str(NO_CONSENSUS),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Consensus<Option<T>> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agreed(Some(value)) => write!(f, "{value}"),
            Self::Agreed(None) => Ok(()),
            Self::NoConsensus => f.write_str(NO_CONSENSUS),
        }
    }
}

/// Resolves a field across two reviews: the shared value, or no consensus.
#[must_use]
pub fn pairwise<T: PartialEq + Clone>(first: &T, second: &T) -> Consensus<T> {
    if first == second {
        Consensus::Agreed(first.clone())
    } else {
        Consensus::NoConsensus
    }
}

/// Resolves a field across three reviews: any value shared by two wins.
#[must_use]
pub fn majority<T: PartialEq + Clone>(first: &T, second: &T, third: &T) -> Consensus<T> {
    if first == second || first == third {
        Consensus::Agreed(first.clone())
    } else if second == third {
        Consensus::Agreed(second.clone())
    } else {
        Consensus::NoConsensus
    }
}

/// How many reviews produced a derived record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivationQuorum {
    /// Two agreeing first-round reviews.
    Two,
    /// Majority of three reviews after arbitration.
    Three,
}

/// Adjudicated outcome for an event. At most one exists per event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventDerivedData {
    /// Record identifier.
    pub id: DerivedDataId,
    /// Adjudicated event.
    pub event_id: EventId,
    /// Resolved MI determination.
    pub outcome: Mci,
    /// Resolved primary/secondary classification.
    pub primary_secondary: Option<EventType>,
    /// Resolved false positive flag.
    pub false_positive_event: Option<bool>,
    /// Resolved false positive reason.
    pub false_positive_reason: Option<FalsePositiveReason>,
    /// Resolved secondary cause.
    pub secondary_cause: Consensus<Option<SecondaryCause>>,
    /// Resolved free-text secondary cause.
    pub secondary_cause_other: Consensus<Option<String>>,
    /// Resolved cardiac intervention flag.
    pub ci: Option<bool>,
    /// Resolved cardiac intervention type.
    pub ci_type: Consensus<Option<CiType>>,
    /// Resolved ECG classification.
    pub ecg_type: Consensus<Option<EcgType>>,
    /// Reviews that produced the record.
    pub quorum: DerivationQuorum,
    /// When the record was derived.
    pub derived_at: DateTime<Utc>,
}
