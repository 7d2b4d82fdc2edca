//! Reduction of independent reviews to a single adjudicated outcome.
//!
//! Two agreeing first-round reviews resolve secondary fields by pairwise
//! equality. After arbitration the three reviews resolve every field by
//! majority, and no record is written when any of the five primary fields
//! has no majority.

use crate::adjudication::{
    domain::{
        ClinicalJudgment, Consensus, DerivationQuorum, DerivedDataId, EventDerivedData, EventId,
        EventType, Review, ReviewerSlot, majority, pairwise,
    },
    ports::{DerivedDataError, DerivedDataRepository, ReviewStore, ReviewStoreError},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Result of a derivation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusOutcome {
    /// A new record was written.
    Recorded(EventDerivedData),
    /// A record already existed; nothing was written.
    AlreadyRecorded,
    /// Three reviews produced no majority on a primary field.
    Stalemate,
}

impl ConsensusOutcome {
    /// Returns the written record, if any.
    #[must_use]
    pub const fn record(&self) -> Option<&EventDerivedData> {
        match self {
            Self::Recorded(record) => Some(record),
            Self::AlreadyRecorded | Self::Stalemate => None,
        }
    }
}

/// Errors raised while deriving an outcome.
#[derive(Debug, Error)]
pub enum ConsensusError {
    /// The event lacks a review the derivation needs.
    #[error("event {event_id} has no review from reviewer {slot}")]
    MissingReview {
        /// Event being derived.
        event_id: EventId,
        /// Slot without a review.
        slot: ReviewerSlot,
    },
    /// Review lookup failed.
    #[error(transparent)]
    ReviewStore(#[from] ReviewStoreError),
    /// Outcome persistence failed.
    #[error(transparent)]
    DerivedData(#[from] DerivedDataError),
}

/// Result type for consensus operations.
pub type ConsensusResult<T> = Result<T, ConsensusError>;

/// Writes adjudicated outcome records.
#[derive(Clone)]
pub struct ConsensusEngine<S, D, C>
where
    S: ReviewStore,
    D: DerivedDataRepository,
    C: Clock + Send + Sync,
{
    reviews: Arc<S>,
    derived: Arc<D>,
    clock: Arc<C>,
}

impl<S, D, C> ConsensusEngine<S, D, C>
where
    S: ReviewStore,
    D: DerivedDataRepository,
    C: Clock + Send + Sync,
{
    /// Creates a consensus engine.
    #[must_use]
    pub const fn new(reviews: Arc<S>, derived: Arc<D>, clock: Arc<C>) -> Self {
        Self {
            reviews,
            derived,
            clock,
        }
    }

    /// Records the outcome of two agreeing first-round reviews.
    ///
    /// The caller guarantees the reviews agree on the primary fields; they
    /// are taken from `first`.
    ///
    /// # Errors
    ///
    /// Returns [`ConsensusError::DerivedData`] when persistence fails.
    pub async fn derive_from_two(
        &self,
        first: &Review,
        second: &Review,
    ) -> ConsensusResult<ConsensusOutcome> {
        let event_id = first.event_id();
        if self.derived.find_by_event(event_id).await?.is_some() {
            return Ok(ConsensusOutcome::AlreadyRecorded);
        }
        let record = resolve_pair(event_id, first.judgment(), second.judgment(), self.clock.utc());
        self.persist(record).await
    }

    /// Records the majority outcome once the arbitrating review is in.
    ///
    /// # Errors
    ///
    /// Returns [`ConsensusError::MissingReview`] when fewer than three
    /// reviews exist, or a port error when lookup or persistence fails.
    pub async fn derive_from_three(&self, event_id: EventId) -> ConsensusResult<ConsensusOutcome> {
        if self.derived.find_by_event(event_id).await?.is_some() {
            return Ok(ConsensusOutcome::AlreadyRecorded);
        }

        let reviews = self.reviews.find_reviews_for_event(event_id).await?;
        let first = find_slot(&reviews, event_id, ReviewerSlot::First)?;
        let second = find_slot(&reviews, event_id, ReviewerSlot::Second)?;
        let third = find_slot(&reviews, event_id, ReviewerSlot::Third)?;

        match resolve_majority(
            event_id,
            [first.judgment(), second.judgment(), third.judgment()],
            self.clock.utc(),
        ) {
            Some(record) => self.persist(record).await,
            None => {
                debug!(event_id = %event_id, "no majority on primary fields; outcome not recorded");
                Ok(ConsensusOutcome::Stalemate)
            }
        }
    }

    async fn persist(&self, record: EventDerivedData) -> ConsensusResult<ConsensusOutcome> {
        if self.derived.insert(&record).await? {
            debug!(
                event_id = %record.event_id,
                outcome = %record.outcome,
                quorum = ?record.quorum,
                "adjudicated outcome recorded"
            );
            Ok(ConsensusOutcome::Recorded(record))
        } else {
            Ok(ConsensusOutcome::AlreadyRecorded)
        }
    }
}

/// Returns the review submitted from `slot`.
///
/// # Errors
///
/// Returns [`ConsensusError::MissingReview`] when the slot has no review.
pub fn find_slot(
    reviews: &[Review],
    event_id: EventId,
    slot: ReviewerSlot,
) -> ConsensusResult<&Review> {
    reviews
        .iter()
        .find(|review| review.slot() == slot)
        .ok_or(ConsensusError::MissingReview { event_id, slot })
}

/// Builds the record for two agreeing reviews.
#[must_use]
pub fn resolve_pair(
    event_id: EventId,
    first: &ClinicalJudgment,
    second: &ClinicalJudgment,
    derived_at: DateTime<Utc>,
) -> EventDerivedData {
    let (secondary_cause, secondary_cause_other) =
        match pairwise(&first.secondary_cause, &second.secondary_cause) {
            Consensus::Agreed(cause) => (
                Consensus::Agreed(cause),
                pairwise(&first.other_cause, &second.other_cause),
            ),
            Consensus::NoConsensus => (Consensus::NoConsensus, Consensus::NoConsensus),
        };

    EventDerivedData {
        id: DerivedDataId::new(),
        event_id,
        outcome: first.mci,
        primary_secondary: first.event_type,
        false_positive_event: first.false_positive_flag,
        false_positive_reason: first.false_positive_reason,
        secondary_cause,
        secondary_cause_other,
        ci: first.ci,
        ci_type: pairwise(&first.ci_type, &second.ci_type),
        ecg_type: pairwise(&first.ecg_type, &second.ecg_type),
        quorum: DerivationQuorum::Two,
        derived_at,
    }
}

/// Builds the majority record for three reviews.
///
/// Returns `None` when `mci`, `type`, the false positive flag or reason, or
/// `ci` has no majority.
#[must_use]
pub fn resolve_majority(
    event_id: EventId,
    judgments: [&ClinicalJudgment; 3],
    derived_at: DateTime<Utc>,
) -> Option<EventDerivedData> {
    let [a, b, c] = judgments;

    let outcome = majority(&a.mci, &b.mci, &c.mci).agreed().copied()?;
    let primary_secondary = majority(&a.event_type, &b.event_type, &c.event_type)
        .agreed()
        .copied()?;
    let false_positive_event =
        majority(&a.false_positive_flag, &b.false_positive_flag, &c.false_positive_flag)
            .agreed()
            .copied()?;
    let false_positive_reason = majority(
        &a.false_positive_reason,
        &b.false_positive_reason,
        &c.false_positive_reason,
    )
    .agreed()
    .copied()?;
    let ci = majority(&a.ci, &b.ci, &c.ci).agreed().copied()?;

    let (secondary_cause, secondary_cause_other) =
        if primary_secondary == Some(EventType::Secondary) {
            (
                majority(&a.secondary_cause, &b.secondary_cause, &c.secondary_cause),
                majority(&a.other_cause, &b.other_cause, &c.other_cause),
            )
        } else {
            (Consensus::Agreed(None), Consensus::Agreed(None))
        };

    Some(EventDerivedData {
        id: DerivedDataId::new(),
        event_id,
        outcome,
        primary_secondary,
        false_positive_event,
        false_positive_reason,
        secondary_cause,
        secondary_cause_other,
        ci,
        ci_type: majority(&a.ci_type, &b.ci_type, &c.ci_type),
        ecg_type: majority(&a.ecg_type, &b.ecg_type, &c.ecg_type),
        quorum: DerivationQuorum::Three,
        derived_at,
    })
}
