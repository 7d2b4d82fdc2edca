//! Review persistence port.

use crate::adjudication::domain::{EventId, Review, ReviewerSlot};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for review store operations.
pub type ReviewStoreResult<T> = Result<T, ReviewStoreError>;

/// Review persistence contract.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Returns every review of the event, ordered by slot.
    async fn find_reviews_for_event(&self, event_id: EventId) -> ReviewStoreResult<Vec<Review>>;

    /// Stores a review.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewStoreError::DuplicateReview`] when the slot already
    /// holds a review for the event.
    async fn save_review(&self, review: &Review) -> ReviewStoreResult<()>;
}

/// Errors returned by review store implementations.
#[derive(Debug, Clone, Error)]
pub enum ReviewStoreError {
    /// The slot already holds a review.
    #[error("event {event_id} already has a review from reviewer {slot}")]
    DuplicateReview {
        /// Reviewed event.
        event_id: EventId,
        /// Occupied slot.
        slot: ReviewerSlot,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ReviewStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
