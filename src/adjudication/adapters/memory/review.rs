//! In-memory review store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::adjudication::{
    domain::{EventId, Review},
    ports::{ReviewStore, ReviewStoreError, ReviewStoreResult},
};

/// Thread-safe in-memory review store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReviewStore {
    reviews: Arc<RwLock<HashMap<EventId, Vec<Review>>>>,
}

impl InMemoryReviewStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned(err: impl std::fmt::Display) -> ReviewStoreError {
        ReviewStoreError::persistence(std::io::Error::other(err.to_string()))
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn find_reviews_for_event(&self, event_id: EventId) -> ReviewStoreResult<Vec<Review>> {
        let reviews = self.reviews.read().map_err(Self::poisoned)?;
        let mut found = reviews.get(&event_id).cloned().unwrap_or_default();
        found.sort_by_key(Review::slot);
        Ok(found)
    }

    async fn save_review(&self, review: &Review) -> ReviewStoreResult<()> {
        let mut reviews = self.reviews.write().map_err(Self::poisoned)?;
        let entries = reviews.entry(review.event_id()).or_default();
        if entries.iter().any(|existing| existing.slot() == review.slot()) {
            return Err(ReviewStoreError::DuplicateReview {
                event_id: review.event_id(),
                slot: review.slot(),
            });
        }
        entries.push(review.clone());
        Ok(())
    }
}
