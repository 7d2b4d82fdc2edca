//! Adjudicated outcome persistence port.

use crate::adjudication::domain::{EventDerivedData, EventId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for derived data operations.
pub type DerivedDataResult<T> = Result<T, DerivedDataError>;

/// Outcome record persistence contract.
///
/// Implementations enforce at most one record per event.
#[async_trait]
pub trait DerivedDataRepository: Send + Sync {
    /// Finds the record for an event.
    async fn find_by_event(&self, event_id: EventId) -> DerivedDataResult<Option<EventDerivedData>>;

    /// Inserts a record.
    ///
    /// Returns `false` without writing when a record already exists for the
    /// event; records are never overwritten.
    async fn insert(&self, record: &EventDerivedData) -> DerivedDataResult<bool>;
}

/// Errors returned by derived data implementations.
#[derive(Debug, Clone, Error)]
pub enum DerivedDataError {
    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl DerivedDataError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
