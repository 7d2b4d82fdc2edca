//! Repository port for event persistence and conditional status updates.

use crate::adjudication::domain::{Event, EventField, EventId, EventStatus, StatusUpdate};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for event repository operations.
pub type EventRepositoryResult<T> = Result<T, EventRepositoryError>;

/// Event persistence contract.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Reserves the identifier for a new event.
    async fn next_id(&self) -> EventRepositoryResult<EventId>;

    /// Stores a new event.
    ///
    /// # Errors
    ///
    /// Returns [`EventRepositoryError::DuplicateEvent`] when the identifier
    /// already exists.
    async fn store(&self, event: &Event) -> EventRepositoryResult<()>;

    /// Finds an event by identifier.
    ///
    /// Returns `None` when the event does not exist.
    async fn find_by_id(&self, id: EventId) -> EventRepositoryResult<Option<Event>>;

    /// Atomically applies `update` only if the stored status equals
    /// `expected`.
    ///
    /// Returns `true` when the update was applied. A missing event is
    /// reported as `false`.
    async fn conditional_update_status(
        &self,
        id: EventId,
        expected: EventStatus,
        update: StatusUpdate,
    ) -> EventRepositoryResult<bool>;

    /// Writes `fields` of `event` over the stored copy.
    ///
    /// # Errors
    ///
    /// Returns [`EventRepositoryError::NotFound`] when the event does not
    /// exist.
    async fn save(&self, event: &Event, fields: &[EventField]) -> EventRepositoryResult<()>;

    /// Returns events in any of `statuses`, ordered by identifier.
    async fn list_by_status(&self, statuses: &[EventStatus]) -> EventRepositoryResult<Vec<Event>>;
}

/// Errors returned by event repository implementations.
#[derive(Debug, Clone, Error)]
pub enum EventRepositoryError {
    /// An event with the same identifier already exists.
    #[error("duplicate event identifier: {0}")]
    DuplicateEvent(EventId),

    /// The event was not found.
    #[error("event not found: {0}")]
    NotFound(EventId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl EventRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
