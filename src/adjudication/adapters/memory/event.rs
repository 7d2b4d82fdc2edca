//! In-memory event repository.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::adjudication::{
    domain::{Event, EventField, EventId, EventStatus, StatusUpdate},
    ports::{EventRepository, EventRepositoryError, EventRepositoryResult},
};

/// Thread-safe in-memory event repository.
///
/// The conditional status update holds the write lock across the compare
/// and the swap, so concurrent callers observe it as atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventRepository {
    state: Arc<RwLock<InMemoryEventState>>,
}

#[derive(Debug, Default)]
struct InMemoryEventState {
    events: BTreeMap<EventId, Event>,
    last_id: u64,
}

impl InMemoryEventRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned(err: impl std::fmt::Display) -> EventRepositoryError {
        EventRepositoryError::persistence(std::io::Error::other(err.to_string()))
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn next_id(&self) -> EventRepositoryResult<EventId> {
        let mut state = self.state.write().map_err(Self::poisoned)?;
        let candidate = state.last_id.saturating_add(1);
        let id = EventId::new(candidate).map_err(EventRepositoryError::persistence)?;
        state.last_id = candidate;
        Ok(id)
    }

    async fn store(&self, event: &Event) -> EventRepositoryResult<()> {
        let mut state = self.state.write().map_err(Self::poisoned)?;
        if state.events.contains_key(&event.id()) {
            return Err(EventRepositoryError::DuplicateEvent(event.id()));
        }
        state.last_id = state.last_id.max(event.id().value());
        state.events.insert(event.id(), event.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: EventId) -> EventRepositoryResult<Option<Event>> {
        let state = self.state.read().map_err(Self::poisoned)?;
        Ok(state.events.get(&id).cloned())
    }

    async fn conditional_update_status(
        &self,
        id: EventId,
        expected: EventStatus,
        update: StatusUpdate,
    ) -> EventRepositoryResult<bool> {
        let mut state = self.state.write().map_err(Self::poisoned)?;
        let Some(stored) = state.events.get_mut(&id) else {
            return Ok(false);
        };
        if stored.status() != expected {
            return Ok(false);
        }
        stored.apply_status_update(update);
        Ok(true)
    }

    async fn save(&self, event: &Event, fields: &[EventField]) -> EventRepositoryResult<()> {
        let mut state = self.state.write().map_err(Self::poisoned)?;
        let stored = state
            .events
            .get_mut(&event.id())
            .ok_or(EventRepositoryError::NotFound(event.id()))?;
        stored.apply_fields(event, fields);
        Ok(())
    }

    async fn list_by_status(&self, statuses: &[EventStatus]) -> EventRepositoryResult<Vec<Event>> {
        let state = self.state.read().map_err(Self::poisoned)?;
        Ok(state
            .events
            .values()
            .filter(|event| statuses.contains(&event.status()))
            .cloned()
            .collect())
    }
}
