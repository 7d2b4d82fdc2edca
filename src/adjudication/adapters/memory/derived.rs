//! In-memory outcome record repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, PoisonError, RwLock};

use crate::adjudication::{
    domain::{EventDerivedData, EventId},
    ports::{DerivedDataError, DerivedDataRepository, DerivedDataResult},
};

/// Thread-safe in-memory outcome repository, unique per event.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDerivedDataRepository {
    records: Arc<RwLock<HashMap<EventId, EventDerivedData>>>,
}

impl InMemoryDerivedDataRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    ///
    /// A poisoned lock still reports the records it holds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned(err: impl std::fmt::Display) -> DerivedDataError {
        DerivedDataError::persistence(std::io::Error::other(err.to_string()))
    }
}

#[async_trait]
impl DerivedDataRepository for InMemoryDerivedDataRepository {
    async fn find_by_event(&self, event_id: EventId) -> DerivedDataResult<Option<EventDerivedData>> {
        let records = self.records.read().map_err(Self::poisoned)?;
        Ok(records.get(&event_id).cloned())
    }

    async fn insert(&self, record: &EventDerivedData) -> DerivedDataResult<bool> {
        let mut records = self.records.write().map_err(Self::poisoned)?;
        match records.entry(record.event_id) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(true)
            }
        }
    }
}
