//! Work queue queries: which events are waiting on whom.

use crate::adjudication::{
    domain::{Event, EventStatus, ReviewerSlot, User},
    ports::{EventRepository, EventRepositoryResult},
};
use std::sync::Arc;

/// Read-only queries over the event repository.
#[derive(Clone)]
pub struct WorkQueues<E>
where
    E: EventRepository,
{
    events: Arc<E>,
}

impl<E> WorkQueues<E>
where
    E: EventRepository,
{
    /// Creates the query service.
    #[must_use]
    pub const fn new(events: Arc<E>) -> Self {
        Self { events }
    }

    /// Events whose review `reviewer` still owes.
    ///
    /// # Errors
    ///
    /// Returns a repository error when the lookup fails.
    pub async fn awaiting_review(&self, reviewer: &User) -> EventRepositoryResult<Vec<Event>> {
        let candidates = self
            .events
            .list_by_status(&[
                EventStatus::Sent,
                EventStatus::Reviewer1Done,
                EventStatus::Reviewer2Done,
                EventStatus::ThirdReviewAssigned,
            ])
            .await?;
        Ok(candidates
            .into_iter()
            .filter(|event| review_owed(event, reviewer))
            .collect())
    }

    /// Events at the uploader's site still waiting for a packet.
    ///
    /// # Errors
    ///
    /// Returns a repository error when the lookup fails.
    pub async fn awaiting_upload(&self, uploader: &User) -> EventRepositoryResult<Vec<Event>> {
        self.at_site(uploader, EventStatus::Created).await
    }

    /// Events at the uploader's site whose packet may be replaced.
    ///
    /// # Errors
    ///
    /// Returns a repository error when the lookup fails.
    pub async fn possible_reupload(&self, uploader: &User) -> EventRepositoryResult<Vec<Event>> {
        self.at_site(uploader, EventStatus::Uploaded).await
    }

    /// Events ready for first-round or arbitration assignment.
    ///
    /// # Errors
    ///
    /// Returns a repository error when the lookup fails.
    pub async fn to_be_assigned(&self, third_review: bool) -> EventRepositoryResult<Vec<Event>> {
        let status = if third_review {
            EventStatus::ThirdReviewNeeded
        } else {
            EventStatus::Screened
        };
        self.get_all(status).await
    }

    /// Events ready to be sent to reviewers.
    ///
    /// # Errors
    ///
    /// Returns a repository error when the lookup fails.
    pub async fn to_be_sent(&self) -> EventRepositoryResult<Vec<Event>> {
        self.get_all(EventStatus::Assigned).await
    }

    /// Events in `status`; `sent` also covers the reviewer-done states.
    ///
    /// # Errors
    ///
    /// Returns a repository error when the lookup fails.
    pub async fn get_all(&self, status: EventStatus) -> EventRepositoryResult<Vec<Event>> {
        if status == EventStatus::Sent {
            return self
                .events
                .list_by_status(&[
                    EventStatus::Sent,
                    EventStatus::Reviewer1Done,
                    EventStatus::Reviewer2Done,
                ])
                .await;
        }
        self.events.list_by_status(&[status]).await
    }

    async fn at_site(&self, uploader: &User, status: EventStatus) -> EventRepositoryResult<Vec<Event>> {
        let Some(site) = uploader.site() else {
            return Ok(Vec::new());
        };
        let candidates = self.events.list_by_status(&[status]).await?;
        Ok(candidates
            .into_iter()
            .filter(|event| event.site() == site)
            .collect())
    }
}

fn review_owed(event: &Event, reviewer: &User) -> bool {
    let holds = |slot: ReviewerSlot| event.reviewer(slot) == Some(reviewer.id());
    match event.status() {
        EventStatus::Sent => holds(ReviewerSlot::First) || holds(ReviewerSlot::Second),
        EventStatus::Reviewer2Done => holds(ReviewerSlot::First),
        EventStatus::Reviewer1Done => holds(ReviewerSlot::Second),
        EventStatus::ThirdReviewAssigned => holds(ReviewerSlot::Third),
        _ => false,
    }
}
