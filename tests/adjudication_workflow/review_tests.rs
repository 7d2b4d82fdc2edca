//! First-round review submission, the completion race and consensus.

use super::helpers::{FixedClock, Harness, definite_primary, harness, no_mi, today, with_mci};
use adjudicator::adjudication::{
    adapters::memory::{
        InMemoryDerivedDataRepository, InMemoryDirectory, InMemoryEventRepository,
        InMemoryReviewStore, RecordingMailer,
    },
    config::AdjudicationConfig,
    domain::{
        Consensus, DerivationQuorum, EcgType, Event, EventField, EventId, EventStatus, Mci,
        PacketFile, Patient, PatientId, ReviewSubmission, ReviewerSlot, ScreenDisposition,
        ScreeningDecision, StatusUpdate,
    },
    ports::{DerivedDataRepository, EventRepository, EventRepositoryResult, ReviewStore},
    services::{
        ActionPayload, AdjudicationWorkflow, ConsensusError, ConsensusOutcome,
        NotificationComposer, WorkflowError,
    },
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rstest::rstest;
use std::sync::{Arc, Mutex};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn first_review_marks_reviewer_done(harness: Harness) -> eyre::Result<()> {
    let id = harness.sent_event().await?;

    let outcome = harness
        .review("review1", &harness.cast.smith, id, definite_primary())
        .await?;

    eyre::ensure!(outcome.status == EventStatus::Reviewer1Done);
    eyre::ensure!(outcome.consensus.is_none());
    let event = harness
        .events
        .find_by_id(id)
        .await?
        .ok_or_else(|| eyre::eyre!("event missing"))?;
    eyre::ensure!(event.review_date(ReviewerSlot::First) == Some(today()));
    eyre::ensure!(event.review_date(ReviewerSlot::Second).is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn agreeing_reviews_finish_and_record_outcome(harness: Harness) -> eyre::Result<()> {
    let id = harness.sent_event().await?;
    harness
        .review("review2", &harness.cast.jones, id, definite_primary())
        .await?;

    let outcome = harness
        .review(
            "review1",
            &harness.cast.smith,
            id,
            ReviewSubmission {
                ecg_type: Some(EcgType::NonStemi),
                ..definite_primary()
            },
        )
        .await?;

    eyre::ensure!(outcome.status == EventStatus::Done);
    let Some(ConsensusOutcome::Recorded(record)) = outcome.consensus else {
        eyre::bail!("expected a recorded outcome, got {:?}", outcome.consensus);
    };
    eyre::ensure!(record.outcome == Mci::Definite);
    eyre::ensure!(record.quorum == DerivationQuorum::Two);
    eyre::ensure!(record.ecg_type == Consensus::NoConsensus);
    eyre::ensure!(harness.derived.find_by_event(id).await?.as_ref() == Some(&record));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn disagreeing_reviews_need_arbitration(harness: Harness) -> eyre::Result<()> {
    let id = harness.sent_event().await?;
    harness
        .review("review1", &harness.cast.smith, id, definite_primary())
        .await?;

    let outcome = harness
        .review("review2", &harness.cast.jones, id, with_mci(Mci::Probable))
        .await?;

    eyre::ensure!(outcome.status == EventStatus::ThirdReviewNeeded);
    eyre::ensure!(outcome.consensus.is_none());
    eyre::ensure!(harness.derived.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn simultaneous_reviews_settle_exactly_once(harness: Harness) -> eyre::Result<()> {
    let id = harness.sent_event().await?;

    let (first, second) = tokio::join!(
        harness.review("review1", &harness.cast.smith, id, definite_primary()),
        harness.review("review2", &harness.cast.jones, id, definite_primary()),
    );
    first?;
    second?;

    let event = harness
        .events
        .find_by_id(id)
        .await?
        .ok_or_else(|| eyre::eyre!("event missing"))?;
    eyre::ensure!(event.status() == EventStatus::Done);
    eyre::ensure!(event.review_date(ReviewerSlot::First).is_some());
    eyre::ensure!(event.review_date(ReviewerSlot::Second).is_some());
    eyre::ensure!(harness.derived.len() == 1);
    eyre::ensure!(harness.reviews.find_reviews_for_event(id).await?.len() == 2);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_reviews_from_spawned_tasks_settle_once(harness: Harness) -> eyre::Result<()> {
    let id = harness.sent_event().await?;
    let workflow = Arc::clone(&harness.workflow);
    let smith = harness.cast.smith.clone();
    let jones = harness.cast.jones.clone();

    let first = tokio::spawn({
        let workflow = Arc::clone(&workflow);
        async move {
            workflow
                .perform_action(
                    "review1",
                    &smith,
                    Some(id),
                    ActionPayload::Review(no_mi()),
                )
                .await
        }
    });
    let second = tokio::spawn(async move {
        workflow
            .perform_action(
                "review2",
                &jones,
                Some(id),
                ActionPayload::Review(no_mi()),
            )
            .await
    });
    first.await??;
    second.await??;

    let status = harness
        .events
        .find_by_id(id)
        .await?
        .map(|event| event.status());
    eyre::ensure!(status == Some(EventStatus::Done));
    eyre::ensure!(harness.derived.len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reviewer_cannot_review_twice(harness: Harness) -> eyre::Result<()> {
    let id = harness.sent_event().await?;
    harness
        .review("review1", &harness.cast.smith, id, definite_primary())
        .await?;

    let repeat = harness
        .review("review1", &harness.cast.smith, id, definite_primary())
        .await;

    eyre::ensure!(matches!(
        repeat,
        Err(WorkflowError::Precondition {
            status: EventStatus::Reviewer1Done,
            ..
        })
    ));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn only_the_assigned_reviewer_may_submit(harness: Harness) -> eyre::Result<()> {
    let id = harness.sent_event().await?;

    let result = harness
        .review("review1", &harness.cast.jones, id, definite_primary())
        .await;

    eyre::ensure!(matches!(result, Err(WorkflowError::Authorization { .. })));
    eyre::ensure!(harness.reviews.find_reviews_for_event(id).await?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn incomplete_review_is_not_saved(harness: Harness) -> eyre::Result<()> {
    let id = harness.sent_event().await?;

    let result = harness
        .review(
            "review1",
            &harness.cast.smith,
            id,
            ReviewSubmission {
                ecg_type: None,
                ..definite_primary()
            },
        )
        .await;

    eyre::ensure!(matches!(result, Err(WorkflowError::Validation(_))));
    eyre::ensure!(harness.reviews.find_reviews_for_event(id).await?.is_empty());
    let status = harness
        .events
        .find_by_id(id)
        .await?
        .map(|event| event.status());
    eyre::ensure!(status == Some(EventStatus::Sent));
    Ok(())
}

/// Builds an event already sent to drsmith and drjones, outside any
/// repository.
fn sent_event_record(harness: &Harness) -> eyre::Result<Event> {
    let admin = harness.cast.admin.id();
    let mut event = Event::new(
        EventId::new(1)?,
        &Patient::new(PatientId::new(7)?, "UW", "uw-0042"),
        today(),
        Vec::new(),
        admin,
        today(),
    );
    event.record_upload(PacketFile::generate("chart.pdf"), false, admin, today())?;
    event.record_scrub(admin, today())?;
    event.apply_screening(
        ScreeningDecision::new(ScreenDisposition::Accept, None),
        admin,
        today(),
    )?;
    event.assign_reviewer(harness.cast.smith.id(), admin, today(), false)?;
    event.assign_reviewer(harness.cast.jones.id(), admin, today(), false)?;
    event.record_send(admin, today())?;
    Ok(event)
}

type WorkflowOver<E> = AdjudicationWorkflow<
    E,
    InMemoryReviewStore,
    InMemoryDerivedDataRepository,
    InMemoryDirectory,
    RecordingMailer,
    FixedClock,
>;

fn workflow_over<E: EventRepository>(
    events: Arc<E>,
    derived: Arc<InMemoryDerivedDataRepository>,
) -> eyre::Result<WorkflowOver<E>> {
    Ok(AdjudicationWorkflow::new(
        events,
        Arc::new(InMemoryReviewStore::new()),
        derived,
        Arc::new(InMemoryDirectory::new()),
        Arc::new(RecordingMailer::new()),
        NotificationComposer::new(Arc::new(AdjudicationConfig::default())),
        Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0)
                .single()
                .ok_or_else(|| eyre::eyre!("ambiguous instant"))?,
        )),
    ))
}

/// Event repository that lets another actor reset the status right after
/// every successful conditional update.
struct InterleavingEvents {
    inner: InMemoryEventRepository,
    reset_to: EventStatus,
}

#[async_trait]
impl EventRepository for InterleavingEvents {
    async fn next_id(&self) -> EventRepositoryResult<EventId> {
        self.inner.next_id().await
    }

    async fn store(&self, event: &Event) -> EventRepositoryResult<()> {
        self.inner.store(event).await
    }

    async fn find_by_id(&self, id: EventId) -> EventRepositoryResult<Option<Event>> {
        self.inner.find_by_id(id).await
    }

    async fn conditional_update_status(
        &self,
        id: EventId,
        expected: EventStatus,
        update: StatusUpdate,
    ) -> EventRepositoryResult<bool> {
        let applied = self
            .inner
            .conditional_update_status(id, expected, update)
            .await?;
        if applied {
            self.inner
                .conditional_update_status(id, update.status, StatusUpdate::new(self.reset_to))
                .await?;
        }
        Ok(applied)
    }

    async fn save(&self, event: &Event, fields: &[EventField]) -> EventRepositoryResult<()> {
        self.inner.save(event, fields).await
    }

    async fn list_by_status(&self, statuses: &[EventStatus]) -> EventRepositoryResult<Vec<Event>> {
        self.inner.list_by_status(statuses).await
    }
}

/// A third actor moving the event between a reviewer's conditional update
/// and its re-read goes undetected: the reviewer proceeds to settle the pair
/// and fails because the other review does not exist yet.
#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn interleaved_status_change_is_not_detected(harness: Harness) -> eyre::Result<()> {
    let event = sent_event_record(&harness)?;
    let events = Arc::new(InterleavingEvents {
        inner: InMemoryEventRepository::new(),
        reset_to: EventStatus::Sent,
    });
    events.store(&event).await?;
    let workflow = workflow_over(
        Arc::clone(&events),
        Arc::new(InMemoryDerivedDataRepository::new()),
    )?;

    let result = workflow
        .perform_action(
            "review1",
            &harness.cast.smith,
            Some(event.id()),
            ActionPayload::Review(definite_primary()),
        )
        .await;

    eyre::ensure!(matches!(
        result,
        Err(WorkflowError::Consensus(ConsensusError::MissingReview {
            slot: ReviewerSlot::Second,
            ..
        }))
    ));
    Ok(())
}

/// Event repository that serves one queued snapshot in place of the stored
/// event and records every conditional update result.
struct StaleReadEvents {
    inner: InMemoryEventRepository,
    stale: Mutex<Option<Event>>,
    conditional_results: Mutex<Vec<bool>>,
}

impl StaleReadEvents {
    fn new() -> Self {
        Self {
            inner: InMemoryEventRepository::new(),
            stale: Mutex::new(None),
            conditional_results: Mutex::new(Vec::new()),
        }
    }

    fn serve_once(&self, snapshot: Event) {
        *self.stale.lock().expect("stale snapshot lock") = Some(snapshot);
    }

    fn conditional_results(&self) -> Vec<bool> {
        self.conditional_results
            .lock()
            .expect("conditional results lock")
            .clone()
    }
}

#[async_trait]
impl EventRepository for StaleReadEvents {
    async fn next_id(&self) -> EventRepositoryResult<EventId> {
        self.inner.next_id().await
    }

    async fn store(&self, event: &Event) -> EventRepositoryResult<()> {
        self.inner.store(event).await
    }

    async fn find_by_id(&self, id: EventId) -> EventRepositoryResult<Option<Event>> {
        let queued = self.stale.lock().expect("stale snapshot lock").take();
        match queued {
            Some(snapshot) if snapshot.id() == id => Ok(Some(snapshot)),
            _ => self.inner.find_by_id(id).await,
        }
    }

    async fn conditional_update_status(
        &self,
        id: EventId,
        expected: EventStatus,
        update: StatusUpdate,
    ) -> EventRepositoryResult<bool> {
        let applied = self
            .inner
            .conditional_update_status(id, expected, update)
            .await?;
        self.conditional_results
            .lock()
            .expect("conditional results lock")
            .push(applied);
        Ok(applied)
    }

    async fn save(&self, event: &Event, fields: &[EventField]) -> EventRepositoryResult<()> {
        self.inner.save(event, fields).await
    }

    async fn list_by_status(&self, statuses: &[EventStatus]) -> EventRepositoryResult<Vec<Event>> {
        self.inner.list_by_status(statuses).await
    }
}

/// The second reviewer read `sent` before the first reviewer's update
/// landed: its conditional update misses, the re-read shows the other
/// reviewer finished, and it settles the pair.
#[rstest]
#[case::agreeing(Mci::Definite, EventStatus::Done, 1)]
#[case::disagreeing(Mci::Probable, EventStatus::ThirdReviewNeeded, 0)]
#[tokio::test(flavor = "multi_thread")]
async fn reviewer_losing_the_race_settles_the_pair(
    harness: Harness,
    #[case] second_mci: Mci,
    #[case] expected: EventStatus,
    #[case] records: usize,
) -> eyre::Result<()> {
    let event = sent_event_record(&harness)?;
    let events = Arc::new(StaleReadEvents::new());
    events.store(&event).await?;
    let derived = Arc::new(InMemoryDerivedDataRepository::new());
    let workflow = workflow_over(Arc::clone(&events), Arc::clone(&derived))?;

    workflow
        .perform_action(
            "review1",
            &harness.cast.smith,
            Some(event.id()),
            ActionPayload::Review(definite_primary()),
        )
        .await?;
    events.serve_once(event.clone());
    let outcome = workflow
        .perform_action(
            "review2",
            &harness.cast.jones,
            Some(event.id()),
            ActionPayload::Review(with_mci(second_mci)),
        )
        .await?;

    eyre::ensure!(events.conditional_results() == [true, false]);
    eyre::ensure!(outcome.status == expected);
    let stored = events
        .find_by_id(event.id())
        .await?
        .ok_or_else(|| eyre::eyre!("event missing"))?;
    eyre::ensure!(stored.status() == expected);
    eyre::ensure!(stored.review_date(ReviewerSlot::First) == Some(today()));
    eyre::ensure!(stored.review_date(ReviewerSlot::Second) == Some(today()));
    eyre::ensure!(derived.len() == records);
    Ok(())
}

/// Two submissions from the same reviewer that both observed `sent` cannot
/// both land; the late one is refused like any other out-of-status action.
#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn racing_repeat_review_is_refused(harness: Harness) -> eyre::Result<()> {
    let event = sent_event_record(&harness)?;
    let events = Arc::new(StaleReadEvents::new());
    events.store(&event).await?;
    let workflow = workflow_over(
        Arc::clone(&events),
        Arc::new(InMemoryDerivedDataRepository::new()),
    )?;

    workflow
        .perform_action(
            "review1",
            &harness.cast.smith,
            Some(event.id()),
            ActionPayload::Review(definite_primary()),
        )
        .await?;
    events.serve_once(event.clone());
    let repeat = workflow
        .perform_action(
            "review1",
            &harness.cast.smith,
            Some(event.id()),
            ActionPayload::Review(with_mci(Mci::Probable)),
        )
        .await;

    eyre::ensure!(
        matches!(
            repeat,
            Err(WorkflowError::Precondition {
                status: EventStatus::Sent,
                ..
            })
        ),
        "expected a precondition error, got {repeat:?}"
    );
    eyre::ensure!(events.conditional_results() == [true]);
    let status = events
        .find_by_id(event.id())
        .await?
        .map(|stored| stored.status());
    eyre::ensure!(status == Some(EventStatus::Reviewer1Done));
    Ok(())
}
