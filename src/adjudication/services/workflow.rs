//! Event workflow orchestration.
//!
//! [`AdjudicationWorkflow::perform_action`] is the single entry point for
//! status-changing actions. It resolves the action name, checks the status
//! table's precondition and authorization predicates, applies the domain
//! mutation, and persists exactly the fields the mutation touched.
//!
//! First-round review submissions race: both reviewers may submit while the
//! event is `sent`. The first to land a conditional update wins the
//! `reviewerN_done` status; the other observes the change on re-read and
//! settles the pair. A third actor changing the status between the
//! conditional update and the re-read is not defended against.

use crate::adjudication::{
    domain::{
        AdjudicationDomainError, Event, EventAction, EventId, EventStatus, NewEventRequest,
        NoPacketSubmission, PacketUpload, ParseEventActionError, Review, ReviewSubmission,
        ReviewerSlot, ScreenDisposition, ScreeningDecision, StatusTable, StatusUpdate, User,
        UserId, ValidationError,
    },
    ports::{
        DerivedDataError, DerivedDataRepository, Directory, DirectoryError, EventRepository,
        EventRepositoryError, Mailer, ReviewStore, ReviewStoreError, ReviewerPool,
    },
    services::{
        consensus::{ConsensusEngine, ConsensusError, ConsensusOutcome, find_slot},
        notification::NotificationComposer,
    },
};
use chrono::NaiveDate;
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Data submitted with an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPayload {
    /// Intake form for `add`.
    Add(NewEventRequest),
    /// Raw packet for `upload`.
    Upload(PacketUpload),
    /// No-packet form for `markNoPacket`.
    MarkNoPacket(NoPacketSubmission),
    /// Scrubbed packet for `scrub`.
    Scrub,
    /// Screening form for `screen`.
    Screen {
        /// `Accept`, `Reject` or `Needs Rescrubbing`.
        disposition: Option<String>,
        /// Message for the site or scrubber.
        message: Option<String>,
    },
    /// Reviewer choice for `assign` and `assign3rd`.
    Assign {
        /// Reviewer to assign, if chosen.
        reviewer_id: Option<UserId>,
    },
    /// No data for `send`.
    Send,
    /// Review form for `review1`, `review2` and `review3`.
    Review(ReviewSubmission),
}

impl ActionPayload {
    const fn fits(&self, action: EventAction) -> bool {
        matches!(
            (self, action),
            (Self::Add(_), EventAction::Add)
                | (Self::Upload(_), EventAction::Upload)
                | (Self::MarkNoPacket(_), EventAction::MarkNoPacket)
                | (Self::Scrub, EventAction::Scrub)
                | (Self::Screen { .. }, EventAction::Screen)
                | (Self::Assign { .. }, EventAction::Assign | EventAction::Assign3rd)
                | (Self::Send, EventAction::Send)
                | (
                    Self::Review(_),
                    EventAction::Review1 | EventAction::Review2 | EventAction::Review3
                )
        )
    }
}

/// Result of a committed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Event acted upon.
    pub event_id: EventId,
    /// Action performed.
    pub action: EventAction,
    /// Status after the action, as last observed.
    pub status: EventStatus,
    /// User-facing summary.
    pub message: String,
    /// Derivation result when the action completed a review round.
    pub consensus: Option<ConsensusOutcome>,
    /// Reviewers whose packet notification failed.
    pub delivery_failures: Vec<DeliveryFailure>,
}

/// A packet notification that could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// Event the packet belongs to.
    pub event_id: EventId,
    /// Reviewer slot addressed.
    pub slot: ReviewerSlot,
    /// Reviewer label, or the slot when the reviewer is unknown.
    pub reviewer: String,
    /// Failure reason.
    pub reason: String,
}

/// Service-level errors for workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Submitted data failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The event's status does not allow the action.
    #[error("{action} cannot be performed on event {event_id} in status {status}")]
    Precondition {
        /// Event acted upon.
        event_id: EventId,
        /// Attempted action.
        action: EventAction,
        /// Observed status.
        status: EventStatus,
    },

    /// The actor fails the action's authorization predicate.
    #[error("user {user_id} is not authorized to {action}")]
    Authorization {
        /// Attempted action.
        action: EventAction,
        /// Acting user.
        user_id: UserId,
    },

    /// The reviewer already holds a slot on the event.
    #[error("user {reviewer_id} is already a reviewer for event {event_id}")]
    ReviewerConflict {
        /// Event being assigned.
        event_id: EventId,
        /// Rejected reviewer.
        reviewer_id: UserId,
    },

    /// The event does not exist.
    #[error("event not found: {0}")]
    NotFound(EventId),

    /// A non-creation action was requested without an event.
    #[error("{0} requires an event")]
    MissingEvent(EventAction),

    /// The action name is not in the status table.
    #[error(transparent)]
    UnknownAction(#[from] ParseEventActionError),

    /// Outcome derivation failed.
    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    /// Identifier or other domain failure.
    #[error(transparent)]
    Domain(AdjudicationDomainError),

    /// Event persistence failed.
    #[error(transparent)]
    Repository(#[from] EventRepositoryError),

    /// Review persistence failed.
    #[error(transparent)]
    ReviewStore(#[from] ReviewStoreError),

    /// Outcome persistence failed.
    #[error(transparent)]
    DerivedData(#[from] DerivedDataError),

    /// User or patient lookup failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl From<AdjudicationDomainError> for WorkflowError {
    fn from(error: AdjudicationDomainError) -> Self {
        match error {
            AdjudicationDomainError::ActionNotAllowed {
                event_id,
                action,
                status,
            } => Self::Precondition {
                event_id,
                action,
                status,
            },
            AdjudicationDomainError::ReviewerConflict {
                event_id,
                reviewer_id,
            } => Self::ReviewerConflict {
                event_id,
                reviewer_id,
            },
            AdjudicationDomainError::Validation(validation) => Self::Validation(validation),
            other @ AdjudicationDomainError::InvalidIdentifier { .. } => Self::Domain(other),
        }
    }
}

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Event workflow orchestration service.
#[derive(Clone)]
pub struct AdjudicationWorkflow<E, S, D, U, M, C>
where
    E: EventRepository,
    S: ReviewStore,
    D: DerivedDataRepository,
    U: Directory,
    M: Mailer,
    C: Clock + Send + Sync,
{
    events: Arc<E>,
    reviews: Arc<S>,
    directory: Arc<U>,
    mailer: Arc<M>,
    consensus: ConsensusEngine<S, D, C>,
    composer: NotificationComposer,
    clock: Arc<C>,
}

impl<E, S, D, U, M, C> AdjudicationWorkflow<E, S, D, U, M, C>
where
    E: EventRepository,
    S: ReviewStore,
    D: DerivedDataRepository,
    U: Directory,
    M: Mailer,
    C: Clock + Send + Sync,
{
    /// Creates a workflow service.
    #[must_use]
    pub fn new(
        events: Arc<E>,
        reviews: Arc<S>,
        derived: Arc<D>,
        directory: Arc<U>,
        mailer: Arc<M>,
        composer: NotificationComposer,
        clock: Arc<C>,
    ) -> Self {
        let consensus = ConsensusEngine::new(Arc::clone(&reviews), derived, Arc::clone(&clock));
        Self {
            events,
            reviews,
            directory,
            mailer,
            consensus,
            composer,
            clock,
        }
    }

    /// Returns the consensus engine used after review rounds.
    #[must_use]
    pub const fn consensus(&self) -> &ConsensusEngine<S, D, C> {
        &self.consensus
    }

    /// Returns the event repository.
    #[must_use]
    pub const fn events(&self) -> &Arc<E> {
        &self.events
    }

    /// Returns the directory.
    #[must_use]
    pub const fn directory(&self) -> &Arc<U> {
        &self.directory
    }

    /// Returns `true` if `user` passes the action's authorization predicate.
    #[must_use]
    pub fn can_perform_action(&self, action: EventAction, user: &User, event: Option<&Event>) -> bool {
        StatusTable::can_perform_action(action, user, event)
    }

    /// Returns `true` if the action is legal from the event's status.
    #[must_use]
    pub fn can_be_performed(&self, action: EventAction, event: Option<&Event>) -> bool {
        StatusTable::can_be_performed(action, event)
    }

    /// Performs a named action.
    ///
    /// `event_id` is ignored for `add` and required otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::UnknownAction`] for names outside the status
    /// table, [`WorkflowError::NotFound`] for missing events,
    /// [`WorkflowError::Precondition`] or [`WorkflowError::Authorization`]
    /// when the status table forbids the action, and validation or port
    /// errors otherwise.
    pub async fn perform_action(
        &self,
        action_name: &str,
        actor: &User,
        event_id: Option<EventId>,
        payload: ActionPayload,
    ) -> WorkflowResult<ActionOutcome> {
        let action = EventAction::try_from(action_name)?;
        if !payload.fits(action) {
            return Err(ValidationError::PayloadMismatch(action).into());
        }

        if let ActionPayload::Add(request) = payload {
            return self.add_event(actor, request).await;
        }

        let id = event_id.ok_or(WorkflowError::MissingEvent(action))?;
        let event = self
            .events
            .find_by_id(id)
            .await?
            .ok_or(WorkflowError::NotFound(id))?;
        event.ensure_allowed(action)?;
        if !StatusTable::can_perform_action(action, actor, Some(&event)) {
            return Err(WorkflowError::Authorization {
                action,
                user_id: actor.id(),
            });
        }

        match payload {
            ActionPayload::Upload(upload) => self.upload(event, actor, upload).await,
            ActionPayload::MarkNoPacket(submission) => {
                self.mark_no_packet(event, actor, submission).await
            }
            ActionPayload::Scrub => self.scrub(event, actor).await,
            ActionPayload::Screen {
                disposition,
                message,
            } => {
                let decision = ScreeningDecision::from_form(disposition.as_deref(), message)?;
                self.screen(event, actor, decision).await
            }
            ActionPayload::Assign { reviewer_id } => {
                let third_review = action == EventAction::Assign3rd;
                let reviewer = self.eligible_reviewer(reviewer_id, third_review).await?;
                let (updated, slot) = self
                    .assign_reviewer(event, &reviewer, actor, third_review)
                    .await?;
                Ok(Self::outcome(
                    &updated,
                    action,
                    format!("Assigned {} as reviewer {slot}", reviewer.username()),
                ))
            }
            ActionPayload::Send => {
                let (updated, failures) = self.send_packets(event, actor).await?;
                let message = send_summary(&failures).unwrap_or_else(|| "Packets sent".to_owned());
                Ok(ActionOutcome {
                    delivery_failures: failures,
                    ..Self::outcome(&updated, action, message)
                })
            }
            ActionPayload::Review(submission) => {
                self.submit_review(event, actor, action, submission).await
            }
            ActionPayload::Add(_) => Err(ValidationError::PayloadMismatch(action).into()),
        }
    }

    /// Looks up `reviewer_id` in the pool for the assignment kind.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoReviewer`] or
    /// [`ValidationError::NotAReviewer`].
    pub async fn eligible_reviewer(
        &self,
        reviewer_id: Option<UserId>,
        third_review: bool,
    ) -> WorkflowResult<User> {
        let id = reviewer_id.ok_or(ValidationError::NoReviewer)?;
        let pool = self
            .directory
            .reviewer_pool(ReviewerPool::for_assignment(third_review))
            .await?;
        pool.into_iter()
            .find(|user| user.id() == id)
            .ok_or_else(|| ValidationError::NotAReviewer(id).into())
    }

    /// Assigns `reviewer` to the event's next open slot and persists it.
    ///
    /// Authorization is the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Precondition`] or
    /// [`WorkflowError::ReviewerConflict`] from the domain, or a repository
    /// error.
    pub async fn assign_reviewer(
        &self,
        mut event: Event,
        reviewer: &User,
        actor: &User,
        third_review: bool,
    ) -> WorkflowResult<(Event, ReviewerSlot)> {
        let (slot, fields) =
            event.assign_reviewer(reviewer.id(), actor.id(), self.today(), third_review)?;
        self.events.save(&event, &fields).await?;
        info!(
            event_id = %event.id(),
            reviewer_id = %reviewer.id(),
            slot = slot.number(),
            status = %event.status(),
            "reviewer assigned"
        );
        Ok((event, slot))
    }

    /// Emails both first-round reviewers and records the send.
    ///
    /// The send is recorded even when delivery fails; failures are returned.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Precondition`] outside `assigned`, or a port
    /// error.
    pub async fn send_packets(
        &self,
        mut event: Event,
        actor: &User,
    ) -> WorkflowResult<(Event, Vec<DeliveryFailure>)> {
        event.ensure_allowed(EventAction::Send)?;
        let mut failures = Vec::new();
        for slot in [ReviewerSlot::First, ReviewerSlot::Second] {
            if let Err(failure) = self.notify_slot(&event, slot).await {
                failures.push(failure);
            }
        }

        let fields = event.record_send(actor.id(), self.today())?;
        self.events.save(&event, &fields).await?;
        info!(
            event_id = %event.id(),
            sender_id = %actor.id(),
            failed_deliveries = failures.len(),
            "packets sent"
        );
        Ok((event, failures))
    }

    /// Emails the reviewer holding `slot`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryFailure`] when the reviewer is unknown, the
    /// notification cannot be composed, or the mailer refuses it.
    pub async fn notify_slot(&self, event: &Event, slot: ReviewerSlot) -> Result<(), DeliveryFailure> {
        let failure = |reviewer: String, reason: String| DeliveryFailure {
            event_id: event.id(),
            slot,
            reviewer,
            reason,
        };
        let reviewer_id = event
            .reviewer(slot)
            .ok_or_else(|| failure(format!("reviewer {slot}"), "no reviewer assigned".to_owned()))?;
        let reviewer = self
            .directory
            .find_user(reviewer_id)
            .await
            .map_err(|error| failure(format!("user {reviewer_id}"), error.to_string()))?
            .ok_or_else(|| failure(format!("user {reviewer_id}"), "unknown user".to_owned()))?;
        self.notify_reviewer(event, slot, &reviewer).await
    }

    /// Emails `reviewer` that the packet for `slot` is ready.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryFailure`] when composition or delivery fails.
    pub async fn notify_reviewer(
        &self,
        event: &Event,
        slot: ReviewerSlot,
        reviewer: &User,
    ) -> Result<(), DeliveryFailure> {
        let delivery = match self.composer.compose(event, slot, reviewer) {
            Ok(notification) => self
                .mailer
                .send_packet_notification(&notification)
                .await
                .map_err(|error| error.to_string()),
            Err(error) => Err(error.to_string()),
        };
        delivery.map_err(|reason| {
            warn!(
                event_id = %event.id(),
                reviewer = reviewer.username(),
                slot = slot.number(),
                reason = %reason,
                "packet notification failed"
            );
            DeliveryFailure {
                event_id: event.id(),
                slot,
                reviewer: reviewer.username().to_owned(),
                reason,
            }
        })
    }

    async fn add_event(&self, actor: &User, request: NewEventRequest) -> WorkflowResult<ActionOutcome> {
        if !StatusTable::can_perform_action(EventAction::Add, actor, None) {
            return Err(WorkflowError::Authorization {
                action: EventAction::Add,
                user_id: actor.id(),
            });
        }
        let intake = request.validate()?;
        let patient = self
            .directory
            .find_patient(&intake.site, &intake.site_patient_id)
            .await?
            .ok_or_else(|| ValidationError::PatientNotFound {
                site_patient_id: intake.site_patient_id.clone(),
                site: intake.site.clone(),
            })?;

        let id = self.events.next_id().await?;
        let event = Event::new(
            id,
            &patient,
            intake.event_date,
            intake.criteria,
            actor.id(),
            self.today(),
        );
        self.events.store(&event).await?;
        info!(event_id = %id, patient_id = %patient.id(), creator_id = %actor.id(), "event created");
        Ok(Self::outcome(&event, EventAction::Add, format!("Event {id} added")))
    }

    async fn upload(
        &self,
        mut event: Event,
        actor: &User,
        upload: PacketUpload,
    ) -> WorkflowResult<ActionOutcome> {
        let (packet, confirmed) = upload.into_packet_file()?;
        let fields = event.record_upload(packet, confirmed, actor.id(), self.today())?;
        self.events.save(&event, &fields).await?;
        info!(event_id = %event.id(), uploader_id = %actor.id(), "packet uploaded");
        Ok(Self::outcome(&event, EventAction::Upload, "Charts file uploaded".to_owned()))
    }

    async fn mark_no_packet(
        &self,
        mut event: Event,
        actor: &User,
        submission: NoPacketSubmission,
    ) -> WorkflowResult<ActionOutcome> {
        let details = submission.validate()?;
        let fields = event.mark_no_packet(details, actor.id(), self.today())?;
        self.events.save(&event, &fields).await?;
        info!(event_id = %event.id(), marker_id = %actor.id(), "event marked as having no packet");
        Ok(Self::outcome(
            &event,
            EventAction::MarkNoPacket,
            "Event marked as having no packet".to_owned(),
        ))
    }

    async fn scrub(&self, mut event: Event, actor: &User) -> WorkflowResult<ActionOutcome> {
        let fields = event.record_scrub(actor.id(), self.today())?;
        self.events.save(&event, &fields).await?;
        info!(event_id = %event.id(), scrubber_id = %actor.id(), "scrubbed packet uploaded");
        Ok(Self::outcome(&event, EventAction::Scrub, "Scrubbed file uploaded".to_owned()))
    }

    async fn screen(
        &self,
        mut event: Event,
        actor: &User,
        decision: ScreeningDecision,
    ) -> WorkflowResult<ActionOutcome> {
        let disposition = decision.disposition;
        let fields = event.apply_screening(decision, actor.id(), self.today())?;
        self.events.save(&event, &fields).await?;
        info!(
            event_id = %event.id(),
            screener_id = %actor.id(),
            disposition = disposition.as_str(),
            status = %event.status(),
            "event screened"
        );
        let verdict = match disposition {
            ScreenDisposition::NeedsRescrubbing => disposition.as_str().to_owned(),
            ScreenDisposition::Accept | ScreenDisposition::Reject => {
                format!("{}ed", disposition.as_str())
            }
        };
        let display_id = self.composer.config().display_id(event.id());
        let message = format!(
            "Screened event {} {display_id} ({verdict})",
            self.composer.config().project_name
        );
        Ok(Self::outcome(&event, EventAction::Screen, message))
    }

    async fn submit_review(
        &self,
        event: Event,
        actor: &User,
        action: EventAction,
        submission: ReviewSubmission,
    ) -> WorkflowResult<ActionOutcome> {
        let Some(slot) = action.review_slot() else {
            return Err(ValidationError::PayloadMismatch(action).into());
        };
        let judgment = submission.validate()?;
        let review = Review::new(event.id(), actor.id(), slot, judgment, self.clock.utc());
        self.reviews
            .save_review(&review)
            .await
            .map_err(|error| match error {
                ReviewStoreError::DuplicateReview { .. } => WorkflowError::Precondition {
                    event_id: event.id(),
                    action,
                    status: event.status(),
                },
                other @ ReviewStoreError::Persistence(_) => other.into(),
            })?;
        info!(event_id = %event.id(), reviewer_id = %actor.id(), slot = slot.number(), "review saved");

        let (status, consensus) = if slot == ReviewerSlot::Third {
            self.complete_arbitration(event).await?
        } else {
            self.record_first_round_review(event, slot).await?
        };

        Ok(ActionOutcome {
            event_id: review.event_id(),
            action,
            status,
            message: "Review submitted".to_owned(),
            consensus,
            delivery_failures: Vec::new(),
        })
    }

    async fn complete_arbitration(
        &self,
        mut event: Event,
    ) -> WorkflowResult<(EventStatus, Option<ConsensusOutcome>)> {
        let fields = event.complete_arbitration(self.today());
        self.events.save(&event, &fields).await?;
        info!(event_id = %event.id(), "arbitration complete");
        let outcome = self.consensus.derive_from_three(event.id()).await?;
        Ok((event.status(), Some(outcome)))
    }

    async fn record_first_round_review(
        &self,
        mut event: Event,
        slot: ReviewerSlot,
    ) -> WorkflowResult<(EventStatus, Option<ConsensusOutcome>)> {
        let today = self.today();
        let event_id = event.id();

        if let (Some(done_status), EventStatus::Sent) = (slot.done_status(), event.status()) {
            let update = StatusUpdate::new(done_status).with_review_date(slot, today);
            self.events
                .conditional_update_status(event_id, EventStatus::Sent, update)
                .await?;
            let current = self
                .events
                .find_by_id(event_id)
                .await?
                .ok_or(WorkflowError::NotFound(event_id))?
                .status();
            if current == done_status
                || current == EventStatus::Done
                || current == EventStatus::ThirdReviewNeeded
            {
                info!(event_id = %event_id, status = %current, "first-round review recorded");
                return Ok((current, None));
            }
        }

        let reviews = self.reviews.find_reviews_for_event(event_id).await?;
        let first = find_slot(&reviews, event_id, ReviewerSlot::First)?;
        let second = find_slot(&reviews, event_id, ReviewerSlot::Second)?;
        let agreed =
            first.judgment().adjudication_key() == second.judgment().adjudication_key();

        let fields = event.settle_review_pair(slot, agreed, today);
        self.events.save(&event, &fields).await?;
        info!(event_id = %event_id, agreed, status = %event.status(), "first-round reviews settled");

        let consensus = if agreed {
            Some(self.consensus.derive_from_two(first, second).await?)
        } else {
            None
        };
        Ok((event.status(), consensus))
    }

    fn today(&self) -> NaiveDate {
        self.clock.utc().date_naive()
    }

    fn outcome(event: &Event, action: EventAction, message: String) -> ActionOutcome {
        ActionOutcome {
            event_id: event.id(),
            action,
            status: event.status(),
            message,
            consensus: None,
            delivery_failures: Vec::new(),
        }
    }
}

/// Describes failed deliveries for one event, e.g.
/// `Email to drsmith and drjones failed.`
///
/// Returns `None` when nothing failed.
#[must_use]
pub fn send_summary(failures: &[DeliveryFailure]) -> Option<String> {
    let names: Vec<&str> = failures.iter().map(|failure| failure.reviewer.as_str()).collect();
    match names.as_slice() {
        [] => None,
        [only] => Some(format!("Email to {only} failed.")),
        [rest @ .., last] => Some(format!("Email to {} and {last} failed.", rest.join(", "))),
    }
}
