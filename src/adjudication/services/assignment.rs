//! Batch reviewer assignment and packet delivery.
//!
//! Both batches classify every selected event before touching any of them.
//! If the acting user is not authorized for an otherwise eligible event the
//! whole batch is refused and nothing is modified.

use crate::adjudication::{
    domain::{
        Event, EventAction, EventId, ReviewerSlot, StatusTable, User, UserId, ValidationError,
    },
    ports::{DerivedDataRepository, Directory, EventRepository, Mailer, ReviewStore},
    services::workflow::{AdjudicationWorkflow, DeliveryFailure, WorkflowError, send_summary},
};
use mockable::Clock;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Top-level batch failure. No event is modified when one is returned.
#[derive(Debug, Error)]
pub enum BatchError {
    /// No reviewer was chosen.
    #[error("You must choose a reviewer")]
    NoReviewer,

    /// The chosen user is not in the eligible pool.
    #[error("User {0} is not a reviewer")]
    NotAReviewer(UserId),

    /// The acting user may not perform the batch action.
    #[error("{message}")]
    Unauthorized {
        /// Batch action refused.
        action: EventAction,
        /// User-facing message.
        message: &'static str,
    },

    /// A port failed while the batch ran.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

impl BatchError {
    const fn unauthorized(action: EventAction) -> Self {
        let message = match action {
            EventAction::Send => "You cannot send packets",
            _ => "You cannot assign reviewers",
        };
        Self::Unauthorized { action, message }
    }
}

/// Result type for batch operations.
pub type BatchResult<T> = Result<T, BatchError>;

/// Event identifiers falling into one result category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventIdList(Vec<EventId>);

impl EventIdList {
    fn push(&mut self, id: EventId) {
        self.0.push(id);
    }

    /// Returns the number of events.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when no event fell into the category.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the identifiers in selection order.
    #[must_use]
    pub fn ids(&self) -> &[EventId] {
        &self.0
    }

    /// Returns the identifiers joined by spaces, e.g. `3 7 12`.
    #[must_use]
    pub fn joined(&self) -> String {
        self.0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn append_line(summary: &mut String, list: &EventIdList, label: &str) {
    if !list.is_empty() {
        summary.push_str(&format!(
            "\n{} event(s) {label}: {}",
            list.count(),
            list.joined()
        ));
    }
}

/// Result of [`AssignmentCoordinator::assign_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentReport {
    /// Events assigned to the reviewer.
    pub assigned: EventIdList,
    /// Selected identifiers with no event.
    pub not_found: EventIdList,
    /// Events not in an assignable status.
    pub cannot_assign: EventIdList,
    /// Events where the reviewer already holds a slot.
    pub cannot_assign_reviewer: EventIdList,
    /// Arbitration assignments skipped because the notification failed.
    pub email_failed: EventIdList,
}

impl AssignmentReport {
    /// User-facing summary, e.g. `3 event(s) assigned.`
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!("{} event(s) assigned.", self.assigned.count());
        append_line(&mut summary, &self.not_found, "not found");
        append_line(&mut summary, &self.cannot_assign, "cannot be assigned at this time");
        append_line(
            &mut summary,
            &self.cannot_assign_reviewer,
            "cannot be assigned to the selected reviewer",
        );
        append_line(&mut summary, &self.email_failed, "email failed");
        summary
    }
}

/// Result of [`AssignmentCoordinator::send_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReport {
    /// Events sent with both notifications delivered.
    pub sent: EventIdList,
    /// Selected identifiers with no event.
    pub not_found: EventIdList,
    /// Events not in status `assigned`.
    pub cannot_send: EventIdList,
    /// Events sent with at least one failed notification.
    pub bad_email: EventIdList,
    /// Per-event failure messages, e.g. `Email to drsmith failed.`
    pub bad_email_messages: Vec<(EventId, String)>,
    /// Individual failed deliveries.
    pub failures: Vec<DeliveryFailure>,
}

impl SendReport {
    /// User-facing summary, e.g. `2 event(s) sent.`
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!("{} event(s) sent.", self.sent.count());
        append_line(&mut summary, &self.not_found, "not found");
        append_line(&mut summary, &self.cannot_send, "cannot be sent at this time");
        append_line(
            &mut summary,
            &self.bad_email,
            "had bad reviewer e-mail addresses (mail was sent to the reviewers with good addresses)",
        );
        summary
    }
}

enum Plan {
    NotFound(EventId),
    Ineligible(EventId),
    ReviewerConflict(EventId),
    Ready(Box<Event>),
}

/// Batch assignment and delivery over the workflow service.
#[derive(Clone)]
pub struct AssignmentCoordinator<E, S, D, U, M, C>
where
    E: EventRepository,
    S: ReviewStore,
    D: DerivedDataRepository,
    U: Directory,
    M: Mailer,
    C: Clock + Send + Sync,
{
    workflow: Arc<AdjudicationWorkflow<E, S, D, U, M, C>>,
}

impl<E, S, D, U, M, C> AssignmentCoordinator<E, S, D, U, M, C>
where
    E: EventRepository,
    S: ReviewStore,
    D: DerivedDataRepository,
    U: Directory,
    M: Mailer,
    C: Clock + Send + Sync,
{
    /// Creates a coordinator.
    #[must_use]
    pub const fn new(workflow: Arc<AdjudicationWorkflow<E, S, D, U, M, C>>) -> Self {
        Self { workflow }
    }

    /// Assigns `reviewer_id` to every selected event.
    ///
    /// First-round assignment fills reviewer 1, then reviewer 2. Arbitration
    /// assignment emails the reviewer first and assigns only on delivery.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::NoReviewer`], [`BatchError::NotAReviewer`] or
    /// [`BatchError::Unauthorized`] without modifying any event, or
    /// [`BatchError::Workflow`] when a port fails.
    pub async fn assign_all(
        &self,
        selection: &[EventId],
        reviewer_id: Option<UserId>,
        actor: &User,
        third_review: bool,
    ) -> BatchResult<AssignmentReport> {
        let action = if third_review {
            EventAction::Assign3rd
        } else {
            EventAction::Assign
        };
        let reviewer = match self.workflow.eligible_reviewer(reviewer_id, third_review).await {
            Ok(user) => user,
            Err(WorkflowError::Validation(ValidationError::NoReviewer)) => {
                return Err(BatchError::NoReviewer);
            }
            Err(WorkflowError::Validation(ValidationError::NotAReviewer(id))) => {
                return Err(BatchError::NotAReviewer(id));
            }
            Err(other) => return Err(other.into()),
        };

        let mut plans = Vec::new();
        for id in dedupe(selection) {
            let plan = match self.workflow.events().find_by_id(id).await.map_err(WorkflowError::from)? {
                None => Plan::NotFound(id),
                Some(event) if !StatusTable::can_be_performed(action, Some(&event)) => {
                    Plan::Ineligible(id)
                }
                Some(event) if !event.can_take_reviewer(reviewer.id(), third_review) => {
                    Plan::ReviewerConflict(id)
                }
                Some(event) => {
                    if !StatusTable::can_perform_action(action, actor, Some(&event)) {
                        warn!(actor_id = %actor.id(), event_id = %id, "assignment batch refused");
                        return Err(BatchError::unauthorized(action));
                    }
                    Plan::Ready(Box::new(event))
                }
            };
            plans.push(plan);
        }

        let mut report = AssignmentReport::default();
        for plan in plans {
            match plan {
                Plan::NotFound(id) => report.not_found.push(id),
                Plan::Ineligible(id) => report.cannot_assign.push(id),
                Plan::ReviewerConflict(id) => report.cannot_assign_reviewer.push(id),
                Plan::Ready(event) => {
                    self.assign_one(*event, &reviewer, actor, third_review, &mut report)
                        .await?;
                }
            }
        }

        info!(
            actor_id = %actor.id(),
            reviewer_id = %reviewer.id(),
            third_review,
            assigned = report.assigned.count(),
            "assignment batch complete"
        );
        Ok(report)
    }

    async fn assign_one(
        &self,
        event: Event,
        reviewer: &User,
        actor: &User,
        third_review: bool,
        report: &mut AssignmentReport,
    ) -> BatchResult<()> {
        let id = event.id();
        if third_review {
            let notified = self
                .workflow
                .notify_reviewer(&event, ReviewerSlot::Third, reviewer)
                .await;
            if notified.is_err() {
                report.email_failed.push(id);
                return Ok(());
            }
        }

        match self
            .workflow
            .assign_reviewer(event, reviewer, actor, third_review)
            .await
        {
            Ok(_) => report.assigned.push(id),
            Err(WorkflowError::Precondition { .. }) => report.cannot_assign.push(id),
            Err(WorkflowError::ReviewerConflict { .. }) => report.cannot_assign_reviewer.push(id),
            Err(other) => return Err(other.into()),
        }
        Ok(())
    }

    /// Sends packets for every selected event.
    ///
    /// Each event is recorded as sent even when a notification fails; such
    /// events are reported under `bad_email` instead of `sent`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Unauthorized`] without modifying any event, or
    /// [`BatchError::Workflow`] when a port fails.
    pub async fn send_all(&self, selection: &[EventId], actor: &User) -> BatchResult<SendReport> {
        let mut plans = Vec::new();
        for id in dedupe(selection) {
            let plan = match self.workflow.events().find_by_id(id).await.map_err(WorkflowError::from)? {
                None => Plan::NotFound(id),
                Some(event) if !StatusTable::can_be_performed(EventAction::Send, Some(&event)) => {
                    Plan::Ineligible(id)
                }
                Some(event) => {
                    if !StatusTable::can_perform_action(EventAction::Send, actor, Some(&event)) {
                        warn!(actor_id = %actor.id(), event_id = %id, "send batch refused");
                        return Err(BatchError::unauthorized(EventAction::Send));
                    }
                    Plan::Ready(Box::new(event))
                }
            };
            plans.push(plan);
        }

        let mut report = SendReport::default();
        for plan in plans {
            match plan {
                Plan::NotFound(id) => report.not_found.push(id),
                Plan::Ineligible(id) | Plan::ReviewerConflict(id) => report.cannot_send.push(id),
                Plan::Ready(event) => {
                    let id = event.id();
                    match self.workflow.send_packets(*event, actor).await {
                        Ok((_, failures)) => match send_summary(&failures) {
                            None => report.sent.push(id),
                            Some(message) => {
                                warn!(event_id = %id, message = %message, "send completed with delivery failures");
                                report.bad_email.push(id);
                                report.bad_email_messages.push((id, message));
                                report.failures.extend(failures);
                            }
                        },
                        Err(WorkflowError::Precondition { .. }) => report.cannot_send.push(id),
                        Err(other) => return Err(other.into()),
                    }
                }
            }
        }

        info!(actor_id = %actor.id(), sent = report.sent.count(), "send batch complete");
        Ok(report)
    }
}

fn dedupe(selection: &[EventId]) -> Vec<EventId> {
    let mut seen = HashSet::new();
    selection
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}
