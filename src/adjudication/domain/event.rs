//! Event aggregate root.
//!
//! The event is mutated only through named workflow actions. Each mutating
//! method checks the status table, applies the change, and returns the list
//! of fields it touched so persistence can write exactly those fields.

use super::{
    AdjudicationDomainError, Criterion, EventAction, EventId, EventStatus, NoPacketDetails,
    PacketFile, Patient, PatientId, ReviewerSlot, ScreenDisposition, ScreeningDecision,
    StatusTable, UserId, ValidationError,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Workflow stage stamped with the acting user and date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Intake (`creator_id`, creation date).
    Creation,
    /// Raw packet upload (`uploader_id`, `upload_date`).
    Upload,
    /// No-packet marking (`marker_id`, `mark_date`).
    NoPacket,
    /// Scrubbed packet upload (`scrubber_id`, `scrub_date`).
    Scrub,
    /// Screening (`screener_id`, `screen_date`).
    Screen,
    /// Second first-round assignment (`assigner_id`, `assign_date`).
    Assign,
    /// Arbitration assignment (`assigner3rd_id`, `assign3rd_date`).
    ThirdAssign,
    /// Packet delivery (`sender_id`, `send_date`).
    Send,
}

/// Actor and date recorded for a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStamp {
    /// User who performed the stage.
    pub actor: UserId,
    /// Date the stage was performed.
    pub date: NaiveDate,
}

/// A persisted event field, used for partial saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventField {
    /// `status`.
    Status,
    /// Actor and date of a stage.
    Stamp(Stage),
    /// Reviewer identity for a slot.
    Reviewer(ReviewerSlot),
    /// Review completion date for a slot.
    ReviewDate(ReviewerSlot),
    /// Packet file metadata.
    Packet,
    /// Screening rejection message.
    RejectMessage,
    /// Screening rescrub message.
    RescrubMessage,
    /// No-packet reason and sub-fields.
    NoPacket,
}

/// Status change applied by a conditional (compare-and-swap) update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    /// New status.
    pub status: EventStatus,
    /// Review date recorded alongside the status, if any.
    pub review_date: Option<(ReviewerSlot, NaiveDate)>,
}

impl StatusUpdate {
    /// Creates an update that only changes the status.
    #[must_use]
    pub const fn new(status: EventStatus) -> Self {
        Self {
            status,
            review_date: None,
        }
    }

    /// Records a review date for `slot` with the status change.
    #[must_use]
    pub const fn with_review_date(mut self, slot: ReviewerSlot, date: NaiveDate) -> Self {
        self.review_date = Some((slot, date));
        self
    }
}

/// Event aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    patient_id: PatientId,
    site: String,
    event_date: NaiveDate,
    criteria: Vec<Criterion>,
    status: EventStatus,
    stamps: BTreeMap<Stage, StageStamp>,
    reviewer1: Option<UserId>,
    reviewer2: Option<UserId>,
    reviewer3: Option<UserId>,
    review1_date: Option<NaiveDate>,
    review2_date: Option<NaiveDate>,
    review3_date: Option<NaiveDate>,
    packet: Option<PacketFile>,
    reject_message: Option<String>,
    rescrub_message: Option<String>,
    no_packet: Option<NoPacketDetails>,
}

impl Event {
    /// Records a new event for `patient` in status `created`.
    #[must_use]
    pub fn new(
        id: EventId,
        patient: &Patient,
        event_date: NaiveDate,
        criteria: Vec<Criterion>,
        creator: UserId,
        today: NaiveDate,
    ) -> Self {
        let mut stamps = BTreeMap::new();
        stamps.insert(
            Stage::Creation,
            StageStamp {
                actor: creator,
                date: today,
            },
        );
        Self {
            id,
            patient_id: patient.id(),
            site: patient.site().to_owned(),
            event_date,
            criteria,
            status: EventStatus::Created,
            stamps,
            reviewer1: None,
            reviewer2: None,
            reviewer3: None,
            review1_date: None,
            review2_date: None,
            review3_date: None,
            packet: None,
            reject_message: None,
            rescrub_message: None,
            no_packet: None,
        }
    }

    /// Returns the event identifier.
    #[must_use]
    pub const fn id(&self) -> EventId {
        self.id
    }

    /// Returns the patient identifier.
    #[must_use]
    pub const fn patient_id(&self) -> PatientId {
        self.patient_id
    }

    /// Returns the patient's site.
    #[must_use]
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Returns the date of the suspected event.
    #[must_use]
    pub const fn event_date(&self) -> NaiveDate {
        self.event_date
    }

    /// Returns the ascertainment criteria recorded at intake.
    #[must_use]
    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    /// Returns the workflow status.
    #[must_use]
    pub const fn status(&self) -> EventStatus {
        self.status
    }

    /// Returns the actor and date recorded for `stage`.
    #[must_use]
    pub fn stamp(&self, stage: Stage) -> Option<&StageStamp> {
        self.stamps.get(&stage)
    }

    /// Returns the reviewer holding `slot`.
    #[must_use]
    pub const fn reviewer(&self, slot: ReviewerSlot) -> Option<UserId> {
        match slot {
            ReviewerSlot::First => self.reviewer1,
            ReviewerSlot::Second => self.reviewer2,
            ReviewerSlot::Third => self.reviewer3,
        }
    }

    /// Returns the date the review in `slot` was recorded.
    #[must_use]
    pub const fn review_date(&self, slot: ReviewerSlot) -> Option<NaiveDate> {
        match slot {
            ReviewerSlot::First => self.review1_date,
            ReviewerSlot::Second => self.review2_date,
            ReviewerSlot::Third => self.review3_date,
        }
    }

    /// Returns the packet file metadata, once uploaded.
    #[must_use]
    pub const fn packet(&self) -> Option<&PacketFile> {
        self.packet.as_ref()
    }

    /// Returns the screening rejection message.
    #[must_use]
    pub fn reject_message(&self) -> Option<&str> {
        self.reject_message.as_deref()
    }

    /// Returns the screening rescrub message.
    #[must_use]
    pub fn rescrub_message(&self) -> Option<&str> {
        self.rescrub_message.as_deref()
    }

    /// Returns the no-packet details, if the site reported none.
    #[must_use]
    pub const fn no_packet(&self) -> Option<&NoPacketDetails> {
        self.no_packet.as_ref()
    }

    /// Returns `true` once a packet exists for the event.
    #[must_use]
    pub fn has_chart(&self) -> bool {
        self.status != EventStatus::Created
    }

    /// Returns `true` if `reviewer` may take the next open slot.
    ///
    /// Reviewer 1 can never also be reviewer 2; for arbitration neither
    /// first-round reviewer may be chosen.
    #[must_use]
    pub fn can_take_reviewer(&self, reviewer: UserId, third_review: bool) -> bool {
        self.reviewer1 != Some(reviewer) && (!third_review || self.reviewer2 != Some(reviewer))
    }

    /// Checks the status table for `action`.
    ///
    /// # Errors
    ///
    /// Returns [`AdjudicationDomainError::ActionNotAllowed`] when the current
    /// status is not a legal source for the action.
    pub fn ensure_allowed(&self, action: EventAction) -> Result<(), AdjudicationDomainError> {
        if StatusTable::can_be_performed(action, Some(self)) {
            return Ok(());
        }
        Err(AdjudicationDomainError::ActionNotAllowed {
            event_id: self.id,
            action,
            status: self.status,
        })
    }

    /// Records a raw packet upload.
    ///
    /// # Errors
    ///
    /// Returns [`AdjudicationDomainError::ActionNotAllowed`] outside
    /// `created`/`uploaded`, or a validation error when re-uploading without
    /// confirmation.
    pub fn record_upload(
        &mut self,
        packet: PacketFile,
        confirm_reupload: bool,
        actor: UserId,
        today: NaiveDate,
    ) -> Result<Vec<EventField>, AdjudicationDomainError> {
        self.ensure_allowed(EventAction::Upload)?;
        if self.status == EventStatus::Uploaded && !confirm_reupload {
            return Err(ValidationError::ReuploadNotConfirmed.into());
        }
        self.packet = Some(packet);
        self.stamp_stage(Stage::Upload, actor, today);
        self.status = EventStatus::Uploaded;
        Ok(vec![
            EventField::Packet,
            EventField::Stamp(Stage::Upload),
            EventField::Status,
        ])
    }

    /// Records that no packet is available.
    ///
    /// # Errors
    ///
    /// Returns [`AdjudicationDomainError::ActionNotAllowed`] outside
    /// `created`/`uploaded`.
    pub fn mark_no_packet(
        &mut self,
        details: NoPacketDetails,
        actor: UserId,
        today: NaiveDate,
    ) -> Result<Vec<EventField>, AdjudicationDomainError> {
        self.ensure_allowed(EventAction::MarkNoPacket)?;
        self.no_packet = Some(details);
        self.stamp_stage(Stage::NoPacket, actor, today);
        self.status = EventStatus::NoPacketAvailable;
        Ok(vec![
            EventField::NoPacket,
            EventField::Stamp(Stage::NoPacket),
            EventField::Status,
        ])
    }

    /// Records a scrubbed packet upload.
    ///
    /// # Errors
    ///
    /// Returns [`AdjudicationDomainError::ActionNotAllowed`] outside
    /// `uploaded`/`scrubbed`.
    pub fn record_scrub(
        &mut self,
        actor: UserId,
        today: NaiveDate,
    ) -> Result<Vec<EventField>, AdjudicationDomainError> {
        self.ensure_allowed(EventAction::Scrub)?;
        self.stamp_stage(Stage::Scrub, actor, today);
        self.status = EventStatus::Scrubbed;
        Ok(vec![EventField::Stamp(Stage::Scrub), EventField::Status])
    }

    /// Applies a screening decision.
    ///
    /// # Errors
    ///
    /// Returns [`AdjudicationDomainError::ActionNotAllowed`] outside
    /// `scrubbed`.
    pub fn apply_screening(
        &mut self,
        decision: ScreeningDecision,
        actor: UserId,
        today: NaiveDate,
    ) -> Result<Vec<EventField>, AdjudicationDomainError> {
        self.ensure_allowed(EventAction::Screen)?;
        self.stamp_stage(Stage::Screen, actor, today);
        let mut fields = vec![EventField::Stamp(Stage::Screen), EventField::Status];
        match decision.disposition {
            ScreenDisposition::Accept => {
                self.status = EventStatus::Screened;
            }
            ScreenDisposition::Reject => {
                self.status = EventStatus::Rejected;
                self.reject_message = decision.message;
                fields.push(EventField::RejectMessage);
            }
            ScreenDisposition::NeedsRescrubbing => {
                self.status = EventStatus::Uploaded;
                self.rescrub_message = decision.message;
                fields.push(EventField::RescrubMessage);
            }
        }
        Ok(fields)
    }

    /// Assigns `reviewer` to the next open slot.
    ///
    /// First-round assignment fills reviewer 1 without changing status, then
    /// reviewer 2 together with the assigner stamp and status `assigned`.
    /// Arbitration fills reviewer 3 and moves to `third_review_assigned`.
    ///
    /// # Errors
    ///
    /// Returns [`AdjudicationDomainError::ActionNotAllowed`] when the status
    /// is not assignable, or [`AdjudicationDomainError::ReviewerConflict`]
    /// when `reviewer` already holds a slot.
    pub fn assign_reviewer(
        &mut self,
        reviewer: UserId,
        actor: UserId,
        today: NaiveDate,
        third_review: bool,
    ) -> Result<(ReviewerSlot, Vec<EventField>), AdjudicationDomainError> {
        let action = if third_review {
            EventAction::Assign3rd
        } else {
            EventAction::Assign
        };
        self.ensure_allowed(action)?;
        if !self.can_take_reviewer(reviewer, third_review) {
            return Err(AdjudicationDomainError::ReviewerConflict {
                event_id: self.id,
                reviewer_id: reviewer,
            });
        }

        if third_review {
            self.reviewer3 = Some(reviewer);
            self.stamp_stage(Stage::ThirdAssign, actor, today);
            self.status = EventStatus::ThirdReviewAssigned;
            return Ok((
                ReviewerSlot::Third,
                vec![
                    EventField::Stamp(Stage::ThirdAssign),
                    EventField::Status,
                    EventField::Reviewer(ReviewerSlot::Third),
                ],
            ));
        }

        if self.reviewer1.is_none() {
            self.reviewer1 = Some(reviewer);
            return Ok((
                ReviewerSlot::First,
                vec![EventField::Reviewer(ReviewerSlot::First)],
            ));
        }

        self.reviewer2 = Some(reviewer);
        self.stamp_stage(Stage::Assign, actor, today);
        self.status = EventStatus::Assigned;
        Ok((
            ReviewerSlot::Second,
            vec![
                EventField::Stamp(Stage::Assign),
                EventField::Status,
                EventField::Reviewer(ReviewerSlot::Second),
            ],
        ))
    }

    /// Records packet delivery to both first-round reviewers.
    ///
    /// # Errors
    ///
    /// Returns [`AdjudicationDomainError::ActionNotAllowed`] outside
    /// `assigned`.
    pub fn record_send(
        &mut self,
        actor: UserId,
        today: NaiveDate,
    ) -> Result<Vec<EventField>, AdjudicationDomainError> {
        self.ensure_allowed(EventAction::Send)?;
        self.stamp_stage(Stage::Send, actor, today);
        self.status = EventStatus::Sent;
        Ok(vec![EventField::Stamp(Stage::Send), EventField::Status])
    }

    /// Settles the first-round pair once the second review is in.
    ///
    /// No status precondition is checked: this runs after a failed
    /// conditional update, when the other reviewer has already moved the
    /// event off `sent`.
    pub fn settle_review_pair(
        &mut self,
        slot: ReviewerSlot,
        agreed: bool,
        today: NaiveDate,
    ) -> Vec<EventField> {
        self.status = if agreed {
            EventStatus::Done
        } else {
            EventStatus::ThirdReviewNeeded
        };
        self.set_review_date(slot, today);
        vec![EventField::Status, EventField::ReviewDate(slot)]
    }

    /// Records the arbitrating review and closes the event.
    pub fn complete_arbitration(&mut self, today: NaiveDate) -> Vec<EventField> {
        self.status = EventStatus::Done;
        self.set_review_date(ReviewerSlot::Third, today);
        vec![
            EventField::Status,
            EventField::ReviewDate(ReviewerSlot::Third),
        ]
    }

    /// Applies a conditional status update accepted by persistence.
    pub const fn apply_status_update(&mut self, update: StatusUpdate) {
        self.status = update.status;
        if let Some((slot, date)) = update.review_date {
            self.set_review_date(slot, date);
        }
    }

    /// Copies `fields` from `source` into this event.
    ///
    /// Used by persistence adapters to implement partial saves.
    pub fn apply_fields(&mut self, source: &Self, fields: &[EventField]) {
        for field in fields {
            match *field {
                EventField::Status => self.status = source.status,
                EventField::Stamp(stage) => match source.stamps.get(&stage) {
                    Some(stamp) => {
                        self.stamps.insert(stage, *stamp);
                    }
                    None => {
                        self.stamps.remove(&stage);
                    }
                },
                EventField::Reviewer(slot) => match slot {
                    ReviewerSlot::First => self.reviewer1 = source.reviewer1,
                    ReviewerSlot::Second => self.reviewer2 = source.reviewer2,
                    ReviewerSlot::Third => self.reviewer3 = source.reviewer3,
                },
                EventField::ReviewDate(slot) => match slot {
                    ReviewerSlot::First => self.review1_date = source.review1_date,
                    ReviewerSlot::Second => self.review2_date = source.review2_date,
                    ReviewerSlot::Third => self.review3_date = source.review3_date,
                },
                EventField::Packet => self.packet.clone_from(&source.packet),
                EventField::RejectMessage => self.reject_message.clone_from(&source.reject_message),
                EventField::RescrubMessage => {
                    self.rescrub_message.clone_from(&source.rescrub_message);
                }
                EventField::NoPacket => self.no_packet.clone_from(&source.no_packet),
            }
        }
    }

    fn stamp_stage(&mut self, stage: Stage, actor: UserId, today: NaiveDate) {
        self.stamps.insert(stage, StageStamp { actor, date: today });
    }

    const fn set_review_date(&mut self, slot: ReviewerSlot, date: NaiveDate) {
        match slot {
            ReviewerSlot::First => self.review1_date = Some(date),
            ReviewerSlot::Second => self.review2_date = Some(date),
            ReviewerSlot::Third => self.review3_date = Some(date),
        }
    }
}
