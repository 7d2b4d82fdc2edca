//! Named workflow actions and the static status table.
//!
//! Every status-changing action declares the statuses it may start from,
//! the authorization predicate an actor must satisfy, and the status it
//! produces. The table is a set of `static` values; nothing about it is
//! mutable at runtime.

use super::{Event, EventStatus, ParseEventActionError, Role, Stage, User};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A status-changing action on an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventAction {
    /// Record a new event at intake.
    #[serde(rename = "add")]
    Add,
    /// Upload the raw packet.
    #[serde(rename = "upload")]
    Upload,
    /// Report that no packet is available.
    #[serde(rename = "markNoPacket")]
    MarkNoPacket,
    /// Upload the scrubbed packet.
    #[serde(rename = "scrub")]
    Scrub,
    /// Quality-screen the scrubbed packet.
    #[serde(rename = "screen")]
    Screen,
    /// Assign a first-round reviewer.
    #[serde(rename = "assign")]
    Assign,
    /// Send packets to both first-round reviewers.
    #[serde(rename = "send")]
    Send,
    /// Submit the first reviewer's review.
    #[serde(rename = "review1")]
    Review1,
    /// Submit the second reviewer's review.
    #[serde(rename = "review2")]
    Review2,
    /// Assign the arbitrating reviewer.
    #[serde(rename = "assign3rd")]
    Assign3rd,
    /// Submit the arbitrating review.
    #[serde(rename = "review3")]
    Review3,
}

impl EventAction {
    /// Every action, in workflow order.
    pub const ALL: [Self; 11] = [
        Self::Add,
        Self::Upload,
        Self::MarkNoPacket,
        Self::Scrub,
        Self::Screen,
        Self::Assign,
        Self::Send,
        Self::Review1,
        Self::Review2,
        Self::Assign3rd,
        Self::Review3,
    ];

    /// Returns the canonical action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Upload => "upload",
            Self::MarkNoPacket => "markNoPacket",
            Self::Scrub => "scrub",
            Self::Screen => "screen",
            Self::Assign => "assign",
            Self::Send => "send",
            Self::Review1 => "review1",
            Self::Review2 => "review2",
            Self::Assign3rd => "assign3rd",
            Self::Review3 => "review3",
        }
    }

    /// Returns the status-table rule for this action.
    #[must_use]
    pub fn rule(self) -> &'static ActionRule {
        match self {
            Self::Add => &ADD,
            Self::Upload => &UPLOAD,
            Self::MarkNoPacket => &MARK_NO_PACKET,
            Self::Scrub => &SCRUB,
            Self::Screen => &SCREEN,
            Self::Assign => &ASSIGN,
            Self::Send => &SEND,
            Self::Review1 => &REVIEW1,
            Self::Review2 => &REVIEW2,
            Self::Assign3rd => &ASSIGN3RD,
            Self::Review3 => &REVIEW3,
        }
    }

    /// Returns the reviewer slot submitting a review, for review actions.
    #[must_use]
    pub const fn review_slot(self) -> Option<ReviewerSlot> {
        match self {
            Self::Review1 => Some(ReviewerSlot::First),
            Self::Review2 => Some(ReviewerSlot::Second),
            Self::Review3 => Some(ReviewerSlot::Third),
            _ => None,
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for EventAction {
    type Error = ParseEventActionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == value)
            .ok_or_else(|| ParseEventActionError(value.to_owned()))
    }
}

/// One of the three reviewer positions on an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerSlot {
    /// First-round reviewer 1.
    First,
    /// First-round reviewer 2.
    Second,
    /// Arbitrating reviewer.
    Third,
}

impl ReviewerSlot {
    /// Returns the 1-based slot number used in URLs and messages.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
        }
    }

    /// Returns the review action submitted from this slot.
    #[must_use]
    pub const fn review_action(self) -> EventAction {
        match self {
            Self::First => EventAction::Review1,
            Self::Second => EventAction::Review2,
            Self::Third => EventAction::Review3,
        }
    }

    /// Status recorded when this first-round reviewer finishes first.
    ///
    /// Returns `None` for the arbitrating slot.
    #[must_use]
    pub const fn done_status(self) -> Option<EventStatus> {
        match self {
            Self::First => Some(EventStatus::Reviewer1Done),
            Self::Second => Some(EventStatus::Reviewer2Done),
            Self::Third => None,
        }
    }
}

impl fmt::Display for ReviewerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Authorization predicate attached to an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    /// The actor must hold a role.
    Role(Role),
    /// The actor must be an uploader at the event's site.
    SameSiteUploader,
    /// The actor must be a reviewer occupying the given slot on the event.
    ReviewerSlot(ReviewerSlot),
}

impl Authorization {
    /// Evaluates the predicate for `user` against `event`.
    #[must_use]
    pub fn permits(self, user: &User, event: Option<&Event>) -> bool {
        match self {
            Self::Role(role) => user.has_role(role),
            Self::SameSiteUploader => {
                user.has_role(Role::Uploader)
                    && event.is_some_and(|item| user.site() == Some(item.site()))
            }
            Self::ReviewerSlot(slot) => {
                user.has_role(Role::Reviewer)
                    && event.is_some_and(|item| item.reviewer(slot) == Some(user.id()))
            }
        }
    }
}

/// Statuses an action may start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatuses {
    /// Creation action: legal only when no event exists yet.
    Creation,
    /// Legal from any of the listed statuses.
    From(&'static [EventStatus]),
}

/// Status an action leaves the event in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionResult {
    /// Always this status.
    Status(EventStatus),
    /// Depends on submitted data or on the event's reviewer slots.
    Derived,
}

/// A row of the status table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRule {
    /// The action this rule governs.
    pub action: EventAction,
    /// Role tag naming the actor/date fields stamped by the action.
    pub role_tag: &'static str,
    /// Stage stamped with actor and date, if any.
    pub stage: Option<Stage>,
    /// Legal source statuses.
    pub sources: SourceStatuses,
    /// Authorization predicate.
    pub authorization: Authorization,
    /// Resulting status.
    pub result: ActionResult,
}

impl ActionRule {
    /// Returns `true` for the creation action.
    #[must_use]
    pub const fn is_creation(&self) -> bool {
        matches!(self.sources, SourceStatuses::Creation)
    }

    /// Returns `true` if the action may start from `status`.
    #[must_use]
    pub fn allows_source(&self, status: EventStatus) -> bool {
        match self.sources {
            SourceStatuses::Creation => false,
            SourceStatuses::From(statuses) => statuses.contains(&status),
        }
    }
}

static ADD: ActionRule = ActionRule {
    action: EventAction::Add,
    role_tag: "creator",
    stage: Some(Stage::Creation),
    sources: SourceStatuses::Creation,
    authorization: Authorization::Role(Role::Admin),
    result: ActionResult::Status(EventStatus::Created),
};

static UPLOAD: ActionRule = ActionRule {
    action: EventAction::Upload,
    role_tag: "uploader",
    stage: Some(Stage::Upload),
    sources: SourceStatuses::From(&[EventStatus::Created, EventStatus::Uploaded]),
    authorization: Authorization::SameSiteUploader,
    result: ActionResult::Status(EventStatus::Uploaded),
};

static MARK_NO_PACKET: ActionRule = ActionRule {
    action: EventAction::MarkNoPacket,
    role_tag: "marker",
    stage: Some(Stage::NoPacket),
    sources: SourceStatuses::From(&[EventStatus::Created, EventStatus::Uploaded]),
    authorization: Authorization::SameSiteUploader,
    result: ActionResult::Status(EventStatus::NoPacketAvailable),
};

static SCRUB: ActionRule = ActionRule {
    action: EventAction::Scrub,
    role_tag: "scrubber",
    stage: Some(Stage::Scrub),
    sources: SourceStatuses::From(&[EventStatus::Uploaded, EventStatus::Scrubbed]),
    authorization: Authorization::Role(Role::Admin),
    result: ActionResult::Status(EventStatus::Scrubbed),
};

static SCREEN: ActionRule = ActionRule {
    action: EventAction::Screen,
    role_tag: "screener",
    stage: Some(Stage::Screen),
    sources: SourceStatuses::From(&[EventStatus::Scrubbed]),
    authorization: Authorization::Role(Role::Admin),
    result: ActionResult::Derived,
};

static ASSIGN: ActionRule = ActionRule {
    action: EventAction::Assign,
    role_tag: "assigner",
    stage: Some(Stage::Assign),
    sources: SourceStatuses::From(&[EventStatus::Screened]),
    authorization: Authorization::Role(Role::Admin),
    result: ActionResult::Derived,
};

static SEND: ActionRule = ActionRule {
    action: EventAction::Send,
    role_tag: "sender",
    stage: Some(Stage::Send),
    sources: SourceStatuses::From(&[EventStatus::Assigned]),
    authorization: Authorization::Role(Role::Admin),
    result: ActionResult::Status(EventStatus::Sent),
};

static REVIEW1: ActionRule = ActionRule {
    action: EventAction::Review1,
    role_tag: "reviewer1",
    stage: None,
    sources: SourceStatuses::From(&[EventStatus::Sent, EventStatus::Reviewer2Done]),
    authorization: Authorization::ReviewerSlot(ReviewerSlot::First),
    result: ActionResult::Derived,
};

static REVIEW2: ActionRule = ActionRule {
    action: EventAction::Review2,
    role_tag: "reviewer2",
    stage: None,
    sources: SourceStatuses::From(&[EventStatus::Sent, EventStatus::Reviewer1Done]),
    authorization: Authorization::ReviewerSlot(ReviewerSlot::Second),
    result: ActionResult::Derived,
};

static ASSIGN3RD: ActionRule = ActionRule {
    action: EventAction::Assign3rd,
    role_tag: "assigner3rd",
    stage: Some(Stage::ThirdAssign),
    sources: SourceStatuses::From(&[EventStatus::ThirdReviewNeeded]),
    authorization: Authorization::Role(Role::Admin),
    result: ActionResult::Status(EventStatus::ThirdReviewAssigned),
};

static REVIEW3: ActionRule = ActionRule {
    action: EventAction::Review3,
    role_tag: "reviewer3",
    stage: None,
    sources: SourceStatuses::From(&[EventStatus::ThirdReviewAssigned]),
    authorization: Authorization::ReviewerSlot(ReviewerSlot::Third),
    result: ActionResult::Status(EventStatus::Done),
};

static RULES: [&ActionRule; 11] = [
    &ADD,
    &UPLOAD,
    &MARK_NO_PACKET,
    &SCRUB,
    &SCREEN,
    &ASSIGN,
    &SEND,
    &REVIEW1,
    &REVIEW2,
    &ASSIGN3RD,
    &REVIEW3,
];

/// Read-only registry of statuses and action rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusTable;

impl StatusTable {
    /// Returns every valid status.
    #[must_use]
    pub const fn statuses() -> &'static [EventStatus] {
        &EventStatus::ALL
    }

    /// Returns every action rule, in workflow order.
    #[must_use]
    pub fn rules() -> &'static [&'static ActionRule] {
        &RULES
    }

    /// Looks up a rule by action name.
    #[must_use]
    pub fn lookup(name: &str) -> Option<&'static ActionRule> {
        EventAction::try_from(name).ok().map(EventAction::rule)
    }

    /// Returns `true` if `user` passes the action's authorization predicate.
    ///
    /// Independent of the event's current status.
    #[must_use]
    pub fn can_perform_action(action: EventAction, user: &User, event: Option<&Event>) -> bool {
        action.rule().authorization.permits(user, event)
    }

    /// Returns `true` if the action is legal for the event's current status.
    ///
    /// With no event only the creation action is legal.
    #[must_use]
    pub fn can_be_performed(action: EventAction, event: Option<&Event>) -> bool {
        let rule = action.rule();
        event.map_or_else(
            || rule.is_creation(),
            |item| rule.allows_source(item.status()),
        )
    }

    /// Returns `true` if both predicates hold.
    #[must_use]
    pub fn permits(action: EventAction, user: &User, event: Option<&Event>) -> bool {
        Self::can_be_performed(action, event) && Self::can_perform_action(action, user, event)
    }

    /// Lists the actions `user` could perform on `event` right now.
    #[must_use]
    pub fn available_actions(user: &User, event: &Event) -> Vec<EventAction> {
        EventAction::ALL
            .into_iter()
            .filter(|action| Self::permits(*action, user, Some(event)))
            .collect()
    }

    /// Returns the first review slot `user` may submit for `event`, if any.
    #[must_use]
    pub fn review_slot_for(user: &User, event: &Event) -> Option<ReviewerSlot> {
        [ReviewerSlot::First, ReviewerSlot::Second, ReviewerSlot::Third]
            .into_iter()
            .find(|slot| Self::permits(slot.review_action(), user, Some(event)))
    }
}
