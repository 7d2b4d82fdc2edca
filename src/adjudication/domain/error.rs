//! Error types for adjudication domain validation and parsing.

use super::{EventAction, EventId, EventStatus, UserId};
use thiserror::Error;

/// Errors returned while constructing or mutating adjudication domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdjudicationDomainError {
    /// An identifier was zero.
    #[error("invalid {kind} identifier {value}, expected a positive integer")]
    InvalidIdentifier {
        /// Identifier kind (`event`, `user`, `patient`).
        kind: &'static str,
        /// Rejected value.
        value: u64,
    },

    /// The action is not legal from the event's current status.
    #[error("{action} cannot be performed on event {event_id} in status {status}")]
    ActionNotAllowed {
        /// Event being acted upon.
        event_id: EventId,
        /// Attempted action.
        action: EventAction,
        /// Status observed when the action was attempted.
        status: EventStatus,
    },

    /// The reviewer already holds a review slot on the event.
    #[error("user {reviewer_id} is already a reviewer for event {event_id}")]
    ReviewerConflict {
        /// Event being assigned.
        event_id: EventId,
        /// Reviewer that was rejected.
        reviewer_id: UserId,
    },

    /// Submitted data failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Validation failures for submitted forms, carrying the user-facing message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Site or site patient identifier missing on intake.
    #[error("Missing patient identifiers")]
    MissingPatientData,
    /// Event date missing on intake.
    #[error("Missing event date")]
    MissingEventDate,
    /// Event date precedes 1970-01-01.
    #[error("Event date too early")]
    EventDateTooEarly,
    /// A criteria value looks like a criteria name (columns swapped).
    #[error("Bad format for criteria")]
    CriteriaProblem,
    /// No patient matches the site identifiers.
    #[error("No patient found with id {site_patient_id} at site {site}")]
    PatientNotFound {
        /// Site-local patient identifier.
        site_patient_id: String,
        /// Site name.
        site: String,
    },
    /// Screening disposition was missing or unrecognised.
    #[error("You must either Accept, Reject, or return for Rescrubbing")]
    BadScreenDisposition,
    /// A re-upload was attempted without confirmation.
    #[error("You must select the confirm checkbox to re-upload")]
    ReuploadNotConfirmed,
    /// Upload carried no original file name.
    #[error("Upload failed.")]
    UploadMissingFile,
    /// No-packet marking without a reason.
    #[error("No packet reason cannot be blank.")]
    NoPacketReasonBlank,
    /// Outside-hospital reason without the two-attempts flag.
    #[error("2 attempts field cannot be blank.")]
    TwoAttemptsBlank,
    /// Prior-event reason without the date-known flag.
    #[error("Prior event date known field cannot be blank.")]
    PriorEventDateKnownBlank,
    /// Prior-event reason without the onsite flag.
    #[error("Prior event onsite field cannot be blank.")]
    PriorEventOnsiteBlank,
    /// No reviewer chosen for an assignment.
    #[error("You must choose a reviewer")]
    NoReviewer,
    /// The chosen user is not in the eligible reviewer pool.
    #[error("User {0} is not a reviewer")]
    NotAReviewer(UserId),
    /// Reviewer-slot action submitted without a clinical review.
    #[error("Myocardial infarction field cannot be blank.")]
    MciBlank,
    /// No diagnostic criteria ticked.
    #[error("No criteria identified.")]
    NoCriteria,
    /// Abnormal cardiac enzymes ticked without enzyme criteria.
    #[error("No cardiac enzyme criteria selected.")]
    NoCeCriteria,
    /// Cardiac intervention question unanswered.
    #[error("Cardiac intervention field cannot be blank.")]
    CiBlank,
    /// Primary/secondary question unanswered.
    #[error("Primary/Secondary field cannot be blank.")]
    TypeBlank,
    /// Secondary event without a cause.
    #[error("Secondary cause cannot be blank.")]
    SecondaryCauseBlank,
    /// "Other" chosen without describing the cause.
    #[error("Other cause cannot be blank.")]
    OtherCauseBlank,
    /// False positive flagged without a reason.
    #[error("False positive reason cannot be blank.")]
    FalsePositiveReasonBlank,
    /// False positive "Other" reason without a description.
    #[error("False positive Other cause cannot be blank.")]
    FalsePositiveOtherCauseBlank,
    /// Current tobacco use unanswered.
    #[error("Current tobacco use cannot be blank.")]
    CurrentTobaccoUseBlank,
    /// Past tobacco use unanswered for a non-current smoker.
    #[error("Past tobacco use cannot be blank.")]
    PastTobaccoUseBlank,
    /// Cocaine use unanswered.
    #[error("Cocaine use cannot be blank.")]
    CocaineUseBlank,
    /// Family history unanswered.
    #[error("Family history cannot be blank.")]
    FamilyHistoryBlank,
    /// Cardiac intervention without its type.
    #[error("CI type cannot be blank.")]
    CiTypeBlank,
    /// ECG based type unanswered.
    #[error("ECG based type cannot be blank.")]
    EcgTypeBlank,
    /// Cardiac catheterisation unanswered.
    #[error("Cardiac cath cannot be blank.")]
    CardiacCathBlank,
    /// A labelled field carried a value outside its closed set.
    #[error("invalid value '{value}' for {field}")]
    UnknownValue {
        /// Field name.
        field: &'static str,
        /// Rejected value.
        value: String,
    },
    /// The payload does not belong to the requested action.
    #[error("payload does not match action {0}")]
    PayloadMismatch(EventAction),
}

/// Error returned while parsing event statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown event status: {0}")]
pub struct ParseEventStatusError(pub String);

/// Error returned while parsing an action name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown event action: {0}")]
pub struct ParseEventActionError(pub String);
