//! Application services for event adjudication.

pub mod assignment;
pub mod consensus;
pub mod notification;
pub mod queues;
pub mod workflow;

pub use assignment::{
    AssignmentCoordinator, AssignmentReport, BatchError, BatchResult, EventIdList, SendReport,
};
pub use consensus::{
    ConsensusEngine, ConsensusError, ConsensusOutcome, ConsensusResult, resolve_majority,
    resolve_pair,
};
pub use notification::{NotificationComposer, NotificationError};
pub use queues::WorkQueues;
pub use workflow::{
    ActionOutcome, ActionPayload, AdjudicationWorkflow, DeliveryFailure, WorkflowError,
    WorkflowResult, send_summary,
};
