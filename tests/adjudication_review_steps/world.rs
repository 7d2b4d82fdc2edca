//! Shared world state for adjudication review BDD scenarios.

use std::collections::BTreeMap;
use std::sync::Arc;

use adjudicator::adjudication::{
    adapters::memory::{
        InMemoryDerivedDataRepository, InMemoryDirectory, InMemoryEventRepository,
        InMemoryReviewStore, RecordingMailer,
    },
    config::AdjudicationConfig,
    domain::{
        CeCriteria, EcgType, EventId, EventType, Mci, Patient, PatientId, ReviewSubmission, Role,
        User, UserId,
    },
    services::{
        ActionOutcome, AdjudicationWorkflow, AssignmentCoordinator, NotificationComposer,
        WorkflowResult,
    },
};
use mockable::DefaultClock;
use rstest::fixture;

/// Workflow type used by the BDD world.
pub type TestWorkflow = AdjudicationWorkflow<
    InMemoryEventRepository,
    InMemoryReviewStore,
    InMemoryDerivedDataRepository,
    InMemoryDirectory,
    RecordingMailer,
    DefaultClock,
>;

/// Scenario world for adjudication behaviour tests.
pub struct AdjudicationWorld {
    pub workflow: Arc<TestWorkflow>,
    pub coordinator: AssignmentCoordinator<
        InMemoryEventRepository,
        InMemoryReviewStore,
        InMemoryDerivedDataRepository,
        InMemoryDirectory,
        RecordingMailer,
        DefaultClock,
    >,
    pub events: Arc<InMemoryEventRepository>,
    pub derived: Arc<InMemoryDerivedDataRepository>,
    pub admin: User,
    pub users: BTreeMap<String, User>,
    pub event_id: Option<EventId>,
    pub last_result: Option<WorkflowResult<ActionOutcome>>,
}

impl AdjudicationWorld {
    /// Creates a world with a coordinator, an uploader, four reviewers and
    /// one patient.
    #[must_use]
    pub fn new() -> Self {
        let events = Arc::new(InMemoryEventRepository::new());
        let derived = Arc::new(InMemoryDerivedDataRepository::new());
        let directory = Arc::new(InMemoryDirectory::new());
        let user = |id: u64, name: &str| {
            User::new(
                UserId::new(id).expect("non-zero user id"),
                name,
                format!("{name}@example.org"),
            )
        };
        let admin = user(1, "coordinator").with_role(Role::Admin);
        let people = [
            user(5, "uwstaff").with_role(Role::Uploader).with_site("UW"),
            user(2, "drsmith").with_role(Role::Reviewer),
            user(3, "drjones").with_role(Role::Reviewer),
            user(4, "drlee")
                .with_role(Role::Reviewer)
                .with_role(Role::ThirdReviewer),
        ];
        directory.add_user(admin.clone()).expect("seed admin");
        let mut users = BTreeMap::new();
        for person in people {
            directory.add_user(person.clone()).expect("seed user");
            users.insert(person.username().to_owned(), person);
        }
        directory
            .add_patient(Patient::new(
                PatientId::new(7).expect("non-zero patient id"),
                "UW",
                "uw-0042",
            ))
            .expect("seed patient");

        let workflow = Arc::new(AdjudicationWorkflow::new(
            Arc::clone(&events),
            Arc::new(InMemoryReviewStore::new()),
            Arc::clone(&derived),
            directory,
            Arc::new(RecordingMailer::new()),
            NotificationComposer::new(Arc::new(AdjudicationConfig::default())),
            Arc::new(DefaultClock),
        ));

        Self {
            coordinator: AssignmentCoordinator::new(Arc::clone(&workflow)),
            workflow,
            events,
            derived,
            admin,
            users,
            event_id: None,
            last_result: None,
        }
    }

    /// Looks up a seeded user by name.
    ///
    /// # Errors
    ///
    /// Returns an error when no user has that name.
    pub fn user(&self, name: &str) -> Result<User, eyre::Report> {
        self.users
            .get(name)
            .cloned()
            .ok_or_else(|| eyre::eyre!("unknown user {name} in scenario"))
    }

    /// Returns the scenario's event.
    ///
    /// # Errors
    ///
    /// Returns an error before the event has been created.
    pub fn event_id(&self) -> Result<EventId, eyre::Report> {
        self.event_id
            .ok_or_else(|| eyre::eyre!("missing event in scenario world"))
    }
}

impl Default for AdjudicationWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> AdjudicationWorld {
    AdjudicationWorld::default()
}

/// A complete positive review with the given determination.
#[must_use]
pub fn positive_review(mci: Mci) -> ReviewSubmission {
    ReviewSubmission {
        mci: Some(mci),
        abnormal_ce_values_flag: true,
        ce_criteria: Some(CeCriteria::Standard),
        chest_pain_flag: true,
        event_type: Some(EventType::Primary),
        ecg_type: Some(EcgType::NonStemi),
        current_tobacco_use_flag: Some(true),
        cocaine_use_flag: Some(false),
        family_history_flag: Some(false),
        cardiac_cath: Some(false),
        ..ReviewSubmission::default()
    }
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
