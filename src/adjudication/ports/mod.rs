//! Port contracts for event adjudication.
//!
//! Ports define infrastructure-agnostic interfaces used by adjudication
//! services: event, review and outcome persistence, mail delivery, and
//! user/patient lookup.

pub mod derived_data;
pub mod directory;
pub mod event_repository;
pub mod mailer;
pub mod review_store;

pub use derived_data::{DerivedDataError, DerivedDataRepository, DerivedDataResult};
pub use directory::{Directory, DirectoryError, DirectoryResult, ReviewerPool};
pub use event_repository::{EventRepository, EventRepositoryError, EventRepositoryResult};
pub use mailer::{Mailer, MailerError};
pub use review_store::{ReviewStore, ReviewStoreError, ReviewStoreResult};
