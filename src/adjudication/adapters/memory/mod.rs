//! In-memory adapter implementations.
//!
//! These adapters provide simple, thread-safe implementations suitable for
//! tests and for embedding the workflow without a database.

mod derived;
mod directory;
mod event;
mod mailer;
mod review;

pub use derived::InMemoryDerivedDataRepository;
pub use directory::InMemoryDirectory;
pub use event::InMemoryEventRepository;
pub use mailer::RecordingMailer;
pub use review::InMemoryReviewStore;
