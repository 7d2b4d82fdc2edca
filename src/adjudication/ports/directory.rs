//! User and patient lookup port.

use crate::adjudication::domain::{Patient, User, UserId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for directory lookups.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Pool of users eligible for a kind of review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewerPool {
    /// First-round reviewers.
    Reviewers,
    /// Arbitrating reviewers.
    ThirdReviewers,
}

impl ReviewerPool {
    /// Returns the pool used for an assignment.
    #[must_use]
    pub const fn for_assignment(third_review: bool) -> Self {
        if third_review {
            Self::ThirdReviewers
        } else {
            Self::Reviewers
        }
    }
}

/// Directory lookup contract.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Finds a user by identifier.
    async fn find_user(&self, id: UserId) -> DirectoryResult<Option<User>>;

    /// Returns the users in `pool`, ordered by identifier.
    async fn reviewer_pool(&self, pool: ReviewerPool) -> DirectoryResult<Vec<User>>;

    /// Finds a patient by site and site-local identifier.
    async fn find_patient(
        &self,
        site: &str,
        site_patient_id: &str,
    ) -> DirectoryResult<Option<Patient>>;
}

/// Errors returned by directory implementations.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// Lookup backend failure.
    #[error("directory error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl DirectoryError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}
