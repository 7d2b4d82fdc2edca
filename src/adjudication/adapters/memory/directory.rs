//! In-memory user and patient directory.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::adjudication::{
    domain::{Patient, Role, User, UserId},
    ports::{Directory, DirectoryError, DirectoryResult, ReviewerPool},
};

/// Thread-safe in-memory directory.
///
/// Reviewer pools are derived from role flags: [`Role::Reviewer`] for
/// first-round review and [`Role::ThirdReviewer`] for arbitration.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    users: BTreeMap<UserId, User>,
    patients: Vec<Patient>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Backend`] when the lock is poisoned.
    pub fn add_user(&self, user: User) -> DirectoryResult<()> {
        let mut state = self.state.write().map_err(Self::poisoned)?;
        state.users.insert(user.id(), user);
        Ok(())
    }

    /// Adds a patient.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Backend`] when the lock is poisoned.
    pub fn add_patient(&self, patient: Patient) -> DirectoryResult<()> {
        let mut state = self.state.write().map_err(Self::poisoned)?;
        state.patients.push(patient);
        Ok(())
    }

    fn poisoned(err: impl std::fmt::Display) -> DirectoryError {
        DirectoryError::backend(std::io::Error::other(err.to_string()))
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn find_user(&self, id: UserId) -> DirectoryResult<Option<User>> {
        let state = self.state.read().map_err(Self::poisoned)?;
        Ok(state.users.get(&id).cloned())
    }

    async fn reviewer_pool(&self, pool: ReviewerPool) -> DirectoryResult<Vec<User>> {
        let role = match pool {
            ReviewerPool::Reviewers => Role::Reviewer,
            ReviewerPool::ThirdReviewers => Role::ThirdReviewer,
        };
        let state = self.state.read().map_err(Self::poisoned)?;
        Ok(state
            .users
            .values()
            .filter(|user| user.has_role(role))
            .cloned()
            .collect())
    }

    async fn find_patient(
        &self,
        site: &str,
        site_patient_id: &str,
    ) -> DirectoryResult<Option<Patient>> {
        let state = self.state.read().map_err(Self::poisoned)?;
        Ok(state
            .patients
            .iter()
            .find(|patient| patient.site() == site && patient.site_patient_id() == site_patient_id)
            .cloned())
    }
}
