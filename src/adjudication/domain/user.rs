//! Users as seen by the adjudication core.
//!
//! Authentication happens elsewhere; the core only needs identity, site
//! and role flags to evaluate authorization predicates.

use super::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role flag held by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Coordinating-centre administrator.
    Admin,
    /// Site staff uploading packets.
    Uploader,
    /// Clinician eligible for first-round review.
    Reviewer,
    /// Clinician eligible for arbitration.
    ThirdReviewer,
}

/// An authenticated actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    username: String,
    email: String,
    site: Option<String>,
    roles: BTreeSet<Role>,
}

impl User {
    /// Creates a user with no roles and no site.
    #[must_use]
    pub fn new(id: UserId, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            site: None,
            roles: BTreeSet::new(),
        }
    }

    /// Sets the user's site.
    #[must_use]
    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    /// Grants a role.
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    /// Returns the user identifier.
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// Returns the login name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the notification address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the user's site, if any.
    #[must_use]
    pub fn site(&self) -> Option<&str> {
        self.site.as_deref()
    }

    /// Returns `true` if the user holds `role`.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Label used in reviewer pick lists, e.g. `drsmith (12)`.
    #[must_use]
    pub fn display_label(&self) -> String {
        format!("{} ({})", self.username, self.id)
    }
}
