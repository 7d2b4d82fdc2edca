//! Identifier types for the adjudication domain.

use super::AdjudicationDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of an adjudicated event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u64);

impl EventId {
    /// Creates a validated event identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AdjudicationDomainError::InvalidIdentifier`] when the value
    /// is zero.
    pub const fn new(value: u64) -> Result<Self, AdjudicationDomainError> {
        if value == 0 {
            return Err(AdjudicationDomainError::InvalidIdentifier {
                kind: "event",
                value,
            });
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = AdjudicationDomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = value
            .trim()
            .parse::<u64>()
            .map_err(|_| AdjudicationDomainError::InvalidIdentifier {
                kind: "event",
                value: 0,
            })?;
        Self::new(parsed)
    }
}

/// Identifier of a system user (administrator, uploader or reviewer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Creates a validated user identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AdjudicationDomainError::InvalidIdentifier`] when the value
    /// is zero.
    pub const fn new(value: u64) -> Result<Self, AdjudicationDomainError> {
        if value == 0 {
            return Err(AdjudicationDomainError::InvalidIdentifier {
                kind: "user",
                value,
            });
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a patient record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(u64);

impl PatientId {
    /// Creates a validated patient identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AdjudicationDomainError::InvalidIdentifier`] when the value
    /// is zero.
    pub const fn new(value: u64) -> Result<Self, AdjudicationDomainError> {
        if value == 0 {
            return Err(AdjudicationDomainError::InvalidIdentifier {
                kind: "patient",
                value,
            });
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a stored review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(Uuid);

impl ReviewId {
    /// Creates a new random review identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ReviewId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an adjudicated outcome record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DerivedDataId(Uuid);

impl DerivedDataId {
    /// Creates a new random record identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for DerivedDataId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DerivedDataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
