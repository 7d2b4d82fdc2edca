//! Packet file metadata and storage naming.
//!
//! File contents live in external storage; the event only records the
//! random file number shared by the raw and scrubbed copies and the name
//! the uploader's file originally had.

use super::{EventId, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which copy of the packet a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketKind {
    /// Packet as uploaded by the site.
    Raw,
    /// Packet after identifying details were removed.
    Scrubbed,
}

impl PacketKind {
    /// Returns the storage file-name prefix.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Raw => "orig",
            Self::Scrubbed => "clean",
        }
    }
}

/// Packet file metadata recorded on the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketFile {
    /// Random number making the stored name unguessable.
    pub file_number: u32,
    /// File name as uploaded.
    pub original_name: String,
}

impl PacketFile {
    /// Creates metadata with a fresh random file number.
    #[must_use]
    pub fn generate(original_name: impl Into<String>) -> Self {
        let masked = Uuid::new_v4().as_u128() & 0x7fff_ffff;
        Self {
            file_number: u32::try_from(masked).unwrap_or_default(),
            original_name: original_name.into(),
        }
    }

    /// Returns the base storage name, e.g. `orig_12_48213`.
    #[must_use]
    pub fn storage_name(&self, kind: PacketKind, event_id: EventId) -> String {
        format!("{}_{}_{}", kind.prefix(), event_id, self.file_number)
    }
}

/// Upload request for the raw packet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketUpload {
    /// File name as uploaded.
    pub original_name: Option<String>,
    /// Uploader confirmed replacing an existing packet.
    pub confirm_reupload: bool,
}

impl PacketUpload {
    /// Validates the upload and assigns a file number.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UploadMissingFile`] when no file name was
    /// supplied.
    pub fn into_packet_file(self) -> Result<(PacketFile, bool), ValidationError> {
        let name = self
            .original_name
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .ok_or(ValidationError::UploadMissingFile)?;
        Ok((PacketFile::generate(name), self.confirm_reupload))
    }
}
