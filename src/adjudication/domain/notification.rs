//! Packet notification sent to a reviewer.

use super::{EventId, ReviewerSlot, UserId};
use serde::Serialize;

/// A rendered notification telling a reviewer a packet is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketNotification {
    /// Event the packet belongs to.
    pub event_id: EventId,
    /// Identifier shown to reviewers (event id plus the display offset).
    pub display_id: u64,
    /// Slot the recipient reviews from.
    pub slot: ReviewerSlot,
    /// Recipient user.
    pub reviewer_id: UserId,
    /// Recipient address.
    pub recipient: String,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
    /// Link to download the scrubbed packet.
    pub download_url: String,
    /// Link to the review form.
    pub review_url: String,
}
