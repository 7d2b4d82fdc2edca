//! Mail delivery port for packet notifications.

use crate::adjudication::domain::PacketNotification;
use async_trait::async_trait;
use thiserror::Error;

/// Mail transport contract.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers a packet notification.
    ///
    /// # Errors
    ///
    /// Returns [`MailerError`] when the transport refuses or fails to send.
    async fn send_packet_notification(
        &self,
        notification: &PacketNotification,
    ) -> Result<(), MailerError>;
}

/// Delivery failures reported by mail transports.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MailerError {
    /// The recipient address was rejected.
    #[error("recipient rejected: {0}")]
    RecipientRejected(String),

    /// The transport failed.
    #[error("mail transport failed: {0}")]
    Transport(String),
}
