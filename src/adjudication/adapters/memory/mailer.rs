//! Recording mailer for tests and dry runs.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::adjudication::{
    domain::PacketNotification,
    ports::{Mailer, MailerError},
};

/// Mailer that records notifications instead of sending them.
///
/// Addresses registered with [`RecordingMailer::reject`] fail delivery.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    state: Arc<RwLock<MailerState>>,
}

#[derive(Debug, Default)]
struct MailerState {
    sent: Vec<PacketNotification>,
    rejected: HashSet<String>,
}

impl RecordingMailer {
    /// Creates a mailer that accepts every address.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes delivery to `address` fail.
    pub fn reject(&self, address: impl Into<String>) {
        if let Ok(mut state) = self.state.write() {
            state.rejected.insert(address.into());
        }
    }

    /// Returns the notifications delivered so far.
    #[must_use]
    pub fn sent(&self) -> Vec<PacketNotification> {
        self.state
            .read()
            .map(|guard| guard.sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_packet_notification(
        &self,
        notification: &PacketNotification,
    ) -> Result<(), MailerError> {
        let mut state = self
            .state
            .write()
            .map_err(|err| MailerError::Transport(err.to_string()))?;
        if state.rejected.contains(&notification.recipient) {
            return Err(MailerError::RecipientRejected(
                notification.recipient.clone(),
            ));
        }
        state.sent.push(notification.clone());
        Ok(())
    }
}
