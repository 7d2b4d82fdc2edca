//! Packet notification composition.

use crate::adjudication::{
    config::AdjudicationConfig,
    domain::{Event, PacketNotification, ReviewerSlot, User},
};
use minijinja::Environment;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while composing a notification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotificationError {
    /// A configured template failed to render.
    #[error("failed to render notification {part}: {message}")]
    TemplateRender {
        /// `subject` or `body`.
        part: &'static str,
        /// Renderer message.
        message: String,
    },
}

/// Renders packet notifications from the configured templates.
#[derive(Debug, Clone)]
pub struct NotificationComposer {
    config: Arc<AdjudicationConfig>,
}

impl NotificationComposer {
    /// Creates a composer.
    #[must_use]
    pub const fn new(config: Arc<AdjudicationConfig>) -> Self {
        Self { config }
    }

    /// Returns the configuration in use.
    #[must_use]
    pub fn config(&self) -> &AdjudicationConfig {
        &self.config
    }

    /// Composes the notification telling `reviewer` the packet is ready.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::TemplateRender`] when a template is
    /// malformed.
    pub fn compose(
        &self,
        event: &Event,
        slot: ReviewerSlot,
        reviewer: &User,
    ) -> Result<PacketNotification, NotificationError> {
        let display_id = self.config.display_id(event.id());
        let download_url = self.config.download_url(event.id());
        let review_url = self.config.review_url(event.id(), slot);
        let context = json!({
            "project_name": self.config.project_name,
            "display_id": display_id,
            "event_id": event.id().value(),
            "slot": slot.number(),
            "reviewer_name": reviewer.username(),
            "download_url": download_url,
            "review_url": review_url,
        });

        let environment = Environment::new();
        let render = |part: &'static str, template: &str| {
            environment
                .render_str(template, &context)
                .map_err(|error| NotificationError::TemplateRender {
                    part,
                    message: error.to_string(),
                })
        };

        Ok(PacketNotification {
            event_id: event.id(),
            display_id,
            slot,
            reviewer_id: reviewer.id(),
            recipient: reviewer.email().to_owned(),
            subject: render("subject", &self.config.notification_subject)?,
            body: render("body", &self.config.notification_body)?,
            download_url,
            review_url,
        })
    }
}
