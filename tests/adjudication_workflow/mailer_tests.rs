//! Packet delivery through a mocked mailer.

use super::helpers::Harness;
use adjudicator::adjudication::{
    domain::{EventStatus, PacketNotification, ReviewerSlot},
    ports::{Mailer, MailerError},
    services::ActionPayload,
};
use async_trait::async_trait;
use mockall::{Sequence, mock};
use rstest::rstest;

mock! {
    pub PacketMailer {}

    #[async_trait]
    impl Mailer for PacketMailer {
        async fn send_packet_notification(
            &self,
            notification: &PacketNotification,
        ) -> Result<(), MailerError>;
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn send_notifies_reviewers_in_slot_order() -> eyre::Result<()> {
    let mut mailer = MockPacketMailer::new();
    let mut sequence = Sequence::new();
    mailer
        .expect_send_packet_notification()
        .withf(|notice| {
            notice.slot == ReviewerSlot::First && notice.recipient == "drsmith@example.org"
        })
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(()));
    mailer
        .expect_send_packet_notification()
        .withf(|notice| {
            notice.slot == ReviewerSlot::Second
                && notice.subject.starts_with("MI event")
                && notice.download_url.contains("events/download/")
        })
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(()));
    let harness = Harness::with_mailer(mailer);
    let id = harness.assigned_event().await?;

    let outcome = harness
        .act("send", &harness.cast.admin, id, ActionPayload::Send)
        .await?;

    eyre::ensure!(outcome.status == EventStatus::Sent);
    eyre::ensure!(outcome.message == "Packets sent");
    eyre::ensure!(outcome.delivery_failures.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transport_failures_are_reported_per_reviewer() -> eyre::Result<()> {
    let mut mailer = MockPacketMailer::new();
    mailer
        .expect_send_packet_notification()
        .times(2)
        .returning(|_| Err(MailerError::Transport("connection refused".to_owned())));
    let harness = Harness::with_mailer(mailer);
    let id = harness.assigned_event().await?;

    let outcome = harness
        .act("send", &harness.cast.admin, id, ActionPayload::Send)
        .await?;

    eyre::ensure!(outcome.status == EventStatus::Sent);
    eyre::ensure!(outcome.message == "Email to drsmith and drjones failed.");
    let slots: Vec<ReviewerSlot> = outcome
        .delivery_failures
        .iter()
        .map(|failure| failure.slot)
        .collect();
    eyre::ensure!(slots == [ReviewerSlot::First, ReviewerSlot::Second]);
    Ok(())
}
