//! Batch reviewer assignment and packet delivery.

use super::helpers::{Harness, harness};
use adjudicator::adjudication::{
    domain::{Event, EventAction, EventId, EventStatus, ReviewerSlot, UserId},
    ports::EventRepository,
    services::BatchError,
};
use rstest::rstest;

async fn status_of(harness: &Harness, id: EventId) -> eyre::Result<EventStatus> {
    harness
        .events
        .find_by_id(id)
        .await?
        .map(|event| event.status())
        .ok_or_else(|| eyre::eyre!("event {id} missing"))
}

async fn snapshot(harness: &Harness, ids: &[EventId]) -> eyre::Result<Vec<Option<Event>>> {
    let mut events = Vec::new();
    for id in ids {
        events.push(harness.events.find_by_id(*id).await?);
    }
    Ok(events)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn two_batches_fill_both_reviewer_slots(harness: Harness) -> eyre::Result<()> {
    let first = harness.screened_event().await?;
    let second = harness.screened_event().await?;
    let admin = &harness.cast.admin;

    let round_one = harness
        .coordinator
        .assign_all(&[first, second], Some(harness.cast.smith.id()), admin, false)
        .await?;
    eyre::ensure!(round_one.assigned.ids() == [first, second]);
    eyre::ensure!(status_of(&harness, first).await? == EventStatus::Screened);

    let round_two = harness
        .coordinator
        .assign_all(&[first, second], Some(harness.cast.jones.id()), admin, false)
        .await?;
    eyre::ensure!(round_two.summary() == "2 event(s) assigned.");
    eyre::ensure!(status_of(&harness, second).await? == EventStatus::Assigned);
    let event = harness
        .events
        .find_by_id(first)
        .await?
        .ok_or_else(|| eyre::eyre!("event missing"))?;
    eyre::ensure!(event.reviewer(ReviewerSlot::First) == Some(harness.cast.smith.id()));
    eyre::ensure!(event.reviewer(ReviewerSlot::Second) == Some(harness.cast.jones.id()));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn batch_reports_every_category(harness: Harness) -> eyre::Result<()> {
    let ready = harness.screened_event().await?;
    let conflicting = harness.screened_event().await?;
    let too_early = harness.create_event().await?;
    let missing = EventId::new(999)?;
    let admin = &harness.cast.admin;
    harness
        .coordinator
        .assign_all(&[conflicting], Some(harness.cast.smith.id()), admin, false)
        .await?;

    let report = harness
        .coordinator
        .assign_all(
            &[ready, conflicting, too_early, missing, ready],
            Some(harness.cast.smith.id()),
            admin,
            false,
        )
        .await?;

    eyre::ensure!(report.assigned.ids() == [ready]);
    eyre::ensure!(report.cannot_assign_reviewer.ids() == [conflicting]);
    eyre::ensure!(report.cannot_assign.ids() == [too_early]);
    eyre::ensure!(report.not_found.ids() == [missing]);
    let skipped = harness
        .events
        .find_by_id(conflicting)
        .await?
        .ok_or_else(|| eyre::eyre!("event missing"))?;
    eyre::ensure!(skipped.status() == EventStatus::Screened);
    eyre::ensure!(skipped.reviewer(ReviewerSlot::First) == Some(harness.cast.smith.id()));
    eyre::ensure!(skipped.reviewer(ReviewerSlot::Second).is_none());
    let summary = report.summary();
    eyre::ensure!(summary.starts_with("1 event(s) assigned."));
    eyre::ensure!(summary.contains(&format!("1 event(s) not found: {missing}")));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unauthorized_batch_changes_nothing(harness: Harness) -> eyre::Result<()> {
    let missing = EventId::new(999)?;
    let too_early = harness.create_event().await?;
    let first_ready = harness.screened_event().await?;
    let second_ready = harness.screened_event().await?;
    let selection = [missing, too_early, first_ready, second_ready];
    let before = snapshot(&harness, &selection).await?;

    let result = harness
        .coordinator
        .assign_all(
            &selection,
            Some(harness.cast.smith.id()),
            &harness.cast.uploader,
            false,
        )
        .await;

    eyre::ensure!(matches!(
        result,
        Err(BatchError::Unauthorized {
            action: EventAction::Assign,
            message: "You cannot assign reviewers",
        })
    ));
    eyre::ensure!(snapshot(&harness, &selection).await? == before);
    for id in [first_ready, second_ready] {
        let event = harness
            .events
            .find_by_id(id)
            .await?
            .ok_or_else(|| eyre::eyre!("event missing"))?;
        eyre::ensure!(event.status() == EventStatus::Screened);
        eyre::ensure!(event.reviewer(ReviewerSlot::First).is_none());
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn batch_requires_an_eligible_reviewer(harness: Harness) -> eyre::Result<()> {
    let id = harness.screened_event().await?;
    let admin = &harness.cast.admin;

    let none = harness.coordinator.assign_all(&[id], None, admin, false).await;
    eyre::ensure!(matches!(none, Err(BatchError::NoReviewer)));

    let uploader = harness.cast.uploader.id();
    let not_reviewer = harness
        .coordinator
        .assign_all(&[id], Some(uploader), admin, false)
        .await;
    eyre::ensure!(matches!(not_reviewer, Err(BatchError::NotAReviewer(who)) if who == uploader));

    let smith = harness.cast.smith.id();
    let not_arbiter = harness
        .coordinator
        .assign_all(&[id], Some(smith), admin, true)
        .await;
    eyre::ensure!(matches!(not_arbiter, Err(BatchError::NotAReviewer(who)) if who == smith));
    eyre::ensure!(not_arbiter.map_err(|error| error.to_string()).err()
        == Some(format!("User {} is not a reviewer", UserId::new(2)?)));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn send_batch_emails_both_reviewers(harness: Harness) -> eyre::Result<()> {
    let id = harness.assigned_event().await?;

    let report = harness
        .coordinator
        .send_all(&[id], &harness.cast.admin)
        .await?;

    eyre::ensure!(report.sent.ids() == [id]);
    eyre::ensure!(report.summary() == "1 event(s) sent.");
    let recipients: Vec<String> = harness
        .mailer
        .sent()
        .into_iter()
        .map(|notice| notice.recipient)
        .collect();
    eyre::ensure!(recipients == ["drsmith@example.org", "drjones@example.org"]);
    eyre::ensure!(status_of(&harness, id).await? == EventStatus::Sent);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn send_batch_records_send_despite_bad_address(harness: Harness) -> eyre::Result<()> {
    let id = harness.assigned_event().await?;
    let not_ready = harness.screened_event().await?;
    harness.mailer.reject("drjones@example.org");

    let report = harness
        .coordinator
        .send_all(&[id, not_ready], &harness.cast.admin)
        .await?;

    eyre::ensure!(report.sent.is_empty());
    eyre::ensure!(report.bad_email.ids() == [id]);
    eyre::ensure!(report.cannot_send.ids() == [not_ready]);
    eyre::ensure!(
        report.bad_email_messages == vec![(id, "Email to drjones failed.".to_owned())]
    );
    eyre::ensure!(status_of(&harness, id).await? == EventStatus::Sent);
    eyre::ensure!(harness.mailer.sent().len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unauthorized_send_batch_changes_nothing(harness: Harness) -> eyre::Result<()> {
    let missing = EventId::new(999)?;
    let screened = harness.screened_event().await?;
    let first_ready = harness.assigned_event().await?;
    let second_ready = harness.assigned_event().await?;
    let selection = [missing, screened, first_ready, second_ready];
    let before = snapshot(&harness, &selection).await?;

    let result = harness
        .coordinator
        .send_all(&selection, &harness.cast.smith)
        .await;

    eyre::ensure!(matches!(
        result,
        Err(BatchError::Unauthorized {
            message: "You cannot send packets",
            ..
        })
    ));
    eyre::ensure!(snapshot(&harness, &selection).await? == before);
    eyre::ensure!(status_of(&harness, first_ready).await? == EventStatus::Assigned);
    eyre::ensure!(status_of(&harness, second_ready).await? == EventStatus::Assigned);
    eyre::ensure!(harness.mailer.sent().is_empty());
    Ok(())
}
