//! Arbitration: third reviewer assignment and majority outcomes.

use super::helpers::{Harness, definite_primary, harness, with_mci};
use adjudicator::adjudication::{
    domain::{
        DerivationQuorum, EventId, EventStatus, EventType, Mci, ReviewSubmission, ReviewerSlot,
        Role, SecondaryCause,
    },
    ports::{DerivedDataRepository, EventRepository},
    services::{ActionPayload, ConsensusOutcome, WorkflowError},
};
use rstest::rstest;

async fn disputed_event(harness: &Harness) -> eyre::Result<EventId> {
    let id = harness.sent_event().await?;
    harness
        .review("review1", &harness.cast.smith, id, definite_primary())
        .await?;
    harness
        .review("review2", &harness.cast.jones, id, with_mci(Mci::Probable))
        .await?;
    Ok(id)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn batch_third_assignment_emails_then_assigns(harness: Harness) -> eyre::Result<()> {
    let id = disputed_event(&harness).await?;
    let before = harness.mailer.sent().len();

    let report = harness
        .coordinator
        .assign_all(&[id], Some(harness.cast.lee.id()), &harness.cast.admin, true)
        .await?;

    eyre::ensure!(report.assigned.ids() == [id]);
    let sent = harness.mailer.sent();
    eyre::ensure!(sent.len() == before + 1);
    let notice = sent.last().ok_or_else(|| eyre::eyre!("no notification"))?;
    eyre::ensure!(notice.recipient == "drlee@example.org");
    eyre::ensure!(notice.slot == ReviewerSlot::Third);
    eyre::ensure!(notice.review_url.ends_with(&format!("events/review3/{id}")));

    let event = harness
        .events
        .find_by_id(id)
        .await?
        .ok_or_else(|| eyre::eyre!("event missing"))?;
    eyre::ensure!(event.status() == EventStatus::ThirdReviewAssigned);
    eyre::ensure!(event.reviewer(ReviewerSlot::Third) == Some(harness.cast.lee.id()));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_arbitration_email_leaves_event_unassigned(harness: Harness) -> eyre::Result<()> {
    let id = disputed_event(&harness).await?;
    harness.mailer.reject("drlee@example.org");

    let report = harness
        .coordinator
        .assign_all(&[id], Some(harness.cast.lee.id()), &harness.cast.admin, true)
        .await?;

    eyre::ensure!(report.assigned.is_empty());
    eyre::ensure!(report.email_failed.ids() == [id]);
    eyre::ensure!(report.summary().contains("1 event(s) email failed"));
    let status = harness
        .events
        .find_by_id(id)
        .await?
        .map(|event| event.status());
    eyre::ensure!(status == Some(EventStatus::ThirdReviewNeeded));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn first_round_reviewer_cannot_arbitrate(harness: Harness) -> eyre::Result<()> {
    let id = disputed_event(&harness).await?;
    let smith_can_arbitrate = harness.cast.smith.clone().with_role(Role::ThirdReviewer);
    harness.directory.add_user(smith_can_arbitrate.clone())?;

    let result = harness
        .act(
            "assign3rd",
            &harness.cast.admin,
            id,
            ActionPayload::Assign {
                reviewer_id: Some(smith_can_arbitrate.id()),
            },
        )
        .await;

    eyre::ensure!(matches!(result, Err(WorkflowError::ReviewerConflict { .. })));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn third_review_records_majority_outcome(harness: Harness) -> eyre::Result<()> {
    let id = disputed_event(&harness).await?;
    harness
        .act(
            "assign3rd",
            &harness.cast.admin,
            id,
            ActionPayload::Assign {
                reviewer_id: Some(harness.cast.lee.id()),
            },
        )
        .await?;

    let outcome = harness
        .review("review3", &harness.cast.lee, id, with_mci(Mci::Probable))
        .await?;

    eyre::ensure!(outcome.status == EventStatus::Done);
    let Some(ConsensusOutcome::Recorded(record)) = outcome.consensus else {
        eyre::bail!("expected a recorded outcome, got {:?}", outcome.consensus);
    };
    eyre::ensure!(record.outcome == Mci::Probable);
    eyre::ensure!(record.quorum == DerivationQuorum::Three);
    eyre::ensure!(harness.derived.find_by_event(id).await?.is_some());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn third_review_without_majority_records_nothing(harness: Harness) -> eyre::Result<()> {
    let id = disputed_event(&harness).await?;
    harness
        .act(
            "assign3rd",
            &harness.cast.admin,
            id,
            ActionPayload::Assign {
                reviewer_id: Some(harness.cast.park.id()),
            },
        )
        .await?;
    let secondary = ReviewSubmission {
        event_type: Some(EventType::Secondary),
        secondary_cause: Some(SecondaryCause::Sepsis),
        ..definite_primary()
    };
    let negative = ReviewSubmission {
        mci: Some(Mci::ResuscitatedCardiacArrest),
        ci: Some(false),
        ..secondary
    };

    let outcome = harness
        .review("review3", &harness.cast.park, id, negative)
        .await?;

    eyre::ensure!(outcome.status == EventStatus::Done);
    eyre::ensure!(outcome.consensus == Some(ConsensusOutcome::Stalemate));
    eyre::ensure!(harness.derived.is_empty());
    Ok(())
}
