//! When steps for adjudication review BDD scenarios.

use super::world::{AdjudicationWorld, positive_review, run_async};
use adjudicator::adjudication::{domain::Mci, services::ActionPayload};
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when(r#""{reviewer}" submits a "{mci}" review as reviewer {slot:u8}"#)]
fn submit_review(
    world: &mut AdjudicationWorld,
    reviewer: String,
    mci: String,
    slot: u8,
) -> Result<(), eyre::Report> {
    let id = world.event_id()?;
    let actor = world.user(&reviewer)?;
    let determination = Mci::try_from(mci.as_str())
        .map_err(|err| eyre::eyre!("invalid determination in scenario: {err}"))?;

    let result = run_async(world.workflow.perform_action(
        &format!("review{slot}"),
        &actor,
        Some(id),
        ActionPayload::Review(positive_review(determination)),
    ));
    world.last_result = Some(result);
    Ok(())
}

#[when(r#""{reviewer}" is assigned as the third reviewer"#)]
fn assign_third_reviewer(
    world: &mut AdjudicationWorld,
    reviewer: String,
) -> Result<(), eyre::Report> {
    let id = world.event_id()?;
    let arbiter = world.user(&reviewer)?;
    let report = run_async(world.coordinator.assign_all(
        &[id],
        Some(arbiter.id()),
        &world.admin,
        true,
    ))
    .wrap_err("assign third reviewer")?;
    if report.assigned.ids() != [id] {
        return Err(eyre::eyre!("third reviewer not assigned: {}", report.summary()));
    }
    Ok(())
}
