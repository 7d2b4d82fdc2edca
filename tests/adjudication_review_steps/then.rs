//! Then steps for adjudication review BDD scenarios.

use super::world::{AdjudicationWorld, run_async};
use adjudicator::adjudication::{
    domain::{EventStatus, Mci},
    ports::{DerivedDataRepository, EventRepository},
    services::WorkflowError,
};
use rstest_bdd_macros::then;

#[then(r#"the event status is "{status}""#)]
fn event_status_is(world: &AdjudicationWorld, status: String) -> Result<(), eyre::Report> {
    let expected = EventStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let id = world.event_id()?;
    let event = run_async(world.events.find_by_id(id))?
        .ok_or_else(|| eyre::eyre!("event {id} missing"))?;

    if event.status() != expected {
        return Err(eyre::eyre!(
            "expected status {expected}, found {}",
            event.status()
        ));
    }
    Ok(())
}

#[then(r#"an adjudicated outcome of "{mci}" is recorded"#)]
fn outcome_recorded(world: &AdjudicationWorld, mci: String) -> Result<(), eyre::Report> {
    let expected = Mci::try_from(mci.as_str())
        .map_err(|err| eyre::eyre!("invalid determination in scenario: {err}"))?;
    let id = world.event_id()?;
    let record = run_async(world.derived.find_by_event(id))?
        .ok_or_else(|| eyre::eyre!("no outcome recorded for event {id}"))?;

    if record.outcome != expected {
        return Err(eyre::eyre!(
            "expected outcome {expected}, found {}",
            record.outcome
        ));
    }
    Ok(())
}

#[then("no adjudicated outcome is recorded")]
fn no_outcome_recorded(world: &AdjudicationWorld) -> Result<(), eyre::Report> {
    if !world.derived.is_empty() {
        return Err(eyre::eyre!("expected no adjudicated outcome"));
    }
    Ok(())
}

#[then("the action is refused as unauthorized")]
fn action_refused(world: &AdjudicationWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing action result"))?;

    if !matches!(result, Err(WorkflowError::Authorization { .. })) {
        return Err(eyre::eyre!("expected Authorization error, got {result:?}"));
    }
    Ok(())
}
