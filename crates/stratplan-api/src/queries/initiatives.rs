//! Query functions for `/strategic-initiatives/`.
//!
//! An initiative hangs off exactly one of an objective, a program or a
//! subprogram, and its siblings share that parent's unclaimed weight.

use serde_json::Value;

use stratplan_core::model::{InitiativeParent, StrategicInitiative};
use stratplan_core::normalize::ListKind;
use stratplan_core::weight::{WeightAllocator, WeightSummary};

use super::{decode_list, decode_one, objectives, optional, position, programs, verdict};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::{InitiativeInput, RemoteWeightSummary, WeightVerdict};

const PATH: &str = "/strategic-initiatives/";

/// Parent kind as the backend names it (both the list filter and
/// `parent_type`), with the parent id.
fn parent_keys(parent: &InitiativeParent) -> (&'static str, &str) {
    match parent {
        InitiativeParent::Objective(id) => ("objective", id),
        InitiativeParent::Program(id) => ("program", id),
        InitiativeParent::SubProgram(id) => ("subprogram", id),
    }
}

/// The parent named by a request body; exactly one must be set.
pub fn input_parent(input: &InitiativeInput) -> Result<InitiativeParent, ApiError> {
    let parents = [
        input
            .strategic_objective
            .clone()
            .map(InitiativeParent::Objective),
        input.program.clone().map(InitiativeParent::Program),
        input.subprogram.clone().map(InitiativeParent::SubProgram),
    ];
    let mut set = parents.into_iter().flatten();
    match (set.next(), set.next()) {
        (Some(parent), None) => Ok(parent),
        _ => Err(ApiError::Invalid(
            "An initiative must belong to exactly one objective, program or subprogram".to_owned(),
        )),
    }
}

pub async fn list_by_parent(
    client: &ApiClient,
    parent: &InitiativeParent,
) -> Result<Vec<StrategicInitiative>, ApiError> {
    let (filter, id) = parent_keys(parent);
    let value = client
        .get_value(PATH, &[(filter, id)], "Failed to fetch initiatives")
        .await?;
    decode_list(ListKind::Initiatives, value)
}

pub async fn get(client: &ApiClient, id: &str) -> Result<Option<StrategicInitiative>, ApiError> {
    let value = optional(
        client
            .get_value(&format!("{PATH}{id}/"), &[], "Failed to fetch initiative")
            .await,
    )?;
    value
        .map(|v| decode_one(ListKind::Initiatives, v, "initiative"))
        .transpose()
}

/// The allocator for initiatives under `parent`, with the parent's children
/// loaded so the unclaimed share is computed from fresh data.
pub async fn allocator_for(
    client: &ApiClient,
    parent: &InitiativeParent,
) -> Result<WeightAllocator, ApiError> {
    match parent {
        InitiativeParent::Objective(id) => {
            let mut objective = objectives::get(client, id)
                .await?
                .ok_or_else(|| ApiError::Invalid(format!("objective {id} not found")))?;
            if objective.programs.is_empty() {
                objective.programs = programs::list_for_objective(client, id).await?;
            }
            Ok(WeightAllocator::objective_initiatives(&objective))
        }
        InitiativeParent::Program(id) => {
            let mut program = programs::get_program(client, id)
                .await?
                .ok_or_else(|| ApiError::Invalid(format!("program {id} not found")))?;
            if program.subprograms.is_empty() {
                program.subprograms = programs::list_subprograms(client, id).await?;
            }
            Ok(WeightAllocator::program_initiatives(&program))
        }
        InitiativeParent::SubProgram(id) => {
            let subprogram = programs::get_subprogram(client, id)
                .await?
                .ok_or_else(|| ApiError::Invalid(format!("subprogram {id} not found")))?;
            Ok(WeightAllocator::subprogram_initiatives(&subprogram))
        }
    }
}

pub async fn create(
    client: &ApiClient,
    input: &InitiativeInput,
) -> Result<StrategicInitiative, ApiError> {
    let parent = input_parent(input)?;
    let allocator = allocator_for(client, &parent).await?;
    let siblings = list_by_parent(client, &parent).await?;
    let weights: Vec<f64> = siblings.iter().map(|i| i.weight).collect();
    allocator.validate(input.weight, &weights, None)?;

    let value: Value = client
        .post(PATH, &[], Some(input), "Failed to create initiative")
        .await?;
    let created: StrategicInitiative = decode_one(ListKind::Initiatives, value, "initiative")?;
    tracing::info!(initiative_id = %created.id, weight = input.weight, "initiative created");
    Ok(created)
}

pub async fn update(
    client: &ApiClient,
    id: &str,
    input: &InitiativeInput,
) -> Result<StrategicInitiative, ApiError> {
    let parent = input_parent(input)?;
    let allocator = allocator_for(client, &parent).await?;
    let siblings = list_by_parent(client, &parent).await?;
    let weights: Vec<f64> = siblings.iter().map(|i| i.weight).collect();
    // Moving an initiative to a new parent makes it a newcomer there.
    let index = position(siblings.iter().map(|i| i.id.as_str()), id);
    allocator.validate(input.weight, &weights, index)?;

    let value: Value = client
        .patch(&format!("{PATH}{id}/"), input, "Failed to update initiative")
        .await?;
    decode_one(ListKind::Initiatives, value, "initiative")
}

pub async fn delete(client: &ApiClient, id: &str) -> Result<(), ApiError> {
    client
        .delete(&format!("{PATH}{id}/"), "Failed to delete initiative")
        .await
}

pub async fn weight_summary(
    client: &ApiClient,
    parent: &InitiativeParent,
) -> Result<WeightSummary, ApiError> {
    let (parent_type, id) = parent_keys(parent);
    let value = client
        .get_value(
            &format!("{PATH}weight_summary/"),
            &[("parent", id), ("parent_type", parent_type)],
            "Failed to fetch initiative weight summary",
        )
        .await?;
    let remote = RemoteWeightSummary::from_value(&value);
    let expected = match remote.expected {
        Some(expected) => expected,
        None => allocator_for(client, parent).await?.target(),
    };
    Ok(remote.resolve(expected))
}

pub async fn validate(
    client: &ApiClient,
    parent: &InitiativeParent,
) -> Result<WeightVerdict, ApiError> {
    let (parent_type, id) = parent_keys(parent);
    verdict(
        client
            .post_empty(
                &format!("{PATH}validate_initiatives_weight/"),
                &[("parent", id), ("parent_type", parent_type)],
                "Failed to validate initiative weights",
            )
            .await,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_needs_one_parent() {
        let input = InitiativeInput::new("x", 5.0, &InitiativeParent::SubProgram("9".into()));
        assert_eq!(
            input_parent(&input).unwrap(),
            InitiativeParent::SubProgram("9".into())
        );

        let mut both = input.clone();
        both.program = Some("3".into());
        assert!(matches!(input_parent(&both), Err(ApiError::Invalid(_))));

        let mut none = input;
        none.subprogram = None;
        assert!(input_parent(&none).is_err());
    }
}
