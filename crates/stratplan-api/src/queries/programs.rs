//! Query functions for `/programs/` and `/subprograms/`.
//!
//! Programs split an objective's weight; subprograms split a program's.

use serde_json::Value;

use stratplan_core::model::{Program, SubProgram};
use stratplan_core::normalize::ListKind;
use stratplan_core::weight::WeightAllocator;

use super::{decode_list, decode_one, objectives, optional, position};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::{ProgramInput, SubProgramInput};

const PROGRAMS: &str = "/programs/";
const SUBPROGRAMS: &str = "/subprograms/";

pub async fn list_for_objective(
    client: &ApiClient,
    objective_id: &str,
) -> Result<Vec<Program>, ApiError> {
    let value = client
        .get_value(
            PROGRAMS,
            &[("strategic_objective", objective_id)],
            "Failed to fetch programs",
        )
        .await?;
    decode_list(ListKind::Programs, value)
}

pub async fn get_program(client: &ApiClient, id: &str) -> Result<Option<Program>, ApiError> {
    let value = optional(
        client
            .get_value(&format!("{PROGRAMS}{id}/"), &[], "Failed to fetch program")
            .await,
    )?;
    value
        .map(|v| decode_one(ListKind::Programs, v, "program"))
        .transpose()
}

pub async fn list_subprograms(
    client: &ApiClient,
    program_id: &str,
) -> Result<Vec<SubProgram>, ApiError> {
    let value = client
        .get_value(
            SUBPROGRAMS,
            &[("program", program_id)],
            "Failed to fetch subprograms",
        )
        .await?;
    decode_list(ListKind::SubPrograms, value)
}

pub async fn get_subprogram(client: &ApiClient, id: &str) -> Result<Option<SubProgram>, ApiError> {
    let value = optional(
        client
            .get_value(
                &format!("{SUBPROGRAMS}{id}/"),
                &[],
                "Failed to fetch subprogram",
            )
            .await,
    )?;
    value
        .map(|v| decode_one(ListKind::SubPrograms, v, "subprogram"))
        .transpose()
}

/// Programs of `objective_id` and the allocator they share.
async fn program_allocation(
    client: &ApiClient,
    objective_id: &str,
) -> Result<(WeightAllocator, Vec<Program>), ApiError> {
    let objective = objectives::get(client, objective_id)
        .await?
        .ok_or_else(|| ApiError::Invalid(format!("objective {objective_id} not found")))?;
    let siblings = list_for_objective(client, objective_id).await?;
    Ok((WeightAllocator::programs(&objective), siblings))
}

/// Create a program under an objective, within the objective's weight.
pub async fn create_program(client: &ApiClient, input: &ProgramInput) -> Result<Program, ApiError> {
    let (allocator, siblings) = program_allocation(client, &input.strategic_objective).await?;
    let weights: Vec<f64> = siblings.iter().map(|p| p.weight).collect();
    allocator.validate(input.weight, &weights, None)?;

    let value: Value = client
        .post(PROGRAMS, &[], Some(input), "Failed to create program")
        .await?;
    decode_one(ListKind::Programs, value, "program")
}

pub async fn update_program(
    client: &ApiClient,
    id: &str,
    input: &ProgramInput,
) -> Result<Program, ApiError> {
    let (allocator, siblings) = program_allocation(client, &input.strategic_objective).await?;
    let index = position(siblings.iter().map(|p| p.id.as_str()), id)
        .ok_or_else(|| ApiError::Invalid(format!("program {id} not found")))?;
    let weights: Vec<f64> = siblings.iter().map(|p| p.weight).collect();
    allocator.validate(input.weight, &weights, Some(index))?;

    let value: Value = client
        .patch(&format!("{PROGRAMS}{id}/"), input, "Failed to update program")
        .await?;
    decode_one(ListKind::Programs, value, "program")
}

/// Create a subprogram under a program, within the program's weight.
pub async fn create_subprogram(
    client: &ApiClient,
    input: &SubProgramInput,
) -> Result<SubProgram, ApiError> {
    let program = get_program(client, &input.program)
        .await?
        .ok_or_else(|| ApiError::Invalid(format!("program {} not found", input.program)))?;
    let siblings = list_subprograms(client, &input.program).await?;
    let weights: Vec<f64> = siblings.iter().map(|s| s.weight).collect();
    WeightAllocator::subprograms(&program).validate(input.weight, &weights, None)?;

    let value: Value = client
        .post(SUBPROGRAMS, &[], Some(input), "Failed to create subprogram")
        .await?;
    decode_one(ListKind::SubPrograms, value, "subprogram")
}

pub async fn update_subprogram(
    client: &ApiClient,
    id: &str,
    input: &SubProgramInput,
) -> Result<SubProgram, ApiError> {
    let program = get_program(client, &input.program)
        .await?
        .ok_or_else(|| ApiError::Invalid(format!("program {} not found", input.program)))?;
    let siblings = list_subprograms(client, &input.program).await?;
    let index = position(siblings.iter().map(|s| s.id.as_str()), id)
        .ok_or_else(|| ApiError::Invalid(format!("subprogram {id} not found")))?;
    let weights: Vec<f64> = siblings.iter().map(|s| s.weight).collect();
    WeightAllocator::subprograms(&program).validate(input.weight, &weights, Some(index))?;

    let value: Value = client
        .patch(
            &format!("{SUBPROGRAMS}{id}/"),
            input,
            "Failed to update subprogram",
        )
        .await?;
    decode_one(ListKind::SubPrograms, value, "subprogram")
}

pub async fn delete_program(client: &ApiClient, id: &str) -> Result<(), ApiError> {
    client
        .delete(&format!("{PROGRAMS}{id}/"), "Failed to delete program")
        .await
}

pub async fn delete_subprogram(client: &ApiClient, id: &str) -> Result<(), ApiError> {
    client
        .delete(&format!("{SUBPROGRAMS}{id}/"), "Failed to delete subprogram")
        .await
}
