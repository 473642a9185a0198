//! Query functions for `/strategic-objectives/`.

use serde_json::Value;

use stratplan_core::model::StrategicObjective;
use stratplan_core::normalize::ListKind;
use stratplan_core::weight::{OBJECTIVES_TOTAL, WeightAllocator, WeightSummary};

use super::{decode_list, decode_one, optional, position, verdict};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::{ObjectiveInput, RemoteWeightSummary, WeightVerdict};

const PATH: &str = "/strategic-objectives/";

fn item_path(id: &str) -> String {
    format!("{PATH}{id}/")
}

/// List every objective visible to the user.
pub async fn list(client: &ApiClient) -> Result<Vec<StrategicObjective>, ApiError> {
    let value = client
        .get_value(PATH, &[], "Failed to fetch objectives")
        .await?;
    decode_list(ListKind::Objectives, value)
}

/// Fetch one objective, `None` when it does not exist.
pub async fn get(client: &ApiClient, id: &str) -> Result<Option<StrategicObjective>, ApiError> {
    let value = optional(
        client
            .get_value(&item_path(id), &[], "Failed to fetch objective")
            .await,
    )?;
    value
        .map(|v| decode_one(ListKind::Objectives, v, "objective"))
        .transpose()
}

/// Create an objective. The new weight is checked against the current
/// objectives before the request is sent.
pub async fn create(
    client: &ApiClient,
    input: &ObjectiveInput,
) -> Result<StrategicObjective, ApiError> {
    let siblings = list(client).await?;
    let weights: Vec<f64> = siblings.iter().map(|o| o.weight).collect();
    WeightAllocator::objectives().validate(input.weight, &weights, None)?;

    let value: Value = client
        .post(PATH, &[], Some(input), "Failed to create objective")
        .await?;
    let created = decode_one(ListKind::Objectives, value, "objective")?;
    tracing::info!(weight = input.weight, "objective created");
    Ok(created)
}

/// Update an objective. Its own previous weight does not count against the
/// cap.
pub async fn update(
    client: &ApiClient,
    id: &str,
    input: &ObjectiveInput,
) -> Result<StrategicObjective, ApiError> {
    let siblings = list(client).await?;
    let index = position(siblings.iter().map(|o| o.id.as_str()), id)
        .ok_or_else(|| ApiError::Invalid(format!("objective {id} not found")))?;
    let weights: Vec<f64> = siblings.iter().map(|o| o.weight).collect();
    WeightAllocator::objectives().validate(input.weight, &weights, Some(index))?;

    let value: Value = client
        .patch(&item_path(id), input, "Failed to update objective")
        .await?;
    decode_one(ListKind::Objectives, value, "objective")
}

pub async fn delete(client: &ApiClient, id: &str) -> Result<(), ApiError> {
    client
        .delete(&item_path(id), "Failed to delete objective")
        .await
}

/// Backend totals across all objectives.
pub async fn weight_summary(client: &ApiClient) -> Result<WeightSummary, ApiError> {
    let value = client
        .get_value(
            &format!("{PATH}weight_summary/"),
            &[],
            "Failed to fetch weight summary",
        )
        .await?;
    Ok(RemoteWeightSummary::from_value(&value).resolve(OBJECTIVES_TOTAL))
}

/// Ask the backend whether objectives total exactly 100%.
pub async fn validate_total_weight(client: &ApiClient) -> Result<WeightVerdict, ApiError> {
    verdict(
        client
            .post_empty(
                &format!("{PATH}validate_total_weight/"),
                &[],
                "Failed to validate objective weights",
            )
            .await,
    )
}
