//! Query functions for `/performance-measures/`. Measures under one
//! initiative share 35% of its weight.

use serde_json::Value;

use stratplan_core::model::{PerformanceMeasure, StrategicInitiative};
use stratplan_core::normalize::ListKind;
use stratplan_core::weight::{EPSILON, WeightAllocator, WeightSummary};

use super::{decode_list, decode_one, initiatives, optional, position, verdict};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::{MeasureInput, RemoteWeightSummary, WeightVerdict};

const PATH: &str = "/performance-measures/";

pub async fn list_for_initiative(
    client: &ApiClient,
    initiative_id: &str,
) -> Result<Vec<PerformanceMeasure>, ApiError> {
    let value = client
        .get_value(
            PATH,
            &[("initiative", initiative_id)],
            "Failed to fetch performance measures",
        )
        .await?;
    decode_list(ListKind::Measures, value)
}

pub async fn get(client: &ApiClient, id: &str) -> Result<Option<PerformanceMeasure>, ApiError> {
    let value = optional(
        client
            .get_value(
                &format!("{PATH}{id}/"),
                &[],
                "Failed to fetch performance measure",
            )
            .await,
    )?;
    value
        .map(|v| decode_one(ListKind::Measures, v, "performance measure"))
        .transpose()
}

async fn parent(client: &ApiClient, initiative_id: &str) -> Result<StrategicInitiative, ApiError> {
    initiatives::get(client, initiative_id)
        .await?
        .ok_or_else(|| ApiError::Invalid(format!("initiative {initiative_id} not found")))
}

fn warn_on_targets(input: &MeasureInput) {
    let quarterly = input.q1_target + input.q2_target + input.q3_target + input.q4_target;
    if quarterly > input.annual_target + EPSILON {
        tracing::warn!(
            measure = %input.name,
            quarterly,
            annual = input.annual_target,
            "quarterly targets exceed the annual target"
        );
    }
}

pub async fn create(
    client: &ApiClient,
    input: &MeasureInput,
) -> Result<PerformanceMeasure, ApiError> {
    let initiative = parent(client, &input.initiative).await?;
    let siblings = list_for_initiative(client, &input.initiative).await?;
    let weights: Vec<f64> = siblings.iter().map(|m| m.weight).collect();
    WeightAllocator::measures(&initiative).validate(input.weight, &weights, None)?;
    warn_on_targets(input);

    let value: Value = client
        .post(PATH, &[], Some(input), "Failed to create performance measure")
        .await?;
    decode_one(ListKind::Measures, value, "performance measure")
}

pub async fn update(
    client: &ApiClient,
    id: &str,
    input: &MeasureInput,
) -> Result<PerformanceMeasure, ApiError> {
    let initiative = parent(client, &input.initiative).await?;
    let siblings = list_for_initiative(client, &input.initiative).await?;
    let index = position(siblings.iter().map(|m| m.id.as_str()), id);
    let weights: Vec<f64> = siblings.iter().map(|m| m.weight).collect();
    WeightAllocator::measures(&initiative).validate(input.weight, &weights, index)?;
    warn_on_targets(input);

    let value: Value = client
        .patch(
            &format!("{PATH}{id}/"),
            input,
            "Failed to update performance measure",
        )
        .await?;
    decode_one(ListKind::Measures, value, "performance measure")
}

pub async fn delete(client: &ApiClient, id: &str) -> Result<(), ApiError> {
    client
        .delete(&format!("{PATH}{id}/"), "Failed to delete performance measure")
        .await
}

pub async fn weight_summary(
    client: &ApiClient,
    initiative_id: &str,
) -> Result<WeightSummary, ApiError> {
    let value = client
        .get_value(
            &format!("{PATH}weight_summary/"),
            &[("initiative", initiative_id)],
            "Failed to fetch measure weight summary",
        )
        .await?;
    let remote = RemoteWeightSummary::from_value(&value);
    let expected = match (remote.expected, remote.parent_weight) {
        (Some(expected), _) => expected,
        (None, Some(weight)) => WeightAllocator::measures_for(weight).target(),
        (None, None) => WeightAllocator::measures(&parent(client, initiative_id).await?).target(),
    };
    Ok(remote.resolve(expected))
}

pub async fn validate(client: &ApiClient, initiative_id: &str) -> Result<WeightVerdict, ApiError> {
    verdict(
        client
            .post_empty(
                &format!("{PATH}validate_measures_weight/"),
                &[("initiative", initiative_id)],
                "Failed to validate measure weights",
            )
            .await,
    )
}
