//! Query functions for `/main-activities/`, including the budget upsert.
//! Activities under one initiative share 65% of its weight.

use serde_json::Value;

use stratplan_core::budget::BudgetDraft;
use stratplan_core::model::{ActivityBudget, MainActivity, StrategicInitiative};
use stratplan_core::normalize::ListKind;
use stratplan_core::rules::period_problem;
use stratplan_core::weight::{WeightAllocator, WeightSummary};

use super::{decode_list, decode_one, initiatives, optional, position, verdict};
use crate::client::{ApiClient, decode};
use crate::error::ApiError;
use crate::models::{ActivityInput, RemoteWeightSummary, WeightVerdict};

const PATH: &str = "/main-activities/";

pub async fn list_for_initiative(
    client: &ApiClient,
    initiative_id: &str,
) -> Result<Vec<MainActivity>, ApiError> {
    let value = client
        .get_value(
            PATH,
            &[("initiative", initiative_id)],
            "Failed to fetch main activities",
        )
        .await?;
    decode_list(ListKind::Activities, value)
}

pub async fn get(client: &ApiClient, id: &str) -> Result<Option<MainActivity>, ApiError> {
    let value = optional(
        client
            .get_value(&format!("{PATH}{id}/"), &[], "Failed to fetch main activity")
            .await,
    )?;
    value
        .map(|v| decode_one(ListKind::Activities, v, "main activity"))
        .transpose()
}

async fn parent(client: &ApiClient, initiative_id: &str) -> Result<StrategicInitiative, ApiError> {
    initiatives::get(client, initiative_id)
        .await?
        .ok_or_else(|| ApiError::Invalid(format!("initiative {initiative_id} not found")))
}

async fn check(client: &ApiClient, id: Option<&str>, input: &ActivityInput) -> Result<(), ApiError> {
    if let Some(message) = period_problem(
        &input.name,
        &input.selected_months,
        &input.selected_quarters,
    ) {
        return Err(ApiError::Invalid(message));
    }
    let initiative = parent(client, &input.initiative).await?;
    let siblings = list_for_initiative(client, &input.initiative).await?;
    let index = id.and_then(|id| position(siblings.iter().map(|a| a.id.as_str()), id));
    let weights: Vec<f64> = siblings.iter().map(|a| a.weight).collect();
    WeightAllocator::activities(&initiative).validate(input.weight, &weights, index)?;
    Ok(())
}

pub async fn create(client: &ApiClient, input: &ActivityInput) -> Result<MainActivity, ApiError> {
    check(client, None, input).await?;
    let value: Value = client
        .post(PATH, &[], Some(input), "Failed to create main activity")
        .await?;
    decode_one(ListKind::Activities, value, "main activity")
}

pub async fn update(
    client: &ApiClient,
    id: &str,
    input: &ActivityInput,
) -> Result<MainActivity, ApiError> {
    check(client, Some(id), input).await?;
    let value: Value = client
        .patch(&format!("{PATH}{id}/"), input, "Failed to update main activity")
        .await?;
    decode_one(ListKind::Activities, value, "main activity")
}

pub async fn delete(client: &ApiClient, id: &str) -> Result<(), ApiError> {
    client
        .delete(&format!("{PATH}{id}/"), "Failed to delete main activity")
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
            "Failed to fetch activity weight summary",
        )
        .await?;
    let remote = RemoteWeightSummary::from_value(&value);
    let expected = match (remote.expected, remote.parent_weight) {
        (Some(expected), _) => expected,
        (None, Some(weight)) => WeightAllocator::activities_for(weight).target(),
        (None, None) => {
            WeightAllocator::activities(&parent(client, initiative_id).await?).target()
        }
    };
    Ok(remote.resolve(expected))
}

pub async fn validate(client: &ApiClient, initiative_id: &str) -> Result<WeightVerdict, ApiError> {
    verdict(
        client
            .post_empty(
                &format!("{PATH}validate_activities_weight/"),
                &[("initiative", initiative_id)],
                "Failed to validate activity weights",
            )
            .await,
    )
}

/// Create or replace an activity's budget.
///
/// The draft is reconciled first; an over-funded or negative budget fails
/// here without a request being made.
pub async fn update_budget(
    client: &ApiClient,
    draft: BudgetDraft,
) -> Result<ActivityBudget, ApiError> {
    let budget = draft.build()?;
    let activity_id = budget.activity_id.clone();

    let value: Value = client
        .post(
            &format!("{PATH}{activity_id}/budget/"),
            &[],
            Some(&budget),
            "Failed to update budget",
        )
        .await?;

    let summary = budget.summary();
    tracing::info!(
        activity_id = %activity_id,
        estimated_cost = summary.estimated_cost,
        funding_gap = summary.funding_gap,
        "budget saved"
    );

    // The backend answers with the budget, the activity carrying it, or
    // nothing.
    let stored = match value {
        Value::Null => return Ok(budget),
        Value::Object(mut map) => match map.remove("budget") {
            Some(inner) if inner.is_object() => inner,
            _ => Value::Object(map),
        },
        other => other,
    };
    let mut stored: ActivityBudget = decode(stored, "Failed to update budget")?;
    if stored.activity_id.is_empty() {
        stored.activity_id = activity_id;
    }
    Ok(stored)
}
