//! Query functions for `/activity-budgets/`. Budgets are written through
//! [`super::activities::update_budget`].

use serde_json::Value;

use stratplan_core::model::ActivityBudget;

use super::optional;
use crate::client::{ApiClient, decode};
use crate::error::ApiError;
use crate::models::list_items;

const PATH: &str = "/activity-budgets/";

pub async fn list(client: &ApiClient) -> Result<Vec<ActivityBudget>, ApiError> {
    let value = client
        .get_value(PATH, &[], "Failed to fetch budgets")
        .await?;
    list_items(value)
        .into_iter()
        .map(|item| decode(item, "Failed to fetch budgets"))
        .collect()
}

pub async fn get(client: &ApiClient, id: &str) -> Result<Option<ActivityBudget>, ApiError> {
    let value = optional(
        client
            .get_value(&format!("{PATH}{id}/"), &[], "Failed to fetch budget")
            .await,
    )?;
    value
        .map(|v| decode(v, "Failed to fetch budget"))
        .transpose()
}

/// The budget of one activity, if it has one. The filter endpoint answers
/// with either a list or a single object.
pub async fn get_by_activity(
    client: &ApiClient,
    activity_id: &str,
) -> Result<Option<ActivityBudget>, ApiError> {
    let value = optional(
        client
            .get_value(PATH, &[("activity", activity_id)], "Failed to fetch budget")
            .await,
    )?;
    let item = match value {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) if !map.contains_key("data") && !map.contains_key("results") => {
            Some(Value::Object(map))
        }
        Some(other) => list_items(other).into_iter().next(),
    };
    item.map(|v| decode(v, "Failed to fetch budget")).transpose()
}

pub async fn delete(client: &ApiClient, id: &str) -> Result<(), ApiError> {
    client
        .delete(&format!("{PATH}{id}/"), "Failed to delete budget")
        .await
}
