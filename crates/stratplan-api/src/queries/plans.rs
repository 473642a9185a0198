//! Query functions for `/plans/` and the plan lifecycle actions.
//!
//! Each action re-reads the plan and runs the local transition checks first;
//! a plan that cannot move is refused without a request being made.

use serde_json::{Value, json};

use stratplan_core::model::{PlanDocument, PlanStatus};
use stratplan_core::normalize::normalize_plan;
use stratplan_core::rules::ValidationReport;
use stratplan_core::workflow::{ReviewDecision, check_review, check_submission};

use super::optional;
use crate::client::{ApiClient, decode};
use crate::error::ApiError;
use crate::models::{ActionResponse, Feedback, PlanInput, list_items};

const PATH: &str = "/plans/";

fn item_path(id: &str) -> String {
    format!("{PATH}{id}/")
}

fn to_plan(value: &Value) -> Result<PlanDocument, ApiError> {
    let (plan, coercions) = normalize_plan(value)?;
    if !coercions.is_empty() {
        tracing::debug!(plan_id = %plan.id, coercions = coercions.len(), "plan normalized");
    }
    Ok(plan)
}

/// Action endpoints may answer with an empty body.
fn to_action(value: Value) -> Result<ActionResponse, ApiError> {
    if value.is_null() {
        return Ok(ActionResponse::default());
    }
    decode(value, "unexpected action response")
}

/// List plans, optionally filtered by status.
pub async fn list(
    client: &ApiClient,
    status: Option<PlanStatus>,
) -> Result<Vec<PlanDocument>, ApiError> {
    let status = status.map(|s| s.to_string());
    let query: Vec<(&str, &str)> = status.iter().map(|s| ("status", s.as_str())).collect();
    let value = client
        .get_value(PATH, &query, "Failed to fetch plans")
        .await?;
    list_items(value).iter().map(to_plan).collect()
}

/// Plans waiting for an evaluator.
pub async fn pending_reviews(client: &ApiClient) -> Result<Vec<PlanDocument>, ApiError> {
    list(client, Some(PlanStatus::Submitted)).await
}

/// Fetch a plan with its full tree, normalized. `None` when it does not
/// exist.
pub async fn get(client: &ApiClient, id: &str) -> Result<Option<PlanDocument>, ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::Invalid("Plan ID is required".to_owned()));
    }
    let value = optional(
        client
            .get_value(&item_path(id), &[], "Failed to fetch plan")
            .await,
    )?;
    value.as_ref().map(to_plan).transpose()
}

async fn require(client: &ApiClient, id: &str) -> Result<PlanDocument, ApiError> {
    get(client, id)
        .await?
        .ok_or_else(|| ApiError::Invalid(format!("plan {id} not found")))
}

pub async fn create(client: &ApiClient, input: &PlanInput) -> Result<PlanDocument, ApiError> {
    input.check_dates().map_err(ApiError::Invalid)?;
    let value: Value = client
        .post(PATH, &[], Some(input), "Failed to create plan")
        .await?;
    let plan = to_plan(&value)?;
    tracing::info!(plan_id = %plan.id, organization = %input.organization, "plan created");
    Ok(plan)
}

/// Edit a plan. Only drafts can change.
pub async fn update(
    client: &ApiClient,
    id: &str,
    input: &PlanInput,
) -> Result<PlanDocument, ApiError> {
    input.check_dates().map_err(ApiError::Invalid)?;
    let current = require(client, id).await?;
    if current.status != PlanStatus::Draft {
        return Err(ApiError::Invalid(format!(
            "plan {id} is {} and can no longer be edited",
            current.status
        )));
    }
    let value: Value = client
        .patch(&item_path(id), input, "Failed to update plan")
        .await?;
    to_plan(&value)
}

pub async fn delete(client: &ApiClient, id: &str) -> Result<(), ApiError> {
    client.delete(&item_path(id), "Failed to delete plan").await
}

pub async fn finalize(client: &ApiClient, id: &str) -> Result<ActionResponse, ApiError> {
    let value = client
        .post_empty(
            &format!("{PATH}{id}/finalize/"),
            &[],
            "Failed to finalize plan",
        )
        .await?;
    to_action(value)
}

/// Submit a draft for review. Blocking validation issues refuse the
/// submission locally; the report (with any warnings) is returned on success.
pub async fn submit(client: &ApiClient, id: &str) -> Result<ValidationReport, ApiError> {
    let plan = require(client, id).await?;
    let report = check_submission(&plan)?;

    let _: Value = client
        .post(
            &format!("{PATH}{id}/submit/"),
            &[],
            Some(&json!({})),
            "Failed to submit plan",
        )
        .await?;
    tracing::info!(plan_id = %id, warnings = report.warnings().count(), "plan submitted");
    Ok(report)
}

async fn review(
    client: &ApiClient,
    id: &str,
    decision: ReviewDecision,
) -> Result<ActionResponse, ApiError> {
    let plan = require(client, id).await?;
    check_review(plan.status, &decision)?;

    let (action, fallback) = match decision.status.plan_status() {
        PlanStatus::Rejected => ("reject", "Failed to reject plan"),
        _ => ("approve", "Failed to approve plan"),
    };
    let body = Feedback {
        feedback: &decision.feedback,
    };
    let value: Value = client
        .post(&format!("{PATH}{id}/{action}/"), &[], Some(&body), fallback)
        .await?;
    tracing::info!(plan_id = %id, action, "plan reviewed");
    to_action(value)
}

pub async fn approve(
    client: &ApiClient,
    id: &str,
    feedback: Option<&str>,
) -> Result<ActionResponse, ApiError> {
    review(client, id, ReviewDecision::approve(feedback)).await
}

/// Reject a submitted plan. Empty feedback is refused locally.
pub async fn reject(client: &ApiClient, id: &str, feedback: &str) -> Result<ActionResponse, ApiError> {
    let decision = ReviewDecision::reject(feedback);
    decision.validate()?;
    review(client, id, decision).await
}
