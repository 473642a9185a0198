//! Remote CLI handlers for `stratplan plans` subcommands.
//!
//! Implements:
//! - `stratplan plans list [--status S] [--pending]` -- list plans
//! - `stratplan plans show <plan-id>`                -- plan details and validation
//! - `stratplan plans submit <plan-id>`              -- submit a draft for review
//! - `stratplan plans approve <plan-id>`             -- approve a submitted plan
//! - `stratplan plans reject <plan-id> --feedback F` -- reject a submitted plan

use anyhow::{Context, Result, bail};

use stratplan_api::queries::plans as plan_queries;
use stratplan_api::{ApiClient, ApiError};
use stratplan_core::assemble::{budget_totals, format_amount};
use stratplan_core::model::{PlanDocument, PlanStatus};
use stratplan_core::rules::validate_plan;
use stratplan_core::workflow::WorkflowError;

use crate::PlansCommands;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `PlansCommands` variant to the appropriate handler.
pub async fn run_plans_command(command: PlansCommands, client: &ApiClient) -> Result<()> {
    match command {
        PlansCommands::List { status, pending } => {
            let status = if pending {
                Some(PlanStatus::Submitted)
            } else {
                status
            };
            cmd_list(client, status).await
        }
        PlansCommands::Show { plan_id } => cmd_show(client, &plan_id).await,
        PlansCommands::Submit { plan_id } => cmd_submit(client, &plan_id).await,
        PlansCommands::Approve { plan_id, feedback } => {
            cmd_approve(client, &plan_id, feedback.as_deref()).await
        }
        PlansCommands::Reject { plan_id, feedback } => {
            cmd_reject(client, &plan_id, &feedback).await
        }
    }
}

// -----------------------------------------------------------------------
// stratplan plans list
// -----------------------------------------------------------------------

async fn cmd_list(client: &ApiClient, status: Option<PlanStatus>) -> Result<()> {
    let plans = plan_queries::list(client, status)
        .await
        .context("failed to list plans")?;

    if plans.is_empty() {
        match status {
            Some(status) => println!("No {status} plans found."),
            None => println!("No plans found."),
        }
        return Ok(());
    }

    let org_w = plans
        .iter()
        .map(|p| p.organization_name.chars().count())
        .max()
        .unwrap_or(12)
        .max(12);

    println!(
        "{:<8}  {:<org_w$}  {:<10}  {:<10}  {:<10}",
        "ID", "ORGANIZATION", "STATUS", "FROM", "TO"
    );
    println!("{}", "-".repeat(8 + 2 + org_w + 2 + 10 + 2 + 10 + 2 + 10));
    for plan in &plans {
        println!(
            "{:<8}  {:<org_w$}  {:<10}  {:<10}  {:<10}",
            plan.id,
            plan.organization_name,
            plan.status.to_string(),
            date_cell(plan.from_date),
            date_cell(plan.to_date)
        );
    }
    Ok(())
}

fn date_cell(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}

// -----------------------------------------------------------------------
// stratplan plans show <plan-id>
// -----------------------------------------------------------------------

async fn cmd_show(client: &ApiClient, plan_id: &str) -> Result<()> {
    let plan = plan_queries::get(client, plan_id)
        .await?
        .with_context(|| format!("plan {plan_id} not found"))?;

    print_plan_header(&plan);
    println!();
    crate::validate_cmd::print_report(&plan, &validate_plan(&plan));

    if !plan.reviews.is_empty() {
        println!();
        println!("Reviews:");
        for review in &plan.reviews {
            let when = review
                .reviewed_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {when}  {}  {}: {}",
                review.status, review.evaluator_name, review.feedback
            );
        }
    }
    Ok(())
}

fn print_plan_header(plan: &PlanDocument) {
    let totals = budget_totals(plan);
    println!("Organization: {}", plan.organization_name);
    println!("Planner:      {}", plan.planner_name);
    if !plan.executive_name.is_empty() {
        println!("Executive:    {}", plan.executive_name);
    }
    if let (Some(from), Some(to)) = (plan.from_date, plan.to_date) {
        println!("Period:       {from} to {to}");
    }
    println!("Objectives:   {}", plan.objectives.len());
    println!("Activities:   {}", plan.activities().count());
    println!("Total budget: {}", format_amount(totals.total));
    println!("Funding gap:  {}", format_amount(totals.funding_gap()));
}

// -----------------------------------------------------------------------
// stratplan plans submit / approve / reject
// -----------------------------------------------------------------------

async fn cmd_submit(client: &ApiClient, plan_id: &str) -> Result<()> {
    match plan_queries::submit(client, plan_id).await {
        Ok(report) => {
            println!("Plan {plan_id} submitted for review.");
            let warnings: Vec<_> = report.warnings().collect();
            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for issue in warnings {
                    println!("  - {} at {}: {}", issue.rule, issue.path, issue.message);
                }
            }
            Ok(())
        }
        Err(ApiError::Workflow(WorkflowError::NotSubmittable { report })) => {
            eprintln!("Plan {plan_id} cannot be submitted:");
            for issue in report.blocking() {
                eprintln!("  - {} at {}: {}", issue.rule, issue.path, issue.message);
            }
            bail!(
                "plan {plan_id} has {} blocking issue(s)",
                report.blocking().count()
            );
        }
        Err(e) => Err(e).with_context(|| format!("failed to submit plan {plan_id}")),
    }
}

async fn cmd_approve(client: &ApiClient, plan_id: &str, feedback: Option<&str>) -> Result<()> {
    plan_queries::approve(client, plan_id, feedback)
        .await
        .with_context(|| format!("failed to approve plan {plan_id}"))?;
    println!("Plan {plan_id} approved.");
    Ok(())
}

async fn cmd_reject(client: &ApiClient, plan_id: &str, feedback: &str) -> Result<()> {
    plan_queries::reject(client, plan_id, feedback)
        .await
        .with_context(|| format!("failed to reject plan {plan_id}"))?;
    println!("Plan {plan_id} rejected.");
    Ok(())
}
