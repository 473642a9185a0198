//! `stratplan budget` command: reconcile an activity budget and optionally
//! save it.
//!
//! The budget file names the activity, either a manual `estimated_cost` or a
//! costing `tool` with its form input, and the funding sources:
//!
//! ```json
//! {
//!   "activity": 112,
//!   "tool": { "type": "Training", "input": { "description": "...", ... } },
//!   "funding": { "government_treasury": 50000, "sdg_funding": 31000 }
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;

use stratplan_api::ApiClient;
use stratplan_api::queries::activities;
use stratplan_core::assemble::format_amount;
use stratplan_core::budget::{BudgetDraft, BudgetSummary, FundingSources, FundingStatus};
use stratplan_core::costing::{CostAssumptions, calculate_json};
use stratplan_core::model::{ActivityType, lenient};

#[derive(Debug, Deserialize)]
pub struct BudgetFile {
    #[serde(alias = "activity", deserialize_with = "lenient::identifier")]
    pub activity_id: String,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub estimated_cost: Option<f64>,
    #[serde(default)]
    pub activity_type: Option<ActivityType>,
    #[serde(default)]
    pub tool: Option<ToolInput>,
    #[serde(default)]
    pub funding: FundingSources,
}

#[derive(Debug, Deserialize)]
pub struct ToolInput {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub input: Value,
}

/// Turn a budget file into a draft, running the costing tool if one is named.
pub fn draft_from(file: BudgetFile, rates: &CostAssumptions) -> Result<BudgetDraft> {
    let draft = match (file.tool, file.estimated_cost) {
        (Some(tool), None) => {
            let calculation = calculate_json(tool.activity_type, tool.input, rates)
                .with_context(|| format!("{} costing failed", tool.activity_type))?;
            BudgetDraft::with_tool(file.activity_id, calculation)
        }
        (None, Some(cost)) => {
            let draft = BudgetDraft::without_tool(file.activity_id, cost);
            match file.activity_type {
                Some(activity_type) => draft.activity_type(activity_type),
                None => draft,
            }
        }
        (Some(_), Some(_)) => bail!("budget file sets both `tool` and `estimated_cost`"),
        (None, None) => bail!("budget file needs either `tool` or `estimated_cost`"),
    };
    Ok(draft.funding(file.funding))
}

/// Run the budget command. With `client`, the reconciled budget is saved.
pub async fn run_budget(
    file: &Path,
    rates: &CostAssumptions,
    client: Option<&ApiClient>,
) -> Result<()> {
    let value = crate::input::read_json(file)?;
    let budget_file: BudgetFile = serde_json::from_value(value)
        .with_context(|| format!("invalid budget file {}", file.display()))?;
    let activity_id = budget_file.activity_id.clone();
    let draft = draft_from(budget_file, rates)?;

    let summary = draft.summary();
    print_summary(&activity_id, &summary);
    summary.check()?;

    if let Some(client) = client {
        let saved = activities::update_budget(client, draft)
            .await
            .with_context(|| format!("failed to save budget for activity {activity_id}"))?;
        println!();
        match saved.id {
            Some(id) => println!("Budget {id} saved for activity {}.", saved.activity_id),
            None => println!("Budget saved for activity {}.", saved.activity_id),
        }
    }
    Ok(())
}

fn print_summary(activity_id: &str, summary: &BudgetSummary) {
    println!("Activity:           {activity_id}");
    println!("Calculation:        {}", summary.calculation_type);
    println!("Estimated cost:     {}", format_amount(summary.estimated_cost));
    println!();
    println!("Funding:");
    println!("  Treasury:         {}", format_amount(summary.sources.government_treasury));
    println!("  SDG:              {}", format_amount(summary.sources.sdg_funding));
    println!("  Partners:         {}", format_amount(summary.sources.partners_funding));
    println!("  Other:            {}", format_amount(summary.sources.other_funding));
    println!("  Total:            {}", format_amount(summary.total_funding));
    println!();
    match summary.status() {
        FundingStatus::Balanced => println!("Fully funded."),
        FundingStatus::Deficit(gap) => println!("Funding gap:        {}", format_amount(gap)),
        FundingStatus::Surplus(excess) => {
            println!("Over-funded by:     {}", format_amount(excess))
        }
    }
}
