//! `stratplan cost` command: run a costing tool over a JSON form input.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Value, json};

use stratplan_core::costing::{CostAssumptions, CostCalculation, calculate_json};
use stratplan_core::model::ActivityType;

/// Run the cost command and print the result as JSON.
pub fn run_cost(activity_type: ActivityType, file: &Path, rates: &CostAssumptions) -> Result<()> {
    let input = crate::input::read_json(file)?;
    let calculation = calculate_json(activity_type, input, rates)
        .with_context(|| format!("{activity_type} costing failed"))?;
    println!("{}", serde_json::to_string_pretty(&calculation_json(&calculation))?);
    Ok(())
}

/// The tool result as it is stored on a budget.
pub fn calculation_json(calculation: &CostCalculation) -> Value {
    let mut out = json!({
        "activity_type": calculation.activity_type,
        "total_budget": calculation.total_budget,
    });
    out[calculation.detail.detail_field()] = calculation.detail.to_value();
    out
}
