//! `stratplan report` command: budget totals and funding for a plan file.

use std::path::Path;

use anyhow::Result;

use stratplan_core::assemble::{budget_totals, format_amount};
use stratplan_core::model::PlanDocument;

/// Run the report command.
pub fn run_report(file: &Path) -> Result<()> {
    let plan = crate::input::load_plan(file)?;
    print_report(&plan);
    Ok(())
}

fn print_report(plan: &PlanDocument) {
    println!("Plan: {} ({})", plan.id, plan.organization_name);
    println!("Status: {}", plan.status);
    if let (Some(from), Some(to)) = (plan.from_date, plan.to_date) {
        println!("Period: {from} to {to}");
    }
    println!();

    println!(
        "{:<30} {:<14} {:>14} {:>14} {:>14}",
        "ACTIVITY", "METHOD", "COST", "FUNDING", "GAP"
    );
    println!("{}", "-".repeat(90));

    let mut activities = 0usize;
    for activity in plan.activities() {
        activities += 1;
        let name = if activity.name.chars().count() > 28 {
            let short: String = activity.name.chars().take(25).collect();
            format!("{short}...")
        } else {
            activity.name.clone()
        };
        match &activity.budget {
            Some(budget) => {
                let summary = budget.summary();
                println!(
                    "{:<30} {:<14} {:>14} {:>14} {:>14}",
                    name,
                    summary.calculation_type.to_string(),
                    format_amount(summary.estimated_cost),
                    format_amount(summary.total_funding),
                    format_amount(summary.funding_gap)
                );
            }
            None => println!("{name:<30} {:<14} {:>14} {:>14} {:>14}", "-", "-", "-", "-"),
        }
    }

    let totals = budget_totals(plan);
    println!();
    println!(
        "Budgeted activities: {}/{activities}",
        totals.activities_with_budget
    );
    println!("Total cost:          {}", format_amount(totals.total));
    println!("  Treasury:          {}", format_amount(totals.funding.government_treasury));
    println!("  SDG:               {}", format_amount(totals.funding.sdg_funding));
    println!("  Partners:          {}", format_amount(totals.funding.partners_funding));
    println!("  Other:             {}", format_amount(totals.funding.other_funding));
    println!("Total funding:       {}", format_amount(totals.total_funding()));
    println!("Funding gap:         {}", format_amount(totals.funding_gap()));
}
