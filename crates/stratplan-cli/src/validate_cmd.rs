//! `stratplan validate` command: run the plan rules over a plan file.

use std::path::Path;

use anyhow::{Result, bail};

use stratplan_core::model::PlanDocument;
use stratplan_core::rules::{ValidationReport, validate_plan};

/// Run the validate command. Fails when the plan has blocking issues.
pub fn run_validate(file: &Path, json: bool) -> Result<()> {
    let plan = crate::input::load_plan(file)?;
    let report = validate_plan(&plan);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&plan, &report);
    }

    let blocking = report.blocking().count();
    if blocking > 0 {
        bail!("plan {} has {blocking} blocking issue(s)", plan.id);
    }
    Ok(())
}

/// Print a validation report grouped by severity.
pub fn print_report(plan: &PlanDocument, report: &ValidationReport) {
    let blocking = report.blocking().count();
    let warnings = report.warnings().count();

    println!("Plan: {} ({})", plan.id, plan.organization_name);
    println!("Status: {}", plan.status);
    println!("Blocking issues: {blocking}");
    println!("Warnings:        {warnings}");

    if blocking > 0 {
        println!();
        println!("Blocking:");
        for issue in report.blocking() {
            println!("  - {} at {}: {}", issue.rule, issue.path, issue.message);
        }
    }
    if warnings > 0 {
        println!();
        println!("Warnings:");
        for issue in report.warnings() {
            println!("  - {} at {}: {}", issue.rule, issue.path, issue.message);
        }
    }
    if report.is_submittable() {
        println!();
        println!("Plan can be submitted.");
    }
}
