//! `stratplan weights` command: weight summaries from the backend for one
//! sibling set.

use anyhow::{Context, Result};

use stratplan_api::ApiClient;
use stratplan_api::queries::{activities, initiatives, measures, objectives};
use stratplan_core::model::InitiativeParent;
use stratplan_core::weight::{WeightSummary, pct};

use crate::WeightsCommands;

/// Dispatch a `WeightsCommands` variant and print the summaries it yields.
pub async fn run_weights(command: WeightsCommands, client: &ApiClient) -> Result<()> {
    match command {
        WeightsCommands::Objectives => {
            let summary = objectives::weight_summary(client)
                .await
                .context("failed to fetch objective weights")?;
            print_summary("Objectives", &summary);
        }
        WeightsCommands::Objective { id } => {
            initiative_summary(client, InitiativeParent::Objective(id)).await?;
        }
        WeightsCommands::Program { id } => {
            initiative_summary(client, InitiativeParent::Program(id)).await?;
        }
        WeightsCommands::Subprogram { id } => {
            initiative_summary(client, InitiativeParent::SubProgram(id)).await?;
        }
        WeightsCommands::Initiative { id } => {
            let measures = measures::weight_summary(client, &id)
                .await
                .with_context(|| format!("failed to fetch measure weights for initiative {id}"))?;
            let activities = activities::weight_summary(client, &id)
                .await
                .with_context(|| {
                    format!("failed to fetch activity weights for initiative {id}")
                })?;
            print_summary(&format!("Performance measures of initiative {id}"), &measures);
            println!();
            print_summary(&format!("Main activities of initiative {id}"), &activities);
        }
    }
    Ok(())
}

async fn initiative_summary(client: &ApiClient, parent: InitiativeParent) -> Result<()> {
    let label = match &parent {
        InitiativeParent::Objective(id) => format!("Initiatives of objective {id}"),
        InitiativeParent::Program(id) => format!("Initiatives of program {id}"),
        InitiativeParent::SubProgram(id) => format!("Initiatives of subprogram {id}"),
    };
    let summary = initiatives::weight_summary(client, &parent)
        .await
        .with_context(|| format!("failed to fetch weights: {label}"))?;
    print_summary(&label, &summary);
    Ok(())
}

fn print_summary(label: &str, summary: &WeightSummary) {
    println!("{label}:");
    println!("  Total:     {}%", pct(&summary.total));
    println!("  Expected:  {}%", pct(&summary.expected));
    println!("  Remaining: {}%", pct(&summary.remaining));
    let state = if summary.is_valid {
        "valid"
    } else if summary.is_over_allocated() {
        "over-allocated"
    } else {
        "incomplete"
    };
    println!("  Status:    {state}");
}
