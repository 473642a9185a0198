mod budget_cmd;
mod config;
mod connect;
mod cost_cmd;
mod export_cmd;
mod input;
mod plan_cmds;
mod report_cmd;
mod validate_cmd;
mod weights_cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use stratplan_api::ApiConfig;
use stratplan_core::assemble::ExportFormat;
use stratplan_core::model::{ActivityType, PlanStatus};

use config::StratplanConfig;

#[derive(Parser)]
#[command(name = "stratplan", about = "Strategic plan weighting, costing and review")]
struct Cli {
    /// Backend API URL (overrides STRATPLAN_API_URL env var)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// TOML file overriding the default cost rates
    #[arg(long, global = true)]
    rates: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a stratplan config file
    Init {
        /// Backend API URL
        #[arg(long, default_value = ApiConfig::DEFAULT_URL)]
        url: String,
        /// Username to log in with (the password comes from STRATPLAN_PASSWORD)
        #[arg(long)]
        username: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Check a plan file against the submission rules
    Validate {
        /// Plan JSON file, as served by the backend
        file: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a costing tool over a form input file
    Cost {
        /// Activity type: Training, Meeting, Workshop, Supervision, Procurement, Printing
        activity_type: ActivityType,
        /// Form input JSON file
        file: PathBuf,
    },
    /// Reconcile an activity budget against its funding sources
    Budget {
        /// Budget JSON file
        file: PathBuf,
        /// Save the budget to the backend
        #[arg(long)]
        save: bool,
    },
    /// Export a plan file as a table
    Export {
        /// Plan JSON file
        file: PathBuf,
        /// Output format: xlsx, pdf-text, csv, json
        #[arg(long, default_value = "xlsx")]
        format: ExportFormat,
        /// Output file path (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show budget totals and funding for a plan file
    Report {
        /// Plan JSON file
        file: PathBuf,
    },
    /// Plan review on the backend
    Plans {
        #[command(subcommand)]
        command: PlansCommands,
    },
    /// Weight summaries from the backend
    Weights {
        #[command(subcommand)]
        command: WeightsCommands,
    },
}

#[derive(Subcommand)]
pub enum PlansCommands {
    /// List plans
    List {
        /// Only plans in this status (DRAFT, SUBMITTED, APPROVED, REJECTED)
        #[arg(long)]
        status: Option<PlanStatus>,
        /// Only plans waiting for review
        #[arg(long, conflicts_with = "status")]
        pending: bool,
    },
    /// Show plan details and validation
    Show {
        /// Plan ID
        plan_id: String,
    },
    /// Submit a draft plan for review
    Submit {
        /// Plan ID
        plan_id: String,
    },
    /// Approve a submitted plan
    Approve {
        /// Plan ID
        plan_id: String,
        /// Optional reviewer feedback
        #[arg(long)]
        feedback: Option<String>,
    },
    /// Reject a submitted plan
    Reject {
        /// Plan ID
        plan_id: String,
        /// Reason for rejection
        #[arg(long)]
        feedback: String,
    },
}

#[derive(Subcommand)]
pub enum WeightsCommands {
    /// Strategic objectives
    Objectives,
    /// Initiatives under an objective
    Objective { id: String },
    /// Initiatives under a program
    Program { id: String },
    /// Initiatives under a subprogram
    Subprogram { id: String },
    /// Performance measures and main activities of an initiative
    Initiative { id: String },
}

/// Execute the `stratplan init` command: write config file.
fn cmd_init(url: &str, username: Option<String>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        api: config::ApiSection {
            url: url.trim_end_matches('/').to_string(),
        },
        auth: config::AuthSection {
            username: username.clone(),
        },
    };

    let path = config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  api.url = {}", cfg.api.url);
    if let Some(username) = username {
        println!("  auth.username = {username}");
        println!();
        println!("Set {} to log in for remote commands.", config::PASSWORD_ENV);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            url,
            username,
            force,
        } => {
            cmd_init(&url, username, force)?;
        }
        Commands::Validate { file, json } => {
            validate_cmd::run_validate(&file, json)?;
        }
        Commands::Cost {
            activity_type,
            file,
        } => {
            let rates = input::load_rates(cli.rates.as_deref())?;
            cost_cmd::run_cost(activity_type, &file, &rates)?;
        }
        Commands::Budget { file, save } => {
            let rates = input::load_rates(cli.rates.as_deref())?;
            let client = if save {
                let resolved = StratplanConfig::resolve(cli.api_url.as_deref())?;
                Some(connect::connect(&resolved).await?)
            } else {
                None
            };
            budget_cmd::run_budget(&file, &rates, client.as_ref()).await?;
        }
        Commands::Export {
            file,
            format,
            output,
        } => {
            export_cmd::run_export(&file, format, output.as_deref())?;
        }
        Commands::Report { file } => {
            report_cmd::run_report(&file)?;
        }
        Commands::Plans { command } => {
            let resolved = StratplanConfig::resolve(cli.api_url.as_deref())?;
            let client = connect::connect(&resolved).await?;
            plan_cmds::run_plans_command(command, &client).await?;
        }
        Commands::Weights { command } => {
            let resolved = StratplanConfig::resolve(cli.api_url.as_deref())?;
            let client = connect::connect(&resolved).await?;
            weights_cmd::run_weights(command, &client).await?;
        }
    }

    Ok(())
}
