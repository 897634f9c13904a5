//! Intrigue CLI - cron triggers, workflow runs and approval actions for the
//! Bitcoin Intrigue content pipeline.
//!
//! Reuses the same core services (intrigue-core) and server bootstrap
//! (intrigue-server) that back the HTTP API.

mod commands;

use clap::{Parser, Subcommand};

/// Bitcoin Intrigue content pipeline
#[derive(Parser)]
#[command(name = "intrigue", version, about = "Bitcoin Intrigue content pipeline")]
pub struct Cli {
    /// Path to the SQLite database file
    #[arg(long, env = "INTRIGUE_DB_PATH", default_value = "intrigue.db")]
    db: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP backend server
    Server {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(long, default_value_t = 3210)]
        port: u16,
    },

    /// Run a cron trigger once, as the external scheduler would
    Cron {
        #[command(subcommand)]
        action: CronAction,
    },

    /// Inspect schedules and cron expressions
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },

    /// Import and run workflows
    Workflow {
        #[command(subcommand)]
        action: WorkflowAction,
    },

    /// Review and publish issues
    Issue {
        #[command(subcommand)]
        action: IssueAction,
    },
}

#[derive(Subcommand)]
enum CronAction {
    /// Run every schedule that is due now
    RunSchedule,
    /// Publish queued X posts whose time has come
    PostToX,
}

#[derive(Subcommand)]
enum ScheduleAction {
    /// List all schedules
    List,
    /// Check a cron expression and show its next fire times
    Validate {
        /// Five-field cron expression, e.g. "0 6 * * *"
        expression: String,
        /// IANA timezone the expression is evaluated in
        #[arg(long, default_value = "UTC")]
        timezone: String,
        /// How many upcoming fire times to show
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
}

#[derive(Subcommand)]
enum WorkflowAction {
    /// List stored workflows
    List,
    /// Upsert agents and workflows from a YAML file
    Import {
        /// Path to the YAML bundle
        file: String,
    },
    /// Run a stored workflow now and store the issue it produces
    Run {
        /// Workflow ID
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
enum IssueAction {
    /// List issues
    List {
        /// Filter by approval status: pending_review, approved, rejected
        #[arg(long)]
        approval_status: Option<String>,
    },
    /// Approve an issue waiting for review
    Approve {
        /// Issue ID
        #[arg(long)]
        id: String,
        /// Who approved it
        #[arg(long, default_value = "cli")]
        by: String,
    },
    /// Reject an issue waiting for review
    Reject {
        /// Issue ID
        #[arg(long)]
        id: String,
        /// Why it was rejected
        #[arg(long)]
        reason: String,
    },
    /// Publish an approved issue
    Publish {
        /// Issue ID
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() {
    commands::load_dotenv();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help().ok();
        println!();
        return;
    };

    // The server installs its own subscriber.
    if !matches!(command, Commands::Server { .. }) {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "intrigue_core=info,intrigue_cli=info".into()),
            )
            .init();
    }

    let result = match command {
        Commands::Server { host, port } => commands::server::run(host, port, cli.db).await,

        Commands::Cron { action } => {
            let state = commands::init_state(&cli.db).await;
            match action {
                CronAction::RunSchedule => commands::cron::run_schedule(&state).await,
                CronAction::PostToX => commands::cron::post_to_x(&state).await,
            }
        }

        Commands::Schedule { action } => match action {
            ScheduleAction::List => {
                let state = commands::init_state(&cli.db).await;
                commands::schedule::list(&state).await
            }
            ScheduleAction::Validate {
                expression,
                timezone,
                count,
            } => commands::schedule::validate(&expression, &timezone, count),
        },

        Commands::Workflow { action } => {
            let state = commands::init_state(&cli.db).await;
            match action {
                WorkflowAction::List => commands::workflow::list(&state).await,
                WorkflowAction::Import { file } => commands::workflow::import(&state, &file).await,
                WorkflowAction::Run { id } => commands::workflow::run(&state, &id).await,
            }
        }

        Commands::Issue { action } => {
            let state = commands::init_state(&cli.db).await;
            match action {
                IssueAction::List { approval_status } => {
                    commands::issue::list(&state, approval_status.as_deref()).await
                }
                IssueAction::Approve { id, by } => commands::issue::approve(&state, &id, &by).await,
                IssueAction::Reject { id, reason } => commands::issue::reject(&state, &id, &reason).await,
                IssueAction::Publish { id } => commands::issue::publish(&state, &id).await,
            }
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
