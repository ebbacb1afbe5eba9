mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod services;
mod views;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::dashboard;
use crate::cmd::ticket::{self, AddArgs, CommentArgs, ListArgs, parse_priority, parse_status};
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::domain::ticket::{Priority, Status, TicketId};
use crate::error::AppResult;
use crate::infra::object_store::ObjectStore;
use crate::infra::ticket_repo::ObjectStoreTickets;

#[derive(Parser)]
#[command(name = "helpdesk", author, version, about = "Local support ticket tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show totals, the priority breakdown and the latest tickets.
    Dashboard,
    /// List tickets as a sorted, paginated table.
    List(ListArgs),
    /// Create a ticket.
    Add(AddArgs),
    /// Show one ticket with its comments.
    Show { id: TicketId },
    /// Change a ticket's status.
    Status {
        id: TicketId,
        #[arg(value_parser = parse_status)]
        status: Status,
    },
    /// Change a ticket's priority.
    Priority {
        id: TicketId,
        #[arg(value_parser = parse_priority)]
        priority: Priority,
    },
    /// Add or delete ticket comments.
    Comment(CommentArgs),
    /// Delete a ticket.
    Delete { id: TicketId },
    /// Manage CLI configuration.
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> AppResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config(args) => config_cmd::run(args.command),
        command => run_with_store(command).await,
    }
}

async fn run_with_store(command: Commands) -> AppResult<()> {
    let config = AppConfig::load()?;
    let store = Arc::new(ObjectStore::new(
        &config.data_dir,
        &config.database,
        &config.store,
        config.schema_version,
    ));
    store.open().await?;

    let context = AppContext::new(config, Arc::new(ObjectStoreTickets::new(store.clone())));
    let outcome = dispatch(&context, command).await;
    store.close().await;
    outcome
}

async fn dispatch(ctx: &AppContext, command: Commands) -> AppResult<()> {
    match command {
        Commands::Dashboard => dashboard::run(ctx).await,
        Commands::List(args) => ticket::list(ctx, args).await,
        Commands::Add(args) => ticket::add(ctx, args).await,
        Commands::Show { id } => ticket::show(ctx, id).await,
        Commands::Status { id, status } => ticket::set_status(ctx, id, status).await,
        Commands::Priority { id, priority } => ticket::set_priority(ctx, id, priority).await,
        Commands::Comment(args) => ticket::comment(ctx, args.command).await,
        Commands::Delete { id } => ticket::delete(ctx, id).await,
        Commands::Config(args) => config_cmd::run(args.command),
    }
}
