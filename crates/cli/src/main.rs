//! DevAssist CLI: the main entry point.
//!
//! Commands:
//! - `run`       : Execute a task through the dispatcher
//! - `route`     : Show which tool a task routes to
//! - `complexity`: Score a task
//! - `tools`     : List the available tools
//! - `memory`    : Inspect and edit the durable memory store
//! - `plan`      : Build a plan from a saved model response
//! - `config`    : Print the default or effective configuration

use clap::{Parser, Subcommand};
use devassist_config::ExecutionMode;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "devassist",
    about = "DevAssist — tool-using development assistant agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Use this config file instead of ~/.devassist/config.toml
    #[arg(short, long, global = true, env = "DEVASSIST_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a task
    Run {
        task: String,

        /// Execution mode: auto, single or multi
        #[arg(short, long)]
        mode: Option<ExecutionMode>,

        /// Override the iteration cap
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the routing decision for a task
    Route { task: String },

    /// Show the complexity score for a task
    Complexity { task: String },

    /// List available tools
    Tools {
        /// Include parameter schemas
        #[arg(long)]
        schema: bool,

        /// Only tools in this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Durable memory operations
    Memory {
        #[command(subcommand)]
        action: commands::memory::MemoryAction,
    },

    /// Build a plan offline from a saved model response
    Plan {
        /// The task being planned
        #[arg(short, long)]
        task: String,

        /// File holding the model's JSON plan response
        #[arg(short, long)]
        response: PathBuf,

        /// Optional JSON file with planning context
        #[arg(long)]
        context: Option<PathBuf>,

        /// Print the plan as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print configuration
    Config {
        /// Show the effective configuration instead of the defaults
        #[arg(long)]
        effective: bool,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run {
            task,
            mode,
            max_iterations,
            json,
        } => commands::run::run(config_path, &task, mode, max_iterations, json).await?,
        Commands::Route { task } => commands::inspect::route(config_path, &task)?,
        Commands::Complexity { task } => commands::inspect::complexity(&task)?,
        Commands::Tools { schema, category } => commands::inspect::tools(config_path, schema, category.as_deref())?,
        Commands::Memory { action } => commands::memory::run(config_path, action)?,
        Commands::Plan {
            task,
            response,
            context,
            json,
        } => commands::plan::run(config_path, &task, &response, context.as_deref(), json).await?,
        Commands::Config { effective } => commands::config_cmd::show(config_path, effective)?,
    }

    Ok(())
}
