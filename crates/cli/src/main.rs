//! UHPM CLI: the main entry point.
//!
//! Commands:
//! - `serve`   Start the HTTP gateway
//! - `run`     One reason / dispatch pipeline run
//! - `plan`    Planner only
//! - `memory`  Search, add to and inspect the memory store
//! - `doctor`  Diagnose configuration
//! - `onboard` Write a starter config

use clap::{Parser, Subcommand};

mod commands;

use commands::run::RunArgs;

#[derive(Parser)]
#[command(
    name = "uhpm",
    about = "UHPM: marketing agent pipeline",
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
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Classify a task, dispatch it and print the result as JSON
    Run(RunArgs),

    /// Print which capabilities a task needs
    Plan {
        #[arg(short, long)]
        task: String,
    },

    /// Memory store commands
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },

    /// Diagnose configuration and storage
    Doctor,

    /// Initialize configuration
    Onboard,
}

#[derive(Subcommand)]
enum MemoryCommands {
    /// Nearest records to a text
    Search {
        query: String,
        #[arg(short, long, default_value_t = 3)]
        k: usize,
    },

    /// Append a record
    Add {
        text: String,
        /// Tag as key=value (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Backend and record count
    Stats,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so `run` and `plan` output stays parseable.
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Run(args) => commands::run::run(args).await?,
        Commands::Plan { task } => commands::plan::run(task).await?,
        Commands::Memory { command } => match command {
            MemoryCommands::Search { query, k } => commands::memory::search(&query, k).await?,
            MemoryCommands::Add { text, tags } => commands::memory::add(&text, &tags).await?,
            MemoryCommands::Stats => commands::memory::stats().await?,
        },
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn memory_search_defaults_k() {
        let cli = Cli::parse_from(["uhpm", "memory", "search", "cold bottles"]);
        match cli.command {
            Commands::Memory {
                command: MemoryCommands::Search { query, k },
            } => {
                assert_eq!(query, "cold bottles");
                assert_eq!(k, 3);
            }
            _ => panic!("expected memory search"),
        }
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::parse_from(["uhpm", "doctor", "--verbose", "--json-logs"]);
        assert!(cli.verbose && cli.json_logs);
    }
}
