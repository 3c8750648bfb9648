//! Ragline CLI - index local text files and ask questions about them.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::CliContext;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ragline - a local graph-and-vector index over your text files
#[derive(Parser)]
#[command(name = "ragline")]
#[command(author = "Lalo Morales <lalomorales22@github.com>")]
#[command(version)]
#[command(about = "Index text files into a local knowledge graph and vector store", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding the engine storages
    #[arg(
        short,
        long,
        global = true,
        env = "RAGLINE_WORKING_DIR",
        default_value = ragline_ingest::DEFAULT_WORKING_DIR
    )]
    working_dir: PathBuf,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the storages in the working directory
    Init,

    /// Index a file, or every file under a directory
    Ingest {
        /// Path to a file or directory
        path: PathBuf,
    },

    /// Ask a question about the indexed documents
    Ask {
        /// Your question
        question: String,

        /// Maximum number of chunks to retrieve
        #[arg(short = 'k', long, default_value_t = 10)]
        top_k: usize,

        /// Print the retrieved context instead of generating an answer
        #[arg(long)]
        context_only: bool,
    },

    /// Show document and pipeline status
    Status,

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ragline=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ragline=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = CliContext::load(cli.working_dir, cli.config)?;

    // One runtime for the whole invocation; commands drive it with block_on.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;

    match cli.command {
        Commands::Init => commands::init::run(&runtime, &ctx),
        Commands::Ingest { path } => commands::ingest::run(&runtime, &ctx, &path),
        Commands::Ask {
            question,
            top_k,
            context_only,
        } => commands::ask::run(&runtime, &ctx, &question, top_k, context_only),
        Commands::Status => commands::status::run(&runtime, &ctx),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(&ctx),
            ConfigCommands::Init { force } => commands::config::init(&ctx, force),
        },
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
