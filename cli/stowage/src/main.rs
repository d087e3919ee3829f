//! Stowage CLI: load bundled modules and inspect the disk cache.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stowage", version, about = "Load bundled modules through a content-verified cache")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load one module from a bundle directory and resolve it by identity
    Load {
        /// Resource id inside the bundle (e.g., MyApp.libzero.so)
        resource: String,
        /// Cache file name used if the module must load from disk
        file_name: String,
        /// Bundle directory holding one file per resource id
        #[arg(long)]
        bundle: PathBuf,
        /// Cache directory (default: platform temp directory)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        /// Skip the in-memory attempt and go straight to disk
        #[arg(long)]
        no_memory: bool,
    },
    /// Load every module listed in stowage.toml
    Run {
        /// Config file (default: search upward for stowage.toml)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output format (human, json)
        #[arg(long)]
        format: Option<String>,
    },
    /// Print the content digest of a file
    Digest {
        /// File to hash
        path: PathBuf,
    },
    /// Show the cache path and cached digest for a file name
    Cache {
        /// Cache file name
        file_name: String,
        /// Cache directory (default: platform temp directory)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// List resources in a bundle directory
    Resources {
        /// Bundle directory
        #[arg(long)]
        bundle: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Load {
            resource,
            file_name,
            bundle,
            cache_dir,
            no_memory,
        } => commands::load::run(&resource, &file_name, &bundle, cache_dir, !no_memory),

        Commands::Run { config, format } => {
            let cwd = std::env::current_dir()?;
            commands::run::run(&cwd, config.as_deref(), format.as_deref())
        }

        Commands::Digest { path } => commands::digest::run(&path),

        Commands::Cache {
            file_name,
            cache_dir,
        } => commands::cache::run(&file_name, cache_dir),

        Commands::Resources { bundle } => commands::resources::run(&bundle),
    }
}
