use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

use etherith::cli::add::AddOptions;
use etherith::cli::{add, check, credentials, init, list, search, stats, OutputFormat};
use etherith::config::Config;

#[derive(Parser)]
#[command(name = "etherith")]
#[command(version, about = "Preserve files permanently on IPFS with a searchable local index")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "etherith.yaml")]
    config: String,

    /// Vault root directory (defaults to the current directory)
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    /// More diagnostics on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a vault
    Init {
        /// Vault name (defaults to the directory name)
        name: Option<String>,

        /// Reinitialize an existing vault; archived records are kept
        #[arg(long)]
        force: bool,
    },

    /// Preserve a file
    Add {
        /// Path to the file to archive
        file: PathBuf,

        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,

        /// Custom title
        #[arg(long)]
        title: Option<String>,

        /// Custom description
        #[arg(long)]
        description: Option<String>,
    },

    /// Search archived files by keyword
    Search {
        /// Matched against filename, title, description and tags
        query: String,

        /// Maximum number of results
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        limit: Option<u64>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// List every archived file, most recent first
    List {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Show vault statistics
    Stats,

    /// Store pinning-service credentials for direct uploads
    Credentials {
        #[arg(long)]
        api_key: String,

        #[arg(long)]
        secret_key: String,
    },

    /// Test the connection to the pinning service
    Check,
}

fn init_logging(config: &Config, verbose: u8) {
    let configured = config.logging.level.parse().unwrap_or(Level::WARN);
    let requested = match verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(configured.max(requested))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config
    let config = Config::load(&cli.config)?;
    init_logging(&config, cli.verbose);

    let root = match cli.vault {
        Some(path) => path,
        None => std::env::current_dir().context("resolving current directory")?,
    };

    match cli.command {
        Commands::Init { name, force } => {
            init::run(&root, name.as_deref(), force)?;
        }
        Commands::Add {
            file,
            tags,
            title,
            description,
        } => {
            let options = AddOptions {
                title,
                description,
                tags,
            };
            add::run(&root, &config, &file, &options)?;
        }
        Commands::Search {
            query,
            limit,
            format,
        } => {
            let limit = limit.map(usize::try_from).transpose()?;
            search::run(&root, &config, &query, limit, format)?;
        }
        Commands::List { format } => {
            list::run(&root, format)?;
        }
        Commands::Stats => {
            stats::run(&root)?;
        }
        Commands::Credentials {
            api_key,
            secret_key,
        } => {
            credentials::set(&root, &api_key, &secret_key)?;
        }
        Commands::Check => {
            check::run(&root, &config)?;
        }
    }

    Ok(())
}
