//! # strata CLI
//!
//! Command-line interface for the strata content-addressable blob store.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use strata_cas::{BlobStore, Scheme};
use strata_config::logging::{init_logging, LogLevel};
use strata_config::path::normalize_or_original;
use strata_config::{log_cli_debug, log_cli_info, Config};
use tracing::field::display;

mod inspect;
mod listing;

/// strata - content-addressable blob storage on a plain directory tree
#[derive(Parser)]
#[command(name = "strata")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Storage root directory (overrides config and STRATA_ROOT)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Scratch directory for in-flight uploads; must share a volume with the root
    #[arg(long, global = true)]
    scratch: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a file (or `-` for stdin) and print its identifier
    Put {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Scheme version for the new blob (1 or 2)
        #[arg(long)]
        scheme: Option<u32>,

        /// Original name to record (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Show what an identifier resolves to and whether it is stored
    Stat {
        #[arg(value_name = "ID")]
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Write stored bytes to stdout
    Cat {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// List stored identifiers in enumeration order
    Ls(listing::ListArgs),

    /// Check whether content of a given size (and hash) is stored
    HasSize {
        #[arg(value_name = "SIZE")]
        size: u64,

        /// Also require this MD5 hash
        #[arg(long)]
        hash: Option<String>,
    },

    /// Display store statistics
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    let cli = Cli::parse();
    init_logging(if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    });

    let mut config = strata_config::config().clone();
    if let Some(root) = cli.root {
        config.storage.root = root;
    }
    if let Some(scratch) = cli.scratch {
        config.storage.scratch = scratch;
    }

    run(cli.command, &config)
}

fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Put { file, scheme, name } => {
            let store = open_store(config)?;
            let scheme = Scheme::from_version(scheme.unwrap_or(config.ingest.scheme))?;
            let id = cmd_put(&store, scheme, &file, name)?;
            println!("{}", id);
            Ok(())
        }
        Commands::Stat { id, json } => inspect::stat(&open_store(config)?, &id, json),
        Commands::Cat { id } => inspect::cat(&open_store(config)?, &id),
        Commands::Ls(args) => listing::run(&open_store(config)?, args, config.list.page_size),
        Commands::HasSize { size, hash } => {
            let store = open_store(config)?;
            let present = match hash {
                Some(hash) => store.size_hash_exists(size, &hash)?,
                None => store.size_exists(size)?,
            };
            println!("{}", if present { "present" } else { "absent" });
            Ok(())
        }
        Commands::Stats { json } => inspect::stats(&open_store(config)?, json),
        Commands::Config => {
            print!("{}", config.to_toml());
            Ok(())
        }
    }
}

fn open_store(config: &Config) -> Result<BlobStore> {
    let root = config.storage.root_path();
    let scratch = config.storage.scratch_path();
    let (shown_root, shown_scratch) = (normalize_or_original(&root), normalize_or_original(&scratch));
    log_cli_debug!(
        "Opening store",
        root = display(shown_root.display()),
        scratch = display(shown_scratch.display()),
    );
    BlobStore::new(&root, &scratch)
        .with_context(|| format!("Failed to open store at {}", root.display()))
}

fn cmd_put(store: &BlobStore, scheme: Scheme, file: &Path, name: Option<String>) -> Result<String> {
    let name = name.unwrap_or_else(|| default_name(file));
    let reader: Box<dyn Read> = if file == Path::new("-") {
        Box::new(io::stdin().lock())
    } else {
        Box::new(File::open(file).with_context(|| format!("Failed to open {}", file.display()))?)
    };
    let id = store
        .put(scheme, &name, reader)
        .with_context(|| format!("Failed to ingest {}", file.display()))?;
    log_cli_info!("Stored blob", id = display(&id), scheme = display(scheme));
    Ok(id)
}

fn default_name(file: &Path) -> String {
    if file == Path::new("-") {
        return "stdin".to_string();
    }
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string())
}
