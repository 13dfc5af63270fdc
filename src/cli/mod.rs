//! Command-line interface for the cluster catalog
//!
//! `ccat` loads a TOML catalog file into an in-memory catalog (going through the
//! same validation an API caller gets) and then inspects or edits it.
//!
//! # Commands
//!
//! - `check` - load the catalog and verify the dependency graph is acyclic
//! - `list` - list templates, optionally filtered by segment, block type or library
//! - `show` - show one template with its dependencies and parameters
//! - `tree` - print the dependency tree of a template
//! - `order` - print a template's dependencies in build order
//! - `set-deps` - replace a template's dependencies and rewrite the file
//! - `segments` - template count per segment
//!
//! # Global Options
//!
//! - `--catalog FILE` - catalog file (default `catalog.toml`, or `CCAT_CATALOG`)
//! - `--config PATH` - config file (default `~/.ccat/config.toml`, or `CCAT_CONFIG_PATH`)
//! - `--verbose` / `--quiet` - log level `debug` / errors only
//!
//! # Examples
//!
//! ```bash
//! ccat --catalog plant.toml check
//! ccat --catalog plant.toml list --segment Water
//! ccat --catalog plant.toml set-deps Pump Motor Valve
//! ```

mod check;
mod common;
mod list;
mod set_deps;
mod show;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use common::CatalogSession;

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter when `RUST_LOG` is not set.
    pub log_level: String,
    /// Explicit config file, if given.
    pub config_path: Option<PathBuf>,
    /// Catalog file to operate on.
    pub catalog_path: PathBuf,
}

/// Cluster template catalog tool.
#[derive(Parser)]
#[command(
    name = "ccat",
    about = "Cluster template catalog - inspect and edit template dependencies",
    version,
    long_about = "ccat loads a TOML catalog of cluster templates, validates their dependency \
                  graph and lets you inspect or change it."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the config file.
    #[arg(long, global = true, env = "CCAT_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Path to the catalog file.
    #[arg(long, global = true, env = "CCAT_CATALOG", default_value = "catalog.toml")]
    catalog: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the catalog and verify that its dependency graph is acyclic.
    Check(check::CheckCommand),

    /// List templates.
    List(list::ListCommand),

    /// Show a template with its dependencies and parameters.
    Show(show::ShowCommand),

    /// Print the dependency tree of a template.
    Tree(show::TreeCommand),

    /// Print a template and its dependencies in build order.
    Order(show::OrderCommand),

    /// Replace the dependencies of a template and save the catalog.
    #[command(name = "set-deps")]
    SetDeps(set_deps::SetDepsCommand),

    /// Template count per segment.
    Segments(list::SegmentsCommand),
}

impl Cli {
    /// Set up logging and run the selected command.
    ///
    /// # Errors
    ///
    /// Returns the command's error for [`crate::core::user_friendly_error`] to render.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        init_logging(&config.log_level);
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };

        CliConfig {
            log_level: log_level.to_string(),
            config_path: self.config.clone(),
            catalog_path: self.catalog.clone(),
        }
    }

    /// Run the command with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded or the command fails.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Check(cmd) => cmd.execute(&config).await,
            Commands::List(cmd) => cmd.execute(&config).await,
            Commands::Show(cmd) => cmd.execute(&config).await,
            Commands::Tree(cmd) => cmd.execute(&config).await,
            Commands::Order(cmd) => cmd.execute(&config).await,
            Commands::SetDeps(cmd) => cmd.execute(&config).await,
            Commands::Segments(cmd) => cmd.execute(&config).await,
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `default_level`.
fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
