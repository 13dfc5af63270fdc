//! Verify that a catalog file loads and its dependency graph is acyclic.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{CatalogSession, CliConfig};

#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Also print the whole catalog in build order.
    #[arg(long)]
    order: bool,
}

impl CheckCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let session = CatalogSession::open(config).await?;
        let order = session.service.topological_order().await?;
        let snapshot = session.service.graph().snapshot_all().await?;

        println!(
            "{} {} templates, {} dependencies, no cycles",
            "✓".green(),
            session.index.len(),
            snapshot.edges().count()
        );

        if self.order {
            for (position, id) in order.iter().enumerate() {
                println!("{:>4}. {}", position + 1, session.name_of(*id));
            }
        }
        Ok(())
    }
}
