//! Replace the dependencies of one template and write the catalog back.
//!
//! The new set goes through the same validation as any other caller: unknown
//! names and cycles are rejected and the file is left untouched.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tracing::info;

use super::{CatalogSession, CliConfig};
use crate::catalog_file::resolve_names;
use crate::core::CatalogError;

#[derive(Args, Debug)]
pub struct SetDepsCommand {
    /// Template whose dependencies are replaced.
    name: String,

    /// New dependencies (none clears them).
    dependencies: Vec<String>,

    /// Validate only, do not write the catalog.
    #[arg(long)]
    dry_run: bool,
}

impl SetDepsCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let mut session = CatalogSession::open(config).await?;
        let id = session.id_of(&self.name)?;
        let deps = resolve_names(&session.index, &self.dependencies)?;

        let change = match session.service.set_dependencies(id, &deps).await {
            Ok(change) => change,
            Err(CatalogError::CycleDetected {
                path,
            }) => {
                let names = session.names_of(&path).join(" → ");
                return Err(anyhow::Error::from(CatalogError::CycleDetected {
                    path,
                })
                .context(format!("Cycle: {names}")));
            }
            Err(e) => return Err(e.into()),
        };

        if !change.changed {
            println!("{} dependencies of {} unchanged", "✓".green(), self.name.bold());
            return Ok(());
        }

        let mut names = session.names_of(&change.dependencies);
        names.sort();
        if self.dry_run {
            println!("{} {} → [{}] (dry run)", "✓".green(), self.name.bold(), names.join(", "));
            return Ok(());
        }

        session.file.set_depends_on(&self.name, names.clone())?;
        session
            .file
            .save(&config.catalog_path)
            .await
            .with_context(|| format!("Failed to update dependencies of '{}'", self.name))?;
        info!("Wrote {}", config.catalog_path.display());

        println!("{} {} → [{}]", "✓".green(), self.name.bold(), names.join(", "));
        Ok(())
    }
}
