//! Single-template views: details, dependency tree and build order.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{CatalogSession, CliConfig};

#[derive(Args, Debug)]
pub struct ShowCommand {
    /// Template name.
    name: String,
}

impl ShowCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let session = CatalogSession::open(config).await?;
        let detail = session.detail(&self.name).await?;
        let template = &detail.template;

        println!("{} (#{})", template.name.cyan().bold(), template.id);
        println!("  segment:    {}", template.segment);
        println!("  block type: {}", template.block_type);
        if let Some(library) = &template.control_library {
            println!("  library:    {library}");
        }
        if template.protected {
            println!("  {}", "protected".yellow());
        }

        if detail.dependencies.is_empty() {
            println!("  depends on: -");
        } else {
            println!("  depends on: {}", session.names_of(&detail.dependencies).join(", "));
        }

        let parameters = session.service.list_parameters(template.id).await?;
        println!("  parameters: {}", template.parameter_count);
        for parameter in parameters {
            let value = parameter.assignment_value.as_deref().unwrap_or("");
            println!("    {:<20} {:<8} {}", parameter.name, parameter.kind, value.dimmed());
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct TreeCommand {
    /// Root template name.
    name: String,
}

impl TreeCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let session = CatalogSession::open(config).await?;
        let id = session.id_of(&self.name)?;
        print!("{}", session.service.dependency_tree(id).await?);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct OrderCommand {
    /// Template name.
    name: String,
}

impl OrderCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let session = CatalogSession::open(config).await?;
        let id = session.id_of(&self.name)?;
        for name in session.names_of(&session.service.dependency_order(id).await?) {
            println!("{name}");
        }
        Ok(())
    }
}
