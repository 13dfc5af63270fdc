//! Template listings and the per-segment summary.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{CatalogSession, CliConfig};
use crate::query::TemplateFilter;

#[derive(Args, Debug)]
pub struct ListCommand {
    /// Only templates in this segment.
    #[arg(long)]
    segment: Option<String>,

    /// Only templates with this block type.
    #[arg(long)]
    block_type: Option<String>,

    /// Only templates from this control library.
    #[arg(long)]
    control_library: Option<String>,

    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

impl ListCommand {
    fn filter(&self) -> TemplateFilter {
        let mut filter = TemplateFilter::all();
        if let Some(segment) = &self.segment {
            filter = filter.segment(segment);
        }
        if let Some(block_type) = &self.block_type {
            filter = filter.block_type(block_type);
        }
        if let Some(library) = &self.control_library {
            filter = filter.control_library(library);
        }
        filter
    }

    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let session = CatalogSession::open(config).await?;
        let rows = session.service.list_compact(&self.filter()).await?;

        if self.json {
            let json: Vec<serde_json::Value> = rows
                .iter()
                .map(|row| {
                    serde_json::json!({
                        "id": row.id,
                        "name": row.name,
                        "block_type": row.block_type,
                        "control_library": row.control_library,
                        "depends_on": session.names_of(&row.dependencies),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
            return Ok(());
        }

        if rows.is_empty() {
            println!("No templates found.");
            return Ok(());
        }

        for row in &rows {
            let library = row.control_library.as_deref().unwrap_or("-");
            let deps = if row.dependencies.is_empty() {
                String::new()
            } else {
                format!(" → {}", session.names_of(&row.dependencies).join(", "))
            };
            println!(
                "{:<24} {:<6} {:<12}{}",
                row.name.bold(),
                row.block_type,
                library.dimmed(),
                deps
            );
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct SegmentsCommand {}

impl SegmentsCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let session = CatalogSession::open(config).await?;
        for (segment, count) in session.service.segment_counts().await? {
            let label = if segment.is_empty() {
                "(none)".to_string()
            } else {
                segment
            };
            println!("{:<24} {count}", label.cyan());
        }
        Ok(())
    }
}
