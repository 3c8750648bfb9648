//! Status command - document counts, storage sizes and pipeline state.

use super::{format_size, CliContext};
use anyhow::{Context, Result};
use colored::Colorize;
use ragline_db::Database;
use ragline_ingest::{LightRag, RagEngine};
use tokio::runtime::Runtime;

pub fn run(rt: &Runtime, ctx: &CliContext) -> Result<()> {
    // Storages only: initializing the pipeline status would clear the busy
    // flag of an ingestion running in another process.
    let engine = LightRag::from_config(&ctx.working_dir, &ctx.config)?;
    let db_path = engine.database_path();
    if !db_path.exists() {
        println!(
            "{} No storages in {}. Run 'ragline init' first.",
            "Note:".yellow().bold(),
            ctx.working_dir.display()
        );
        return Ok(());
    }
    rt.block_on(engine.initialize_storages())
        .context("Failed to open storages")?;

    println!("{}", "Ragline Status".cyan().bold());
    println!("{}", "─".repeat(50));

    let counts = engine.doc_status_counts()?;
    let count = |status: &str| counts.get(status).copied().unwrap_or(0);

    println!();
    println!("{}", "Documents".white().bold());
    println!("  {} Pending: {}", "○".yellow(), count("pending"));
    println!("  {} Processing: {}", "◐".blue(), count("processing"));
    println!("  {} Processed: {}", "●".green(), count("processed"));
    if count("failed") > 0 {
        println!("  {} Failed: {}", "✗".red(), count("failed"));
        for record in engine.failed_documents()? {
            println!(
                "      {} {}",
                record.file_path,
                record.error.unwrap_or_default().dimmed()
            );
        }
    }

    let stats = engine.stats()?;
    println!();
    println!("{}", "Storage".white().bold());
    println!("  Chunks:    {} ({} embedded)", stats.chunks, stats.vectors);
    println!("  Entities:  {}", stats.entities);
    println!("  Relations: {}", stats.relations);
    println!(
        "  Database:  {} ({})",
        db_path.display(),
        format_size(Database::file_size(&db_path)?)
    );

    let pipeline = engine.pipeline_status()?;
    println!();
    println!("{}", "Pipeline".white().bold());
    if pipeline.busy {
        println!("  {} Busy: {}", "▶".blue(), pipeline.job_name);
        if let Some(start) = pipeline.job_start {
            println!(
                "    started {}",
                start.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
            );
        }
    } else {
        println!("  {} Idle", "●".green());
    }
    if !pipeline.history_messages.is_empty() {
        println!();
        println!("{}", "Recent Activity".white().bold());
        let skip = pipeline.history_messages.len().saturating_sub(5);
        for message in &pipeline.history_messages[skip..] {
            println!("  {} {}", "•".dimmed(), message);
        }
    }

    if stats.documents == 0 {
        println!();
        println!(
            "{}",
            "No documents yet. Use 'ragline ingest <path>' to add content.".dimmed()
        );
    }

    Ok(())
}
