//! Ask command - question answering over the indexed documents.

use super::CliContext;
use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use ragline_ingest::IngestError;
use ragline_ollama::{OllamaError, QueryParam};
use tokio::runtime::Runtime;

pub fn run(
    rt: &Runtime,
    ctx: &CliContext,
    question: &str,
    top_k: usize,
    context_only: bool,
) -> Result<()> {
    let engine = ctx.open_engine(rt)?;
    let param = QueryParam {
        top_k,
        only_need_context: context_only,
        ..QueryParam::default()
    };

    println!("{} {}", "Question:".cyan().bold(), question);
    println!("{}", "─".repeat(70));
    println!();

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(if context_only {
        "Retrieving context..."
    } else {
        "Thinking..."
    });
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let result = rt.block_on(engine.query(question, &param));
    pb.finish_and_clear();

    let response = match result {
        Ok(response) => response,
        Err(IngestError::Ollama(OllamaError::NoContext)) => {
            println!(
                "{} No relevant content found for this question.",
                "Note:".yellow()
            );
            println!();
            println!("Suggestions:");
            println!("  • Try rephrasing your question");
            println!("  • Check that relevant files have been ingested");
            return Ok(());
        }
        Err(e) => return Err(e).context("Query failed"),
    };

    match &response.answer {
        Some(answer) => println!("{}", answer),
        None => println!("{}", response.context),
    }

    println!();
    println!("{}", "Sources".white().bold());
    for (i, source) in response.sources.iter().enumerate() {
        println!(
            "  {} {} {}",
            format!("[{}]", i + 1).dimmed(),
            source.file_path,
            format!("({:.0}% match)", source.similarity * 100.0).dimmed()
        );
    }

    Ok(())
}
