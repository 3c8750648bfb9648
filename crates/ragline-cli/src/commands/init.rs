//! Initialize the storages in the working directory.

use super::CliContext;
use anyhow::Result;
use colored::Colorize;
use ragline_ollama::OllamaClient;
use tokio::runtime::Runtime;

pub fn run(rt: &Runtime, ctx: &CliContext) -> Result<()> {
    println!("{}", "Initializing ragline...".cyan().bold());

    let engine = ctx.open_engine(rt)?;
    println!(
        "  {} Storages ready: {}",
        "✓".green(),
        engine.database_path().display()
    );

    match &ctx.config_file {
        Some(path) if path.exists() => {
            println!("  {} Config: {}", "✓".green(), path.display())
        }
        _ => println!(
            "  {} No config file, using defaults and environment",
            "○".yellow()
        ),
    }
    println!(
        "  {} LLM: {} @ {}",
        "•".dimmed(),
        ctx.config.llm.model,
        ctx.config.llm.host
    );
    println!(
        "  {} Embeddings: {} @ {} ({} dimensions)",
        "•".dimmed(),
        ctx.config.embedding.model,
        ctx.config.embedding.host,
        ctx.config.embedding.dim
    );

    check_backends(rt, ctx)?;

    println!();
    println!("{}", "Ragline initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Index files: {}", "ragline ingest ./docs".cyan());
    println!("  2. Ask questions: {}", "ragline ask \"What is ...?\"".cyan());
    println!("  3. Check status: {}", "ragline status".cyan());

    Ok(())
}

/// Report whether the configured models are served. Informational only.
fn check_backends(rt: &Runtime, ctx: &CliContext) -> Result<()> {
    let backends = [
        (&ctx.config.llm.host, &ctx.config.llm.model),
        (&ctx.config.embedding.host, &ctx.config.embedding.model),
    ];

    for (host, model) in backends {
        let client = OllamaClient::new(host.as_str())?;
        if !rt.block_on(client.is_available()) {
            println!(
                "  {} Ollama not reachable at {} (start it with 'ollama serve')",
                "○".yellow(),
                host
            );
            continue;
        }
        match rt.block_on(client.has_model(model)) {
            Ok(true) => println!("  {} Model available: {}", "✓".green(), model),
            Ok(false) => println!(
                "  {} Model missing: {} (run 'ollama pull {}')",
                "○".yellow(),
                model,
                model
            ),
            Err(e) => println!("  {} Could not list models at {}: {}", "○".yellow(), host, e),
        }
    }

    Ok(())
}
