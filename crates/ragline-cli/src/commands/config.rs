//! Configuration commands.

use super::CliContext;
use anyhow::{Context, Result};
use colored::Colorize;
use ragline_config::{env, Config};

pub fn show(ctx: &CliContext) -> Result<()> {
    println!("{}", "Current Configuration".cyan().bold());
    println!("{}", "─".repeat(50));

    match &ctx.config_file {
        Some(path) if path.exists() => println!("File: {}", path.display()),
        Some(path) => println!("File: {} {}", path.display(), "(not created)".dimmed()),
        None => println!("File: {}", "(no config directory)".dimmed()),
    }

    let overrides: Vec<&str> = env::ALL
        .iter()
        .copied()
        .filter(|var| std::env::var(var).is_ok())
        .collect();
    if !overrides.is_empty() {
        println!("Environment overrides: {}", overrides.join(", "));
    }
    println!("Working directory: {}", ctx.working_dir.display());
    println!();

    let contents = ctx
        .config
        .to_toml_string()
        .context("Failed to render configuration")?;
    println!("{}", contents);

    Ok(())
}

pub fn init(ctx: &CliContext, force: bool) -> Result<()> {
    let path = ctx
        .config_file
        .as_ref()
        .context("Could not determine a config file location; pass --config")?;

    if path.exists() && !force {
        println!(
            "{} Config already exists: {} (use --force to overwrite)",
            "Note:".yellow().bold(),
            path.display()
        );
        return Ok(());
    }

    Config::default()
        .save_to(path)
        .context("Failed to write config file")?;
    println!("{} Wrote {}", "✓".green(), path.display());

    Ok(())
}
