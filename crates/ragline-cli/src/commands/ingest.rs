//! Ingest command implementation.

use super::CliContext;
use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use ragline_ingest::{index_data, index_file};
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use walkdir::{DirEntry, WalkDir};

/// Ingest a single file or every file under a directory.
pub fn run(rt: &Runtime, ctx: &CliContext, path: &Path) -> Result<()> {
    let engine = ctx.open_engine(rt)?;

    if !path.is_dir() {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.set_message(format!("Ingesting {}", path.display()));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        let result = rt.block_on(index_file(&engine, path));
        pb.finish_and_clear();
        result.with_context(|| format!("Failed to ingest {}", path.display()))?;

        println!("{} {}", "Ingested:".green().bold(), path.display());
        return Ok(());
    }

    println!("{} {}", "Scanning:".cyan(), path.display());
    let files = collect_files(path, &ctx.working_dir);

    if files.is_empty() {
        println!("{}", "No files found.".yellow());
        return Ok(());
    }
    println!("Found {} files", files.len());

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut success = 0;
    let mut failures: Vec<(PathBuf, String)> = Vec::new();

    for file in &files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        pb.set_message(name);

        match rt.block_on(index_data(&engine, file)) {
            Ok(()) => success += 1,
            Err(e) => failures.push((file.clone(), e.to_string())),
        }

        pb.inc(1);
    }

    pb.finish_and_clear();

    println!("\n{} {} files", "Ingested:".green().bold(), success);
    if !failures.is_empty() {
        println!("{} {} files", "Failed:".red().bold(), failures.len());
        for (file, error) in &failures {
            println!("  {} {}", "✗".red(), file.display());
            println!("    {}", error.dimmed());
        }
    }

    Ok(())
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

/// Regular, non-hidden files under `root`, skipping hidden directories and
/// the engine's own `working_dir`.
fn collect_files(root: &Path, working_dir: &Path) -> Vec<PathBuf> {
    let storage = std::fs::canonicalize(working_dir).ok();
    let is_storage = |entry: &DirEntry| {
        entry.file_type().is_dir()
            && storage.is_some()
            && std::fs::canonicalize(entry.path()).ok() == storage
    };

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !(is_hidden(e) || is_storage(e)))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(DirEntry::into_path)
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_collect_files_skips_hidden() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join(".secret"), "s").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b.md"), "b").unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/config"), "c").unwrap();

        let files = collect_files(dir.path(), &dir.path().join("rag_storage"));

        assert_eq!(
            files,
            vec![dir.path().join("a.txt"), dir.path().join("sub/b.md")]
        );
    }

    #[test]
    fn test_collect_files_skips_working_dir() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "n").unwrap();
        std::fs::create_dir(dir.path().join("rag_storage")).unwrap();
        std::fs::write(dir.path().join("rag_storage/ragline.db"), [0xff, 0xfe]).unwrap();

        let relative = dir.path().join("sub/../rag_storage");
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let files = collect_files(dir.path(), &relative);

        assert_eq!(files, vec![dir.path().join("notes.txt")]);
    }
}
