//! Command implementations for the omics loader CLI.
//!
//! Wires the in-memory store, gene catalog, processor registry and file
//! import orchestrator, and reports outcomes to the operator. Deployments
//! embedding the library substitute persistent repositories for the
//! in-memory store.

use crate::app::services::orchestrator::{FileImportOrchestrator, ImportOutcome};
use crate::app::services::readers::load_gene_catalog;
use crate::app::services::registry::ProcessorRegistry;
use crate::app::storage::memory::InMemoryDataStore;
use crate::cli::args::{Args, BatchArgs, Commands, CommonImportArgs, ImportArgs};
use crate::config::DataImportConfig;
use crate::{Error, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// Dispatch the parsed CLI arguments.
pub fn run(args: Args) -> Result<()> {
    match args.command {
        Some(Commands::Import(import_args)) => run_import(import_args),
        Some(Commands::Batch(batch_args)) => run_batch(batch_args),
        Some(Commands::Types) => run_types(),
        None => Ok(()),
    }
}

/// Import one file and report the outcome.
fn run_import(args: ImportArgs) -> Result<()> {
    let mut orchestrator = build_orchestrator(&args.common)?;
    let outcome = orchestrator.import(
        &args.file,
        &args.common.data_type,
        args.common.data_set.as_deref(),
        args.common.overwrite,
        args.common.import_options(),
    )?;
    print_outcome(&args.file, &outcome);
    Ok(())
}

/// Import every matching file in a directory, sequentially.
fn run_batch(args: BatchArgs) -> Result<()> {
    let mut orchestrator = build_orchestrator(&args.common)?;
    let files = discover_files(&args.directory, args.extension.as_deref())?;
    if files.is_empty() {
        println!("{}", "No matching files found.".yellow());
        return Ok(());
    }

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut total_written = 0usize;
    let mut skipped_files = 0usize;
    for file in &files {
        progress.set_message(
            file.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        );
        let outcome = orchestrator.import(
            file,
            &args.common.data_type,
            args.common.data_set.as_deref(),
            args.common.overwrite,
            args.common.import_options(),
        )?;
        total_written += outcome.records_written();
        if outcome.was_skipped() {
            skipped_files += 1;
        }
        progress.inc(1);
    }
    progress.finish_with_message("done");

    println!(
        "{} {} files processed, {} records written, {} files skipped",
        "Batch complete:".green().bold(),
        files.len(),
        total_written,
        skipped_files
    );
    Ok(())
}

/// List the registered data types.
fn run_types() -> Result<()> {
    let store = InMemoryDataStore::new();
    let registry = ProcessorRegistry::with_default_processors(&store);
    println!("{}", "Available data types:".bold());
    for (data_type, description) in registry.data_type_descriptions() {
        println!("    {}  {}", data_type.as_str().cyan(), description);
    }
    Ok(())
}

fn build_orchestrator(common: &CommonImportArgs) -> Result<FileImportOrchestrator> {
    let store = InMemoryDataStore::new();
    if let Some(catalog) = &common.gene_catalog {
        let count = load_gene_catalog(catalog, store.genes.as_ref())?;
        info!("Gene catalog ready: {} records", count);
    }
    let registry = ProcessorRegistry::with_default_processors(&store);
    Ok(FileImportOrchestrator::new(
        registry,
        store.data_sets.clone(),
        store.data_files.clone(),
        store.subjects.clone(),
        DataImportConfig::default(),
    ))
}

fn discover_files(directory: &Path, extension: Option<&str>) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(Error::file_not_found(directory.display().to_string()));
    }
    let mut files: Vec<PathBuf> = WalkDir::new(directory)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| match extension {
            Some(ext) => path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case(ext)),
            None => true,
        })
        .collect();
    files.sort();
    Ok(files)
}

fn print_outcome(file: &Path, outcome: &ImportOutcome) {
    match outcome {
        ImportOutcome::Imported(summary) => {
            println!(
                "{} {} records written, {} skipped, {} samples: {}",
                "Imported:".green().bold(),
                summary.records_written,
                summary.records_skipped,
                summary.samples.len(),
                file.display()
            );
        }
        ImportOutcome::SkippedExisting => {
            println!(
                "{} file was previously imported (use --overwrite to replace): {}",
                "Skipped:".yellow().bold(),
                file.display()
            );
        }
        ImportOutcome::SkippedUnchanged => {
            println!(
                "{} file content is unchanged: {}",
                "Skipped:".yellow().bold(),
                file.display()
            );
        }
        ImportOutcome::OverwriteRefused => {
            println!(
                "{} existing records cannot be deleted for this data type: {}",
                "Overwrite refused:".red().bold(),
                file.display()
            );
        }
    }
}
