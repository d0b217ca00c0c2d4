//! Command-line argument definitions for the omics loader.
//!
//! This module defines the CLI interface using the clap derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the omics data loader
///
/// Imports genomic flat files (GCT expression matrices, MAF mutation files,
/// tab-delimited copy-number matrices) into a typed data warehouse.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "omics-loader",
    version,
    about = "Import genomic flat files into a typed data warehouse",
    long_about = "Imports heterogeneous genomic flat files (GCT, MAF, tab-delimited matrices) \
                  as typed records, resolving gene symbols and sample names against a reference \
                  catalog and maintaining cross-references between files, datasets, subjects \
                  and samples."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Available subcommands for the omics loader
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Import a single data file (main command)
    Import(ImportArgs),
    /// Import every file in a directory as one data type
    Batch(BatchArgs),
    /// List the supported data types
    Types,
}

/// Arguments shared by the import and batch commands
#[derive(Debug, Clone, Parser)]
pub struct CommonImportArgs {
    /// Data-type label of the input (see `omics-loader types`)
    #[arg(short = 't', long = "data-type", value_name = "TYPE")]
    pub data_type: String,

    /// Dataset key (record id or short name) the file belongs to
    ///
    /// Falls back to the default dataset, auto-registered on first use.
    #[arg(short = 'd', long = "data-set", value_name = "KEY")]
    pub data_set: Option<String>,

    /// Reference gene catalog in NCBI gene_info format, loaded before the
    /// import
    #[arg(short = 'g', long = "gene-catalog", value_name = "PATH")]
    pub gene_catalog: Option<PathBuf>,

    /// Re-import files whose content has changed, deleting their prior
    /// records first
    #[arg(long = "overwrite")]
    pub overwrite: bool,

    /// Skip records that fail validation or value parsing
    #[arg(long = "skip-invalid-records")]
    pub skip_invalid_records: bool,

    /// Skip lines whose gene cannot be resolved against the catalog
    #[arg(long = "skip-invalid-genes")]
    pub skip_invalid_genes: bool,

    /// Skip columns/lines whose sample cannot be resolved
    #[arg(long = "skip-invalid-samples")]
    pub skip_invalid_samples: bool,

    /// Directory for staged temp files (defaults to the system temp dir)
    #[arg(long = "temp-dir", value_name = "PATH")]
    pub temp_dir: Option<PathBuf>,
}

/// Arguments for the import command
#[derive(Debug, Clone, Parser)]
pub struct ImportArgs {
    /// Path of the file to import
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[command(flatten)]
    pub common: CommonImportArgs,
}

/// Arguments for the batch command
#[derive(Debug, Clone, Parser)]
pub struct BatchArgs {
    /// Directory of files to import
    #[arg(value_name = "DIR")]
    pub directory: PathBuf,

    /// Only import files with this extension (eg. "gct", "maf")
    #[arg(short = 'e', long = "extension", value_name = "EXT")]
    pub extension: Option<String>,

    #[command(flatten)]
    pub common: CommonImportArgs,
}

impl CommonImportArgs {
    /// Translate the CLI flags into pipeline import options.
    pub fn import_options(&self) -> crate::config::ImportOptions {
        let mut options = crate::config::ImportOptions::default();
        options.skip_invalid_records = self.skip_invalid_records;
        options.skip_invalid_genes = self.skip_invalid_genes;
        options.skip_invalid_samples = self.skip_invalid_samples;
        if let Some(temp_dir) = &self.temp_dir {
            options.temp_dir = temp_dir.clone();
        }
        options
    }
}
