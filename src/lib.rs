//! Omics Loader Library
//!
//! A Rust library for importing heterogeneous genomic flat files into a
//! typed data warehouse.
//!
//! This library provides tools for:
//! - Parsing GCT expression matrices, MAF mutation files, and plain
//!   tab-delimited copy-number matrices into typed records
//! - Resolving free-text gene symbols and sample names against a reference
//!   catalog with ranked fuzzy lookups
//! - Orchestrating reader/validator/writer/importer pipelines with an
//!   all-or-nothing per-file contract
//! - Detecting duplicate and changed files via content checksums
//! - Maintaining cross-references between files, datasets, subjects and
//!   samples

pub mod config;
pub mod constants;

// Core application modules
pub mod app {
    pub mod models;
    pub mod storage;
    pub mod services {
        pub mod dataset_support;
        pub mod importer;
        pub mod orchestrator;
        pub mod processor;
        pub mod readers;
        pub mod registry;
        pub mod validator;
        pub mod writer;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{DataFile, DataSet, Gene, Sample, Subject};
pub use config::{DataImportConfig, ImportOptions};

/// Result type alias for the omics loader
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for import pipeline operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Source file missing or unreadable
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Malformed input file structure
    #[error("File format error in '{file}': {message}")]
    FileFormat { file: String, message: String },

    /// Missing or invalid component wiring, detected before a run starts
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Requested data type has no registered processor
    #[error("Unsupported data type: {data_type}")]
    UnsupportedDataType { data_type: String },

    /// Dataset key resolves to no persisted DataSet record
    #[error("Unknown data set key: {key}")]
    UnknownDataSet { key: String },

    /// A gene token could not be resolved against the reference catalog
    #[error("Unable to identify gene from '{identifier}'")]
    InvalidGene { identifier: String },

    /// A sample token could not be resolved or created
    #[error("Unable to identify sample from '{name}'")]
    InvalidSample { name: String },

    /// A record failed structural validation or value parsing
    #[error("Invalid record: {message}")]
    InvalidRecord { message: String },

    /// Storage collaborator failure, never skippable
    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a file format error
    pub fn file_format(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileFormat {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unsupported data type error
    pub fn unsupported_data_type(data_type: impl Into<String>) -> Self {
        Self::UnsupportedDataType {
            data_type: data_type.into(),
        }
    }

    /// Create an unknown data set error
    pub fn unknown_data_set(key: impl Into<String>) -> Self {
        Self::UnknownDataSet { key: key.into() }
    }

    /// Create an invalid gene error
    pub fn invalid_gene(identifier: impl Into<String>) -> Self {
        Self::InvalidGene {
            identifier: identifier.into(),
        }
    }

    /// Create an invalid sample error
    pub fn invalid_sample(name: impl Into<String>) -> Self {
        Self::InvalidSample { name: name.into() }
    }

    /// Create an invalid record error
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// True when the error is skippable under the matching import option
    /// flag. Storage, I/O and configuration errors are never skippable.
    pub fn is_skippable(&self, options: &config::ImportOptions) -> bool {
        match self {
            Error::InvalidGene { .. } => options.skip_invalid_genes,
            Error::InvalidSample { .. } => options.skip_invalid_samples,
            Error::InvalidRecord { .. } => options.skip_invalid_records,
            _ => false,
        }
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidRecord {
            message: format!("record serialization failed: {}", error),
        }
    }
}
