//! Configuration for import pipeline runs.
//!
//! Provides the per-run skip/fail policy flags consulted by every pipeline
//! component, and the global defaults used by the file import orchestrator
//! when no explicit dataset is named.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Immutable-per-run skip/fail policy for malformed input.
///
/// Every pipeline component that can encounter malformed input consults
/// this object rather than hard-coding behavior. Flags are evaluated per
/// offending item, not once per file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Skip records with unparseable values instead of failing the run
    pub skip_invalid_records: bool,

    /// Skip lines whose gene token cannot be resolved against the catalog
    pub skip_invalid_genes: bool,

    /// Skip columns/lines whose sample cannot be resolved or created
    pub skip_invalid_samples: bool,

    /// Skip records referencing unresolvable dataset metadata
    pub skip_invalid_data_sets: bool,

    /// Directory for staged temp files written by temp-file writers
    pub temp_dir: PathBuf,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            skip_invalid_records: false,
            skip_invalid_genes: false,
            skip_invalid_samples: false,
            skip_invalid_data_sets: false,
            temp_dir: std::env::temp_dir(),
        }
    }
}

impl ImportOptions {
    /// Enable skipping of invalid records
    pub fn with_skip_invalid_records(mut self) -> Self {
        self.skip_invalid_records = true;
        self
    }

    /// Enable skipping of unresolvable genes
    pub fn with_skip_invalid_genes(mut self) -> Self {
        self.skip_invalid_genes = true;
        self
    }

    /// Enable skipping of unresolvable samples
    pub fn with_skip_invalid_samples(mut self) -> Self {
        self.skip_invalid_samples = true;
        self
    }

    /// Enable skipping of unresolvable dataset metadata
    pub fn with_skip_invalid_data_sets(mut self) -> Self {
        self.skip_invalid_data_sets = true;
        self
    }

    /// Set the staged temp file directory
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }
}

/// Global defaults for the file import orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataImportConfig {
    /// Short name of the dataset used when no dataset key is supplied;
    /// auto-registered on first use
    pub default_data_set_short_name: String,

    /// Display name given to the auto-registered default dataset
    pub default_data_set_display_name: String,
}

impl Default for DataImportConfig {
    fn default() -> Self {
        Self {
            default_data_set_short_name: "default".to_string(),
            default_data_set_display_name: "Default data set".to_string(),
        }
    }
}

impl DataImportConfig {
    /// Set the default dataset short name
    pub fn with_default_data_set(mut self, short_name: impl Into<String>) -> Self {
        self.default_data_set_short_name = short_name.into();
        self
    }
}
