//! Metadata entities for the import pipeline.
//!
//! This module contains the persisted value objects describing datasets,
//! files, subjects, samples and reference genes. Typed data records
//! produced by pipeline runs live in the [`records`] submodule.

use crate::constants::{ATTRIBUTE_NOT_AVAILABLE, sample_attributes};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod records;

pub use records::{DataRecord, GeneCopyNumber, GeneExpression, Mutation, VariantTranscript};

/// Common identity contract for persisted entities.
///
/// Identities are assigned by the storage collaborator on insert; an entity
/// with `id() == None` has not been persisted.
pub trait Model: Clone + std::fmt::Debug + Send + Sync + 'static {
    fn id(&self) -> Option<&str>;
    fn set_id(&mut self, id: String);
}

// =============================================================================
// DataSet
// =============================================================================

/// A logical cohort of imported files and samples.
///
/// Created once per cohort and mutated by the orchestrator as files and
/// samples are attached. The `sample_ids` and `data_file_ids` collections
/// are append-only idempotent sets, not ordered logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Unique lookup key (eg. "tcga-brca")
    pub short_name: String,

    /// Human-readable name
    pub display_name: String,

    /// Free-form key-value parameters, including `default.*` sample
    /// attribute fallbacks
    pub parameters: HashMap<String, String>,

    /// Identifiers of member samples
    pub sample_ids: Vec<String>,

    /// Identifiers of member data files
    pub data_file_ids: Vec<String>,
}

impl DataSet {
    /// Create a new unpersisted dataset
    pub fn new(short_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: None,
            short_name: short_name.into(),
            display_name: display_name.into(),
            parameters: HashMap::new(),
            sample_ids: Vec::new(),
            data_file_ids: Vec::new(),
        }
    }

    /// Validate dataset fields
    pub fn validate(&self) -> Result<()> {
        if self.short_name.trim().is_empty() {
            return Err(Error::invalid_record("DataSet short name cannot be empty"));
        }
        Ok(())
    }

    pub fn has_parameter(&self, key: &str) -> bool {
        self.parameters.contains_key(key)
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// Idempotent union insert. Returns true when the set changed.
    pub fn add_sample_id(&mut self, sample_id: &str) -> bool {
        if self.sample_ids.iter().any(|id| id == sample_id) {
            false
        } else {
            self.sample_ids.push(sample_id.to_string());
            true
        }
    }

    /// Idempotent union insert. Returns true when the set changed.
    pub fn add_data_file_id(&mut self, data_file_id: &str) -> bool {
        if self.data_file_ids.iter().any(|id| id == data_file_id) {
            false
        } else {
            self.data_file_ids.push(data_file_id.to_string());
            true
        }
    }
}

impl Model for DataSet {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

// =============================================================================
// DataFile
// =============================================================================

/// Metadata record describing one imported physical file.
///
/// The file path is the unique lookup key; the checksum is a content hash
/// of the raw file bytes used for duplicate and change detection, never for
/// integrity enforcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Absolute path of the source file, unique per record
    pub file_path: String,

    /// Data-type label the file was imported as
    pub data_type: String,

    /// Model type label of the records produced from this file
    pub model_type: String,

    /// Lowercase hex content checksum
    pub checksum: String,

    /// Owning dataset identifier
    pub data_set_id: String,

    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

impl DataFile {
    /// Create a new unpersisted data file record
    pub fn new(
        file_path: impl Into<String>,
        data_type: impl Into<String>,
        model_type: impl Into<String>,
        checksum: impl Into<String>,
        data_set_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            file_path: file_path.into(),
            data_type: data_type.into(),
            model_type: model_type.into(),
            checksum: checksum.into(),
            data_set_id: data_set_id.into(),
            date_created: now,
            date_updated: now,
        }
    }
}

impl Model for DataFile {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

// =============================================================================
// Subject
// =============================================================================

/// A study participant or cell line owning one or more samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    pub species: String,

    /// Free-text attributes, consulted for sample attribute inheritance
    pub attributes: HashMap<String, String>,

    /// Identifiers of owned samples
    pub sample_ids: Vec<String>,
}

impl Subject {
    /// Create a new unpersisted subject
    pub fn new(name: impl Into<String>, species: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            species: species.into(),
            attributes: HashMap::new(),
            sample_ids: Vec::new(),
        }
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Idempotent union insert. Returns true when the set changed.
    pub fn add_sample_id(&mut self, sample_id: &str) -> bool {
        if self.sample_ids.iter().any(|id| id == sample_id) {
            false
        } else {
            self.sample_ids.push(sample_id.to_string());
            true
        }
    }
}

impl Model for Subject {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

// =============================================================================
// Sample
// =============================================================================

/// A single biological sample within a dataset.
///
/// Subject and dataset identifiers are set once at creation and never
/// change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    /// Alternate names the sample may appear under in input files
    pub aliases: Vec<String>,

    /// Owning subject identifier
    pub subject_id: String,

    /// Owning dataset identifier
    pub data_set_id: String,

    pub tissue: String,
    pub histology: String,
    pub sample_type: String,
}

impl Sample {
    /// Create a new unpersisted sample with attribute values inherited from
    /// the subject's attributes, falling back to the dataset's `default.*`
    /// parameters.
    pub fn from_subject(name: impl Into<String>, subject: &Subject, data_set: &DataSet) -> Self {
        Self {
            id: None,
            name: name.into(),
            aliases: Vec::new(),
            subject_id: subject.id().unwrap_or_default().to_string(),
            data_set_id: data_set.id().unwrap_or_default().to_string(),
            tissue: inherited_attribute(sample_attributes::TISSUE, subject, data_set),
            histology: inherited_attribute(sample_attributes::HISTOLOGY, subject, data_set),
            sample_type: inherited_attribute(sample_attributes::SAMPLE_TYPE, subject, data_set),
        }
    }

    /// Validate sample fields
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_record("Sample name cannot be empty"));
        }
        if self.subject_id.trim().is_empty() || self.data_set_id.trim().is_empty() {
            return Err(Error::invalid_record(format!(
                "Sample '{}' must reference a persisted subject and data set",
                self.name
            )));
        }
        Ok(())
    }
}

fn inherited_attribute(key: &str, subject: &Subject, data_set: &DataSet) -> String {
    let dataset_key = format!("{}{}", sample_attributes::DATASET_DEFAULT_PREFIX, key);
    if let Some(value) = subject.attribute(key) {
        value.to_string()
    } else if let Some(value) = data_set.parameter(&dataset_key) {
        value.to_string()
    } else {
        ATTRIBUTE_NOT_AVAILABLE.to_string()
    }
}

impl Model for Sample {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

// =============================================================================
// Gene
// =============================================================================

/// Reference catalog gene record.
///
/// Read-only from the pipeline's perspective: resolved, never created, by
/// imports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Authoritative reference identifier (eg. Entrez gene id)
    pub primary_reference_id: String,

    /// Official symbol (eg. HUGO symbol)
    pub primary_gene_symbol: String,

    /// Known alternate symbols
    pub aliases: Vec<String>,

    /// External database cross-references, keyed by source
    pub external_references: HashMap<String, String>,

    pub taxonomy_id: String,
}

impl Gene {
    /// Create a new catalog gene record
    pub fn new(
        primary_reference_id: impl Into<String>,
        primary_gene_symbol: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            primary_reference_id: primary_reference_id.into(),
            primary_gene_symbol: primary_gene_symbol.into(),
            aliases: Vec::new(),
            external_references: HashMap::new(),
            taxonomy_id: String::new(),
        }
    }

    /// Add an alias symbol
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }
}

impl Model for Gene {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persisted_subject() -> Subject {
        let mut subject = Subject::new("TCGA-A1-0001", "H. sapiens");
        subject.set_id("subject-1".to_string());
        subject
    }

    fn persisted_data_set() -> DataSet {
        let mut data_set = DataSet::new("tcga-test", "TCGA test cohort");
        data_set.set_id("dataset-1".to_string());
        data_set
    }

    #[test]
    fn test_data_set_id_unions_are_idempotent() {
        let mut data_set = persisted_data_set();
        assert!(data_set.add_sample_id("sample-1"));
        assert!(!data_set.add_sample_id("sample-1"));
        assert!(data_set.add_sample_id("sample-2"));
        assert_eq!(data_set.sample_ids, vec!["sample-1", "sample-2"]);

        assert!(data_set.add_data_file_id("file-1"));
        assert!(!data_set.add_data_file_id("file-1"));
        assert_eq!(data_set.data_file_ids, vec!["file-1"]);
    }

    #[test]
    fn test_subject_sample_union_is_idempotent() {
        let mut subject = persisted_subject();
        assert!(subject.add_sample_id("sample-1"));
        assert!(!subject.add_sample_id("sample-1"));
        assert_eq!(subject.sample_ids.len(), 1);
    }

    #[test]
    fn test_sample_inherits_subject_attributes_first() {
        let mut subject = persisted_subject();
        subject
            .attributes
            .insert("sample_tissue".to_string(), "breast".to_string());
        let mut data_set = persisted_data_set();
        data_set
            .parameters
            .insert("default.sample_tissue".to_string(), "lung".to_string());
        data_set
            .parameters
            .insert("default.sample_type".to_string(), "cell line".to_string());

        let sample = Sample::from_subject("TCGA-A1-0001-01", &subject, &data_set);
        assert_eq!(sample.tissue, "breast");
        assert_eq!(sample.sample_type, "cell line");
        assert_eq!(sample.histology, "n/a");
        assert_eq!(sample.subject_id, "subject-1");
        assert_eq!(sample.data_set_id, "dataset-1");
    }

    #[test]
    fn test_sample_validation_requires_references() {
        let subject = Subject::new("unpersisted", "H. sapiens");
        let data_set = DataSet::new("unpersisted", "Unpersisted");
        let sample = Sample::from_subject("orphan", &subject, &data_set);
        assert!(sample.validate().is_err());
    }

    #[test]
    fn test_data_set_validation() {
        assert!(DataSet::new("  ", "blank").validate().is_err());
        assert!(DataSet::new("ok", "Ok").validate().is_ok());
    }

    #[test]
    fn test_serde_round_trip() {
        let gene = Gene::new("672", "BRCA1").with_alias("RNF53");
        let json = serde_json::to_string(&gene).unwrap();
        let back: Gene = serde_json::from_str(&json).unwrap();
        assert_eq!(gene, back);
    }
}
