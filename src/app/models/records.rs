//! Typed data records produced by pipeline runs.
//!
//! Records are created in bulk during a single processor run and never
//! individually mutated afterwards, except by an explicit
//! overwrite-and-recreate cycle.

use super::Model;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Contract shared by all bulk-imported data records.
///
/// Every record carries the identities of the file and dataset that
/// produced it; a run that would otherwise emit an orphaned record must
/// fail or skip per the import options.
pub trait DataRecord: Model + Serialize + DeserializeOwned {
    /// Stable label identifying the record type in DataFile metadata
    const MODEL_TYPE: &'static str;

    fn data_file_id(&self) -> &str;
    fn data_set_id(&self) -> &str;
}

// =============================================================================
// GeneExpression
// =============================================================================

/// Normalized expression value for one (gene, sample) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneExpression {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub data_file_id: String,
    pub data_set_id: String,
    pub gene_id: String,
    pub sample_id: String,
    pub subject_id: String,

    pub value: f64,
}

impl GeneExpression {
    pub fn new(data_file_id: impl Into<String>, data_set_id: impl Into<String>) -> Self {
        Self {
            id: None,
            data_file_id: data_file_id.into(),
            data_set_id: data_set_id.into(),
            gene_id: String::new(),
            sample_id: String::new(),
            subject_id: String::new(),
            value: 0.0,
        }
    }
}

impl Model for GeneExpression {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

impl DataRecord for GeneExpression {
    const MODEL_TYPE: &'static str = "gene_expression";

    fn data_file_id(&self) -> &str {
        &self.data_file_id
    }

    fn data_set_id(&self) -> &str {
        &self.data_set_id
    }
}

// =============================================================================
// GeneCopyNumber
// =============================================================================

/// Copy-number value for one (gene, sample) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneCopyNumber {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub data_file_id: String,
    pub data_set_id: String,
    pub gene_id: String,
    pub sample_id: String,
    pub subject_id: String,

    pub value: f64,
}

impl GeneCopyNumber {
    pub fn new(data_file_id: impl Into<String>, data_set_id: impl Into<String>) -> Self {
        Self {
            id: None,
            data_file_id: data_file_id.into(),
            data_set_id: data_set_id.into(),
            gene_id: String::new(),
            sample_id: String::new(),
            subject_id: String::new(),
            value: 0.0,
        }
    }
}

impl Model for GeneCopyNumber {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

impl DataRecord for GeneCopyNumber {
    const MODEL_TYPE: &'static str = "gene_copy_number";

    fn data_file_id(&self) -> &str {
        &self.data_file_id
    }

    fn data_set_id(&self) -> &str {
        &self.data_set_id
    }
}

// =============================================================================
// Mutation
// =============================================================================

/// A variant call against an alternate transcript, parsed from the MAF
/// `other_transcripts` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantTranscript {
    pub gene_id: Option<String>,
    pub transcript_id: String,
}

/// One annotated somatic mutation from a MAF file line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub data_file_id: String,
    pub data_set_id: String,
    pub gene_id: String,
    pub sample_id: String,

    pub chromosome: String,
    pub dna_start_position: i64,
    pub dna_stop_position: i64,
    pub strand: String,
    pub variant_classification: String,
    pub variant_type: String,
    pub reference_allele: String,
    pub alternate_allele: String,
    pub nucleotide_change: String,
    pub codon_change: String,
    pub protein_change: String,
    pub nucleotide_transcript: String,
    pub protein_transcript: String,
    pub alternate_transcripts: Vec<VariantTranscript>,
    pub attributes: HashMap<String, String>,
}

impl Mutation {
    pub fn new(data_file_id: impl Into<String>, data_set_id: impl Into<String>) -> Self {
        Self {
            id: None,
            data_file_id: data_file_id.into(),
            data_set_id: data_set_id.into(),
            gene_id: String::new(),
            sample_id: String::new(),
            chromosome: String::new(),
            dna_start_position: 0,
            dna_stop_position: 0,
            strand: String::new(),
            variant_classification: String::new(),
            variant_type: String::new(),
            reference_allele: String::new(),
            alternate_allele: String::new(),
            nucleotide_change: String::new(),
            codon_change: String::new(),
            protein_change: String::new(),
            nucleotide_transcript: String::new(),
            protein_transcript: String::new(),
            alternate_transcripts: Vec::new(),
            attributes: HashMap::new(),
        }
    }
}

impl Model for Mutation {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

impl DataRecord for Mutation {
    const MODEL_TYPE: &'static str = "mutation";

    fn data_file_id(&self) -> &str {
        &self.data_file_id
    }

    fn data_set_id(&self) -> &str {
        &self.data_set_id
    }
}
