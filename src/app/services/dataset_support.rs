//! Subject and sample resolution helpers shared by record readers.
//!
//! Readers discover sample names in column headers and data lines; this
//! service resolves them to persisted Sample records, lazily creating the
//! owning Subject and the Sample on first sight within a dataset.

use crate::app::models::{DataSet, Sample, Subject};
use crate::app::storage::{
    MetadataOperations, ModelRepository, SampleRepository, SubjectRepository,
};
use crate::{Error, Result};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info};

/// TCGA-style barcode stem: `TCGA-A1-0001-01A-...` belongs to subject
/// `TCGA-A1-0001`.
const TCGA_BARCODE_STEM: &str = r"^(TCGA-[A-Za-z0-9]{2}-[A-Za-z0-9]{4})";

/// Finds and creates Subject and Sample records for free-text sample names.
pub struct DataSetSupport {
    subjects: Arc<dyn SubjectRepository>,
    samples: Arc<dyn SampleRepository>,
    barcode_stem: Regex,
}

impl DataSetSupport {
    pub fn new(subjects: Arc<dyn SubjectRepository>, samples: Arc<dyn SampleRepository>) -> Self {
        Self {
            subjects,
            samples,
            barcode_stem: Regex::new(TCGA_BARCODE_STEM).expect("barcode stem pattern is valid"),
        }
    }

    /// Find a sample by name within the given dataset.
    pub fn find_sample(&self, name: &str, data_set: &DataSet) -> Result<Option<Sample>> {
        let data_set_id = data_set
            .id
            .as_deref()
            .ok_or_else(|| Error::configuration("DataSet record has not been persisted"))?;
        self.samples.find_by_name_and_data_set(name, data_set_id)
    }

    /// Resolve a sample token via the entity resolver, creating the Sample
    /// (and, when unseen, its owning Subject) on a miss.
    ///
    /// Never returns an unpersisted record; an empty token is an
    /// `InvalidSample` error for the caller to dispose of per options.
    pub fn resolve_or_create_sample(&self, name: &str, data_set: &DataSet) -> Result<Sample> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid_sample("<empty>"));
        }

        if let Some(sample) = self.samples.best_guess(name)? {
            return Ok(sample);
        }
        if let Some(sample) = self.find_sample(name, data_set)? {
            return Ok(sample);
        }

        let subject = self.fetch_or_create_subject(&self.subject_name_for(name))?;
        let sample = Sample::from_subject(name, &subject, data_set);
        sample.validate()?;
        let sample = self.samples.insert(sample)?;
        info!(
            "Created sample '{}' for subject '{}' in data set '{}'",
            sample.name, subject.name, data_set.short_name
        );
        Ok(sample)
    }

    /// The subject a sample name belongs to: the barcode stem for
    /// TCGA-style names, otherwise the full sample name.
    fn subject_name_for(&self, sample_name: &str) -> String {
        self.barcode_stem
            .captures(sample_name)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| sample_name.to_string())
    }

    fn fetch_or_create_subject(&self, name: &str) -> Result<Subject> {
        if let Some(subject) = self.subjects.find_by_name(name)? {
            return Ok(subject);
        }
        debug!("Registering new subject: {}", name);
        self.subjects.insert(Subject::new(name, "H. sapiens"))
    }
}
