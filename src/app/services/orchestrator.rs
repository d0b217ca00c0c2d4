//! File import orchestration: resolves the processor and metadata records
//! for one file-import request, detects duplicate and changed files via
//! content checksums, runs the processor, and reconciles the
//! subject/sample/dataset/datafile back-references after success.

use crate::app::models::{DataFile, DataSet};
use crate::app::services::processor::{FileProcessor, ImportContext, ImportSummary};
use crate::app::services::registry::ProcessorRegistry;
use crate::app::storage::{
    DataFileRepository, DataSetRepository, ModelRepository, SubjectRepository,
};
use crate::config::{DataImportConfig, ImportOptions};
use crate::{Error, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one file-import request.
///
/// A file that is entirely skipped reports success with zero records
/// written and a distinguishing skipped indication.
#[derive(Debug, Clone)]
pub enum ImportOutcome {
    /// The processor ran and produced records.
    Imported(ImportSummary),

    /// The file was previously imported and overwrite was not requested.
    SkippedExisting,

    /// Overwrite was requested but the file content is unchanged.
    SkippedUnchanged,

    /// Overwrite was refused: the prior records cannot be deleted.
    OverwriteRefused,
}

impl ImportOutcome {
    pub fn records_written(&self) -> usize {
        match self {
            ImportOutcome::Imported(summary) => summary.records_written,
            _ => 0,
        }
    }

    pub fn was_skipped(&self) -> bool {
        !matches!(self, ImportOutcome::Imported(_))
    }
}

/// Drives one synchronous import per invocation. Concurrent imports of
/// different files are the caller's responsibility; simultaneous imports of
/// the same path are not guarded against.
pub struct FileImportOrchestrator {
    registry: ProcessorRegistry,
    data_sets: Arc<dyn DataSetRepository>,
    data_files: Arc<dyn DataFileRepository>,
    subjects: Arc<dyn SubjectRepository>,
    config: DataImportConfig,
}

impl FileImportOrchestrator {
    pub fn new(
        registry: ProcessorRegistry,
        data_sets: Arc<dyn DataSetRepository>,
        data_files: Arc<dyn DataFileRepository>,
        subjects: Arc<dyn SubjectRepository>,
        config: DataImportConfig,
    ) -> Self {
        Self {
            registry,
            data_sets,
            data_files,
            subjects,
            config,
        }
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    /// Import one file as the given data type.
    ///
    /// Pre-flight failures (unknown data type, unresolvable dataset key,
    /// unreadable file) leave no partial work. Processor failures surface
    /// as the processor's error with no retry and no rollback beyond what
    /// the processor itself guarantees.
    pub fn import(
        &mut self,
        file_path: &Path,
        data_type: &str,
        data_set_key: Option<&str>,
        overwrite: bool,
        options: ImportOptions,
    ) -> Result<ImportOutcome> {
        if !self.registry.is_supported(data_type) {
            return Err(Error::unsupported_data_type(data_type));
        }
        info!(
            "Running file import: data-type={} file={}",
            data_type,
            file_path.display()
        );

        let data_set = self.resolve_data_set(data_set_key)?;
        let path_key = file_path.to_string_lossy().to_string();

        let data_file = match self.data_files.find_by_file_path(&path_key)? {
            Some(existing) => {
                match self.prepare_overwrite(existing, file_path, overwrite)? {
                    Ok(updated) => updated,
                    Err(outcome) => return Ok(outcome),
                }
            }
            None => {
                let model_type = self
                    .registry
                    .get_by_data_type(data_type)
                    .map(|p| p.model_type())
                    .unwrap_or_default();
                let checksum = file_checksum(file_path)?;
                let data_file = DataFile::new(
                    &path_key,
                    data_type,
                    model_type,
                    checksum,
                    data_set.id.as_deref().unwrap_or_default(),
                );
                info!("Registering new data file record: {}", path_key);
                self.data_files.insert(data_file)?
            }
        };

        let summary = self.run_processor(data_type, &data_set, &data_file, options)?;
        self.reconcile_associations(data_set, &data_file, &summary)?;
        info!("File processing complete: {}", path_key);
        Ok(ImportOutcome::Imported(summary))
    }

    /// Look up the dataset by identity then short name, or fall back to the
    /// configured default, auto-registering it on first use.
    fn resolve_data_set(&self, data_set_key: Option<&str>) -> Result<DataSet> {
        if let Some(key) = data_set_key {
            if let Some(data_set) = self.data_sets.find_by_id(key)? {
                return Ok(data_set);
            }
            if let Some(data_set) = self.data_sets.find_by_short_name(key)? {
                return Ok(data_set);
            }
            return Err(Error::unknown_data_set(key));
        }

        let short_name = &self.config.default_data_set_short_name;
        if let Some(data_set) = self.data_sets.find_by_short_name(short_name)? {
            return Ok(data_set);
        }
        info!("Registering new data set: {}", short_name);
        self.data_sets.insert(DataSet::new(
            short_name,
            &self.config.default_data_set_display_name,
        ))
    }

    /// Decide what to do with a previously imported file. Returns the
    /// updated DataFile to process, or the skip outcome to report.
    fn prepare_overwrite(
        &mut self,
        mut existing: DataFile,
        file_path: &Path,
        overwrite: bool,
    ) -> Result<std::result::Result<DataFile, ImportOutcome>> {
        if !overwrite {
            warn!(
                "DataFile record already exists, skipping import: {}",
                existing.file_path
            );
            return Ok(Err(ImportOutcome::SkippedExisting));
        }

        let checksum = file_checksum(file_path)?;
        if existing.checksum.eq_ignore_ascii_case(&checksum) {
            info!(
                "File is identical to original, overwrite will be skipped: {}",
                existing.file_path
            );
            return Ok(Err(ImportOutcome::SkippedUnchanged));
        }

        // Delete the records produced by the previous import of this file.
        let data_file_id = existing.id.as_deref().unwrap_or_default().to_string();
        let deleted = match self.registry.get_by_model_type(&existing.model_type) {
            Some(processor) => processor.delete_records_for_data_file(&data_file_id)?,
            None => None,
        };
        match deleted {
            Some(count) => {
                info!(
                    "Overwriting existing data file record, deleted {} prior records: {}",
                    count, existing.file_path
                );
            }
            None => {
                warn!(
                    "Data of model type '{}' is not over-writable, refusing overwrite: {}",
                    existing.model_type, existing.file_path
                );
                return Ok(Err(ImportOutcome::OverwriteRefused));
            }
        }

        existing.checksum = checksum;
        existing.date_updated = Utc::now();
        let updated = self.data_files.update(existing)?;
        Ok(Ok(updated))
    }

    /// Run the processor lifecycle. A failed run triggers the failure hook
    /// and re-raises the captured error; callers observe a single
    /// synchronous failure, never partial success.
    fn run_processor(
        &mut self,
        data_type: &str,
        data_set: &DataSet,
        data_file: &DataFile,
        options: ImportOptions,
    ) -> Result<ImportSummary> {
        let processor = self
            .registry
            .get_by_data_type(data_type)
            .ok_or_else(|| Error::unsupported_data_type(data_type))?;

        processor.configure(ImportContext {
            data_set: data_set.clone(),
            data_file: data_file.clone(),
            options,
        });
        run_lifecycle(processor.as_mut())
    }

    /// Ensure the owning subjects' and the dataset's sample-id sets contain
    /// every discovered sample, and the dataset's data-file-id set contains
    /// the current file. Idempotent unions, persisted only if changed.
    fn reconcile_associations(
        &self,
        mut data_set: DataSet,
        data_file: &DataFile,
        summary: &ImportSummary,
    ) -> Result<()> {
        let mut data_set_changed = false;
        for sample in &summary.samples {
            let Some(sample_id) = sample.id.as_deref() else {
                continue;
            };
            match self.subjects.find_by_id(&sample.subject_id)? {
                Some(mut subject) => {
                    if subject.add_sample_id(sample_id) {
                        self.subjects.update(subject)?;
                    }
                }
                None => {
                    warn!(
                        "Sample '{}' references unknown subject '{}'",
                        sample.name, sample.subject_id
                    );
                }
            }
            data_set_changed |= data_set.add_sample_id(sample_id);
        }

        if let Some(data_file_id) = data_file.id.as_deref() {
            data_set_changed |= data_set.add_data_file_id(data_file_id);
        }
        if data_set_changed {
            self.data_sets.update(data_set)?;
        }
        Ok(())
    }
}

/// Execute the processor lifecycle against its configured context.
fn run_lifecycle(processor: &mut dyn FileProcessor) -> Result<ImportSummary> {
    processor.do_before()?;

    let run_result = processor.run();
    if processor.is_in_failed_state() {
        warn!("Processor execution failed, triggering failure hook");
        processor.do_on_failure();
        return Err(run_result.err().unwrap_or_else(|| {
            Error::configuration("Processor entered failed state without an error")
        }));
    }
    run_result?;

    match processor.do_after() {
        Ok(summary) => Ok(summary),
        Err(e) => {
            processor.do_on_failure();
            Err(e)
        }
    }
}

/// Content checksum of the raw file bytes as a lowercase hex string. Used
/// for identity and change detection only.
pub fn file_checksum(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::file_not_found(path.display().to_string()),
        _ => Error::io(format!("Cannot read file {}", path.display()), e),
    })?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes = file
            .read(&mut buffer)
            .map_err(|e| Error::io("Failed to read file for checksum", e))?;
        if bytes == 0 {
            break;
        }
        hasher.update(&buffer[..bytes]);
    }
    Ok(hex::encode(hasher.finalize()))
}
