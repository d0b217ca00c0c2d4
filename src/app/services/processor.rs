//! The record processor: orchestrates reader, validator, writer and
//! importer through a fixed lifecycle with an all-or-nothing-per-file
//! contract.
//!
//! A file either produces a complete set of (non-skipped) records plus
//! updated metadata associations, or produces none and reports failure.
//! Skips are the only sanctioned partial outcome, and they are explicit,
//! counted and logged.

use crate::app::models::{DataFile, DataRecord, DataSet, Sample};
use crate::app::services::importer::RecordImporter;
use crate::app::services::readers::RecordReader;
use crate::app::services::validator::RecordValidator;
use crate::app::services::writer::RecordWriter;
use crate::app::storage::DataRecordRepository;
use crate::config::ImportOptions;
use crate::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-run wiring propagated from the orchestrator to every pipeline
/// component: the owning dataset, the file being imported, and the
/// skip/fail policy.
#[derive(Debug, Clone)]
pub struct ImportContext {
    pub data_set: DataSet,
    pub data_file: DataFile,
    pub options: ImportOptions,
}

impl ImportContext {
    /// Identity of the file being imported.
    pub fn data_file_id(&self) -> &str {
        self.data_file.id.as_deref().unwrap_or_default()
    }

    /// Identity of the owning dataset.
    pub fn data_set_id(&self) -> &str {
        self.data_set.id.as_deref().unwrap_or_default()
    }
}

/// Lifecycle states of a record processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Unconfigured,
    Configured,
    Running,
    Completed,
    Failed,
}

/// Outcome of a successful processor run.
#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    /// Records passed to the writer
    pub records_written: usize,

    /// Lines, cells and records skipped under the import options
    pub records_skipped: usize,

    /// Samples the reader created or used during the run
    pub samples: Vec<Sample>,
}

/// Type-erased processor contract consumed by the registry and the file
/// import orchestrator.
pub trait FileProcessor: Send {
    /// Data-type labels this processor handles.
    fn data_types(&self) -> &[String];

    /// Human-readable description of the data type.
    fn description(&self) -> &str;

    /// Model type label of the records this processor produces.
    fn model_type(&self) -> &'static str;

    /// Assign the per-run context. Resets any prior run state.
    fn configure(&mut self, ctx: ImportContext);

    fn do_before(&mut self) -> Result<()>;

    fn run(&mut self) -> Result<()>;

    fn do_after(&mut self) -> Result<ImportSummary>;

    fn do_on_failure(&mut self);

    fn is_in_failed_state(&self) -> bool;

    fn state(&self) -> ProcessorState;

    /// Delete all previously imported records for a data file, if the
    /// backing repository supports it. `Ok(None)` means the capability is
    /// absent and overwrite must be refused.
    fn delete_records_for_data_file(&self, data_file_id: &str) -> Result<Option<u64>>;
}

/// Generic [`FileProcessor`] implementation wiring a reader, an optional
/// validator, a writer and an optional importer for one record type.
pub struct GenericRecordProcessor<T: DataRecord> {
    data_types: Vec<String>,
    description: String,
    reader: Box<dyn RecordReader<T>>,
    validator: Option<Box<dyn RecordValidator<T>>>,
    writer: Box<dyn RecordWriter<T>>,
    importer: Option<Box<dyn RecordImporter>>,
    repository: Arc<dyn DataRecordRepository<T>>,
    context: Option<ImportContext>,
    state: ProcessorState,
    records_written: usize,
    records_skipped: usize,
}

impl<T: DataRecord> GenericRecordProcessor<T> {
    pub fn new(
        data_types: Vec<String>,
        description: impl Into<String>,
        reader: Box<dyn RecordReader<T>>,
        writer: Box<dyn RecordWriter<T>>,
        repository: Arc<dyn DataRecordRepository<T>>,
    ) -> Self {
        Self {
            data_types,
            description: description.into(),
            reader,
            validator: None,
            writer,
            importer: None,
            repository,
            context: None,
            state: ProcessorState::Unconfigured,
            records_written: 0,
            records_skipped: 0,
        }
    }

    pub fn with_validator(mut self, validator: Box<dyn RecordValidator<T>>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_importer(mut self, importer: Box<dyn RecordImporter>) -> Self {
        self.importer = Some(importer);
        self
    }

    fn context(&self) -> Result<&ImportContext> {
        self.context
            .as_ref()
            .ok_or_else(|| Error::configuration("Processor context has not been set"))
    }

    fn fail(&mut self, error: Error) -> Error {
        self.state = ProcessorState::Failed;
        error
    }
}

impl<T: DataRecord> FileProcessor for GenericRecordProcessor<T> {
    fn data_types(&self) -> &[String] {
        &self.data_types
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn model_type(&self) -> &'static str {
        T::MODEL_TYPE
    }

    fn configure(&mut self, ctx: ImportContext) {
        self.context = Some(ctx);
        self.state = ProcessorState::Unconfigured;
        self.records_written = 0;
        self.records_skipped = 0;
    }

    /// Assert required wiring and propagate context to the components.
    fn do_before(&mut self) -> Result<()> {
        let ctx = match self.context() {
            Ok(ctx) => ctx.clone(),
            Err(e) => return Err(self.fail(e)),
        };
        if ctx.data_set.id.is_none() {
            return Err(self.fail(Error::configuration(
                "DataSet record has not been persisted",
            )));
        }
        if ctx.data_file.id.is_none() {
            return Err(self.fail(Error::configuration(
                "DataFile record has not been persisted",
            )));
        }
        if ctx.data_file.file_path.trim().is_empty() {
            return Err(self.fail(Error::configuration("DataFile has no file path")));
        }

        let path = Path::new(&ctx.data_file.file_path).to_path_buf();
        if let Err(e) = self.reader.open(&path, &ctx) {
            return Err(self.fail(e));
        }
        if let Err(e) = self.writer.open(&ctx) {
            self.reader.close();
            return Err(self.fail(e));
        }
        self.state = ProcessorState::Configured;
        Ok(())
    }

    /// Pull records from the reader, validate, and hand to the writer.
    fn run(&mut self) -> Result<()> {
        match self.state {
            ProcessorState::Configured => {}
            ProcessorState::Failed => {
                warn!("Record processor is in failed state and is aborting run");
                return Err(Error::configuration(
                    "Processor is in failed state and cannot run",
                ));
            }
            _ => {
                return Err(self.fail(Error::configuration(
                    "Processor has not been configured for a run",
                )));
            }
        }
        self.state = ProcessorState::Running;

        let options = self.context()?.options.clone();
        let file_path = self.context()?.data_file.file_path.clone();
        info!("Processing records from file: {}", file_path);

        loop {
            let record = match self.reader.read_record() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(e) => return Err(self.fail(e)),
            };

            if let Some(validator) = self.validator.as_ref()
                && let Err(errors) = validator.validate(&record)
            {
                let message = errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                if options.skip_invalid_records {
                    warn!("Skipping record that failed validation: {}", message);
                    self.records_skipped += 1;
                    continue;
                }
                return Err(self.fail(Error::invalid_record(message)));
            }

            if let Err(e) = self.writer.write_record(record) {
                return Err(self.fail(e));
            }
            self.records_written += 1;
        }

        debug!(
            "Record loop complete: {} written, {} skipped so far",
            self.records_written, self.records_skipped
        );
        Ok(())
    }

    /// Flush and close the components, then run the importer fast path when
    /// wired, and report the run summary.
    fn do_after(&mut self) -> Result<ImportSummary> {
        if self.state != ProcessorState::Running {
            return Err(self.fail(Error::configuration(
                "Processor doAfter called outside a successful run",
            )));
        }
        let ctx = self.context()?.clone();

        if let Err(e) = self.writer.close() {
            return Err(self.fail(e));
        }
        let samples = self.reader.samples();
        let reader_skips = self.reader.skipped_count();
        self.reader.close();

        if let Some(importer) = self.importer.as_mut() {
            match self.writer.temp_file_path() {
                Some(temp_path) => {
                    info!("Running record importer on staged file");
                    if let Err(e) = importer
                        .import_file(&temp_path, &ctx)
                        .and_then(|_| importer.do_after())
                    {
                        return Err(self.fail(e));
                    }
                }
                None => {
                    warn!(
                        "Record importer is wired but the writer does not stage temp files; \
                         skipping bulk import"
                    );
                }
            }
        }

        self.state = ProcessorState::Completed;
        let summary = ImportSummary {
            records_written: self.records_written,
            records_skipped: self.records_skipped + reader_skips,
            samples,
        };
        info!(
            "Successfully processed {} records ({} skipped) from file: {}",
            summary.records_written, summary.records_skipped, ctx.data_file.file_path
        );
        Ok(summary)
    }

    /// Best-effort resource release on the failure path: buffered records
    /// are discarded, never committed, and release problems are logged and
    /// swallowed so the original failure reaches the caller.
    fn do_on_failure(&mut self) {
        debug!("Releasing pipeline resources after failed run");
        self.writer.abort();
        self.reader.close();
    }

    fn is_in_failed_state(&self) -> bool {
        self.state == ProcessorState::Failed
    }

    fn state(&self) -> ProcessorState {
        self.state
    }

    fn delete_records_for_data_file(&self, data_file_id: &str) -> Result<Option<u64>> {
        if !self.repository.supports_data_file_delete() {
            return Ok(None);
        }
        self.repository
            .delete_by_data_file_id(data_file_id)
            .map(Some)
    }
}
