//! Record writers: batched repository persistence and temp-file staging.

use crate::app::models::DataRecord;
use crate::app::services::processor::ImportContext;
use crate::app::storage::{DataRecordRepository, ModelRepository};
use crate::constants::{TEMP_FILE_SUFFIX, WRITE_BATCH_SIZE};
use crate::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Persistence mode for repository writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// New records only
    Insert,
    /// Replace existing records by identity
    Update,
}

/// Accepts validated records from the processor loop and persists them.
///
/// `open`/`close` bracket the run; a partially filled buffer is flushed
/// exactly once, even on the failure path. Storage failures are
/// non-retryable within the pipeline.
pub trait RecordWriter<T>: Send {
    fn open(&mut self, ctx: &ImportContext) -> Result<()>;

    fn write_record(&mut self, record: T) -> Result<()>;

    /// Success-path close: flushes any partially filled buffer exactly
    /// once. Idempotent.
    fn close(&mut self) -> Result<()>;

    /// Failure-path release: drop resources without committing buffered
    /// records. Once a run has failed, no further records are written.
    fn abort(&mut self) {}

    /// Path of the staged temp file, for writers with the temp-file
    /// capability consumed by record importers.
    fn temp_file_path(&self) -> Option<PathBuf> {
        None
    }
}

/// Writer that batches records and flushes them to a repository as bulk
/// inserts (or replace-by-identity updates).
pub struct RepositoryRecordWriter<T: DataRecord> {
    repository: Arc<dyn DataRecordRepository<T>>,
    mode: WriteMode,
    batch_size: usize,
    buffer: Vec<T>,
    closed: bool,
    failed: bool,
}

impl<T: DataRecord> RepositoryRecordWriter<T> {
    pub fn new(repository: Arc<dyn DataRecordRepository<T>>) -> Self {
        Self {
            repository,
            mode: WriteMode::Insert,
            batch_size: WRITE_BATCH_SIZE,
            buffer: Vec::new(),
            closed: true,
            failed: false,
        }
    }

    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.buffer);
        let count = batch.len();
        let result = match self.mode {
            WriteMode::Insert => self.repository.insert_many(batch),
            WriteMode::Update => self.repository.update_many(batch),
        };
        match result {
            Ok(_) => {
                debug!("Flushed {} records to repository", count);
                Ok(())
            }
            Err(e) => {
                self.failed = true;
                Err(e)
            }
        }
    }
}

impl<T: DataRecord> RecordWriter<T> for RepositoryRecordWriter<T> {
    fn open(&mut self, _ctx: &ImportContext) -> Result<()> {
        self.buffer.clear();
        self.closed = false;
        self.failed = false;
        Ok(())
    }

    fn write_record(&mut self, record: T) -> Result<()> {
        if self.closed {
            return Err(Error::configuration("writer has not been opened"));
        }
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // A failed flush is not retried; close only drains a clean buffer.
        if self.failed {
            self.buffer.clear();
            return Ok(());
        }
        self.flush()
    }

    fn abort(&mut self) {
        self.closed = true;
        self.buffer.clear();
    }
}

/// Writer that stages records as JSON lines in a temp file for a bulk
/// importer, instead of issuing per-record repository calls.
pub struct TempFileRecordWriter<T: DataRecord> {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    _marker: std::marker::PhantomData<fn(T)>,
}

impl<T: DataRecord> TempFileRecordWriter<T> {
    pub fn new() -> Self {
        Self {
            writer: None,
            path: None,
            _marker: std::marker::PhantomData,
        }
    }

    /// Staged temp file path for the given input file, under the options'
    /// temp directory. Re-runs of the same input overwrite the same staged
    /// file.
    fn staged_path(ctx: &ImportContext) -> PathBuf {
        let input = Path::new(&ctx.data_file.file_path);
        let stem = input
            .file_name()
            .map(|n| n.to_string_lossy().replace(char::is_whitespace, "_"))
            .unwrap_or_else(|| "input".to_string());
        ctx.options
            .temp_dir
            .join(format!("{}.{}", stem, TEMP_FILE_SUFFIX))
    }
}

impl<T: DataRecord> Default for TempFileRecordWriter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DataRecord> RecordWriter<T> for TempFileRecordWriter<T> {
    fn open(&mut self, ctx: &ImportContext) -> Result<()> {
        let path = Self::staged_path(ctx);
        let file = File::create(&path)
            .map_err(|e| Error::io(format!("Cannot open temp file {}", path.display()), e))?;
        info!("Staging records to temp file: {}", path.display());
        self.writer = Some(BufWriter::new(file));
        self.path = Some(path);
        Ok(())
    }

    fn write_record(&mut self, record: T) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::configuration("writer has not been opened"))?;
        let line = serde_json::to_string(&record)?;
        writeln!(writer, "{}", line)
            .map_err(|e| Error::io("Failed to write staged record", e))?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| Error::io("Failed to flush staged records", e))?;
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.writer = None;
    }

    fn temp_file_path(&self) -> Option<PathBuf> {
        self.path.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{DataFile, DataSet, GeneExpression, Model};
    use crate::app::storage::ModelRepository;
    use crate::app::storage::memory::InMemoryDataRecordRepository;
    use crate::config::ImportOptions;

    fn context(temp_dir: &Path) -> ImportContext {
        let mut data_set = DataSet::new("test", "Test");
        data_set.set_id("dataset-1".to_string());
        let mut data_file = DataFile::new(
            "/data/expr matrix.gct",
            "gct_gene_expression",
            "gene_expression",
            "abc123",
            "dataset-1",
        );
        data_file.set_id("file-1".to_string());
        ImportContext {
            data_set,
            data_file,
            options: ImportOptions::default().with_temp_dir(temp_dir),
        }
    }

    fn record() -> GeneExpression {
        let mut r = GeneExpression::new("file-1", "dataset-1");
        r.gene_id = "gene-1".to_string();
        r.sample_id = "sample-1".to_string();
        r.value = 1.5;
        r
    }

    #[test]
    fn test_repository_writer_flushes_on_batch_boundary() {
        let repo = Arc::new(InMemoryDataRecordRepository::<GeneExpression>::new());
        let mut writer = RepositoryRecordWriter::new(repo.clone()).with_batch_size(2);
        let ctx = context(Path::new("/tmp"));
        writer.open(&ctx).unwrap();
        writer.write_record(record()).unwrap();
        assert_eq!(repo.count().unwrap(), 0);
        writer.write_record(record()).unwrap();
        assert_eq!(repo.count().unwrap(), 2);
        writer.write_record(record()).unwrap();
        writer.close().unwrap();
        assert_eq!(repo.count().unwrap(), 3);
    }

    #[test]
    fn test_repository_writer_close_is_idempotent() {
        let repo = Arc::new(InMemoryDataRecordRepository::<GeneExpression>::new());
        let mut writer = RepositoryRecordWriter::new(repo.clone()).with_batch_size(10);
        let ctx = context(Path::new("/tmp"));
        writer.open(&ctx).unwrap();
        writer.write_record(record()).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_update_mode_replaces_by_identity() {
        let repo = Arc::new(InMemoryDataRecordRepository::<GeneExpression>::new());
        let ctx = context(Path::new("/tmp"));

        let mut inserted = repo.insert(record()).unwrap();
        inserted.value = 9.75;

        let mut writer = RepositoryRecordWriter::new(repo.clone()).with_mode(WriteMode::Update);
        writer.open(&ctx).unwrap();
        writer.write_record(inserted.clone()).unwrap();
        writer.close().unwrap();

        assert_eq!(repo.count().unwrap(), 1);
        let found = repo.find_by_id(inserted.id.as_deref().unwrap()).unwrap().unwrap();
        assert_eq!(found.value, 9.75);
    }

    #[test]
    fn test_repository_writer_abort_discards_buffered_records() {
        let repo = Arc::new(InMemoryDataRecordRepository::<GeneExpression>::new());
        let mut writer = RepositoryRecordWriter::new(repo.clone()).with_batch_size(10);
        let ctx = context(Path::new("/tmp"));
        writer.open(&ctx).unwrap();
        writer.write_record(record()).unwrap();
        writer.abort();
        assert_eq!(repo.count().unwrap(), 0);
        // A close after abort commits nothing either.
        writer.close().unwrap();
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_temp_file_writer_stages_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = TempFileRecordWriter::<GeneExpression>::new();
        let ctx = context(dir.path());
        writer.open(&ctx).unwrap();
        writer.write_record(record()).unwrap();
        writer.write_record(record()).unwrap();
        writer.close().unwrap();

        let path = writer.temp_file_path().unwrap();
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("expr_matrix.gct")
        );
        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: GeneExpression = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.value, 1.5);
    }
}
