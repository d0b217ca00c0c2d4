//! Bulk record importers for staged temp files.

use crate::app::models::DataRecord;
use crate::app::services::processor::ImportContext;
use crate::app::storage::{DataRecordRepository, ModelRepository};
use crate::constants::WRITE_BATCH_SIZE;
use crate::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Consumes a writer's staged temp file and bulk-loads it into the store,
/// bypassing per-record calls.
pub trait RecordImporter: Send {
    /// Load the staged file, returning the number of records imported.
    fn import_file(&mut self, path: &Path, ctx: &ImportContext) -> Result<u64>;

    /// Post-import cleanup.
    fn do_after(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Importer for the JSON-lines staging format written by
/// [`TempFileRecordWriter`](crate::app::services::writer::TempFileRecordWriter).
pub struct JsonLinesRecordImporter<T: DataRecord> {
    repository: Arc<dyn DataRecordRepository<T>>,
    imported_path: Option<PathBuf>,
}

impl<T: DataRecord> JsonLinesRecordImporter<T> {
    pub fn new(repository: Arc<dyn DataRecordRepository<T>>) -> Self {
        Self {
            repository,
            imported_path: None,
        }
    }
}

impl<T: DataRecord> RecordImporter for JsonLinesRecordImporter<T> {
    fn import_file(&mut self, path: &Path, _ctx: &ImportContext) -> Result<u64> {
        let file = File::open(path)
            .map_err(|e| Error::io(format!("Cannot read temp file {}", path.display()), e))?;
        let reader = BufReader::new(file);

        let mut batch: Vec<T> = Vec::with_capacity(WRITE_BATCH_SIZE);
        let mut imported = 0u64;
        for line in reader.lines() {
            let line = line.map_err(|e| Error::io("Failed to read staged record", e))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: T = serde_json::from_str(&line)?;
            batch.push(record);
            if batch.len() >= WRITE_BATCH_SIZE {
                imported += batch.len() as u64;
                self.repository
                    .insert_many(std::mem::take(&mut batch))
                    .map_err(|e| Error::storage(format!("bulk import failed: {}", e)))?;
            }
        }
        if !batch.is_empty() {
            imported += batch.len() as u64;
            self.repository
                .insert_many(batch)
                .map_err(|e| Error::storage(format!("bulk import failed: {}", e)))?;
        }

        info!("Bulk-imported {} records from {}", imported, path.display());
        self.imported_path = Some(path.to_path_buf());
        Ok(imported)
    }

    fn do_after(&mut self) -> Result<()> {
        // Remove the staged file once its contents are in the store.
        if let Some(path) = self.imported_path.take()
            && let Err(e) = std::fs::remove_file(&path)
        {
            debug!("Could not remove temp file {}: {}", path.display(), e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{DataFile, DataSet, GeneExpression, Model};
    use crate::app::storage::ModelRepository;
    use crate::app::storage::memory::InMemoryDataRecordRepository;
    use crate::config::ImportOptions;
    use std::io::Write;

    fn context() -> ImportContext {
        let mut data_set = DataSet::new("test", "Test");
        data_set.set_id("dataset-1".to_string());
        let mut data_file = DataFile::new("/data/x.gct", "gct", "gene_expression", "c", "dataset-1");
        data_file.set_id("file-1".to_string());
        ImportContext {
            data_set,
            data_file,
            options: ImportOptions::default(),
        }
    }

    #[test]
    fn test_imports_staged_records_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("x.gct.import.tmp.jsonl");
        let mut file = File::create(&staged).unwrap();
        for i in 0..3 {
            let mut record = GeneExpression::new("file-1", "dataset-1");
            record.gene_id = format!("gene-{}", i);
            record.sample_id = "sample-1".to_string();
            record.value = i as f64;
            writeln!(file, "{}", serde_json::to_string(&record).unwrap()).unwrap();
        }
        drop(file);

        let repo = Arc::new(InMemoryDataRecordRepository::<GeneExpression>::new());
        let mut importer = JsonLinesRecordImporter::new(repo.clone());
        let imported = importer.import_file(&staged, &context()).unwrap();
        assert_eq!(imported, 3);
        assert_eq!(repo.count().unwrap(), 3);

        importer.do_after().unwrap();
        assert!(!staged.exists());
    }

    #[test]
    fn test_malformed_staged_line_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("bad.jsonl");
        std::fs::write(&staged, "not json\n").unwrap();

        let repo = Arc::new(InMemoryDataRecordRepository::<GeneExpression>::new());
        let mut importer = JsonLinesRecordImporter::new(repo);
        assert!(importer.import_file(&staged, &context()).is_err());
    }
}
