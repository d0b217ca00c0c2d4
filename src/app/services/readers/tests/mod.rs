//! Shared fixtures for record reader tests.

mod copy_number_tests;

use crate::app::models::{DataFile, DataSet, Gene, Model};
use crate::app::services::dataset_support::DataSetSupport;
use crate::app::services::processor::ImportContext;
use crate::app::services::readers::RecordReader;
use crate::app::storage::memory::InMemoryDataStore;
use crate::app::storage::{GeneRepository, ModelRepository};
use crate::config::ImportOptions;
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;

pub(crate) struct ReaderFixture {
    pub store: InMemoryDataStore,
    pub genes: Arc<dyn GeneRepository>,
    pub support: Arc<DataSetSupport>,
    pub dir: tempfile::TempDir,
}

impl ReaderFixture {
    /// Store seeded with a small gene catalog, plus tempdir for input files.
    pub fn new() -> Self {
        let store = InMemoryDataStore::new();
        store
            .genes
            .insert(Gene::new("672", "BRCA1").with_alias("RNF53"))
            .unwrap();
        store
            .genes
            .insert(Gene::new("675", "BRCA2").with_alias("FANCD1"))
            .unwrap();
        store.genes.insert(Gene::new("7157", "TP53")).unwrap();

        let genes: Arc<dyn GeneRepository> = store.genes.clone();
        let support = Arc::new(DataSetSupport::new(
            store.subjects.clone(),
            store.samples.clone(),
        ));
        Self {
            store,
            genes,
            support,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn context(&self, options: ImportOptions) -> ImportContext {
        let mut data_set = DataSet::new("test", "Test cohort");
        data_set.set_id("dataset-1".to_string());
        let mut data_file = DataFile::new("/in", "test", "test", "checksum", "dataset-1");
        data_file.set_id("file-1".to_string());
        ImportContext {
            data_set,
            data_file,
            options,
        }
    }

    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

/// Drain a reader to completion.
pub(crate) fn read_all<T, R: RecordReader<T>>(reader: &mut R) -> Result<Vec<T>> {
    let mut records = Vec::new();
    while let Some(record) = reader.read_record()? {
        records.push(record);
    }
    Ok(records)
}
