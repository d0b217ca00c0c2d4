//! In-memory storage collaborator.
//!
//! Backs the full repository contract with `RwLock`-guarded maps, assigning
//! sequential identities on insert. Used by the CLI wiring and by tests;
//! deployments with a real database implement the same traits instead.

use crate::app::models::{
    DataFile, DataRecord, DataSet, Gene, GeneCopyNumber, GeneExpression, Model, Mutation, Sample,
    Subject,
};
use crate::app::storage::{
    DataFileRepository, DataRecordRepository, DataSetRepository, GeneRepository,
    MetadataOperations, ModelRepository, SampleRepository, SubjectRepository,
};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Generic map-backed repository with sequential id assignment.
pub struct InMemoryRepository<T: Model> {
    prefix: &'static str,
    records: RwLock<BTreeMap<String, T>>,
    next_id: AtomicU64,
}

impl<T: Model> InMemoryRepository<T> {
    fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_identity(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        // Zero-padded so map iteration order matches insertion order.
        format!("{}-{:08}", self.prefix, n)
    }

    /// Run a filter over all records, preserving insertion order.
    fn filtered(&self, predicate: impl Fn(&T) -> bool) -> Result<Vec<T>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.values().filter(|r| predicate(r)).cloned().collect())
    }
}

fn poisoned<E>(_: E) -> Error {
    Error::storage("repository lock poisoned")
}

impl<T: Model> ModelRepository<T> for InMemoryRepository<T> {
    fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(id).cloned())
    }

    fn find_all(&self) -> Result<Vec<T>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.values().cloned().collect())
    }

    fn insert(&self, mut record: T) -> Result<T> {
        if record.id().is_some() {
            return Err(Error::storage(
                "cannot insert a record that already has an identity",
            ));
        }
        record.set_id(self.next_identity());
        let id = record.id().unwrap_or_default().to_string();
        let mut records = self.records.write().map_err(poisoned)?;
        records.insert(id, record.clone());
        Ok(record)
    }

    fn insert_many(&self, records: Vec<T>) -> Result<Vec<T>> {
        let mut inserted = Vec::with_capacity(records.len());
        for record in records {
            inserted.push(self.insert(record)?);
        }
        Ok(inserted)
    }

    fn update(&self, record: T) -> Result<T> {
        let id = record
            .id()
            .ok_or_else(|| Error::storage("cannot update a record without an identity"))?
            .to_string();
        let mut records = self.records.write().map_err(poisoned)?;
        if !records.contains_key(&id) {
            return Err(Error::storage(format!("no record with id '{}'", id)));
        }
        records.insert(id, record.clone());
        Ok(record)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::storage(format!("no record with id '{}'", id)))
    }

    fn count(&self) -> Result<usize> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.len())
    }
}

macro_rules! delegate_model_repository {
    ($target:ty, $model:ty) => {
        impl ModelRepository<$model> for $target {
            fn find_by_id(&self, id: &str) -> Result<Option<$model>> {
                self.inner.find_by_id(id)
            }

            fn find_all(&self) -> Result<Vec<$model>> {
                self.inner.find_all()
            }

            fn insert(&self, record: $model) -> Result<$model> {
                self.inner.insert(record)
            }

            fn insert_many(&self, records: Vec<$model>) -> Result<Vec<$model>> {
                self.inner.insert_many(records)
            }

            fn update(&self, record: $model) -> Result<$model> {
                self.inner.update(record)
            }

            fn delete(&self, id: &str) -> Result<()> {
                self.inner.delete(id)
            }

            fn count(&self) -> Result<usize> {
                self.inner.count()
            }
        }
    };
}

// =============================================================================
// Gene repository
// =============================================================================

pub struct InMemoryGeneRepository {
    inner: InMemoryRepository<Gene>,
}

impl InMemoryGeneRepository {
    pub fn new() -> Self {
        Self {
            inner: InMemoryRepository::new("gene"),
        }
    }
}

impl Default for InMemoryGeneRepository {
    fn default() -> Self {
        Self::new()
    }
}

delegate_model_repository!(InMemoryGeneRepository, Gene);

impl MetadataOperations<Gene> for InMemoryGeneRepository {
    fn find_by_primary_id(&self, keyword: &str) -> Result<Vec<Gene>> {
        self.inner
            .filtered(|g| g.primary_reference_id.eq_ignore_ascii_case(keyword))
    }

    fn find_by_name(&self, keyword: &str) -> Result<Vec<Gene>> {
        self.inner
            .filtered(|g| g.primary_gene_symbol.eq_ignore_ascii_case(keyword))
    }

    fn find_by_alias(&self, keyword: &str) -> Result<Vec<Gene>> {
        self.inner
            .filtered(|g| g.aliases.iter().any(|a| a.eq_ignore_ascii_case(keyword)))
    }
}

impl GeneRepository for InMemoryGeneRepository {}

// =============================================================================
// Sample repository
// =============================================================================

pub struct InMemorySampleRepository {
    inner: InMemoryRepository<Sample>,
}

impl InMemorySampleRepository {
    pub fn new() -> Self {
        Self {
            inner: InMemoryRepository::new("sample"),
        }
    }
}

impl Default for InMemorySampleRepository {
    fn default() -> Self {
        Self::new()
    }
}

delegate_model_repository!(InMemorySampleRepository, Sample);

impl MetadataOperations<Sample> for InMemorySampleRepository {
    fn find_by_primary_id(&self, keyword: &str) -> Result<Vec<Sample>> {
        self.inner
            .filtered(|s| s.id().is_some_and(|id| id.eq_ignore_ascii_case(keyword)))
    }

    fn find_by_name(&self, keyword: &str) -> Result<Vec<Sample>> {
        self.inner.filtered(|s| s.name.eq_ignore_ascii_case(keyword))
    }

    fn find_by_alias(&self, keyword: &str) -> Result<Vec<Sample>> {
        self.inner
            .filtered(|s| s.aliases.iter().any(|a| a.eq_ignore_ascii_case(keyword)))
    }
}

impl SampleRepository for InMemorySampleRepository {
    fn find_by_name_and_data_set(&self, name: &str, data_set_id: &str) -> Result<Option<Sample>> {
        Ok(self
            .inner
            .filtered(|s| s.name.eq_ignore_ascii_case(name) && s.data_set_id == data_set_id)?
            .into_iter()
            .next())
    }
}

// =============================================================================
// Subject repository
// =============================================================================

pub struct InMemorySubjectRepository {
    inner: InMemoryRepository<Subject>,
}

impl InMemorySubjectRepository {
    pub fn new() -> Self {
        Self {
            inner: InMemoryRepository::new("subject"),
        }
    }
}

impl Default for InMemorySubjectRepository {
    fn default() -> Self {
        Self::new()
    }
}

delegate_model_repository!(InMemorySubjectRepository, Subject);

impl SubjectRepository for InMemorySubjectRepository {
    fn find_by_name(&self, name: &str) -> Result<Option<Subject>> {
        Ok(self
            .inner
            .filtered(|s| s.name == name)?
            .into_iter()
            .next())
    }
}

// =============================================================================
// DataSet repository
// =============================================================================

pub struct InMemoryDataSetRepository {
    inner: InMemoryRepository<DataSet>,
}

impl InMemoryDataSetRepository {
    pub fn new() -> Self {
        Self {
            inner: InMemoryRepository::new("dataset"),
        }
    }
}

impl Default for InMemoryDataSetRepository {
    fn default() -> Self {
        Self::new()
    }
}

delegate_model_repository!(InMemoryDataSetRepository, DataSet);

impl DataSetRepository for InMemoryDataSetRepository {
    fn find_by_short_name(&self, short_name: &str) -> Result<Option<DataSet>> {
        Ok(self
            .inner
            .filtered(|d| d.short_name == short_name)?
            .into_iter()
            .next())
    }
}

// =============================================================================
// DataFile repository
// =============================================================================

pub struct InMemoryDataFileRepository {
    inner: InMemoryRepository<DataFile>,
}

impl InMemoryDataFileRepository {
    pub fn new() -> Self {
        Self {
            inner: InMemoryRepository::new("datafile"),
        }
    }
}

impl Default for InMemoryDataFileRepository {
    fn default() -> Self {
        Self::new()
    }
}

delegate_model_repository!(InMemoryDataFileRepository, DataFile);

impl DataFileRepository for InMemoryDataFileRepository {
    fn find_by_file_path(&self, file_path: &str) -> Result<Option<DataFile>> {
        Ok(self
            .inner
            .filtered(|f| f.file_path == file_path)?
            .into_iter()
            .next())
    }
}

// =============================================================================
// Data record repositories
// =============================================================================

pub struct InMemoryDataRecordRepository<T: DataRecord> {
    inner: InMemoryRepository<T>,
}

impl<T: DataRecord> InMemoryDataRecordRepository<T> {
    pub fn new() -> Self {
        Self {
            inner: InMemoryRepository::new("record"),
        }
    }
}

impl<T: DataRecord> Default for InMemoryDataRecordRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DataRecord> ModelRepository<T> for InMemoryDataRecordRepository<T> {
    fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        self.inner.find_by_id(id)
    }

    fn find_all(&self) -> Result<Vec<T>> {
        self.inner.find_all()
    }

    fn insert(&self, record: T) -> Result<T> {
        self.inner.insert(record)
    }

    fn insert_many(&self, records: Vec<T>) -> Result<Vec<T>> {
        self.inner.insert_many(records)
    }

    fn update(&self, record: T) -> Result<T> {
        self.inner.update(record)
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.inner.delete(id)
    }

    fn count(&self) -> Result<usize> {
        self.inner.count()
    }
}

impl<T: DataRecord> DataRecordRepository<T> for InMemoryDataRecordRepository<T> {
    fn find_by_data_file_id(&self, data_file_id: &str) -> Result<Vec<T>> {
        self.inner.filtered(|r| r.data_file_id() == data_file_id)
    }

    fn supports_data_file_delete(&self) -> bool {
        true
    }

    fn delete_by_data_file_id(&self, data_file_id: &str) -> Result<u64> {
        let mut records = self.inner.records.write().map_err(poisoned)?;
        let doomed: Vec<String> = records
            .iter()
            .filter(|(_, r)| r.data_file_id() == data_file_id)
            .map(|(id, _)| id.clone())
            .collect();
        let removed = doomed.len() as u64;
        for id in doomed {
            records.remove(&id);
        }
        Ok(removed)
    }

    fn update_many(&self, records: Vec<T>) -> Result<Vec<T>> {
        let mut updated = Vec::with_capacity(records.len());
        for record in records {
            updated.push(self.inner.update(record)?);
        }
        Ok(updated)
    }
}

// =============================================================================
// Aggregate store
// =============================================================================

/// The full set of in-memory repositories used by the CLI and tests.
pub struct InMemoryDataStore {
    pub genes: Arc<InMemoryGeneRepository>,
    pub samples: Arc<InMemorySampleRepository>,
    pub subjects: Arc<InMemorySubjectRepository>,
    pub data_sets: Arc<InMemoryDataSetRepository>,
    pub data_files: Arc<InMemoryDataFileRepository>,
    pub expression: Arc<InMemoryDataRecordRepository<GeneExpression>>,
    pub copy_numbers: Arc<InMemoryDataRecordRepository<GeneCopyNumber>>,
    pub mutations: Arc<InMemoryDataRecordRepository<Mutation>>,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self {
            genes: Arc::new(InMemoryGeneRepository::new()),
            samples: Arc::new(InMemorySampleRepository::new()),
            subjects: Arc::new(InMemorySubjectRepository::new()),
            data_sets: Arc::new(InMemoryDataSetRepository::new()),
            data_files: Arc::new(InMemoryDataFileRepository::new()),
            expression: Arc::new(InMemoryDataRecordRepository::new()),
            copy_numbers: Arc::new(InMemoryDataRecordRepository::new()),
            mutations: Arc::new(InMemoryDataRecordRepository::new()),
        }
    }
}

impl Default for InMemoryDataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> InMemoryGeneRepository {
        let repo = InMemoryGeneRepository::new();
        repo.insert(Gene::new("672", "BRCA1").with_alias("RNF53"))
            .unwrap();
        repo.insert(Gene::new("675", "BRCA2").with_alias("FANCD1"))
            .unwrap();
        // A gene whose symbol collides with another gene's primary id.
        repo.insert(Gene::new("9999", "672")).unwrap();
        repo
    }

    #[test]
    fn test_insert_assigns_identity() {
        let repo = InMemoryGeneRepository::new();
        let gene = repo.insert(Gene::new("7157", "TP53")).unwrap();
        assert!(gene.id().is_some());
        assert_eq!(repo.count().unwrap(), 1);
        let found = repo.find_by_id(gene.id().unwrap()).unwrap().unwrap();
        assert_eq!(found.primary_gene_symbol, "TP53");
    }

    #[test]
    fn test_insert_rejects_persisted_record() {
        let repo = InMemoryGeneRepository::new();
        let gene = repo.insert(Gene::new("7157", "TP53")).unwrap();
        assert!(repo.insert(gene).is_err());
    }

    #[test]
    fn test_update_replaces_by_identity() {
        let repo = InMemoryGeneRepository::new();
        let mut gene = repo.insert(Gene::new("7157", "TP53")).unwrap();
        gene.aliases.push("P53".to_string());
        repo.update(gene.clone()).unwrap();
        let found = repo.find_by_id(gene.id().unwrap()).unwrap().unwrap();
        assert_eq!(found.aliases, vec!["P53"]);
    }

    #[test]
    fn test_best_guess_prefers_primary_id_over_symbol() {
        let repo = catalog();
        // "672" is BRCA1's primary id and another gene's symbol; the id
        // match wins.
        let gene = repo.best_guess("672").unwrap().unwrap();
        assert_eq!(gene.primary_gene_symbol, "BRCA1");
    }

    #[test]
    fn test_best_guess_falls_back_to_symbol_then_alias() {
        let repo = catalog();
        let gene = repo.best_guess("brca2").unwrap().unwrap();
        assert_eq!(gene.primary_reference_id, "675");

        let gene = repo.best_guess("fancd1").unwrap().unwrap();
        assert_eq!(gene.primary_gene_symbol, "BRCA2");
    }

    #[test]
    fn test_best_guess_no_match() {
        let repo = catalog();
        assert!(repo.best_guess("NOPE").unwrap().is_none());
    }

    #[test]
    fn test_guess_unions_across_strategies() {
        let repo = catalog();
        // Matches BRCA1 by primary id and the decoy gene by symbol.
        let matches = repo.guess("672").unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].primary_gene_symbol, "BRCA1");
        assert_eq!(matches[1].primary_gene_symbol, "672");
    }

    #[test]
    fn test_sample_lookup_scoped_to_data_set() {
        let repo = InMemorySampleRepository::new();
        let mut sample = Sample {
            id: None,
            name: "S-001".to_string(),
            aliases: Vec::new(),
            subject_id: "subject-1".to_string(),
            data_set_id: "dataset-1".to_string(),
            tissue: "n/a".to_string(),
            histology: "n/a".to_string(),
            sample_type: "n/a".to_string(),
        };
        repo.insert(sample.clone()).unwrap();
        sample.data_set_id = "dataset-2".to_string();
        repo.insert(sample).unwrap();

        let found = repo
            .find_by_name_and_data_set("s-001", "dataset-2")
            .unwrap()
            .unwrap();
        assert_eq!(found.data_set_id, "dataset-2");
        assert!(
            repo.find_by_name_and_data_set("s-001", "dataset-3")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_delete_by_data_file_id() {
        let repo: InMemoryDataRecordRepository<GeneExpression> =
            InMemoryDataRecordRepository::new();
        for file in ["file-1", "file-2"] {
            for _ in 0..3 {
                repo.insert(GeneExpression::new(file, "dataset-1")).unwrap();
            }
        }
        assert!(repo.supports_data_file_delete());
        assert_eq!(repo.delete_by_data_file_id("file-1").unwrap(), 3);
        assert_eq!(repo.count().unwrap(), 3);
        assert!(repo.find_by_data_file_id("file-1").unwrap().is_empty());
        assert_eq!(repo.find_by_data_file_id("file-2").unwrap().len(), 3);
    }
}
