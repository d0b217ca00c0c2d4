//! Storage collaborator contracts.
//!
//! The import pipeline consumes persistence exclusively through these
//! traits. A complete in-memory implementation lives in [`memory`]; real
//! deployments substitute database-backed repositories with the same
//! contracts.

use crate::Result;
use crate::app::models::{DataFile, DataRecord, DataSet, Gene, Model, Sample, Subject};

pub mod memory;

pub use memory::InMemoryDataStore;

/// Basic insert/update/find contract shared by all repositories.
pub trait ModelRepository<T: Model>: Send + Sync {
    fn find_by_id(&self, id: &str) -> Result<Option<T>>;

    fn find_all(&self) -> Result<Vec<T>>;

    /// Persist a new record, assigning its identity. Passing an
    /// already-persisted record is a storage error.
    fn insert(&self, record: T) -> Result<T>;

    /// Bulk insert; identities are assigned in input order.
    fn insert_many(&self, records: Vec<T>) -> Result<Vec<T>>;

    /// Replace an existing record by identity.
    fn update(&self, record: T) -> Result<T>;

    fn delete(&self, id: &str) -> Result<()>;

    fn count(&self) -> Result<usize>;
}

/// Ranked fuzzy lookup over reference entities.
///
/// `guess` and `best_guess` are the entity-resolution contract used by
/// record readers to match free-text identifiers (gene symbols, sample
/// names) to canonical records. The precedence order of `best_guess` is a
/// design decision: primary identifiers are authoritative, symbols/names
/// are the common case, aliases are the fallback.
pub trait MetadataOperations<T: Model>: ModelRepository<T> {
    /// All entities whose primary reference id matches the keyword,
    /// case-insensitively.
    fn find_by_primary_id(&self, keyword: &str) -> Result<Vec<T>>;

    /// All entities whose primary symbol/name matches the keyword,
    /// case-insensitively.
    fn find_by_name(&self, keyword: &str) -> Result<Vec<T>>;

    /// All entities with any alias matching the keyword, case-insensitively.
    fn find_by_alias(&self, keyword: &str) -> Result<Vec<T>>;

    /// Union of all match strategies, in precedence order. Duplicates may
    /// appear across strategies but not within one.
    fn guess(&self, keyword: &str) -> Result<Vec<T>> {
        let mut matches = self.find_by_primary_id(keyword)?;
        matches.extend(self.find_by_name(keyword)?);
        matches.extend(self.find_by_alias(keyword)?);
        Ok(matches)
    }

    /// First element of the first non-empty match strategy, evaluated in
    /// fixed precedence order: primary id, then name, then alias.
    fn best_guess(&self, keyword: &str) -> Result<Option<T>> {
        let matches = self.find_by_primary_id(keyword)?;
        if let Some(first) = matches.into_iter().next() {
            return Ok(Some(first));
        }
        let matches = self.find_by_name(keyword)?;
        if let Some(first) = matches.into_iter().next() {
            return Ok(Some(first));
        }
        let matches = self.find_by_alias(keyword)?;
        if let Some(first) = matches.into_iter().next() {
            return Ok(Some(first));
        }
        Ok(None)
    }
}

/// Reference gene catalog. Read-only from the pipeline's perspective.
pub trait GeneRepository: MetadataOperations<Gene> {}

/// Sample lookups, scoped to a dataset where names are only unique within
/// one cohort.
pub trait SampleRepository: MetadataOperations<Sample> {
    fn find_by_name_and_data_set(&self, name: &str, data_set_id: &str) -> Result<Option<Sample>>;
}

/// Subject lookups by exact name.
pub trait SubjectRepository: ModelRepository<Subject> {
    fn find_by_name(&self, name: &str) -> Result<Option<Subject>>;
}

/// Dataset lookups by short-name key.
pub trait DataSetRepository: ModelRepository<DataSet> {
    fn find_by_short_name(&self, short_name: &str) -> Result<Option<DataSet>>;
}

/// Data file lookups by unique file path.
pub trait DataFileRepository: ModelRepository<DataFile> {
    fn find_by_file_path(&self, file_path: &str) -> Result<Option<DataFile>>;
}

/// Bulk persistence for typed data records.
pub trait DataRecordRepository<T: DataRecord>: ModelRepository<T> {
    fn find_by_data_file_id(&self, data_file_id: &str) -> Result<Vec<T>>;

    /// Whether this repository can delete all records belonging to one data
    /// file. Overwrite imports are refused for repositories without this
    /// capability.
    fn supports_data_file_delete(&self) -> bool {
        false
    }

    /// Delete all records keyed by the given data file identity, returning
    /// the number removed. Only valid when
    /// [`supports_data_file_delete`](Self::supports_data_file_delete)
    /// reports true.
    fn delete_by_data_file_id(&self, data_file_id: &str) -> Result<u64>;

    /// Replace existing records by identity (bulk update mode).
    fn update_many(&self, records: Vec<T>) -> Result<Vec<T>>;
}
