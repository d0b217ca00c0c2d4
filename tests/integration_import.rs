//! End-to-end tests for the file import orchestrator over the in-memory
//! store: duplicate detection, overwrite semantics, skip policies and
//! metadata association reconciliation.

use omics_loader::app::models::{DataSet, Gene, Model};
use omics_loader::app::services::orchestrator::{FileImportOrchestrator, ImportOutcome};
use omics_loader::app::services::registry::ProcessorRegistry;
use omics_loader::app::storage::memory::InMemoryDataStore;
use omics_loader::app::storage::{
    DataFileRepository, DataRecordRepository, DataSetRepository, ModelRepository,
};
use omics_loader::config::{DataImportConfig, ImportOptions};
use omics_loader::{Error, Result};
use std::path::{Path, PathBuf};

const GCT_TWO_ROWS: &str = "\
#1.2
2\t3
Name\tDescription\tTCGA-A1-0001-01\tTCGA-A1-0002-01\tTCGA-A1-0003-01
672\tBRCA1\t1.5\t2.5\t3.5
7157\tTP53\t-0.25\t0.0\t4.125
";

const GCT_THREE_ROWS: &str = "\
#1.2
3\t3
Name\tDescription\tTCGA-A1-0001-01\tTCGA-A1-0002-01\tTCGA-A1-0003-01
672\tBRCA1\t1.5\t2.5\t3.5
7157\tTP53\t-0.25\t0.0\t4.125
675\tBRCA2\t0.5\t0.75\t1.0
";

const SAMPLE_MAF: &str = "\
#version 2.4
Hugo_Symbol\tEntrez_Gene_Id\tChromosome\tStart_Position\tEnd_Position\tStrand\tVariant_Classification\tVariant_Type\tReference_Allele\tTumor_Seq_Allele2\tTumor_Sample_Barcode
BRCA1\t672\t17\t41276045\t41276046\t+\tMissense_Mutation\tSNP\tC\tT\tTCGA-A1-0001-01
TP53\t7157\t17\t7577120\t7577121\t-\tNonsense_Mutation\tSNP\tG\tA\tTCGA-A1-0002-01
";

struct Harness {
    store: InMemoryDataStore,
    orchestrator: FileImportOrchestrator,
    dir: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        let store = InMemoryDataStore::new();
        store
            .genes
            .insert(Gene::new("672", "BRCA1").with_alias("RNF53"))
            .unwrap();
        store.genes.insert(Gene::new("675", "BRCA2")).unwrap();
        store.genes.insert(Gene::new("7157", "TP53")).unwrap();

        let registry = ProcessorRegistry::with_default_processors(&store);
        let orchestrator = FileImportOrchestrator::new(
            registry,
            store.data_sets.clone(),
            store.data_files.clone(),
            store.subjects.clone(),
            DataImportConfig::default(),
        );
        Self {
            store,
            orchestrator,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn options(&self) -> ImportOptions {
        ImportOptions::default().with_temp_dir(self.dir.path())
    }

    fn import(
        &mut self,
        path: &Path,
        data_type: &str,
        overwrite: bool,
    ) -> Result<ImportOutcome> {
        let options = self.options();
        self.orchestrator
            .import(path, data_type, None, overwrite, options)
    }
}

#[test]
fn gct_import_writes_one_record_per_gene_sample_pair() {
    let mut harness = Harness::new();
    let path = harness.write_file("expr.gct", GCT_TWO_ROWS);

    let outcome = harness.import(&path, "gct_gene_expression", false).unwrap();
    let ImportOutcome::Imported(summary) = &outcome else {
        panic!("expected an imported outcome");
    };
    assert_eq!(summary.records_written, 6);
    assert_eq!(summary.records_skipped, 0);
    assert_eq!(summary.samples.len(), 3);

    // Records landed via the staged temp file and bulk importer.
    let records = harness.store.expression.find_all().unwrap();
    assert_eq!(records.len(), 6);

    let data_file = harness
        .store
        .data_files
        .find_by_file_path(&path.to_string_lossy())
        .unwrap()
        .unwrap();
    assert!(
        records
            .iter()
            .all(|r| r.data_file_id == data_file.id().unwrap())
    );
    assert!(
        records
            .iter()
            .all(|r| r.data_set_id == data_file.data_set_id)
    );
    assert_eq!(data_file.model_type, "gene_expression");
    assert_eq!(data_file.checksum.len(), 64);
}

#[test]
fn associations_are_reconciled_after_success() {
    let mut harness = Harness::new();
    let path = harness.write_file("expr.gct", GCT_TWO_ROWS);
    harness.import(&path, "gct_gene_expression", false).unwrap();

    let data_set = harness
        .store
        .data_sets
        .find_by_short_name("default")
        .unwrap()
        .unwrap();
    assert_eq!(data_set.sample_ids.len(), 3);
    assert_eq!(data_set.data_file_ids.len(), 1);

    // Every subject owns its discovered sample.
    for subject in harness.store.subjects.find_all().unwrap() {
        assert_eq!(subject.sample_ids.len(), 1);
    }

    // A second, different file joins the same default dataset.
    let maf = harness.write_file("sample.maf", SAMPLE_MAF);
    harness.import(&maf, "maf_mutation", false).unwrap();
    let data_set = harness
        .store
        .data_sets
        .find_by_short_name("default")
        .unwrap()
        .unwrap();
    assert_eq!(data_set.data_file_ids.len(), 2);
    // MAF barcodes resolve to the samples the GCT header already created.
    assert_eq!(data_set.sample_ids.len(), 3);
    assert_eq!(harness.store.data_sets.count().unwrap(), 1);
}

#[test]
fn reimport_without_overwrite_is_skipped() {
    let mut harness = Harness::new();
    let path = harness.write_file("expr.gct", GCT_TWO_ROWS);
    harness.import(&path, "gct_gene_expression", false).unwrap();

    let outcome = harness.import(&path, "gct_gene_expression", false).unwrap();
    assert!(matches!(outcome, ImportOutcome::SkippedExisting));
    assert_eq!(outcome.records_written(), 0);
    assert!(outcome.was_skipped());
    assert_eq!(harness.store.expression.count().unwrap(), 6);
}

#[test]
fn reimport_unchanged_with_overwrite_is_skipped() {
    let mut harness = Harness::new();
    let path = harness.write_file("sample.maf", SAMPLE_MAF);
    harness.import(&path, "maf_mutation", false).unwrap();
    assert_eq!(harness.store.mutations.count().unwrap(), 2);

    let outcome = harness.import(&path, "maf_mutation", true).unwrap();
    assert!(matches!(outcome, ImportOutcome::SkippedUnchanged));
    assert_eq!(outcome.records_written(), 0);
    assert_eq!(harness.store.mutations.count().unwrap(), 2);
}

#[test]
fn reimport_changed_with_overwrite_replaces_records() {
    let mut harness = Harness::new();
    let path = harness.write_file("expr.gct", GCT_TWO_ROWS);
    harness.import(&path, "gct_gene_expression", false).unwrap();
    let original = harness
        .store
        .data_files
        .find_by_file_path(&path.to_string_lossy())
        .unwrap()
        .unwrap();

    std::fs::write(&path, GCT_THREE_ROWS).unwrap();
    let outcome = harness.import(&path, "gct_gene_expression", true).unwrap();
    assert_eq!(outcome.records_written(), 9);

    // Replacement, not accumulation.
    let records = harness.store.expression.find_all().unwrap();
    assert_eq!(records.len(), 9);
    let updated = harness
        .store
        .data_files
        .find_by_file_path(&path.to_string_lossy())
        .unwrap()
        .unwrap();
    assert_eq!(updated.id(), original.id());
    assert_ne!(updated.checksum, original.checksum);
    assert!(
        harness
            .store
            .expression
            .find_by_data_file_id(original.id().unwrap())
            .unwrap()
            .len()
            == 9
    );
}

#[test]
fn unknown_data_type_is_a_preflight_error() {
    let mut harness = Harness::new();
    let path = harness.write_file("expr.gct", GCT_TWO_ROWS);
    let result = harness.import(&path, "vcf_variant", false);
    assert!(matches!(result, Err(Error::UnsupportedDataType { .. })));
    // No partial work: no DataFile record was created.
    assert_eq!(harness.store.data_files.count().unwrap(), 0);
}

#[test]
fn unknown_data_set_key_is_a_preflight_error() {
    let mut harness = Harness::new();
    let path = harness.write_file("expr.gct", GCT_TWO_ROWS);
    let options = harness.options();
    let result =
        harness
            .orchestrator
            .import(&path, "gct_gene_expression", Some("nope"), false, options);
    assert!(matches!(result, Err(Error::UnknownDataSet { .. })));
}

#[test]
fn data_set_resolved_by_short_name() {
    let mut harness = Harness::new();
    let mut cohort = DataSet::new("tcga-brca", "TCGA breast cancer");
    cohort
        .parameters
        .insert("default.sample_tissue".to_string(), "breast".to_string());
    harness.store.data_sets.insert(cohort).unwrap();

    let path = harness.write_file("expr.gct", GCT_TWO_ROWS);
    let options = harness.options();
    harness
        .orchestrator
        .import(&path, "gct_gene_expression", Some("tcga-brca"), false, options)
        .unwrap();

    let cohort = harness
        .store
        .data_sets
        .find_by_short_name("tcga-brca")
        .unwrap()
        .unwrap();
    assert_eq!(cohort.sample_ids.len(), 3);
    // Samples inherited the dataset's default tissue attribute.
    for sample in harness.store.samples.find_all().unwrap() {
        assert_eq!(sample.tissue, "breast");
    }
}

#[test]
fn unresolvable_gene_aborts_with_zero_records_committed() {
    let mut harness = Harness::new();
    let content = "\
#1.2
2\t2
Name\tDescription\tS-1\tS-2
NOT_A_GENE\t\t1.0\t2.0
672\tBRCA1\t3.0\t4.0
";
    let path = harness.write_file("bad.gct", content);
    let result = harness.import(&path, "gct_gene_expression", false);
    assert!(matches!(result, Err(Error::InvalidGene { .. })));
    assert_eq!(harness.store.expression.count().unwrap(), 0);
}

#[test]
fn unresolvable_gene_skipped_under_flag() {
    let mut harness = Harness::new();
    let content = "\
#1.2
2\t2
Name\tDescription\tS-1\tS-2
NOT_A_GENE\t\t1.0\t2.0
672\tBRCA1\t3.0\t4.0
";
    let path = harness.write_file("bad.gct", content);
    let options = harness
        .options()
        .with_skip_invalid_genes();
    let outcome = harness
        .orchestrator
        .import(&path, "gct_gene_expression", None, false, options)
        .unwrap();
    let ImportOutcome::Imported(summary) = outcome else {
        panic!("expected an imported outcome");
    };
    assert_eq!(summary.records_written, 2);
    assert_eq!(summary.records_skipped, 1);
    assert_eq!(harness.store.expression.count().unwrap(), 2);
}

#[test]
fn failed_import_can_be_retried_after_fixing_the_file() {
    let mut harness = Harness::new();
    let content = "\
#1.2
1\t2
Name\tDescription\tS-1\tS-2
NOT_A_GENE\t\t1.0\t2.0
";
    let path = harness.write_file("retry.gct", content);
    assert!(harness.import(&path, "gct_gene_expression", false).is_err());

    std::fs::write(&path, GCT_TWO_ROWS).unwrap();
    // The first attempt registered the DataFile; retry with overwrite.
    let outcome = harness.import(&path, "gct_gene_expression", true).unwrap();
    assert_eq!(outcome.records_written(), 6);
    assert_eq!(harness.store.expression.count().unwrap(), 6);
}
