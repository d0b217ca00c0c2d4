//! Data-type registry: maps data-type labels to configured processors.

use crate::app::services::dataset_support::DataSetSupport;
use crate::app::services::importer::JsonLinesRecordImporter;
use crate::app::services::processor::{FileProcessor, GenericRecordProcessor};
use crate::app::services::readers::{
    CopyNumberMatrixReader, GctGeneExpressionReader, MafMutationReader,
};
use crate::app::services::validator::{
    GeneCopyNumberValidator, GeneExpressionValidator, MutationValidator,
};
use crate::app::services::writer::{RepositoryRecordWriter, TempFileRecordWriter};
use crate::app::storage::GeneRepository;
use crate::app::storage::memory::InMemoryDataStore;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry of record processors, keyed by the data-type labels they
/// support.
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: Vec<Box<dyn FileProcessor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self {
            processors: Vec::new(),
        }
    }

    /// Registry wired with the stock processors over the in-memory store.
    ///
    /// The GCT expression pipeline stages records to a temp file and
    /// bulk-loads them via an importer; the MAF and copy-number pipelines
    /// write straight to their repositories in batches.
    pub fn with_default_processors(store: &InMemoryDataStore) -> Self {
        let genes: Arc<dyn GeneRepository> = store.genes.clone();
        let support = Arc::new(DataSetSupport::new(
            store.subjects.clone(),
            store.samples.clone(),
        ));

        let mut registry = Self::new();
        registry.register(Box::new(
            GenericRecordProcessor::new(
                vec!["gct_gene_expression".to_string()],
                "Gene expression matrices in GCT format",
                Box::new(GctGeneExpressionReader::gct(genes.clone(), support.clone())),
                Box::new(TempFileRecordWriter::new()),
                store.expression.clone(),
            )
            .with_validator(Box::new(GeneExpressionValidator))
            .with_importer(Box::new(JsonLinesRecordImporter::new(
                store.expression.clone(),
            ))),
        ));
        registry.register(Box::new(
            GenericRecordProcessor::new(
                vec!["maf_mutation".to_string()],
                "Somatic mutations in MAF format",
                Box::new(MafMutationReader::maf(genes.clone(), support.clone())),
                Box::new(RepositoryRecordWriter::new(store.mutations.clone())),
                store.mutations.clone(),
            )
            .with_validator(Box::new(MutationValidator)),
        ));
        registry.register(Box::new(
            GenericRecordProcessor::new(
                vec!["gene_copy_number".to_string()],
                "Gene-level copy-number matrices",
                Box::new(CopyNumberMatrixReader::copy_number(genes, support)),
                Box::new(RepositoryRecordWriter::new(store.copy_numbers.clone())),
                store.copy_numbers.clone(),
            )
            .with_validator(Box::new(GeneCopyNumberValidator)),
        ));
        registry
    }

    pub fn register(&mut self, processor: Box<dyn FileProcessor>) {
        self.processors.push(processor);
    }

    /// Whether any registered processor handles the data-type label.
    pub fn is_supported(&self, data_type: &str) -> bool {
        self.processors
            .iter()
            .any(|p| p.data_types().iter().any(|t| t == data_type))
    }

    /// Whether any registered processor produces the given model type.
    pub fn is_supported_model(&self, model_type: &str) -> bool {
        self.processors.iter().any(|p| p.model_type() == model_type)
    }

    pub fn get_by_data_type(&mut self, data_type: &str) -> Option<&mut Box<dyn FileProcessor>> {
        self.processors
            .iter_mut()
            .find(|p| p.data_types().iter().any(|t| t == data_type))
    }

    pub fn get_by_model_type(&mut self, model_type: &str) -> Option<&mut Box<dyn FileProcessor>> {
        self.processors
            .iter_mut()
            .find(|p| p.model_type() == model_type)
    }

    /// Data-type label to description map, for operator-facing listings.
    pub fn data_type_descriptions(&self) -> BTreeMap<String, String> {
        let mut descriptions = BTreeMap::new();
        for processor in &self.processors {
            for data_type in processor.data_types() {
                descriptions.insert(data_type.clone(), processor.description().to_string());
            }
        }
        descriptions
    }
}
