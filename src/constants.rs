//! Shared constants for file parsing and record persistence.

/// Column delimiter shared by all supported flat-file formats
pub const TAB_DELIMITER: char = '\t';

/// Prefix marking comment lines in MAF and GCT files
pub const COMMENT_PREFIX: &str = "#";

/// Version tag expected on the first line of a GCT file
pub const GCT_VERSION_PREFIX: &str = "#1.";

/// Number of leading metadata columns (Name, Description) in matrix formats
pub const MATRIX_METADATA_COLUMNS: usize = 2;

/// Records buffered by the repository writer before a bulk flush
pub const WRITE_BATCH_SIZE: usize = 200;

/// File name suffix for staged temp files consumed by record importers
pub const TEMP_FILE_SUFFIX: &str = "import.tmp.jsonl";

/// Placeholder for sample attributes with no subject or dataset default
pub const ATTRIBUTE_NOT_AVAILABLE: &str = "n/a";

/// Subject/dataset attribute keys consulted when creating samples
pub mod sample_attributes {
    pub const HISTOLOGY: &str = "sample_histology";
    pub const TISSUE: &str = "sample_tissue";
    pub const SAMPLE_TYPE: &str = "sample_type";

    /// Prefix for dataset-level fallback parameters (eg. `default.sample_tissue`)
    pub const DATASET_DEFAULT_PREFIX: &str = "default.";
}

/// Well-known MAF column names, matched case-insensitively
pub mod maf_columns {
    pub const HUGO_SYMBOL: &str = "hugo_symbol";
    pub const ENTREZ_GENE_ID: &str = "entrez_gene_id";
    pub const TUMOR_SAMPLE_BARCODE: &str = "tumor_sample_barcode";
    pub const CHROMOSOME: &str = "chromosome";
    pub const START_POSITION: &str = "start_position";
    pub const END_POSITION: &str = "end_position";
    pub const STRAND: &str = "strand";
    pub const VARIANT_CLASSIFICATION: &str = "variant_classification";
    pub const VARIANT_TYPE: &str = "variant_type";
    pub const REFERENCE_ALLELE: &str = "reference_allele";
    pub const TUMOR_SEQ_ALLELE2: &str = "tumor_seq_allele2";
    pub const CDNA_CHANGE: &str = "cdna_change";
    pub const CODON_CHANGE: &str = "codon_change";
    pub const PROTEIN_CHANGE: &str = "protein_change";
    pub const REFSEQ_MRNA_ID: &str = "refseq_mrna_id";
    pub const REFSEQ_PROT_ID: &str = "refseq_prot_id";
    pub const OTHER_TRANSCRIPTS: &str = "other_transcripts";
}
