//! Reader for mutation annotation format (MAF) files.
//!
//! MAF files are column-header-driven: named columns are looked up
//! case-insensitively, `#`-prefixed comment lines are skipped, and each
//! content line yields at most one [`Mutation`].

use crate::app::models::{Model, Mutation, Sample, VariantTranscript};
use crate::app::services::dataset_support::DataSetSupport;
use crate::app::services::processor::ImportContext;
use crate::app::services::readers::{DelimitedFileReader, LineOutcome, LineParser, SkipReason};
use crate::app::storage::{GeneRepository, MetadataOperations};
use crate::constants::{COMMENT_PREFIX, TAB_DELIMITER, maf_columns};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Record reader producing one [`Mutation`] per MAF data line.
pub type MafMutationReader = DelimitedFileReader<Mutation, MafLineParser>;

impl MafMutationReader {
    pub fn maf(genes: Arc<dyn GeneRepository>, support: Arc<DataSetSupport>) -> Self {
        DelimitedFileReader::new(MafLineParser::new(genes, support))
    }
}

/// Line parser for the MAF format.
pub struct MafLineParser {
    genes: Arc<dyn GeneRepository>,
    support: Arc<DataSetSupport>,
    columns: HashMap<String, usize>,
    sample_cache: HashMap<String, Sample>,
}

impl MafLineParser {
    pub fn new(genes: Arc<dyn GeneRepository>, support: Arc<DataSetSupport>) -> Self {
        Self {
            genes,
            support,
            columns: HashMap::new(),
            sample_cache: HashMap::new(),
        }
    }

    fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    fn column_value<'a>(&self, bits: &[&'a str], column: &str) -> Option<&'a str> {
        self.columns
            .get(column)
            .and_then(|&index| bits.get(index))
            .map(|value| value.trim())
    }

    fn owned_column_value(&self, bits: &[&str], column: &str) -> String {
        self.column_value(bits, column).unwrap_or_default().to_string()
    }

    /// Resolve the line's sample from the tumor barcode column, using the
    /// per-run cache to avoid duplicate creation.
    fn resolve_sample(&mut self, bits: &[&str], ctx: &ImportContext) -> Result<Option<Sample>> {
        let Some(name) = self.column_value(bits, maf_columns::TUMOR_SAMPLE_BARCODE) else {
            return Ok(None);
        };
        if name.is_empty() {
            return Ok(None);
        }
        if let Some(sample) = self.sample_cache.get(name) {
            return Ok(Some(sample.clone()));
        }
        let sample = self.support.resolve_or_create_sample(name, &ctx.data_set)?;
        self.sample_cache.insert(name.to_string(), sample.clone());
        Ok(Some(sample))
    }

    /// Resolve the line's gene from the Entrez id column, falling back to
    /// the HUGO symbol column.
    fn resolve_gene(&self, bits: &[&str]) -> Result<Option<crate::app::models::Gene>> {
        if self.has_column(maf_columns::ENTREZ_GENE_ID)
            && let Some(value) = self.column_value(bits, maf_columns::ENTREZ_GENE_ID)
            && !value.is_empty()
            && let Some(gene) = self.genes.best_guess(value)?
        {
            return Ok(Some(gene));
        }
        if self.has_column(maf_columns::HUGO_SYMBOL)
            && let Some(value) = self.column_value(bits, maf_columns::HUGO_SYMBOL)
            && !value.is_empty()
        {
            return self.genes.best_guess(value);
        }
        Ok(None)
    }

    fn parse_position(
        &self,
        bits: &[&str],
        column: &str,
        ctx: &ImportContext,
    ) -> Result<std::result::Result<i64, SkipReason>> {
        let raw = self.column_value(bits, column).unwrap_or_default();
        match raw.parse::<i64>() {
            Ok(position) => Ok(Ok(position)),
            Err(_) => {
                if ctx.options.skip_invalid_records {
                    warn!("Skipping line, cannot parse {} from '{}'", column, raw);
                    Ok(Err(SkipReason::InvalidValue))
                } else {
                    Err(Error::invalid_record(format!(
                        "Cannot parse {} from '{}'",
                        column, raw
                    )))
                }
            }
        }
    }

    /// Parse the `other_transcripts` column: `|`-separated
    /// `GENE_TRANSCRIPT` pairs, each gene resolved best-effort.
    fn parse_alternate_transcripts(&self, bits: &[&str]) -> Result<Vec<VariantTranscript>> {
        let mut transcripts = Vec::new();
        let raw = self.owned_column_value(bits, maf_columns::OTHER_TRANSCRIPTS);
        for entry in raw.split('|') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let Some((gene_token, transcript_id)) = entry.split_once('_') else {
                continue;
            };
            let gene_id = self
                .genes
                .best_guess(gene_token)?
                .and_then(|g| g.id().map(str::to_string));
            transcripts.push(VariantTranscript {
                gene_id,
                transcript_id: transcript_id.to_string(),
            });
        }
        Ok(transcripts)
    }
}

impl LineParser<Mutation> for MafLineParser {
    fn begin(&mut self, _ctx: &ImportContext) -> Result<()> {
        self.columns.clear();
        self.sample_cache.clear();
        Ok(())
    }

    fn is_skippable(&self, line: &str, _line_number: usize) -> bool {
        line.starts_with(COMMENT_PREFIX) || line.trim().is_empty()
    }

    fn is_header(&self, _line: &str, _line_number: usize) -> bool {
        // The first non-comment line is the column header.
        true
    }

    fn parse_header(&mut self, line: &str, _ctx: &ImportContext) -> Result<()> {
        self.columns.clear();
        for (index, token) in line.trim().split(TAB_DELIMITER).enumerate() {
            let token = token.trim();
            if !token.is_empty() {
                self.columns.insert(token.to_lowercase(), index);
            }
        }
        Ok(())
    }

    fn records_from_line(
        &mut self,
        line: &str,
        ctx: &ImportContext,
    ) -> Result<LineOutcome<Mutation>> {
        let bits: Vec<&str> = line.split(TAB_DELIMITER).collect();

        let sample = match self.resolve_sample(&bits, ctx) {
            Ok(Some(sample)) => sample,
            Ok(None) => {
                if ctx.options.skip_invalid_samples {
                    warn!("Skipping line due to invalid sample");
                    return Ok(LineOutcome::Skipped(SkipReason::InvalidSample));
                }
                return Err(Error::invalid_sample(
                    self.owned_column_value(&bits, maf_columns::TUMOR_SAMPLE_BARCODE),
                ));
            }
            Err(e) if e.is_skippable(&ctx.options) => {
                warn!("Skipping line due to invalid sample: {}", e);
                return Ok(LineOutcome::Skipped(SkipReason::InvalidSample));
            }
            Err(e) => return Err(e),
        };

        let gene = match self.resolve_gene(&bits)? {
            Some(gene) => gene,
            None => {
                if ctx.options.skip_invalid_genes {
                    warn!(
                        "Skipping line due to invalid gene: {}",
                        self.owned_column_value(&bits, maf_columns::HUGO_SYMBOL)
                    );
                    return Ok(LineOutcome::Skipped(SkipReason::InvalidGene));
                }
                return Err(Error::invalid_gene(
                    self.owned_column_value(&bits, maf_columns::HUGO_SYMBOL),
                ));
            }
        };

        let start = match self.parse_position(&bits, maf_columns::START_POSITION, ctx)? {
            Ok(position) => position,
            Err(reason) => return Ok(LineOutcome::Skipped(reason)),
        };
        let stop = match self.parse_position(&bits, maf_columns::END_POSITION, ctx)? {
            Ok(position) => position,
            Err(reason) => return Ok(LineOutcome::Skipped(reason)),
        };

        let mut mutation = Mutation::new(ctx.data_file_id(), ctx.data_set_id());
        mutation.gene_id = gene.id().unwrap_or_default().to_string();
        mutation.sample_id = sample.id().unwrap_or_default().to_string();
        mutation.chromosome = self.owned_column_value(&bits, maf_columns::CHROMOSOME);
        mutation.dna_start_position = start;
        mutation.dna_stop_position = stop;
        mutation.strand = self.owned_column_value(&bits, maf_columns::STRAND);
        mutation.variant_classification =
            self.owned_column_value(&bits, maf_columns::VARIANT_CLASSIFICATION);
        mutation.variant_type = self.owned_column_value(&bits, maf_columns::VARIANT_TYPE);
        mutation.reference_allele = self.owned_column_value(&bits, maf_columns::REFERENCE_ALLELE);
        mutation.alternate_allele = self.owned_column_value(&bits, maf_columns::TUMOR_SEQ_ALLELE2);
        mutation.nucleotide_change = self.owned_column_value(&bits, maf_columns::CDNA_CHANGE);
        mutation.codon_change = self.owned_column_value(&bits, maf_columns::CODON_CHANGE);
        mutation.protein_change = self.owned_column_value(&bits, maf_columns::PROTEIN_CHANGE);
        mutation.nucleotide_transcript =
            self.owned_column_value(&bits, maf_columns::REFSEQ_MRNA_ID);
        mutation.protein_transcript = self.owned_column_value(&bits, maf_columns::REFSEQ_PROT_ID);
        mutation.alternate_transcripts = self.parse_alternate_transcripts(&bits)?;

        Ok(LineOutcome::Records(vec![mutation]))
    }

    fn samples(&self) -> Vec<Sample> {
        let mut samples: Vec<Sample> = self.sample_cache.values().cloned().collect();
        samples.sort_by(|a, b| a.name.cmp(&b.name));
        samples
    }
}
