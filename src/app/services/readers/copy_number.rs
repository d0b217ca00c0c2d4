//! Reader for plain tab-delimited copy-number matrices.
//!
//! The layout matches CCLE-style gene-level copy-number files: two leading
//! metadata columns (gene id, gene symbol) then one column per sample, with
//! the header on the first line.

use crate::app::models::{GeneCopyNumber, Model, Sample};
use crate::app::services::dataset_support::DataSetSupport;
use crate::app::services::processor::ImportContext;
use crate::app::services::readers::{
    DelimitedFileReader, LineOutcome, LineParser, SampleColumns, SkipReason,
};
use crate::app::storage::{GeneRepository, MetadataOperations};
use crate::constants::{MATRIX_METADATA_COLUMNS, TAB_DELIMITER};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::warn;

/// Record reader producing one [`GeneCopyNumber`] per resolvable
/// (gene, sample) cell.
pub type CopyNumberMatrixReader = DelimitedFileReader<GeneCopyNumber, CopyNumberLineParser>;

impl CopyNumberMatrixReader {
    pub fn copy_number(genes: Arc<dyn GeneRepository>, support: Arc<DataSetSupport>) -> Self {
        DelimitedFileReader::new(CopyNumberLineParser::new(genes, support))
    }
}

/// Line parser for copy-number matrices.
pub struct CopyNumberLineParser {
    genes: Arc<dyn GeneRepository>,
    support: Arc<DataSetSupport>,
    sample_columns: SampleColumns,
}

impl CopyNumberLineParser {
    pub fn new(genes: Arc<dyn GeneRepository>, support: Arc<DataSetSupport>) -> Self {
        Self {
            genes,
            support,
            sample_columns: SampleColumns::new(),
        }
    }
}

impl LineParser<GeneCopyNumber> for CopyNumberLineParser {
    fn begin(&mut self, _ctx: &ImportContext) -> Result<()> {
        self.sample_columns.clear();
        Ok(())
    }

    fn is_skippable(&self, line: &str, _line_number: usize) -> bool {
        // Malformed short lines carry no sample columns.
        line.trim().split(TAB_DELIMITER).count() <= MATRIX_METADATA_COLUMNS
    }

    fn is_header(&self, _line: &str, line_number: usize) -> bool {
        line_number == 1
    }

    fn parse_header(&mut self, line: &str, ctx: &ImportContext) -> Result<()> {
        let tokens: Vec<&str> = line.trim().split(TAB_DELIMITER).collect();
        self.sample_columns
            .parse_header(&tokens, MATRIX_METADATA_COLUMNS, &self.support, ctx)
    }

    fn records_from_line(
        &mut self,
        line: &str,
        ctx: &ImportContext,
    ) -> Result<LineOutcome<GeneCopyNumber>> {
        let bits: Vec<&str> = line.trim().split(TAB_DELIMITER).collect();

        let gene = match self.genes.best_guess(bits[0].trim())? {
            Some(gene) => gene,
            None => {
                if ctx.options.skip_invalid_genes {
                    warn!("Skipping unknown gene: {} {}", bits[0], bits[1]);
                    return Ok(LineOutcome::Skipped(SkipReason::InvalidGene));
                }
                return Err(Error::invalid_gene(bits[0]));
            }
        };
        let gene_id = gene.id().unwrap_or_default().to_string();

        let mut records = Vec::new();
        for (index, cell) in bits.iter().enumerate().skip(MATRIX_METADATA_COLUMNS) {
            let Some(sample) = self.sample_columns.sample(index) else {
                self.sample_columns.note_skipped_cell();
                continue;
            };

            let value = match cell.trim().parse::<f64>() {
                Ok(value) => value,
                Err(_) => {
                    if ctx.options.skip_invalid_records {
                        warn!("Skipping cell, cannot parse value: '{}'", cell);
                        self.sample_columns.note_skipped_cell();
                        continue;
                    }
                    return Err(Error::invalid_record(format!(
                        "Cannot parse copy-number value '{}'",
                        cell
                    )));
                }
            };

            let mut record = GeneCopyNumber::new(ctx.data_file_id(), ctx.data_set_id());
            record.gene_id = gene_id.clone();
            record.sample_id = sample.id().unwrap_or_default().to_string();
            record.subject_id = sample.subject_id.clone();
            record.value = value;
            records.push(record);
        }

        Ok(LineOutcome::Records(records))
    }

    fn samples(&self) -> Vec<Sample> {
        self.sample_columns.samples()
    }

    fn skipped_items(&self) -> usize {
        self.sample_columns.skipped_cells()
    }
}
