//! Reader for GCT expression matrices
//! (<http://software.broadinstitute.org/cancer/software/genepattern/file-formats-guide#GCT>).
//!
//! GCT files carry a `#1.2` version line, a `rows<TAB>cols` dimension line,
//! then a column header with two metadata columns (Name, Description)
//! followed by one column per sample.

use crate::app::models::{GeneExpression, Model, Sample};
use crate::app::services::dataset_support::DataSetSupport;
use crate::app::services::processor::ImportContext;
use crate::app::services::readers::{
    DelimitedFileReader, LineOutcome, LineParser, SampleColumns, SkipReason,
};
use crate::app::storage::{GeneRepository, MetadataOperations};
use crate::constants::{GCT_VERSION_PREFIX, MATRIX_METADATA_COLUMNS, TAB_DELIMITER};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::warn;

/// Record reader producing one [`GeneExpression`] per resolvable
/// (gene, sample) cell of a GCT matrix.
pub type GctGeneExpressionReader = DelimitedFileReader<GeneExpression, GctLineParser>;

impl GctGeneExpressionReader {
    pub fn gct(genes: Arc<dyn GeneRepository>, support: Arc<DataSetSupport>) -> Self {
        DelimitedFileReader::new(GctLineParser::new(genes, support))
    }
}

/// Line parser for the GCT format.
pub struct GctLineParser {
    genes: Arc<dyn GeneRepository>,
    support: Arc<DataSetSupport>,
    sample_columns: SampleColumns,
}

impl GctLineParser {
    pub fn new(genes: Arc<dyn GeneRepository>, support: Arc<DataSetSupport>) -> Self {
        Self {
            genes,
            support,
            sample_columns: SampleColumns::new(),
        }
    }

    /// Resolve the row's gene from the Name column, falling back to the
    /// Description column.
    fn resolve_gene(&self, bits: &[&str]) -> Result<Option<crate::app::models::Gene>> {
        let name = bits[0].trim();
        if !name.is_empty()
            && let Some(gene) = self.genes.best_guess(name)?
        {
            return Ok(Some(gene));
        }
        let description = bits[1].trim();
        if !description.is_empty() {
            return self.genes.best_guess(description);
        }
        Ok(None)
    }
}

impl LineParser<GeneExpression> for GctLineParser {
    fn begin(&mut self, _ctx: &ImportContext) -> Result<()> {
        self.sample_columns.clear();
        Ok(())
    }

    fn is_skippable(&self, line: &str, line_number: usize) -> bool {
        // Version tag and dimension lines precede the header.
        line_number == 1 && line.starts_with(GCT_VERSION_PREFIX)
            || line_number == 2
            || line.trim().is_empty()
    }

    fn is_header(&self, _line: &str, _line_number: usize) -> bool {
        true
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
    ) -> Result<LineOutcome<GeneExpression>> {
        let bits: Vec<&str> = line.trim().split(TAB_DELIMITER).collect();
        if bits.len() <= MATRIX_METADATA_COLUMNS {
            return Ok(LineOutcome::Skipped(SkipReason::MalformedLine));
        }

        let gene = match self.resolve_gene(&bits)? {
            Some(gene) => gene,
            None => {
                if ctx.options.skip_invalid_genes {
                    warn!("Skipping line due to invalid gene: {}", bits[0]);
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
                        "Cannot parse expression value '{}'",
                        cell
                    )));
                }
            };

            let mut record = GeneExpression::new(ctx.data_file_id(), ctx.data_set_id());
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
