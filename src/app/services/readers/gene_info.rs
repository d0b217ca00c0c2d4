//! Loader for NCBI `gene_info`-style reference catalogs.
//!
//! Populates the gene repository the pipeline resolves identifiers against.
//! The file is tab-delimited with `#`-prefixed comment lines; the columns
//! used are tax_id, GeneID, Symbol, Synonyms (`|`-separated, `-` for none)
//! and dbXrefs (`|`-separated `source:value` pairs).

use crate::app::models::Gene;
use crate::app::storage::{GeneRepository, ModelRepository};
use crate::constants::{COMMENT_PREFIX, TAB_DELIMITER};
use crate::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

const SYNONYMS_COLUMN: usize = 4;
const DB_XREFS_COLUMN: usize = 5;

/// Load a gene_info catalog file into the gene repository, returning the
/// number of genes inserted.
pub fn load_gene_catalog(path: &Path, genes: &dyn GeneRepository) -> Result<usize> {
    let file = File::open(path)
        .map_err(|e| Error::io(format!("Cannot read gene catalog {}", path.display()), e))?;
    let reader = BufReader::new(file);

    let mut count = 0;
    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io("Failed to read gene catalog line", e))?;
        if line.trim().is_empty() || line.starts_with(COMMENT_PREFIX) {
            continue;
        }
        let gene = gene_from_line(&line).ok_or_else(|| {
            Error::file_format(
                path.display().to_string(),
                format!("malformed gene_info line {}", line_number + 1),
            )
        })?;
        genes.insert(gene)?;
        count += 1;
    }

    info!("Loaded {} genes from catalog: {}", count, path.display());
    Ok(count)
}

fn gene_from_line(line: &str) -> Option<Gene> {
    let bits: Vec<&str> = line.split(TAB_DELIMITER).collect();
    if bits.len() <= DB_XREFS_COLUMN {
        return None;
    }

    let mut gene = Gene::new(bits[1].trim(), bits[2].trim());
    gene.taxonomy_id = bits[0].trim().to_string();
    for alias in bits[SYNONYMS_COLUMN].split('|') {
        let alias = alias.trim();
        if !alias.is_empty() && alias != "-" {
            gene.aliases.push(alias.to_string());
        }
    }
    for xref in bits[DB_XREFS_COLUMN].split('|') {
        let xref = xref.trim();
        if xref.is_empty() || xref == "-" {
            continue;
        }
        if let Some((source, value)) = xref.split_once(':') {
            // Values like HGNC:HGNC:1100 keep only the trailing id.
            let value = value.rsplit(':').next().unwrap_or(value);
            gene.external_references
                .insert(source.to_string(), value.to_string());
        }
    }
    Some(gene)
}
