//! Record readers for the supported flat-file formats.
//!
//! Each format implements [`LineParser`] and is driven by the generic
//! [`DelimitedFileReader`] line loop, which owns the file handle, skips
//! comment and malformed lines, parses the header exactly once, and buffers
//! multi-record lines.

use crate::app::models::Sample;
use crate::app::services::processor::ImportContext;
use crate::{Error, Result};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod copy_number;
pub mod gct;
pub mod gene_info;
pub mod maf;

#[cfg(test)]
mod tests;

pub use copy_number::CopyNumberMatrixReader;
pub use gct::GctGeneExpressionReader;
pub use gene_info::load_gene_catalog;
pub use maf::MafMutationReader;

/// Pulls typed records from an input file, one at a time.
///
/// A reader that discovers Sample entities during the run exposes them via
/// [`samples`](Self::samples); this is the only way sample identities flow
/// out of the reader.
pub trait RecordReader<T>: Send {
    /// Open the underlying file and reset per-run state.
    fn open(&mut self, path: &Path, ctx: &ImportContext) -> Result<()>;

    /// The next record, or `None` at end of input. Errors are fatal; skips
    /// are handled internally per the import options and counted.
    fn read_record(&mut self) -> Result<Option<T>>;

    /// Close the underlying file handle. Idempotent.
    fn close(&mut self);

    /// Samples created or used during the current run. Empty for readers
    /// that do not discover samples.
    fn samples(&self) -> Vec<Sample> {
        Vec::new()
    }

    /// Lines and cells skipped during the current run under the import
    /// options.
    fn skipped_count(&self) -> usize {
        0
    }
}

/// Why a line produced no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InvalidGene,
    InvalidSample,
    InvalidValue,
    MalformedLine,
}

/// Per-line parse result: records, or an explicit sanctioned skip. The
/// fatal branch is the surrounding `Result`.
#[derive(Debug)]
pub enum LineOutcome<T> {
    Records(Vec<T>),
    Skipped(SkipReason),
}

/// Format-specific line parsing plugged into [`DelimitedFileReader`].
pub trait LineParser<T>: Send {
    /// Reset per-run state (column maps, sample caches) before reading.
    fn begin(&mut self, ctx: &ImportContext) -> Result<()>;

    /// Lines excluded from both header and data processing.
    fn is_skippable(&self, line: &str, line_number: usize) -> bool;

    /// Whether this line is the column-header line. Only consulted until a
    /// header has been parsed.
    fn is_header(&self, line: &str, line_number: usize) -> bool;

    /// Parse the header, populating column maps and resolving header tokens
    /// to samples. Called exactly once per run.
    fn parse_header(&mut self, line: &str, ctx: &ImportContext) -> Result<()>;

    /// Extract records from one content line.
    fn records_from_line(&mut self, line: &str, ctx: &ImportContext) -> Result<LineOutcome<T>>;

    /// Samples discovered by this parser during the run.
    fn samples(&self) -> Vec<Sample> {
        Vec::new()
    }

    /// Cells skipped inside otherwise-productive lines.
    fn skipped_items(&self) -> usize {
        0
    }
}

/// Buffered line access over a source file.
///
/// Paths that do not exist as given are also tried relative to the crate
/// manifest directory, so bundled reference files resolve in tests and
/// development checkouts.
struct LineSource {
    reader: Option<BufReader<File>>,
    line_number: usize,
}

impl LineSource {
    fn new() -> Self {
        Self {
            reader: None,
            line_number: 0,
        }
    }

    fn open(&mut self, path: &Path) -> Result<()> {
        self.close();
        let resolved = resolve_input_path(path)?;
        let file = File::open(&resolved)
            .map_err(|e| Error::io(format!("Cannot read file {}", resolved.display()), e))?;
        self.reader = Some(BufReader::new(file));
        self.line_number = 0;
        Ok(())
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        let mut line = String::new();
        let bytes = reader
            .read_line(&mut line)
            .map_err(|e| Error::io("Failed to read line from input file", e))?;
        if bytes == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    fn line_number(&self) -> usize {
        self.line_number
    }

    fn close(&mut self) {
        self.reader = None;
    }
}

fn resolve_input_path(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    let bundled = Path::new(env!("CARGO_MANIFEST_DIR")).join(path);
    if bundled.is_file() {
        return Ok(bundled);
    }
    Err(Error::file_not_found(path.display().to_string()))
}

/// Header-resolved sample columns shared by the matrix format parsers.
///
/// Maps column index to the resolved Sample, scoped to one reader run so
/// concurrent runs never share resolution caches.
pub(crate) struct SampleColumns {
    columns: std::collections::HashMap<usize, Sample>,
    skipped_cells: usize,
}

impl SampleColumns {
    pub(crate) fn new() -> Self {
        Self {
            columns: std::collections::HashMap::new(),
            skipped_cells: 0,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.columns.clear();
        self.skipped_cells = 0;
    }

    /// Resolve every header token from `start` onwards to a Sample,
    /// creating unseen samples. Unresolvable tokens are fatal unless
    /// invalid samples are skippable, in which case the column is left
    /// unmapped and its cells are later counted as skipped.
    pub(crate) fn parse_header(
        &mut self,
        tokens: &[&str],
        start: usize,
        support: &crate::app::services::dataset_support::DataSetSupport,
        ctx: &ImportContext,
    ) -> Result<()> {
        for (index, token) in tokens.iter().enumerate().skip(start) {
            match support.resolve_or_create_sample(token, &ctx.data_set) {
                Ok(sample) => {
                    self.columns.insert(index, sample);
                }
                Err(e) if e.is_skippable(&ctx.options) => {
                    tracing::warn!("Skipping sample column '{}': {}", token, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub(crate) fn sample(&self, index: usize) -> Option<&Sample> {
        self.columns.get(&index)
    }

    pub(crate) fn samples(&self) -> Vec<Sample> {
        let mut samples: Vec<Sample> = self.columns.values().cloned().collect();
        samples.sort_by(|a, b| a.name.cmp(&b.name));
        samples.dedup_by(|a, b| a.id == b.id);
        samples
    }

    pub(crate) fn note_skipped_cell(&mut self) {
        self.skipped_cells += 1;
    }

    pub(crate) fn skipped_cells(&self) -> usize {
        self.skipped_cells
    }
}

/// Generic line loop over a [`LineParser`].
///
/// Pulls lines from the source, filters skippable lines, parses the header
/// exactly once, and drains multi-record lines one record at a time.
pub struct DelimitedFileReader<T, P> {
    parser: P,
    source: LineSource,
    pending: VecDeque<T>,
    context: Option<ImportContext>,
    header_parsed: bool,
    skipped_lines: usize,
}

impl<T, P: LineParser<T>> DelimitedFileReader<T, P> {
    pub fn new(parser: P) -> Self {
        Self {
            parser,
            source: LineSource::new(),
            pending: VecDeque::new(),
            context: None,
            header_parsed: false,
            skipped_lines: 0,
        }
    }
}

impl<T: Send, P: LineParser<T>> RecordReader<T> for DelimitedFileReader<T, P> {
    fn open(&mut self, path: &Path, ctx: &ImportContext) -> Result<()> {
        self.source.open(path)?;
        self.parser.begin(ctx)?;
        self.context = Some(ctx.clone());
        self.pending.clear();
        self.header_parsed = false;
        self.skipped_lines = 0;
        Ok(())
    }

    fn read_record(&mut self) -> Result<Option<T>> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Ok(Some(record));
            }
            let Some(line) = self.source.next_line()? else {
                return Ok(None);
            };
            let line_number = self.source.line_number();
            let ctx = self
                .context
                .as_ref()
                .ok_or_else(|| Error::configuration("reader has not been opened"))?;

            if self.parser.is_skippable(&line, line_number) {
                continue;
            }
            if !self.header_parsed && self.parser.is_header(&line, line_number) {
                self.parser.parse_header(&line, ctx)?;
                self.header_parsed = true;
                continue;
            }
            match self.parser.records_from_line(&line, ctx)? {
                LineOutcome::Records(records) => {
                    self.pending.extend(records);
                }
                LineOutcome::Skipped(reason) => {
                    self.skipped_lines += 1;
                    debug!("Skipped line {}: {:?}", line_number, reason);
                }
            }
        }
    }

    fn close(&mut self) {
        self.source.close();
    }

    fn samples(&self) -> Vec<Sample> {
        self.parser.samples()
    }

    fn skipped_count(&self) -> usize {
        self.skipped_lines + self.parser.skipped_items()
    }
}
