use super::{ReaderFixture, read_all};
use crate::app::services::readers::{CopyNumberMatrixReader, RecordReader};
use crate::app::storage::ModelRepository;
use crate::config::ImportOptions;
use crate::Error;

const VALID_MATRIX: &str = "\
GeneID\tSymbol\tACHN_KIDNEY\tMCF7_BREAST
672\tBRCA1\t-0.5\t1.25
675\tBRCA2\t0.0\t2.0
";

fn reader(fixture: &ReaderFixture) -> CopyNumberMatrixReader {
    CopyNumberMatrixReader::copy_number(fixture.genes.clone(), fixture.support.clone())
}

#[test]
fn test_parses_matrix_cells() {
    let fixture = ReaderFixture::new();
    let path = fixture.write_file("cnv.txt", VALID_MATRIX);
    let ctx = fixture.context(ImportOptions::default());

    let mut reader = reader(&fixture);
    reader.open(&path, &ctx).unwrap();
    let records = read_all(&mut reader).unwrap();
    reader.close();

    assert_eq!(records.len(), 4);
    assert_eq!(records[0].value, -0.5);
    assert_eq!(records[3].value, 2.0);
    assert!(records.iter().all(|r| r.data_file_id == "file-1"));
    assert_eq!(reader.samples().len(), 2);
    // Cell-line names are their own subjects.
    assert_eq!(fixture.store.subjects.count().unwrap(), 2);
}

#[test]
fn test_short_lines_are_skipped() {
    let fixture = ReaderFixture::new();
    let content = "\
GeneID\tSymbol\tACHN_KIDNEY
672\tBRCA1\t1.0
incomplete\tline
7157\tTP53\t2.0
";
    let path = fixture.write_file("cnv.txt", content);
    let ctx = fixture.context(ImportOptions::default());

    let mut reader = reader(&fixture);
    reader.open(&path, &ctx).unwrap();
    let records = read_all(&mut reader).unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn test_unknown_gene_skip_vs_fail() {
    let fixture = ReaderFixture::new();
    let content = "\
GeneID\tSymbol\tACHN_KIDNEY
NOT_A_GENE\tNOPE\t1.0
";
    let path = fixture.write_file("cnv.txt", content);

    let mut strict = reader(&fixture);
    strict
        .open(&path, &fixture.context(ImportOptions::default()))
        .unwrap();
    assert!(matches!(
        read_all(&mut strict),
        Err(Error::InvalidGene { .. })
    ));

    let mut lenient = reader(&fixture);
    lenient
        .open(
            &path,
            &fixture.context(ImportOptions::default().with_skip_invalid_genes()),
        )
        .unwrap();
    assert!(read_all(&mut lenient).unwrap().is_empty());
    assert_eq!(lenient.skipped_count(), 1);
}
