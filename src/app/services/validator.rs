//! Structural validation of single records.
//!
//! Validators are side-effect free and never consult import options; the
//! record processor decides skip-vs-fail disposition.

use crate::app::models::{GeneCopyNumber, GeneExpression, Mutation};

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Synchronous structural verdict for one record.
pub trait RecordValidator<T>: Send {
    fn validate(&self, record: &T) -> Result<(), Vec<FieldError>>;
}

fn require(errors: &mut Vec<FieldError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "must not be empty"));
    }
}

/// Validates expression records: foreign keys present, finite value.
pub struct GeneExpressionValidator;

impl RecordValidator<GeneExpression> for GeneExpressionValidator {
    fn validate(&self, record: &GeneExpression) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        require(&mut errors, "data_file_id", &record.data_file_id);
        require(&mut errors, "data_set_id", &record.data_set_id);
        require(&mut errors, "gene_id", &record.gene_id);
        require(&mut errors, "sample_id", &record.sample_id);
        if !record.value.is_finite() {
            errors.push(FieldError::new("value", "must be a finite number"));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Validates copy-number records: foreign keys present, finite value.
pub struct GeneCopyNumberValidator;

impl RecordValidator<GeneCopyNumber> for GeneCopyNumberValidator {
    fn validate(&self, record: &GeneCopyNumber) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        require(&mut errors, "data_file_id", &record.data_file_id);
        require(&mut errors, "data_set_id", &record.data_set_id);
        require(&mut errors, "gene_id", &record.gene_id);
        require(&mut errors, "sample_id", &record.sample_id);
        if !record.value.is_finite() {
            errors.push(FieldError::new("value", "must be a finite number"));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Validates mutation records: foreign keys, chromosome and coordinates.
pub struct MutationValidator;

impl RecordValidator<Mutation> for MutationValidator {
    fn validate(&self, record: &Mutation) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        require(&mut errors, "data_file_id", &record.data_file_id);
        require(&mut errors, "data_set_id", &record.data_set_id);
        require(&mut errors, "gene_id", &record.gene_id);
        require(&mut errors, "sample_id", &record.sample_id);
        require(&mut errors, "chromosome", &record.chromosome);
        if record.dna_start_position <= 0 {
            errors.push(FieldError::new("dna_start_position", "must be positive"));
        }
        if record.dna_stop_position < record.dna_start_position {
            errors.push(FieldError::new(
                "dna_stop_position",
                "must not precede the start position",
            ));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_expression() -> GeneExpression {
        let mut record = GeneExpression::new("file-1", "dataset-1");
        record.gene_id = "gene-1".to_string();
        record.sample_id = "sample-1".to_string();
        record.value = 7.25;
        record
    }

    #[test]
    fn test_expression_validator_accepts_complete_record() {
        assert!(GeneExpressionValidator.validate(&valid_expression()).is_ok());
    }

    #[test]
    fn test_expression_validator_flags_missing_references() {
        let mut record = valid_expression();
        record.gene_id.clear();
        record.sample_id.clear();
        let errors = GeneExpressionValidator.validate(&record).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["gene_id", "sample_id"]);
    }

    #[test]
    fn test_expression_validator_rejects_non_finite_value() {
        let mut record = valid_expression();
        record.value = f64::NAN;
        assert!(GeneExpressionValidator.validate(&record).is_err());
    }

    #[test]
    fn test_mutation_validator_checks_coordinates() {
        let mut record = Mutation::new("file-1", "dataset-1");
        record.gene_id = "gene-1".to_string();
        record.sample_id = "sample-1".to_string();
        record.chromosome = "17".to_string();
        record.dna_start_position = 100;
        record.dna_stop_position = 99;
        let errors = MutationValidator.validate(&record).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "dna_stop_position"));

        record.dna_stop_position = 101;
        assert!(MutationValidator.validate(&record).is_ok());
    }
}
