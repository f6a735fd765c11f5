pub mod schema;

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

use crate::types::Record;
pub use schema::{FieldSpec, FieldValue, Grade, Schema, ViolationKind};

/// A field that failed to parse or violated its constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: &'static str,
    pub kind: ViolationKind,
    /// The offending source text.
    pub raw: String,
}

/// A record mapped onto the schema. Invalid records keep every field that did parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidatedRecord {
    values: BTreeMap<&'static str, FieldValue>,
    pub violations: Vec<Violation>,
}

impl ValidatedRecord {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn set_fields(&self) -> usize {
        self.values.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBatch {
    pub records: Vec<ValidatedRecord>,
    pub summary: ValidationSummary,
}

pub struct RecordValidator {
    schema: Schema,
}

impl Default for RecordValidator {
    fn default() -> Self {
        Self::new(Schema::rankings())
    }
}

impl RecordValidator {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Never fails: each bad field becomes a violation and is left unset.
    pub fn validate(&self, record: &Record) -> ValidatedRecord {
        let mut out = ValidatedRecord::default();

        for (column, raw) in record.iter() {
            let Some(spec) = self.schema.resolve(column) else {
                continue;
            };
            // first column mapped to a field wins
            if out.values.contains_key(spec.name)
                || out.violations.iter().any(|v| v.field == spec.name)
            {
                continue;
            }
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            match spec.check(raw) {
                Ok(value) => {
                    out.values.insert(spec.name, value);
                }
                Err(kind) => out.violations.push(Violation {
                    field: spec.name,
                    kind,
                    raw: raw.to_string(),
                }),
            }
        }

        out
    }

    #[instrument(level = "info", skip_all, fields(records = records.len()))]
    pub fn validate_batch(&self, records: &[Record]) -> ValidatedBatch {
        let mut summary = ValidationSummary::default();
        let validated: Vec<ValidatedRecord> = records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let v = self.validate(record);
                summary.total += 1;
                if v.is_valid() {
                    summary.valid += 1;
                } else {
                    summary.invalid += 1;
                    for violation in &v.violations {
                        debug!(row, field = violation.field, raw = %violation.raw, kind = %violation.kind, "Field violation");
                    }
                }
                v
            })
            .collect();

        info!(valid = summary.valid, invalid = summary.invalid, "Validated records");
        ValidatedBatch {
            records: validated,
            summary,
        }
    }
}
