use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::PipelineError;
use crate::pipeline::upload::UploadResult;
use crate::pipeline::validate::ValidationSummary;
use crate::types::{SourceSpec, Stage};

fn as_display<T: fmt::Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Done(UploadResult),
    Failed {
        stage: Stage,
        #[serde(serialize_with = "as_display")]
        error: PipelineError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub source: SourceSpec,
    pub outcome: SourceOutcome,
    /// Stages entered, in order.
    pub stages: Vec<Stage>,
    pub validation: Option<ValidationSummary>,
}

impl SourceReport {
    pub fn is_done(&self) -> bool {
        matches!(self.outcome, SourceOutcome::Done(_))
    }

    pub fn failure(&self) -> Option<(Stage, &PipelineError)> {
        match &self.outcome {
            SourceOutcome::Failed { stage, error } => Some((*stage, error)),
            SourceOutcome::Done(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.sources.iter().filter(|s| s.is_done()).count()
    }

    pub fn failed(&self) -> usize {
        self.sources.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    /// Invalid records that were uploaded anyway.
    pub fn invalid_records_uploaded(&self) -> usize {
        self.sources
            .iter()
            .filter_map(|s| match &s.outcome {
                SourceOutcome::Done(upload) => Some(upload.invalid_records),
                SourceOutcome::Failed { .. } => None,
            })
            .sum()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📊 Run results: {} done, {} failed", self.succeeded(), self.failed())?;
        for report in &self.sources {
            match &report.outcome {
                SourceOutcome::Done(upload) => {
                    write!(
                        f,
                        "   ✅ {}: {} records → {}/{}",
                        report.source.output_name, upload.records, upload.bucket, upload.key
                    )?;
                    if upload.invalid_records > 0 {
                        write!(f, " ({} invalid)", upload.invalid_records)?;
                    }
                    writeln!(f)?;
                }
                SourceOutcome::Failed { stage, error } => {
                    writeln!(
                        f,
                        "   ❌ {}: failed while {}: {}",
                        report.source.output_name, stage, error
                    )?;
                }
            }
        }
        let invalid = self.invalid_records_uploaded();
        if invalid > 0 {
            writeln!(f, "⚠️  {} invalid records uploaded", invalid)?;
        }
        Ok(())
    }
}
