use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, info_span, Instrument};

use crate::app::ports::{HttpClientPort, ObjectStorePort};
use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::pipeline::dataset::Dataset;
use crate::pipeline::extract::extract_table;
use crate::pipeline::fetch::{FetchPolicy, Fetcher};
use crate::pipeline::rate_limiter::{Limits, RateLimiter};
use crate::pipeline::report::{RunReport, SourceOutcome, SourceReport};
use crate::pipeline::upload::StorageUploader;
use crate::pipeline::validate::{RecordValidator, ValidationSummary};
use crate::types::{SourceSpec, Stage};

/// Cooperative cancel flag, checked between stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Forward-only stage tracker for one source.
#[derive(Debug)]
struct SourceRun {
    stage: Stage,
    stages: Vec<Stage>,
    validation: Option<ValidationSummary>,
}

impl SourceRun {
    fn new() -> Self {
        Self {
            stage: Stage::Idle,
            stages: vec![Stage::Idle],
            validation: None,
        }
    }

    fn enter(&mut self, next: Stage, cancel: &CancelToken) -> Result<(), PipelineError> {
        debug_assert!(next > self.stage, "stage transitions only move forward");
        self.stage = next;
        self.stages.push(next);
        if cancel.is_cancelled() && next != Stage::Done {
            return Err(PipelineError::Cancelled(next));
        }
        Ok(())
    }
}

/// Runs fetch → extract → validate → upload for each configured source.
#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<AppConfig>,
    fetcher: Arc<Fetcher>,
    validator: Arc<RecordValidator>,
    uploader: Arc<StorageUploader>,
    cancel: CancelToken,
}

impl Orchestrator {
    pub fn new(
        config: AppConfig,
        http: Arc<dyn HttpClientPort>,
        store: Arc<dyn ObjectStorePort>,
    ) -> Self {
        let limiter = RateLimiter::new(Limits {
            min_interval: config.fetch.politeness_delay(),
        });
        let fetcher = Fetcher::new(http, limiter).with_initial_backoff(config.fetch.initial_backoff());
        Self {
            config: Arc::new(config),
            fetcher: Arc::new(fetcher),
            validator: Arc::new(RecordValidator::default()),
            uploader: Arc::new(StorageUploader::new(store)),
            cancel: CancelToken::default(),
        }
    }

    pub fn with_validator(mut self, validator: RecordValidator) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    /// Shares an existing token, so a caller can cancel before the run starts.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn run(&self) -> RunReport {
        let sources = self.config.sources.clone();
        self.run_sources(sources).await
    }

    /// Sources run concurrently up to the configured limit; reports keep input order.
    pub async fn run_sources(&self, sources: Vec<SourceSpec>) -> RunReport {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        info!(sources = sources.len(), concurrency = self.config.concurrency, "Starting run");

        let mut handles = Vec::with_capacity(sources.len());
        for source in sources {
            let this = self.clone();
            let semaphore = semaphore.clone();
            let spec = source.clone();
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                this.run_source(source).await
            });
            handles.push((spec, handle));
        }

        let mut report = RunReport::default();
        for (spec, handle) in handles {
            let source_report = match handle.await {
                Ok(r) => r,
                Err(e) => {
                    error!(output = %spec.output_name, error = %e, "Source task failed");
                    SourceReport {
                        source: spec,
                        outcome: SourceOutcome::Failed {
                            stage: Stage::Idle,
                            error: PipelineError::Task(e.to_string()),
                        },
                        stages: vec![Stage::Idle],
                        validation: None,
                    }
                }
            };
            report.sources.push(source_report);
        }

        info!(done = report.succeeded(), failed = report.failed(), "Run finished");
        report
    }

    pub async fn run_source(&self, source: SourceSpec) -> SourceReport {
        let span = info_span!("source", output = %source.output_name, url = %source.url);
        async move {
            let mut run = SourceRun::new();
            let outcome = match self.drive(&source, &mut run).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    error!(stage = %run.stage, %error, "Source failed");
                    SourceOutcome::Failed {
                        stage: run.stage,
                        error,
                    }
                }
            };
            SourceReport {
                source,
                outcome,
                stages: run.stages,
                validation: run.validation,
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        source: &SourceSpec,
        run: &mut SourceRun,
    ) -> Result<SourceOutcome, PipelineError> {
        run.enter(Stage::Fetching, &self.cancel)?;
        let policy = FetchPolicy::from(&self.config.fetch);
        let page = self.fetcher.fetch_with(&source.url, policy).await?;
        info!(attempts = page.attempts, bytes = page.body.len(), final_url = %page.final_url, "Fetched page");

        run.enter(Stage::Extracting, &self.cancel)?;
        let table = extract_table(&page.body, source.table_index)?;
        drop(page);
        info!(columns = table.header.len(), rows = table.len(), "Extracted table");
        let header = table.header.clone();
        let records = table.into_records();

        run.enter(Stage::Validating, &self.cancel)?;
        let dataset = if self.config.validate {
            let batch = self.validator.validate_batch(&records);
            run.validation = Some(batch.summary);
            Dataset::validated(self.validator.schema(), batch.records)
        } else {
            info!("Validation bypassed, uploading raw records");
            Dataset::raw(header, records)
        };

        run.enter(Stage::Uploading, &self.cancel)?;
        let storage = &self.config.storage;
        let upload = self
            .uploader
            .upload(&dataset, &storage.bucket, &source.object_key(), &storage.credentials)
            .await?;

        run.enter(Stage::Done, &self.cancel)?;
        Ok(SourceOutcome::Done(upload))
    }
}

/// Waits for Ctrl-C and flips the token; in-flight requests are left to finish.
pub async fn cancel_on_ctrl_c(token: CancelToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Cancellation requested, stopping after the current stage");
        token.cancel();
    }
}
