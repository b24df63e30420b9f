// src/orchestrator.rs
//! Reference orchestrator: runs fetch → parse → persist in order, retries a
//! failed stage from scratch, alerts when retries run out, and repeats on a
//! fixed interval. The stages themselves know nothing about this module.

use std::future::Future;
use std::time::Duration;

use metrics::{counter, gauge};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::PipelineConfig;
use crate::error::{FetchError, PersistError};
use crate::ingest::content_store::ContentStore;
use crate::ingest::http::HttpSource;
use crate::ingest::types::DocumentSource;
use crate::ingest::{fetch_documents, FetchedDocument};
use crate::notify::{FailureEvent, LogNotifier, Notifier, SlackNotifier};
use crate::parse::{parse_documents, DocumentNames};
use crate::persist::postgres::PgObservationSink;
use crate::persist::{persist_record, ObservationSink, PersistOutcome};
use crate::record::ObservationRecord;

pub const FETCH_STAGE: &str = "fetch";
pub const PERSIST_STAGE: &str = "persist";

/// Fixed-delay retry budget applied to each stage independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            delay: Duration::from_secs(300),
        }
    }
}

/// Last error of a stage that failed on every attempt.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub error: E,
}

/// Call `op` until it succeeds or the retry budget is spent.
pub async fn run_with_retry<T, E, F, Fut>(
    stage: &'static str,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, Exhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt <= policy.retries => {
                tracing::warn!(
                    stage,
                    attempt,
                    error = %e,
                    delay_secs = policy.delay.as_secs(),
                    "stage failed, retrying"
                );
                counter!("stage_retries_total", "stage" => stage).increment(1);
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => {
                return Err(Exhausted {
                    attempts: attempt,
                    error: e,
                })
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("fetch stage failed after {attempts} attempt(s): {source}")]
    Fetch {
        attempts: u32,
        #[source]
        source: FetchError,
    },
    #[error("persist stage failed after {attempts} attempt(s): {source}")]
    Persist {
        attempts: u32,
        #[source]
        source: PersistError,
    },
}

/// Summary of one completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub fetched: Vec<FetchedDocument>,
    pub record: ObservationRecord,
    pub persisted: PersistOutcome,
}

pub struct Pipeline {
    source: Box<dyn DocumentSource>,
    sink: Box<dyn ObservationSink>,
    notifier: Box<dyn Notifier>,
    store: ContentStore,
    names: DocumentNames,
    urls: Vec<String>,
    policy: RetryPolicy,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn DocumentSource>,
        sink: Box<dyn ObservationSink>,
        store: ContentStore,
        urls: Vec<String>,
    ) -> Self {
        Self {
            source,
            sink,
            notifier: Box::new(LogNotifier),
            store,
            names: DocumentNames::default(),
            urls,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_names(mut self, names: DocumentNames) -> Self {
        self.names = names;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Production wiring: HTTP source, PostgreSQL sink, Slack (or log) alerts.
    pub fn from_config(cfg: &PipelineConfig) -> anyhow::Result<Self> {
        let source = HttpSource::new(cfg.fetch_timeout(), &cfg.user_agent)?;
        let sink = PgObservationSink::new(cfg.resolve_database_url()?);
        let notifier: Box<dyn Notifier> = match cfg.resolve_slack_webhook() {
            Some(url) => Box::new(SlackNotifier::new(url)),
            None => {
                tracing::debug!("Slack disabled (no webhook configured)");
                Box::new(LogNotifier)
            }
        };
        Ok(Self::new(
            Box::new(source),
            Box::new(sink),
            ContentStore::new(&cfg.content_dir),
            cfg.sources.clone(),
        )
        .with_notifier(notifier)
        .with_names(cfg.document_names())
        .with_policy(RetryPolicy {
            retries: cfg.retries,
            delay: cfg.retry_delay(),
        }))
    }

    /// Fetch stage with retries.
    pub async fn fetch(&self) -> Result<Vec<FetchedDocument>, PipelineError> {
        run_with_retry(FETCH_STAGE, &self.policy, || {
            fetch_documents(self.source.as_ref(), &self.store, &self.urls)
        })
        .await
        .map_err(|ex| PipelineError::Fetch {
            attempts: ex.attempts,
            source: ex.error,
        })
    }

    /// Parse stage. Cannot fail, so it is never retried.
    pub async fn parse(&self) -> ObservationRecord {
        parse_documents(&self.store, &self.names).await
    }

    /// Persist stage with retries.
    pub async fn persist(
        &self,
        record: Option<&ObservationRecord>,
    ) -> Result<PersistOutcome, PipelineError> {
        run_with_retry(PERSIST_STAGE, &self.policy, || {
            persist_record(self.sink.as_ref(), record)
        })
        .await
        .map_err(|ex| PipelineError::Persist {
            attempts: ex.attempts,
            source: ex.error,
        })
    }

    /// One full run. A stage that exhausts its retries triggers an alert and
    /// ends the run; later stages are not attempted.
    pub async fn run_once(&self) -> Result<RunReport, PipelineError> {
        tracing::info!(sources = self.urls.len(), "pipeline run started");

        let fetched = match self.fetch().await {
            Ok(f) => f,
            Err(e) => {
                self.alert(FETCH_STAGE, &e).await;
                return Err(e);
            }
        };

        let record = self.parse().await;

        let persisted = match self.persist(Some(&record)).await {
            Ok(p) => p,
            Err(e) => {
                self.alert(PERSIST_STAGE, &e).await;
                return Err(e);
            }
        };

        gauge!("pipeline_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        tracing::info!(
            documents = fetched.len(),
            rows = persisted.total(),
            "pipeline run finished"
        );
        Ok(RunReport {
            fetched,
            record,
            persisted,
        })
    }

    async fn alert(&self, stage: &'static str, err: &PipelineError) {
        let attempts = match err {
            PipelineError::Fetch { attempts, .. } | PipelineError::Persist { attempts, .. } => {
                *attempts
            }
        };
        let ev = FailureEvent {
            stage,
            attempts,
            error: err.to_string(),
            ts: chrono::Utc::now(),
        };
        if let Err(e) = self.notifier.send(&ev).await {
            tracing::warn!(error = ?e, notifier = self.notifier.name(), "failure notification not delivered");
        }
    }
}

/// Run the pipeline every `every`, starting immediately. Runs happen inline in
/// the loop, so two runs never overlap; ticks missed during a long run are
/// dropped rather than replayed.
pub fn spawn_scheduler(pipeline: Pipeline, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match pipeline.run_once().await {
                Ok(report) => tracing::info!(
                    target: "scheduler",
                    documents = report.fetched.len(),
                    weather = report.record.weather.is_some(),
                    currency = report.record.currency.is_some(),
                    rows = report.persisted.total(),
                    "scheduled run ok"
                ),
                Err(e) => tracing::error!(target: "scheduler", error = %e, "scheduled run failed"),
            }
        }
    })
}
