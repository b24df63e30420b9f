// tests/common/mod.rs
// Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use weather_fx_pipeline::error::{FetchError, PersistError};
use weather_fx_pipeline::ingest::types::DocumentSource;
use weather_fx_pipeline::notify::{FailureEvent, Notifier};
use weather_fx_pipeline::persist::{ObservationSink, SinkTransaction, CURRENCY_TABLE, WEATHER_TABLE};
use weather_fx_pipeline::record::{CurrencyValue, WeatherValue};

pub const WEATHER_URL: &str = "https://forecast.weather.gov/xml/current_obs/KJFK.xml";
pub const CURRENCY_URL: &str = "https://www.floatrates.com/daily/usd.xml";

pub fn fixture(name: &str) -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(path).expect("read fixture")
}

// ---------------------------------------------------------------- sources

/// Serves canned bodies (or HTTP status failures) per url and records calls.
#[derive(Default)]
pub struct MockSource {
    responses: Mutex<HashMap<String, Result<Vec<u8>, u16>>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.responses.lock().insert(url.to_string(), Ok(body.into()));
        self
    }

    pub fn fail(self, url: &str, status: u16) -> Self {
        self.responses.lock().insert(url.to_string(), Err(status));
        self
    }

    pub fn set_body(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.responses.lock().insert(url.to_string(), Ok(body.into()));
    }
}

#[async_trait]
impl DocumentSource for MockSource {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.lock().push(url.to_string());
        match self.responses.lock().get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Fails with HTTP 503 a fixed number of times, then serves `body` for every url.
pub struct FlakySource {
    failures_left: AtomicU32,
    body: Vec<u8>,
    pub attempts: AtomicU32,
}

impl FlakySource {
    pub fn new(failures: u32, body: impl Into<Vec<u8>>) -> Self {
        Self {
            failures_left: AtomicU32::new(failures),
            body: body.into(),
            attempts: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl DocumentSource for FlakySource {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 503,
            });
        }
        Ok(self.body.clone())
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

// ---------------------------------------------------------------- sinks

/// Everything a [`RecordingSink`] saw. `committed` only holds rows from
/// transactions that reached a successful commit.
#[derive(Debug, Default, Clone)]
pub struct SinkLog {
    pub begins: usize,
    pub inserts: Vec<&'static str>,
    pub commits: usize,
    pub rollbacks: usize,
    pub committed: Vec<&'static str>,
}

#[derive(Clone, Default)]
pub struct RecordingSink {
    pub log: Arc<Mutex<SinkLog>>,
    /// 1-based insert (within one transaction) that fails.
    fail_on_insert: Option<usize>,
    fail_commit: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_insert(n: usize) -> Self {
        Self {
            fail_on_insert: Some(n),
            ..Self::default()
        }
    }

    pub fn failing_commit() -> Self {
        Self {
            fail_commit: true,
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> SinkLog {
        self.log.lock().clone()
    }
}

#[async_trait]
impl ObservationSink for RecordingSink {
    async fn begin(&self) -> Result<Box<dyn SinkTransaction>, PersistError> {
        self.log.lock().begins += 1;
        Ok(Box::new(RecordingTx {
            log: Arc::clone(&self.log),
            pending: Vec::new(),
            inserted: 0,
            fail_on_insert: self.fail_on_insert,
            fail_commit: self.fail_commit,
        }))
    }
}

struct RecordingTx {
    log: Arc<Mutex<SinkLog>>,
    pending: Vec<&'static str>,
    inserted: usize,
    fail_on_insert: Option<usize>,
    fail_commit: bool,
}

impl RecordingTx {
    fn insert(&mut self, table: &'static str) -> Result<(), PersistError> {
        self.inserted += 1;
        self.log.lock().inserts.push(table);
        if self.fail_on_insert == Some(self.inserted) {
            return Err(PersistError::Insert {
                table,
                source: sqlx::Error::Protocol("induced failure".into()),
            });
        }
        self.pending.push(table);
        Ok(())
    }
}

#[async_trait]
impl SinkTransaction for RecordingTx {
    async fn insert_weather(&mut self, _weather: &WeatherValue) -> Result<(), PersistError> {
        self.insert(WEATHER_TABLE)
    }

    async fn insert_currency(&mut self, _currency: &CurrencyValue) -> Result<(), PersistError> {
        self.insert(CURRENCY_TABLE)
    }

    async fn commit(self: Box<Self>) -> Result<(), PersistError> {
        let mut log = self.log.lock();
        log.commits += 1;
        if self.fail_commit {
            return Err(PersistError::Commit(sqlx::Error::Protocol(
                "induced commit failure".into(),
            )));
        }
        log.committed.extend(self.pending.iter().copied());
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), PersistError> {
        self.log.lock().rollbacks += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------- notifiers

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub events: Arc<Mutex<Vec<FailureEvent>>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, ev: &FailureEvent) -> Result<()> {
        self.events.lock().push(ev.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
